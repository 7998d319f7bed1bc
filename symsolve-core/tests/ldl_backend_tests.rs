//! End-to-end tests: adapter driving the faer LDL backend.

#![cfg(feature = "faer")]

use std::sync::Arc;

use symsolve_core::linalg::sparse;
use symsolve_core::{
    AdapterOptions, FaerLdlBackend, MemoryJournal, SymSolverStatus, SymmetricSolverAdapter,
};

struct Triplets {
    n: usize,
    rows: Arc<[usize]>,
    cols: Arc<[usize]>,
    values: Vec<f64>,
}

impl Triplets {
    fn new(n: usize, entries: &[(usize, usize, f64)]) -> Self {
        Self {
            n,
            rows: entries.iter().map(|e| e.0).collect::<Vec<_>>().into(),
            cols: entries.iter().map(|e| e.1).collect::<Vec<_>>().into(),
            values: entries.iter().map(|e| e.2).collect(),
        }
    }

    fn nnz(&self) -> usize {
        self.values.len()
    }

    fn residual(&self, x: &[f64], b: &[f64]) -> f64 {
        let a = sparse::symmetric_from_triplets(self.n, &self.rows, &self.cols, &self.values);
        sparse::residual_inf_norm(&a, x, b)
    }
}

/// K = [H A'; A -D] with H = [4 1; 1 3], A = I, D = diag(2, 1).
/// Lower triangle. Inertia: 2 positive, 2 negative.
fn quasi_definite() -> Triplets {
    Triplets::new(
        4,
        &[
            (0, 0, 4.0),
            (1, 0, 1.0),
            (1, 1, 3.0),
            (2, 0, 1.0),
            (2, 2, -2.0),
            (3, 1, 1.0),
            (3, 3, -1.0),
        ],
    )
}

fn setup(k: &Triplets) -> SymmetricSolverAdapter<FaerLdlBackend> {
    let mut adapter = SymmetricSolverAdapter::new(FaerLdlBackend::new(), MemoryJournal::new()).unwrap();
    let status = adapter
        .initialize_structure(k.n, k.nnz(), k.rows.clone(), k.cols.clone())
        .unwrap();
    assert_eq!(status, SymSolverStatus::Success);
    adapter.values_mut().unwrap().copy_from_slice(&k.values);
    adapter
}

#[test]
fn test_quasi_definite_solve_and_inertia() {
    let k = quasi_definite();
    let mut adapter = setup(&k);

    let b = vec![1.0, 2.0, 3.0, 4.0];
    let mut x = b.clone();
    let status = adapter
        .multi_solve(true, &k.rows, &k.cols, 1, &mut x, Some(2))
        .unwrap();

    assert_eq!(status, SymSolverStatus::Success);
    assert_eq!(adapter.number_of_negative_eigenvalues(), Some(2));
    let residual = k.residual(&x, &b);
    assert!(residual < 1e-10, "residual = {} too large", residual);
}

#[test]
fn test_wrong_inertia_reports_actual_count() {
    let k = quasi_definite();
    let mut adapter = setup(&k);

    let mut x = vec![1.0; 4];
    let status = adapter
        .multi_solve(true, &k.rows, &k.cols, 1, &mut x, Some(1))
        .unwrap();

    assert_eq!(status, SymSolverStatus::WrongInertia);
    assert_eq!(adapter.number_of_negative_eigenvalues(), Some(2));
}

#[test]
fn test_multiple_right_hand_sides() {
    let k = quasi_definite();
    let mut adapter = setup(&k);

    let b = vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0, -1.0, 2.0, 0.5, 0.5, 0.5, 0.5];
    let mut x = b.clone();
    let status = adapter
        .multi_solve(true, &k.rows, &k.cols, 3, &mut x, None)
        .unwrap();
    assert_eq!(status, SymSolverStatus::Success);

    for (xi, bi) in x.chunks(4).zip(b.chunks(4)) {
        let residual = k.residual(xi, bi);
        assert!(residual < 1e-10, "residual = {} too large", residual);
    }
    assert_eq!(adapter.stats().num_solves, 3);
}

#[test]
fn test_numerically_singular_matrix() {
    // [1 1; 1 1]
    let k = Triplets::new(2, &[(0, 0, 1.0), (0, 1, 1.0), (1, 1, 1.0)]);
    let mut adapter = setup(&k);

    let mut x = vec![1.0, 1.0];
    let status = adapter
        .multi_solve(true, &k.rows, &k.cols, 1, &mut x, None)
        .unwrap();
    assert_eq!(status, SymSolverStatus::Singular);
    assert_eq!(x, vec![1.0, 1.0]);
}

#[test]
fn test_structurally_singular_pattern() {
    // Row 2 has no entries.
    let k = Triplets::new(3, &[(0, 0, 1.0), (1, 1, 1.0)]);
    let mut adapter =
        SymmetricSolverAdapter::new(FaerLdlBackend::new(), MemoryJournal::new()).unwrap();

    let status = adapter
        .initialize_structure(k.n, k.nnz(), k.rows.clone(), k.cols.clone())
        .unwrap();
    assert_eq!(status, SymSolverStatus::Singular);
}

#[test]
fn test_mixed_triangles_and_duplicates_are_summed() {
    // [2 1 0; 1 -3 0; 0 0 5], with (0,1) given in the upper triangle and
    // the (2,2) entry split in two.
    let k = Triplets::new(
        3,
        &[
            (0, 0, 2.0),
            (0, 1, 1.0),
            (1, 1, -3.0),
            (2, 2, 2.0),
            (2, 2, 3.0),
        ],
    );
    let mut adapter = setup(&k);

    let b = vec![3.0, -2.0, 10.0];
    let mut x = b.clone();
    let status = adapter
        .multi_solve(true, &k.rows, &k.cols, 1, &mut x, Some(1))
        .unwrap();

    assert_eq!(status, SymSolverStatus::Success);
    let expected = [1.0, 1.0, 2.0];
    for i in 0..3 {
        assert!(
            (x[i] - expected[i]).abs() < 1e-10,
            "x[{}] = {} != {}",
            i,
            x[i],
            expected[i]
        );
    }
}

#[test]
fn test_new_values_same_pattern() {
    let k = quasi_definite();
    let mut adapter = setup(&k);

    let mut x = vec![1.0; 4];
    adapter
        .multi_solve(true, &k.rows, &k.cols, 1, &mut x, Some(2))
        .unwrap();

    // Make the (2,2) block positive: inertia flips to 1 negative.
    let mut k2 = quasi_definite();
    k2.rows = k.rows.clone();
    k2.cols = k.cols.clone();
    k2.values[4] = 2.0;
    adapter.values_mut().unwrap().copy_from_slice(&k2.values);

    let b = vec![1.0, -1.0, 1.0, -1.0];
    let mut x = b.clone();
    let status = adapter
        .multi_solve(true, &k.rows, &k.cols, 1, &mut x, Some(1))
        .unwrap();
    assert_eq!(status, SymSolverStatus::Success);
    assert_eq!(adapter.stats().num_symbolic, 1);
    let residual = k2.residual(&x, &b);
    assert!(residual < 1e-10, "residual = {} too large", residual);
}

#[test]
fn test_warm_start_across_configure() {
    let k = quasi_definite();
    let mut adapter = setup(&k);
    let mut x = vec![1.0; 4];
    adapter
        .multi_solve(true, &k.rows, &k.cols, 1, &mut x, None)
        .unwrap();

    adapter
        .configure(&AdapterOptions {
            warm_start_same_structure: true,
            ..AdapterOptions::default()
        })
        .unwrap();
    let status = adapter
        .initialize_structure(k.n, k.nnz(), k.rows.clone(), k.cols.clone())
        .unwrap();
    assert_eq!(status, SymSolverStatus::Success);

    let scaled: Vec<f64> = k.values.iter().map(|v| 2.0 * v).collect();
    adapter.values_mut().unwrap().copy_from_slice(&scaled);

    let b = vec![2.0, 4.0, 6.0, 8.0];
    let mut x = b.clone();
    let status = adapter
        .multi_solve(true, &k.rows, &k.cols, 1, &mut x, Some(2))
        .unwrap();
    assert_eq!(status, SymSolverStatus::Success);
    assert_eq!(adapter.stats().num_symbolic, 1);

    // 2K x = 2b has the same solution as K x = b
    let residual = k.residual(&x, &[1.0, 2.0, 3.0, 4.0]);
    assert!(residual < 1e-10, "residual = {} too large", residual);
}

#[test]
fn test_escalation_scenario_end_to_end() {
    // [2 1 0; 1 -1 0; 0 0 3], 4 stored entries
    let k = Triplets::new(3, &[(0, 0, 2.0), (1, 0, 1.0), (1, 1, -1.0), (2, 2, 3.0)]);
    let mut adapter =
        SymmetricSolverAdapter::new(FaerLdlBackend::new(), MemoryJournal::new()).unwrap();
    adapter
        .configure(&AdapterOptions {
            pivot_tolerance: 1e-6,
            pivot_tolerance_max: Some(0.1),
            ..AdapterOptions::default()
        })
        .unwrap();
    adapter
        .initialize_structure(3, 4, k.rows.clone(), k.cols.clone())
        .unwrap();
    adapter.values_mut().unwrap().copy_from_slice(&k.values);

    let b = vec![1.0, 1.0, 1.0];
    let mut x = b.clone();
    let status = adapter
        .multi_solve(true, &k.rows, &k.cols, 1, &mut x, None)
        .unwrap();
    assert_eq!(status, SymSolverStatus::Success);
    assert_eq!(adapter.number_of_negative_eigenvalues(), Some(1));

    assert!(adapter.increase_quality());
    assert!((adapter.pivot_tolerance() - 1e-3).abs() < 1e-12);

    let mut x = b.clone();
    let status = adapter
        .multi_solve(false, &k.rows, &k.cols, 1, &mut x, None)
        .unwrap();
    assert_eq!(status, SymSolverStatus::CallAgain);
    assert_eq!(x, b);

    let status = adapter
        .multi_solve(false, &k.rows, &k.cols, 1, &mut x, Some(1))
        .unwrap();
    assert_eq!(status, SymSolverStatus::Success);
    assert_eq!(adapter.stats().num_numeric, 2);
    let residual = k.residual(&x, &b);
    assert!(residual < 1e-10, "residual = {} too large", residual);
}

#[test]
fn test_zero_diagonal_saddle_points_are_factored() {
    // [0 1; 1 1] and [0 1; 1 0]: nonsingular, one negative eigenvalue each
    for k in [
        Triplets::new(2, &[(1, 0, 1.0), (1, 1, 1.0)]),
        Triplets::new(2, &[(1, 0, 1.0)]),
    ] {
        let mut adapter = setup(&k);

        let b = vec![1.0, 2.0];
        let mut x = b.clone();
        let status = adapter
            .multi_solve(true, &k.rows, &k.cols, 1, &mut x, Some(1))
            .unwrap();

        assert_eq!(status, SymSolverStatus::Success);
        assert_eq!(adapter.number_of_negative_eigenvalues(), Some(1));
        let residual = k.residual(&x, &b);
        assert!(residual < 1e-10, "residual = {} too large", residual);
    }
}

#[test]
fn test_increase_quality_switches_to_pivoted_factor() {
    // [1e-4 1; 1 1e-4]: the leading pivot passes 1e-6 but not 1e-3
    let k = Triplets::new(2, &[(0, 0, 1e-4), (1, 0, 1.0), (1, 1, 1e-4)]);
    let mut adapter = setup(&k);

    let b = vec![1.0, -1.0];
    let mut x = b.clone();
    let status = adapter
        .multi_solve(true, &k.rows, &k.cols, 1, &mut x, Some(1))
        .unwrap();
    assert_eq!(status, SymSolverStatus::Success);
    assert!(!adapter.backend().is_pivoted());

    assert!(adapter.increase_quality());
    let mut x = b.clone();
    let status = adapter
        .multi_solve(false, &k.rows, &k.cols, 1, &mut x, Some(1))
        .unwrap();
    assert_eq!(status, SymSolverStatus::CallAgain);

    let status = adapter
        .multi_solve(false, &k.rows, &k.cols, 1, &mut x, Some(1))
        .unwrap();
    assert_eq!(status, SymSolverStatus::Success);
    assert!(adapter.backend().is_pivoted());
    assert_eq!(adapter.number_of_negative_eigenvalues(), Some(1));
    let residual = k.residual(&x, &b);
    assert!(residual < 1e-10, "residual = {} too large", residual);
}
