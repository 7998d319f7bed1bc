//! Faer sparse LDL backend.
//!
//! Implements [`SymmetricBackend`] on top of faer's simplicial sparse LDL^T
//! factorization. The simplicial variant stores each pivot d_k at the head
//! of column k of the factor, which gives the exact inertia of the matrix.
//!
//! The simplicial factorization does not pivot. When a pivot fails the
//! relative test `|d_k| >= pivot_threshold * max|a_ij|`, the matrix is
//! refactored with Bunch-Kaufman pivoting (1x1 and 2x2 blocks) on a dense
//! copy, and the inertia is read from the blocks. A zero threshold disables
//! pivoting, so a zero pivot is then reported as numerical singularity.
//! Matrices above [`PIVOTED_DIM_LIMIT`] never take the dense path.
//!
//! The workspace percentage control is accepted but ignored, and the
//! backend never reports a workspace shortfall.

use faer::dyn_stack::{MemBuffer, MemStack, StackReq};
use faer::linalg::cholesky::ldlt::factor::{LdltParams, LdltRegularization};
use faer::linalg::solvers::{Lblt, SolveCore};
use faer::sparse::linalg::cholesky::{
    factorize_symbolic_cholesky, CholeskySymbolicParams, LdltRef, SymbolicCholesky,
    SymbolicCholeskyRaw, SymmetricOrdering,
};
use faer::sparse::linalg::SupernodalThreshold;
use faer::sparse::{SparseColMatRef, SymbolicSparseColMatRef};
use faer::{Conj, Mat, MatMut, Par, Side, Spec};

use crate::linalg::backend::{Controls, Info, InfoCode, Ordering, SymmetricBackend, TripletRef};
use crate::linalg::sparse::{self, SparseCsc, UpperPattern};

/// Equilibration passes applied when scaling is enabled.
const SCALING_PASSES: usize = 3;

/// Largest dimension refactored densely with Bunch-Kaufman pivoting.
pub const PIVOTED_DIM_LIMIT: usize = 4096;

/// Faer LDL backend.
pub struct FaerLdlBackend {
    n: usize,

    // Upper-triangular pattern of the current structure
    pattern: Option<UpperPattern>,

    // Values in pattern order, scaled when scaling is enabled
    nzval: Vec<f64>,

    // Symmetric scaling factors: factor diag(s) A diag(s)
    scaling: Vec<f64>,

    // Symbolic factorization (computed once per structure)
    symbolic: Option<SymbolicCholesky<usize>>,

    // Numeric factor values
    ld_vals: Vec<f64>,

    // Pivoted factor, set when the simplicial pivots were rejected
    pivoted: Option<Lblt<f64>>,

    // Workspace for factorization and solve
    work: Option<MemBuffer>,

    // Unscaled full matrix, kept only when refinement is requested
    full: Option<SparseCsc>,
    residual: Vec<f64>,
    rhs_copy: Vec<f64>,

    factor_valid: bool,

    parallelism: Par,

    ldlt_params: Spec<LdltParams, f64>,
}

impl Default for FaerLdlBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FaerLdlBackend {
    /// Sequential backend.
    pub fn new() -> Self {
        Self::with_parallelism(Par::Seq)
    }

    pub fn with_parallelism(parallelism: Par) -> Self {
        Self {
            n: 0,
            pattern: None,
            nzval: Vec::new(),
            scaling: Vec::new(),
            symbolic: None,
            ld_vals: Vec::new(),
            pivoted: None,
            work: None,
            full: None,
            residual: Vec::new(),
            rhs_copy: Vec::new(),
            factor_valid: false,
            parallelism,
            ldlt_params: Spec::default(),
        }
    }

    /// Parallelism from `SYMSOLVE_THREADS` (`1` = sequential, `0` = all cores).
    pub fn from_env() -> Self {
        let parallelism = match std::env::var("SYMSOLVE_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            Some(1) | None => Par::Seq,
            Some(t) => Par::rayon(t),
        };
        Self::with_parallelism(parallelism)
    }

    /// Pivots of the last successful factorization, in elimination order.
    /// `None` after a pivoted factorization.
    pub fn pivots(&self) -> Option<Vec<f64>> {
        if !self.factor_valid || self.pivoted.is_some() {
            return None;
        }
        self.symbolic
            .as_ref()
            .and_then(|symbolic| Self::diagonal(symbolic, &self.ld_vals, self.n))
    }

    /// Whether the last successful factorization used Bunch-Kaufman pivoting.
    pub fn is_pivoted(&self) -> bool {
        self.factor_valid && self.pivoted.is_some()
    }

    fn reset(&mut self) {
        self.n = 0;
        self.pattern = None;
        self.nzval = Vec::new();
        self.scaling = Vec::new();
        self.symbolic = None;
        self.ld_vals = Vec::new();
        self.pivoted = None;
        self.work = None;
        self.full = None;
        self.residual = Vec::new();
        self.rhs_copy = Vec::new();
        self.factor_valid = false;
    }

    /// D of the simplicial LDL^T: first entry of each factor column.
    fn diagonal(symbolic: &SymbolicCholesky<usize>, ld_vals: &[f64], n: usize) -> Option<Vec<f64>> {
        match symbolic.raw() {
            SymbolicCholeskyRaw::Simplicial(simplicial) => {
                let col_ptr = simplicial.col_ptr();
                Some((0..n).map(|k| ld_vals[col_ptr[k]]).collect())
            }
            SymbolicCholeskyRaw::Supernodal(_) => None,
        }
    }

    /// Symmetric Ruiz equilibration of the upper-triangular values.
    fn equilibrate(pattern: &UpperPattern, nzval: &mut [f64], scaling: &mut [f64]) {
        scaling.fill(1.0);
        let mut row_max = vec![0.0_f64; pattern.n];

        for _ in 0..SCALING_PASSES {
            row_max.fill(0.0);
            for (idx, (row, col)) in pattern.entries().enumerate() {
                let a = nzval[idx].abs();
                row_max[row] = row_max[row].max(a);
                row_max[col] = row_max[col].max(a);
            }

            let d: Vec<f64> = row_max
                .iter()
                .map(|&m| if m > 0.0 && m.is_finite() { 1.0 / m.sqrt() } else { 1.0 })
                .collect();

            for (idx, (row, col)) in pattern.entries().enumerate() {
                nzval[idx] *= d[row] * d[col];
            }
            for (s, di) in scaling.iter_mut().zip(d.iter()) {
                *s *= di;
            }
        }
    }

    /// Bunch-Kaufman factorization of the scaled matrix, densely stored.
    ///
    /// Returns the factor and its number of negative eigenvalues, or `None`
    /// when a 1x1 pivot or 2x2 block is (numerically) zero.
    fn factorize_pivoted(
        pattern: &UpperPattern,
        nzval: &[f64],
        null_floor: Option<f64>,
    ) -> Option<(Lblt<f64>, usize)> {
        let n = pattern.n;
        let mut dense = Mat::<f64>::zeros(n, n);
        for (idx, (row, col)) in pattern.entries().enumerate() {
            dense[(col, row)] = nzval[idx];
        }
        let lblt = Lblt::new(dense.as_ref(), Side::Lower);

        let diag = lblt.B_diag();
        let subdiag = lblt.B_subdiag();
        let floor = null_floor.unwrap_or(0.0);
        let mut negative = 0;
        let mut k = 0;
        while k < n {
            let a = diag[k];
            if k + 1 < n && subdiag[k] != 0.0 {
                // 2x2 block [a b; b c]
                let b = subdiag[k];
                let c = diag[k + 1];
                let det = a * c - b * b;
                let size = a.abs().max(b.abs()).max(c.abs());
                if !det.is_finite() || det == 0.0 || det.abs() <= floor * size {
                    return None;
                }
                if det < 0.0 {
                    negative += 1;
                } else if a + c < 0.0 {
                    negative += 2;
                }
                k += 2;
            } else {
                if !a.is_finite() || a == 0.0 || a.abs() <= floor {
                    return None;
                }
                if a < 0.0 {
                    negative += 1;
                }
                k += 1;
            }
        }

        Some((lblt, negative))
    }

    /// x <- diag(s) A_s^-1 diag(s) x, where A_s is the scaled matrix
    fn solve_scaled(
        symbolic: &SymbolicCholesky<usize>,
        ld_vals: &[f64],
        pivoted: Option<&Lblt<f64>>,
        scaling: &[f64],
        work: &mut MemBuffer,
        parallelism: Par,
        x: &mut [f64],
    ) {
        let n = x.len();
        for (xi, &s) in x.iter_mut().zip(scaling.iter()) {
            *xi *= s;
        }

        let rhs_mat = MatMut::from_column_major_slice_mut(x, n, 1);
        match pivoted {
            Some(lblt) => lblt.solve_in_place_with_conj(Conj::No, rhs_mat),
            None => {
                let ldlt = LdltRef::new(symbolic, ld_vals);
                ldlt.solve_in_place_with_conj(Conj::No, rhs_mat, parallelism, MemStack::new(work));
            }
        }

        for (xi, &s) in x.iter_mut().zip(scaling.iter()) {
            *xi *= s;
        }
    }
}

impl SymmetricBackend for FaerLdlBackend {
    fn name(&self) -> &'static str {
        "faer-ldl"
    }

    fn initialize(&mut self) -> Info {
        self.reset();
        Info::success()
    }

    fn analyze(&mut self, matrix: TripletRef<'_>, controls: &Controls) -> Info {
        self.reset();

        if matrix.n == 0 || matrix.rows.len() != matrix.cols.len() {
            return Info::with_code(InfoCode::INVALID_MATRIX);
        }
        let pattern = match UpperPattern::from_triplets(matrix.n, matrix.rows, matrix.cols) {
            Some(p) => p,
            None => return Info::with_code(InfoCode::INVALID_MATRIX),
        };
        if !sparse::empty_rows(matrix.n, matrix.rows, matrix.cols).is_empty() {
            return Info::with_code(InfoCode::STRUCTURALLY_SINGULAR);
        }

        let n = matrix.n;
        let symb_mat =
            SymbolicSparseColMatRef::new_checked(n, n, &pattern.col_ptr, None, &pattern.row_idx);

        let ordering = match controls.ordering {
            Ordering::Amd => SymmetricOrdering::Amd,
            Ordering::Natural => SymmetricOrdering::Identity,
        };
        let cholesky_params = CholeskySymbolicParams {
            supernodal_flop_ratio_threshold: SupernodalThreshold::FORCE_SIMPLICIAL,
            ..Default::default()
        };

        let symbolic = match factorize_symbolic_cholesky(symb_mat, Side::Upper, ordering, cholesky_params) {
            Ok(s) => s,
            Err(_) => return Info::with_code(InfoCode::ALLOCATION_FAILED),
        };

        let req_factor = symbolic.factorize_numeric_ldlt_scratch::<f64>(self.parallelism, self.ldlt_params);
        let req_solve = symbolic.solve_in_place_scratch::<f64>(1, self.parallelism);
        let work = match MemBuffer::try_new(StackReq::any_of(&[req_factor, req_solve])) {
            Ok(w) => w,
            Err(_) => return Info::with_code(InfoCode::ALLOCATION_FAILED),
        };

        self.n = n;
        self.ld_vals = vec![0.0; symbolic.len_val()];
        self.nzval = vec![0.0; pattern.nnz()];
        self.scaling = vec![1.0; n];
        self.residual = vec![0.0; n];
        self.rhs_copy = vec![0.0; n];
        self.work = Some(work);
        self.symbolic = Some(symbolic);
        self.pattern = Some(pattern);

        Info::success()
    }

    fn factorize(&mut self, matrix: TripletRef<'_>, controls: &Controls) -> Info {
        self.factor_valid = false;

        let (pattern, symbolic, work) = match (&self.pattern, &self.symbolic, self.work.as_mut()) {
            (Some(p), Some(s), Some(w)) => (p, s, w),
            _ => return Info::with_code(InfoCode::JOB_ORDER),
        };
        if matrix.n != self.n || !matrix.is_consistent() || matrix.nnz() != pattern.scatter.len() {
            return Info::with_code(InfoCode::INVALID_MATRIX);
        }

        pattern.scatter_values(matrix.values, &mut self.nzval);
        if controls.scaling {
            Self::equilibrate(pattern, &mut self.nzval, &mut self.scaling);
        } else {
            self.scaling.fill(1.0);
        }
        let max_entry = self.nzval.iter().fold(0.0_f64, |m, v| m.max(v.abs()));

        self.full = if controls.refinement_steps > 0 {
            Some(sparse::symmetric_from_triplets(
                matrix.n,
                matrix.rows,
                matrix.cols,
                matrix.values,
            ))
        } else {
            None
        };

        let symb_mat = SymbolicSparseColMatRef::new_checked(
            self.n,
            self.n,
            &pattern.col_ptr,
            None,
            &pattern.row_idx,
        );
        let mat = SparseColMatRef::new(symb_mat, &self.nzval);

        let factored = symbolic
            .factorize_numeric_ldlt(
                &mut self.ld_vals,
                mat,
                Side::Upper,
                LdltRegularization::default(),
                self.parallelism,
                MemStack::new(work),
                self.ldlt_params,
            )
            .is_ok();

        let null_floor = if controls.null_pivot_detection {
            Some(controls.null_pivot_tolerance * max_entry.max(1.0))
        } else {
            None
        };
        let pivot_floor = controls.pivot_threshold * max_entry;

        // Accept the unpivoted factor only if every pivot passes both tests.
        let accepted = if factored {
            Self::diagonal(symbolic, &self.ld_vals, self.n).filter(|d| {
                d.iter().all(|&dk| {
                    dk.is_finite()
                        && dk != 0.0
                        && dk.abs() > null_floor.unwrap_or(0.0)
                        && dk.abs() >= pivot_floor
                })
            })
        } else {
            None
        };

        if let Some(d) = accepted {
            self.pivoted = None;
            self.factor_valid = true;
            return Info::factorized(d.iter().filter(|&&dk| dk < 0.0).count());
        }

        if controls.pivot_threshold <= 0.0 || self.n > PIVOTED_DIM_LIMIT {
            return Info::with_code(InfoCode::NUMERICALLY_SINGULAR);
        }

        match Self::factorize_pivoted(pattern, &self.nzval, null_floor) {
            Some((lblt, negative)) => {
                self.pivoted = Some(lblt);
                self.factor_valid = true;
                Info::factorized(negative)
            }
            None => {
                self.pivoted = None;
                Info::with_code(InfoCode::NUMERICALLY_SINGULAR)
            }
        }
    }

    fn solve(&mut self, rhs: &mut [f64], controls: &Controls) -> Info {
        if !self.factor_valid {
            return Info::with_code(InfoCode::JOB_ORDER);
        }
        if rhs.len() != self.n {
            return Info::with_code(InfoCode::INVALID_MATRIX);
        }
        let (symbolic, work) = match (&self.symbolic, self.work.as_mut()) {
            (Some(s), Some(w)) => (s, w),
            _ => return Info::with_code(InfoCode::JOB_ORDER),
        };

        let pivoted = self.pivoted.as_ref();
        self.rhs_copy.copy_from_slice(rhs);
        Self::solve_scaled(
            symbolic,
            &self.ld_vals,
            pivoted,
            &self.scaling,
            work,
            self.parallelism,
            rhs,
        );

        if let Some(full) = self.full.as_ref() {
            for _ in 0..controls.refinement_steps {
                // r = b - A x, then x += A^-1 r
                self.residual.copy_from_slice(&self.rhs_copy);
                sparse::spmv(full, rhs, &mut self.residual, -1.0, 1.0);
                Self::solve_scaled(
                    symbolic,
                    &self.ld_vals,
                    pivoted,
                    &self.scaling,
                    work,
                    self.parallelism,
                    &mut self.residual,
                );
                for (xi, ri) in rhs.iter_mut().zip(self.residual.iter()) {
                    *xi += ri;
                }
            }
        }

        if rhs.iter().all(|v| v.is_finite()) {
            Info::success()
        } else {
            Info::with_code(InfoCode::NUMERICALLY_SINGULAR)
        }
    }

    fn terminate(&mut self) {
        self.reset();
    }
}
