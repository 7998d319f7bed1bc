//! Sparse matrix helpers for symmetric coordinate input.
//!
//! Backends receive one triangle of a symmetric matrix as triplets. These
//! helpers turn that into the upper-triangular CSC pattern factorization
//! codes expect, and into a full `sprs` matrix for residual computations.

use sprs::{CsMat, TriMat};

/// Sparse matrix in CSC format.
pub type SparseCsc = CsMat<f64>;

/// Upper-triangular CSC pattern built from symmetric triplets.
///
/// Every diagonal position is present, even if the input has no diagonal
/// entry for it. Duplicate triplets share a position and are summed when
/// values are scattered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpperPattern {
    pub n: usize,
    pub col_ptr: Vec<usize>,
    pub row_idx: Vec<usize>,
    /// Triplet index -> position in `row_idx`
    pub scatter: Vec<usize>,
}

impl UpperPattern {
    /// Build the pattern. Returns `None` if an index is out of range or the
    /// index arrays differ in length.
    pub fn from_triplets(n: usize, rows: &[usize], cols: &[usize]) -> Option<Self> {
        if rows.len() != cols.len() {
            return None;
        }

        // (col, row) keys so that sorting gives column-major order.
        let mut keys: Vec<(usize, usize)> = Vec::with_capacity(rows.len() + n);
        keys.extend((0..n).map(|c| (c, c)));
        for (&i, &j) in rows.iter().zip(cols.iter()) {
            if i >= n || j >= n {
                return None;
            }
            keys.push((i.max(j), i.min(j)));
        }
        keys.sort_unstable();
        keys.dedup();

        let mut col_ptr = vec![0usize; n + 1];
        for &(c, _) in &keys {
            col_ptr[c + 1] += 1;
        }
        for c in 0..n {
            col_ptr[c + 1] += col_ptr[c];
        }
        let row_idx: Vec<usize> = keys.iter().map(|&(_, r)| r).collect();

        let mut scatter = Vec::with_capacity(rows.len());
        for (&i, &j) in rows.iter().zip(cols.iter()) {
            let pos = keys.binary_search(&(i.max(j), i.min(j))).ok()?;
            scatter.push(pos);
        }

        Some(Self {
            n,
            col_ptr,
            row_idx,
            scatter,
        })
    }

    pub fn nnz(&self) -> usize {
        self.row_idx.len()
    }

    /// Sum triplet values into their positions in `out` (length `nnz()`).
    pub fn scatter_values(&self, values: &[f64], out: &mut [f64]) {
        out.fill(0.0);
        for (&pos, &v) in self.scatter.iter().zip(values.iter()) {
            out[pos] += v;
        }
    }

    /// Iterate over `(row, col)` pairs of the stored upper triangle.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.n).flat_map(move |col| {
            self.row_idx[self.col_ptr[col]..self.col_ptr[col + 1]]
                .iter()
                .map(move |&row| (row, col))
        })
    }
}

/// Rows (equivalently columns) that no triplet touches.
pub fn empty_rows(n: usize, rows: &[usize], cols: &[usize]) -> Vec<usize> {
    let mut touched = vec![false; n];
    for (&i, &j) in rows.iter().zip(cols.iter()) {
        if i < n {
            touched[i] = true;
        }
        if j < n {
            touched[j] = true;
        }
    }
    touched
        .iter()
        .enumerate()
        .filter(|(_, &t)| !t)
        .map(|(i, _)| i)
        .collect()
}

/// Full symmetric CSC matrix from one-triangle triplets. Off-diagonal
/// entries are mirrored; duplicates are summed.
pub fn symmetric_from_triplets(n: usize, rows: &[usize], cols: &[usize], values: &[f64]) -> SparseCsc {
    let mut tri = TriMat::new((n, n));
    for ((&i, &j), &v) in rows.iter().zip(cols.iter()).zip(values.iter()) {
        tri.add_triplet(i, j, v);
        if i != j {
            tri.add_triplet(j, i, v);
        }
    }
    tri.to_csc()
}

/// Sparse matrix-vector product: y = alpha * A * x + beta * y
pub fn spmv(a: &SparseCsc, x: &[f64], y: &mut [f64], alpha: f64, beta: f64) {
    assert_eq!(a.cols(), x.len());
    assert_eq!(a.rows(), y.len());

    if beta == 0.0 {
        y.fill(0.0);
    } else if beta != 1.0 {
        for yi in y.iter_mut() {
            *yi *= beta;
        }
    }

    if alpha != 0.0 {
        for (val, (row, col)) in a.iter() {
            y[row] += alpha * (*val) * x[col];
        }
    }
}

/// Infinity norm of `b - A x`.
pub fn residual_inf_norm(a: &SparseCsc, x: &[f64], b: &[f64]) -> f64 {
    let mut r = b.to_vec();
    spmv(a, x, &mut r, -1.0, 1.0);
    r.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
}
