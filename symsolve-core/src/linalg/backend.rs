//! Backend capability boundary.
//!
//! A backend is driven through five jobs: initialize, analyze, factorize,
//! solve and terminate. Each job is issued once per phase and reports an
//! [`Info`] block whose `code` follows the INFO(1) convention of classic
//! multifrontal solvers: zero for success, positive for warnings, negative
//! for errors.

use std::fmt;

/// Job codes understood by a [`SymmetricBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    /// Neutral state between jobs
    Idle,
    /// One-time library handshake
    Initialize,
    /// Symbolic analysis (ordering, elimination tree, workspace estimate)
    Analyze,
    /// Numeric factorization of the current values
    Factorize,
    /// Forward/backward substitution for one right-hand side
    Solve,
    /// Release all backend resources
    Terminate,
}

/// Raw status reported by a backend job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InfoCode(pub i32);

impl InfoCode {
    pub const SUCCESS: InfoCode = InfoCode(0);
    /// A job was issued out of order (e.g. factorize before analyze).
    pub const JOB_ORDER: InfoCode = InfoCode(-3);
    /// The pattern has an empty row: structurally singular.
    pub const STRUCTURALLY_SINGULAR: InfoCode = InfoCode(-6);
    /// Integer workspace too small for the factors.
    pub const INTEGER_WORKSPACE_TOO_SMALL: InfoCode = InfoCode(-8);
    /// Real workspace too small for the factors.
    pub const REAL_WORKSPACE_TOO_SMALL: InfoCode = InfoCode(-9);
    /// A zero (or null) pivot was met during numeric factorization.
    pub const NUMERICALLY_SINGULAR: InfoCode = InfoCode(-10);
    /// Workspace allocation failed.
    pub const ALLOCATION_FAILED: InfoCode = InfoCode(-13);
    /// Dimension, index or value arrays are inconsistent.
    pub const INVALID_MATRIX: InfoCode = InfoCode(-16);

    pub fn is_error(self) -> bool {
        self.0 < 0
    }

    pub fn is_warning(self) -> bool {
        self.0 > 0
    }

    /// The factorization may succeed if repeated with more workspace.
    pub fn is_memory_shortfall(self) -> bool {
        self == Self::INTEGER_WORKSPACE_TOO_SMALL || self == Self::REAL_WORKSPACE_TOO_SMALL
    }

    pub fn is_singular(self) -> bool {
        self == Self::STRUCTURALLY_SINGULAR || self == Self::NUMERICALLY_SINGULAR
    }
}

impl fmt::Display for InfoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result block written by a backend job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Info {
    pub code: InfoCode,
    /// Negative pivots of the last factorization; `None` if unknown.
    pub negative_pivots: Option<usize>,
}

impl Info {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn with_code(code: InfoCode) -> Self {
        Self {
            code,
            negative_pivots: None,
        }
    }

    pub fn factorized(negative_pivots: usize) -> Self {
        Self {
            code: InfoCode::SUCCESS,
            negative_pivots: Some(negative_pivots),
        }
    }
}

/// Fill-reducing ordering requested at analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ordering {
    /// Keep the input ordering
    Natural,
    /// Approximate minimum degree
    #[default]
    Amd,
}

/// Control block read by the backend on every job.
#[derive(Debug, Clone, PartialEq)]
pub struct Controls {
    /// Unsymmetric column permutation to a zero-free diagonal
    pub column_permutation: bool,
    pub ordering: Ordering,
    /// Symmetric equilibration before factorization
    pub scaling: bool,
    /// Iterative refinement steps per solve
    pub refinement_steps: usize,
    /// Report tiny pivots as numerical singularity so the inertia stays exact
    pub null_pivot_detection: bool,
    /// Relative threshold for null-pivot detection
    pub null_pivot_tolerance: f64,
    /// Percentage added to the workspace estimate
    pub workspace_percent: u32,
    /// Relative pivot threshold for numerical pivoting
    pub pivot_threshold: f64,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            column_permutation: false,
            ordering: Ordering::Amd,
            scaling: true,
            refinement_steps: 0,
            null_pivot_detection: true,
            null_pivot_tolerance: 1e-14,
            workspace_percent: 0,
            pivot_threshold: 0.0,
        }
    }
}

impl Controls {
    /// Settings applied before every symbolic analysis.
    pub fn for_analysis(workspace_percent: u32, pivot_threshold: f64) -> Self {
        Self {
            column_permutation: false,
            ordering: Ordering::Amd,
            scaling: true,
            refinement_steps: 0,
            null_pivot_detection: true,
            workspace_percent,
            pivot_threshold,
            ..Self::default()
        }
    }
}

/// Symmetric matrix in coordinate form, one triangle stored.
#[derive(Debug, Clone, Copy)]
pub struct TripletRef<'a> {
    pub n: usize,
    pub rows: &'a [usize],
    pub cols: &'a [usize],
    pub values: &'a [f64],
}

impl TripletRef<'_> {
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }

    /// Index arrays have matching lengths and every index is below `n`.
    pub fn is_consistent(&self) -> bool {
        self.rows.len() == self.cols.len()
            && self.values.len() == self.rows.len()
            && self.rows.iter().all(|&i| i < self.n)
            && self.cols.iter().all(|&j| j < self.n)
    }
}

/// Sparse symmetric-indefinite direct solver driven job by job.
pub trait SymmetricBackend {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Whether factorization reports the number of negative pivots.
    fn provides_inertia(&self) -> bool {
        true
    }

    fn initialize(&mut self) -> Info;

    /// Symbolic analysis of the pattern. Values are not read.
    fn analyze(&mut self, matrix: TripletRef<'_>, controls: &Controls) -> Info;

    fn factorize(&mut self, matrix: TripletRef<'_>, controls: &Controls) -> Info;

    /// Overwrite `rhs` with the solution.
    fn solve(&mut self, rhs: &mut [f64], controls: &Controls) -> Info;

    fn terminate(&mut self);
}
