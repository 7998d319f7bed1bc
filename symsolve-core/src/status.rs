//! Outcome of a phase operation on the solver adapter.

use std::fmt;

/// Closed set of results returned by structure setup and `multi_solve`.
///
/// `Singular` and `WrongInertia` are numerical conditions the calling
/// algorithm is expected to handle (usually by perturbing the matrix and
/// trying again). `FatalError` means the backend failed in a way the adapter
/// cannot recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymSolverStatus {
    /// Factorization (if requested) and all solves completed.
    Success,
    /// The matrix is structurally or numerically singular.
    Singular,
    /// Factorization succeeded but the number of negative eigenvalues
    /// differs from the expected count.
    WrongInertia,
    /// No work was performed; the caller must supply the matrix values
    /// again and repeat the call.
    CallAgain,
    /// Backend failure, or workspace growth retries exhausted.
    FatalError,
}

impl SymSolverStatus {
    pub fn is_success(self) -> bool {
        matches!(self, SymSolverStatus::Success)
    }

    /// True for outcomes the caller can act on without abandoning the solver.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, SymSolverStatus::FatalError)
    }
}

impl fmt::Display for SymSolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SymSolverStatus::Success => "success",
            SymSolverStatus::Singular => "singular",
            SymSolverStatus::WrongInertia => "wrong inertia",
            SymSolverStatus::CallAgain => "call again",
            SymSolverStatus::FatalError => "fatal error",
        };
        f.write_str(s)
    }
}
