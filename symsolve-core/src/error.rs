//! Usage and configuration errors.
//!
//! These describe contract violations between the caller and the adapter.
//! Numerical conditions are never reported here; they come back as a
//! [`SymSolverStatus`](crate::SymSolverStatus).

use thiserror::Error;

/// Errors raised by the solver adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    /// The backend rejected the initialization handshake.
    #[error("backend initialization failed with status {code}")]
    BackendInitialization {
        /// Raw status reported by the backend
        code: i32,
    },

    /// An option value is outside its admissible range.
    #[error("option \"{name}\": {reason}")]
    InvalidOption {
        /// Option name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Warm start requested before any structure was registered.
    #[error("warm_start_same_structure requested, but the problem is solved for the first time")]
    WarmStartWithoutStructure,

    /// Warm start requested with a structure of a different size.
    #[error(
        "warm_start_same_structure requested, but the problem size has changed \
         (dimension {expected_dimension} -> {dimension}, nonzeros {expected_nonzeros} -> {nonzeros})"
    )]
    WarmStartStructureChanged {
        expected_dimension: usize,
        dimension: usize,
        expected_nonzeros: usize,
        nonzeros: usize,
    },

    /// A structure with no rows cannot be registered.
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    /// A phase operation was called before `initialize_structure`.
    #[error("sparsity structure has not been initialized")]
    StructureNotInitialized,

    /// The index arrays passed to `multi_solve` are not the ones bound at
    /// structure initialization.
    #[error("index arrays differ from the ones bound at structure initialization")]
    PatternMismatch,

    /// Array length does not match the registered structure.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: &'static str,
    },

    /// Inertia check requested from a backend that does not compute it.
    #[error("inertia check requested, but backend {backend} does not report inertia")]
    InertiaUnavailable {
        /// Backend name
        backend: &'static str,
    },
}

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;
