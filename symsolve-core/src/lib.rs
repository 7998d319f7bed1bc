//! Symsolve: adaptive control for sparse symmetric-indefinite direct solvers
//!
//! This library wraps a sparse LDL^T-style backend behind a small phase
//! protocol used by interior point and other Newton-type methods:
//!
//! - **Structure setup**: register a triplet pattern once, analyse it once
//! - **Numeric factorization**: refill values, factorize, read the inertia
//! - **Solve**: any number of right-hand sides against the current factor
//!
//! On top of the backend the adapter adds pivot tolerance escalation with a
//! `CallAgain` handshake, bounded workspace growth on memory shortfalls,
//! inertia checking, and warm starts that reuse an analysed pattern.
//!
//! # Example
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use symsolve_core::{FaerLdlBackend, SymmetricSolverAdapter, SymSolverStatus};
//!
//! // K = [4 1 0; 1 -3 1; 0 1 2], lower triangle
//! let rows: Arc<[usize]> = Arc::from(vec![0, 1, 1, 2, 2]);
//! let cols: Arc<[usize]> = Arc::from(vec![0, 0, 1, 1, 2]);
//!
//! let mut solver = SymmetricSolverAdapter::with_tracing(FaerLdlBackend::new())?;
//! solver.initialize_structure(3, 5, rows.clone(), cols.clone())?;
//! solver.values_mut()?.copy_from_slice(&[4.0, 1.0, -3.0, 1.0, 2.0]);
//!
//! let mut rhs = vec![1.0, 0.0, 1.0];
//! let status = solver.multi_solve(true, &rows, &cols, 1, &mut rhs, Some(1))?;
//! assert_eq!(status, SymSolverStatus::Success);
//! assert_eq!(solver.number_of_negative_eigenvalues(), Some(1));
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)] // multi_solve mirrors the phase protocol

pub mod adapter;
pub mod error;
pub mod journal;
pub mod linalg;
pub mod logger;
pub mod options;
pub mod status;

pub use adapter::{AdapterStats, MatrixFormat, SymmetricSolverAdapter};
pub use error::{AdapterError, AdapterResult};
pub use journal::{Journal, JournalLevel, MemoryJournal, NullJournal, TracingJournal};
pub use linalg::backend::{Controls, Info, InfoCode, Job, Ordering, SymmetricBackend, TripletRef};
#[cfg(feature = "faer")]
pub use linalg::backends::FaerLdlBackend;
pub use linalg::session::{BackendSession, MatrixHandle};
pub use logger::{init_logger, init_logger_with_level};
pub use options::{AdapterOptions, MAX_MEMORY_RETRIES};
pub use status::SymSolverStatus;
