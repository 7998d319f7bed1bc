//! Adaptive control layer around a [`SymmetricBackend`].
//!
//! The adapter drives the backend through structure setup, symbolic
//! analysis, numeric factorization and solve, and adds the policy the
//! backend does not have:
//!
//! - pivot tolerance escalation on request ([`SymmetricSolverAdapter::increase_quality`]),
//!   with a `CallAgain` handshake so the caller re-supplies the values
//!   before the stale factorization is redone,
//! - bounded workspace growth when the backend underestimates its memory,
//! - translation of backend result codes into [`SymSolverStatus`],
//! - reuse of an analysed pattern across `configure` calls (warm start).
//!
//! Usage errors (pattern identity, shapes, warm-start preconditions) come
//! back as [`AdapterError`]. Numerical conditions come back as a status.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{AdapterError, AdapterResult};
use crate::journal::{Journal, JournalLevel, TracingJournal};
use crate::linalg::backend::{Controls, InfoCode, SymmetricBackend};
use crate::linalg::session::BackendSession;
use crate::options::AdapterOptions;
use crate::status::SymSolverStatus;

/// Matrix layout the adapter expects in its value buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixFormat {
    /// One triangle of a symmetric matrix in coordinate form. Either
    /// triangle is accepted; duplicate entries are summed.
    TripletSymmetric,
}

/// Adapter statistics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AdapterStats {
    /// Number of symbolic analyses performed.
    pub num_symbolic: usize,

    /// Number of backend numeric factorization invocations, retries included.
    pub num_numeric: usize,

    /// Number of single right-hand-side solves.
    pub num_solves: usize,

    /// Workspace growth retries.
    pub memory_retries: usize,

    /// Number of `CallAgain` responses.
    pub call_again: usize,

    /// Total time in symbolic analysis (seconds).
    pub time_symbolic: f64,

    /// Total time in numeric factorization (seconds).
    pub time_numeric: f64,

    /// Total time in solves (seconds).
    pub time_solve: f64,
}

/// Sparse symmetric-indefinite solver with adaptive pivoting and memory
/// control.
pub struct SymmetricSolverAdapter<B: SymmetricBackend> {
    session: BackendSession<B>,
    journal: Box<dyn Journal>,
    options: AdapterOptions,

    pivot_tolerance: f64,
    pivot_tolerance_max: f64,
    memory_growth_percent: u32,

    structure_initialized: bool,
    analysis_valid: bool,
    factorization_valid: bool,

    // Escalation requested, caller not yet told to re-supply values
    pivot_tolerance_changed: bool,
    force_refactorize: bool,

    negative_eigenvalues: Option<usize>,
    stats: AdapterStats,
}

impl<B: SymmetricBackend> SymmetricSolverAdapter<B> {
    /// Create the adapter and run the backend initialization handshake.
    pub fn new(backend: B, journal: impl Journal + 'static) -> AdapterResult<Self> {
        let session = match BackendSession::new(backend) {
            Ok(s) => s,
            Err(e) => {
                journal.log(JournalLevel::Error, format_args!("{}", e));
                return Err(e);
            }
        };

        let options = AdapterOptions::default();
        let (pivot_tolerance, pivot_tolerance_max) = options.pivot_tolerances()?;

        Ok(Self {
            session,
            journal: Box::new(journal),
            memory_growth_percent: options.memory_growth_percent,
            options,
            pivot_tolerance,
            pivot_tolerance_max,
            structure_initialized: false,
            analysis_valid: false,
            factorization_valid: false,
            pivot_tolerance_changed: false,
            force_refactorize: false,
            negative_eigenvalues: None,
            stats: AdapterStats::default(),
        })
    }

    /// Adapter logging through `tracing`.
    pub fn with_tracing(backend: B) -> AdapterResult<Self> {
        Self::new(backend, TracingJournal)
    }

    fn log(&self, level: JournalLevel, args: fmt::Arguments<'_>) {
        self.journal.log(level, args);
    }

    fn fail<T>(&self, err: AdapterError) -> AdapterResult<T> {
        self.log(JournalLevel::Error, format_args!("{}", err));
        Err(err)
    }

    /// Apply options.
    ///
    /// Without warm start the bound structure is forgotten and the next
    /// call must be [`initialize_structure`](Self::initialize_structure).
    /// With warm start a structure must already exist; it is kept as is.
    /// In both cases the pivot tolerance returns to the configured value
    /// and any pending escalation is dropped.
    pub fn configure(&mut self, options: &AdapterOptions) -> AdapterResult<()> {
        let (pivot_tolerance, pivot_tolerance_max) = match options.pivot_tolerances() {
            Ok(t) => t,
            Err(e) => return self.fail(e),
        };

        if options.warm_start_same_structure {
            let matrix = self.session.matrix();
            if matrix.dimension() == 0 || matrix.nonzeros() == 0 {
                return self.fail(AdapterError::WarmStartWithoutStructure);
            }
        } else {
            self.session.matrix_mut().clear();
            self.structure_initialized = false;
            self.analysis_valid = false;
            self.factorization_valid = false;
            self.negative_eigenvalues = None;
        }

        self.pivot_tolerance = pivot_tolerance;
        self.pivot_tolerance_max = pivot_tolerance_max;
        self.memory_growth_percent = options.memory_growth_percent;
        self.pivot_tolerance_changed = false;
        self.force_refactorize = false;
        self.options = options.clone();

        Ok(())
    }

    /// Register the sparsity pattern and run symbolic analysis.
    ///
    /// `rows` and `cols` hold `nonzeros` zero-based triplet indices. They are
    /// shared, not copied; [`multi_solve`](Self::multi_solve) must be called
    /// with these same arrays.
    ///
    /// Under warm start nothing is analysed: `(dimension, nonzeros)` must
    /// match the bound structure, which stays bound.
    pub fn initialize_structure(
        &mut self,
        dimension: usize,
        nonzeros: usize,
        rows: Arc<[usize]>,
        cols: Arc<[usize]>,
    ) -> AdapterResult<SymSolverStatus> {
        if self.options.warm_start_same_structure {
            let matrix = self.session.matrix();
            if matrix.dimension() != dimension || matrix.nonzeros() != nonzeros {
                let err = AdapterError::WarmStartStructureChanged {
                    expected_dimension: matrix.dimension(),
                    dimension,
                    expected_nonzeros: matrix.nonzeros(),
                    nonzeros,
                };
                return self.fail(err);
            }
            self.structure_initialized = true;
            return Ok(SymSolverStatus::Success);
        }

        if dimension == 0 {
            return self.fail(AdapterError::InvalidStructure(
                "dimension must be positive".to_string(),
            ));
        }
        if rows.len() != nonzeros {
            return self.fail(AdapterError::DimensionMismatch {
                expected: nonzeros,
                actual: rows.len(),
                context: "row indices",
            });
        }
        if cols.len() != nonzeros {
            return self.fail(AdapterError::DimensionMismatch {
                expected: nonzeros,
                actual: cols.len(),
                context: "column indices",
            });
        }

        self.session.matrix_mut().bind(dimension, rows, cols);
        self.structure_initialized = true;
        self.factorization_valid = false;
        self.negative_eigenvalues = None;

        Ok(self.symbolic_factorization())
    }

    /// Value buffer for the bound pattern, one entry per triplet.
    pub fn values_mut(&mut self) -> AdapterResult<&mut [f64]> {
        if !self.structure_initialized {
            return self.fail(AdapterError::StructureNotInitialized);
        }
        Ok(self.session.matrix_mut().values_mut())
    }

    /// Factorize (if needed) and solve for `rhs_count` right-hand sides.
    ///
    /// `rhs` holds `rhs_count` contiguous vectors of length `dimension()`
    /// and is overwritten with the solutions. `matrix_changed` says the
    /// value buffer was refilled since the last call. If
    /// `expected_negative_eigenvalues` is given, a factorization with a
    /// different inertia yields [`SymSolverStatus::WrongInertia`].
    pub fn multi_solve(
        &mut self,
        matrix_changed: bool,
        rows: &[usize],
        cols: &[usize],
        rhs_count: usize,
        rhs: &mut [f64],
        expected_negative_eigenvalues: Option<usize>,
    ) -> AdapterResult<SymSolverStatus> {
        if !self.structure_initialized {
            return self.fail(AdapterError::StructureNotInitialized);
        }
        if !self.session.matrix().is_bound_to(rows, cols) {
            return self.fail(AdapterError::PatternMismatch);
        }
        let n = self.session.matrix().dimension();
        let expected_len = rhs_count.checked_mul(n).unwrap_or(usize::MAX);
        if rhs.len() != expected_len {
            return self.fail(AdapterError::DimensionMismatch {
                expected: expected_len,
                actual: rhs.len(),
                context: "right-hand sides",
            });
        }
        if expected_negative_eigenvalues.is_some() && !self.provides_inertia() {
            let backend = self.session.backend().name();
            return self.fail(AdapterError::InertiaUnavailable { backend });
        }

        if self.pivot_tolerance_changed {
            self.pivot_tolerance_changed = false;
            // The factorization is stale under the new tolerance; ask for the
            // values again before redoing it.
            if !matrix_changed {
                self.force_refactorize = true;
                self.stats.call_again += 1;
                self.log(
                    JournalLevel::Detailed,
                    format_args!("Pivot tolerance has changed, asking caller to call again"),
                );
                return Ok(SymSolverStatus::CallAgain);
            }
        }

        if matrix_changed || self.force_refactorize || !self.factorization_valid {
            if !self.analysis_valid {
                let status = self.symbolic_factorization();
                if status != SymSolverStatus::Success {
                    return Ok(status);
                }
            }

            let status = self.numeric_factorization(expected_negative_eigenvalues);
            if status != SymSolverStatus::Success {
                return Ok(status);
            }
            self.force_refactorize = false;
        }

        Ok(self.back_solve(rhs_count, rhs))
    }

    fn symbolic_factorization(&mut self) -> SymSolverStatus {
        let start = Instant::now();

        *self.session.controls_mut() =
            Controls::for_analysis(self.memory_growth_percent, self.pivot_tolerance);
        let info = self.session.analyze();

        self.stats.num_symbolic += 1;
        self.stats.time_symbolic += start.elapsed().as_secs_f64();

        self.analysis_valid = false;
        self.factorization_valid = false;

        if info.code == InfoCode::STRUCTURALLY_SINGULAR {
            self.log(
                JournalLevel::Detailed,
                format_args!(
                    "Analysis returned status {}: matrix is structurally singular",
                    info.code
                ),
            );
            return SymSolverStatus::Singular;
        }
        if info.code.is_error() {
            self.log(
                JournalLevel::Error,
                format_args!("Error {} returned from {} in analysis phase", info.code, self.backend_name()),
            );
            return SymSolverStatus::FatalError;
        }
        if info.code.is_warning() {
            self.log(
                JournalLevel::Detailed,
                format_args!("Analysis returned warning {}", info.code),
            );
        }

        self.analysis_valid = true;
        SymSolverStatus::Success
    }

    fn numeric_factorization(&mut self, expected_negative_eigenvalues: Option<usize>) -> SymSolverStatus {
        let start = Instant::now();

        self.factorization_valid = false;
        self.session.controls_mut().pivot_threshold = self.pivot_tolerance;

        let mut info = self.session.factorize();
        self.stats.num_numeric += 1;

        let mut attempt = 0;
        while info.code.is_memory_shortfall() && attempt < self.options.max_memory_retries {
            attempt += 1;
            let old_percent = self.session.controls().workspace_percent;
            let new_percent = old_percent.saturating_mul(2).max(1);
            self.log(
                JournalLevel::Warning,
                format_args!(
                    "{} returned status {} and requires more memory, reallocating (attempt {}): \
                     workspace increase {}% -> {}%",
                    self.backend_name(),
                    info.code,
                    attempt,
                    old_percent,
                    new_percent
                ),
            );
            self.session.controls_mut().workspace_percent = new_percent;
            self.stats.memory_retries += 1;

            info = self.session.factorize();
            self.stats.num_numeric += 1;
        }

        self.stats.time_numeric += start.elapsed().as_secs_f64();

        if info.code.is_memory_shortfall() {
            self.log(
                JournalLevel::Error,
                format_args!(
                    "{} was not able to obtain enough memory after {} retries",
                    self.backend_name(),
                    attempt
                ),
            );
            return SymSolverStatus::FatalError;
        }
        if info.code.is_singular() {
            self.log(
                JournalLevel::Detailed,
                format_args!("{} returned status {}: matrix is singular", self.backend_name(), info.code),
            );
            return SymSolverStatus::Singular;
        }
        if info.code.is_error() {
            self.log(
                JournalLevel::Error,
                format_args!("{} returned status {} in factorization", self.backend_name(), info.code),
            );
            return SymSolverStatus::FatalError;
        }

        self.factorization_valid = true;
        self.negative_eigenvalues = info.negative_pivots;

        if let Some(expected) = expected_negative_eigenvalues {
            if info.negative_pivots != Some(expected) {
                self.log(
                    JournalLevel::Detailed,
                    format_args!(
                        "Wrong inertia: {} negative eigenvalues reported, {} expected",
                        info.negative_pivots
                            .map_or_else(|| "no count of".to_string(), |k| k.to_string()),
                        expected
                    ),
                );
                return SymSolverStatus::WrongInertia;
            }
        }

        SymSolverStatus::Success
    }

    fn back_solve(&mut self, rhs_count: usize, rhs: &mut [f64]) -> SymSolverStatus {
        let start = Instant::now();
        let n = self.session.matrix().dimension();
        let mut status = SymSolverStatus::Success;

        for (i, block) in rhs.chunks_mut(n).take(rhs_count).enumerate() {
            let info = self.session.solve(block);
            self.stats.num_solves += 1;
            if info.code.is_error() {
                self.log(
                    JournalLevel::Error,
                    format_args!(
                        "Error {} returned from {} in solve for right-hand side {}",
                        info.code,
                        self.backend_name(),
                        i
                    ),
                );
                status = SymSolverStatus::FatalError;
            }
        }

        self.stats.time_solve += start.elapsed().as_secs_f64();
        status
    }

    /// Raise the pivot tolerance towards its ceiling.
    ///
    /// Returns `false` without changing anything once the ceiling is reached.
    /// Otherwise the tolerance becomes `min(max, sqrt(tol))` and the next
    /// `multi_solve` without new values answers `CallAgain`.
    pub fn increase_quality(&mut self) -> bool {
        if self.pivot_tolerance == self.pivot_tolerance_max {
            return false;
        }
        self.pivot_tolerance_changed = true;

        let old = self.pivot_tolerance;
        // sqrt has fixpoints at 0 and just below 1
        let base = if old > 0.0 { old } else { f64::EPSILON };
        let mut next = self.pivot_tolerance_max.min(base.sqrt());
        if next <= old {
            next = self.pivot_tolerance_max;
        }
        self.pivot_tolerance = next;

        self.log(
            JournalLevel::Detailed,
            format_args!(
                "Increasing pivot tolerance for {} from {:7.2e} to {:7.2e}",
                self.backend_name(),
                old,
                self.pivot_tolerance
            ),
        );
        true
    }

    /// Negative eigenvalues reported by the last successful factorization.
    pub fn number_of_negative_eigenvalues(&self) -> Option<usize> {
        self.negative_eigenvalues
    }

    pub fn provides_inertia(&self) -> bool {
        self.session.backend().provides_inertia()
    }

    pub fn matrix_format(&self) -> MatrixFormat {
        MatrixFormat::TripletSymmetric
    }

    pub fn pivot_tolerance(&self) -> f64 {
        self.pivot_tolerance
    }

    pub fn pivot_tolerance_max(&self) -> f64 {
        self.pivot_tolerance_max
    }

    /// Dimension of the bound structure (0 if none).
    pub fn dimension(&self) -> usize {
        self.session.matrix().dimension()
    }

    /// Nonzeros of the bound structure (0 if none).
    pub fn nonzeros(&self) -> usize {
        self.session.matrix().nonzeros()
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    pub fn stats(&self) -> &AdapterStats {
        &self.stats
    }

    pub fn backend(&self) -> &B {
        self.session.backend()
    }

    pub fn backend_name(&self) -> &'static str {
        self.session.backend().name()
    }
}
