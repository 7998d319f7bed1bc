//! Adapter configuration.

use crate::error::{AdapterError, AdapterResult};

/// Default pivot tolerance. Small values pivot for sparsity, large values
/// pivot for stability.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-6;

/// Default ceiling for pivot tolerance escalation.
pub const DEFAULT_PIVOT_TOLERANCE_MAX: f64 = 0.1;

/// Default percentage added to the backend's workspace estimate.
pub const DEFAULT_MEMORY_GROWTH_PERCENT: u32 = 1000;

/// Number of times a factorization is repeated with a doubled workspace
/// after the backend reports that its workspace was too small.
pub const MAX_MEMORY_RETRIES: usize = 20;

/// Options recognised by [`SymmetricSolverAdapter::configure`](crate::SymmetricSolverAdapter::configure).
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterOptions {
    /// Pivot tolerance in `[0, 1]`
    pub pivot_tolerance: f64,

    /// Ceiling for escalation in `[pivot_tolerance, 1]`.
    /// `None` means not given explicitly: the default ceiling is used and
    /// raised to `pivot_tolerance` if necessary.
    pub pivot_tolerance_max: Option<f64>,

    /// Initial workspace over-allocation handed to the backend, in percent
    pub memory_growth_percent: u32,

    /// Reuse the previously analysed sparsity pattern without reanalysis
    pub warm_start_same_structure: bool,

    /// Workspace growth retries before giving up on a factorization
    pub max_memory_retries: usize,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
            pivot_tolerance_max: None,
            memory_growth_percent: DEFAULT_MEMORY_GROWTH_PERCENT,
            warm_start_same_structure: false,
            max_memory_retries: MAX_MEMORY_RETRIES,
        }
    }
}

impl AdapterOptions {
    /// Defaults overridden by `SYMSOLVE_*` environment variables.
    ///
    /// Recognised: `SYMSOLVE_PIVTOL`, `SYMSOLVE_PIVTOLMAX`,
    /// `SYMSOLVE_MEM_PERCENT`, `SYMSOLVE_WARM_START` (`1`/`true`),
    /// `SYMSOLVE_MAX_MEMORY_RETRIES`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let pivot_tolerance = std::env::var("SYMSOLVE_PIVTOL")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(defaults.pivot_tolerance);
        let pivot_tolerance_max = std::env::var("SYMSOLVE_PIVTOLMAX")
            .ok()
            .and_then(|s| s.parse::<f64>().ok());
        let memory_growth_percent = std::env::var("SYMSOLVE_MEM_PERCENT")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.memory_growth_percent);
        let warm_start_same_structure = std::env::var("SYMSOLVE_WARM_START")
            .ok()
            .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.warm_start_same_structure);
        let max_memory_retries = std::env::var("SYMSOLVE_MAX_MEMORY_RETRIES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_memory_retries);

        Self {
            pivot_tolerance,
            pivot_tolerance_max,
            memory_growth_percent,
            warm_start_same_structure,
            max_memory_retries,
        }
    }

    /// Check option ranges.
    pub fn validate(&self) -> AdapterResult<()> {
        self.pivot_tolerances().map(|_| ())
    }

    /// Check ranges and return the effective `(pivot_tolerance, pivot_tolerance_max)`.
    pub fn pivot_tolerances(&self) -> AdapterResult<(f64, f64)> {
        let tol = self.pivot_tolerance;
        if !(0.0..=1.0).contains(&tol) {
            return Err(AdapterError::InvalidOption {
                name: "pivot_tolerance",
                reason: format!("value {} must be between 0 and 1", tol),
            });
        }

        let tol_max = match self.pivot_tolerance_max {
            Some(max) => {
                if !(0.0..=1.0).contains(&max) || max < tol {
                    return Err(AdapterError::InvalidOption {
                        name: "pivot_tolerance_max",
                        reason: format!(
                            "value {} must be between pivot_tolerance ({}) and 1",
                            max, tol
                        ),
                    });
                }
                max
            }
            None => DEFAULT_PIVOT_TOLERANCE_MAX.max(tol),
        };

        Ok((tol, tol_max))
    }
}
