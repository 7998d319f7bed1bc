//! Backend session: the one context shared by every phase of an adapter.
//!
//! The session owns the backend, the matrix handle and the control block.
//! It runs the initialize job when created and the terminate job when
//! dropped.

use std::sync::Arc;

use super::backend::{Controls, Info, Job, SymmetricBackend, TripletRef};
use crate::error::{AdapterError, AdapterResult};

/// Matrix registered with the backend.
///
/// The index arrays are shared with the caller and never copied; the value
/// buffer belongs to the session.
#[derive(Debug, Default)]
pub struct MatrixHandle {
    n: usize,
    nz: usize,
    rows: Option<Arc<[usize]>>,
    cols: Option<Arc<[usize]>>,
    values: Vec<f64>,
}

impl MatrixHandle {
    pub fn dimension(&self) -> usize {
        self.n
    }

    pub fn nonzeros(&self) -> usize {
        self.nz
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Bind a new pattern and allocate a fresh value buffer of `nz` entries.
    pub fn bind(&mut self, n: usize, rows: Arc<[usize]>, cols: Arc<[usize]>) {
        let nz = rows.len();
        self.n = n;
        self.nz = nz;
        self.rows = Some(rows);
        self.cols = Some(cols);
        self.values = vec![0.0; nz];
    }

    /// Forget the pattern and release the value buffer.
    pub fn clear(&mut self) {
        self.n = 0;
        self.nz = 0;
        self.rows = None;
        self.cols = None;
        self.values = Vec::new();
    }

    /// Identity check: same arrays (address and length), not equal contents.
    pub fn is_bound_to(&self, rows: &[usize], cols: &[usize]) -> bool {
        match (&self.rows, &self.cols) {
            (Some(r), Some(c)) => {
                std::ptr::eq(r.as_ptr(), rows.as_ptr())
                    && r.len() == rows.len()
                    && std::ptr::eq(c.as_ptr(), cols.as_ptr())
                    && c.len() == cols.len()
            }
            _ => false,
        }
    }

    pub fn as_triplets(&self) -> TripletRef<'_> {
        TripletRef {
            n: self.n,
            rows: self.rows.as_deref().unwrap_or(&[]),
            cols: self.cols.as_deref().unwrap_or(&[]),
            values: &self.values,
        }
    }
}

/// Owned backend context with job bookkeeping.
pub struct BackendSession<B: SymmetricBackend> {
    backend: B,
    job: Job,
    matrix: MatrixHandle,
    controls: Controls,
    initialized: bool,
}

impl<B: SymmetricBackend> BackendSession<B> {
    /// Create the session and run the initialize handshake.
    pub fn new(backend: B) -> AdapterResult<Self> {
        let mut session = Self {
            backend,
            job: Job::Idle,
            matrix: MatrixHandle::default(),
            controls: Controls::default(),
            initialized: false,
        };

        session.job = Job::Initialize;
        let info = session.backend.initialize();
        session.job = Job::Idle;
        if info.code.is_error() {
            return Err(AdapterError::BackendInitialization { code: info.code.0 });
        }
        session.initialized = true;

        Ok(session)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Last job issued after the handshake, `Idle` until the first one.
    pub fn job(&self) -> Job {
        self.job
    }

    pub fn matrix(&self) -> &MatrixHandle {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut MatrixHandle {
        &mut self.matrix
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut Controls {
        &mut self.controls
    }

    pub fn analyze(&mut self) -> Info {
        self.job = Job::Analyze;
        self.backend.analyze(self.matrix.as_triplets(), &self.controls)
    }

    pub fn factorize(&mut self) -> Info {
        self.job = Job::Factorize;
        self.backend.factorize(self.matrix.as_triplets(), &self.controls)
    }

    /// Solve in place for one right-hand side.
    pub fn solve(&mut self, rhs: &mut [f64]) -> Info {
        self.job = Job::Solve;
        self.backend.solve(rhs, &self.controls)
    }
}

impl<B: SymmetricBackend> Drop for BackendSession<B> {
    fn drop(&mut self) {
        if self.initialized {
            self.job = Job::Terminate;
            self.backend.terminate();
            self.initialized = false;
        }
        self.matrix.clear();
    }
}
