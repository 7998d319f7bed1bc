//! Scripted backend shared by the integration tests.
//!
//! Records every job it receives and replays queued result codes. When a
//! queue is empty the job succeeds; factorization then reports
//! `default_negative_pivots`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use symsolve_core::{Controls, Info, InfoCode, Job, SymmetricBackend, TripletRef};

#[derive(Debug, Default)]
pub struct Script {
    pub jobs: Vec<Job>,
    pub init_code: InfoCode,
    pub analyze_codes: VecDeque<InfoCode>,
    pub factorize_results: VecDeque<Info>,
    pub solve_codes: VecDeque<InfoCode>,
    pub default_negative_pivots: usize,
    pub provides_inertia: bool,
    /// `workspace_percent` seen by each factorize job
    pub workspace: Vec<u32>,
    /// `pivot_threshold` seen by each factorize job
    pub pivot_thresholds: Vec<f64>,
    /// Values seen by each factorize job
    pub factorized_values: Vec<Vec<f64>>,
}

impl Script {
    pub fn count(&self, job: Job) -> usize {
        self.jobs.iter().filter(|&&j| j == job).count()
    }

    pub fn clear_jobs(&mut self) {
        self.jobs.clear();
    }
}

/// Backend whose behavior is driven by a shared [`Script`].
pub struct ScriptedBackend {
    pub script: Rc<RefCell<Script>>,
}

impl ScriptedBackend {
    pub fn new() -> (Self, Rc<RefCell<Script>>) {
        let script = Rc::new(RefCell::new(Script {
            provides_inertia: true,
            ..Script::default()
        }));
        (
            Self {
                script: script.clone(),
            },
            script,
        )
    }
}

impl SymmetricBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn provides_inertia(&self) -> bool {
        self.script.borrow().provides_inertia
    }

    fn initialize(&mut self) -> Info {
        let mut s = self.script.borrow_mut();
        s.jobs.push(Job::Initialize);
        Info::with_code(s.init_code)
    }

    fn analyze(&mut self, _matrix: TripletRef<'_>, _controls: &Controls) -> Info {
        let mut s = self.script.borrow_mut();
        s.jobs.push(Job::Analyze);
        Info::with_code(s.analyze_codes.pop_front().unwrap_or(InfoCode::SUCCESS))
    }

    fn factorize(&mut self, matrix: TripletRef<'_>, controls: &Controls) -> Info {
        let mut s = self.script.borrow_mut();
        s.jobs.push(Job::Factorize);
        s.workspace.push(controls.workspace_percent);
        s.pivot_thresholds.push(controls.pivot_threshold);
        s.factorized_values.push(matrix.values.to_vec());
        let default = Info::factorized(s.default_negative_pivots);
        s.factorize_results.pop_front().unwrap_or(default)
    }

    fn solve(&mut self, rhs: &mut [f64], _controls: &Controls) -> Info {
        let mut s = self.script.borrow_mut();
        s.jobs.push(Job::Solve);
        for v in rhs.iter_mut() {
            *v *= 2.0;
        }
        Info::with_code(s.solve_codes.pop_front().unwrap_or(InfoCode::SUCCESS))
    }

    fn terminate(&mut self) {
        self.script.borrow_mut().jobs.push(Job::Terminate);
    }
}

/// Pattern of a 3x3 tridiagonal-like matrix with 4 stored entries:
/// (0,0), (1,0), (1,1), (2,2).
pub fn tridiagonal_pattern() -> (Arc<[usize]>, Arc<[usize]>) {
    (Arc::from(vec![0, 1, 1, 2]), Arc::from(vec![0, 0, 1, 2]))
}

/// Diagonal pattern of dimension `n`.
pub fn diagonal_pattern(n: usize) -> (Arc<[usize]>, Arc<[usize]>) {
    let idx: Vec<usize> = (0..n).collect();
    (Arc::from(idx.clone()), Arc::from(idx))
}
