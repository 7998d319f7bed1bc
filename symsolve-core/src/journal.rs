//! Logging capability handed to the adapter at construction.
//!
//! The adapter never logs through a global; it writes to whatever
//! [`Journal`] it was given. [`TracingJournal`] forwards to `tracing`,
//! [`MemoryJournal`] keeps the messages for inspection.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a journal message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JournalLevel {
    /// Fatal backend conditions
    Error,
    /// Recovered problems, e.g. workspace reallocation
    Warning,
    /// Phase-level progress
    Summary,
    /// Expected numerical conditions (singular matrix, wrong inertia)
    Detailed,
}

/// Severity-tagged message sink.
pub trait Journal {
    fn log(&self, level: JournalLevel, args: fmt::Arguments<'_>);
}

impl<J: Journal + ?Sized> Journal for Box<J> {
    fn log(&self, level: JournalLevel, args: fmt::Arguments<'_>) {
        (**self).log(level, args)
    }
}

impl<J: Journal + ?Sized> Journal for Arc<J> {
    fn log(&self, level: JournalLevel, args: fmt::Arguments<'_>) {
        (**self).log(level, args)
    }
}

/// Target used for every event emitted by [`TracingJournal`].
pub const LOG_TARGET: &str = "symsolve::linear_algebra";

/// Forwards journal messages to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingJournal;

impl Journal for TracingJournal {
    fn log(&self, level: JournalLevel, args: fmt::Arguments<'_>) {
        match level {
            JournalLevel::Error => tracing::error!(target: LOG_TARGET, "{}", args),
            JournalLevel::Warning => tracing::warn!(target: LOG_TARGET, "{}", args),
            JournalLevel::Summary => tracing::info!(target: LOG_TARGET, "{}", args),
            JournalLevel::Detailed => tracing::debug!(target: LOG_TARGET, "{}", args),
        }
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullJournal;

impl Journal for NullJournal {
    fn log(&self, _level: JournalLevel, _args: fmt::Arguments<'_>) {}
}

/// Keeps messages in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemoryJournal {
    entries: Arc<Mutex<Vec<(JournalLevel, String)>>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all messages logged so far.
    pub fn entries(&self) -> Vec<(JournalLevel, String)> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages logged at exactly `level`.
    pub fn messages(&self, level: JournalLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn clear(&self) {
        match self.entries.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl Journal for MemoryJournal {
    fn log(&self, level: JournalLevel, args: fmt::Arguments<'_>) {
        let msg = args.to_string();
        match self.entries.lock() {
            Ok(mut guard) => guard.push((level, msg)),
            Err(poisoned) => poisoned.into_inner().push((level, msg)),
        }
    }
}
