//! Batched recorder for values emitted by infrastructure wrappers.
//!
//! # Responsibility
//! - Record values in insertion order.
//! - Group records into batches whose boundaries are controlled by the owner.
//!
//! # Invariants
//! - `all_outputs()` is always closed batches flattened, followed by the open
//!   batch. Nothing is dropped or reordered.
//! - `end_batch()` is the only operation that closes a batch; it records an
//!   entry even when the open batch is empty.

use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Misuse of tracker read APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerError {
    /// Nothing has ever been added.
    EmptyHistory,
    /// `end_batch()` has never been called.
    NoClosedBatch,
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyHistory => write!(f, "output tracker has no recorded values"),
            Self::NoClosedBatch => write!(f, "output tracker has no closed batch"),
        }
    }
}

impl Error for TrackerError {}

#[derive(Debug)]
struct TrackerState<T> {
    batches: Vec<Vec<T>>,
    current: Vec<T>,
}

/// Shared recorder with explicit batch boundaries.
///
/// All methods take `&self`, so one tracker can be observed by tests while the
/// owning component keeps writing to it from several threads.
#[derive(Debug)]
pub struct OutputTracker<T> {
    state: Mutex<TrackerState<T>>,
}

impl<T> Default for OutputTracker<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                batches: Vec::new(),
                current: Vec::new(),
            }),
        }
    }
}

impl<T: Clone> OutputTracker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one value to the open batch.
    pub fn add(&self, value: T) {
        self.state.lock().current.push(value);
    }

    /// Closes the open batch and starts a fresh, empty one.
    pub fn end_batch(&self) {
        let mut state = self.state.lock();
        let closed = std::mem::take(&mut state.current);
        state.batches.push(closed);
    }

    /// Returns the most recently added value.
    ///
    /// # Errors
    /// - `TrackerError::EmptyHistory` when nothing was ever added.
    pub fn last_output(&self) -> Result<T, TrackerError> {
        let state = self.state.lock();
        state
            .current
            .last()
            .or_else(|| state.batches.iter().rev().find_map(|batch| batch.last()))
            .cloned()
            .ok_or(TrackerError::EmptyHistory)
    }

    /// Returns the most recently closed batch.
    ///
    /// # Errors
    /// - `TrackerError::NoClosedBatch` when `end_batch()` was never called.
    pub fn last_batch(&self) -> Result<Vec<T>, TrackerError> {
        self.state
            .lock()
            .batches
            .last()
            .cloned()
            .ok_or(TrackerError::NoClosedBatch)
    }

    /// Returns every recorded value, closed batches first, in insertion order.
    pub fn all_outputs(&self) -> Vec<T> {
        let state = self.state.lock();
        state
            .batches
            .iter()
            .flatten()
            .chain(state.current.iter())
            .cloned()
            .collect()
    }

    /// Returns closed batches only.
    pub fn batches(&self) -> Vec<Vec<T>> {
        self.state.lock().batches.clone()
    }

    /// Returns the values recorded since the last `end_batch()`.
    pub fn current_batch(&self) -> Vec<T> {
        self.state.lock().current.clone()
    }

    /// Forgets all history and the open batch.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.batches.clear();
        state.current.clear();
    }
}
