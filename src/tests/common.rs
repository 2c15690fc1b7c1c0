//! Shared recorders and step builders for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Continuation, Step};

// ============================================================================
// Recorders
// ============================================================================

/// Thread-safe counter shared between a test and its steps.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ordered log of events.
#[derive(Debug, Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Slot holding the last value written by a step.
#[derive(Debug, Clone)]
pub struct Slot<T>(Arc<Mutex<Option<T>>>);

impl<T: Clone> Slot<T> {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    pub fn set(&self, value: T) {
        *self.0.lock() = Some(value);
    }

    pub fn get(&self) -> Option<T> {
        self.0.lock().clone()
    }

    pub fn take(&self) -> Option<T> {
        self.0.lock().take()
    }
}

// ============================================================================
// Step Builders
// ============================================================================

/// Counts a run and resumes immediately.
pub fn counting<S>(runs: &Counter) -> Step<S>
where
    S: Clone + Send + 'static,
{
    let runs = runs.clone();
    Step::new(move |resume, _| {
        runs.bump();
        resume.resume();
    })
}

/// Counts a run and never resumes.
pub fn stall<S>(runs: &Counter) -> Step<S>
where
    S: Clone + Send + 'static,
{
    let runs = runs.clone();
    Step::new(move |_, _| runs.bump())
}

/// Stores its continuation in `slot` and never resumes on its own.
pub fn hold<S>(slot: &Slot<Continuation<S>>) -> Step<S>
where
    S: Clone + Send + 'static,
{
    let slot = slot.clone();
    Step::new(move |resume, _| slot.set(resume))
}

/// Adds `n` to the state and resumes immediately.
pub fn add(n: i32) -> Step<i32> {
    Step::new(move |resume, state| resume.resume_with(state + n))
}

/// Records the state it receives and resumes.
pub fn capture<S>(slot: &Slot<S>) -> Step<S>
where
    S: Clone + Send + 'static,
{
    let slot = slot.clone();
    Step::new(move |resume, state: S| {
        slot.set(state);
        resume.resume();
    })
}

/// Counts a run, resumes immediately, and counts a skip in `skips`.
pub fn counting_skippable<S>(runs: &Counter, skips: &Counter) -> Step<S>
where
    S: Clone + Send + 'static,
{
    let skips = skips.clone();
    counting(runs).on_skipped(move |state| {
        skips.bump();
        state
    })
}

/// Never resumes; counts a skip in `skips`.
pub fn stall_skippable<S>(skips: &Counter) -> Step<S>
where
    S: Clone + Send + 'static,
{
    let skips = skips.clone();
    Step::new(|_, _| {}).on_skipped(move |state| {
        skips.bump();
        state
    })
}
