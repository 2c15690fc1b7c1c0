//! Typed convenience queues over [`Sequencer`].
//!
//! [`ActionQueue`] is the plain variant: steps run in order and there is no
//! way to skip them. [`SkippableActionQueue`] adds compensations, checkpoints
//! and [`SkippableActionQueue::skip_to_checkpoint`]. Both are thin wrappers;
//! the state arity is whatever `S` is (`()`, a single value, a tuple).

use std::sync::Arc;
use std::time::Duration;

use crate::continuation::Continuation;
use crate::delay::Scheduler;
use crate::error::SkipError;
use crate::sequencer::{Sequencer, SkipOutcome};
use crate::step::Step;

/// Action queue without skip support.
pub struct ActionQueue<S = ()> {
    sequencer: Sequencer<S>,
}

control_surface!(ActionQueue);

impl<S> ActionQueue<S>
where
    S: Clone + Send + 'static,
{
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a suspending action.
    pub fn enqueue<F>(&self, action: F)
    where
        F: Fn(Continuation<S>, S) + Send + Sync + 'static,
    {
        self.sequencer.enqueue(Step::unskippable(action));
    }

    /// Queue a suspending action that only runs while `guard` holds.
    pub fn enqueue_when<F, P>(&self, action: F, guard: P)
    where
        F: Fn(Continuation<S>, S) + Send + Sync + 'static,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.sequencer.enqueue(Step::unskippable(action).when(guard));
    }

    /// Queue a side effect that resumes immediately.
    pub fn enqueue_immediate<F>(&self, effect: F)
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.sequencer.enqueue(Step::immediate(effect));
    }

    /// Queue a wait of `delay` on `scheduler`.
    pub fn enqueue_delay(&self, scheduler: Arc<dyn Scheduler>, delay: Duration) {
        self.sequencer.enqueue(Step::delay(scheduler, delay));
    }

    /// Like [`ActionQueue::enqueue_immediate`], gated on `guard`.
    pub fn enqueue_immediate_when<F, P>(&self, effect: F, guard: P)
    where
        F: Fn(&S) + Send + Sync + 'static,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.sequencer.enqueue(Step::immediate(effect).when(guard));
    }

    /// Like [`ActionQueue::enqueue_delay`], gated on `guard`.
    pub fn enqueue_delay_when<P>(&self, scheduler: Arc<dyn Scheduler>, delay: Duration, guard: P)
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.sequencer.enqueue(Step::delay(scheduler, delay).when(guard));
    }
}

/// Action queue with compensations and checkpoints.
pub struct SkippableActionQueue<S = ()> {
    sequencer: Sequencer<S>,
}

control_surface!(SkippableActionQueue);

impl<S> SkippableActionQueue<S>
where
    S: Clone + Send + 'static,
{
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a suspending action with the compensation applied when it is
    /// skipped.
    pub fn enqueue<F, C>(&self, action: F, on_skipped: C)
    where
        F: Fn(Continuation<S>, S) + Send + Sync + 'static,
        C: Fn(S) -> S + Send + Sync + 'static,
    {
        self.sequencer.enqueue(Step::new(action).on_skipped(on_skipped));
    }

    /// Queue a suspending action that leaves the state untouched when skipped.
    pub fn enqueue_passthrough<F>(&self, action: F)
    where
        F: Fn(Continuation<S>, S) + Send + Sync + 'static,
    {
        self.sequencer.enqueue(Step::new(action));
    }

    /// Like [`SkippableActionQueue::enqueue`], gated on `guard`.
    pub fn enqueue_when<F, C, P>(&self, action: F, on_skipped: C, guard: P)
    where
        F: Fn(Continuation<S>, S) + Send + Sync + 'static,
        C: Fn(S) -> S + Send + Sync + 'static,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.sequencer
            .enqueue(Step::new(action).on_skipped(on_skipped).when(guard));
    }

    /// Queue a side effect that resumes immediately. Skipping still runs it.
    pub fn enqueue_immediate<F>(&self, effect: F)
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.sequencer.enqueue(Step::immediate(effect));
    }

    /// Queue a wait of `delay` on `scheduler`. Skipping drops the wait.
    pub fn enqueue_delay(&self, scheduler: Arc<dyn Scheduler>, delay: Duration) {
        self.sequencer.enqueue(Step::delay(scheduler, delay));
    }

    /// Like [`SkippableActionQueue::enqueue_immediate`], gated on `guard`.
    /// A false guard also keeps the effect from running on skip.
    pub fn enqueue_immediate_when<F, P>(&self, effect: F, guard: P)
    where
        F: Fn(&S) + Send + Sync + 'static,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.sequencer.enqueue(Step::immediate(effect).when(guard));
    }

    /// Like [`SkippableActionQueue::enqueue_delay`], gated on `guard`.
    pub fn enqueue_delay_when<P>(&self, scheduler: Arc<dyn Scheduler>, delay: Duration, guard: P)
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.sequencer.enqueue(Step::delay(scheduler, delay).when(guard));
    }

    /// Queue a checkpoint.
    pub fn enqueue_checkpoint(&self) {
        self.sequencer.enqueue(Step::checkpoint());
    }

    /// Queue a checkpoint that only stops a skip while `active` holds.
    pub fn enqueue_checkpoint_when<P>(&self, active: P)
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.sequencer.enqueue(Step::checkpoint_when(active));
    }

    /// Fast-forward to the next active checkpoint.
    ///
    /// See [`Sequencer::skip_to_checkpoint`].
    pub fn skip_to_checkpoint(&self) -> Result<SkipOutcome, SkipError> {
        self.sequencer.skip_to_checkpoint()
    }
}
