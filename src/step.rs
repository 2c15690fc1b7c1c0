//! Step data model and construction surface.
//!
//! A `Step` is one unit of queued work: an action that receives a
//! [`Continuation`] and the current state, an optional compensation that is
//! folded over the state when the step is skipped, and an optional guard that
//! can bypass the step entirely. Checkpoints are marker steps that only serve
//! as landing points for [`Sequencer::skip_to_checkpoint`].
//!
//! Steps are immutable once built; the sequencer only moves them around.
//!
//! [`Sequencer::skip_to_checkpoint`]: crate::Sequencer::skip_to_checkpoint

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::continuation::Continuation;
use crate::delay::Scheduler;

/// Action closure: receives the continuation for this dispatch and the state.
pub type Action<S> = Arc<dyn Fn(Continuation<S>, S) + Send + Sync>;

/// Compensation closure: folds the state when the step is skipped.
pub type Compensation<S> = Arc<dyn Fn(S) -> S + Send + Sync>;

/// Predicate re-evaluated every time a step or checkpoint is reached.
pub type Predicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// What a step does when it is reached.
pub(crate) enum StepKind<S> {
    /// Regular step with an action and an optional compensation.
    Action {
        action: Action<S>,
        compensation: Option<Compensation<S>>,
        guard: Option<Predicate>,
    },
    /// Transparent landing point for skip traversal.
    Checkpoint { active: Option<Predicate> },
}

/// A single unit of queued work.
pub struct Step<S> {
    pub(crate) kind: StepKind<S>,
    label: Option<Arc<str>>,
}

impl<S> Step<S>
where
    S: Clone + Send + 'static,
{
    /// Create a suspending step.
    ///
    /// The action must eventually call the continuation for the sequencer to
    /// move on; never calling it suspends the sequencer until it is skipped or
    /// cancelled. Skipping over the step leaves the state unchanged unless a
    /// compensation is set with [`Step::on_skipped`].
    pub fn new<F>(action: F) -> Self
    where
        F: Fn(Continuation<S>, S) + Send + Sync + 'static,
    {
        Self {
            kind: StepKind::Action {
                action: Arc::new(action),
                compensation: Some(Arc::new(|state| state)),
                guard: None,
            },
            label: None,
        }
    }

    /// Create a step that cannot be skipped over.
    ///
    /// A skip traversal that reaches this step stops with
    /// [`SkipError::MissingCompensation`](crate::SkipError::MissingCompensation).
    pub fn unskippable<F>(action: F) -> Self
    where
        F: Fn(Continuation<S>, S) + Send + Sync + 'static,
    {
        Self::new(action).without_compensation()
    }

    /// Create an immediate step: runs `effect` and resumes with the state
    /// unchanged. Skipping over it still runs `effect`.
    pub fn immediate<F>(effect: F) -> Self
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let effect = Arc::new(effect);
        let on_skip = Arc::clone(&effect);

        Self::new(move |resume, state| {
            effect(&state);
            resume.resume_with(state);
        })
        .on_skipped(move |state| {
            on_skip(&state);
            state
        })
    }

    /// Create a step that waits `delay` on `scheduler` before resuming.
    pub fn delay(scheduler: Arc<dyn Scheduler>, delay: Duration) -> Self {
        Self::new(move |resume, _| {
            scheduler.schedule_after(delay, Box::new(move || resume.resume()));
        })
    }

    /// Create a checkpoint that is always active.
    pub fn checkpoint() -> Self {
        Self {
            kind: StepKind::Checkpoint { active: None },
            label: None,
        }
    }

    /// Create a checkpoint that only stops a skip traversal while `active`
    /// returns `true`.
    pub fn checkpoint_when<P>(active: P) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            kind: StepKind::Checkpoint {
                active: Some(Arc::new(active)),
            },
            label: None,
        }
    }

    /// Set the compensation applied in place of the action during a skip.
    ///
    /// Has no effect on checkpoints.
    pub fn on_skipped<F>(mut self, compensation: F) -> Self
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        if let StepKind::Action {
            compensation: slot, ..
        } = &mut self.kind
        {
            *slot = Some(Arc::new(compensation));
        }
        self
    }

    /// Remove the compensation.
    pub fn without_compensation(mut self) -> Self {
        if let StepKind::Action {
            compensation: slot, ..
        } = &mut self.kind
        {
            *slot = None;
        }
        self
    }

    /// Gate the step on `guard`. A false guard bypasses both action and
    /// compensation and leaves the state unchanged.
    ///
    /// Has no effect on checkpoints; use [`Step::checkpoint_when`].
    pub fn when<P>(mut self, guard: P) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        if let StepKind::Action { guard: slot, .. } = &mut self.kind {
            *slot = Some(Arc::new(guard));
        }
        self
    }
}

impl<S> Step<S> {
    /// Attach a label used in diagnostics.
    pub fn named(mut self, label: impl Into<Arc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns `true` for checkpoint markers.
    pub fn is_checkpoint(&self) -> bool {
        matches!(self.kind, StepKind::Checkpoint { .. })
    }

    /// Returns `true` if a skip traversal can fold over this step.
    pub fn is_skippable(&self) -> bool {
        match &self.kind {
            StepKind::Action { compensation, .. } => compensation.is_some(),
            StepKind::Checkpoint { .. } => true,
        }
    }

    /// Evaluate the guard. Steps without a guard and checkpoints are always
    /// active here.
    pub(crate) fn is_active(&self) -> bool {
        match &self.kind {
            StepKind::Action { guard, .. } => guard.as_ref().map_or(true, |guard| guard()),
            StepKind::Checkpoint { .. } => true,
        }
    }
}

impl<S> fmt::Debug for Step<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Step");
        out.field("label", &self.label);
        match &self.kind {
            StepKind::Action {
                compensation,
                guard,
                ..
            } => out
                .field("checkpoint", &false)
                .field("skippable", &compensation.is_some())
                .field("guarded", &guard.is_some()),
            StepKind::Checkpoint { active } => out
                .field("checkpoint", &true)
                .field("guarded", &active.is_some()),
        };
        out.finish()
    }
}
