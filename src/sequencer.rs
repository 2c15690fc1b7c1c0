//! The sequencing engine.
//!
//! A [`Sequencer`] owns a FIFO queue of [`Step`]s and runs them one at a time,
//! threading a state value from step to step. Steps advance the sequencer by
//! calling the [`Continuation`] they were handed, synchronously or at any later
//! point. Pause, cancel and skip are out-of-band and take effect at the next
//! continuation boundary.
//!
//! # Locking
//!
//! All mutable engine state lives behind one `parking_lot::Mutex`. The lock is
//! never held while a caller closure runs, so actions, compensations, guards
//! and checkpoint predicates may freely call back into the control surface.
//!
//! # Dispatch
//!
//! Normal dispatch is trampolined. A continuation called while an action is
//! still on the stack performs the transition right away (the next step
//! becomes current) but leaves invoking its action to the outermost dispatch
//! loop. Long chains of synchronously resuming steps therefore run in
//! constant stack depth.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::{ExecutionContext, Origin, Ticket};
use crate::continuation::Continuation;
use crate::error::SkipError;
use crate::step::{Step, StepKind};

/// Unique identifier for a sequencer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequencerId(pub Uuid);

impl SequencerId {
    /// Create a new random sequencer ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SequencerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SequencerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse lifecycle phase of a sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Not started yet, or ran out of steps.
    Idle,
    /// A step is current.
    InProgress,
    /// Cancelled; nothing will run anymore.
    Cancelled,
}

/// Point-in-time snapshot of a sequencer, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Sequencer identity.
    pub id: SequencerId,
    /// Optional label.
    pub label: Option<String>,
    /// Lifecycle phase.
    pub phase: Phase,
    /// Whether the paused flag is set.
    pub paused: bool,
    /// Number of steps still queued behind the current one.
    pub queued: usize,
    /// Ticket of the current context, if any.
    pub current: Option<Ticket>,
}

/// How a skip traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipOutcome {
    /// Nothing was skipped: nothing was in progress, the call came from
    /// inside a running skip, or the sequencer moved on underneath it.
    Idle,
    /// An active checkpoint was reached and normal dispatch resumed from it.
    /// If the sequencer is paused, dispatch resumes on `unpause`.
    CheckpointReached,
    /// Every remaining step was folded; the sequencer is idle.
    Completed,
    /// The sequencer was cancelled during the traversal.
    Cancelled,
}

pub(crate) struct Shared<S> {
    id: SequencerId,
    label: Option<Arc<str>>,
    inner: Mutex<Inner<S>>,
}

struct Inner<S> {
    queue: VecDeque<Arc<Step<S>>>,
    current: Option<ExecutionContext<S>>,
    next_ticket: Ticket,
    paused: bool,
    cancelled: bool,
    /// Set while a compensation runs; continuations are ignored meanwhile.
    compensating: bool,
    /// Advance requested while paused, replayed on unpause.
    deferred: Option<(Origin, S)>,
    /// A dispatch loop is running further up the stack.
    dispatching: bool,
    /// Context whose action the dispatch loop still has to invoke.
    ready: Option<Ticket>,
}

impl<S> Inner<S> {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            current: None,
            next_ticket: Ticket::FIRST,
            paused: false,
            cancelled: false,
            compensating: false,
            deferred: None,
            dispatching: false,
            ready: None,
        }
    }

    fn current_ticket(&self) -> Option<Ticket> {
        self.current.as_ref().map(|context| context.ticket)
    }

    /// Make `step` current with a fresh ticket.
    fn enter(&mut self, step: Arc<Step<S>>, state: S) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket = ticket.next();
        self.current = Some(ExecutionContext {
            ticket,
            step,
            state,
        });
        ticket
    }
}

/// Cooperative step sequencer.
///
/// `Sequencer` is a cheap handle; clones share the same engine. Steps that
/// need to control their own sequencer can capture a clone.
pub struct Sequencer<S = ()> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for Sequencer<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> Default for Sequencer<S>
where
    S: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Sequencer<S>
where
    S: Clone + Send + 'static,
{
    /// Create an idle sequencer with an empty queue.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create an idle sequencer carrying `label` in its diagnostics.
    pub fn with_label(label: impl Into<Arc<str>>) -> Self {
        Self::build(Some(label.into()))
    }

    fn build(label: Option<Arc<str>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: SequencerId::new(),
                label,
                inner: Mutex::new(Inner::new()),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<Shared<S>>) -> Self {
        Self { shared }
    }

    // ------------------------------------------------------------------
    // Control surface
    // ------------------------------------------------------------------

    /// Append a step to the queue. Takes effect immediately, even mid-run.
    pub fn enqueue(&self, step: Step<S>) {
        self.shared.inner.lock().queue.push_back(Arc::new(step));
    }

    /// Start running queued steps with `initial` as the state.
    ///
    /// Does nothing while a step is in progress. With an empty queue the
    /// sequencer stays idle.
    pub fn start(&self, initial: S) {
        self.advance(Origin::Start, initial);
    }

    /// Defer the next transition until [`Sequencer::unpause`].
    ///
    /// A step whose action is already running is not interrupted.
    pub fn pause(&self) {
        self.shared.inner.lock().paused = true;
    }

    /// Clear the paused flag and replay a transition deferred while paused.
    pub fn unpause(&self) {
        let deferred = {
            let mut inner = self.shared.inner.lock();
            inner.paused = false;
            inner.deferred.take()
        };

        if let Some((origin, state)) = deferred {
            self.advance(origin, state);
        }
    }

    /// Cancel permanently.
    ///
    /// Every outstanding continuation becomes a no-op and a running skip
    /// traversal stops at its next check. There is no way to un-cancel.
    pub fn cancel(&self) {
        let mut inner = self.shared.inner.lock();
        inner.cancelled = true;
        inner.current = None;
        inner.deferred = None;
        inner.ready = None;

        #[cfg(feature = "tracing")]
        tracing::info!(sequencer = %self.shared.id, queued = inner.queue.len(), "sequencer.cancelled");
    }

    /// Fast-forward to the next active checkpoint.
    ///
    /// Starting from the current step, each step is folded over the state
    /// with its compensation instead of running its action. Guarded steps
    /// whose guard is false pass the state through untouched. Reaching an
    /// active checkpoint resumes normal dispatch from it; running out of
    /// steps leaves the sequencer idle.
    ///
    /// A step without compensation stops the traversal with
    /// [`SkipError::MissingCompensation`] and stays current, so a later
    /// resume of that step still works. Calling this from inside a
    /// compensation is ignored.
    pub fn skip_to_checkpoint(&self) -> Result<SkipOutcome, SkipError> {
        loop {
            // Continuations are ignored until this step has been folded.
            let ExecutionContext {
                ticket,
                step,
                state,
            } = {
                let mut inner = self.shared.inner.lock();
                if inner.compensating {
                    return Ok(SkipOutcome::Idle);
                }
                let Some(context) = inner.current.clone() else {
                    return Ok(SkipOutcome::Idle);
                };
                inner.compensating = true;
                context
            };

            let state = match &step.kind {
                StepKind::Checkpoint { active } => {
                    if active.as_ref().map_or(true, |active| active()) {
                        self.set_compensating(false);

                        #[cfg(feature = "tracing")]
                        tracing::info!(sequencer = %self.shared.id, %ticket, step = ?step.label(), "skip.checkpoint");

                        self.advance(Origin::Resume(ticket), state);
                        return Ok(SkipOutcome::CheckpointReached);
                    }
                    state
                }
                StepKind::Action { compensation, .. } => {
                    if !step.is_active() {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(sequencer = %self.shared.id, %ticket, step = ?step.label(), "skip.bypass");

                        state
                    } else if let Some(compensation) = compensation {
                        #[cfg(feature = "tracing")]
                        tracing::info!(sequencer = %self.shared.id, %ticket, step = ?step.label(), "skip.compensate");

                        compensation(state)
                    } else {
                        self.set_compensating(false);

                        #[cfg(feature = "tracing")]
                        tracing::error!(
                            sequencer = %self.shared.id,
                            %ticket,
                            step = ?step.label(),
                            "skip.missing_compensation: step cannot be skipped, traversal halted"
                        );

                        return Err(SkipError::MissingCompensation {
                            ticket,
                            step: step.label().map(str::to_owned),
                        });
                    }
                }
            };

            let mut inner = self.shared.inner.lock();
            inner.compensating = false;
            if inner.cancelled {
                return Ok(SkipOutcome::Cancelled);
            }
            if inner.current_ticket() != Some(ticket) {
                return Ok(SkipOutcome::Idle);
            }
            match inner.queue.pop_front() {
                Some(next) => {
                    inner.enter(next, state);
                }
                None => {
                    inner.current = None;
                    inner.ready = None;

                    #[cfg(feature = "tracing")]
                    tracing::info!(sequencer = %self.shared.id, "sequencer.completed");

                    return Ok(SkipOutcome::Completed);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Returns `true` while a step is current.
    pub fn in_progress(&self) -> bool {
        self.shared.inner.lock().current.is_some()
    }

    /// Returns `true` when no steps are queued behind the current one.
    pub fn is_empty(&self) -> bool {
        self.shared.inner.lock().queue.is_empty()
    }

    /// Number of steps queued behind the current one.
    pub fn len(&self) -> usize {
        self.shared.inner.lock().queue.len()
    }

    /// Returns `true` while the paused flag is set.
    pub fn is_paused(&self) -> bool {
        self.shared.inner.lock().paused
    }

    /// Returns `true` once [`Sequencer::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.shared.inner.lock().cancelled
    }

    /// Identity of this sequencer.
    pub fn id(&self) -> SequencerId {
        self.shared.id
    }

    /// Label given at construction.
    pub fn label(&self) -> Option<&str> {
        self.shared.label.as_deref()
    }

    /// Snapshot of the observable state.
    pub fn status(&self) -> Status {
        let inner = self.shared.inner.lock();
        let phase = if inner.cancelled {
            Phase::Cancelled
        } else if inner.current.is_some() {
            Phase::InProgress
        } else {
            Phase::Idle
        };
        Status {
            id: self.shared.id,
            label: self.shared.label.as_deref().map(str::to_owned),
            phase,
            paused: inner.paused,
            queued: inner.queue.len(),
            current: inner.current_ticket(),
        }
    }

    pub(crate) fn current_ticket(&self) -> Option<Ticket> {
        self.shared.inner.lock().current_ticket()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Move past the current step on behalf of `origin`.
    pub(crate) fn advance(&self, origin: Origin, state: S) {
        let mut inner = self.shared.inner.lock();

        if inner.cancelled || inner.compensating {
            return;
        }

        if !origin.accepts(inner.current_ticket()) {
            #[cfg(feature = "tracing")]
            tracing::debug!(sequencer = %self.shared.id, ?origin, "advance.ignored");

            return;
        }

        #[cfg(feature = "tracing")]
        if origin == Origin::Start {
            tracing::info!(sequencer = %self.shared.id, label = ?self.shared.label, "sequencer.start");
        }

        if inner.paused {
            inner.deferred = Some((origin, state));
            return;
        }

        // Checkpoints are transparent to normal dispatch.
        let ticket = loop {
            let Some(step) = inner.queue.pop_front() else {
                inner.current = None;
                inner.ready = None;

                #[cfg(feature = "tracing")]
                tracing::info!(sequencer = %self.shared.id, "sequencer.completed");

                return;
            };
            let is_checkpoint = step.is_checkpoint();
            let ticket = inner.enter(step, state.clone());
            if !is_checkpoint {
                break ticket;
            }
        };

        inner.ready = Some(ticket);
        if inner.dispatching {
            return;
        }
        inner.dispatching = true;
        drop(inner);

        self.dispatch();
    }

    /// Invoke ready actions until none is left.
    fn dispatch(&self) {
        loop {
            let mut inner = self.shared.inner.lock();
            let Some(ticket) = inner.ready.take() else {
                inner.dispatching = false;
                return;
            };
            let Some(context) = inner
                .current
                .as_ref()
                .filter(|context| context.ticket == ticket)
                .cloned()
            else {
                continue;
            };
            drop(inner);

            self.run(context);
        }
    }

    fn run(&self, context: ExecutionContext<S>) {
        let ExecutionContext {
            ticket,
            step,
            state,
        } = context;
        let StepKind::Action { action, .. } = &step.kind else {
            return;
        };

        if !step.is_active() {
            #[cfg(feature = "tracing")]
            tracing::debug!(sequencer = %self.shared.id, %ticket, step = ?step.label(), "step.bypass");

            self.advance(Origin::Resume(ticket), state);
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(sequencer = %self.shared.id, %ticket, step = ?step.label(), "step.dispatch");

        let resume = Continuation::new(Arc::downgrade(&self.shared), ticket, state.clone());
        action(resume, state);
    }

    fn set_compensating(&self, compensating: bool) {
        self.shared.inner.lock().compensating = compensating;
    }
}

impl<S> fmt::Debug for Sequencer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("Sequencer")
            .field("id", &self.shared.id)
            .field("label", &self.shared.label)
            .field("current", &inner.current_ticket())
            .field("queued", &inner.queue.len())
            .field("paused", &inner.paused)
            .field("cancelled", &inner.cancelled)
            .finish()
    }
}
