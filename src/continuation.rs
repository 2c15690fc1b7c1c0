//! One-shot resume handle handed to every step action.

use std::fmt;
use std::sync::Weak;

use crate::context::{Origin, Ticket};
use crate::sequencer::{Sequencer, Shared};

/// Advances the sequencer past the step it was created for.
///
/// A continuation may be cloned, stored and called from anywhere, but only the
/// first call made while its step is still current has an effect. Calls after
/// the sequencer moved on (a previous call, a skip, a cancel) are no-ops.
/// It holds only a weak handle, so it never keeps the sequencer alive.
pub struct Continuation<S> {
    shared: Weak<Shared<S>>,
    ticket: Ticket,
    snapshot: S,
}

impl<S> Continuation<S>
where
    S: Clone + Send + 'static,
{
    pub(crate) fn new(shared: Weak<Shared<S>>, ticket: Ticket, snapshot: S) -> Self {
        Self {
            shared,
            ticket,
            snapshot,
        }
    }

    /// Resume with the state the step was handed.
    pub fn resume(&self) {
        self.resume_with(self.snapshot.clone());
    }

    /// Resume with a new state.
    ///
    /// When called from inside a running action, the next step becomes
    /// current at once but its action is only invoked after the calling
    /// action returns. Code after the call therefore runs first.
    pub fn resume_with(&self, state: S) {
        if let Some(shared) = self.shared.upgrade() {
            Sequencer::from_shared(shared).advance(Origin::Resume(self.ticket), state);
        }
    }

    /// Ticket of the context this continuation belongs to.
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// State the step was handed.
    pub fn snapshot(&self) -> &S {
        &self.snapshot
    }

    /// Returns `true` while calling this continuation would still advance the
    /// sequencer.
    pub fn is_current(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| Sequencer::from_shared(shared).current_ticket() == Some(self.ticket))
    }
}

impl<S: Clone> Clone for Continuation<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
            ticket: self.ticket,
            snapshot: self.snapshot.clone(),
        }
    }
}

impl<S> fmt::Debug for Continuation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("ticket", &self.ticket)
            .finish_non_exhaustive()
    }
}
