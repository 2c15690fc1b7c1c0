//! Execution context identity.
//!
//! Every context the sequencer creates gets a fresh [`Ticket`]. Continuations
//! capture the ticket by value and are only honored while it is still the
//! current one, which is what makes resumes after a skip, a cancel or a
//! second call harmless.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::step::Step;

/// Generational identity of an execution context.
///
/// Tickets are allocated in increasing order and never reused by a sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticket(u64);

impl Ticket {
    pub(crate) const FIRST: Ticket = Ticket(1);

    /// Raw generation number.
    pub fn get(&self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Ticket {
        Ticket(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The step currently in flight and the state it was handed.
pub(crate) struct ExecutionContext<S> {
    pub(crate) ticket: Ticket,
    pub(crate) step: Arc<Step<S>>,
    pub(crate) state: S,
}

impl<S: Clone> Clone for ExecutionContext<S> {
    fn clone(&self) -> Self {
        Self {
            ticket: self.ticket,
            step: Arc::clone(&self.step),
            state: self.state.clone(),
        }
    }
}

/// Who is asking the sequencer to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// `start`: valid only while no context is current.
    Start,
    /// A continuation, valid only while its ticket is current.
    Resume(Ticket),
}

impl Origin {
    pub(crate) fn accepts(&self, current: Option<Ticket>) -> bool {
        match self {
            Origin::Start => current.is_none(),
            Origin::Resume(ticket) => current == Some(*ticket),
        }
    }
}
