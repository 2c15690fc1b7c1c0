//! Error types.

use crate::context::Ticket;

/// Errors reported by [`Sequencer::skip_to_checkpoint`](crate::Sequencer::skip_to_checkpoint).
///
/// These are configuration defects in how steps were registered, not runtime
/// failures: the sequencer is left exactly where the traversal stopped and
/// normal dispatch can still complete the offending step.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipError {
    /// The traversal reached a step that has no compensation.
    #[error("step {ticket} ({}) has no compensation and cannot be skipped", .step.as_deref().unwrap_or("unnamed"))]
    MissingCompensation {
        /// Ticket of the offending step's context; still current.
        ticket: Ticket,
        /// Label of the offending step, if it has one.
        step: Option<String>,
    },
}
