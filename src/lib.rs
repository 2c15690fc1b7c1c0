#![deny(missing_docs)]

//! Cadence — a cooperative step sequencer with pause, cancel and
//! skip-to-checkpoint.
//!
//! # Design Goals
//!
//! - **One step at a time**: steps run strictly in enqueue order, threading a
//!   state value from one to the next
//! - **Suspend freely**: a step advances by calling its continuation, now or
//!   whenever an external event arrives
//! - **Never double-advance**: continuations are bound to a generational
//!   ticket, so stale or repeated resumes are silently ignored
//!
//! # Core Concepts
//!
//! - [`Step`]: An action plus optional compensation and guard, or a checkpoint
//! - [`Continuation`]: One-shot handle that moves the sequencer past its step
//! - [`Sequencer`]: The engine (`start`, `pause`, `unpause`, `cancel`,
//!   `skip_to_checkpoint`)
//! - [`Scheduler`]: Host run loop used by delay steps
//!
//! # Example
//!
//! ```
//! use cadence::{Sequencer, SkipOutcome, Step};
//!
//! let seq = Sequencer::new();
//! seq.enqueue(Step::new(|resume, n: u32| resume.resume_with(n + 2)));
//! // Waits for user input that never comes.
//! seq.enqueue(Step::new(|_resume, _n: u32| {}).on_skipped(|n: u32| n + 100));
//! seq.enqueue(Step::checkpoint());
//! seq.enqueue(Step::immediate(|n: &u32| assert_eq!(*n, 110)));
//!
//! seq.start(8);
//! assert!(seq.in_progress());
//!
//! assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::CheckpointReached));
//! assert!(!seq.in_progress());
//! ```

#[macro_use]
mod macros;

pub mod context;
pub mod continuation;
pub mod delay;
pub mod error;
pub mod facade;
pub mod sequencer;
pub mod step;

pub use context::Ticket;
pub use continuation::Continuation;
#[cfg(feature = "tokio")]
pub use delay::TokioScheduler;
pub use delay::{Callback, ManualScheduler, Scheduler};
pub use error::SkipError;
pub use facade::{ActionQueue, SkippableActionQueue};
pub use sequencer::{Phase, Sequencer, SequencerId, SkipOutcome, Status};
pub use step::{Action, Compensation, Predicate, Step};

#[cfg(test)]
mod tests;
