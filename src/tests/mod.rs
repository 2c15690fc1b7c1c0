//! Behavioral tests for the sequencer.
//!
//! ## Test Organization
//!
//! - `common`: Shared recorders and step builders
//! - `basic`: Ordering, state threading, continuation identity
//! - `control`: Pause, unpause and cancel
//! - `skip`: Skip-to-checkpoint compensation fold
//! - `guard`: Guarded steps in dispatch and in skip
//! - `delay`: Delay steps on a scheduler
//! - `facade`: Typed convenience queues
//!
//! ## Features
//!
//! The `TokioScheduler` tests in `delay` are compiled only with the `tokio`
//! feature: run `cargo test --all-features` to include them.
//!
//! ## Fixtures
//!
//! Most tests use an `i32` state and steps that add to it, so the final value
//! shows exactly which actions and compensations ran.

mod common;

mod skip;
