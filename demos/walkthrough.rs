//! Tutorial walkthrough showing suspension, pause and skip-to-checkpoint.
//!
//! Run with: cargo run --example walkthrough

use std::sync::Arc;
use std::time::Duration;

use cadence::{Continuation, ManualScheduler, Scheduler, SkippableActionQueue, Step};
use parking_lot::Mutex;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Tutorial {
    coins: u32,
    lines_shown: u32,
}

/// Continuation of the step currently waiting for the player.
type Prompt = Arc<Mutex<Option<Continuation<Tutorial>>>>;

// ============================================================================
// Steps
// ============================================================================

fn say(line: &'static str) -> Step<Tutorial> {
    Step::new(move |resume, mut state: Tutorial| {
        println!("  [say] {line}");
        state.lines_shown += 1;
        resume.resume_with(state);
    })
    .on_skipped(|mut state| {
        state.lines_shown += 1;
        state
    })
}

fn wait_for_tap(prompt: &Prompt) -> Step<Tutorial> {
    let prompt = Arc::clone(prompt);
    Step::new(move |resume, _| {
        println!("  [tap] waiting for the player...");
        *prompt.lock() = Some(resume);
    })
}

fn grant(coins: u32) -> Step<Tutorial> {
    Step::new(move |resume, mut state: Tutorial| {
        println!("  [grant] +{coins} coins");
        state.coins += coins;
        resume.resume_with(state);
    })
    .on_skipped(move |mut state| {
        state.coins += coins;
        state
    })
}

fn tap(prompt: &Prompt) {
    if let Some(resume) = prompt.lock().take() {
        println!("  [tap] player tapped");
        resume.resume();
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║           Cadence Tutorial Walkthrough                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let clock = Arc::new(ManualScheduler::new());
    let scheduler: Arc<dyn Scheduler> = clock.clone();
    let prompt: Prompt = Arc::default();

    let queue: SkippableActionQueue<Tutorial> = SkippableActionQueue::new();
    queue.enqueue_step(say("Welcome, traveller."));
    queue.enqueue_delay(Arc::clone(&scheduler), Duration::from_secs(1));
    queue.enqueue_step(say("Tap anywhere to continue."));
    queue.enqueue_step(wait_for_tap(&prompt));
    queue.enqueue_step(grant(10));
    queue.enqueue_step(say("Here is a bag of coins."));
    queue.enqueue_step(wait_for_tap(&prompt));
    queue.enqueue_checkpoint();
    queue.enqueue_step(say("Let's go shopping."));
    queue.enqueue_step(wait_for_tap(&prompt));
    queue.enqueue_step(grant(5));
    let finished = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&finished);
    queue.enqueue_immediate(move |state: &Tutorial| *sink.lock() = Some(state.clone()));

    println!("┌──────────────────────────────────────────────────────────────┐");
    println!("│ Part 1: Run until the player is asked to tap                 │");
    println!("└──────────────────────────────────────────────────────────────┘\n");
    queue.start(Tutorial::default());
    clock.advance(Duration::from_secs(1));

    println!("\n┌──────────────────────────────────────────────────────────────┐");
    println!("│ Part 2: Pause, tap, unpause                                  │");
    println!("└──────────────────────────────────────────────────────────────┘\n");
    queue.pause();
    tap(&prompt);
    println!("  (paused: nothing happens yet)");
    queue.unpause();

    println!("\n┌──────────────────────────────────────────────────────────────┐");
    println!("│ Part 3: Player hits \"skip intro\"                             │");
    println!("└──────────────────────────────────────────────────────────────┘\n");
    match queue.skip_to_checkpoint() {
        Ok(outcome) => println!("  skip finished: {outcome:?}"),
        Err(err) => println!("  skip halted: {err}"),
    }

    println!("\n┌──────────────────────────────────────────────────────────────┐");
    println!("│ Part 4: Finish                                               │");
    println!("└──────────────────────────────────────────────────────────────┘\n");
    tap(&prompt);

    match finished.lock().take() {
        Some(state) => println!("\n  ✓ Tutorial finished: {state:?}"),
        None => println!("\n  ✗ Tutorial did not finish"),
    };
}
