//! Skip-to-checkpoint compensation fold.

use crate::{sequence, Continuation, Sequencer, SkipError, SkipOutcome, Step};

use super::common::{
    capture, counting, counting_skippable, hold, stall_skippable, Counter, Log, Slot,
};

/// Skipped steps run their compensation, never their action.
#[test]
fn skipped_steps_compensate_instead_of_running() {
    let runs = Counter::new();
    let skips = Counter::new();
    let seq: Sequencer<()> = sequence![
        stall_skippable(&skips),
        counting_skippable(&runs, &skips),
        counting_skippable(&runs, &skips),
        Step::checkpoint(),
        counting_skippable(&runs, &skips),
    ];

    seq.start(());
    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::CheckpointReached));

    assert_eq!(skips.get(), 3);
    assert_eq!(runs.get(), 1);
    assert!(!seq.in_progress());
}

/// Without a checkpoint every remaining step is folded.
#[test]
fn everything_is_skipped_without_checkpoint() {
    let runs = Counter::new();
    let skips = Counter::new();
    let seq: Sequencer<()> = sequence![
        stall_skippable(&skips),
        counting_skippable(&runs, &skips),
        counting_skippable(&runs, &skips),
        counting_skippable(&runs, &skips),
    ];

    seq.start(());
    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::Completed));

    assert_eq!(skips.get(), 4);
    assert_eq!(runs.get(), 0);
    assert!(!seq.in_progress());
}

/// Each skip stops at the next checkpoint.
#[test]
fn repeated_skips_walk_checkpoints() {
    let runs = Counter::new();
    let skips = Counter::new();
    let seq: Sequencer<()> = sequence![
        stall_skippable(&skips),
        counting_skippable(&runs, &skips),
        Step::checkpoint(),
        stall_skippable(&skips),
        counting_skippable(&runs, &skips),
        counting_skippable(&runs, &skips),
        Step::checkpoint(),
        stall_skippable(&skips),
        counting_skippable(&runs, &skips),
        counting_skippable(&runs, &skips),
        counting_skippable(&runs, &skips),
    ];

    seq.start(());

    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::CheckpointReached));
    assert_eq!((skips.get(), runs.get()), (2, 0));

    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::CheckpointReached));
    assert_eq!((skips.get(), runs.get()), (5, 0));

    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::Completed));
    assert_eq!((skips.get(), runs.get()), (9, 0));
}

/// Immediate steps still perform their effect when skipped.
#[test]
fn immediate_steps_run_their_effect_when_skipped() {
    let log = Log::new();
    let effect_log = log.clone();
    let seq: Sequencer<()> = sequence![
        Step::new(|_, _| {}),
        Step::new(|resume, _| resume.resume()),
        Step::immediate(move |_| effect_log.push("effect")),
        Step::new(|resume, _| resume.resume()),
    ];

    seq.start(());
    assert!(log.entries().is_empty());

    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::Completed));
    assert_eq!(log.entries(), vec!["effect"]);
}

/// The compensation fold and the checkpoint resume produce 0 -> 1 -> 1 -> 4.
///
/// S1 adds 1 when compensated, S2 has the default identity compensation,
/// S3 runs normally after the checkpoint and adds 3.
#[test]
fn fold_then_resume_from_checkpoint() {
    let result = Slot::new();
    let seq = sequence![
        Step::new(|_, _: i32| {}).on_skipped(|n| n + 1),
        Step::new(|resume, n: i32| resume.resume_with(n + 2)),
        Step::checkpoint(),
        Step::new(|resume, n: i32| resume.resume_with(n + 3)),
        capture(&result),
    ];

    seq.start(0);
    assert_eq!(result.get(), None);

    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::CheckpointReached));
    assert_eq!(result.get(), Some(4));
}

/// Continuations of skipped steps are dead.
#[test]
fn skip_invalidates_old_continuations() {
    let held: Slot<Continuation<()>> = Slot::new();
    let runs = Counter::new();
    let skips = Counter::new();

    let hold_and_count = {
        let skips = skips.clone();
        hold(&held).on_skipped(move |state| {
            skips.bump();
            state
        })
    };
    let seq: Sequencer<()> = sequence![
        hold_and_count,
        counting_skippable(&runs, &skips),
        Step::checkpoint(),
        stall_skippable(&skips),
        counting_skippable(&runs, &skips),
    ];

    seq.start(());
    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::CheckpointReached));
    assert_eq!((skips.get(), runs.get()), (2, 0));

    let stale = held.take().expect("continuation should be held");
    assert!(!stale.is_current());
    stale.resume();
    assert_eq!((skips.get(), runs.get()), (2, 0));

    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::Completed));
    assert_eq!((skips.get(), runs.get()), (4, 0));
}

/// A compensation that calls its own step's continuation does not advance.
#[test]
fn resume_during_compensation_is_ignored() {
    let held: Slot<Continuation<()>> = Slot::new();
    let runs = Counter::new();
    let skips = Counter::new();

    let resume_on_skip = {
        let held = held.clone();
        let skips = skips.clone();
        hold(&held.clone()).on_skipped(move |state| {
            if let Some(resume) = held.get() {
                resume.resume();
            }
            skips.bump();
            state
        })
    };
    let seq: Sequencer<()> = sequence![
        counting_skippable(&runs, &skips),
        resume_on_skip,
        counting_skippable(&runs, &skips),
        counting_skippable(&runs, &skips),
    ];

    seq.start(());
    assert_eq!(runs.get(), 1);

    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::Completed));
    assert_eq!(runs.get(), 1);
    assert_eq!(skips.get(), 3);
}

/// A guard that resumes an old continuation during the fold cannot advance.
#[test]
fn resume_from_guard_during_skip_is_ignored() {
    let held: Slot<Continuation<()>> = Slot::new();
    let runs = Counter::new();
    let skips = Counter::new();
    let after = Counter::new();

    let resuming_guard = {
        let held = held.clone();
        move || {
            if let Some(resume) = held.get() {
                resume.resume();
            }
            true
        }
    };
    let seq: Sequencer<()> = sequence![
        hold(&held).when(resuming_guard),
        counting_skippable(&runs, &skips),
        Step::checkpoint(),
        counting(&after),
    ];

    seq.start(());
    assert!(held.get().is_some());

    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::CheckpointReached));
    assert_eq!((runs.get(), skips.get()), (0, 1));
    assert_eq!(after.get(), 1);
}

/// A resume delivered from another thread mid-fold is ignored as well.
#[test]
fn resume_from_other_thread_during_skip_is_ignored() {
    let held: Slot<Continuation<i32>> = Slot::new();
    let result = Slot::new();

    let resume_elsewhere = {
        let held = held.clone();
        move |state: i32| {
            if let Some(resume) = held.get() {
                std::thread::spawn(move || resume.resume_with(1000))
                    .join()
                    .expect("resuming thread should finish");
            }
            state + 1
        }
    };
    let seq = sequence![
        hold(&held).on_skipped(resume_elsewhere),
        Step::new(|resume, n: i32| resume.resume_with(n + 50)).on_skipped(|n| n + 2),
        Step::checkpoint(),
        capture(&result),
    ];

    seq.start(0);
    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::CheckpointReached));

    assert_eq!(result.get(), Some(3));
    assert!(!seq.in_progress());
}

/// Skipping while paused folds steps but waits for unpause to dispatch.
#[test]
fn skip_while_paused_keeps_pause() {
    let runs = Counter::new();
    let skips = Counter::new();
    let seq: Sequencer<()> = sequence![
        stall_skippable(&skips),
        counting_skippable(&runs, &skips),
        Step::checkpoint(),
        counting_skippable(&runs, &skips),
    ];

    seq.start(());
    seq.pause();

    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::CheckpointReached));
    assert_eq!((skips.get(), runs.get()), (2, 0));
    assert!(seq.is_paused());
    assert!(seq.in_progress());

    seq.unpause();
    assert_eq!((skips.get(), runs.get()), (2, 1));
    assert!(!seq.is_paused());
}

/// Nothing happens after cancel.
#[test]
fn skip_after_cancel_is_idle() {
    let skips = Counter::new();
    let seq: Sequencer<()> = sequence![stall_skippable(&skips), stall_skippable(&skips)];

    seq.start(());
    seq.cancel();

    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::Idle));
    assert_eq!(skips.get(), 0);
}

/// Skipping before start is idle.
#[test]
fn skip_before_start_is_idle() {
    let skips = Counter::new();
    let seq: Sequencer<()> = sequence![stall_skippable(&skips)];

    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::Idle));
    assert_eq!(skips.get(), 0);
    assert_eq!(seq.len(), 1);
}

/// A compensation that cancels halts the fold right after it.
#[test]
fn cancel_during_compensation_halts_fold() {
    let runs = Counter::new();
    let skips = Counter::new();
    let seq: Sequencer<()> = Sequencer::new();

    let handle = seq.clone();
    let cancel_skips = skips.clone();
    seq.enqueue(Step::new(|_, _| {}).on_skipped(move |state| {
        cancel_skips.bump();
        handle.cancel();
        state
    }));
    seq.enqueue(counting_skippable(&runs, &skips));
    seq.enqueue(Step::checkpoint());
    seq.enqueue(counting_skippable(&runs, &skips));

    seq.start(());
    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::Cancelled));

    assert_eq!((skips.get(), runs.get()), (1, 0));
    assert!(!seq.in_progress());
}

/// A step without compensation halts the fold and stays current.
#[test]
fn missing_compensation_halts_in_place() {
    let held: Slot<Continuation<()>> = Slot::new();
    let runs = Counter::new();
    let seq: Sequencer<()> = sequence![
        hold(&held).without_compensation().named("prompt"),
        counting(&runs),
    ];

    seq.start(());
    let ticket = seq.status().current.expect("step should be current");

    let err = seq
        .skip_to_checkpoint()
        .expect_err("unskippable step should halt the skip");
    assert_eq!(
        err,
        SkipError::MissingCompensation {
            ticket,
            step: Some("prompt".to_string()),
        }
    );
    assert!(err.to_string().contains("prompt"));
    assert!(seq.in_progress());
    assert_eq!(seq.status().current, Some(ticket));

    // Normal dispatch can still finish the step.
    held.take().expect("continuation should be held").resume();
    assert_eq!(runs.get(), 1);
    assert!(!seq.in_progress());
}

/// The fold stops on an unskippable step reached mid-way.
#[test]
fn missing_compensation_mid_fold() {
    let skips = Counter::new();
    let seq: Sequencer<()> = sequence![
        stall_skippable(&skips),
        Step::unskippable(|resume, _| resume.resume()),
        stall_skippable(&skips),
    ];

    seq.start(());
    let result = seq.skip_to_checkpoint();

    assert!(matches!(
        result,
        Err(SkipError::MissingCompensation { step: None, .. })
    ));
    assert_eq!(skips.get(), 1);
    assert!(seq.in_progress());
    assert_eq!(seq.len(), 1);
}

/// Inactive checkpoints are skipped over too.
#[test]
fn inactive_checkpoint_falls_through() {
    let runs = Counter::new();
    let skips = Counter::new();
    let seq: Sequencer<()> = sequence![
        stall_skippable(&skips),
        Step::checkpoint_when(|| false),
        counting_skippable(&runs, &skips),
        Step::checkpoint(),
        counting_skippable(&runs, &skips),
    ];

    seq.start(());
    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::CheckpointReached));

    assert_eq!((skips.get(), runs.get()), (2, 1));
}

/// Skipping from inside a running action folds from that action's step.
#[test]
fn skip_from_inside_action() {
    let runs = Counter::new();
    let skips = Counter::new();
    let seq: Sequencer<()> = Sequencer::new();

    let handle = seq.clone();
    let first_skips = skips.clone();
    seq.enqueue(
        Step::new(move |_, _| {
            let _ = handle.skip_to_checkpoint();
        })
        .on_skipped(move |state| {
            first_skips.bump();
            state
        }),
    );
    seq.enqueue(counting_skippable(&runs, &skips));
    seq.enqueue(Step::checkpoint());
    seq.enqueue(counting_skippable(&runs, &skips));

    seq.start(());

    assert_eq!((skips.get(), runs.get()), (2, 1));
    assert!(!seq.in_progress());
}

/// Compensations thread tuple state through the fold.
#[test]
fn fold_threads_tuple_state() {
    let result = Slot::new();
    let seq = sequence![
        Step::new(|_, _: (u32, String)| {}).on_skipped(|(n, s)| (n + 1, s + "a")),
        Step::new(|_, _| {}).on_skipped(|(n, s): (u32, String)| (n * 10, s + "b")),
        Step::checkpoint(),
        capture(&result),
    ];

    seq.start((1, String::new()));
    assert_eq!(seq.skip_to_checkpoint(), Ok(SkipOutcome::CheckpointReached));

    assert_eq!(result.get(), Some((20, "ab".to_string())));
}
