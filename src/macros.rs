//! Macros for building sequencers and façades.
//!
//! - `sequence!`: Build a sequencer from a list of steps
//! - `control_surface!`: Delegate the shared control surface of a façade to
//!   its inner sequencer (crate-internal)

/// Build a [`Sequencer`](crate::Sequencer) with the given steps already
/// queued, in order.
///
/// ```
/// use cadence::{sequence, Step};
///
/// let seq = sequence![
///     Step::immediate(|n: &u32| println!("got {n}")),
///     Step::checkpoint(),
///     Step::new(|resume, n: u32| resume.resume_with(n + 1)),
/// ];
/// assert_eq!(seq.len(), 3);
/// ```
///
/// A label can be given first:
///
/// ```
/// use cadence::{sequence, Step};
///
/// let seq = sequence![label: "intro"; Step::<()>::checkpoint()];
/// assert_eq!(seq.label(), Some("intro"));
/// ```
#[macro_export]
macro_rules! sequence {
    (label: $label:expr; $($step:expr),* $(,)?) => {{
        let seq = $crate::Sequencer::with_label($label);
        $( seq.enqueue($step); )*
        seq
    }};
    ($($step:expr),* $(,)?) => {{
        let seq = $crate::Sequencer::new();
        $( seq.enqueue($step); )*
        seq
    }};
}

/// Generate the control surface shared by every façade.
///
/// The façade must be a struct generic over the state `S` with a
/// `sequencer: Sequencer<S>` field.
macro_rules! control_surface {
    ($facade:ident) => {
        impl<S> $facade<S>
        where
            S: Clone + Send + 'static,
        {
            /// Queue a fully built step.
            pub fn enqueue_step(&self, step: $crate::Step<S>) {
                self.sequencer.enqueue(step);
            }

            /// Start running with `initial` as the state. No-op while in progress.
            pub fn start(&self, initial: S) {
                self.sequencer.start(initial);
            }

            /// Defer the next transition until `unpause`.
            pub fn pause(&self) {
                self.sequencer.pause();
            }

            /// Clear the paused flag and replay any deferred transition.
            pub fn unpause(&self) {
                self.sequencer.unpause();
            }

            /// Cancel permanently.
            pub fn cancel(&self) {
                self.sequencer.cancel();
            }

            /// Returns `true` while a step is current.
            pub fn in_progress(&self) -> bool {
                self.sequencer.in_progress()
            }

            /// Returns `true` when nothing is queued behind the current step.
            pub fn is_empty(&self) -> bool {
                self.sequencer.is_empty()
            }

            /// Returns `true` while paused.
            pub fn is_paused(&self) -> bool {
                self.sequencer.is_paused()
            }

            /// The underlying sequencer.
            pub fn sequencer(&self) -> &$crate::Sequencer<S> {
                &self.sequencer
            }
        }

        impl<S> Default for $facade<S>
        where
            S: Clone + Send + 'static,
        {
            fn default() -> Self {
                Self {
                    sequencer: $crate::Sequencer::new(),
                }
            }
        }

        impl<S> Clone for $facade<S> {
            fn clone(&self) -> Self {
                Self {
                    sequencer: self.sequencer.clone(),
                }
            }
        }

        impl<S> std::fmt::Debug for $facade<S> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($facade))
                    .field(&self.sequencer)
                    .finish()
            }
        }
    };
}
