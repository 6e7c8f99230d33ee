//! Bounded-history container and the checkpointing timeline.
//!
//! [`History`] wraps a state snapshot with `past` and `future` stacks.
//! [`Timeline`] applies actions to a history through a root reducer:
//!
//! - checkpoint kinds push the prior present onto `past` (trimmed to the
//!   configured limit) and clear `future`
//! - other kinds replace the present only
//! - `Undo` / `Redo` move between stacks without running reducers
//! - `Reset` discards both stacks before the reducers run
//! - error-tagged actions first go through the error step: kinds configured to
//!   rewind on error undo the last checkpoint instead of being committed
//!
//! Every transition reduces a copy of the present; a [`ReduceError`] leaves
//! the history exactly as it was.

use crate::action::{Action, HistoryDirective};
use crate::effect::Effects;
use crate::reducer::{ReduceError, Reducer};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use thiserror::Error;

/// Default number of checkpoints kept in `past`
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Errors from assembling a history by hand
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// `past` holds more checkpoints than the limit allows
    #[error("past holds {len} entries, limit is {limit}")]
    PastExceedsLimit {
        /// Entries supplied
        len: usize,
        /// Configured limit
        limit: usize,
    },
}

/// A snapshot with bounded undo/redo stacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History<S> {
    past: VecDeque<S>,
    present: S,
    future: VecDeque<S>,
}

impl<S> History<S> {
    /// Create a history with no past or future
    #[must_use]
    pub const fn new(present: S) -> Self {
        Self {
            past: VecDeque::new(),
            present,
            future: VecDeque::new(),
        }
    }

    /// Rebuild a history from its three parts
    ///
    /// # Errors
    ///
    /// [`HistoryError::PastExceedsLimit`] when `past` is longer than `limit`.
    pub fn from_parts(
        past: impl IntoIterator<Item = S>,
        present: S,
        future: impl IntoIterator<Item = S>,
        limit: usize,
    ) -> Result<Self, HistoryError> {
        let past: VecDeque<S> = past.into_iter().collect();
        if past.len() > limit {
            return Err(HistoryError::PastExceedsLimit {
                len: past.len(),
                limit,
            });
        }
        Ok(Self {
            past,
            present,
            future: future.into_iter().collect(),
        })
    }

    /// The current snapshot
    #[must_use]
    pub const fn present(&self) -> &S {
        &self.present
    }

    /// Earlier checkpoints, oldest first
    #[must_use]
    pub const fn past(&self) -> &VecDeque<S> {
        &self.past
    }

    /// Undone checkpoints, next redo first
    #[must_use]
    pub const fn future(&self) -> &VecDeque<S> {
        &self.future
    }

    /// Whether an undo would change the present
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Whether a redo would change the present
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Push the current present onto `past`, install `next`, clear `future`
    pub fn checkpoint(&mut self, next: S, limit: usize) {
        let previous = std::mem::replace(&mut self.present, next);
        if limit > 0 {
            self.past.push_back(previous);
            while self.past.len() > limit {
                self.past.pop_front();
            }
        }
        self.future.clear();
    }

    /// Replace the present without touching `past` or `future`
    pub fn replace_present(&mut self, next: S) {
        self.present = next;
    }

    /// Step back one checkpoint; returns `false` when `past` is empty
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.past.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push_front(current);
        true
    }

    /// Step forward one checkpoint; returns `false` when `future` is empty
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.past.push_back(current);
        true
    }

    /// Discard `past` and `future`
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

/// Which kinds create checkpoints and which rewind on error
#[derive(Debug, Clone)]
pub struct HistoryConfig<K> {
    limit: usize,
    checkpoints: HashSet<K>,
    rewind_on_error: HashSet<K>,
}

impl<K: Eq + Hash> HistoryConfig<K> {
    /// Create a configuration with the given limit and no checkpoint kinds
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            checkpoints: HashSet::new(),
            rewind_on_error: HashSet::new(),
        }
    }

    /// Set the checkpoint kinds
    #[must_use]
    pub fn with_checkpoints(mut self, kinds: impl IntoIterator<Item = K>) -> Self {
        self.checkpoints = kinds.into_iter().collect();
        self
    }

    /// Set the kinds whose error responses rewind history
    #[must_use]
    pub fn with_rewind_on_error(mut self, kinds: impl IntoIterator<Item = K>) -> Self {
        self.rewind_on_error = kinds.into_iter().collect();
        self
    }

    /// Maximum length of `past`
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Whether `kind` pushes a history entry
    #[must_use]
    pub fn is_checkpoint(&self, kind: &K) -> bool {
        self.checkpoints.contains(kind)
    }

    /// Whether an error-tagged `kind` rewinds instead of committing
    #[must_use]
    pub fn rewinds_on_error(&self, kind: &K) -> bool {
        self.rewind_on_error.contains(kind)
    }
}

impl<K: Eq + Hash> Default for HistoryConfig<K> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

/// What a single application did to the history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Prior present pushed onto `past`
    Checkpointed,
    /// Present replaced, stacks untouched
    Updated,
    /// Stacks cleared, present replaced
    Reset,
    /// Stepped back one checkpoint
    Undone,
    /// Stepped forward one checkpoint
    Redone,
    /// Undo/redo with nothing to move
    Unchanged,
    /// Error-tagged action rewound the last checkpoint, then reduced against it without checkpointing
    Rewound {
        /// The error carried by the action
        message: String,
    },
    /// Error-tagged action committed through the reducers; observers must be told
    Surfaced {
        /// The error carried by the action
        message: String,
    },
}

impl Outcome {
    /// Whether the present snapshot may have changed
    #[must_use]
    pub const fn changed_present(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Result of applying one action to a history
#[derive(Debug)]
pub struct Applied<Ev> {
    /// Effects produced by the reducers (empty for pure history moves)
    pub effects: Effects<Ev>,
    /// What happened to the history
    pub outcome: Outcome,
}

/// Applies actions to a [`History`] through a root reducer
pub struct Timeline<R, K> {
    reducer: R,
    config: HistoryConfig<K>,
}

impl<R, K> Timeline<R, K>
where
    R: Reducer,
    R::State: Clone,
    R::Action: Action<Kind = K>,
    K: Eq + Hash,
{
    /// Create a timeline around a root reducer
    #[must_use]
    pub const fn new(reducer: R, config: HistoryConfig<K>) -> Self {
        Self { reducer, config }
    }

    /// The history configuration
    #[must_use]
    pub const fn config(&self) -> &HistoryConfig<K> {
        &self.config
    }

    /// Apply one action to `history`
    ///
    /// # Errors
    ///
    /// Returns the reducer's [`ReduceError`]; `history` is unchanged in that case.
    pub fn apply(
        &self,
        history: &mut History<R::State>,
        action: &R::Action,
        env: &R::Environment,
    ) -> Result<Applied<R::Event>, ReduceError> {
        let kind = action.kind();

        if let Some(message) = action.failure() {
            if self.config.rewinds_on_error(&kind) && history.can_undo() {
                let mut rewound = history.clone();
                rewound.undo();
                let effects = self.reduce_present(&mut rewound, action, env, false)?;
                *history = rewound;
                tracing::debug!("Error response rewound history");
                return Ok(Applied {
                    effects,
                    outcome: Outcome::Rewound {
                        message: message.to_string(),
                    },
                });
            }

            let message = message.to_string();
            let effects = self.reduce_present(history, action, env, false)?;
            return Ok(Applied {
                effects,
                outcome: Outcome::Surfaced { message },
            });
        }

        match action.history() {
            HistoryDirective::Undo => Ok(Applied {
                effects: Effects::new(),
                outcome: if history.undo() {
                    Outcome::Undone
                } else {
                    Outcome::Unchanged
                },
            }),
            HistoryDirective::Redo => Ok(Applied {
                effects: Effects::new(),
                outcome: if history.redo() {
                    Outcome::Redone
                } else {
                    Outcome::Unchanged
                },
            }),
            HistoryDirective::Reset => {
                let effects = self.reduce_present(history, action, env, false)?;
                history.clear();
                Ok(Applied {
                    effects,
                    outcome: Outcome::Reset,
                })
            },
            HistoryDirective::Record => {
                let checkpoint = self.config.is_checkpoint(&kind);
                let effects = self.reduce_present(history, action, env, checkpoint)?;
                Ok(Applied {
                    effects,
                    outcome: if checkpoint {
                        Outcome::Checkpointed
                    } else {
                        Outcome::Updated
                    },
                })
            },
        }
    }

    fn reduce_present(
        &self,
        history: &mut History<R::State>,
        action: &R::Action,
        env: &R::Environment,
        checkpoint: bool,
    ) -> Result<Effects<R::Event>, ReduceError> {
        let mut next = history.present().clone();
        let effects = self.reducer.reduce(&mut next, action, env)?;

        if checkpoint {
            history.checkpoint(next, self.config.limit());
        } else {
            history.replace_present(next);
        }

        Ok(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::smallvec;
    use proptest::prelude::*;
    use std::fmt;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Set(i64),
        Bump,
        Undo,
        Redo,
        Restore(i64),
        Failed(String),
        Corrupt,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum OpKind {
        Set,
        Bump,
        Undo,
        Redo,
        Restore,
        Failed,
        Corrupt,
    }

    impl fmt::Display for OpKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Action for Op {
        type Kind = OpKind;

        fn kind(&self) -> OpKind {
            match self {
                Self::Set(_) => OpKind::Set,
                Self::Bump => OpKind::Bump,
                Self::Undo => OpKind::Undo,
                Self::Redo => OpKind::Redo,
                Self::Restore(_) => OpKind::Restore,
                Self::Failed(_) => OpKind::Failed,
                Self::Corrupt => OpKind::Corrupt,
            }
        }

        fn failure(&self) -> Option<&str> {
            match self {
                Self::Failed(message) => Some(message.as_str()),
                _ => None,
            }
        }

        fn history(&self) -> HistoryDirective {
            match self {
                Self::Undo => HistoryDirective::Undo,
                Self::Redo => HistoryDirective::Redo,
                Self::Restore(_) => HistoryDirective::Reset,
                _ => HistoryDirective::Record,
            }
        }
    }

    struct ValueReducer;

    impl Reducer for ValueReducer {
        type State = i64;
        type Action = Op;
        type Event = i64;
        type Environment = ();

        fn reduce(&self, state: &mut i64, action: &Op, _env: &()) -> Result<Effects<i64>, ReduceError> {
            match action {
                Op::Set(value) | Op::Restore(value) => *state = *value,
                Op::Bump => *state += 1,
                Op::Corrupt => {
                    *state = -1;
                    return Err(ReduceError::new("value", "corrupt"));
                },
                Op::Failed(_) | Op::Undo | Op::Redo => {},
            }
            Ok(smallvec![Effect::Emit(*state)])
        }
    }

    fn timeline(limit: usize) -> Timeline<ValueReducer, OpKind> {
        Timeline::new(
            ValueReducer,
            HistoryConfig::new(limit)
                .with_checkpoints([OpKind::Set])
                .with_rewind_on_error([OpKind::Failed]),
        )
    }

    #[test]
    fn checkpoint_pushes_prior_present() {
        let timeline = timeline(3);
        let mut history = History::new(0);

        let applied = timeline.apply(&mut history, &Op::Set(10), &()).unwrap();

        assert_eq!(applied.outcome, Outcome::Checkpointed);
        assert_eq!(history.present(), &10);
        assert_eq!(history.past().iter().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn non_checkpoint_leaves_stacks_alone() {
        let timeline = timeline(3);
        let mut history = History::new(0);
        timeline.apply(&mut history, &Op::Set(5), &()).unwrap();

        let applied = timeline.apply(&mut history, &Op::Bump, &()).unwrap();

        assert_eq!(applied.outcome, Outcome::Updated);
        assert_eq!(history.present(), &6);
        assert_eq!(history.past().len(), 1);
    }

    #[test]
    fn past_is_trimmed_from_the_front() {
        let timeline = timeline(2);
        let mut history = History::new(0);

        for value in 1..=4 {
            timeline.apply(&mut history, &Op::Set(value), &()).unwrap();
        }

        assert_eq!(history.past().iter().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(history.present(), &4);
    }

    #[test]
    fn undo_then_checkpoint_clears_future() {
        let timeline = timeline(5);
        let mut history = History::new(0);
        timeline.apply(&mut history, &Op::Set(1), &()).unwrap();
        timeline.apply(&mut history, &Op::Set(2), &()).unwrap();

        let undone = timeline.apply(&mut history, &Op::Undo, &()).unwrap();
        assert_eq!(undone.outcome, Outcome::Undone);
        assert_eq!(history.present(), &1);
        assert!(history.can_redo());

        timeline.apply(&mut history, &Op::Set(9), &()).unwrap();
        assert!(!history.can_redo());

        let redo = timeline.apply(&mut history, &Op::Redo, &()).unwrap();
        assert_eq!(redo.outcome, Outcome::Unchanged);
        assert_eq!(history.present(), &9);
    }

    #[test]
    fn redo_reapplies_undone_checkpoint() {
        let timeline = timeline(5);
        let mut history = History::new(0);
        timeline.apply(&mut history, &Op::Set(1), &()).unwrap();
        timeline.apply(&mut history, &Op::Undo, &()).unwrap();

        let applied = timeline.apply(&mut history, &Op::Redo, &()).unwrap();

        assert_eq!(applied.outcome, Outcome::Redone);
        assert_eq!(history.present(), &1);
        assert_eq!(history.past().len(), 1);
    }

    #[test]
    fn reducer_failure_leaves_history_untouched() {
        let timeline = timeline(5);
        let mut history = History::new(0);
        timeline.apply(&mut history, &Op::Set(3), &()).unwrap();
        let before = history.clone();

        let error = timeline.apply(&mut history, &Op::Corrupt, &()).unwrap_err();

        assert_eq!(error.region, "value");
        assert_eq!(history, before);
    }

    #[test]
    fn error_response_rewinds_last_checkpoint() {
        let timeline = timeline(5);
        let mut history = History::new(0);
        timeline.apply(&mut history, &Op::Set(7), &()).unwrap();

        let applied = timeline
            .apply(&mut history, &Op::Failed("timeout".to_string()), &())
            .unwrap();

        assert_eq!(
            applied.outcome,
            Outcome::Rewound {
                message: "timeout".to_string()
            }
        );
        assert_eq!(history.present(), &0);
        assert_eq!(history.future().len(), 1);
    }

    #[test]
    fn rewind_still_runs_the_reducer_on_the_restored_state() {
        let timeline = timeline(5);
        let mut history = History::new(0);
        timeline.apply(&mut history, &Op::Set(7), &()).unwrap();

        let applied = timeline
            .apply(&mut history, &Op::Failed("timeout".to_string()), &())
            .unwrap();

        assert!(matches!(applied.outcome, Outcome::Rewound { .. }));
        assert_eq!(applied.effects.len(), 1);
        assert!(matches!(applied.effects[0], Effect::Emit(0)));
    }

    #[test]
    fn error_response_without_past_is_surfaced() {
        let timeline = timeline(5);
        let mut history = History::new(4);

        let applied = timeline
            .apply(&mut history, &Op::Failed("down".to_string()), &())
            .unwrap();

        assert_eq!(
            applied.outcome,
            Outcome::Surfaced {
                message: "down".to_string()
            }
        );
        assert_eq!(history.present(), &4);
    }

    #[test]
    fn reset_clears_both_stacks() {
        let timeline = timeline(5);
        let mut history = History::new(0);
        timeline.apply(&mut history, &Op::Set(1), &()).unwrap();
        timeline.apply(&mut history, &Op::Set(2), &()).unwrap();
        timeline.apply(&mut history, &Op::Undo, &()).unwrap();

        let applied = timeline.apply(&mut history, &Op::Restore(42), &()).unwrap();

        assert_eq!(applied.outcome, Outcome::Reset);
        assert_eq!(history.present(), &42);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn from_parts_enforces_limit() {
        let error = History::from_parts([1, 2, 3], 4, [], 2).unwrap_err();
        assert_eq!(error, HistoryError::PastExceedsLimit { len: 3, limit: 2 });

        let history = History::from_parts([1, 2], 3, [4], 2).unwrap();
        assert!(history.can_undo());
        assert!(history.can_redo());
    }

    #[test]
    fn zero_limit_keeps_no_past() {
        let timeline = timeline(0);
        let mut history = History::new(0);

        timeline.apply(&mut history, &Op::Set(1), &()).unwrap();

        assert!(history.past().is_empty());
        assert_eq!(history.present(), &1);
    }

    proptest! {
        #[test]
        fn past_length_is_min_of_checkpoints_and_limit(
            values in proptest::collection::vec(any::<i64>(), 0..40),
            limit in 0usize..10,
        ) {
            let timeline = timeline(limit);
            let mut history = History::new(0);

            for value in &values {
                timeline.apply(&mut history, &Op::Set(*value), &()).unwrap();
                prop_assert!(history.future().is_empty());
            }

            prop_assert_eq!(history.past().len(), values.len().min(limit));
        }
    }
}
