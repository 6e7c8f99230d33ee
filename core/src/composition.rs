//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers in various ways:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`scope_reducer`**: Focus a reducer on one region of a larger state
//!
//! Composition is how the storefront's root reducer is assembled: every region
//! of the snapshot (query, navigations, products, ...) has its own reducer,
//! scoped to that region, and the scoped reducers are combined.
//!
//! # Examples
//!
//! ```
//! use storefront_sync_core::{Effect, Effects, ReduceError, Reducer, smallvec};
//! use storefront_sync_core::composition::{combine_reducers, scope_reducer};
//!
//! #[derive(Clone, Default)]
//! struct AppState {
//!     count: i32,
//!     name: String,
//! }
//!
//! enum AppAction {
//!     Increment,
//!     Rename(String),
//! }
//!
//! struct CountReducer;
//! struct NameReducer;
//!
//! impl Reducer for CountReducer {
//!     type State = i32;
//!     type Action = AppAction;
//!     type Event = &'static str;
//!     type Environment = ();
//!
//!     fn reduce(&self, count: &mut i32, action: &AppAction, _env: &()) -> Result<Effects<&'static str>, ReduceError> {
//!         if matches!(action, AppAction::Increment) {
//!             *count += 1;
//!             return Ok(smallvec![Effect::Emit("count")]);
//!         }
//!         Ok(Effects::new())
//!     }
//! }
//!
//! impl Reducer for NameReducer {
//!     type State = String;
//!     type Action = AppAction;
//!     type Event = &'static str;
//!     type Environment = ();
//!
//!     fn reduce(&self, name: &mut String, action: &AppAction, _env: &()) -> Result<Effects<&'static str>, ReduceError> {
//!         if let AppAction::Rename(new_name) = action {
//!             name.clone_from(new_name);
//!             return Ok(smallvec![Effect::Emit("name")]);
//!         }
//!         Ok(Effects::new())
//!     }
//! }
//!
//! let root = combine_reducers(vec![
//!     Box::new(scope_reducer(CountReducer, |s: &mut AppState| &mut s.count)),
//!     Box::new(scope_reducer(NameReducer, |s: &mut AppState| &mut s.name)),
//! ]);
//!
//! let mut state = AppState::default();
//! let effects = root.reduce(&mut state, &AppAction::Increment, &()).unwrap();
//! assert_eq!(state.count, 1);
//! assert_eq!(effects.len(), 1);
//! ```

use crate::effect::Effects;
use crate::reducer::{ReduceError, Reducer};

/// Boxed reducer usable inside a [`CombinedReducer`]
pub type BoxedReducer<S, A, Ev, E> =
    Box<dyn Reducer<State = S, Action = A, Event = Ev, Environment = E> + Send + Sync>;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in sequence, and all effects are collected and concatenated.
/// The first failing reducer aborts the whole reduction; since the state may
/// already have been touched by earlier reducers, callers must reduce a copy
/// and commit only on success (the history timeline does exactly that).
#[must_use]
pub fn combine_reducers<S, A, Ev, E>(
    reducers: Vec<BoxedReducer<S, A, Ev, E>>,
) -> CombinedReducer<S, A, Ev, E> {
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, Ev, E> {
    reducers: Vec<BoxedReducer<S, A, Ev, E>>,
}

impl<S, A, Ev, E> CombinedReducer<S, A, Ev, E> {
    /// Number of combined reducers
    #[must_use]
    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    /// Whether no reducers were combined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<S, A, Ev, E> Reducer for CombinedReducer<S, A, Ev, E> {
    type State = S;
    type Action = A;
    type Event = Ev;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: &Self::Action,
        env: &Self::Environment,
    ) -> Result<Effects<Self::Event>, ReduceError> {
        let mut all_effects = Effects::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action, env)?;
            all_effects.extend(effects);
        }

        Ok(all_effects)
    }
}

/// Scopes a reducer to operate on one region of a larger state.
///
/// The scoped reducer only ever receives `&mut` to its own region, so a
/// region reducer cannot read or write regions it does not own.
pub fn scope_reducer<S, R>(reducer: R, region: fn(&mut S) -> &mut R::State) -> ScopedReducer<S, R>
where
    R: Reducer,
{
    ScopedReducer { reducer, region }
}

/// A scoped reducer that operates on a region of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, R>
where
    R: Reducer,
{
    reducer: R,
    region: fn(&mut S) -> &mut R::State,
}

impl<S, R> Reducer for ScopedReducer<S, R>
where
    R: Reducer,
{
    type State = S;
    type Action = R::Action;
    type Event = R::Event;
    type Environment = R::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: &Self::Action,
        env: &Self::Environment,
    ) -> Result<Effects<Self::Event>, ReduceError> {
        self.reducer.reduce((self.region)(state), action, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::smallvec;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct ParentState {
        counter: i32,
        name: String,
    }

    enum TestAction {
        Increment,
        SetName(String),
        Explode,
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = i32;
        type Action = TestAction;
        type Event = &'static str;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut i32,
            action: &TestAction,
            _env: &(),
        ) -> Result<Effects<&'static str>, ReduceError> {
            match action {
                TestAction::Increment => {
                    *state += 1;
                    Ok(smallvec![Effect::Emit("counter")])
                },
                TestAction::Explode => Err(ReduceError::new("counter", "boom")),
                TestAction::SetName(_) => Ok(Effects::new()),
            }
        }
    }

    struct NameReducer;

    impl Reducer for NameReducer {
        type State = String;
        type Action = TestAction;
        type Event = &'static str;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut String,
            action: &TestAction,
            _env: &(),
        ) -> Result<Effects<&'static str>, ReduceError> {
            if let TestAction::SetName(name) = action {
                state.clone_from(name);
                return Ok(smallvec![Effect::Emit("name")]);
            }
            Ok(Effects::new())
        }
    }

    fn root() -> CombinedReducer<ParentState, TestAction, &'static str, ()> {
        combine_reducers(vec![
            Box::new(scope_reducer(CounterReducer, |s: &mut ParentState| &mut s.counter)),
            Box::new(scope_reducer(NameReducer, |s: &mut ParentState| &mut s.name)),
        ])
    }

    #[test]
    fn test_combine_scoped_reducers() {
        let combined = root();
        let mut state = ParentState::default();

        let effects = combined.reduce(&mut state, &TestAction::Increment, &()).unwrap();
        assert_eq!(state.counter, 1);
        assert_eq!(effects.as_slice(), &[Effect::Emit("counter")]);

        let effects = combined
            .reduce(&mut state, &TestAction::SetName("Alice".to_string()), &())
            .unwrap();
        assert_eq!(state.name, "Alice");
        assert_eq!(state.counter, 1);
        assert_eq!(effects.as_slice(), &[Effect::Emit("name")]);
    }

    #[test]
    fn test_combined_reducer_short_circuits_on_error() {
        let combined = root();
        let mut state = ParentState::default();

        let error = combined.reduce(&mut state, &TestAction::Explode, &()).unwrap_err();

        assert_eq!(error.region, "counter");
        assert_eq!(combined.len(), 2);
    }
}
