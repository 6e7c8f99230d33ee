//! # Storefront Sync Core
//!
//! Core traits and types for the storefront state-synchronization engine.
//!
//! This crate provides the pure, runtime-agnostic building blocks: the reducer
//! abstraction, effect descriptions, reducer composition, commands and their
//! validators, the bounded-history container and the barrier event bus.
//!
//! ## Core Concepts
//!
//! - **State**: A snapshot of everything the storefront knows (query, facets, products, ...)
//! - **Action**: A closed sum type of everything that can happen to the state
//! - **Command**: An [`Action`](action::Action) plus string metadata, immutable once created
//! - **Reducer**: Pure function `(State, Action, Environment) → Result<(State, Effects)>`
//! - **Effect**: Side effect descriptions (events to emit), executed by the runtime
//! - **History**: `past / present / future` wrapper with a bounded undo stack
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O)
//! - Dependency Injection via Environment
//!
//! ## Example
//!
//! ```ignore
//! use storefront_sync_core::*;
//!
//! #[derive(Clone, Debug, Default)]
//! struct CartState {
//!     items: Vec<String>,
//! }
//!
//! impl Reducer for CartReducer {
//!     type State = CartState;
//!     type Action = CartAction;
//!     type Event = CartEvent;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CartState,
//!         action: &CartAction,
//!         _env: &(),
//!     ) -> Result<Effects<CartEvent>, ReduceError> {
//!         match action {
//!             CartAction::Add(item) => {
//!                 state.items.push(item.clone());
//!                 Ok(smallvec![Effect::Emit(CartEvent::Changed)])
//!             }
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Commands, metadata and intents
pub mod action;

/// Reducer composition (`combine_reducers`, `scope_reducer`)
pub mod composition;

/// Barrier-capable publish/subscribe bus
pub mod event_bus;

/// Bounded-history container and the checkpointing timeline
pub mod history;

/// Ordered transform chains with falsy carry-forward
pub mod chain;

/// Per-kind command validators
pub mod validator;

/// Store-level notifications
pub mod notice;

pub use action::{Action, Command, HistoryDirective, Intent, Meta};
pub use event_bus::{BusEvent, EventBus, EventBusError, ListenerId};
pub use history::{History, HistoryConfig, HistoryError, Outcome, Timeline};
pub use notice::Notice;
pub use validator::{ValidationRejected, Validator, Validators};
pub use effect::{Effect, Effects};
pub use reducer::{ReduceError, Reducer};

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
///
/// They contain all state-transition logic and are deterministic and testable.
/// Unlike a plain setter, a reducer may refuse a transition by returning a
/// [`ReduceError`]; the caller must then discard any partial mutation.
pub mod reducer {
    use super::effect::Effects;
    use thiserror::Error;

    /// A reducer refused to apply an action.
    ///
    /// The runtime treats this as fatal to the current transition only: the
    /// previous snapshot is kept and history is left untouched.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    #[error("reducer for '{region}' failed: {reason}")]
    pub struct ReduceError {
        /// State region owned by the failing reducer
        pub region: String,
        /// Human-readable cause
        pub reason: String,
    }

    impl ReduceError {
        /// Create a new reducer error for a region
        #[must_use]
        pub fn new(region: impl Into<String>, reason: impl Into<String>) -> Self {
            Self {
                region: region.into(),
                reason: reason.into(),
            }
        }
    }

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state (or state region) this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Event`: The notification type described by returned effects
    /// - `Environment`: The injected configuration this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for PageReducer {
    ///     type State = PageState;
    ///     type Action = StorefrontAction;
    ///     type Event = StorefrontEvent;
    ///     type Environment = StorefrontConfig;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut PageState,
    ///         action: &StorefrontAction,
    ///         env: &StorefrontConfig,
    ///     ) -> Result<Effects<StorefrontEvent>, ReduceError> {
    ///         match action {
    ///             StorefrontAction::UpdateCurrentPage { page } => {
    ///                 state.current = *page;
    ///                 Ok(smallvec![Effect::Emit(StorefrontEvent::PageUpdated)])
    ///             }
    ///             _ => Ok(Effects::new()),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The event type this reducer may ask the runtime to emit
        type Event;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// # Errors
        ///
        /// Returns [`ReduceError`] when the action cannot be applied to the
        /// state. Callers must not commit `state` in that case.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: &Self::Action,
            env: &Self::Environment,
        ) -> Result<Effects<Self::Event>, ReduceError>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe what the runtime should do once a transition has been
/// committed. They are values (not execution) and are composable.
pub mod effect {
    use smallvec::SmallVec;

    /// Effects returned by a single reducer invocation
    pub type Effects<Ev> = SmallVec<[Effect<Ev>; 4]>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should
    /// happen, returned from reducers and executed by the store after the
    /// transition has been committed.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Effect<Ev> {
        /// No-op effect
        None,

        /// Notify event bus subscribers
        Emit(Ev),

        /// Run several effects; order is preserved
        Parallel(Vec<Effect<Ev>>),
    }

    impl<Ev> Effect<Ev> {
        /// Combine effects into one
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Ev>>) -> Effect<Ev> {
            Effect::Parallel(effects)
        }

        /// Flatten this effect into the events it emits, in order
        pub fn collect_events(self, out: &mut Vec<Ev>) {
            match self {
                Effect::None => {},
                Effect::Emit(event) => out.push(event),
                Effect::Parallel(effects) => {
                    for effect in effects {
                        effect.collect_events(out);
                    }
                },
            }
        }
    }
}
