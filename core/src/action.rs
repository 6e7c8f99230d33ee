//! Commands, metadata and intents.
//!
//! An [`Action`] is a closed sum type describing everything that can happen to
//! the state. A [`Command`] wraps one action together with free-form string
//! metadata; once built it is never mutated. An [`Intent`] is what producers
//! hand to the store: a single command, an ordered batch applied atomically,
//! or a function of the current state returning either.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

/// Free-form command metadata (`meta` in the wire representation)
pub type Meta = BTreeMap<String, String>;

/// How a command interacts with the history stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryDirective {
    /// Normal forward transition; pushes history if the kind is a checkpoint
    Record,
    /// Step back to the most recent checkpoint
    Undo,
    /// Re-apply the most recently undone checkpoint
    Redo,
    /// Wholesale replacement of the present; past and future are discarded
    Reset,
}

/// Behaviour shared by every action sum type.
///
/// `Kind` is the payload-free discriminant used as the key for validators,
/// checkpoint configuration and task registration.
pub trait Action: Clone + fmt::Debug + Send + Sync + 'static {
    /// Payload-free discriminant of the action
    type Kind: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// The kind of this action
    fn kind(&self) -> Self::Kind;

    /// Error message when this is an error-tagged response
    fn failure(&self) -> Option<&str> {
        None
    }

    /// How this action moves through the history stack
    fn history(&self) -> HistoryDirective {
        HistoryDirective::Record
    }
}

/// An immutable command: one action plus metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Command<A> {
    action: A,
    meta: Meta,
}

impl<A: Action> Command<A> {
    /// Wrap an action with empty metadata
    #[must_use]
    pub fn new(action: A) -> Self {
        Self {
            action,
            meta: Meta::new(),
        }
    }

    /// Attach a metadata entry
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// The wrapped action
    #[must_use]
    pub const fn action(&self) -> &A {
        &self.action
    }

    /// Command metadata
    #[must_use]
    pub const fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Kind of the wrapped action
    #[must_use]
    pub fn kind(&self) -> A::Kind {
        self.action.kind()
    }

    /// Unwrap the action, dropping metadata
    #[must_use]
    pub fn into_action(self) -> A {
        self.action
    }
}

impl<A: Action> From<A> for Command<A> {
    fn from(action: A) -> Self {
        Self::new(action)
    }
}

/// Deferred intent: resolved against the current state at dispatch time
pub type DeferredIntent<A, S> = Box<dyn FnOnce(&S) -> Intent<A, S> + Send>;

/// Something that can be dispatched to a store
pub enum Intent<A, S> {
    /// One command
    Single(Command<A>),
    /// Ordered commands applied as one atomic transition
    Batch(Vec<Command<A>>),
    /// A function of the current state producing another intent
    Deferred(DeferredIntent<A, S>),
}

impl<A: Action, S> Intent<A, S> {
    /// Build a batch from anything yielding commands or actions
    pub fn batch<I, C>(commands: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Command<A>>,
    {
        Self::Batch(commands.into_iter().map(Into::into).collect())
    }

    /// Build an intent whose shape depends on current state
    pub fn deferred<F>(f: F) -> Self
    where
        F: FnOnce(&S) -> Intent<A, S> + Send + 'static,
    {
        Self::Deferred(Box::new(f))
    }

    /// Resolve into the ordered commands to dispatch
    ///
    /// Deferred intents are evaluated against `state`; nested deferrals are
    /// resolved against the same state.
    pub fn resolve(self, state: &S) -> Vec<Command<A>> {
        let mut intent = self;
        loop {
            match intent {
                Self::Single(command) => return vec![command],
                Self::Batch(commands) => return commands,
                Self::Deferred(f) => intent = f(state),
            }
        }
    }
}

impl<A: Action, S> From<A> for Intent<A, S> {
    fn from(action: A) -> Self {
        Self::Single(Command::new(action))
    }
}

impl<A: Action, S> From<Command<A>> for Intent<A, S> {
    fn from(command: Command<A>) -> Self {
        Self::Single(command)
    }
}

impl<A: Action, S> From<Vec<A>> for Intent<A, S> {
    fn from(actions: Vec<A>) -> Self {
        Self::batch(actions)
    }
}

impl<A: fmt::Debug, S> fmt::Debug for Intent<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(command) => f.debug_tuple("Intent::Single").field(command).finish(),
            Self::Batch(commands) => f.debug_tuple("Intent::Batch").field(commands).finish(),
            Self::Deferred(_) => write!(f, "Intent::Deferred(<fn>)"),
        }
    }
}
