//! Per-kind command validators.
//!
//! A validator is a pure predicate over `(action, state)` plus a diagnostic
//! message. Validators express no-op guards ("refinement already selected",
//! "page out of range"): a command for which any registered validator returns
//! `false` is rejected before it reaches the reducers.

use crate::action::Action;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A command was dropped by one of its validators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} rejected: {message}")]
pub struct ValidationRejected {
    /// Kind of the rejected command
    pub kind: String,
    /// Message of the first failing validator
    pub message: String,
}

type Predicate<A, S> = Arc<dyn Fn(&A, &S) -> bool + Send + Sync>;

/// One predicate with its diagnostic message
pub struct Validator<A, S> {
    message: Cow<'static, str>,
    predicate: Predicate<A, S>,
}

impl<A, S> Validator<A, S> {
    /// Create a validator
    pub fn new<F>(message: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&A, &S) -> bool + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Diagnostic reported on rejection
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Evaluate against an action and state
    #[must_use]
    pub fn check(&self, action: &A, state: &S) -> bool {
        (self.predicate)(action, state)
    }
}

impl<A, S> Clone for Validator<A, S> {
    fn clone(&self) -> Self {
        Self {
            message: self.message.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<A, S> fmt::Debug for Validator<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("message", &self.message).finish_non_exhaustive()
    }
}

/// Validators grouped by action kind
pub struct Validators<A: Action, S> {
    by_kind: HashMap<A::Kind, Vec<Validator<A, S>>>,
}

impl<A: Action, S> Default for Validators<A, S> {
    fn default() -> Self {
        Self {
            by_kind: HashMap::new(),
        }
    }
}

impl<A: Action, S> Clone for Validators<A, S> {
    fn clone(&self) -> Self {
        Self {
            by_kind: self.by_kind.clone(),
        }
    }
}

impl<A: Action, S> fmt::Debug for Validators<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.by_kind.iter()).finish()
    }
}

impl<A: Action, S> Validators<A, S> {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a validator to a kind
    pub fn register(&mut self, kind: A::Kind, validator: Validator<A, S>) {
        self.by_kind.entry(kind).or_default().push(validator);
    }

    /// Builder form of [`Validators::register`]
    #[must_use]
    pub fn with<F>(mut self, kind: A::Kind, message: &'static str, predicate: F) -> Self
    where
        F: Fn(&A, &S) -> bool + Send + Sync + 'static,
    {
        self.register(kind, Validator::new(message, predicate));
        self
    }

    /// Validators registered for `kind`
    #[must_use]
    pub fn for_kind(&self, kind: &A::Kind) -> &[Validator<A, S>] {
        self.by_kind.get(kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Check an action against every validator of its kind
    ///
    /// # Errors
    ///
    /// [`ValidationRejected`] carrying the first failing validator's message.
    pub fn validate(&self, action: &A, state: &S) -> Result<(), ValidationRejected> {
        let kind = action.kind();
        match self.for_kind(&kind).iter().find(|validator| !validator.check(action, state)) {
            Some(failed) => Err(ValidationRejected {
                kind: kind.to_string(),
                message: failed.message().to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Page(u32),
        Other,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum OpKind {
        Page,
        Other,
    }

    impl fmt::Display for OpKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Self::Page => "page",
                Self::Other => "other",
            })
        }
    }

    impl Action for Op {
        type Kind = OpKind;

        fn kind(&self) -> OpKind {
            match self {
                Self::Page(_) => OpKind::Page,
                Self::Other => OpKind::Other,
            }
        }
    }

    fn validators() -> Validators<Op, u32> {
        Validators::new()
            .with(OpKind::Page, "page must differ from current", |op, current| {
                !matches!(op, Op::Page(page) if page == current)
            })
            .with(OpKind::Page, "page must be positive", |op, _| {
                !matches!(op, Op::Page(0))
            })
    }

    #[test]
    fn passes_when_every_validator_holds() {
        assert_eq!(validators().validate(&Op::Page(3), &1), Ok(()));
    }

    #[test]
    fn rejects_when_any_validator_fails() {
        let rejected = validators().validate(&Op::Page(0), &1).unwrap_err();

        assert_eq!(rejected.kind, "page");
        assert_eq!(rejected.message, "page must be positive");
    }

    #[test]
    fn reports_first_failing_message() {
        let rejected = validators().validate(&Op::Page(1), &1).unwrap_err();

        assert_eq!(rejected.message, "page must differ from current");
    }

    #[test]
    fn kinds_without_validators_pass() {
        assert!(validators().validate(&Op::Other, &0).is_ok());
        assert!(validators().for_kind(&OpKind::Other).is_empty());
    }
}
