//! Error types for the storefront domain

use crate::action::FetchFailure;
use crate::composer::RequestName;
use storefront_sync_runtime::{StoreError, TaskError};
use thiserror::Error;

/// Errors from the outbound query services
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request never got a response
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The service answered with a non-success status
    #[error("Service error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The response body did not decode
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),
}

/// Invalid or missing configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A setting has an unusable value
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Setting name
        key: &'static str,
        /// Value as given
        value: String,
        /// Why it was refused
        reason: String,
    },
}

/// Errors surfaced by the storefront façade and its workflows
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration was refused at startup
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The store could not be built or shut down
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A workflow was superseded or the store killed
    #[error(transparent)]
    Cancelled(#[from] TaskError),

    /// A service call failed
    #[error("{request} request failed: {source}")]
    Service {
        /// Logical request name
        request: RequestName,
        /// Underlying error
        #[source]
        source: ServiceError,
    },

    /// A workflow could not produce a response
    #[error("workflow failed: {0}")]
    Workflow(#[from] FetchFailure),

    /// A workflow branch lacks what it needs; it is skipped without a dispatch
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(&'static str),
}

impl From<&StorefrontError> for FetchFailure {
    fn from(error: &StorefrontError) -> Self {
        match error {
            StorefrontError::Workflow(failure) => failure.clone(),
            other => Self::new(other.to_string()),
        }
    }
}
