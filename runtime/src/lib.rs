//! # Storefront Sync Runtime
//!
//! Runtime for the storefront state-synchronization engine.
//!
//! This crate provides the [`Store`] that owns the bounded-history snapshot and
//! runs the validated dispatch pipeline, and the [`Orchestrator`] that spawns
//! asynchronous tasks for committed commands.
//!
//! ## Core Components
//!
//! - **Store**: validation, atomic batch application, event notification, render callback
//! - **Orchestrator**: per-kind task registry with cancel-latest and concurrent policies
//! - **`TaskContext`**: the suspension points a task may use (state read, external call, dispatch)
//!
//! ## Example
//!
//! ```ignore
//! use storefront_sync_runtime::{Store, StoreConfig, TaskPolicy};
//!
//! let store = Store::builder(initial_state, root_reducer, environment)
//!     .config(StoreConfig::default().with_history_limit(5))
//!     .checkpoints([Kind::Search, Kind::SelectRefinement])
//!     .task(Kind::FetchProducts, TaskPolicy::CancelLatest, ProductsWorkflow::new(service))
//!     .build();
//!
//! let handle = store.dispatch(search("boots")).await;
//! handle.wait().await;
//!
//! let query = store.state(|present| present.query.clone()).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use storefront_sync_core::{Action, Reducer, ReduceError, ValidationRejected};
use storefront_sync_core::event_bus::BusEvent;
use storefront_sync_core::notice::Notice;
use tokio::sync::watch;

/// Prometheus metrics for observability
pub mod metrics;

/// Task registry, concurrency policies and the task context
pub mod orchestrator;

/// The Store: snapshot ownership and the dispatch pipeline
pub mod store;

pub use orchestrator::{Orchestrator, Task, TaskContext, TaskPolicy};
pub use store::{Store, StoreBuilder};

/// Error types for the Store runtime
pub mod error {
    use storefront_sync_core::{EventBusError, HistoryError};
    use thiserror::Error;

    /// Errors that can occur during Store operations
    ///
    /// Domain failures (rejected commands, reducer errors, failed fetches)
    /// never surface here; `dispatch` reports them through its handle and
    /// the event bus.
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Shutdown timed out waiting for tasks to complete
        #[error("Shutdown timed out with {0} tasks still running")]
        ShutdownTimeout(usize),

        /// A supplied history violates the configured limit
        #[error("Invalid initial history: {0}")]
        InvalidHistory(#[from] HistoryError),

        /// Event bus registration failed
        #[error("Event bus registration failed: {0}")]
        Bus(#[from] EventBusError),
    }

    /// Errors seen by a running task at its suspension points
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum TaskError {
        /// A newer instance of the same kind started, or the store was killed
        #[error("task superseded or store shut down")]
        Cancelled,
    }
}

pub use error::{StoreError, TaskError};

/// Kind type of a reducer's actions
pub type KindOf<R> = <<R as Reducer>::Action as Action>::Kind;

/// Reducers the store can drive
///
/// Blanket-implemented for every reducer whose associated types meet the
/// runtime's requirements.
pub trait StoreReducer:
    Reducer<
        State: Clone + Send + Sync + 'static,
        Action: Action,
        Event: BusEvent + PartialEq + From<Notice>,
        Environment: Send + Sync + 'static,
    > + Send
    + Sync
    + 'static
{
}

impl<T> StoreReducer for T where
    T: Reducer<
            State: Clone + Send + Sync + 'static,
            Action: Action,
            Event: BusEvent + PartialEq + From<Notice>,
            Environment: Send + Sync + 'static,
        > + Send
        + Sync
        + 'static
{
}

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use storefront_sync_runtime::StoreConfig;
///
/// let config = StoreConfig::default()
///     .with_history_limit(10)
///     .with_broadcast_capacity(64)
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.history_limit, 10);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum length of the undo stack
    pub history_limit: usize,
    /// Capacity of the committed-command broadcast channel
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(
        history_limit: usize,
        broadcast_capacity: usize,
        default_shutdown_timeout: Duration,
    ) -> Self {
        Self {
            history_limit,
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the history limit
    #[must_use]
    pub const fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Set the command broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_limit: storefront_sync_core::history::DEFAULT_HISTORY_LIMIT,
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// What happened to a dispatched intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Accepted commands were applied as one transition
    Committed {
        /// Number of commands applied
        commands: usize,
    },
    /// Every command was rejected (or the intent resolved to nothing)
    Rejected,
    /// A reducer failed; the previous snapshot was kept
    Failed(ReduceError),
    /// The dispatching task was cancelled, or the store is shut down
    Suppressed,
}

/// Handle returned by [`Store::dispatch`]
///
/// Reports what the pipeline did with the intent and lets callers wait for
/// the tasks spawned by the committed commands.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.dispatch(search("boots")).await;
/// assert!(handle.is_committed());
/// handle.wait().await;
/// // The search task has finished (or was cancelled)
/// ```
#[derive(Clone)]
pub struct DispatchHandle {
    outcome: DispatchOutcome,
    rejections: Vec<ValidationRejected>,
    tasks: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl DispatchHandle {
    fn new(
        outcome: DispatchOutcome,
        rejections: Vec<ValidationRejected>,
        tracking: &TaskTracking,
    ) -> Self {
        Self {
            outcome,
            rejections,
            tasks: Arc::clone(&tracking.counter),
            completion: tracking.notifier.subscribe(),
        }
    }

    /// A handle with no tasks to wait for
    #[must_use]
    pub fn settled(outcome: DispatchOutcome, rejections: Vec<ValidationRejected>) -> Self {
        Self::new(outcome, rejections, &TaskTracking::new())
    }

    /// What the pipeline did
    #[must_use]
    pub const fn outcome(&self) -> &DispatchOutcome {
        &self.outcome
    }

    /// Whether a transition was committed
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::Committed { .. })
    }

    /// Commands dropped by validators
    #[must_use]
    pub fn rejections(&self) -> &[ValidationRejected] {
        &self.rejections
    }

    /// The reducer failure, if the transition was discarded
    #[must_use]
    pub const fn failure(&self) -> Option<&ReduceError> {
        match &self.outcome {
            DispatchOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Tasks spawned by this dispatch that are still running
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.load(Ordering::SeqCst)
    }

    /// Wait until every task spawned by this dispatch has finished
    pub async fn wait(&mut self) {
        while self.tasks.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait with a timeout
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the timeout expires before the tasks finish.
    #[allow(clippy::result_unit_err)]
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait()).await.map_err(|_| ())
    }
}

impl std::fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("outcome", &self.outcome)
            .field("rejections", &self.rejections)
            .field("pending_tasks", &self.tasks.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: running-task counter with a completion notifier
#[derive(Clone)]
pub(crate) struct TaskTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl TaskTracking {
    pub(crate) fn new() -> Self {
        let (notifier, _) = watch::channel(());
        Self {
            counter: Arc::new(AtomicUsize::new(0)),
            notifier: Arc::new(notifier),
        }
    }

    pub(crate) fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notifier.send_replace(());
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<()> {
        self.notifier.subscribe()
    }
}

/// Internal: RAII guard that decrements a task counter on drop
///
/// Keeps counters honest even if a task panics.
pub(crate) struct DecrementGuard(pub(crate) TaskTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}
