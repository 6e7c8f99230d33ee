//! Task orchestration.
//!
//! Tasks are async workflows registered against a command kind. When a
//! command of that kind is committed, the orchestrator spawns one instance per
//! registration according to its [`TaskPolicy`]:
//!
//! - [`TaskPolicy::CancelLatest`]: starting an instance cancels the previous
//!   instance of the same registration. Cancellation is cooperative; the
//!   superseded instance keeps running until its next suspension point, where
//!   results are discarded and dispatches suppressed.
//! - [`TaskPolicy::Concurrent`]: every instance runs to completion.
//!
//! A task only talks to the outside world through its [`TaskContext`].

use crate::error::TaskError;
use crate::metrics::OrchestratorMetrics;
use crate::store::Store;
use crate::{DecrementGuard, DispatchHandle, KindOf, StoreReducer, TaskTracking};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use storefront_sync_core::{Command, History, Intent, Reducer};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// How instances of one registration interact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPolicy {
    /// At most one live instance; a new one supersedes the old
    CancelLatest,
    /// Every instance runs independently
    Concurrent,
}

impl TaskPolicy {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CancelLatest => "cancel_latest",
            Self::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for TaskPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asynchronous workflow triggered by a committed command
///
/// # Example
///
/// ```ignore
/// struct DetailsWorkflow { service: Arc<dyn SearchService> }
///
/// #[async_trait]
/// impl Task<StorefrontReducer> for DetailsWorkflow {
///     async fn run(&self, ctx: TaskContext<StorefrontReducer>, command: Command<StorefrontAction>) {
///         let request = ctx.state(|present| details_request(present)).await;
///         let Ok(response) = ctx.call(self.service.search(request)).await else {
///             return; // superseded
///         };
///         let _ = ctx.dispatch(StorefrontAction::ReceiveDetails(response)).await;
///     }
/// }
/// ```
#[async_trait]
pub trait Task<R: StoreReducer>: Send + Sync + 'static {
    /// Run one instance
    async fn run(&self, ctx: TaskContext<R>, command: Command<R::Action>);
}

#[async_trait]
impl<R, F, Fut> Task<R> for F
where
    R: StoreReducer,
    F: Fn(TaskContext<R>, Command<R::Action>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn run(&self, ctx: TaskContext<R>, command: Command<R::Action>) {
        (self)(ctx, command).await;
    }
}

struct Registration<R: StoreReducer> {
    policy: TaskPolicy,
    task: Arc<dyn Task<R>>,
}

/// A task instance prepared under the store's write lock, spawned after it
pub(crate) struct Launch<R: StoreReducer> {
    kind: KindOf<R>,
    policy: TaskPolicy,
    task: Arc<dyn Task<R>>,
    token: CancellationToken,
    command: Command<R::Action>,
}

/// Per-kind task registry and cancellation bookkeeping
pub struct Orchestrator<R: StoreReducer> {
    registry: HashMap<KindOf<R>, Vec<Registration<R>>>,
    latest: Mutex<HashMap<(KindOf<R>, usize), CancellationToken>>,
    root: CancellationToken,
}

impl<R: StoreReducer> Default for Orchestrator<R> {
    fn default() -> Self {
        Self {
            registry: HashMap::new(),
            latest: Mutex::new(HashMap::new()),
            root: CancellationToken::new(),
        }
    }
}

impl<R: StoreReducer> fmt::Debug for Orchestrator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<_> = self
            .registry
            .iter()
            .map(|(kind, registrations)| {
                let policies: Vec<_> = registrations.iter().map(|r| r.policy).collect();
                (kind.to_string(), policies)
            })
            .collect();
        f.debug_struct("Orchestrator")
            .field("registered", &registered)
            .field("shut_down", &self.root.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<R: StoreReducer> Orchestrator<R> {
    /// Create an empty orchestrator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task for a kind
    pub fn register<T: Task<R>>(&mut self, kind: KindOf<R>, policy: TaskPolicy, task: T) {
        tracing::debug!(%kind, %policy, "Registering task");
        self.registry.entry(kind).or_default().push(Registration {
            policy,
            task: Arc::new(task),
        });
    }

    /// Policies registered for a kind, in registration order
    #[must_use]
    pub fn policies(&self, kind: &KindOf<R>) -> Vec<TaskPolicy> {
        self.registry
            .get(kind)
            .map(|registrations| registrations.iter().map(|r| r.policy).collect())
            .unwrap_or_default()
    }

    /// Whether [`Orchestrator::cancel_all`] has run
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Cancel every live instance and refuse new ones
    pub fn cancel_all(&self) {
        self.root.cancel();
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Allocate tokens for the instances a committed command triggers
    ///
    /// Cancel-latest predecessors are cancelled here, while the caller still
    /// holds the store's write lock, so they cannot commit anything after
    /// the triggering command.
    pub(crate) fn prepare(&self, command: &Command<R::Action>) -> Vec<Launch<R>> {
        if self.root.is_cancelled() {
            return Vec::new();
        }
        let kind = command.kind();
        let Some(registrations) = self.registry.get(&kind) else {
            return Vec::new();
        };

        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        registrations
            .iter()
            .enumerate()
            .map(|(index, registration)| {
                let token = self.root.child_token();
                if registration.policy == TaskPolicy::CancelLatest {
                    if let Some(previous) = latest.insert((kind, index), token.clone()) {
                        if !previous.is_cancelled() {
                            tracing::debug!(%kind, "Cancelling superseded task instance");
                            OrchestratorMetrics::record_cancel(kind);
                            previous.cancel();
                        }
                    }
                }
                Launch {
                    kind,
                    policy: registration.policy,
                    task: Arc::clone(&registration.task),
                    token,
                    command: command.clone(),
                }
            })
            .collect()
    }

    /// Spawn prepared instances
    pub(crate) fn launch(
        launches: Vec<Launch<R>>,
        store: &Store<R>,
        dispatch: &TaskTracking,
        global: &TaskTracking,
    ) {
        for launch in launches {
            dispatch.increment();
            global.increment();
            let guards = (DecrementGuard(dispatch.clone()), DecrementGuard(global.clone()));

            OrchestratorMetrics::record_spawn(launch.kind, launch.policy);
            let span = tracing::debug_span!("task", kind = %launch.kind, policy = %launch.policy);
            let ctx = TaskContext {
                store: store.clone(),
                token: launch.token,
                kind: launch.kind,
            };
            let task = launch.task;
            let command = launch.command;

            tokio::spawn(
                async move {
                    let _guards = guards;
                    tracing::trace!("Task started");
                    task.run(ctx, command).await;
                    tracing::trace!("Task finished");
                }
                .instrument(span),
            );
        }
    }
}

/// The suspension points available to a running task
pub struct TaskContext<R: StoreReducer> {
    store: Store<R>,
    token: CancellationToken,
    kind: KindOf<R>,
}

impl<R: StoreReducer> Clone for TaskContext<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            token: self.token.clone(),
            kind: self.kind,
        }
    }
}

impl<R: StoreReducer> fmt::Debug for TaskContext<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("kind", &self.kind)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<R: StoreReducer> TaskContext<R> {
    /// Kind of the command that triggered this instance
    #[must_use]
    pub const fn kind(&self) -> KindOf<R> {
        self.kind
    }

    /// Whether this instance has been superseded or the store killed
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The injected environment
    #[must_use]
    pub fn environment(&self) -> &<R as Reducer>::Environment {
        self.store.environment()
    }

    /// Read the current present snapshot
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R::State) -> T,
    {
        self.store.state(f).await
    }

    /// The full history snapshot
    pub async fn snapshot(&self) -> Arc<History<R::State>> {
        self.store.snapshot().await
    }

    /// Await an external operation
    ///
    /// The operation is never interrupted; its result is discarded if this
    /// instance was cancelled while it ran.
    ///
    /// # Errors
    ///
    /// [`TaskError::Cancelled`] when the instance was cancelled.
    pub async fn call<F>(&self, operation: F) -> Result<F::Output, TaskError>
    where
        F: Future,
    {
        let output = operation.await;
        if self.token.is_cancelled() {
            tracing::debug!(kind = %self.kind, "Discarding result of cancelled task");
            OrchestratorMetrics::record_discard(self.kind);
            return Err(TaskError::Cancelled);
        }
        Ok(output)
    }

    /// Dispatch follow-up commands
    ///
    /// # Errors
    ///
    /// [`TaskError::Cancelled`] when the instance was cancelled; nothing is dispatched.
    pub async fn dispatch(
        &self,
        intent: impl Into<Intent<R::Action, R::State>> + Send,
    ) -> Result<DispatchHandle, TaskError> {
        self.store.dispatch_guarded(intent.into(), Some(&self.token)).await
    }

    /// Publish an event on the store's bus
    ///
    /// # Errors
    ///
    /// [`TaskError::Cancelled`] when the instance was cancelled; nothing is emitted.
    pub fn emit(&self, event: &R::Event) -> Result<(), TaskError> {
        if self.token.is_cancelled() {
            return Err(TaskError::Cancelled);
        }
        self.store.bus().emit(event);
        Ok(())
    }

    /// Resolves once this instance is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
