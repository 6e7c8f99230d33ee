//! The Store - runtime coordinator for the storefront snapshot
//!
//! The Store manages:
//! 1. The bounded-history snapshot (an `Arc<History<S>>` swapped per transition)
//! 2. The validated dispatch pipeline
//! 3. Event notification through the barrier-capable bus
//! 4. The render callback
//! 5. Task spawning through the [`Orchestrator`]
//!
//! # Dispatch pipeline
//!
//! 1. Resolve the intent (deferred intents read the current present)
//! 2. Validate every command against the state *before* the batch
//! 3. Apply the accepted commands to a copy of the history, in order
//! 4. On success swap the snapshot; on a reducer error keep the old one
//! 5. Emit the batch's events, identical ones once, then store notices
//! 6. Call the render callback
//! 7. Spawn tasks registered for the committed kinds
//!
//! Steps 5 to 7 run under a notification lock taken before the history write
//! lock is released, so observers see transitions in commit order. Bus
//! listeners and the render callback must not wait on another dispatch.

use crate::metrics::StoreMetrics;
use crate::orchestrator::{Orchestrator, Task, TaskPolicy};
use crate::{
    DispatchHandle, DispatchOutcome, KindOf, StoreConfig, StoreError, StoreReducer, TaskError,
    TaskTracking,
};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use storefront_sync_core::event_bus::EventBus;
use storefront_sync_core::history::{HistoryConfig, HistoryError, Outcome, Timeline};
use storefront_sync_core::notice::Notice;
use storefront_sync_core::validator::Validators;
use storefront_sync_core::{Command, History, Intent, Reducer};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio_util::sync::CancellationToken;

type Renderer<S> = Box<dyn Fn(&S) + Send + Sync>;

struct Inner<R: StoreReducer> {
    history: RwLock<Arc<History<R::State>>>,
    notify: Mutex<()>,
    timeline: Timeline<R, KindOf<R>>,
    environment: R::Environment,
    validators: Validators<R::Action, R::State>,
    bus: EventBus<R::Event>,
    orchestrator: Orchestrator<R>,
    render: Option<Renderer<R::State>>,
    commands: broadcast::Sender<Command<R::Action>>,
    shutdown: AtomicBool,
    pending: TaskTracking,
    config: StoreConfig,
}

/// The Store
///
/// Cheap to clone; clones share the snapshot, the bus and the task registry.
///
/// # Example
///
/// ```ignore
/// let store = Store::builder(Present::default(), root_reducer(), config)
///     .checkpoints(default_checkpoints())
///     .build();
///
/// store.dispatch(StorefrontAction::UpdateCurrentPage { page: 2 }).await;
/// let page = store.state(|present| present.page.current).await;
/// ```
pub struct Store<R: StoreReducer> {
    inner: Arc<Inner<R>>,
}

impl<R: StoreReducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: StoreReducer> fmt::Debug for Store<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.inner.config)
            .field("orchestrator", &self.inner.orchestrator)
            .field("shutdown", &self.inner.shutdown.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

/// Builder for [`Store`]
pub struct StoreBuilder<R: StoreReducer> {
    history: History<R::State>,
    reducer: R,
    environment: R::Environment,
    config: StoreConfig,
    checkpoints: Vec<KindOf<R>>,
    rewind_on_error: Vec<KindOf<R>>,
    validators: Validators<R::Action, R::State>,
    orchestrator: Orchestrator<R>,
    render: Option<Renderer<R::State>>,
    bus: Option<EventBus<R::Event>>,
}

impl<R: StoreReducer> StoreBuilder<R> {
    /// Set the runtime configuration
    #[must_use]
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Kinds whose application pushes a history entry
    #[must_use]
    pub fn checkpoints(mut self, kinds: impl IntoIterator<Item = KindOf<R>>) -> Self {
        self.checkpoints = kinds.into_iter().collect();
        self
    }

    /// Kinds whose error-tagged responses rewind history
    #[must_use]
    pub fn rewind_on_error(mut self, kinds: impl IntoIterator<Item = KindOf<R>>) -> Self {
        self.rewind_on_error = kinds.into_iter().collect();
        self
    }

    /// Install the validator registry
    #[must_use]
    pub fn validators(mut self, validators: Validators<R::Action, R::State>) -> Self {
        self.validators = validators;
        self
    }

    /// Register a task for a kind
    #[must_use]
    pub fn task<T: Task<R>>(mut self, kind: KindOf<R>, policy: TaskPolicy, task: T) -> Self {
        self.orchestrator.register(kind, policy, task);
        self
    }

    /// Callback invoked with the new present after every committed change
    #[must_use]
    pub fn on_render<F>(mut self, render: F) -> Self
    where
        F: Fn(&R::State) + Send + Sync + 'static,
    {
        self.render = Some(Box::new(render));
        self
    }

    /// Share an existing bus instead of creating one
    #[must_use]
    pub fn bus(mut self, bus: EventBus<R::Event>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Start from a rehydrated history instead of an empty one
    ///
    /// Call after [`StoreBuilder::config`]; the history is checked against
    /// the configured limit.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidHistory`] when `past` exceeds the history limit.
    pub fn history(mut self, history: History<R::State>) -> Result<Self, StoreError> {
        let limit = self.config.history_limit;
        if history.past().len() > limit {
            return Err(HistoryError::PastExceedsLimit {
                len: history.past().len(),
                limit,
            }
            .into());
        }
        self.history = history;
        Ok(self)
    }

    /// Build the store
    #[must_use]
    pub fn build(self) -> Store<R> {
        let history_config = HistoryConfig::new(self.config.history_limit)
            .with_checkpoints(self.checkpoints)
            .with_rewind_on_error(self.rewind_on_error);
        let (commands, _) = broadcast::channel(self.config.broadcast_capacity.max(1));

        Store {
            inner: Arc::new(Inner {
                history: RwLock::new(Arc::new(self.history)),
                notify: Mutex::new(()),
                timeline: Timeline::new(self.reducer, history_config),
                environment: self.environment,
                validators: self.validators,
                bus: self.bus.unwrap_or_default(),
                orchestrator: self.orchestrator,
                render: self.render,
                commands,
                shutdown: AtomicBool::new(false),
                pending: TaskTracking::new(),
                config: self.config,
            }),
        }
    }
}

fn notice_for(outcome: &Outcome, kind: String) -> Option<Notice> {
    match outcome {
        Outcome::Checkpointed => Some(Notice::Checkpoint { kind }),
        Outcome::Undone => Some(Notice::Undone),
        Outcome::Redone => Some(Notice::Redone),
        Outcome::Rewound { message } => Some(Notice::Rewound {
            kind,
            message: message.clone(),
        }),
        Outcome::Surfaced { message } => Some(Notice::FetchFailed {
            kind,
            message: message.clone(),
        }),
        Outcome::Updated | Outcome::Reset | Outcome::Unchanged => None,
    }
}

/// Identical events collapse to their first occurrence
///
/// Events sharing a name but carrying different payloads are all kept.
fn deduplicate<Ev: PartialEq>(events: Vec<Ev>) -> Vec<Ev> {
    let mut kept: Vec<Ev> = Vec::with_capacity(events.len());
    for event in events {
        if !kept.contains(&event) {
            kept.push(event);
        }
    }
    kept
}

impl<R: StoreReducer> Store<R> {
    /// Start building a store around an initial present
    pub fn builder(initial: R::State, reducer: R, environment: R::Environment) -> StoreBuilder<R> {
        StoreBuilder {
            history: History::new(initial),
            reducer,
            environment,
            config: StoreConfig::default(),
            checkpoints: Vec::new(),
            rewind_on_error: Vec::new(),
            validators: Validators::new(),
            orchestrator: Orchestrator::new(),
            render: None,
            bus: None,
        }
    }

    /// Create a store with default configuration and no checkpoints
    #[must_use]
    pub fn new(initial: R::State, reducer: R, environment: R::Environment) -> Self {
        Self::builder(initial, reducer, environment).build()
    }

    /// Dispatch a command, a batch or a deferred intent
    ///
    /// Never fails: rejected commands, reducer failures and shutdown are all
    /// reported through the returned [`DispatchHandle`] and, where observers
    /// care, through the event bus.
    #[tracing::instrument(skip(self, intent), name = "store_dispatch")]
    pub async fn dispatch(
        &self,
        intent: impl Into<Intent<R::Action, R::State>> + Send,
    ) -> DispatchHandle {
        match self.dispatch_guarded(intent.into(), None).await {
            Ok(handle) => handle,
            Err(TaskError::Cancelled) => {
                DispatchHandle::settled(DispatchOutcome::Suppressed, Vec::new())
            },
        }
    }

    /// Dispatch on behalf of a task; refused once `guard` is cancelled
    pub(crate) async fn dispatch_guarded(
        &self,
        intent: Intent<R::Action, R::State>,
        guard: Option<&CancellationToken>,
    ) -> Result<DispatchHandle, TaskError> {
        let inner = &self.inner;

        if inner.shutdown.load(Ordering::Acquire) {
            tracing::warn!("Dropped dispatch: store is shut down");
            StoreMetrics::record_shutdown_drop();
            return Ok(DispatchHandle::settled(DispatchOutcome::Suppressed, Vec::new()));
        }

        let tracking = TaskTracking::new();
        let mut slot = inner.history.write().await;
        tracing::trace!("Acquired write lock on history");

        if guard.is_some_and(CancellationToken::is_cancelled) {
            tracing::debug!("Suppressed dispatch from cancelled task");
            return Err(TaskError::Cancelled);
        }

        let current = Arc::clone(&slot);
        let commands = intent.resolve(current.present());

        let mut accepted = Vec::with_capacity(commands.len());
        let mut rejections = Vec::new();
        for command in commands {
            StoreMetrics::record_command(command.kind());
            match inner.validators.validate(command.action(), current.present()) {
                Ok(()) => accepted.push(command),
                Err(rejected) => {
                    tracing::warn!(
                        kind = %rejected.kind,
                        reason = %rejected.message,
                        "Command rejected by validator"
                    );
                    StoreMetrics::record_rejection(command.kind());
                    rejections.push(rejected);
                },
            }
        }

        if accepted.is_empty() {
            return Ok(DispatchHandle::settled(DispatchOutcome::Rejected, rejections));
        }

        let span = tracing::debug_span!("apply", commands = accepted.len());
        let applied = {
            let _enter = span.enter();
            let start = Instant::now();
            let mut next = (*current).clone();
            let mut events = Vec::new();
            let mut notices = Vec::new();
            let mut failure = None;

            for command in &accepted {
                match inner.timeline.apply(&mut next, command.action(), &inner.environment) {
                    Ok(applied) => {
                        for effect in applied.effects {
                            effect.collect_events(&mut events);
                        }
                        notices.extend(notice_for(&applied.outcome, command.kind().to_string()));
                    },
                    Err(error) => {
                        failure = Some((command.kind(), error));
                        break;
                    },
                }
            }
            StoreMetrics::record_apply(start.elapsed());

            match failure {
                Some(failed) => Err(failed),
                None => Ok((next, events, notices)),
            }
        };

        let (next, events, notices) = match applied {
            Ok(applied) => applied,
            Err((kind, error)) => {
                let notifying = inner.notify.lock().await;
                drop(slot);
                tracing::error!(%kind, %error, "State transition failed; keeping previous snapshot");
                StoreMetrics::record_apply_failure(kind);
                inner.bus.emit(&R::Event::from(Notice::ApplyFailed {
                    kind: kind.to_string(),
                    error: error.clone(),
                }));
                drop(notifying);
                return Ok(DispatchHandle::settled(DispatchOutcome::Failed(error), rejections));
            },
        };

        let next = Arc::new(next);
        *slot = Arc::clone(&next);

        let launches: Vec<_> = accepted
            .iter()
            .flat_map(|command| inner.orchestrator.prepare(command))
            .collect();
        let notifying = inner.notify.lock().await;
        drop(slot);

        let committed = accepted.len();
        for command in accepted {
            let _ = inner.commands.send(command);
        }

        let mut notifications = events;
        notifications.extend(notices.into_iter().map(R::Event::from));
        for event in deduplicate(notifications) {
            inner.bus.emit(&event);
        }

        if let Some(render) = &inner.render {
            render(next.present());
        }

        Orchestrator::launch(launches, self, &tracking, &inner.pending);
        drop(notifying);
        tracing::debug!(committed, "Dispatch completed");

        Ok(DispatchHandle::new(
            DispatchOutcome::Committed {
                commands: committed,
            },
            rejections,
            &tracking,
        ))
    }

    /// Read the current present via a closure
    ///
    /// ```ignore
    /// let query = store.state(|present| present.query.clone()).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R::State) -> T,
    {
        let snapshot = self.snapshot().await;
        f(snapshot.present())
    }

    /// The full history snapshot; never a partial one
    pub async fn snapshot(&self) -> Arc<History<R::State>> {
        Arc::clone(&*self.inner.history.read().await)
    }

    /// The injected environment
    #[must_use]
    pub fn environment(&self) -> &<R as Reducer>::Environment {
        &self.inner.environment
    }

    /// The event bus
    #[must_use]
    pub fn bus(&self) -> &EventBus<R::Event> {
        &self.inner.bus
    }

    /// The task registry
    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator<R> {
        &self.inner.orchestrator
    }

    /// Runtime configuration
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Subscribe to committed commands
    #[must_use]
    pub fn subscribe_commands(&self) -> broadcast::Receiver<Command<R::Action>> {
        self.inner.commands.subscribe()
    }

    /// Tasks currently running across all dispatches
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.inner.pending.pending()
    }

    /// Wait until no task is running
    ///
    /// Follow-up tasks spawned by tasks are waited for too.
    pub async fn settled(&self) {
        let mut completion = self.inner.pending.subscribe();
        while self.inner.pending.pending() > 0 {
            if completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Announce that the store is ready
    pub fn start(&self) {
        tracing::info!("Store started");
        self.inner.bus.emit(&R::Event::from(Notice::Started));
    }

    /// Whether the store has been killed
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Stop accepting dispatches and cancel every running task
    pub fn kill(&self) {
        if self.inner.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("Store killed");
        StoreMetrics::record_kill();
        self.inner.orchestrator.cancel_all();
        self.inner.bus.emit(&R::Event::from(Notice::Killed));
    }

    /// Kill the store and wait for running tasks to wind down
    ///
    /// # Errors
    ///
    /// [`StoreError::ShutdownTimeout`] if tasks are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.kill();
        match tokio::time::timeout(timeout, self.settled()).await {
            Ok(()) => {
                tracing::info!("All tasks completed, shutdown successful");
                Ok(())
            },
            Err(_) => {
                let pending = self.pending_tasks();
                tracing::error!(pending_tasks = pending, "Shutdown timeout");
                Err(StoreError::ShutdownTimeout(pending))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::sync::Mutex;
    use storefront_sync_core::event_bus::BusEvent;
    use storefront_sync_core::{
        Action, Effect, Effects, HistoryDirective, ReduceError, Validator, smallvec,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum CounterAction {
        Set(i64),
        Add(i64),
        Tag(&'static str),
        Undo,
        Explode,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum CounterKind {
        Set,
        Add,
        Tag,
        Undo,
        Explode,
    }

    impl fmt::Display for CounterKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Action for CounterAction {
        type Kind = CounterKind;

        fn kind(&self) -> CounterKind {
            match self {
                Self::Set(_) => CounterKind::Set,
                Self::Add(_) => CounterKind::Add,
                Self::Tag(_) => CounterKind::Tag,
                Self::Undo => CounterKind::Undo,
                Self::Explode => CounterKind::Explode,
            }
        }

        fn history(&self) -> HistoryDirective {
            match self {
                Self::Undo => HistoryDirective::Undo,
                _ => HistoryDirective::Record,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum CounterEvent {
        Changed,
        Tagged(&'static str),
        Notice(Notice),
    }

    impl BusEvent for CounterEvent {
        fn name(&self) -> Cow<'static, str> {
            match self {
                Self::Changed => Cow::Borrowed("changed"),
                Self::Tagged(_) => Cow::Borrowed("tagged"),
                Self::Notice(Notice::ApplyFailed { .. }) => Cow::Borrowed("error:action"),
                Self::Notice(Notice::Checkpoint { .. }) => Cow::Borrowed("history_save"),
                Self::Notice(_) => Cow::Borrowed("notice"),
            }
        }
    }

    impl From<Notice> for CounterEvent {
        fn from(notice: Notice) -> Self {
            Self::Notice(notice)
        }
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = i64;
        type Action = CounterAction;
        type Event = CounterEvent;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut i64,
            action: &CounterAction,
            _env: &(),
        ) -> Result<Effects<CounterEvent>, ReduceError> {
            match action {
                CounterAction::Set(value) => *state = *value,
                CounterAction::Add(delta) => *state += delta,
                CounterAction::Explode => return Err(ReduceError::new("counter", "exploded")),
                CounterAction::Tag(tag) => return Ok(smallvec![Effect::Emit(CounterEvent::Tagged(*tag))]),
                CounterAction::Undo => {},
            }
            Ok(smallvec![Effect::Emit(CounterEvent::Changed)])
        }
    }

    fn store() -> Store<CounterReducer> {
        let mut validators = Validators::new();
        validators.register(
            CounterKind::Set,
            Validator::new("value already set", |action: &CounterAction, state: &i64| {
                !matches!(action, CounterAction::Set(value) if value == state)
            }),
        );

        Store::builder(0, CounterReducer, ())
            .checkpoints([CounterKind::Set])
            .validators(validators)
            .build()
    }

    fn record(store: &Store<CounterReducer>) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.bus().on_any(move |event: &CounterEvent| {
            sink.lock().unwrap().push(event.name().into_owned());
        });
        seen
    }

    #[tokio::test]
    async fn valid_command_commits_one_transition() {
        let store = store();
        let seen = record(&store);

        let handle = store.dispatch(CounterAction::Set(3)).await;

        assert_eq!(handle.outcome(), &DispatchOutcome::Committed { commands: 1 });
        assert_eq!(store.state(|value| *value).await, 3);
        assert_eq!(store.snapshot().await.past().len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["changed", "history_save"]);
    }

    #[tokio::test]
    async fn rejected_command_changes_nothing() {
        let store = store();
        let seen = record(&store);

        let handle = store.dispatch(CounterAction::Set(0)).await;

        assert_eq!(handle.outcome(), &DispatchOutcome::Rejected);
        assert_eq!(handle.rejections()[0].message, "value already set");
        assert!(store.snapshot().await.past().is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_is_validated_against_pre_batch_state() {
        let store = store();

        // The second Set(0) would be a no-op against the pre-batch state,
        // so it is rejected even though Set(5) precedes it.
        let handle = store
            .dispatch(Intent::batch(vec![CounterAction::Set(5), CounterAction::Set(0)]))
            .await;

        assert_eq!(handle.outcome(), &DispatchOutcome::Committed { commands: 1 });
        assert_eq!(handle.rejections().len(), 1);
        assert_eq!(store.state(|value| *value).await, 5);
    }

    #[tokio::test]
    async fn batch_emits_each_event_once() {
        let store = store();
        let seen = record(&store);

        store
            .dispatch(Intent::batch(vec![
                CounterAction::Add(1),
                CounterAction::Add(2),
                CounterAction::Add(3),
            ]))
            .await;

        assert_eq!(store.state(|value| *value).await, 6);
        assert_eq!(*seen.lock().unwrap(), vec!["changed"]);
    }

    #[tokio::test]
    async fn batch_keeps_same_named_events_with_distinct_payloads() {
        let store = store();
        let tags = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&tags);
        store
            .bus()
            .on("tagged", move |event: &CounterEvent| {
                if let CounterEvent::Tagged(tag) = event {
                    sink.lock().unwrap().push(*tag);
                }
            })
            .unwrap();

        store
            .dispatch(Intent::batch(vec![
                CounterAction::Tag("grid"),
                CounterAction::Tag("list"),
                CounterAction::Tag("grid"),
            ]))
            .await;

        assert_eq!(*tags.lock().unwrap(), vec!["grid", "list"]);
    }

    #[tokio::test]
    async fn reducer_failure_rolls_back_whole_batch() {
        let store = store();
        let seen = record(&store);

        let handle = store
            .dispatch(Intent::batch(vec![CounterAction::Set(9), CounterAction::Explode]))
            .await;

        assert_eq!(handle.failure().map(|e| e.reason.as_str()), Some("exploded"));
        let snapshot = store.snapshot().await;
        assert_eq!(*snapshot.present(), 0);
        assert!(snapshot.past().is_empty());
        assert_eq!(*seen.lock().unwrap(), vec!["error:action"]);
    }

    #[tokio::test]
    async fn deferred_intent_reads_current_state() {
        let store = store();
        store.dispatch(CounterAction::Set(4)).await;

        store
            .dispatch(Intent::deferred(|value: &i64| {
                Intent::from(CounterAction::Add(*value))
            }))
            .await;

        assert_eq!(store.state(|value| *value).await, 8);
    }

    #[tokio::test]
    async fn undo_restores_previous_checkpoint() {
        let store = store();
        store.dispatch(CounterAction::Set(1)).await;
        store.dispatch(CounterAction::Set(2)).await;

        store.dispatch(CounterAction::Undo).await;

        let snapshot = store.snapshot().await;
        assert_eq!(*snapshot.present(), 1);
        assert_eq!(snapshot.future().len(), 1);
    }

    #[tokio::test]
    async fn render_sees_each_committed_present() {
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&rendered);
        let store = Store::builder(0, CounterReducer, ())
            .on_render(move |value: &i64| sink.lock().unwrap().push(*value))
            .build();

        store.dispatch(CounterAction::Add(2)).await;
        store.dispatch(CounterAction::Explode).await;
        store.dispatch(CounterAction::Add(3)).await;

        assert_eq!(*rendered.lock().unwrap(), vec![2, 5]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dispatches_render_in_commit_order() {
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&rendered);
        let store = Store::builder(0, CounterReducer, ())
            .on_render(move |value: &i64| sink.lock().unwrap().push(*value))
            .build();

        let dispatches: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.dispatch(CounterAction::Add(1)).await;
                })
            })
            .collect();
        for dispatch in dispatches {
            dispatch.await.unwrap();
        }

        assert_eq!(store.state(|value| *value).await, 64);
        assert_eq!(*rendered.lock().unwrap(), (1..=64).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn killed_store_drops_dispatches() {
        let store = store();
        let seen = record(&store);

        store.kill();
        let handle = store.dispatch(CounterAction::Set(1)).await;

        assert_eq!(handle.outcome(), &DispatchOutcome::Suppressed);
        assert_eq!(store.state(|value| *value).await, 0);
        assert_eq!(*seen.lock().unwrap(), vec!["notice"]);
        assert!(store.is_shut_down());
    }

    #[tokio::test]
    async fn oversized_history_is_refused() {
        let history = History::from_parts([1, 2, 3], 4, [], 3).unwrap();

        let result = Store::builder(0, CounterReducer, ())
            .config(StoreConfig::default().with_history_limit(2))
            .history(history);

        assert!(matches!(result, Err(StoreError::InvalidHistory(_))));
    }

    #[tokio::test]
    async fn committed_commands_are_broadcast() {
        let store = store();
        let mut commands = store.subscribe_commands();

        store.dispatch(CounterAction::Add(7)).await;

        let command = commands.recv().await.unwrap();
        assert_eq!(command.action(), &CounterAction::Add(7));
    }
}
