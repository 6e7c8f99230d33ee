//! Publish/subscribe bus with AND-barrier joins.
//!
//! Direct listeners subscribe to one event name (or to every event). A join
//! registers a callback on a *set* of names: it fires once every name in the
//! set has been emitted at least once since the last firing, after which all
//! counters of that barrier return to zero.
//!
//! Barrier identity is the sorted, deduplicated set of names, so joining
//! `["b", "a"]` and `["a", "b", "a"]` adds two callbacks to one barrier. The
//! barrier is torn down when its last callback leaves.
//!
//! Callbacks run after the bus lock is released; they may subscribe,
//! unsubscribe or emit re-entrantly.
//!
//! # Example
//!
//! ```
//! use std::borrow::Cow;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use storefront_sync_core::event_bus::{BusEvent, EventBus};
//!
//! #[derive(Clone)]
//! struct Updated(&'static str);
//!
//! impl BusEvent for Updated {
//!     fn name(&self) -> Cow<'static, str> {
//!         Cow::Borrowed(self.0)
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let fired = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&fired);
//! bus.join_on(["products_updated", "navigations_updated"], move |_: &Updated| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! })
//! .unwrap();
//!
//! bus.emit(&Updated("products_updated"));
//! bus.emit(&Updated("navigations_updated"));
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// An event that can travel through an [`EventBus`]
pub trait BusEvent: Clone + Send + Sync + 'static {
    /// Name listeners and barriers key on
    fn name(&self) -> Cow<'static, str>;
}

/// Errors from bus registration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// Event names must be non-blank
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Handle returned by every registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type Listener<Ev> = Arc<dyn Fn(&Ev) + Send + Sync>;

struct Barrier<Ev> {
    counts: BTreeMap<String, u32>,
    callbacks: Vec<(ListenerId, Listener<Ev>)>,
}

impl<Ev> Barrier<Ev> {
    fn new(key: &BTreeSet<String>) -> Self {
        Self {
            counts: key.iter().map(|name| (name.clone(), 0)).collect(),
            callbacks: Vec::new(),
        }
    }

    /// Count one occurrence; returns `true` when the barrier trips
    fn observe(&mut self, name: &str) -> bool {
        let Some(count) = self.counts.get_mut(name) else {
            return false;
        };
        *count = count.saturating_add(1);

        if self.counts.values().all(|count| *count >= 1) {
            self.counts.values_mut().for_each(|count| *count = 0);
            return true;
        }
        false
    }
}

struct Registry<Ev> {
    next_id: u64,
    direct: HashMap<String, Vec<(ListenerId, Listener<Ev>)>>,
    any: Vec<(ListenerId, Listener<Ev>)>,
    barriers: BTreeMap<BTreeSet<String>, Barrier<Ev>>,
}

impl<Ev> Registry<Ev> {
    fn allocate(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }
}

/// Barrier-capable event bus; clones share one registry
pub struct EventBus<Ev> {
    registry: Arc<Mutex<Registry<Ev>>>,
}

impl<Ev> Clone for EventBus<Ev> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<Ev: BusEvent> Default for EventBus<Ev> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ev> fmt::Debug for EventBus<Ev> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

fn barrier_key<I, N>(names: I) -> Result<BTreeSet<String>, EventBusError>
where
    I: IntoIterator<Item = N>,
    N: Into<String>,
{
    names
        .into_iter()
        .map(|name| {
            let name = name.into();
            if name.trim().is_empty() {
                Err(EventBusError::InvalidArgument(
                    "event names must not be blank".to_string(),
                ))
            } else {
                Ok(name)
            }
        })
        .collect()
}

impl<Ev: BusEvent> EventBus<Ev> {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                direct: HashMap::new(),
                any: Vec::new(),
                barriers: BTreeMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<Ev>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to one event name
    ///
    /// # Errors
    ///
    /// [`EventBusError::InvalidArgument`] when `name` is blank.
    pub fn on<F>(&self, name: impl Into<String>, callback: F) -> Result<ListenerId, EventBusError>
    where
        F: Fn(&Ev) + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EventBusError::InvalidArgument(
                "event name must not be blank".to_string(),
            ));
        }

        let mut registry = self.lock();
        let id = registry.allocate();
        registry
            .direct
            .entry(name)
            .or_default()
            .push((id, Arc::new(callback)));
        Ok(id)
    }

    /// Subscribe to every event
    pub fn on_any<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&Ev) + Send + Sync + 'static,
    {
        let mut registry = self.lock();
        let id = registry.allocate();
        registry.any.push((id, Arc::new(callback)));
        id
    }

    /// Remove a listener registered under `name`, or through `on_any`
    ///
    /// Returns whether anything was removed.
    pub fn off(&self, name: &str, id: ListenerId) -> bool {
        let mut registry = self.lock();
        if let Some(listeners) = registry.direct.get_mut(name) {
            let before = listeners.len();
            listeners.retain(|(listener, _)| *listener != id);
            let removed = listeners.len() != before;
            if listeners.is_empty() {
                registry.direct.remove(name);
            }
            if removed {
                return true;
            }
        }

        let before = registry.any.len();
        registry.any.retain(|(listener, _)| *listener != id);
        registry.any.len() != before
    }

    /// Register a callback that fires once all `names` have been emitted
    ///
    /// Returns `None` for an empty name set (nothing is registered).
    ///
    /// # Errors
    ///
    /// [`EventBusError::InvalidArgument`] when any name is blank.
    pub fn join_on<I, N, F>(&self, names: I, callback: F) -> Result<Option<ListenerId>, EventBusError>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
        F: Fn(&Ev) + Send + Sync + 'static,
    {
        let key = barrier_key(names)?;
        if key.is_empty() {
            return Ok(None);
        }

        let mut registry = self.lock();
        let id = registry.allocate();
        registry
            .barriers
            .entry(key)
            .or_insert_with_key(Barrier::new)
            .callbacks
            .push((id, Arc::new(callback)));
        Ok(Some(id))
    }

    /// Remove a join callback; the barrier goes away with its last callback
    ///
    /// # Errors
    ///
    /// [`EventBusError::InvalidArgument`] when any name is blank.
    pub fn leave_join<I, N>(&self, names: I, id: ListenerId) -> Result<bool, EventBusError>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let key = barrier_key(names)?;
        let mut registry = self.lock();

        let Some(barrier) = registry.barriers.get_mut(&key) else {
            return Ok(false);
        };
        let before = barrier.callbacks.len();
        barrier.callbacks.retain(|(callback, _)| *callback != id);
        let removed = barrier.callbacks.len() != before;

        if barrier.callbacks.is_empty() {
            registry.barriers.remove(&key);
        }
        Ok(removed)
    }

    /// Publish an event; returns how many callbacks ran
    pub fn emit(&self, event: &Ev) -> usize {
        let name = event.name();

        let pending: Vec<Listener<Ev>> = {
            let mut registry = self.lock();
            let mut pending: Vec<Listener<Ev>> = registry
                .direct
                .get(name.as_ref())
                .into_iter()
                .flatten()
                .chain(registry.any.iter())
                .map(|(_, listener)| Arc::clone(listener))
                .collect();

            for barrier in registry.barriers.values_mut() {
                if barrier.observe(&name) {
                    pending.extend(barrier.callbacks.iter().map(|(_, cb)| Arc::clone(cb)));
                }
            }
            pending
        };

        tracing::trace!(event = %name, callbacks = pending.len(), "Emitting event");
        for listener in &pending {
            listener(event);
        }
        pending.len()
    }

    /// Number of direct listeners for `name`
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.lock().direct.get(name).map_or(0, Vec::len)
    }

    /// Number of live barriers
    #[must_use]
    pub fn barrier_count(&self) -> usize {
        self.lock().barriers.len()
    }
}
