//! # Storefront Sync Testing
//!
//! Testing utilities and helpers for the storefront sync engine.
//!
//! This crate provides:
//! - [`ReducerTest`], a Given/When/Then harness for reducers
//! - [`RecordingListener`], which captures everything emitted on a bus
//! - [`Gates`], which hold scripted async work until a test releases it
//! - [`init_tracing`], a once-only subscriber for test output
//!
//! ## Example
//!
//! ```ignore
//! use storefront_sync_testing::{Gates, RecordingListener, init_tracing};
//!
//! #[tokio::test]
//! async fn search_emits_products() {
//!     init_tracing();
//!     let storefront = test_storefront();
//!     let events = RecordingListener::attach(storefront.store().bus());
//!
//!     storefront.dispatch(search("boots")).await;
//!     storefront.store().settled().await;
//!
//!     assert!(events.saw("products_updated"));
//! }
//! ```


pub use reducer_test::{ReducerTest, assertions};

/// Mock building blocks for asynchronous collaborators
pub mod mocks {
    use std::collections::HashMap;
    use std::fmt::Debug;
    use std::hash::Hash;
    use std::sync::{Arc, Mutex, PoisonError};
    use tokio::sync::watch;

    /// Named latches for scripting the order in which async work completes
    ///
    /// A task awaiting [`Gates::wait`] is held until the test calls
    /// [`Gates::open`] for the same key. Opening before waiting is fine.
    ///
    /// # Example
    ///
    /// ```
    /// use storefront_sync_testing::Gates;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let gates = Gates::new();
    /// gates.open("second");
    /// gates.wait("second").await;
    /// assert!(gates.is_open(&"second"));
    /// # }
    /// ```
    #[derive(Debug)]
    pub struct Gates<K> {
        latches: Arc<Mutex<HashMap<K, watch::Sender<bool>>>>,
    }

    impl<K> Clone for Gates<K> {
        fn clone(&self) -> Self {
            Self {
                latches: Arc::clone(&self.latches),
            }
        }
    }

    impl<K: Eq + Hash + Clone + Debug> Default for Gates<K> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<K: Eq + Hash + Clone + Debug> Gates<K> {
        /// Create a set of closed gates
        #[must_use]
        pub fn new() -> Self {
            Self {
                latches: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        fn latch(&self, key: &K) -> watch::Receiver<bool> {
            let mut latches = self.latches.lock().unwrap_or_else(PoisonError::into_inner);
            latches
                .entry(key.clone())
                .or_insert_with(|| watch::channel(false).0)
                .subscribe()
        }

        /// Release everything waiting on `key`
        pub fn open(&self, key: K) {
            let mut latches = self.latches.lock().unwrap_or_else(PoisonError::into_inner);
            latches
                .entry(key)
                .or_insert_with(|| watch::channel(false).0)
                .send_replace(true);
        }

        /// Whether `key` has been opened
        #[must_use]
        pub fn is_open(&self, key: &K) -> bool {
            *self.latch(key).borrow()
        }

        /// Wait until `key` is opened
        pub async fn wait(&self, key: K) {
            let mut latch = self.latch(&key);
            let _ = latch.wait_for(|open| *open).await;
        }
    }
}

/// Helpers for observing a running store
pub mod helpers {
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use storefront_sync_core::event_bus::{BusEvent, EventBus, ListenerId};

    /// Captures every event emitted on a bus
    #[derive(Debug)]
    pub struct RecordingListener<Ev> {
        events: Arc<Mutex<Vec<Ev>>>,
        id: ListenerId,
    }

    impl<Ev: BusEvent> RecordingListener<Ev> {
        /// Subscribe to every event on `bus`
        #[must_use]
        pub fn attach(bus: &EventBus<Ev>) -> Self {
            let events = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&events);
            let id = bus.on_any(move |event: &Ev| {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(event.clone());
            });
            Self { events, id }
        }

        fn lock(&self) -> MutexGuard<'_, Vec<Ev>> {
            self.events.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Listener handle on the bus
        #[must_use]
        pub const fn id(&self) -> ListenerId {
            self.id
        }

        /// Everything recorded so far
        #[must_use]
        pub fn events(&self) -> Vec<Ev> {
            self.lock().clone()
        }

        /// Names of everything recorded so far, in order
        #[must_use]
        pub fn names(&self) -> Vec<String> {
            self.lock().iter().map(|event| event.name().into_owned()).collect()
        }

        /// How many events named `name` were recorded
        #[must_use]
        pub fn count(&self, name: &str) -> usize {
            self.lock().iter().filter(|event| event.name() == name).count()
        }

        /// Whether an event named `name` was recorded
        #[must_use]
        pub fn saw(&self, name: &str) -> bool {
            self.count(name) > 0
        }

        /// Forget everything recorded so far
        pub fn clear(&self) {
            self.lock().clear();
        }
    }

    /// Install a test subscriber honouring `RUST_LOG`; safe to call repeatedly
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use helpers::{RecordingListener, init_tracing};
pub use mocks::Gates;

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use storefront_sync_core::event_bus::{BusEvent, EventBus};

    #[derive(Debug, Clone, PartialEq)]
    struct Named(&'static str);

    impl BusEvent for Named {
        fn name(&self) -> Cow<'static, str> {
            Cow::Borrowed(self.0)
        }
    }

    #[test]
    fn recording_listener_captures_in_order() {
        let bus = EventBus::new();
        let recorder = RecordingListener::attach(&bus);

        bus.emit(&Named("query_changed"));
        bus.emit(&Named("page_updated"));
        bus.emit(&Named("page_updated"));

        assert_eq!(recorder.names(), vec!["query_changed", "page_updated", "page_updated"]);
        assert_eq!(recorder.count("page_updated"), 2);

        recorder.clear();
        assert!(!recorder.saw("query_changed"));
    }

    #[tokio::test]
    async fn gates_release_waiters_in_scripted_order() {
        let gates = Gates::new();
        let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for key in [1, 2] {
            let gates = gates.clone();
            let order = std::sync::Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                gates.wait(key).await;
                order.lock().unwrap().push(key);
            }));
        }

        gates.open(2);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        gates.open(1);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![2, 1]);
    }
}
