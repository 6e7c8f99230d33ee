//! The storefront façade: one store wired with the root reducer, the default
//! validators, the configured checkpoints and every fetch workflow.

use crate::composer::RequestComposers;
use crate::config::StorefrontConfig;
use crate::error::StorefrontError;
use crate::event::StorefrontEvent;
use crate::intents::StorefrontIntent;
use crate::reducers::{StorefrontReducer, root_reducer};
use crate::service::{HttpBridge, SearchService};
use crate::state::Present;
use crate::validators::storefront_validators;
use crate::workflows::{Services, register};
use std::sync::Arc;
use std::time::Duration;
use storefront_sync_core::{EventBus, History};
use storefront_sync_runtime::{DispatchHandle, Store, StoreConfig};

type Renderer = Box<dyn Fn(&Present) + Send + Sync>;

/// Builder for [`Storefront`]
pub struct StorefrontBuilder {
    config: StorefrontConfig,
    service: Arc<dyn SearchService>,
    initial: Option<Present>,
    history: Option<History<Present>>,
    render: Option<Renderer>,
}

impl StorefrontBuilder {
    /// Start from configuration and a search service
    #[must_use]
    pub fn new(config: StorefrontConfig, service: Arc<dyn SearchService>) -> Self {
        Self {
            config,
            service,
            initial: None,
            history: None,
            render: None,
        }
    }

    /// Boot from a given snapshot instead of one derived from configuration
    #[must_use]
    pub fn initial_state(mut self, present: Present) -> Self {
        self.initial = Some(present);
        self
    }

    /// Boot from a saved history
    #[must_use]
    pub fn history(mut self, history: History<Present>) -> Self {
        self.history = Some(history);
        self
    }

    /// Callback invoked with the present after every committed change
    #[must_use]
    pub fn on_render<F>(mut self, render: F) -> Self
    where
        F: Fn(&Present) + Send + Sync + 'static,
    {
        self.render = Some(Box::new(render));
        self
    }

    /// Validate configuration and assemble the store
    ///
    /// # Errors
    ///
    /// [`StorefrontError::Config`] for unusable configuration and
    /// [`StorefrontError::Store`] for a saved history longer than the limit.
    pub fn build(self) -> Result<Storefront, StorefrontError> {
        self.config.validate()?;
        let config = self.config;

        let services = Services::new(
            self.service,
            RequestComposers::new(&config.defaults, &config.overrides),
        );
        let initial = self.initial.unwrap_or_else(|| Present::from_config(&config));
        let store_config = StoreConfig::default().with_history_limit(config.history_limit);
        let checkpoints = config.checkpoints.clone();
        let rewind_on_error = config.rewind_on_error.clone();

        tracing::info!(
            customer = %config.customer_id,
            collection = %config.collection,
            history_limit = config.history_limit,
            "Building storefront"
        );

        let mut builder = Store::builder(initial, root_reducer(), config)
            .config(store_config)
            .checkpoints(checkpoints)
            .rewind_on_error(rewind_on_error)
            .validators(storefront_validators());
        if let Some(history) = self.history {
            builder = builder.history(history)?;
        }
        if let Some(render) = self.render {
            builder = builder.on_render(move |present: &Present| render(present));
        }
        let store = register(builder, &services).build();

        Ok(Storefront { store, services })
    }
}

/// A running storefront
#[derive(Clone)]
pub struct Storefront {
    store: Store<StorefrontReducer>,
    services: Services,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront").field("store", &self.store).finish_non_exhaustive()
    }
}

impl Storefront {
    /// Builder around a custom search service
    #[must_use]
    pub fn builder(config: StorefrontConfig, service: Arc<dyn SearchService>) -> StorefrontBuilder {
        StorefrontBuilder::new(config, service)
    }

    /// Storefront talking to the configured HTTP endpoint
    ///
    /// # Errors
    ///
    /// See [`StorefrontBuilder::build`].
    pub fn connect(config: StorefrontConfig) -> Result<Self, StorefrontError> {
        let bridge = HttpBridge::from_config(&config);
        Self::builder(config, Arc::new(bridge)).build()
    }

    /// Dispatch an intent
    pub async fn dispatch(&self, intent: impl Into<StorefrontIntent> + Send) -> DispatchHandle {
        self.store.dispatch(intent).await
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &Store<StorefrontReducer> {
        &self.store
    }

    /// The event bus
    #[must_use]
    pub fn bus(&self) -> &EventBus<StorefrontEvent> {
        self.store.bus()
    }

    /// Request composers, for inspecting request memory
    #[must_use]
    pub fn composers(&self) -> &RequestComposers {
        &self.services.composers
    }

    /// A copy of the current present
    pub async fn present(&self) -> Present {
        self.store.state(Present::clone).await
    }

    /// Wait until every fetch has finished
    pub async fn settled(&self) {
        self.store.settled().await;
    }

    /// Announce readiness on the bus
    pub fn start(&self) {
        self.store.start();
    }

    /// Stop immediately and cancel every running fetch
    pub fn kill(&self) {
        self.store.kill();
    }

    /// Stop and wait for running fetches to wind down
    ///
    /// # Errors
    ///
    /// [`StorefrontError::Store`] when fetches outlive `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StorefrontError> {
        self.store.shutdown(timeout).await?;
        Ok(())
    }
}
