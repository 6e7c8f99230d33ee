//! # Storefront Sync Search
//!
//! The faceted-search storefront domain built on the storefront sync engine.
//!
//! A [`Storefront`] owns one store whose present snapshot holds everything a
//! result page shows: query, facets and their selections, the product window,
//! pagination, sorting, collections, autocomplete, product details,
//! recommendations and past purchases. Shopper interactions are dispatched as
//! intents (see [`intents`]), validated, reduced region by region, and
//! checkpointed into a bounded undo history. Fetch triggers start workflows
//! (see [`workflows`]) that compose requests with per-name memory, call the
//! [`SearchService`], reconcile the results and dispatch them back.
//!
//! ## Example
//!
//! ```ignore
//! use storefront_sync_search::{Storefront, StorefrontConfig, intents};
//!
//! let config = StorefrontConfig::from_env()?;
//! let storefront = Storefront::connect(config)?;
//! storefront.start();
//!
//! storefront.bus().join_on(["fetch:products:done", "navigations_updated"], |_| {
//!     println!("results ready");
//! })?;
//!
//! storefront.dispatch(intents::search("boots")).await;
//! storefront.dispatch(intents::select_refinement("color", 0)).await;
//! storefront.dispatch(intents::undo()).await;
//! ```

/// The command vocabulary
pub mod action;

/// Request composition and request memory
pub mod composer;

/// Storefront configuration
pub mod config;

/// Error types
pub mod error;

/// Bus events
pub mod event;

/// Intent constructors for shopper interactions
pub mod intents;

/// Wire and state models
pub mod models;

/// Facet reconciliation
pub mod reconcile;

/// Region reducers
pub mod reducers;

/// State-derived base requests
pub mod requests;

/// Outbound search service
pub mod service;

/// The present snapshot
pub mod state;

/// The storefront façade
pub mod storefront;

/// No-op guards
pub mod validators;

/// Fetch workflows
pub mod workflows;

pub use action::{FetchFailure, StorefrontAction, StorefrontKind};
pub use composer::{RequestComposers, RequestName, RequestOverride};
pub use config::StorefrontConfig;
pub use error::{ConfigError, ServiceError, StorefrontError};
pub use event::StorefrontEvent;
pub use intents::StorefrontIntent;
pub use reducers::{StorefrontReducer, root_reducer};
pub use service::{HttpBridge, SearchService};
pub use state::Present;
pub use storefront::{Storefront, StorefrontBuilder};
