//! Configuration management for the storefront.
//!
//! Loads configuration from environment variables with sensible defaults, or
//! from any serde source. Request override hooks cannot be deserialized and
//! are attached through [`StorefrontConfigBuilder::override_request`].

use crate::action::StorefrontKind;
use crate::composer::{RequestName, RequestOverride, RequestOverrides};
use crate::error::ConfigError;
use crate::models::{JsonObject, SortOption};
use crate::state::PreservedField;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use storefront_sync_core::history::DEFAULT_HISTORY_LIMIT;

/// Autocomplete sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocompleteConfig {
    /// Query suggestions kept
    pub suggestion_count: usize,
    /// Facet suggestions requested
    pub navigation_count: usize,
    /// Preview products requested
    pub product_count: usize,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            suggestion_count: 5,
            navigation_count: 3,
            product_count: 4,
        }
    }
}

/// Recommendations sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationsConfig {
    /// Products requested
    pub product_count: usize,
    /// Recommendation strategy sent to the service
    pub strategy: String,
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            product_count: 5,
            strategy: "popular".to_string(),
        }
    }
}

/// Past purchases access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PastPurchasesConfig {
    /// Signed shopper identity; without it the feature is off
    pub secured_payload: Option<String>,
    /// Products requested
    pub product_count: usize,
    /// Record field holding the SKU
    pub sku_field: String,
}

impl Default for PastPurchasesConfig {
    fn default() -> Self {
        Self {
            secured_payload: None,
            product_count: 20,
            sku_field: "sku".to_string(),
        }
    }
}

/// Biasing from shopper behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalizationConfig {
    /// Record a bias when a value refinement is selected
    pub enabled: bool,
    /// Bias entries kept, most recent first
    pub max_biases: usize,
    /// Strength sent with each bias
    pub strength: String,
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_biases: 3,
            strength: "Medium_Increase".to_string(),
        }
    }
}

/// Storefront configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Customer id issued by the search provider
    pub customer_id: String,
    /// Base URL of the query services
    pub endpoint: String,
    /// Search area
    pub area: String,
    /// Collection searched at boot
    pub collection: String,
    /// Session id at boot
    pub session_id: Option<String>,
    /// Records per page at boot
    pub page_size: usize,
    /// Page sizes offered
    pub page_sizes: Vec<usize>,
    /// Sort options offered; the first is active at boot
    pub sorts: Vec<SortOption>,
    /// Refinements kept per facet after a search
    pub max_refinements: usize,
    /// Undo stack length
    pub history_limit: usize,
    /// Kinds that push a history entry
    pub checkpoints: Vec<StorefrontKind>,
    /// Kinds whose error responses rewind the last checkpoint
    pub rewind_on_error: Vec<StorefrontKind>,
    /// Regions kept from the replaced snapshot on restore
    pub preserved_on_restore: Vec<PreservedField>,
    /// Record field holding the product id
    pub id_field: String,
    /// Values shown first, per facet field
    pub pinned_refinements: BTreeMap<String, Vec<String>>,
    /// Autocomplete sizes
    pub autocomplete: AutocompleteConfig,
    /// Recommendations sizes
    pub recommendations: RecommendationsConfig,
    /// Past purchases access
    pub past_purchases: PastPurchasesConfig,
    /// Biasing from shopper behaviour
    pub personalization: PersonalizationConfig,
    /// Service defaults merged under every request of a name
    pub defaults: BTreeMap<RequestName, JsonObject>,
    /// Hooks rewriting composed requests
    #[serde(skip)]
    pub overrides: RequestOverrides,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            customer_id: String::new(),
            endpoint: "http://localhost:8080".to_string(),
            area: "Production".to_string(),
            collection: "default".to_string(),
            session_id: None,
            page_size: 10,
            page_sizes: vec![10, 25, 50, 100],
            sorts: vec![SortOption {
                label: "Relevance".to_string(),
                field: String::new(),
                descending: false,
            }],
            max_refinements: 20,
            history_limit: DEFAULT_HISTORY_LIMIT,
            checkpoints: StorefrontKind::DEFAULT_CHECKPOINTS.to_vec(),
            rewind_on_error: vec![StorefrontKind::ReceiveProducts],
            preserved_on_restore: vec![
                PreservedField::Personalization,
                PreservedField::SessionId,
                PreservedField::Autocomplete,
            ],
            id_field: "id".to_string(),
            pinned_refinements: BTreeMap::new(),
            autocomplete: AutocompleteConfig::default(),
            recommendations: RecommendationsConfig::default(),
            past_purchases: PastPurchasesConfig::default(),
            personalization: PersonalizationConfig::default(),
            defaults: BTreeMap::new(),
            overrides: RequestOverrides::new(),
        }
    }
}

fn parsed<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }),
    }
}

impl StorefrontConfig {
    /// Start building a configuration for a customer
    #[must_use]
    pub fn builder(customer_id: impl Into<String>) -> StorefrontConfigBuilder {
        StorefrontConfigBuilder {
            config: Self {
                customer_id: customer_id.into(),
                ..Self::default()
            },
        }
    }

    /// Load configuration from `STOREFRONT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if `STOREFRONT_CUSTOMER_ID` is missing or a numeric
    /// setting does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            customer_id: lookup("STOREFRONT_CUSTOMER_ID")
                .ok_or(ConfigError::Missing("STOREFRONT_CUSTOMER_ID"))?,
            endpoint: lookup("STOREFRONT_ENDPOINT").unwrap_or(defaults.endpoint),
            area: lookup("STOREFRONT_AREA").unwrap_or(defaults.area),
            collection: lookup("STOREFRONT_COLLECTION").unwrap_or(defaults.collection),
            session_id: lookup("STOREFRONT_SESSION_ID"),
            page_size: parsed("STOREFRONT_PAGE_SIZE", lookup("STOREFRONT_PAGE_SIZE"), defaults.page_size)?,
            max_refinements: parsed(
                "STOREFRONT_MAX_REFINEMENTS",
                lookup("STOREFRONT_MAX_REFINEMENTS"),
                defaults.max_refinements,
            )?,
            history_limit: parsed(
                "STOREFRONT_HISTORY_LIMIT",
                lookup("STOREFRONT_HISTORY_LIMIT"),
                defaults.history_limit,
            )?,
            past_purchases: PastPurchasesConfig {
                secured_payload: lookup("STOREFRONT_SECURED_PAYLOAD"),
                ..defaults.past_purchases
            },
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the settings the engine cannot run without.
    ///
    /// # Errors
    ///
    /// Returns error on a blank customer id, a zero page size or a zero
    /// refinement cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.customer_id.trim().is_empty() {
            return Err(ConfigError::Missing("customer_id"));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "page_size",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.max_refinements == 0 {
            return Err(ConfigError::Invalid {
                key: "max_refinements",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`StorefrontConfig`]
#[derive(Debug, Clone)]
pub struct StorefrontConfigBuilder {
    config: StorefrontConfig,
}

impl StorefrontConfigBuilder {
    /// Base URL of the query services
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Search area
    #[must_use]
    pub fn area(mut self, area: impl Into<String>) -> Self {
        self.config.area = area.into();
        self
    }

    /// Collection searched at boot
    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.config.collection = collection.into();
        self
    }

    /// Session id at boot
    #[must_use]
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.config.session_id = Some(id.into());
        self
    }

    /// Records per page at boot
    #[must_use]
    pub const fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Sort options offered
    #[must_use]
    pub fn sorts(mut self, sorts: Vec<SortOption>) -> Self {
        self.config.sorts = sorts;
        self
    }

    /// Refinements kept per facet
    #[must_use]
    pub const fn max_refinements(mut self, max: usize) -> Self {
        self.config.max_refinements = max;
        self
    }

    /// Undo stack length
    #[must_use]
    pub const fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }

    /// Kinds that push a history entry
    #[must_use]
    pub fn checkpoints(mut self, kinds: impl IntoIterator<Item = StorefrontKind>) -> Self {
        self.config.checkpoints = kinds.into_iter().collect();
        self
    }

    /// Kinds whose error responses rewind history
    #[must_use]
    pub fn rewind_on_error(mut self, kinds: impl IntoIterator<Item = StorefrontKind>) -> Self {
        self.config.rewind_on_error = kinds.into_iter().collect();
        self
    }

    /// Regions kept on restore
    #[must_use]
    pub fn preserve_on_restore(mut self, fields: impl IntoIterator<Item = PreservedField>) -> Self {
        self.config.preserved_on_restore = fields.into_iter().collect();
        self
    }

    /// Show `values` first in facet `field`
    #[must_use]
    pub fn pin_refinements<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.config
            .pinned_refinements
            .insert(field.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Default keys for every request composed under `name`
    ///
    /// Non-object values are ignored.
    #[must_use]
    pub fn default_request(mut self, name: RequestName, defaults: Value) -> Self {
        if let Value::Object(object) = defaults {
            self.config.defaults.insert(name, object);
        }
        self
    }

    /// Hook rewriting every request composed under `name`
    #[must_use]
    pub fn override_request<F>(mut self, name: RequestName, hook: F) -> Self
    where
        F: Fn(&Value, Option<&Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.config.overrides.insert(name, RequestOverride::new(hook));
        self
    }

    /// Signed shopper identity enabling past purchases
    #[must_use]
    pub fn secured_payload(mut self, payload: impl Into<String>) -> Self {
        self.config.past_purchases.secured_payload = Some(payload.into());
        self
    }

    /// Biasing settings
    #[must_use]
    pub fn personalization(mut self, personalization: PersonalizationConfig) -> Self {
        self.config.personalization = personalization;
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> StorefrontConfig {
        self.config
    }
}
