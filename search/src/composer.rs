//! Request composition with per-name request memory.
//!
//! Every outbound request is built by running a [`Chain`] over a JSON body:
//!
//! 1. the state-derived base request (built by [`crate::requests`])
//! 2. service defaults from configuration, filling keys the base left out
//! 3. the caller's partial override, merged on top
//! 4. the configured override hook, which also sees the previous request
//!    composed under the same name
//! 5. recording the result into that name's memory
//!
//! A step that returns `None` leaves the body as it was. Memory is written
//! only by step 5 and read only by step 4, under one lock held across both,
//! so concurrent composes under a name each see the request recorded by the
//! one before.

use crate::models::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use storefront_sync_core::chain::Chain;

/// Logical request names; each has its own memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestName {
    /// Primary product search and infinite scroll
    Search,
    /// Full refinement list of a facet
    Refinements,
    /// Query suggestions
    AutocompleteSuggestions,
    /// Autocomplete product preview
    AutocompleteProducts,
    /// Product details lookup
    Details,
    /// Recommended product ids
    Recommendations,
    /// Product lookup for recommended ids
    RecommendationProducts,
    /// Previously purchased SKUs
    PastPurchases,
    /// Product lookup for previously purchased SKUs
    PastPurchaseProducts,
}

impl RequestName {
    /// Every name, in declaration order
    pub const ALL: [Self; 9] = [
        Self::Search,
        Self::Refinements,
        Self::AutocompleteSuggestions,
        Self::AutocompleteProducts,
        Self::Details,
        Self::Recommendations,
        Self::RecommendationProducts,
        Self::PastPurchases,
        Self::PastPurchaseProducts,
    ];

    /// Name as used in configuration and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Refinements => "refinements",
            Self::AutocompleteSuggestions => "autocomplete-suggestions",
            Self::AutocompleteProducts => "autocomplete-products",
            Self::Details => "details",
            Self::Recommendations => "recommendations",
            Self::RecommendationProducts => "recommendation-products",
            Self::PastPurchases => "past-purchases",
            Self::PastPurchaseProducts => "past-purchase-products",
        }
    }
}

impl fmt::Display for RequestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type OverrideFn = dyn Fn(&Value, Option<&Value>) -> Option<Value> + Send + Sync;

/// Configuration hook rewriting a composed request
///
/// Receives the request composed so far and the previous request composed
/// under the same name. Returning `None` keeps the request unchanged.
#[derive(Clone)]
pub struct RequestOverride(Arc<OverrideFn>);

impl RequestOverride {
    /// Wrap a hook
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&Value, Option<&Value>) -> Option<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    /// Run the hook
    #[must_use]
    pub fn apply(&self, current: &Value, previous: Option<&Value>) -> Option<Value> {
        (self.0)(current, previous)
    }
}

impl fmt::Debug for RequestOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestOverride(..)")
    }
}

/// Override hooks by request name
pub type RequestOverrides = BTreeMap<RequestName, RequestOverride>;

/// Keys of `defaults` missing from `request`, added
fn fill_defaults(request: &Value, defaults: &JsonObject) -> Option<Value> {
    let object = request.as_object()?;
    if defaults.is_empty() {
        return None;
    }
    let mut filled = object.clone();
    for (key, value) in defaults {
        filled.entry(key.clone()).or_insert_with(|| value.clone());
    }
    Some(Value::Object(filled))
}

/// `overlay` merged on top of `request`, one level deep
fn merge_shallow(request: &Value, overlay: &JsonObject) -> Option<Value> {
    let mut merged = request.as_object()?.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    Some(Value::Object(merged))
}

/// Composer for one request name
#[derive(Debug)]
pub struct RequestComposer {
    name: RequestName,
    defaults: JsonObject,
    hook: Option<RequestOverride>,
    memory: Mutex<Option<Value>>,
}

impl RequestComposer {
    /// Create a composer with no memory yet
    #[must_use]
    pub const fn new(name: RequestName, defaults: JsonObject, hook: Option<RequestOverride>) -> Self {
        Self {
            name,
            defaults,
            hook,
            memory: Mutex::new(None),
        }
    }

    /// Request name
    #[must_use]
    pub const fn name(&self) -> RequestName {
        self.name
    }

    /// The last request composed under this name
    #[must_use]
    pub fn previous(&self) -> Option<Value> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Compose a request from its state-derived base
    pub fn compose(&self, base: Value, partial: Option<&JsonObject>) -> Value {
        let mut memory = self.memory.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = memory.clone();

        let chain = Chain::new()
            .then(|request: &Value| fill_defaults(request, &self.defaults))
            .then(|request: &Value| partial.and_then(|overlay| merge_shallow(request, overlay)))
            .then(|request: &Value| {
                self.hook
                    .as_ref()
                    .and_then(|hook| hook.apply(request, previous.as_ref()))
            });

        let request = chain.run(base);
        *memory = Some(request.clone());
        drop(memory);

        tracing::trace!(name = %self.name, %request, "Composed request");
        request
    }
}

/// One composer per request name
#[derive(Debug)]
pub struct RequestComposers {
    composers: Vec<RequestComposer>,
}

impl Default for RequestComposers {
    fn default() -> Self {
        Self::new(&BTreeMap::new(), &RequestOverrides::new())
    }
}

impl RequestComposers {
    /// Build composers from per-name defaults and hooks
    #[must_use]
    pub fn new(defaults: &BTreeMap<RequestName, JsonObject>, overrides: &RequestOverrides) -> Self {
        let composers = RequestName::ALL
            .iter()
            .map(|name| {
                RequestComposer::new(
                    *name,
                    defaults.get(name).cloned().unwrap_or_default(),
                    overrides.get(name).cloned(),
                )
            })
            .collect();
        Self { composers }
    }

    /// Composer for `name`
    #[must_use]
    pub fn get(&self, name: RequestName) -> Option<&RequestComposer> {
        self.composers.iter().find(|composer| composer.name == name)
    }

    /// Compose a request under `name`
    pub fn compose(&self, name: RequestName, base: Value, partial: Option<&JsonObject>) -> Value {
        match self.get(name) {
            Some(composer) => composer.compose(base, partial),
            None => base,
        }
    }
}
