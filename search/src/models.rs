//! Catalog models shared by state, services and reconciliation.
//!
//! Wire types (`*Response`, [`Facet`]) mirror what the query services send
//! back and deserialize leniently: every field has a default so partial
//! payloads still decode. State-side types ([`Navigation`], [`Record`]) are
//! what the reducers keep in the present snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form JSON object used for request bodies and pass-through metadata
pub type JsonObject = Map<String, Value>;

/// One selectable value of a facet
///
/// Two refinements are equal when they denote the same value (or the same
/// `low`/`high` bounds); totals are ignored so a refinement from a fresh
/// response matches the one already selected in state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Refinement {
    /// A discrete value, e.g. `red`
    Value {
        /// The value itself
        value: String,
        /// Matching record count
        #[serde(default)]
        total: u64,
    },
    /// A numeric range, e.g. `10..50`
    Range {
        /// Inclusive lower bound
        low: f64,
        /// Exclusive upper bound
        high: f64,
        /// Matching record count
        #[serde(default)]
        total: u64,
    },
}

impl Refinement {
    /// A value refinement without a count
    #[must_use]
    pub fn value(value: impl Into<String>) -> Self {
        Self::Value {
            value: value.into(),
            total: 0,
        }
    }

    /// A range refinement without a count
    #[must_use]
    pub const fn range(low: f64, high: f64) -> Self {
        Self::Range { low, high, total: 0 }
    }

    /// Same refinement with a count attached
    #[must_use]
    pub fn with_total(self, total: u64) -> Self {
        match self {
            Self::Value { value, .. } => Self::Value { value, total },
            Self::Range { low, high, .. } => Self::Range { low, high, total },
        }
    }

    /// Matching record count
    #[must_use]
    pub const fn total(&self) -> u64 {
        match self {
            Self::Value { total, .. } | Self::Range { total, .. } => *total,
        }
    }

    /// Whether this is a range refinement
    #[must_use]
    pub const fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }

    /// Display form used for biasing and logs
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Value { value, .. } => value.clone(),
            Self::Range { low, high, .. } => format!("{low}..{high}"),
        }
    }
}

impl PartialEq for Refinement {
    #[allow(clippy::float_cmp)] // bounds are compared exactly as they came off the wire
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value { value: a, .. }, Self::Value { value: b, .. }) => a == b,
            (
                Self::Range { low: al, high: ah, .. },
                Self::Range { low: bl, high: bh, .. },
            ) => al == bl && ah == bh,
            _ => false,
        }
    }
}

/// How a facet's refinements are ordered by the service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationSort {
    /// `count` or `value`
    pub field: String,
    /// Descending order
    pub descending: bool,
}

/// A facet as sent by the search service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Facet {
    /// Field name
    pub name: String,
    /// Human label
    pub display_name: String,
    /// Range facet
    pub range: bool,
    /// Multi-select facet
    pub or: bool,
    /// Refinements in service order
    pub refinements: Vec<Refinement>,
    /// Facet the merchandiser asked to hide
    pub ignored: bool,
    /// More refinements are available on request
    pub more_refinements: bool,
    /// Service-side ordering
    pub sort: Option<NavigationSort>,
}

/// A facet as kept in state, with its selections
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Navigation {
    /// Field name
    pub field: String,
    /// Human label
    pub label: String,
    /// Range facet
    pub range: bool,
    /// Multi-select facet
    pub or: bool,
    /// Refinements in display order
    pub refinements: Vec<Refinement>,
    /// Indices into `refinements`; always in bounds
    pub selected: Vec<usize>,
    /// More refinements can be fetched
    pub more: bool,
    /// Service-side ordering
    pub sort: Option<NavigationSort>,
}

impl Navigation {
    /// Build an unselected navigation from a service facet
    #[must_use]
    pub fn from_facet(facet: &Facet) -> Self {
        Self {
            field: facet.name.clone(),
            label: facet.display_name.clone(),
            range: facet.range,
            or: facet.or,
            refinements: facet.refinements.clone(),
            selected: Vec::new(),
            more: facet.more_refinements,
            sort: facet.sort.clone(),
        }
    }

    /// Index of a refinement equal to `refinement`
    #[must_use]
    pub fn index_of(&self, refinement: &Refinement) -> Option<usize> {
        self.refinements.iter().position(|r| r == refinement)
    }

    /// Whether the refinement at `index` is selected
    #[must_use]
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Selected refinements in selection order
    pub fn selected_refinements(&self) -> impl Iterator<Item = &Refinement> {
        self.selected.iter().filter_map(|&index| self.refinements.get(index))
    }
}

/// A product record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Record {
    /// Record id
    pub id: String,
    /// Product attributes
    pub all_meta: JsonObject,
}

impl Record {
    /// A record with no attributes
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            all_meta: JsonObject::new(),
        }
    }

    /// String attribute lookup
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.all_meta.get(key).and_then(Value::as_str)
    }
}

/// A sort the shopper can pick
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SortOption {
    /// Label shown to the shopper
    pub label: String,
    /// Field sorted on; empty means relevance
    pub field: String,
    /// Descending order
    pub descending: bool,
}

/// Merchandising template attached to a result page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Template {
    /// Template name; `default` when no rule fired
    pub name: String,
    /// Rule that selected it
    pub rule_name: Option<String>,
    /// Content zones
    pub zones: JsonObject,
}

/// Record window of a search response, 1-based and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageInfo {
    /// First record returned
    pub record_start: usize,
    /// Last record returned
    pub record_end: usize,
}

/// Response of the search endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResponse {
    /// Search id assigned by the service
    pub id: Option<String>,
    /// Query as sent
    pub original_query: String,
    /// Spelling-corrected query
    pub corrected_query: Option<String>,
    /// Alternative spellings
    pub did_you_mean: Vec<String>,
    /// Related searches
    pub related_queries: Vec<String>,
    /// Synonym rewrites applied
    pub rewrites: Vec<String>,
    /// Page of records
    pub records: Vec<Record>,
    /// Records matching across all pages
    pub total_record_count: usize,
    /// Window of `records`
    pub page_info: PageInfo,
    /// Facets that can still be refined
    pub available_navigation: Vec<Facet>,
    /// Facets already refined
    pub selected_navigation: Vec<Facet>,
    /// Merchandising template
    pub template: Option<Template>,
    /// Redirect target; when set nothing else applies
    pub redirect: Option<String>,
}

/// Response of the refinements endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefinementsResponse {
    /// The facet with every refinement
    pub navigation: Facet,
}

/// One facet of an autocomplete response
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutocompleteFacet {
    /// Field name
    pub field: String,
    /// Suggested values
    pub values: Vec<String>,
}

/// Response of the autocomplete endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutocompleteResponse {
    /// Query suggestions
    pub suggestions: Vec<String>,
    /// Category values for the first suggestion
    pub categories: Vec<String>,
    /// Facet suggestions
    pub navigations: Vec<AutocompleteFacet>,
}

/// Response of the recommendations endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationsResponse {
    /// Recommended product ids, best first
    pub product_ids: Vec<String>,
}

/// Response of the navigation-ranking endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationRanking {
    /// Field names, most relevant first
    pub fields: Vec<String>,
}

/// One previously purchased product
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PastPurchase {
    /// Product SKU
    pub sku: String,
    /// Units bought
    pub quantity: u32,
}

/// Response of the past-purchases endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PastPurchasesResponse {
    /// Purchases, most recent first
    pub products: Vec<PastPurchase>,
}
