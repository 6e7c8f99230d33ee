//! The present snapshot and its regions.
//!
//! Each region is owned by exactly one sub-reducer (see [`crate::reducers`]).

use crate::config::StorefrontConfig;
use crate::models::{AutocompleteFacet, Navigation, Record, Refinement, SortOption, Template};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Everything the storefront knows at one point in time
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Present {
    /// Current query and its service-side variants
    pub query: QueryState,
    /// Facets and their selections
    pub navigations: NavigationsState,
    /// Loaded records
    pub products: ProductsState,
    /// Pagination
    pub page: PageState,
    /// Sort options
    pub sort: SortState,
    /// Collection selection and counts
    pub collections: CollectionsState,
    /// Session identifiers
    pub session: SessionState,
    /// Fetches in flight
    pub fetching: FetchingState,
    /// Autocomplete results
    pub autocomplete: AutocompleteState,
    /// Product details page
    pub details: DetailsState,
    /// Recommended products
    pub recommendations: RecommendationsState,
    /// Previously purchased products
    pub past_purchases: PastPurchasesState,
    /// Merchandising template
    pub template: Template,
    /// Pending redirect
    pub redirect: Option<String>,
    /// Component state registry
    pub ui: UiState,
    /// Biasing derived from shopper behaviour
    pub personalization: PersonalizationState,
}

impl Present {
    /// The boot snapshot for a configuration
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Self {
        let mut sizes = config.page_sizes.clone();
        if !sizes.contains(&config.page_size) {
            sizes.push(config.page_size);
            sizes.sort_unstable();
        }

        Self {
            page: PageState {
                current: 1,
                size: config.page_size,
                sizes,
                last: 1,
            },
            sort: SortState {
                options: config.sorts.clone(),
                selected: 0,
            },
            collections: CollectionsState {
                selected: config.collection.clone(),
                counts: BTreeMap::new(),
            },
            session: SessionState {
                id: config.session_id.clone().unwrap_or_default(),
                search_id: None,
            },
            template: Template {
                name: "default".to_string(),
                ..Template::default()
            },
            ..Self::default()
        }
    }

    /// Selected refinements across every facet, in facet order
    #[must_use]
    pub fn selected_refinements(&self) -> Vec<(String, Refinement)> {
        self.navigations
            .facets
            .iter()
            .flat_map(|navigation| {
                navigation
                    .selected_refinements()
                    .map(|refinement| (navigation.field.clone(), refinement.clone()))
            })
            .collect()
    }
}

/// Query region
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryState {
    /// Query as typed
    pub original: String,
    /// Spelling-corrected query
    pub corrected: Option<String>,
    /// Related searches
    pub related: Vec<String>,
    /// Alternative spellings
    pub did_you_mean: Vec<String>,
    /// Synonym rewrites
    pub rewrites: Vec<String>,
}

/// Navigations region
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationsState {
    /// Facets in display order
    pub facets: Vec<Navigation>,
}

impl NavigationsState {
    /// Facet for `field`
    #[must_use]
    pub fn find(&self, field: &str) -> Option<&Navigation> {
        self.facets.iter().find(|navigation| navigation.field == field)
    }

    /// Mutable facet for `field`
    pub fn find_mut(&mut self, field: &str) -> Option<&mut Navigation> {
        self.facets.iter_mut().find(|navigation| navigation.field == field)
    }

    /// Number of selected refinements across all facets
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.facets.iter().map(|navigation| navigation.selected.len()).sum()
    }
}

/// Products region
///
/// `low..high` is the half-open window of result offsets currently loaded;
/// infinite scroll grows it in either direction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductsState {
    /// Loaded records in result order
    pub records: Vec<Record>,
    /// Records matching across all pages
    pub total: usize,
    /// Offset of the first loaded record
    pub low: usize,
    /// Offset one past the last loaded record
    pub high: usize,
}

/// Page region
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageState {
    /// 1-based current page
    pub current: usize,
    /// Records per page
    pub size: usize,
    /// Page sizes offered
    pub sizes: Vec<usize>,
    /// Last page for the current result set
    pub last: usize,
}

impl PageState {
    /// Offset of the first record on the current page
    #[must_use]
    pub const fn skip(&self) -> usize {
        self.current.saturating_sub(1) * self.size
    }
}

/// Sort region
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortState {
    /// Options offered
    pub options: Vec<SortOption>,
    /// Index of the active option
    pub selected: usize,
}

impl SortState {
    /// The active option
    #[must_use]
    pub fn current(&self) -> Option<&SortOption> {
        self.options.get(self.selected)
    }
}

/// Collections region
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionsState {
    /// Active collection
    pub selected: String,
    /// Last known record count per collection
    pub counts: BTreeMap<String, usize>,
}

/// Session region
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Shopper session id
    pub id: String,
    /// Id of the last search, for analytics correlation
    pub search_id: Option<String>,
}

/// Fetch categories tracked by the fetching flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchCategory {
    /// Primary product search
    Products,
    /// Infinite scroll
    MoreProducts,
    /// Full refinement list of one facet
    MoreRefinements,
    /// Autocomplete query suggestions
    AutocompleteSuggestions,
    /// Autocomplete product preview
    AutocompleteProducts,
    /// Product details
    Details,
    /// Recommended products
    Recommendations,
    /// Previously purchased products
    PastPurchases,
}

impl FetchCategory {
    /// Name used in `fetch:<category>:*` events
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::MoreProducts => "more-products",
            Self::MoreRefinements => "more-refinements",
            Self::AutocompleteSuggestions => "autocomplete-suggestions",
            Self::AutocompleteProducts => "autocomplete-products",
            Self::Details => "details",
            Self::Recommendations => "recommendations",
            Self::PastPurchases => "past-purchases",
        }
    }

    /// Whether several fetches of this category may be in flight at once
    ///
    /// Every other category is cancel-latest: a newer fetch supersedes the
    /// older one, which then never reports back.
    #[must_use]
    pub const fn is_concurrent(self) -> bool {
        matches!(self, Self::MoreProducts | Self::MoreRefinements)
    }
}

impl fmt::Display for FetchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetching region
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchingState {
    /// Outstanding fetches per category; absent means idle
    pub in_flight: BTreeMap<FetchCategory, usize>,
}

impl FetchingState {
    /// Whether `category` is being fetched
    #[must_use]
    pub fn is_fetching(&self, category: FetchCategory) -> bool {
        self.in_flight.contains_key(&category)
    }

    /// Record a fetch starting; returns whether the category was idle
    pub fn start(&mut self, category: FetchCategory) -> bool {
        let outstanding = self.in_flight.entry(category).or_insert(0);
        let was_idle = *outstanding == 0;
        if category.is_concurrent() {
            *outstanding += 1;
        } else {
            *outstanding = 1;
        }
        was_idle
    }

    /// Record a fetch reporting back; returns whether the category is now idle
    ///
    /// A report for an idle category leaves it idle.
    pub fn finish(&mut self, category: FetchCategory) -> bool {
        match self.in_flight.get_mut(&category) {
            Some(outstanding) if *outstanding > 1 => {
                *outstanding -= 1;
                false
            },
            _ => {
                self.in_flight.remove(&category);
                true
            },
        }
    }
}

/// Autocomplete region
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocompleteState {
    /// Partial query being completed
    pub query: String,
    /// Query suggestions
    pub suggestions: Vec<String>,
    /// Category values for the first suggestion
    pub categories: Vec<String>,
    /// Facet suggestions
    pub navigations: Vec<AutocompleteFacet>,
    /// Product preview
    pub products: Vec<Record>,
}

/// Details region
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailsState {
    /// Product being viewed
    pub product: Option<Record>,
}

/// Recommendations region
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationsState {
    /// Recommended products, best first
    pub products: Vec<Record>,
}

/// Past purchases region
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PastPurchasesState {
    /// Purchased products, most recent first
    pub products: Vec<Record>,
}

/// Component registry, `tag -> id -> state`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiState {
    /// Registered component states
    pub components: BTreeMap<String, BTreeMap<String, Value>>,
}

impl UiState {
    /// State of one component
    #[must_use]
    pub fn get(&self, tag: &str, id: &str) -> Option<&Value> {
        self.components.get(tag).and_then(|by_id| by_id.get(id))
    }
}

/// One biasing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bias {
    /// Field the shopper refined on
    pub field: String,
    /// Value they picked
    pub value: String,
}

/// Personalization region
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalizationState {
    /// Bias entries, most recent first
    pub biasing: Vec<Bias>,
}

/// Fields kept from the replaced snapshot when state is restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreservedField {
    /// Personalization biasing
    Personalization,
    /// Session ids
    SessionId,
    /// Autocomplete results
    Autocomplete,
}

impl PreservedField {
    /// Copy this field from `from` into `into`
    pub fn carry(self, from: &Present, into: &mut Present) {
        match self {
            Self::Personalization => into.personalization = from.personalization.clone(),
            Self::SessionId => into.session = from.session.clone(),
            Self::Autocomplete => into.autocomplete = from.autocomplete.clone(),
        }
    }
}
