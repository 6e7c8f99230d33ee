//! The storefront command vocabulary.
//!
//! [`StorefrontAction`] is the closed sum type every command carries. Three
//! families share it:
//!
//! - shopper intents (`UpdateSearch`, `SelectRefinement`, ...), some of which
//!   are history checkpoints
//! - fetch triggers (`Fetch*`), which raise a fetching flag and start a task
//! - responses (`Receive*`), dispatched by tasks; a `Receive*` whose payload is
//!   `Err(FetchFailure)` is error-tagged and goes through the history's error
//!   step before any reducer sees it

use crate::models::{AutocompleteResponse, Navigation, Record, Refinement, Template};
use crate::state::{FetchCategory, Present, QueryState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use storefront_sync_core::{Action, HistoryDirective};
use thiserror::Error;

/// Why a workflow could not produce a response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FetchFailure {
    /// Human-readable cause
    pub message: String,
}

impl FetchFailure {
    /// Create a failure
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Products page of a search response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductsPage {
    /// Records in result order
    pub records: Vec<Record>,
    /// Records matching across all pages
    pub total: usize,
    /// Offset of the first record
    pub low: usize,
    /// Offset one past the last record
    pub high: usize,
}

/// Records loaded by infinite scroll
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoreProducts {
    /// Records in result order
    pub records: Vec<Record>,
    /// Offset of the first record
    pub low: usize,
    /// Offset one past the last record
    pub high: usize,
    /// Appended after the loaded window, or prepended before it
    pub forward: bool,
}

/// Full refinement list of one facet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoreRefinements {
    /// Facet field
    pub field: String,
    /// Every refinement, service order
    pub refinements: Vec<Refinement>,
}

/// Every command the storefront understands
#[derive(Debug, Clone, PartialEq)]
pub enum StorefrontAction {
    /// New query; clears refinements and resets the page
    UpdateSearch {
        /// Query text
        query: String,
    },
    /// Select the refinement at `index` of `field`
    SelectRefinement {
        /// Facet field
        field: String,
        /// Index into the facet's refinements
        index: usize,
        /// The refinement at `index` when the intent was resolved
        refinement: Refinement,
    },
    /// Deselect the refinement at `index` of `field`
    DeselectRefinement {
        /// Facet field
        field: String,
        /// Index into the facet's refinements
        index: usize,
    },
    /// Select a refinement that may not be listed yet (e.g. a price slider)
    AddRefinement {
        /// Facet field
        field: String,
        /// Refinement to select
        refinement: Refinement,
    },
    /// Clear selections of one facet, or of all facets
    ResetRefinements {
        /// Facet to clear; `None` clears everything
        field: Option<String>,
    },
    /// Go to a page
    UpdateCurrentPage {
        /// 1-based page
        page: usize,
    },
    /// Change records per page
    UpdatePageSize {
        /// New size
        size: usize,
    },
    /// Pick a sort option
    SelectSort {
        /// Index into the sort options
        index: usize,
    },
    /// Switch collection
    SelectCollection {
        /// Collection name
        name: String,
    },
    /// Record an explicit bias
    UpdatePersonalization {
        /// Field
        field: String,
        /// Value
        value: String,
    },
    /// Register or replace a component's state
    CreateComponentState {
        /// Component tag
        tag: String,
        /// Instance id
        id: String,
        /// Opaque component state
        state: Value,
    },
    /// Drop a component's state
    RemoveComponentState {
        /// Component tag
        tag: String,
        /// Instance id
        id: String,
    },
    /// Step back to the previous checkpoint
    Undo,
    /// Step forward again
    Redo,
    /// Replace the present wholesale and clear history
    RefreshState(Box<Present>),

    /// Run the primary search for the current state
    FetchProducts,
    /// Load `amount` more records; negative loads backwards
    FetchMoreProducts {
        /// Records to load
        amount: isize,
    },
    /// Load every refinement of a facet
    FetchMoreRefinements {
        /// Facet field
        field: String,
    },
    /// Fetch query suggestions
    FetchAutocompleteSuggestions {
        /// Partial query
        query: String,
    },
    /// Fetch a product preview for a suggestion
    FetchAutocompleteProducts {
        /// Suggested query
        query: String,
        /// `(field, value)` pairs narrowing the preview
        refinements: Vec<(String, String)>,
    },
    /// Fetch one product
    FetchProductDetails {
        /// Record id
        id: String,
    },
    /// Fetch recommended products
    FetchRecommendations,
    /// Fetch previously purchased products
    FetchPastPurchases,

    /// Query echo and spelling variants
    ReceiveQuery(QueryState),
    /// Primary search records
    ReceiveProducts(Result<ProductsPage, FetchFailure>),
    /// Reconciled facets
    ReceiveNavigations(Vec<Navigation>),
    /// Page window of the primary search
    ReceivePage {
        /// Offset of the first record
        record_start: usize,
        /// Records matching across all pages
        total: usize,
    },
    /// Merchandising template
    ReceiveTemplate(Template),
    /// Record count of a collection
    ReceiveCollectionCount {
        /// Collection name
        collection: String,
        /// Records matching
        count: usize,
    },
    /// Search id assigned by the service
    ReceiveSearchId(String),
    /// The search resolved to a redirect
    ReceiveRedirect(String),
    /// Infinite-scroll records
    ReceiveMoreProducts(Result<MoreProducts, FetchFailure>),
    /// Full refinement list of a facet
    ReceiveMoreRefinements(Result<MoreRefinements, FetchFailure>),
    /// Query suggestions
    ReceiveAutocompleteSuggestions(Result<AutocompleteResponse, FetchFailure>),
    /// Product preview
    ReceiveAutocompleteProducts(Result<Vec<Record>, FetchFailure>),
    /// Product details
    ReceiveDetails(Result<Record, FetchFailure>),
    /// Recommended products
    ReceiveRecommendations(Result<Vec<Record>, FetchFailure>),
    /// Previously purchased products
    ReceivePastPurchases(Result<Vec<Record>, FetchFailure>),
}

/// Kind of a [`StorefrontAction`], used for validators, checkpoints and tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)] // one-to-one with StorefrontAction
pub enum StorefrontKind {
    UpdateSearch,
    SelectRefinement,
    DeselectRefinement,
    AddRefinement,
    ResetRefinements,
    UpdateCurrentPage,
    UpdatePageSize,
    SelectSort,
    SelectCollection,
    UpdatePersonalization,
    CreateComponentState,
    RemoveComponentState,
    Undo,
    Redo,
    RefreshState,
    FetchProducts,
    FetchMoreProducts,
    FetchMoreRefinements,
    FetchAutocompleteSuggestions,
    FetchAutocompleteProducts,
    FetchProductDetails,
    FetchRecommendations,
    FetchPastPurchases,
    ReceiveQuery,
    ReceiveProducts,
    ReceiveNavigations,
    ReceivePage,
    ReceiveTemplate,
    ReceiveCollectionCount,
    ReceiveSearchId,
    ReceiveRedirect,
    ReceiveMoreProducts,
    ReceiveMoreRefinements,
    ReceiveAutocompleteSuggestions,
    ReceiveAutocompleteProducts,
    ReceiveDetails,
    ReceiveRecommendations,
    ReceivePastPurchases,
}

impl StorefrontKind {
    /// Kinds that push a history entry unless configured otherwise
    pub const DEFAULT_CHECKPOINTS: [Self; 9] = [
        Self::UpdateSearch,
        Self::SelectRefinement,
        Self::DeselectRefinement,
        Self::AddRefinement,
        Self::ResetRefinements,
        Self::UpdateCurrentPage,
        Self::UpdatePageSize,
        Self::SelectSort,
        Self::SelectCollection,
    ];

    /// snake_case name used in logs, metrics and notices
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpdateSearch => "update_search",
            Self::SelectRefinement => "select_refinement",
            Self::DeselectRefinement => "deselect_refinement",
            Self::AddRefinement => "add_refinement",
            Self::ResetRefinements => "reset_refinements",
            Self::UpdateCurrentPage => "update_current_page",
            Self::UpdatePageSize => "update_page_size",
            Self::SelectSort => "select_sort",
            Self::SelectCollection => "select_collection",
            Self::UpdatePersonalization => "update_personalization",
            Self::CreateComponentState => "create_component_state",
            Self::RemoveComponentState => "remove_component_state",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::RefreshState => "refresh_state",
            Self::FetchProducts => "fetch_products",
            Self::FetchMoreProducts => "fetch_more_products",
            Self::FetchMoreRefinements => "fetch_more_refinements",
            Self::FetchAutocompleteSuggestions => "fetch_autocomplete_suggestions",
            Self::FetchAutocompleteProducts => "fetch_autocomplete_products",
            Self::FetchProductDetails => "fetch_product_details",
            Self::FetchRecommendations => "fetch_recommendations",
            Self::FetchPastPurchases => "fetch_past_purchases",
            Self::ReceiveQuery => "receive_query",
            Self::ReceiveProducts => "receive_products",
            Self::ReceiveNavigations => "receive_navigations",
            Self::ReceivePage => "receive_page",
            Self::ReceiveTemplate => "receive_template",
            Self::ReceiveCollectionCount => "receive_collection_count",
            Self::ReceiveSearchId => "receive_search_id",
            Self::ReceiveRedirect => "receive_redirect",
            Self::ReceiveMoreProducts => "receive_more_products",
            Self::ReceiveMoreRefinements => "receive_more_refinements",
            Self::ReceiveAutocompleteSuggestions => "receive_autocomplete_suggestions",
            Self::ReceiveAutocompleteProducts => "receive_autocomplete_products",
            Self::ReceiveDetails => "receive_details",
            Self::ReceiveRecommendations => "receive_recommendations",
            Self::ReceivePastPurchases => "receive_past_purchases",
        }
    }
}

impl fmt::Display for StorefrontKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start or end of a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// A trigger was committed
    Start,
    /// A response (or failure) arrived
    Done,
}

impl StorefrontAction {
    /// Fetching flag this command raises or clears
    #[must_use]
    pub const fn fetch_phase(&self) -> Option<(FetchCategory, FetchPhase)> {
        use FetchCategory as C;
        use FetchPhase::{Done, Start};

        Some(match self {
            Self::FetchProducts => (C::Products, Start),
            Self::FetchMoreProducts { .. } => (C::MoreProducts, Start),
            Self::FetchMoreRefinements { .. } => (C::MoreRefinements, Start),
            Self::FetchAutocompleteSuggestions { .. } => (C::AutocompleteSuggestions, Start),
            Self::FetchAutocompleteProducts { .. } => (C::AutocompleteProducts, Start),
            Self::FetchProductDetails { .. } => (C::Details, Start),
            Self::FetchRecommendations => (C::Recommendations, Start),
            Self::FetchPastPurchases => (C::PastPurchases, Start),
            Self::ReceiveProducts(_) | Self::ReceiveRedirect(_) => (C::Products, Done),
            Self::ReceiveMoreProducts(_) => (C::MoreProducts, Done),
            Self::ReceiveMoreRefinements(_) => (C::MoreRefinements, Done),
            Self::ReceiveAutocompleteSuggestions(_) => (C::AutocompleteSuggestions, Done),
            Self::ReceiveAutocompleteProducts(_) => (C::AutocompleteProducts, Done),
            Self::ReceiveDetails(_) => (C::Details, Done),
            Self::ReceiveRecommendations(_) => (C::Recommendations, Done),
            Self::ReceivePastPurchases(_) => (C::PastPurchases, Done),
            _ => return None,
        })
    }

    fn failure_of<T>(result: &Result<T, FetchFailure>) -> Option<&str> {
        result.as_ref().err().map(|failure| failure.message.as_str())
    }
}

impl Action for StorefrontAction {
    type Kind = StorefrontKind;

    fn kind(&self) -> StorefrontKind {
        use StorefrontKind as K;
        match self {
            Self::UpdateSearch { .. } => K::UpdateSearch,
            Self::SelectRefinement { .. } => K::SelectRefinement,
            Self::DeselectRefinement { .. } => K::DeselectRefinement,
            Self::AddRefinement { .. } => K::AddRefinement,
            Self::ResetRefinements { .. } => K::ResetRefinements,
            Self::UpdateCurrentPage { .. } => K::UpdateCurrentPage,
            Self::UpdatePageSize { .. } => K::UpdatePageSize,
            Self::SelectSort { .. } => K::SelectSort,
            Self::SelectCollection { .. } => K::SelectCollection,
            Self::UpdatePersonalization { .. } => K::UpdatePersonalization,
            Self::CreateComponentState { .. } => K::CreateComponentState,
            Self::RemoveComponentState { .. } => K::RemoveComponentState,
            Self::Undo => K::Undo,
            Self::Redo => K::Redo,
            Self::RefreshState(_) => K::RefreshState,
            Self::FetchProducts => K::FetchProducts,
            Self::FetchMoreProducts { .. } => K::FetchMoreProducts,
            Self::FetchMoreRefinements { .. } => K::FetchMoreRefinements,
            Self::FetchAutocompleteSuggestions { .. } => K::FetchAutocompleteSuggestions,
            Self::FetchAutocompleteProducts { .. } => K::FetchAutocompleteProducts,
            Self::FetchProductDetails { .. } => K::FetchProductDetails,
            Self::FetchRecommendations => K::FetchRecommendations,
            Self::FetchPastPurchases => K::FetchPastPurchases,
            Self::ReceiveQuery(_) => K::ReceiveQuery,
            Self::ReceiveProducts(_) => K::ReceiveProducts,
            Self::ReceiveNavigations(_) => K::ReceiveNavigations,
            Self::ReceivePage { .. } => K::ReceivePage,
            Self::ReceiveTemplate(_) => K::ReceiveTemplate,
            Self::ReceiveCollectionCount { .. } => K::ReceiveCollectionCount,
            Self::ReceiveSearchId(_) => K::ReceiveSearchId,
            Self::ReceiveRedirect(_) => K::ReceiveRedirect,
            Self::ReceiveMoreProducts(_) => K::ReceiveMoreProducts,
            Self::ReceiveMoreRefinements(_) => K::ReceiveMoreRefinements,
            Self::ReceiveAutocompleteSuggestions(_) => K::ReceiveAutocompleteSuggestions,
            Self::ReceiveAutocompleteProducts(_) => K::ReceiveAutocompleteProducts,
            Self::ReceiveDetails(_) => K::ReceiveDetails,
            Self::ReceiveRecommendations(_) => K::ReceiveRecommendations,
            Self::ReceivePastPurchases(_) => K::ReceivePastPurchases,
        }
    }

    fn failure(&self) -> Option<&str> {
        match self {
            Self::ReceiveProducts(result) => Self::failure_of(result),
            Self::ReceiveMoreProducts(result) => Self::failure_of(result),
            Self::ReceiveMoreRefinements(result) => Self::failure_of(result),
            Self::ReceiveAutocompleteSuggestions(result) => Self::failure_of(result),
            Self::ReceiveAutocompleteProducts(result)
            | Self::ReceiveRecommendations(result)
            | Self::ReceivePastPurchases(result) => Self::failure_of(result),
            Self::ReceiveDetails(result) => Self::failure_of(result),
            _ => None,
        }
    }

    fn history(&self) -> HistoryDirective {
        match self {
            Self::Undo => HistoryDirective::Undo,
            Self::Redo => HistoryDirective::Redo,
            Self::RefreshState(_) => HistoryDirective::Reset,
            _ => HistoryDirective::Record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_tagged_responses_expose_their_failure() {
        let failed = StorefrontAction::ReceiveProducts(Err(FetchFailure::new("timeout")));
        let ok = StorefrontAction::ReceiveDetails(Ok(Record::new("1")));

        assert_eq!(failed.failure(), Some("timeout"));
        assert_eq!(ok.failure(), None);
        assert_eq!(StorefrontAction::FetchProducts.failure(), None);
    }

    #[test]
    fn history_moves_are_directives() {
        assert_eq!(StorefrontAction::Undo.history(), HistoryDirective::Undo);
        assert_eq!(StorefrontAction::Redo.history(), HistoryDirective::Redo);
        assert_eq!(
            StorefrontAction::RefreshState(Box::default()).history(),
            HistoryDirective::Reset
        );
        assert_eq!(StorefrontAction::FetchProducts.history(), HistoryDirective::Record);
    }

    #[test]
    fn fetch_triggers_and_responses_pair_up() {
        assert_eq!(
            StorefrontAction::FetchProducts.fetch_phase(),
            Some((FetchCategory::Products, FetchPhase::Start))
        );
        assert_eq!(
            StorefrontAction::ReceiveRedirect("/sale".into()).fetch_phase(),
            Some((FetchCategory::Products, FetchPhase::Done))
        );
        assert_eq!(StorefrontAction::Undo.fetch_phase(), None);
    }

    #[test]
    fn kinds_serialize_as_snake_case() {
        let json = serde_json::to_string(&StorefrontKind::ReceiveProducts).unwrap();
        assert_eq!(json, "\"receive_products\"");
        assert_eq!(StorefrontKind::SelectSort.to_string(), "select_sort");
    }
}
