//! Intent constructors for shopper interactions.
//!
//! Interactions that change what the result page should show are dispatched
//! together with a product fetch, as one atomic batch: the selection, the page
//! reset and the raised fetching flag commit under a single history
//! checkpoint. If the interaction would be rejected the fetch is left out, so
//! a no-op interaction never triggers a request.

use crate::action::StorefrontAction;
use crate::models::Refinement;
use crate::state::Present;
use crate::validators::accepts;
use serde_json::Value;
use storefront_sync_core::Intent;

/// Intent type dispatched to the storefront store
pub type StorefrontIntent = Intent<StorefrontAction, Present>;

fn then_fetch(action: StorefrontAction) -> StorefrontIntent {
    Intent::deferred(move |present: &Present| {
        if accepts(&action, present) {
            Intent::batch([action, StorefrontAction::FetchProducts])
        } else {
            action.into()
        }
    })
}

/// Run a new search
#[must_use]
pub fn search(query: impl Into<String>) -> StorefrontIntent {
    then_fetch(StorefrontAction::UpdateSearch { query: query.into() })
}

/// Select the refinement shown at `index` of a facet
///
/// Resolves against the facets at dispatch time; an index that no longer
/// exists resolves to nothing.
#[must_use]
pub fn select_refinement(field: impl Into<String>, index: usize) -> StorefrontIntent {
    let field = field.into();
    Intent::deferred(move |present: &Present| {
        let refinement = present
            .navigations
            .find(&field)
            .and_then(|navigation| navigation.refinements.get(index))
            .cloned();
        match refinement {
            Some(refinement) => then_fetch(StorefrontAction::SelectRefinement {
                field,
                index,
                refinement,
            }),
            None => {
                tracing::debug!(%field, index, "No refinement to select");
                Intent::batch(Vec::<StorefrontAction>::new())
            },
        }
    })
}

/// Deselect a refinement of a facet
#[must_use]
pub fn deselect_refinement(field: impl Into<String>, index: usize) -> StorefrontIntent {
    then_fetch(StorefrontAction::DeselectRefinement {
        field: field.into(),
        index,
    })
}

/// Select a refinement that may not be listed yet
#[must_use]
pub fn add_refinement(field: impl Into<String>, refinement: Refinement) -> StorefrontIntent {
    then_fetch(StorefrontAction::AddRefinement {
        field: field.into(),
        refinement,
    })
}

/// Add a value refinement by its value
#[must_use]
pub fn add_value_refinement(field: impl Into<String>, value: impl Into<String>) -> StorefrontIntent {
    add_refinement(field, Refinement::value(value))
}

/// Add a range refinement by its bounds
#[must_use]
pub fn add_range_refinement(field: impl Into<String>, low: f64, high: f64) -> StorefrontIntent {
    add_refinement(field, Refinement::range(low, high))
}

/// Clear selections of one facet, or of all facets
#[must_use]
pub fn reset_refinements(field: Option<String>) -> StorefrontIntent {
    then_fetch(StorefrontAction::ResetRefinements { field })
}

/// Move to a result page
#[must_use]
pub fn switch_page(page: usize) -> StorefrontIntent {
    then_fetch(StorefrontAction::UpdateCurrentPage { page })
}

/// Change the page size
#[must_use]
pub fn update_page_size(size: usize) -> StorefrontIntent {
    then_fetch(StorefrontAction::UpdatePageSize { size })
}

/// Pick a sort option
#[must_use]
pub fn switch_sort(index: usize) -> StorefrontIntent {
    then_fetch(StorefrontAction::SelectSort { index })
}

/// Switch collection
#[must_use]
pub fn select_collection(name: impl Into<String>) -> StorefrontIntent {
    then_fetch(StorefrontAction::SelectCollection { name: name.into() })
}

/// Refresh products for the current state
#[must_use]
pub fn fetch_products() -> StorefrontIntent {
    StorefrontAction::FetchProducts.into()
}

/// Load `amount` more products; negative loads earlier ones
#[must_use]
pub fn fetch_more_products(amount: isize) -> StorefrontIntent {
    StorefrontAction::FetchMoreProducts { amount }.into()
}

/// Load the full refinement list of a facet
#[must_use]
pub fn fetch_more_refinements(field: impl Into<String>) -> StorefrontIntent {
    StorefrontAction::FetchMoreRefinements { field: field.into() }.into()
}

/// Fetch suggestions for a partial query
#[must_use]
pub fn fetch_autocomplete_suggestions(query: impl Into<String>) -> StorefrontIntent {
    StorefrontAction::FetchAutocompleteSuggestions { query: query.into() }.into()
}

/// Fetch a product preview for a suggestion
#[must_use]
pub fn fetch_autocomplete_products(query: impl Into<String>, refinements: Vec<(String, String)>) -> StorefrontIntent {
    StorefrontAction::FetchAutocompleteProducts {
        query: query.into(),
        refinements,
    }
    .into()
}

/// Fetch one product for the detail view
#[must_use]
pub fn fetch_product_details(id: impl Into<String>) -> StorefrontIntent {
    StorefrontAction::FetchProductDetails { id: id.into() }.into()
}

/// Fetch recommended products
#[must_use]
pub fn fetch_recommendations() -> StorefrontIntent {
    StorefrontAction::FetchRecommendations.into()
}

/// Fetch previously purchased products
#[must_use]
pub fn fetch_past_purchases() -> StorefrontIntent {
    StorefrontAction::FetchPastPurchases.into()
}

/// Step back one checkpoint
#[must_use]
pub fn undo() -> StorefrontIntent {
    StorefrontAction::Undo.into()
}

/// Re-apply the last undone checkpoint
#[must_use]
pub fn redo() -> StorefrontIntent {
    StorefrontAction::Redo.into()
}

/// Replace the snapshot wholesale, for example from a saved session
#[must_use]
pub fn restore(present: Present) -> StorefrontIntent {
    StorefrontAction::RefreshState(Box::new(present)).into()
}

/// Bias future searches towards a field value
#[must_use]
pub fn update_personalization(field: impl Into<String>, value: impl Into<String>) -> StorefrontIntent {
    StorefrontAction::UpdatePersonalization {
        field: field.into(),
        value: value.into(),
    }
    .into()
}

/// Store free-form state for a UI component
#[must_use]
pub fn create_component_state(tag: impl Into<String>, id: impl Into<String>, state: Value) -> StorefrontIntent {
    StorefrontAction::CreateComponentState {
        tag: tag.into(),
        id: id.into(),
        state,
    }
    .into()
}

/// Drop the state of a UI component
#[must_use]
pub fn remove_component_state(tag: impl Into<String>, id: impl Into<String>) -> StorefrontIntent {
    StorefrontAction::RemoveComponentState {
        tag: tag.into(),
        id: id.into(),
    }
    .into()
}
