//! No-op guards for storefront commands.
//!
//! Each validator rejects a command that would not change anything (or
//! that points at something that does not exist), so no transition, history
//! entry or fetch happens for it.

use crate::action::{StorefrontAction, StorefrontKind};
use crate::state::Present;
use std::sync::LazyLock;
use storefront_sync_core::Validators;

/// Validator registry type for the storefront
pub type StorefrontValidators = Validators<StorefrontAction, Present>;

static SHARED: LazyLock<StorefrontValidators> = LazyLock::new(storefront_validators);

/// Whether the default validators accept `action` against `present`
#[must_use]
pub fn accepts(action: &StorefrontAction, present: &Present) -> bool {
    SHARED.validate(action, present).is_ok()
}

/// The default validator registry
#[must_use]
#[allow(clippy::too_many_lines)] // one entry per guarded kind
pub fn storefront_validators() -> StorefrontValidators {
    use StorefrontAction as A;
    use StorefrontKind as K;

    Validators::new()
        .with(K::UpdateSearch, "search unchanged", |action, present: &Present| {
            let A::UpdateSearch { query } = action else { return true };
            *query != present.query.original
                || present.navigations.selected_count() > 0
                || present.page.current != 1
        })
        .with(K::SelectRefinement, "unknown refinement", |action, present: &Present| {
            let A::SelectRefinement { field, index, refinement } = action else { return true };
            present
                .navigations
                .find(field)
                .and_then(|navigation| navigation.refinements.get(*index))
                .is_some_and(|listed| listed == refinement)
        })
        .with(K::SelectRefinement, "refinement already selected", |action, present: &Present| {
            let A::SelectRefinement { field, index, .. } = action else { return true };
            !present
                .navigations
                .find(field)
                .is_some_and(|navigation| navigation.is_selected(*index))
        })
        .with(K::DeselectRefinement, "refinement not selected", |action, present: &Present| {
            let A::DeselectRefinement { field, index } = action else { return true };
            present
                .navigations
                .find(field)
                .is_some_and(|navigation| navigation.is_selected(*index))
        })
        .with(K::AddRefinement, "refinement already selected", |action, present: &Present| {
            let A::AddRefinement { field, refinement } = action else { return true };
            !present.navigations.find(field).is_some_and(|navigation| {
                navigation
                    .index_of(refinement)
                    .is_some_and(|index| navigation.is_selected(index))
            })
        })
        .with(K::ResetRefinements, "nothing to reset", |action, present: &Present| {
            let A::ResetRefinements { field } = action else { return true };
            match field {
                Some(field) => present
                    .navigations
                    .find(field)
                    .is_some_and(|navigation| !navigation.selected.is_empty()),
                None => present.navigations.selected_count() > 0,
            }
        })
        .with(K::UpdateCurrentPage, "page out of range", |action, present: &Present| {
            let A::UpdateCurrentPage { page } = action else { return true };
            *page >= 1 && *page <= present.page.last.max(1)
        })
        .with(K::UpdateCurrentPage, "already on page", |action, present: &Present| {
            let A::UpdateCurrentPage { page } = action else { return true };
            *page != present.page.current
        })
        .with(K::UpdatePageSize, "invalid page size", |action, _: &Present| {
            let A::UpdatePageSize { size } = action else { return true };
            *size > 0
        })
        .with(K::UpdatePageSize, "page size unchanged", |action, present: &Present| {
            let A::UpdatePageSize { size } = action else { return true };
            *size != present.page.size
        })
        .with(K::SelectSort, "unknown sort", |action, present: &Present| {
            let A::SelectSort { index } = action else { return true };
            *index < present.sort.options.len()
        })
        .with(K::SelectSort, "sort unchanged", |action, present: &Present| {
            let A::SelectSort { index } = action else { return true };
            *index != present.sort.selected
        })
        .with(K::SelectCollection, "collection unchanged", |action, present: &Present| {
            let A::SelectCollection { name } = action else { return true };
            *name != present.collections.selected
        })
        .with(K::FetchMoreProducts, "nothing more to load", |action, present: &Present| {
            let A::FetchMoreProducts { amount } = action else { return true };
            let products = &present.products;
            match amount.signum() {
                1 => products.high < products.total,
                -1 => products.low > 0,
                _ => false,
            }
        })
        .with(K::FetchMoreRefinements, "no more refinements", |action, present: &Present| {
            let A::FetchMoreRefinements { field } = action else { return true };
            present.navigations.find(field).is_some_and(|navigation| navigation.more)
        })
        .with(K::FetchAutocompleteSuggestions, "blank autocomplete query", |action, _: &Present| {
            let A::FetchAutocompleteSuggestions { query } = action else { return true };
            !query.trim().is_empty()
        })
        .with(K::FetchProductDetails, "missing product id", |action, _: &Present| {
            let A::FetchProductDetails { id } = action else { return true };
            !id.trim().is_empty()
        })
        .with(K::UpdatePersonalization, "blank bias", |action, _: &Present| {
            let A::UpdatePersonalization { field, value } = action else { return true };
            !field.trim().is_empty() && !value.trim().is_empty()
        })
        .with(K::RemoveComponentState, "unknown component", |action, present: &Present| {
            let A::RemoveComponentState { tag, id } = action else { return true };
            present.ui.get(tag, id).is_some()
        })
}
