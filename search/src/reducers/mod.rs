//! Region reducers and the root composition.
//!
//! Every region of [`Present`] has one reducer scoped to it. The root reducer
//! runs them in a fixed order; a reducer that does not handle an action
//! returns no effects. Restoration runs first because it replaces the whole
//! snapshot.

mod auxiliary;
mod navigations;
mod products;
mod query;
mod selection;
mod session;

pub use auxiliary::{AutocompleteReducer, DetailsReducer, PastPurchasesReducer, RecommendationsReducer};
pub use navigations::NavigationsReducer;
pub use products::{PageReducer, ProductsReducer};
pub use query::{QueryReducer, RedirectReducer, TemplateReducer};
pub use selection::{CollectionsReducer, SortReducer};
pub use session::{FetchingReducer, PersonalizationReducer, SessionReducer, UiReducer};

use crate::action::StorefrontAction;
use crate::config::StorefrontConfig;
use crate::event::StorefrontEvent;
use crate::state::Present;
use storefront_sync_core::composition::{CombinedReducer, combine_reducers, scope_reducer};
use storefront_sync_core::{Effect, Effects, ReduceError, Reducer, smallvec};

/// The root reducer type
pub type StorefrontReducer = CombinedReducer<Present, StorefrontAction, StorefrontEvent, StorefrontConfig>;

pub(crate) fn emit(event: StorefrontEvent) -> Result<Effects<StorefrontEvent>, ReduceError> {
    Ok(smallvec![Effect::Emit(event)])
}

pub(crate) fn unchanged() -> Result<Effects<StorefrontEvent>, ReduceError> {
    Ok(Effects::new())
}

/// Build the root reducer
#[must_use]
pub fn root_reducer() -> StorefrontReducer {
    combine_reducers(vec![
        Box::new(RestoreReducer),
        Box::new(scope_reducer(QueryReducer, |s: &mut Present| &mut s.query)),
        Box::new(scope_reducer(NavigationsReducer, |s: &mut Present| &mut s.navigations)),
        Box::new(scope_reducer(ProductsReducer, |s: &mut Present| &mut s.products)),
        Box::new(scope_reducer(PageReducer, |s: &mut Present| &mut s.page)),
        Box::new(scope_reducer(SortReducer, |s: &mut Present| &mut s.sort)),
        Box::new(scope_reducer(CollectionsReducer, |s: &mut Present| &mut s.collections)),
        Box::new(scope_reducer(SessionReducer, |s: &mut Present| &mut s.session)),
        Box::new(scope_reducer(TemplateReducer, |s: &mut Present| &mut s.template)),
        Box::new(scope_reducer(RedirectReducer, |s: &mut Present| &mut s.redirect)),
        Box::new(scope_reducer(AutocompleteReducer, |s: &mut Present| &mut s.autocomplete)),
        Box::new(scope_reducer(DetailsReducer, |s: &mut Present| &mut s.details)),
        Box::new(scope_reducer(RecommendationsReducer, |s: &mut Present| &mut s.recommendations)),
        Box::new(scope_reducer(PastPurchasesReducer, |s: &mut Present| &mut s.past_purchases)),
        Box::new(scope_reducer(UiReducer, |s: &mut Present| &mut s.ui)),
        Box::new(scope_reducer(PersonalizationReducer, |s: &mut Present| &mut s.personalization)),
        Box::new(scope_reducer(FetchingReducer, |s: &mut Present| &mut s.fetching)),
    ])
}

/// Wholesale replacement of the snapshot
///
/// Fields listed in `preserved_on_restore` keep their current value. The
/// history reset that accompanies a restore is handled by the timeline.
pub struct RestoreReducer;

impl Reducer for RestoreReducer {
    type State = Present;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        state: &mut Present,
        action: &StorefrontAction,
        config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        let StorefrontAction::RefreshState(incoming) = action else {
            return unchanged();
        };

        let mut restored = (**incoming).clone();
        for field in &config.preserved_on_restore {
            field.carry(state, &mut restored);
        }
        *state = restored;

        tracing::debug!(preserved = config.preserved_on_restore.len(), "Restored snapshot");

        Ok(smallvec![Effect::merge(
            [
                StorefrontEvent::QueryChanged,
                StorefrontEvent::NavigationsUpdated,
                StorefrontEvent::ProductsUpdated,
                StorefrontEvent::PageUpdated,
                StorefrontEvent::SortUpdated,
                StorefrontEvent::CollectionChanged,
                StorefrontEvent::TemplateUpdated,
            ]
            .into_iter()
            .map(Effect::Emit)
            .collect(),
        )])
    }
}
