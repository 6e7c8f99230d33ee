use super::{emit, unchanged};
use crate::action::StorefrontAction;
use crate::config::StorefrontConfig;
use crate::event::StorefrontEvent;
use crate::state::{CollectionsState, SortState};
use storefront_sync_core::{Effects, ReduceError, Reducer};

/// Owns the sort options and the selected one
pub struct SortReducer;

impl Reducer for SortReducer {
    type State = SortState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        sort: &mut SortState,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::SelectSort { index } => {
                if *index >= sort.options.len() {
                    return Err(ReduceError::new(
                        "sort",
                        format!("no sort option at {index} (have {})", sort.options.len()),
                    ));
                }
                sort.selected = *index;
                emit(StorefrontEvent::SortUpdated)
            },
            _ => unchanged(),
        }
    }
}

/// Owns the selected collection and per-collection counts
pub struct CollectionsReducer;

impl Reducer for CollectionsReducer {
    type State = CollectionsState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        collections: &mut CollectionsState,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::SelectCollection { name } => {
                collections.selected.clone_from(name);
                emit(StorefrontEvent::CollectionChanged)
            },
            StorefrontAction::ReceiveCollectionCount { collection, count } => {
                if collections.counts.get(collection) == Some(count) {
                    return unchanged();
                }
                collections.counts.insert(collection.clone(), *count);
                emit(StorefrontEvent::CollectionChanged)
            },
            _ => unchanged(),
        }
    }
}
