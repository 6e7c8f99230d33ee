use super::{emit, unchanged};
use crate::action::{FetchPhase, StorefrontAction};
use crate::config::StorefrontConfig;
use crate::event::StorefrontEvent;
use crate::models::Refinement;
use crate::state::{Bias, FetchCategory, FetchingState, PersonalizationState, SessionState, UiState};
use storefront_sync_core::{Effects, ReduceError, Reducer};

/// Owns session identifiers
pub struct SessionReducer;

impl Reducer for SessionReducer {
    type State = SessionState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        session: &mut SessionState,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::ReceiveSearchId(id) if session.search_id.as_ref() != Some(id) => {
                session.search_id = Some(id.clone());
                emit(StorefrontEvent::SessionChanged)
            },
            _ => unchanged(),
        }
    }
}

/// Owns the in-flight fetch flags
///
/// A fetch trigger raises its category's flag and a response lowers it, so
/// `fetch:<category>:start` and `fetch:<category>:done` always pair up.
/// Concurrent categories count their outstanding fetches and only report the
/// edges: the first start and the last done.
pub struct FetchingReducer;

impl Reducer for FetchingReducer {
    type State = FetchingState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        fetching: &mut FetchingState,
        action: &StorefrontAction,
        config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        let Some((category, phase)) = action.fetch_phase() else {
            return unchanged();
        };

        match phase {
            FetchPhase::Start => {
                // No response ever follows a past-purchases fetch without a payload
                if category == FetchCategory::PastPurchases && config.past_purchases.secured_payload.is_none() {
                    return unchanged();
                }
                if fetching.start(category) {
                    emit(StorefrontEvent::FetchStarted(category))
                } else {
                    unchanged()
                }
            },
            FetchPhase::Done => {
                if fetching.finish(category) {
                    emit(StorefrontEvent::FetchDone(category))
                } else {
                    unchanged()
                }
            },
        }
    }
}

/// Owns refinement-derived biasing
pub struct PersonalizationReducer;

impl PersonalizationReducer {
    fn remember(personalization: &mut PersonalizationState, field: &str, value: &str, max: usize) {
        personalization
            .biasing
            .retain(|bias| !(bias.field == field && bias.value == value));
        personalization.biasing.insert(
            0,
            Bias {
                field: field.to_string(),
                value: value.to_string(),
            },
        );
        personalization.biasing.truncate(max);
    }
}

impl Reducer for PersonalizationReducer {
    type State = PersonalizationState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        personalization: &mut PersonalizationState,
        action: &StorefrontAction,
        config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        if !config.personalization.enabled {
            return unchanged();
        }

        let (field, value) = match action {
            StorefrontAction::SelectRefinement {
                field,
                refinement: Refinement::Value { value, .. },
                ..
            }
            | StorefrontAction::AddRefinement {
                field,
                refinement: Refinement::Value { value, .. },
            }
            | StorefrontAction::UpdatePersonalization { field, value } => (field, value),
            _ => return unchanged(),
        };

        let before = personalization.biasing.clone();
        Self::remember(personalization, field, value, config.personalization.max_biases);
        if personalization.biasing == before {
            return unchanged();
        }
        emit(StorefrontEvent::PersonalizationUpdated)
    }
}

/// Owns free-form component state keyed by tag and id
pub struct UiReducer;

impl Reducer for UiReducer {
    type State = UiState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        ui: &mut UiState,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::CreateComponentState { tag, id, state } => {
                ui.components
                    .entry(tag.clone())
                    .or_default()
                    .insert(id.clone(), state.clone());
                emit(StorefrontEvent::UiUpdated { tag: tag.clone() })
            },
            StorefrontAction::RemoveComponentState { tag, id } => {
                let Some(by_id) = ui.components.get_mut(tag) else {
                    return unchanged();
                };
                if by_id.remove(id).is_none() {
                    return unchanged();
                }
                if by_id.is_empty() {
                    ui.components.remove(tag);
                }
                emit(StorefrontEvent::UiUpdated { tag: tag.clone() })
            },
            _ => unchanged(),
        }
    }
}
