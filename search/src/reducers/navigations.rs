use super::{emit, unchanged};
use crate::action::{MoreRefinements, StorefrontAction};
use crate::config::StorefrontConfig;
use crate::event::StorefrontEvent;
use crate::models::{Navigation, Refinement};
use crate::state::NavigationsState;
use storefront_sync_core::{Effects, ReduceError, Reducer};

const REGION: &str = "navigations";

/// Owns facets and their selections
pub struct NavigationsReducer;

impl NavigationsReducer {
    fn select(state: &mut NavigationsState, field: &str, index: usize) -> Result<(), ReduceError> {
        let navigation = state
            .find_mut(field)
            .ok_or_else(|| ReduceError::new(REGION, format!("unknown navigation '{field}'")))?;
        if index >= navigation.refinements.len() {
            return Err(ReduceError::new(
                REGION,
                format!("refinement {index} out of range for '{field}'"),
            ));
        }
        if navigation.or {
            if !navigation.is_selected(index) {
                navigation.selected.push(index);
            }
        } else {
            navigation.selected = vec![index];
        }
        Ok(())
    }

    fn add(state: &mut NavigationsState, field: &str, refinement: &Refinement) {
        match state.find_mut(field) {
            Some(navigation) => {
                let index = navigation.index_of(refinement).unwrap_or_else(|| {
                    navigation.refinements.push(refinement.clone());
                    navigation.refinements.len() - 1
                });
                if navigation.or {
                    if !navigation.is_selected(index) {
                        navigation.selected.push(index);
                    }
                } else {
                    navigation.selected = vec![index];
                }
            },
            None => state.facets.push(Navigation {
                field: field.to_string(),
                label: field.to_string(),
                range: refinement.is_range(),
                refinements: vec![refinement.clone()],
                selected: vec![0],
                ..Navigation::default()
            }),
        }
    }

    /// Replace a facet's refinement list with the full one, keeping selections
    fn expand(state: &mut NavigationsState, more: &MoreRefinements) {
        let Some(navigation) = state.find_mut(&more.field) else {
            tracing::debug!(field = %more.field, "Dropping refinements for a facet no longer shown");
            return;
        };

        let chosen: Vec<Refinement> = navigation.selected_refinements().cloned().collect();
        let mut refinements = more.refinements.clone();
        let mut selected = Vec::with_capacity(chosen.len());
        for refinement in chosen {
            let index = refinements
                .iter()
                .position(|candidate| *candidate == refinement)
                .unwrap_or_else(|| {
                    refinements.push(refinement);
                    refinements.len() - 1
                });
            selected.push(index);
        }

        navigation.refinements = refinements;
        navigation.selected = selected;
        navigation.more = false;
    }
}

impl Reducer for NavigationsReducer {
    type State = NavigationsState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        state: &mut NavigationsState,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::UpdateSearch { .. } | StorefrontAction::ResetRefinements { field: None } => {
                for navigation in &mut state.facets {
                    navigation.selected.clear();
                }
            },
            StorefrontAction::ResetRefinements { field: Some(field) } => {
                if let Some(navigation) = state.find_mut(field) {
                    navigation.selected.clear();
                }
            },
            StorefrontAction::SelectRefinement { field, index, .. } => Self::select(state, field, *index)?,
            StorefrontAction::DeselectRefinement { field, index } => {
                if let Some(navigation) = state.find_mut(field) {
                    navigation.selected.retain(|selected| selected != index);
                }
            },
            StorefrontAction::AddRefinement { field, refinement } => Self::add(state, field, refinement),
            StorefrontAction::ReceiveNavigations(navigations) => state.facets.clone_from(navigations),
            StorefrontAction::ReceiveMoreRefinements(Ok(more)) => Self::expand(state, more),
            _ => return unchanged(),
        }
        emit(StorefrontEvent::NavigationsUpdated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_sync_testing::{ReducerTest, assertions};

    fn state(or: bool) -> NavigationsState {
        NavigationsState {
            facets: vec![Navigation {
                field: "color".into(),
                label: "Color".into(),
                or,
                refinements: vec![Refinement::value("red"), Refinement::value("blue")],
                selected: vec![0],
                more: true,
                ..Navigation::default()
            }],
        }
    }

    fn config() -> StorefrontConfig {
        StorefrontConfig::builder("acme").build()
    }

    fn select(index: usize) -> StorefrontAction {
        StorefrontAction::SelectRefinement {
            field: "color".into(),
            index,
            refinement: Refinement::value("blue"),
        }
    }

    #[test]
    fn or_facets_accumulate_selections() {
        ReducerTest::new(NavigationsReducer)
            .with_env(config())
            .given_state(state(true))
            .when_action(select(1))
            .then_state(|state| assert_eq!(state.facets[0].selected, vec![0, 1]))
            .then_effects(|effects| assertions::assert_emits(effects, &[StorefrontEvent::NavigationsUpdated]))
            .run();
    }

    #[test]
    fn single_select_facets_replace_the_selection() {
        ReducerTest::new(NavigationsReducer)
            .with_env(config())
            .given_state(state(false))
            .when_action(select(1))
            .then_state(|state| assert_eq!(state.facets[0].selected, vec![1]))
            .run();
    }

    #[test]
    fn selecting_past_the_end_fails() {
        ReducerTest::new(NavigationsReducer)
            .with_env(config())
            .given_state(state(true))
            .when_action(select(7))
            .then_error(|error| assert_eq!(error.region, "navigations"))
            .run();
    }

    #[test]
    fn adding_an_unknown_facet_creates_it_selected() {
        ReducerTest::new(NavigationsReducer)
            .with_env(config())
            .given_state(state(true))
            .when_action(StorefrontAction::AddRefinement {
                field: "size".into(),
                refinement: Refinement::value("9"),
            })
            .then_state(|state| {
                let size = state.find("size").unwrap();
                assert_eq!(size.selected, vec![0]);
                assert_eq!(size.refinements, vec![Refinement::value("9")]);
            })
            .run();
    }

    #[test]
    fn full_refinement_list_keeps_selected_values() {
        ReducerTest::new(NavigationsReducer)
            .with_env(config())
            .given_state(state(true))
            .when_action(StorefrontAction::ReceiveMoreRefinements(Ok(MoreRefinements {
                field: "color".into(),
                refinements: vec![
                    Refinement::value("blue"),
                    Refinement::value("green"),
                    Refinement::value("red"),
                ],
            })))
            .then_state(|state| {
                let color = &state.facets[0];
                assert_eq!(color.refinements.len(), 3);
                assert_eq!(color.selected, vec![2]);
                assert!(!color.more);
            })
            .run();
    }

    #[test]
    fn new_search_clears_every_selection() {
        ReducerTest::new(NavigationsReducer)
            .with_env(config())
            .given_state(state(true))
            .when_action(StorefrontAction::UpdateSearch { query: "boots".into() })
            .then_state(|state| assert_eq!(state.selected_count(), 0))
            .run();
    }
}
