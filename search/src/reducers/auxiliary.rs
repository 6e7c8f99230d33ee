use super::{emit, unchanged};
use crate::action::StorefrontAction;
use crate::config::StorefrontConfig;
use crate::event::StorefrontEvent;
use crate::state::{AutocompleteState, DetailsState, PastPurchasesState, RecommendationsState};
use storefront_sync_core::{Effects, ReduceError, Reducer};

/// Owns autocomplete suggestions and the product preview
pub struct AutocompleteReducer;

impl Reducer for AutocompleteReducer {
    type State = AutocompleteState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        autocomplete: &mut AutocompleteState,
        action: &StorefrontAction,
        config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::FetchAutocompleteSuggestions { query } if *query != autocomplete.query => {
                autocomplete.query.clone_from(query);
                emit(StorefrontEvent::AutocompleteUpdated)
            },
            StorefrontAction::ReceiveAutocompleteSuggestions(Ok(response)) => {
                let limits = &config.autocomplete;
                autocomplete.suggestions = response.suggestions.iter().take(limits.suggestion_count).cloned().collect();
                autocomplete.categories.clone_from(&response.categories);
                autocomplete.navigations = response.navigations.iter().take(limits.navigation_count).cloned().collect();
                emit(StorefrontEvent::AutocompleteUpdated)
            },
            StorefrontAction::ReceiveAutocompleteProducts(Ok(records)) => {
                autocomplete.products.clone_from(records);
                emit(StorefrontEvent::AutocompleteProductsUpdated)
            },
            _ => unchanged(),
        }
    }
}

/// Owns the product detail view
pub struct DetailsReducer;

impl Reducer for DetailsReducer {
    type State = DetailsState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        details: &mut DetailsState,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::ReceiveDetails(Ok(record)) => {
                details.product = Some(record.clone());
                emit(StorefrontEvent::DetailsUpdated)
            },
            _ => unchanged(),
        }
    }
}

/// Owns recommended products
pub struct RecommendationsReducer;

impl Reducer for RecommendationsReducer {
    type State = RecommendationsState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        recommendations: &mut RecommendationsState,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::ReceiveRecommendations(Ok(records)) => {
                recommendations.products.clone_from(records);
                emit(StorefrontEvent::RecommendationsUpdated)
            },
            _ => unchanged(),
        }
    }
}

/// Owns previously purchased products
pub struct PastPurchasesReducer;

impl Reducer for PastPurchasesReducer {
    type State = PastPurchasesState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        past_purchases: &mut PastPurchasesState,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::ReceivePastPurchases(Ok(records)) => {
                past_purchases.products.clone_from(records);
                emit(StorefrontEvent::PastPurchasesUpdated)
            },
            _ => unchanged(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::FetchFailure;
    use crate::models::{AutocompleteResponse, Record};
    use storefront_sync_testing::{ReducerTest, assertions};

    #[test]
    fn suggestions_are_capped_by_configuration() {
        let config = StorefrontConfig::builder("acme").build();
        let limit = config.autocomplete.suggestion_count;
        let suggestions: Vec<String> = (0..limit + 3).map(|i| format!("boot {i}")).collect();

        ReducerTest::new(AutocompleteReducer)
            .with_env(config)
            .given_state(AutocompleteState::default())
            .when_action(StorefrontAction::ReceiveAutocompleteSuggestions(Ok(AutocompleteResponse {
                suggestions,
                ..AutocompleteResponse::default()
            })))
            .then_state(move |autocomplete| assert_eq!(autocomplete.suggestions.len(), limit))
            .then_effects(|effects| assertions::assert_emits(effects, &[StorefrontEvent::AutocompleteUpdated]))
            .run();
    }

    #[test]
    fn failed_details_keep_the_previous_product() {
        ReducerTest::new(DetailsReducer)
            .with_env(StorefrontConfig::builder("acme").build())
            .given_state(DetailsState {
                product: Some(Record::new("p1")),
            })
            .when_action(StorefrontAction::ReceiveDetails(Err(FetchFailure::new("not found"))))
            .then_state(|details| assert_eq!(details.product.as_ref().map(|p| p.id.as_str()), Some("p1")))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn recommendations_replace_previous_ones() {
        ReducerTest::new(RecommendationsReducer)
            .with_env(StorefrontConfig::builder("acme").build())
            .given_state(RecommendationsState {
                products: vec![Record::new("old")],
            })
            .when_action(StorefrontAction::ReceiveRecommendations(Ok(vec![
                Record::new("a"),
                Record::new("b"),
            ])))
            .then_state(|recommendations| {
                let ids: Vec<_> = recommendations.products.iter().map(|p| p.id.as_str()).collect();
                assert_eq!(ids, vec!["a", "b"]);
            })
            .run();
    }
}
