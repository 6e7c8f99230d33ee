use super::{emit, unchanged};
use crate::action::StorefrontAction;
use crate::config::StorefrontConfig;
use crate::event::StorefrontEvent;
use crate::models::Template;
use crate::state::QueryState;
use storefront_sync_core::{Effects, ReduceError, Reducer};

/// Owns the query region
pub struct QueryReducer;

impl Reducer for QueryReducer {
    type State = QueryState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        query: &mut QueryState,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::UpdateSearch { query: original } => {
                *query = QueryState {
                    original: original.clone(),
                    ..QueryState::default()
                };
                emit(StorefrontEvent::QueryChanged)
            },
            StorefrontAction::ReceiveQuery(received) if received != query => {
                query.clone_from(received);
                emit(StorefrontEvent::QueryChanged)
            },
            _ => unchanged(),
        }
    }
}

/// Owns the merchandising template
pub struct TemplateReducer;

impl Reducer for TemplateReducer {
    type State = Template;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        template: &mut Template,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::ReceiveTemplate(received) if received != template => {
                template.clone_from(received);
                emit(StorefrontEvent::TemplateUpdated)
            },
            _ => unchanged(),
        }
    }
}

/// Owns the pending redirect
pub struct RedirectReducer;

impl Reducer for RedirectReducer {
    type State = Option<String>;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        redirect: &mut Option<String>,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::ReceiveRedirect(url) => {
                *redirect = Some(url.clone());
                emit(StorefrontEvent::Redirect(url.clone()))
            },
            StorefrontAction::UpdateSearch { .. } => {
                *redirect = None;
                unchanged()
            },
            _ => unchanged(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_sync_testing::{ReducerTest, assertions};

    fn config() -> StorefrontConfig {
        StorefrontConfig::builder("acme").build()
    }

    #[test]
    fn new_search_clears_corrections() {
        ReducerTest::new(QueryReducer)
            .with_env(config())
            .given_state(QueryState {
                original: "bots".into(),
                corrected: Some("boots".into()),
                ..QueryState::default()
            })
            .when_action(StorefrontAction::UpdateSearch { query: "hats".into() })
            .then_state(|query| {
                assert_eq!(query.original, "hats");
                assert!(query.corrected.is_none());
            })
            .then_effects(|effects| assertions::assert_emits(effects, &[StorefrontEvent::QueryChanged]))
            .run();
    }

    #[test]
    fn identical_query_response_is_silent() {
        let query = QueryState {
            original: "boots".into(),
            ..QueryState::default()
        };
        ReducerTest::new(QueryReducer)
            .with_env(config())
            .given_state(query.clone())
            .when_action(StorefrontAction::ReceiveQuery(query))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn redirect_is_announced_with_its_url() {
        ReducerTest::new(RedirectReducer)
            .with_env(config())
            .given_state(None)
            .when_action(StorefrontAction::ReceiveRedirect("/sale".into()))
            .then_state(|redirect| assert_eq!(redirect.as_deref(), Some("/sale")))
            .then_effects(|effects| assertions::assert_emits(effects, &[StorefrontEvent::Redirect("/sale".into())]))
            .run();
    }
}
