//! Fetch workflows registered with the task orchestrator.
//!
//! Each fetch trigger kind has one workflow. A workflow reads what it needs
//! from the current snapshot, composes its request, calls the service through
//! the task context and dispatches the response. Failures are turned into the
//! error-tagged response of the same workflow, so the history's error step
//! decides between rewinding and surfacing.
//!
//! | Trigger                           | Policy         |
//! |-----------------------------------|----------------|
//! | `fetch_products`                  | cancel-latest  |
//! | `fetch_more_products`             | concurrent     |
//! | `fetch_more_refinements`          | concurrent     |
//! | `fetch_autocomplete_suggestions`  | cancel-latest  |
//! | `fetch_autocomplete_products`     | cancel-latest  |
//! | `fetch_product_details`           | cancel-latest  |
//! | `fetch_recommendations`           | cancel-latest  |
//! | `fetch_past_purchases`            | cancel-latest  |

use crate::action::{FetchFailure, MoreProducts, MoreRefinements, ProductsPage, StorefrontAction, StorefrontKind};
use crate::composer::{RequestComposers, RequestName};
use crate::error::{ServiceError, StorefrontError};
use crate::event::StorefrontEvent;
use crate::models::{Record, SearchResponse};
use crate::reconcile::{combine, pin_refinements, prune, rank_navigations};
use crate::reducers::StorefrontReducer;
use crate::requests;
use crate::state::QueryState;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use storefront_sync_core::Command;
use storefront_sync_runtime::{StoreBuilder, Task, TaskContext, TaskPolicy};

/// Service calls issued by workflows
pub const SERVICE_CALLS: &str = "storefront.service.calls";
/// Service calls that returned an error
pub const SERVICE_FAILURES: &str = "storefront.service.failures";

type Ctx = TaskContext<StorefrontReducer>;

/// What every workflow shares
#[derive(Clone)]
pub struct Services {
    /// Outbound search service
    pub service: Arc<dyn crate::service::SearchService>,
    /// Request composers with their memories
    pub composers: Arc<RequestComposers>,
}

impl Services {
    /// Bundle a service with its composers
    #[must_use]
    pub fn new(service: Arc<dyn crate::service::SearchService>, composers: RequestComposers) -> Self {
        Self {
            service,
            composers: Arc::new(composers),
        }
    }
}

/// One fetch workflow
#[async_trait]
pub trait Workflow: Send + Sync + 'static {
    /// Error-tagged response reporting `failure`
    fn failed(&self, failure: FetchFailure) -> StorefrontAction;

    /// Run the workflow for a committed trigger
    ///
    /// # Errors
    ///
    /// Any [`StorefrontError`]; [`Supervised`] decides what reaches the store.
    async fn execute(&self, ctx: &Ctx, command: &Command<StorefrontAction>) -> Result<(), StorefrontError>;
}

/// Adapts a [`Workflow`] to the orchestrator's [`Task`]
pub struct Supervised<W>(pub W);

#[async_trait]
impl<W: Workflow> Task<StorefrontReducer> for Supervised<W> {
    async fn run(&self, ctx: Ctx, command: Command<StorefrontAction>) {
        let error = match self.0.execute(&ctx, &command).await {
            Ok(()) => return,
            Err(StorefrontError::Cancelled(_)) => {
                tracing::debug!(kind = %command.kind(), "Workflow superseded");
                return;
            },
            Err(StorefrontError::MissingPrerequisite(what)) => {
                tracing::debug!(kind = %command.kind(), what, "Workflow skipped");
                return;
            },
            Err(error) => error,
        };

        if let StorefrontError::Service { request, source } = &error {
            tracing::warn!(%request, error = %source, "Service call failed");
            let bridge = StorefrontEvent::BridgeFailed {
                request: request.to_string(),
                message: source.to_string(),
            };
            if ctx.emit(&bridge).is_err() {
                return;
            }
        }

        let failure = FetchFailure::from(&error);
        if ctx.dispatch(self.0.failed(failure)).await.is_err() {
            tracing::debug!(kind = %command.kind(), "Failure report suppressed");
        }
    }
}

fn record<T>(request: RequestName, result: Result<T, ServiceError>) -> Result<T, StorefrontError> {
    metrics::counter!(SERVICE_CALLS, "request" => request.as_str()).increment(1);
    result.map_err(|source| {
        metrics::counter!(SERVICE_FAILURES, "request" => request.as_str()).increment(1);
        StorefrontError::Service { request, source }
    })
}

async fn call_service<T, F>(ctx: &Ctx, request: RequestName, call: F) -> Result<T, StorefrontError>
where
    F: Future<Output = Result<T, ServiceError>> + Send,
{
    let result = ctx.call(call).await?;
    record(request, result)
}

/// Records in the order of `values` matched on `field`
fn ordered_by(mut records: Vec<Record>, field: &str, values: &[String]) -> Vec<Record> {
    let key = |record: &Record| -> Option<usize> {
        let value = if field == "id" {
            Some(record.id.as_str())
        } else {
            record.meta_str(field)
        };
        value.and_then(|value| values.iter().position(|candidate| candidate == value))
    };
    records.sort_by_key(|record| key(record).unwrap_or(usize::MAX));
    records
}

/// Primary search plus facet ranking
pub struct ProductsWorkflow(pub Services);

impl ProductsWorkflow {
    fn responses(
        response: SearchResponse,
        query: String,
        collection: String,
        ranking: &[String],
        config: &crate::config::StorefrontConfig,
    ) -> Vec<StorefrontAction> {
        let navigations = combine(&response.available_navigation, &response.selected_navigation);
        let navigations = prune(navigations, config.max_refinements);
        let navigations = pin_refinements(navigations, &config.pinned_refinements);
        let navigations = rank_navigations(navigations, ranking);

        let total = response.total_record_count;
        let page = response.page_info;
        let mut actions = Vec::with_capacity(8);

        if let Some(id) = response.id {
            actions.push(StorefrontAction::ReceiveSearchId(id));
        }
        actions.push(StorefrontAction::ReceiveQuery(QueryState {
            original: if response.original_query.is_empty() {
                query
            } else {
                response.original_query
            },
            corrected: response.corrected_query,
            related: response.related_queries,
            did_you_mean: response.did_you_mean,
            rewrites: response.rewrites,
        }));
        actions.push(StorefrontAction::ReceiveProducts(Ok(ProductsPage {
            records: response.records,
            total,
            low: page.record_start.saturating_sub(1),
            high: page.record_end,
        })));
        actions.push(StorefrontAction::ReceiveNavigations(navigations));
        actions.push(StorefrontAction::ReceivePage {
            record_start: page.record_start,
            total,
        });
        if let Some(template) = response.template {
            actions.push(StorefrontAction::ReceiveTemplate(template));
        }
        actions.push(StorefrontAction::ReceiveCollectionCount {
            collection,
            count: total,
        });
        actions
    }
}

#[async_trait]
impl Workflow for ProductsWorkflow {
    fn failed(&self, failure: FetchFailure) -> StorefrontAction {
        StorefrontAction::ReceiveProducts(Err(failure))
    }

    async fn execute(&self, ctx: &Ctx, _command: &Command<StorefrontAction>) -> Result<(), StorefrontError> {
        let config = ctx.environment();
        let (base, ranking_request, query, collection) = ctx
            .state(|present| {
                (
                    requests::search(present, config),
                    requests::navigation_ranking(present, config),
                    present.query.original.clone(),
                    present.collections.selected.clone(),
                )
            })
            .await;
        let request = self.0.composers.compose(RequestName::Search, base, None);

        let service = &self.0.service;
        let (response, ranking) = ctx
            .call(futures::future::join(
                service.search(request),
                service.navigation_ranking(ranking_request),
            ))
            .await?;
        let mut response = record(RequestName::Search, response)?;
        let ranking = ranking.map(|ranking| ranking.fields).unwrap_or_else(|error| {
            tracing::warn!(%error, "Navigation ranking unavailable; keeping service order");
            Vec::new()
        });

        if let Some(url) = response.redirect.take() {
            tracing::info!(%url, "Search redirected");
            ctx.dispatch(StorefrontAction::ReceiveRedirect(url)).await?;
            return Ok(());
        }

        let records = response.records.len();
        let actions = Self::responses(response, query, collection, &ranking, config);
        ctx.dispatch(actions).await?;
        tracing::debug!(records, "Products received");
        Ok(())
    }
}

/// Infinite-scroll window in either direction
pub struct MoreProductsWorkflow(pub Services);

#[async_trait]
impl Workflow for MoreProductsWorkflow {
    fn failed(&self, failure: FetchFailure) -> StorefrontAction {
        StorefrontAction::ReceiveMoreProducts(Err(failure))
    }

    async fn execute(&self, ctx: &Ctx, command: &Command<StorefrontAction>) -> Result<(), StorefrontError> {
        let StorefrontAction::FetchMoreProducts { amount } = command.action() else {
            return Ok(());
        };
        let config = ctx.environment();
        let (base, low, high, total) = ctx
            .state(|present| {
                let products = &present.products;
                (requests::search(present, config), products.low, products.high, products.total)
            })
            .await;

        let forward = *amount > 0;
        let size = amount.unsigned_abs();
        let (skip, end) = if forward {
            (high, high.saturating_add(size).min(total))
        } else {
            (low.saturating_sub(size), low)
        };

        if end <= skip {
            ctx.dispatch(StorefrontAction::ReceiveMoreProducts(Ok(MoreProducts {
                records: Vec::new(),
                low: skip,
                high: skip,
                forward,
            })))
            .await?;
            return Ok(());
        }

        let window = requests::more_products(skip, end - skip);
        let request = self.0.composers.compose(RequestName::Search, base, Some(&window));
        let response = call_service(ctx, RequestName::Search, self.0.service.search(request)).await?;

        let count = response.records.len();
        let (low, high) = if forward {
            (skip, skip + count)
        } else {
            (end.saturating_sub(count), end)
        };
        ctx.dispatch(StorefrontAction::ReceiveMoreProducts(Ok(MoreProducts {
            records: response.records,
            low,
            high,
            forward,
        })))
        .await?;
        Ok(())
    }
}

/// Full refinement list of one facet
pub struct MoreRefinementsWorkflow(pub Services);

#[async_trait]
impl Workflow for MoreRefinementsWorkflow {
    fn failed(&self, failure: FetchFailure) -> StorefrontAction {
        StorefrontAction::ReceiveMoreRefinements(Err(failure))
    }

    async fn execute(&self, ctx: &Ctx, command: &Command<StorefrontAction>) -> Result<(), StorefrontError> {
        let StorefrontAction::FetchMoreRefinements { field } = command.action() else {
            return Ok(());
        };
        let config = ctx.environment();
        let base = ctx.state(|present| requests::refinements(present, config, field)).await;
        let request = self.0.composers.compose(RequestName::Refinements, base, None);
        let response = call_service(ctx, RequestName::Refinements, self.0.service.refinements(request)).await?;

        ctx.dispatch(StorefrontAction::ReceiveMoreRefinements(Ok(MoreRefinements {
            field: field.clone(),
            refinements: response.navigation.refinements,
        })))
        .await?;
        Ok(())
    }
}

/// Query suggestions
pub struct AutocompleteSuggestionsWorkflow(pub Services);

#[async_trait]
impl Workflow for AutocompleteSuggestionsWorkflow {
    fn failed(&self, failure: FetchFailure) -> StorefrontAction {
        StorefrontAction::ReceiveAutocompleteSuggestions(Err(failure))
    }

    async fn execute(&self, ctx: &Ctx, command: &Command<StorefrontAction>) -> Result<(), StorefrontError> {
        let StorefrontAction::FetchAutocompleteSuggestions { query } = command.action() else {
            return Ok(());
        };
        let config = ctx.environment();
        let base = ctx
            .state(|present| requests::autocomplete_suggestions(present, config, query))
            .await;
        let request = self.0.composers.compose(RequestName::AutocompleteSuggestions, base, None);
        let response = call_service(
            ctx,
            RequestName::AutocompleteSuggestions,
            self.0.service.autocomplete(request),
        )
        .await?;

        ctx.dispatch(StorefrontAction::ReceiveAutocompleteSuggestions(Ok(response)))
            .await?;
        Ok(())
    }
}

/// Product preview for a suggestion
pub struct AutocompleteProductsWorkflow(pub Services);

#[async_trait]
impl Workflow for AutocompleteProductsWorkflow {
    fn failed(&self, failure: FetchFailure) -> StorefrontAction {
        StorefrontAction::ReceiveAutocompleteProducts(Err(failure))
    }

    async fn execute(&self, ctx: &Ctx, command: &Command<StorefrontAction>) -> Result<(), StorefrontError> {
        let StorefrontAction::FetchAutocompleteProducts { query, refinements } = command.action() else {
            return Ok(());
        };
        let config = ctx.environment();
        let base = ctx
            .state(|present| requests::autocomplete_products(present, config, query, refinements))
            .await;
        let request = self.0.composers.compose(RequestName::AutocompleteProducts, base, None);
        let response = call_service(ctx, RequestName::AutocompleteProducts, self.0.service.search(request)).await?;

        ctx.dispatch(StorefrontAction::ReceiveAutocompleteProducts(Ok(response.records)))
            .await?;
        Ok(())
    }
}

/// Single product for the detail view
pub struct DetailsWorkflow(pub Services);

#[async_trait]
impl Workflow for DetailsWorkflow {
    fn failed(&self, failure: FetchFailure) -> StorefrontAction {
        StorefrontAction::ReceiveDetails(Err(failure))
    }

    async fn execute(&self, ctx: &Ctx, command: &Command<StorefrontAction>) -> Result<(), StorefrontError> {
        let StorefrontAction::FetchProductDetails { id } = command.action() else {
            return Ok(());
        };
        let config = ctx.environment();
        let base = ctx.state(|present| requests::details(present, config, id)).await;
        let request = self.0.composers.compose(RequestName::Details, base, None);
        let response = call_service(ctx, RequestName::Details, self.0.service.search(request)).await?;

        let record = response
            .records
            .into_iter()
            .next()
            .ok_or_else(|| FetchFailure::new(format!("product {id} not found")))?;
        ctx.dispatch(StorefrontAction::ReceiveDetails(Ok(record))).await?;
        Ok(())
    }
}

/// Recommended ids, then their products
pub struct RecommendationsWorkflow(pub Services);

#[async_trait]
impl Workflow for RecommendationsWorkflow {
    fn failed(&self, failure: FetchFailure) -> StorefrontAction {
        StorefrontAction::ReceiveRecommendations(Err(failure))
    }

    async fn execute(&self, ctx: &Ctx, _command: &Command<StorefrontAction>) -> Result<(), StorefrontError> {
        let config = ctx.environment();
        let base = ctx.state(|present| requests::recommendations(present, config)).await;
        let request = self.0.composers.compose(RequestName::Recommendations, base, None);
        let ids = call_service(ctx, RequestName::Recommendations, self.0.service.recommendations(request))
            .await?
            .product_ids;

        let records = if ids.is_empty() {
            Vec::new()
        } else {
            let base = ctx
                .state(|present| requests::products_by_values(present, config, &config.id_field, &ids))
                .await;
            let request = self.0.composers.compose(RequestName::RecommendationProducts, base, None);
            let response =
                call_service(ctx, RequestName::RecommendationProducts, self.0.service.search(request)).await?;
            ordered_by(response.records, &config.id_field, &ids)
        };

        ctx.dispatch(StorefrontAction::ReceiveRecommendations(Ok(records))).await?;
        Ok(())
    }
}

/// Previously purchased SKUs, then their products
pub struct PastPurchasesWorkflow(pub Services);

#[async_trait]
impl Workflow for PastPurchasesWorkflow {
    fn failed(&self, failure: FetchFailure) -> StorefrontAction {
        StorefrontAction::ReceivePastPurchases(Err(failure))
    }

    async fn execute(&self, ctx: &Ctx, _command: &Command<StorefrontAction>) -> Result<(), StorefrontError> {
        let config = ctx.environment();
        let payload = config
            .past_purchases
            .secured_payload
            .as_deref()
            .ok_or(StorefrontError::MissingPrerequisite("secured payload"))?;

        let base = requests::past_purchases(config, payload);
        let request = self.0.composers.compose(RequestName::PastPurchases, base, None);
        let skus: Vec<String> = call_service(ctx, RequestName::PastPurchases, self.0.service.past_purchases(request))
            .await?
            .products
            .into_iter()
            .map(|purchase| purchase.sku)
            .collect();

        let records = if skus.is_empty() {
            Vec::new()
        } else {
            let field = &config.past_purchases.sku_field;
            let base = ctx
                .state(|present| requests::products_by_values(present, config, field, &skus))
                .await;
            let request = self.0.composers.compose(RequestName::PastPurchaseProducts, base, None);
            let response = call_service(ctx, RequestName::PastPurchaseProducts, self.0.service.search(request)).await?;
            ordered_by(response.records, field, &skus)
        };

        ctx.dispatch(StorefrontAction::ReceivePastPurchases(Ok(records))).await?;
        Ok(())
    }
}

/// Register every workflow on a store builder
#[must_use]
pub fn register(builder: StoreBuilder<StorefrontReducer>, services: &Services) -> StoreBuilder<StorefrontReducer> {
    use StorefrontKind as K;
    use TaskPolicy::{CancelLatest, Concurrent};

    builder
        .task(K::FetchProducts, CancelLatest, Supervised(ProductsWorkflow(services.clone())))
        .task(K::FetchMoreProducts, Concurrent, Supervised(MoreProductsWorkflow(services.clone())))
        .task(K::FetchMoreRefinements, Concurrent, Supervised(MoreRefinementsWorkflow(services.clone())))
        .task(
            K::FetchAutocompleteSuggestions,
            CancelLatest,
            Supervised(AutocompleteSuggestionsWorkflow(services.clone())),
        )
        .task(
            K::FetchAutocompleteProducts,
            CancelLatest,
            Supervised(AutocompleteProductsWorkflow(services.clone())),
        )
        .task(K::FetchProductDetails, CancelLatest, Supervised(DetailsWorkflow(services.clone())))
        .task(K::FetchRecommendations, CancelLatest, Supervised(RecommendationsWorkflow(services.clone())))
        .task(K::FetchPastPurchases, CancelLatest, Supervised(PastPurchasesWorkflow(services.clone())))
}
