//! End-to-end tests for the storefront against a scripted search service
//!
//! The service answers every search with a deterministic window of a 30-record
//! catalogue named after the query. Queries can be scripted to fail, to
//! redirect, or to block on a gate until the test opens it.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storefront_sync_runtime::DispatchOutcome;
use storefront_sync_search::models::{
    AutocompleteResponse, Facet, NavigationRanking, PageInfo, PastPurchasesResponse, Record,
    RecommendationsResponse, Refinement, RefinementsResponse, SearchResponse,
};
use storefront_sync_search::state::FetchCategory;
use storefront_sync_search::{
    RequestName, SearchService, ServiceError, Storefront, StorefrontConfig, StorefrontEvent, intents,
};
use storefront_sync_testing::{Gates, RecordingListener, init_tracing};

// ============================================================================
// Scripted service
// ============================================================================

const CATALOGUE: usize = 30;

#[derive(Default)]
struct ScriptedService {
    gates: Gates<String>,
    gated: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
    redirects: Mutex<HashMap<String, String>>,
    searches: Mutex<Vec<Value>>,
    suggestions: Mutex<Vec<String>>,
    past_purchases: AtomicUsize,
}

impl ScriptedService {
    fn gate(&self, query: &str) {
        self.gated.lock().unwrap().insert(query.to_string());
    }

    fn fail(&self, query: &str) {
        self.failing.lock().unwrap().insert(query.to_string());
    }

    fn redirect(&self, query: &str, url: &str) {
        self.redirects.lock().unwrap().insert(query.to_string(), url.to_string());
    }

    fn searches(&self) -> Vec<Value> {
        self.searches.lock().unwrap().clone()
    }

    async fn hold(&self, query: &str) {
        let gated = self.gated.lock().unwrap().contains(query);
        if gated {
            self.gates.wait(query.to_string()).await;
        }
    }

    fn check(&self, query: &str) -> Result<(), ServiceError> {
        if self.failing.lock().unwrap().contains(query) {
            return Err(ServiceError::Status {
                status: 503,
                message: format!("{query} unavailable"),
            });
        }
        Ok(())
    }
}

fn number(request: &Value, key: &str, default: usize) -> usize {
    request
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(default)
}

/// Echo the requested value refinements back as selected facets
fn selected_facets(request: &Value) -> Vec<Facet> {
    let mut facets: Vec<Facet> = Vec::new();
    let refinements = request.get("refinements").and_then(Value::as_array);
    for refinement in refinements.into_iter().flatten() {
        let (Some(field), Some(value)) = (
            refinement.get("navigationName").and_then(Value::as_str),
            refinement.get("value").and_then(Value::as_str),
        ) else {
            continue;
        };
        match facets.iter_mut().find(|facet| facet.name == field) {
            Some(facet) => facet.refinements.push(Refinement::value(value)),
            None => facets.push(Facet {
                name: field.to_string(),
                or: true,
                refinements: vec![Refinement::value(value)],
                ..Facet::default()
            }),
        }
    }
    facets
}

fn query_of(request: &Value) -> String {
    request.get("query").and_then(Value::as_str).unwrap_or_default().to_string()
}

#[async_trait]
impl SearchService for ScriptedService {
    async fn search(&self, request: Value) -> Result<SearchResponse, ServiceError> {
        let query = query_of(&request);
        self.searches.lock().unwrap().push(request.clone());
        self.hold(&query).await;
        self.check(&query)?;

        if let Some(url) = self.redirects.lock().unwrap().get(&query) {
            return Ok(SearchResponse {
                redirect: Some(url.clone()),
                ..SearchResponse::default()
            });
        }

        let skip = number(&request, "skip", 0).min(CATALOGUE);
        let size = number(&request, "pageSize", 10);
        let end = (skip + size).min(CATALOGUE);
        Ok(SearchResponse {
            id: Some(format!("search-{query}")),
            original_query: query.clone(),
            records: (skip..end).map(|n| Record::new(format!("{query}-{n}"))).collect(),
            total_record_count: CATALOGUE,
            page_info: PageInfo {
                record_start: skip + 1,
                record_end: end,
            },
            available_navigation: vec![Facet {
                name: "color".into(),
                display_name: "Color".into(),
                or: true,
                refinements: vec![
                    Refinement::value("red").with_total(12),
                    Refinement::value("blue").with_total(8),
                ],
                ..Facet::default()
            }],
            selected_navigation: selected_facets(&request),
            ..SearchResponse::default()
        })
    }

    async fn refinements(&self, _request: Value) -> Result<RefinementsResponse, ServiceError> {
        Ok(RefinementsResponse::default())
    }

    async fn autocomplete(&self, request: Value) -> Result<AutocompleteResponse, ServiceError> {
        let query = query_of(&request);
        self.suggestions.lock().unwrap().push(query.clone());
        self.hold(&query).await;
        self.check(&query)?;
        Ok(AutocompleteResponse {
            suggestions: vec![format!("{query} suggestion")],
            ..AutocompleteResponse::default()
        })
    }

    async fn recommendations(&self, _request: Value) -> Result<RecommendationsResponse, ServiceError> {
        Ok(RecommendationsResponse::default())
    }

    async fn navigation_ranking(&self, _request: Value) -> Result<NavigationRanking, ServiceError> {
        Ok(NavigationRanking::default())
    }

    async fn past_purchases(&self, _request: Value) -> Result<PastPurchasesResponse, ServiceError> {
        self.past_purchases.fetch_add(1, Ordering::SeqCst);
        Ok(PastPurchasesResponse::default())
    }
}

fn config() -> StorefrontConfig {
    StorefrontConfig::builder("acme")
        .collection("products")
        .session_id("shopper-1")
        .build()
}

fn storefront_with(config: StorefrontConfig) -> (Storefront, Arc<ScriptedService>, RecordingListener<StorefrontEvent>) {
    init_tracing();
    let service = Arc::new(ScriptedService::default());
    let storefront = Storefront::builder(config, Arc::clone(&service) as Arc<dyn SearchService>)
        .build()
        .unwrap();
    let listener = RecordingListener::attach(storefront.bus());
    (storefront, service, listener)
}

fn storefront() -> (Storefront, Arc<ScriptedService>, RecordingListener<StorefrontEvent>) {
    storefront_with(config())
}

async fn settle(storefront: &Storefront, intent: storefront_sync_search::StorefrontIntent) {
    let mut handle = storefront.dispatch(intent).await;
    handle
        .wait_with_timeout(Duration::from_secs(5))
        .await
        .expect("tasks did not finish");
}

// ============================================================================
// Searching
// ============================================================================

#[tokio::test]
async fn search_commits_one_checkpoint_and_applies_results() {
    let (storefront, service, listener) = storefront();

    let mut handle = storefront.dispatch(intents::search("boots")).await;
    assert_eq!(handle.outcome(), &DispatchOutcome::Committed { commands: 2 });
    handle.wait().await;

    let present = storefront.present().await;
    assert_eq!(present.query.original, "boots");
    assert_eq!(present.products.records.len(), 10);
    assert_eq!(present.products.records[0].id, "boots-0");
    assert_eq!((present.products.low, present.products.high, present.products.total), (0, 10, 30));
    assert_eq!((present.page.current, present.page.last), (1, 3));
    assert_eq!(present.navigations.facets[0].field, "color");
    assert_eq!(present.session.search_id.as_deref(), Some("search-boots"));
    assert_eq!(present.collections.counts.get("products"), Some(&30));
    assert!(!present.fetching.is_fetching(FetchCategory::Products));

    let snapshot = storefront.store().snapshot().await;
    assert_eq!(snapshot.past().len(), 1);
    assert_eq!(listener.count("history_save"), 1);
    assert!(listener.saw("fetch:products:start"));
    assert!(listener.saw("fetch:products:done"));
    assert!(listener.saw("products_updated"));

    assert_eq!(service.searches().len(), 1);
    let remembered = storefront.composers().get(RequestName::Search).unwrap().previous().unwrap();
    assert_eq!(remembered["query"], "boots");
    assert_eq!(remembered["collection"], "products");
}

#[tokio::test]
async fn no_op_search_is_rejected_without_a_request() {
    let (storefront, service, listener) = storefront();

    let handle = storefront.dispatch(intents::search("")).await;

    assert_eq!(handle.outcome(), &DispatchOutcome::Rejected);
    assert_eq!(handle.rejections().len(), 1);
    assert!(service.searches().is_empty());
    assert!(!listener.saw("history_save"));
}

#[tokio::test]
async fn results_barrier_fires_once_both_halves_arrive() {
    let (storefront, _service, _listener) = storefront();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    storefront
        .bus()
        .join_on(["fetch:products:done", "navigations_updated"], move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    settle(&storefront, intents::search("boots")).await;

    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn selecting_a_refinement_refetches_from_page_one() {
    let (storefront, service, _listener) = storefront();
    settle(&storefront, intents::search("boots")).await;
    settle(&storefront, intents::switch_page(2)).await;
    assert_eq!(storefront.present().await.page.current, 2);

    settle(&storefront, intents::select_refinement("color", 1)).await;

    let present = storefront.present().await;
    assert_eq!(present.page.current, 1);
    assert_eq!(
        present.selected_refinements(),
        vec![("color".to_string(), Refinement::value("blue"))]
    );
    let last = service.searches().pop().unwrap();
    assert_eq!(last["skip"], 0);
    assert_eq!(last["refinements"][0]["value"], "blue");
    assert_eq!(storefront.store().snapshot().await.past().len(), 3);
}

#[tokio::test]
async fn redirect_response_only_records_the_target() {
    let (storefront, service, listener) = storefront();
    service.redirect("sale", "/sale");

    settle(&storefront, intents::search("sale")).await;

    let present = storefront.present().await;
    assert_eq!(present.redirect.as_deref(), Some("/sale"));
    assert!(present.products.records.is_empty());
    assert!(!present.fetching.is_fetching(FetchCategory::Products));
    assert!(
        listener
            .events()
            .contains(&StorefrontEvent::Redirect("/sale".to_string()))
    );
    assert!(!listener.saw("products_updated"));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn failed_search_rewinds_to_the_previous_checkpoint() {
    let (storefront, service, listener) = storefront();
    service.fail("boots");

    settle(&storefront, intents::search("boots")).await;

    let present = storefront.present().await;
    assert_eq!(present.query.original, "");
    assert!(!present.fetching.is_fetching(FetchCategory::Products));
    assert!(storefront.store().snapshot().await.past().is_empty());
    assert!(listener.saw("error:bridge"));
    assert!(listener.saw("history_rewind"));
    assert!(!listener.saw("error:fetch_action"));
}

#[tokio::test]
async fn rewinding_onto_an_in_flight_checkpoint_lowers_its_flag() {
    let (storefront, service, listener) = storefront();
    service.gate("boots");
    service.fail("hats");

    let mut superseded = storefront.dispatch(intents::search("boots")).await;
    settle(&storefront, intents::search("hats")).await;

    let present = storefront.present().await;
    assert_eq!(present.query.original, "boots");
    assert!(!present.fetching.is_fetching(FetchCategory::Products));
    assert!(listener.saw("history_rewind"));
    assert!(listener.saw("fetch:products:done"));

    service.gates.open("boots".to_string());
    superseded.wait().await;
    assert!(!storefront.present().await.fetching.is_fetching(FetchCategory::Products));
}

#[tokio::test]
async fn failed_fetch_without_a_checkpoint_is_surfaced() {
    let (storefront, service, listener) = storefront();
    service.fail("");

    settle(&storefront, intents::fetch_products()).await;

    let present = storefront.present().await;
    assert!(!present.fetching.is_fetching(FetchCategory::Products));
    assert!(listener.saw("error:fetch_action"));
    assert!(!listener.saw("history_rewind"));
    let bridge = listener
        .events()
        .into_iter()
        .find_map(|event| match event {
            StorefrontEvent::BridgeFailed { request, message } => Some((request, message)),
            _ => None,
        })
        .unwrap();
    assert_eq!(bridge.0, "search");
    assert!(bridge.1.contains("503"));
}

#[tokio::test]
async fn past_purchases_without_a_payload_is_skipped() {
    let (storefront, service, listener) = storefront();

    settle(&storefront, intents::fetch_past_purchases()).await;

    assert_eq!(service.past_purchases.load(Ordering::SeqCst), 0);
    assert!(!listener.saw("fetch:past-purchases:start"));
    assert!(!listener.saw("error:fetch_action"));
    assert!(!listener.saw("error:bridge"));
}

#[tokio::test]
async fn past_purchases_with_a_payload_calls_the_service() {
    let (storefront, service, listener) =
        storefront_with(StorefrontConfig::builder("acme").secured_payload("signed-token").build());

    settle(&storefront, intents::fetch_past_purchases()).await;

    assert_eq!(service.past_purchases.load(Ordering::SeqCst), 1);
    assert!(listener.saw("fetch:past-purchases:start"));
    assert!(listener.saw("fetch:past-purchases:done"));
}

// ============================================================================
// Orchestration policies
// ============================================================================

#[tokio::test]
async fn autocomplete_keeps_only_the_latest_query() {
    let (storefront, service, _listener) = storefront();
    service.gate("bo");
    service.gate("boo");

    let mut first = storefront.dispatch(intents::fetch_autocomplete_suggestions("bo")).await;
    let mut second = storefront.dispatch(intents::fetch_autocomplete_suggestions("boo")).await;

    service.gates.open("boo".to_string());
    second.wait().await;
    service.gates.open("bo".to_string());
    first.wait().await;

    let present = storefront.present().await;
    assert_eq!(present.autocomplete.query, "boo");
    assert_eq!(present.autocomplete.suggestions, vec!["boo suggestion".to_string()]);
    assert_eq!(service.suggestions.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn more_products_appends_the_next_window() {
    let (storefront, _service, listener) = storefront();
    settle(&storefront, intents::search("boots")).await;

    settle(&storefront, intents::fetch_more_products(10)).await;

    let present = storefront.present().await;
    assert_eq!(present.products.records.len(), 20);
    assert_eq!(present.products.records[10].id, "boots-10");
    assert_eq!((present.products.low, present.products.high), (0, 20));
    assert!(listener.saw("more_products_added"));
}

#[tokio::test]
async fn concurrent_windows_apply_once_and_ignore_the_stale_one() {
    let (storefront, service, _listener) = storefront();
    settle(&storefront, intents::search("boots")).await;

    let mut first = storefront.dispatch(intents::fetch_more_products(5)).await;
    let mut second = storefront.dispatch(intents::fetch_more_products(5)).await;
    first.wait().await;
    second.wait().await;

    let present = storefront.present().await;
    assert_eq!(present.products.records.len(), 15);
    assert_eq!(present.products.high, 15);
    assert!(!present.fetching.is_fetching(FetchCategory::MoreProducts));
    assert_eq!(service.searches().len(), 3);
}

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn undo_and_redo_move_between_searches() {
    let (storefront, _service, listener) = storefront();
    settle(&storefront, intents::search("boots")).await;
    settle(&storefront, intents::search("hats")).await;

    storefront.dispatch(intents::undo()).await;
    let present = storefront.present().await;
    assert_eq!(present.query.original, "boots");
    assert_eq!(present.products.records[0].id, "boots-0");
    assert!(listener.saw("history_undo"));

    storefront.dispatch(intents::redo()).await;
    assert_eq!(storefront.present().await.query.original, "hats");
    assert!(listener.saw("history_redo"));
}

#[tokio::test]
async fn restore_replaces_state_but_keeps_the_session() {
    let (storefront, _service, listener) = storefront();
    settle(&storefront, intents::search("boots")).await;
    listener.clear();

    let mut saved = storefront_sync_search::Present::default();
    saved.query.original = "saved".to_string();
    saved.session.id = "someone-else".to_string();
    storefront.dispatch(intents::restore(saved)).await;

    let present = storefront.present().await;
    assert_eq!(present.query.original, "saved");
    assert_eq!(present.session.id, "shopper-1");
    assert!(storefront.store().snapshot().await.past().is_empty());
    assert_eq!(listener.count("query_changed"), 1);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn dispatch_after_shutdown_is_suppressed() {
    let (storefront, service, _listener) = storefront();
    storefront.start();

    storefront.shutdown(Duration::from_secs(1)).await.unwrap();
    let handle = storefront.dispatch(intents::search("boots")).await;

    assert_eq!(handle.outcome(), &DispatchOutcome::Suppressed);
    assert!(service.searches().is_empty());
}

#[tokio::test]
async fn kill_cancels_a_blocked_search() {
    let (storefront, service, listener) = storefront();
    service.gate("boots");

    let mut handle = storefront.dispatch(intents::search("boots")).await;
    storefront.kill();
    service.gates.open("boots".to_string());
    handle.wait().await;

    assert!(listener.saw("app:killed"));
    assert!(storefront.present().await.products.records.is_empty());
}
