//! Outbound query services.
//!
//! Workflows only see [`SearchService`]; [`HttpBridge`] is the production
//! implementation talking JSON over HTTP. Tests substitute scripted mocks.

use crate::config::StorefrontConfig;
use crate::error::ServiceError;
use crate::models::{
    AutocompleteResponse, NavigationRanking, PastPurchasesResponse, RecommendationsResponse, RefinementsResponse,
    SearchResponse,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The search back-end as seen by workflows
#[async_trait]
pub trait SearchService: Send + Sync + 'static {
    /// Product search
    async fn search(&self, request: Value) -> Result<SearchResponse, ServiceError>;

    /// Full refinement list of one facet
    async fn refinements(&self, request: Value) -> Result<RefinementsResponse, ServiceError>;

    /// Query suggestions
    async fn autocomplete(&self, request: Value) -> Result<AutocompleteResponse, ServiceError>;

    /// Recommended product ids
    async fn recommendations(&self, request: Value) -> Result<RecommendationsResponse, ServiceError>;

    /// Facet ordering for a query
    async fn navigation_ranking(&self, request: Value) -> Result<NavigationRanking, ServiceError>;

    /// SKUs the signed shopper bought before
    async fn past_purchases(&self, request: Value) -> Result<PastPurchasesResponse, ServiceError>;
}

/// HTTP implementation of [`SearchService`]
#[derive(Clone)]
pub struct HttpBridge {
    client: Client,
    endpoint: String,
    customer_id: String,
}

impl HttpBridge {
    /// Create a bridge for an endpoint and customer
    #[must_use]
    pub fn new(endpoint: impl Into<String>, customer_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            customer_id: customer_id.into(),
        }
    }

    /// Create a bridge from storefront configuration
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self::new(&config.endpoint, &config.customer_id)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ServiceError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.endpoint))
            .header("x-customer-id", &self.customer_id)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<T>()
                .await
                .map_err(|e| ServiceError::ResponseParseFailed(e.to_string())),
            status => {
                let message = response.text().await.unwrap_or_default();
                tracing::warn!(path, status = status.as_u16(), "Search service returned an error");
                Err(ServiceError::Status {
                    status: status.as_u16(),
                    message,
                })
            },
        }
    }
}

#[async_trait]
impl SearchService for HttpBridge {
    async fn search(&self, request: Value) -> Result<SearchResponse, ServiceError> {
        self.post("search", &request).await
    }

    async fn refinements(&self, request: Value) -> Result<RefinementsResponse, ServiceError> {
        self.post("refinements", &request).await
    }

    async fn autocomplete(&self, request: Value) -> Result<AutocompleteResponse, ServiceError> {
        self.post("autocomplete", &request).await
    }

    async fn recommendations(&self, request: Value) -> Result<RecommendationsResponse, ServiceError> {
        self.post("recommendations", &request).await
    }

    async fn navigation_ranking(&self, request: Value) -> Result<NavigationRanking, ServiceError> {
        self.post("navigation-ranking", &request).await
    }

    async fn past_purchases(&self, request: Value) -> Result<PastPurchasesResponse, ServiceError> {
        self.post("past-purchases", &request).await
    }
}
