//! HTTP seam between the orchestration layer and the recommendation backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{RecommendationItem, UserId, UserStats},
    error::{ApiErrorBody, ApiFailure},
    protocol::{SearchRequest, SearchResponse},
};

/// The four backend operations the dashboard consumes. Kept behind a trait
/// so the orchestrator can be driven by a test double.
#[async_trait]
pub trait RecommenderApi: Send + Sync {
    async fn fetch_recommendations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RecommendationItem>, ApiFailure>;
    async fn fetch_stats(&self, user_id: &UserId) -> Result<UserStats, ApiFailure>;
    async fn search(&self, query: &str) -> Result<SearchResponse, ApiFailure>;
    /// Fire-and-forget: the response body is ignored, only the status matters.
    async fn trigger_training(&self) -> Result<(), ApiFailure>;
}

pub struct HttpRecommenderApi {
    http: Client,
    base_url: String,
}

impl HttpRecommenderApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiFailure> {
        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ApiErrorBody>().await.ok();
            return Err(ApiFailure::status(status.as_u16(), body));
        }
        response
            .json::<T>()
            .await
            .map_err(|err| ApiFailure::Decode(err.to_string()))
    }
}

#[async_trait]
impl RecommenderApi for HttpRecommenderApi {
    async fn fetch_recommendations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<RecommendationItem>, ApiFailure> {
        let response = self
            .http
            .get(format!(
                "{}/users/{user_id}/recommendations",
                self.base_url
            ))
            .send()
            .await
            .map_err(|err| ApiFailure::Unreachable(err.to_string()))?;
        Self::decode(response).await
    }

    async fn fetch_stats(&self, user_id: &UserId) -> Result<UserStats, ApiFailure> {
        let response = self
            .http
            .get(format!("{}/users/{user_id}/stats", self.base_url))
            .send()
            .await
            .map_err(|err| ApiFailure::Unreachable(err.to_string()))?;
        Self::decode(response).await
    }

    async fn search(&self, query: &str) -> Result<SearchResponse, ApiFailure> {
        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .json(&SearchRequest {
                query: query.to_string(),
            })
            .send()
            .await
            .map_err(|err| ApiFailure::Unreachable(err.to_string()))?;
        Self::decode(response).await
    }

    async fn trigger_training(&self) -> Result<(), ApiFailure> {
        let response = self
            .http
            .post(format!("{}/train", self.base_url))
            .send()
            .await
            .map_err(|err| ApiFailure::Unreachable(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ApiErrorBody>().await.ok();
            return Err(ApiFailure::status(status.as_u16(), body));
        }
        Ok(())
    }
}
