//! HTTP-backed evidence store
//!
//! Talks to the deployed evidence service (vector index + record store)
//! over its JSON API. Uses a long-lived pooled client; every call is an
//! independent, atomic request with its own timeout.

use crate::error::AgentError;
use crate::models::EvidenceRecord;
use crate::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

pub struct HttpEvidenceStore {
    client: Client,
    base_url: String,
}

impl HttpEvidenceStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Read `EVIDENCE_API_BASE_URL` from the environment.
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("EVIDENCE_API_BASE_URL").ok()?;
        Self::new(base_url).ok()
    }

    async fn post_query(&self, path: &str, body: &Value) -> Result<Vec<EvidenceRecord>> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AgentError::ToolError(format!("evidence service request failed for {}: {}", path, e))
            })?;

        match response.status() {
            // A 404 here means the collection was never built, which is
            // fatal for the run.
            StatusCode::NOT_FOUND => Err(AgentError::NotFound(path.to_string())),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(AgentError::ToolError(format!(
                    "evidence service returned {} for {}: {}",
                    status, path, body
                )))
            }
            _ => response
                .json::<Vec<EvidenceRecord>>()
                .await
                .map_err(|e| AgentError::ToolError(format!("invalid evidence payload: {}", e))),
        }
    }
}

#[async_trait::async_trait]
impl super::EvidenceStore for HttpEvidenceStore {
    async fn query_similar_cases(&self, query: &str, limit: usize) -> Result<Vec<EvidenceRecord>> {
        self.post_query(
            "/api/v1/cases/search",
            &json!({ "query": query, "limit": limit }),
        )
        .await
    }

    async fn search_fraud_patterns(
        &self,
        indicators: &str,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>> {
        self.post_query(
            "/api/v1/patterns/search",
            &json!({ "query": indicators, "limit": limit }),
        )
        .await
    }

    async fn search_similar_profiles(
        &self,
        description: &str,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>> {
        self.post_query(
            "/api/v1/profiles/search",
            &json!({ "query": description, "limit": limit }),
        )
        .await
    }

    async fn fetch_kyc_profile(&self, customer_id: &str) -> Result<Vec<EvidenceRecord>> {
        self.post_query(
            "/api/v1/profiles/lookup",
            &json!({ "customer_id": customer_id }),
        )
        .await
    }

    async fn get_transaction(&self, transaction_id: &str) -> Result<Vec<EvidenceRecord>> {
        self.post_query(
            "/api/v1/transactions/lookup",
            &json!({ "transaction_id": transaction_id }),
        )
        .await
    }

    async fn transaction_history(
        &self,
        customer_id: &str,
        days_back: u32,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>> {
        self.post_query(
            "/api/v1/transactions/history",
            &json!({
                "customer_id": customer_id,
                "days_back": days_back,
                "limit": limit
            }),
        )
        .await
    }

    async fn query_siem_events(
        &self,
        customer_id: &str,
        hours_back: u32,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>> {
        self.post_query(
            "/api/v1/siem/events",
            &json!({
                "customer_id": customer_id,
                "hours_back": hours_back,
                "limit": limit
            }),
        )
        .await
    }
}
