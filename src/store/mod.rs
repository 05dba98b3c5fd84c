//! Evidence store adapter
//!
//! Uniform read-only access to the evidence sources: past investigation
//! cases, known fraud patterns, KYC profiles, SIEM event logs, and
//! transaction records. The similarity-backed collections live in a vector
//! index behind the deployed evidence service; this module only defines
//! the query contract plus an in-memory fixture implementation.
//!
//! All operations are read-only and safe to retry; implementations must be
//! safe for concurrent reads across runs.

use crate::models::EvidenceRecord;
use crate::Result;
use chrono::{Duration, Utc};

pub mod http;
pub use http::HttpEvidenceStore;

/// Read-only access to the five evidence sources.
///
/// Similarity operations return records ordered by descending score with
/// ties broken by the insertion order of the underlying store. An empty
/// result set is a valid outcome for every operation; `NotFound` is
/// reserved for a missing/uninitialized collection.
#[async_trait::async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Past investigation cases similar to a free-text description.
    async fn query_similar_cases(&self, query: &str, limit: usize)
        -> Result<Vec<EvidenceRecord>>;

    /// Known fraud typologies matching observed indicators.
    async fn search_fraud_patterns(
        &self,
        indicators: &str,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>>;

    /// Customers with similar profiles (semantic search).
    async fn search_similar_profiles(
        &self,
        description: &str,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>>;

    /// Exact KYC lookup; zero matches is not an error.
    async fn fetch_kyc_profile(&self, customer_id: &str) -> Result<Vec<EvidenceRecord>>;

    /// Exact transaction lookup; zero matches is not an error.
    async fn get_transaction(&self, transaction_id: &str) -> Result<Vec<EvidenceRecord>>;

    /// Aggregated transaction history for a customer over a day window.
    async fn transaction_history(
        &self,
        customer_id: &str,
        days_back: u32,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>>;

    /// Security events for a customer within an hour window, most recent
    /// first.
    async fn query_siem_events(
        &self,
        customer_id: &str,
        hours_back: u32,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>>;
}

/// Seeded in-memory store for tests and the demo binary.
///
/// Collections are `None` until seeded when constructed with
/// [`InMemoryEvidenceStore::uninitialized`], which models a vector index
/// that was never built.
pub struct InMemoryEvidenceStore {
    cases: Option<Vec<EvidenceRecord>>,
    patterns: Option<Vec<EvidenceRecord>>,
    profiles: Option<Vec<EvidenceRecord>>,
    siem_events: Option<Vec<EvidenceRecord>>,
    transactions: Option<Vec<EvidenceRecord>>,
    histories: Option<Vec<EvidenceRecord>>,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self {
            cases: Some(Vec::new()),
            patterns: Some(Vec::new()),
            profiles: Some(Vec::new()),
            siem_events: Some(Vec::new()),
            transactions: Some(Vec::new()),
            histories: Some(Vec::new()),
        }
    }

    /// A store whose collections were never initialized; every query
    /// fails with `NotFound`.
    pub fn uninitialized() -> Self {
        Self {
            cases: None,
            patterns: None,
            profiles: None,
            siem_events: None,
            transactions: None,
            histories: None,
        }
    }

    pub fn with_case(mut self, record: EvidenceRecord) -> Self {
        self.cases.get_or_insert_with(Vec::new).push(record);
        self
    }

    pub fn with_pattern(mut self, record: EvidenceRecord) -> Self {
        self.patterns.get_or_insert_with(Vec::new).push(record);
        self
    }

    pub fn with_profile(mut self, record: EvidenceRecord) -> Self {
        self.profiles.get_or_insert_with(Vec::new).push(record);
        self
    }

    pub fn with_siem_event(mut self, record: EvidenceRecord) -> Self {
        self.siem_events.get_or_insert_with(Vec::new).push(record);
        self
    }

    pub fn with_transaction(mut self, record: EvidenceRecord) -> Self {
        self.transactions.get_or_insert_with(Vec::new).push(record);
        self
    }

    pub fn with_history(mut self, record: EvidenceRecord) -> Self {
        self.histories.get_or_insert_with(Vec::new).push(record);
        self
    }

    fn collection<'a>(
        field: &'a Option<Vec<EvidenceRecord>>,
        name: &str,
    ) -> Result<&'a Vec<EvidenceRecord>> {
        field
            .as_ref()
            .ok_or_else(|| crate::error::AgentError::NotFound(name.to_string()))
    }

    /// Descending score order, stable on ties (sort_by is stable, so
    /// insertion order is preserved for equal scores).
    fn ranked(records: &[EvidenceRecord], limit: usize) -> Vec<EvidenceRecord> {
        let mut ranked: Vec<EvidenceRecord> = records.to_vec();
        ranked.sort_by(|a, b| {
            let sa = a.score().unwrap_or(0.0);
            let sb = b.score().unwrap_or(0.0);
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(limit);
        ranked
    }
}

impl Default for InMemoryEvidenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EvidenceStore for InMemoryEvidenceStore {
    async fn query_similar_cases(
        &self,
        _query: &str,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>> {
        let cases = Self::collection(&self.cases, "investigation_cases")?;
        Ok(Self::ranked(cases, limit))
    }

    async fn search_fraud_patterns(
        &self,
        _indicators: &str,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>> {
        let patterns = Self::collection(&self.patterns, "fraud_patterns")?;
        Ok(Self::ranked(patterns, limit))
    }

    async fn search_similar_profiles(
        &self,
        _description: &str,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>> {
        let profiles = Self::collection(&self.profiles, "kyc_profiles")?;
        Ok(Self::ranked(profiles, limit))
    }

    async fn fetch_kyc_profile(&self, customer_id: &str) -> Result<Vec<EvidenceRecord>> {
        let profiles = Self::collection(&self.profiles, "kyc_profiles")?;

        Ok(profiles
            .iter()
            .filter_map(|record| match record {
                EvidenceRecord::Profile {
                    customer_id: id, ..
                } if id == customer_id => {
                    // Exact lookups carry no similarity score.
                    let mut exact = record.clone();
                    if let EvidenceRecord::Profile { similarity, .. } = &mut exact {
                        *similarity = None;
                    }
                    Some(exact)
                }
                _ => None,
            })
            .collect())
    }

    async fn get_transaction(&self, transaction_id: &str) -> Result<Vec<EvidenceRecord>> {
        let transactions = Self::collection(&self.transactions, "transactions")?;

        Ok(transactions
            .iter()
            .filter(|record| {
                matches!(record, EvidenceRecord::Transaction { transaction_id: id, .. } if id == transaction_id)
            })
            .cloned()
            .collect())
    }

    async fn transaction_history(
        &self,
        customer_id: &str,
        days_back: u32,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>> {
        let histories = Self::collection(&self.histories, "transactions")?;

        Ok(histories
            .iter()
            .filter_map(|record| match record {
                EvidenceRecord::TransactionHistory {
                    customer_id: id, ..
                } if id == customer_id => {
                    let mut scoped = record.clone();
                    if let EvidenceRecord::TransactionHistory { window_days, .. } = &mut scoped {
                        *window_days = days_back;
                    }
                    Some(scoped)
                }
                _ => None,
            })
            .take(limit)
            .collect())
    }

    async fn query_siem_events(
        &self,
        customer_id: &str,
        hours_back: u32,
        limit: usize,
    ) -> Result<Vec<EvidenceRecord>> {
        let events = Self::collection(&self.siem_events, "siem_logs")?;
        let cutoff = Utc::now() - Duration::hours(i64::from(hours_back));

        let mut matching: Vec<EvidenceRecord> = events
            .iter()
            .filter(|record| match record {
                EvidenceRecord::SiemEvent {
                    customer_id: id,
                    timestamp,
                    ..
                } => id == customer_id && *timestamp >= cutoff,
                _ => false,
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| match (a, b) {
            (
                EvidenceRecord::SiemEvent { timestamp: ta, .. },
                EvidenceRecord::SiemEvent { timestamp: tb, .. },
            ) => tb.cmp(ta),
            _ => std::cmp::Ordering::Equal,
        });
        matching.truncate(limit);

        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: &str, similarity: f64) -> EvidenceRecord {
        EvidenceRecord::Case {
            case_id: id.to_string(),
            fraud_type: "card_not_present".to_string(),
            status: "confirmed".to_string(),
            summary: "High-velocity card-not-present charges".to_string(),
            similarity,
        }
    }

    #[tokio::test]
    async fn similar_cases_are_ranked_descending() {
        let store = InMemoryEvidenceStore::new()
            .with_case(case("CASE-B", 0.3))
            .with_case(case("CASE-A", 0.91));

        let results = store
            .query_similar_cases("card-not-present, high-velocity", 5)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].score(), Some(0.91));
        assert_eq!(results[1].score(), Some(0.3));
    }

    #[tokio::test]
    async fn repeated_queries_return_identical_results() {
        let store = InMemoryEvidenceStore::new()
            .with_case(case("CASE-A", 0.7))
            .with_case(case("CASE-B", 0.7))
            .with_case(case("CASE-C", 0.2));

        let first = store.query_similar_cases("velocity", 5).await.unwrap();
        let second = store.query_similar_cases("velocity", 5).await.unwrap();

        assert_eq!(first, second);
        // Equal scores keep insertion order.
        assert!(matches!(
            &first[0],
            EvidenceRecord::Case { case_id, .. } if case_id == "CASE-A"
        ));
    }

    #[tokio::test]
    async fn missing_profile_returns_empty_not_error() {
        let store = InMemoryEvidenceStore::new();
        let results = store.fetch_kyc_profile("CUST-MISSING").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn uninitialized_collection_is_not_found() {
        let store = InMemoryEvidenceStore::uninitialized();
        let err = store.query_similar_cases("anything", 5).await.unwrap_err();
        assert!(matches!(err, crate::error::AgentError::NotFound(_)));
    }

    #[tokio::test]
    async fn exact_profile_lookup_drops_similarity() {
        let store = InMemoryEvidenceStore::new().with_profile(EvidenceRecord::Profile {
            customer_id: "CUST-001".to_string(),
            risk_score: 72,
            risk_level: "High".to_string(),
            country: "NG".to_string(),
            account_type: "personal".to_string(),
            account_age_days: 40,
            summary: "New account, many devices".to_string(),
            similarity: Some(0.88),
        });

        let results = store.fetch_kyc_profile("CUST-001").await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            &results[0],
            EvidenceRecord::Profile { similarity: None, .. }
        ));
    }
}
