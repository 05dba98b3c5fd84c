//! Core data models for the fraud investigation agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

/// Final recommendation for a completed investigation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecommendationBand {
    Escalate,
    Verify,
    Monitor,
    Dismiss,
}

/// States of one investigation run. Transitions are driven exclusively by
/// the investigation loop; logged on every change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Started,
    Reasoning,
    Acting,
    Observing,
    Concluding,
    Finished,
    Aborted,
}

//
// ================= Alert =================
//

/// Input signal identifying a transaction requiring investigation.
/// Created externally; read-only for the duration of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: Uuid,
    pub transaction_id: String,
    pub description: String,
    /// Initial fraud probability from the upstream scoring model.
    pub initial_risk_score: f64,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(transaction_id: impl Into<String>, description: impl Into<String>, initial_risk_score: f64) -> Self {
        Self {
            alert_id: Uuid::new_v4(),
            transaction_id: transaction_id.into(),
            description: description.into(),
            initial_risk_score,
            created_at: Utc::now(),
        }
    }
}

//
// ================= Evidence =================
//

/// A normalized unit of information returned by any evidence source.
/// Immutable once returned by the tool registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum EvidenceRecord {
    Case {
        case_id: String,
        fraud_type: String,
        status: String,
        summary: String,
        similarity: f64,
    },
    Pattern {
        name: String,
        risk_level: String,
        description: String,
        match_score: f64,
    },
    Profile {
        customer_id: String,
        risk_score: u32,
        risk_level: String,
        country: String,
        account_type: String,
        account_age_days: u32,
        summary: String,
        /// Set for similarity-search results, absent for exact lookups.
        similarity: Option<f64>,
    },
    SiemEvent {
        event_id: String,
        timestamp: DateTime<Utc>,
        event_type: String,
        severity: String,
        customer_id: String,
        device_id: String,
        ip_address: String,
        details: String,
    },
    Transaction {
        transaction_id: String,
        amount: f64,
        timestamp: DateTime<Utc>,
        hour: u8,
        is_night: bool,
        is_weekend: bool,
        amount_zscore: f64,
    },
    TransactionHistory {
        customer_id: String,
        window_days: u32,
        transaction_count: u64,
        total_amount: f64,
        avg_amount: f64,
        night_count: u64,
        weekend_count: u64,
    },
    /// Recoverable evidence-source failure, recorded so the run can
    /// continue with partial information.
    ToolError { tool: String, message: String },
}

impl EvidenceRecord {
    /// Score used for ranking similarity-search results, if this variant
    /// carries one.
    pub fn score(&self) -> Option<f64> {
        match self {
            EvidenceRecord::Case { similarity, .. } => Some(*similarity),
            EvidenceRecord::Pattern { match_score, .. } => Some(*match_score),
            EvidenceRecord::Profile { similarity, .. } => *similarity,
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EvidenceRecord::ToolError { .. })
    }
}

//
// ================= Tool Call =================
//

/// A model-issued tool invocation: tool name plus a flat argument map of
/// string keys to string/number values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

//
// ================= Transcript =================
//

/// One entry in the investigation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEntry {
    AlertReceived {
        turn: u32,
        alert: Alert,
    },
    Decision {
        turn: u32,
        call: ToolCall,
        rationale: String,
    },
    Observation {
        turn: u32,
        tool: String,
        records: Vec<EvidenceRecord>,
        elapsed_ms: u64,
    },
    Concluded {
        turn: u32,
        confidence: f64,
        rationale: String,
    },
}

impl TranscriptEntry {
    pub fn turn(&self) -> u32 {
        match self {
            TranscriptEntry::AlertReceived { turn, .. }
            | TranscriptEntry::Decision { turn, .. }
            | TranscriptEntry::Observation { turn, .. }
            | TranscriptEntry::Concluded { turn, .. } => *turn,
        }
    }
}

/// Append-only ordered history of one investigation run.
///
/// Owned exclusively by its run; entries are never mutated or removed, and
/// turn indices increase strictly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_turn: u32,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, assigning it the next turn index.
    pub fn push(&mut self, build: impl FnOnce(u32) -> TranscriptEntry) -> u32 {
        let turn = self.next_turn;
        self.next_turn += 1;
        self.entries.push(build(turn));
        turn
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tool invocations recorded so far.
    pub fn tool_call_count(&self) -> u32 {
        self.entries
            .iter()
            .filter(|e| matches!(e, TranscriptEntry::Observation { .. }))
            .count() as u32
    }

    /// All evidence gathered so far, in observation order.
    pub fn evidence(&self) -> Vec<EvidenceRecord> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                TranscriptEntry::Observation { records, .. } => Some(records.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// The alert this transcript was opened with, if present.
    pub fn alert(&self) -> Option<&Alert> {
        self.entries.iter().find_map(|e| match e {
            TranscriptEntry::AlertReceived { alert, .. } => Some(alert),
            _ => None,
        })
    }
}

//
// ================= Investigation Brief =================
//

/// The final persisted output of a completed run. Immutable after
/// creation; exactly one brief is produced per non-aborted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationBrief {
    pub brief_id: Uuid,
    pub alert: Alert,
    pub transcript: Transcript,
    /// Transcript observations flattened into a single evidence list.
    pub evidence: Vec<EvidenceRecord>,
    pub confidence: f64,
    pub recommendation: RecommendationBand,
    /// Model-reported rationale for the conclusion.
    pub summary: String,
    pub tool_call_count: u32,
    pub duration_ms: u64,
    /// True when the run hit its turn budget and was forced to conclude.
    pub budget_exhausted: bool,
    /// SHA-256 over the serialized transcript, for audit integrity.
    pub transcript_hash: String,
    pub created_at: DateTime<Utc>,
}

//
// ================= Display =================
//

impl fmt::Display for RecommendationBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecommendationBand::Escalate => "ESCALATE",
            RecommendationBand::Verify => "VERIFY",
            RecommendationBand::Monitor => "MONITOR",
            RecommendationBand::Dismiss => "DISMISS",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Started => "started",
            RunState::Reasoning => "reasoning",
            RunState::Acting => "acting",
            RunState::Observing => "observing",
            RunState::Concluding => "concluding",
            RunState::Finished => "finished",
            RunState::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_turns_are_strictly_increasing() {
        let mut transcript = Transcript::new();
        let alert = Alert::new("TXN-001", "test alert", 0.5);

        let t0 = transcript.push(|turn| TranscriptEntry::AlertReceived { turn, alert });
        let t1 = transcript.push(|turn| TranscriptEntry::Observation {
            turn,
            tool: "get_transaction_details".to_string(),
            records: vec![],
            elapsed_ms: 3,
        });

        assert_eq!(t0, 0);
        assert_eq!(t1, 1);
        assert_eq!(transcript.len(), 2);
        assert!(transcript
            .entries()
            .windows(2)
            .all(|w| w[0].turn() < w[1].turn()));
    }

    #[test]
    fn evidence_flattens_observations_in_order() {
        let mut transcript = Transcript::new();
        transcript.push(|turn| TranscriptEntry::Observation {
            turn,
            tool: "search_fraud_patterns".to_string(),
            records: vec![EvidenceRecord::Pattern {
                name: "card_testing".to_string(),
                risk_level: "High".to_string(),
                description: "Rapid small authorizations".to_string(),
                match_score: 0.8,
            }],
            elapsed_ms: 1,
        });
        transcript.push(|turn| TranscriptEntry::Observation {
            turn,
            tool: "fetch_kyc_profile".to_string(),
            records: vec![EvidenceRecord::ToolError {
                tool: "fetch_kyc_profile".to_string(),
                message: "store unavailable".to_string(),
            }],
            elapsed_ms: 1,
        });

        let evidence = transcript.evidence();
        assert_eq!(evidence.len(), 2);
        assert!(evidence[0].score().is_some());
        assert!(evidence[1].is_error());
        assert_eq!(transcript.tool_call_count(), 2);
    }

    #[test]
    fn evidence_record_serializes_with_source_tag() {
        let record = EvidenceRecord::Case {
            case_id: "CASE-42".to_string(),
            fraud_type: "account_takeover".to_string(),
            status: "confirmed".to_string(),
            summary: "Password reset then transfer".to_string(),
            similarity: 0.91,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source"], "case");
        assert_eq!(json["similarity"], 0.91);
    }
}
