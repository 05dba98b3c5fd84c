//! Recommendation scorer
//!
//! Deterministic mapping from model-reported confidence to a
//! recommendation band, plus assembly of the final investigation brief.

use crate::audit::compute_transcript_hash;
use crate::config::ScoreThresholds;
use crate::error::AgentError;
use crate::models::{Alert, InvestigationBrief, RecommendationBand, Transcript};
use crate::Result;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// Map a confidence score onto its recommendation band.
///
/// Bands partition [0,1]; boundary values belong to the lower band
/// (exactly `escalate` maps to VERIFY, and so on). Anything outside
/// [0,1], including NaN, violates the model contract and fails with
/// `InvalidConfidence`.
pub fn score_to_band(confidence: f64, thresholds: &ScoreThresholds) -> Result<RecommendationBand> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(AgentError::InvalidConfidence(confidence));
    }

    let band = if confidence > thresholds.escalate {
        RecommendationBand::Escalate
    } else if confidence > thresholds.verify {
        RecommendationBand::Verify
    } else if confidence > thresholds.monitor {
        RecommendationBand::Monitor
    } else {
        RecommendationBand::Dismiss
    };

    Ok(band)
}

/// Builds the immutable brief from a finished run's transcript.
pub struct RecommendationScorer {
    thresholds: ScoreThresholds,
}

impl RecommendationScorer {
    pub fn new(thresholds: ScoreThresholds) -> Self {
        Self { thresholds }
    }

    pub fn assemble(
        &self,
        alert: &Alert,
        transcript: Transcript,
        confidence: f64,
        summary: String,
        duration_ms: u64,
        budget_exhausted: bool,
    ) -> Result<InvestigationBrief> {
        let recommendation = score_to_band(confidence, &self.thresholds)?;
        let evidence = transcript.evidence();
        let tool_call_count = transcript.tool_call_count();
        let transcript_hash = compute_transcript_hash(&transcript);

        info!(
            alert_id = %alert.alert_id,
            transaction_id = %alert.transaction_id,
            recommendation = %recommendation,
            confidence = confidence,
            tool_calls = tool_call_count,
            budget_exhausted = budget_exhausted,
            "Investigation brief assembled"
        );

        Ok(InvestigationBrief {
            brief_id: Uuid::new_v4(),
            alert: alert.clone(),
            transcript,
            evidence,
            confidence,
            recommendation,
            summary,
            tool_call_count,
            duration_ms,
            budget_exhausted,
            transcript_hash,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> ScoreThresholds {
        ScoreThresholds::default()
    }

    #[test]
    fn bands_partition_the_unit_interval() {
        let t = thresholds();
        assert_eq!(score_to_band(0.0, &t).unwrap(), RecommendationBand::Dismiss);
        assert_eq!(score_to_band(0.40, &t).unwrap(), RecommendationBand::Dismiss);
        assert_eq!(score_to_band(0.401, &t).unwrap(), RecommendationBand::Monitor);
        assert_eq!(score_to_band(0.60, &t).unwrap(), RecommendationBand::Monitor);
        assert_eq!(score_to_band(0.601, &t).unwrap(), RecommendationBand::Verify);
        assert_eq!(score_to_band(0.85, &t).unwrap(), RecommendationBand::Verify);
        assert_eq!(score_to_band(0.851, &t).unwrap(), RecommendationBand::Escalate);
        assert_eq!(score_to_band(1.0, &t).unwrap(), RecommendationBand::Escalate);
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let t = thresholds();
        assert!(matches!(
            score_to_band(-0.1, &t).unwrap_err(),
            AgentError::InvalidConfidence(_)
        ));
        assert!(matches!(
            score_to_band(1.1, &t).unwrap_err(),
            AgentError::InvalidConfidence(_)
        ));
        assert!(matches!(
            score_to_band(f64::NAN, &t).unwrap_err(),
            AgentError::InvalidConfidence(_)
        ));
    }

    #[test]
    fn custom_thresholds_are_honored() {
        let t = ScoreThresholds {
            escalate: 0.9,
            verify: 0.5,
            monitor: 0.2,
        };
        assert_eq!(score_to_band(0.86, &t).unwrap(), RecommendationBand::Verify);
        assert_eq!(score_to_band(0.91, &t).unwrap(), RecommendationBand::Escalate);
    }

    #[test]
    fn assemble_flattens_evidence_and_hashes_transcript() {
        use crate::models::{Alert, EvidenceRecord, TranscriptEntry};

        let alert = Alert::new("TXN-001", "odd transfer", 0.7);
        let mut transcript = Transcript::new();
        transcript.push(|turn| TranscriptEntry::AlertReceived {
            turn,
            alert: alert.clone(),
        });
        transcript.push(|turn| TranscriptEntry::Observation {
            turn,
            tool: "get_transaction_details".to_string(),
            records: vec![EvidenceRecord::Transaction {
                transaction_id: "TXN-001".to_string(),
                amount: 5000.0,
                timestamp: Utc::now(),
                hour: 3,
                is_night: true,
                is_weekend: false,
                amount_zscore: 4.2,
            }],
            elapsed_ms: 12,
        });

        let scorer = RecommendationScorer::new(thresholds());
        let brief = scorer
            .assemble(&alert, transcript, 0.9, "clear fraud".to_string(), 100, false)
            .unwrap();

        assert_eq!(brief.recommendation, RecommendationBand::Escalate);
        assert_eq!(brief.evidence.len(), 1);
        assert_eq!(brief.tool_call_count, 1);
        assert!(!brief.transcript_hash.is_empty());
    }
}
