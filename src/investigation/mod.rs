//! Investigation loop - the core state machine
//!
//! Started -> Reasoning -> (Acting -> Observing -> Reasoning)* ->
//! Concluding -> Finished, with a terminal Aborted state for driver-side
//! failures that survive the retry budget.
//!
//! One run owns one transcript; the only suspension points are the driver
//! call and the tool call, both bounded by per-call timeouts. Runs share
//! nothing mutable, so concurrent investigations (and cancellation by
//! dropping the run future) are safe by construction.

use crate::audit::BriefSink;
use crate::config::AgentConfig;
use crate::driver::{Decision, ReasoningDriver};
use crate::error::AgentError;
use crate::models::{Alert, InvestigationBrief, RunState, Transcript, TranscriptEntry};
use crate::scorer::RecommendationScorer;
use crate::tools::ToolRegistry;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Orchestrates one reasoning/acting/observing cycle per alert until the
/// driver concludes, the turn budget runs out, or a fatal error aborts
/// the run.
pub struct InvestigationLoop {
    driver: Arc<dyn ReasoningDriver>,
    registry: Arc<ToolRegistry>,
    sink: Arc<dyn BriefSink>,
    scorer: RecommendationScorer,
    config: AgentConfig,
}

impl InvestigationLoop {
    pub fn new(
        driver: Arc<dyn ReasoningDriver>,
        registry: Arc<ToolRegistry>,
        sink: Arc<dyn BriefSink>,
        config: AgentConfig,
    ) -> Self {
        let scorer = RecommendationScorer::new(config.thresholds);
        Self {
            driver,
            registry,
            sink,
            scorer,
            config,
        }
    }

    /// Run one investigation to completion.
    ///
    /// Every run yields exactly one brief or one typed error; on abort the
    /// partial transcript is logged for diagnosis, never persisted as a
    /// brief.
    pub async fn run(&self, alert: Alert) -> Result<InvestigationBrief> {
        let start = Instant::now();
        let mut state = RunState::Started;
        let mut transcript = Transcript::new();

        info!(
            alert_id = %alert.alert_id,
            transaction_id = %alert.transaction_id,
            risk = alert.initial_risk_score,
            state = %state,
            "Investigation started"
        );

        transcript.push(|turn| TranscriptEntry::AlertReceived {
            turn,
            alert: alert.clone(),
        });

        let tool_schemas = self.registry.schemas();
        let mut cycles: u32 = 0;

        let conclusion = loop {
            if cycles >= self.config.max_turns {
                // Budget exhausted: conclude with what we have instead of
                // discarding the investigation. The alert's initial risk
                // signal stands in for the missing model confidence.
                warn!(
                    alert_id = %alert.alert_id,
                    max_turns = self.config.max_turns,
                    "Turn budget exhausted, forcing conclusion"
                );
                // The upstream risk signal is unconstrained; clamp it
                // into the confidence domain so exhaustion always yields
                // a brief.
                let confidence = if alert.initial_risk_score.is_finite() {
                    alert.initial_risk_score.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                break Conclusion {
                    confidence,
                    summary: format!(
                        "Investigation reached the {}-turn budget before the model \
                         concluded; recommendation derived from the initial risk signal \
                         and {} gathered evidence record(s).",
                        self.config.max_turns,
                        transcript.evidence().len()
                    ),
                    budget_exhausted: true,
                };
            }
            cycles += 1;

            state = RunState::Reasoning;
            debug!(alert_id = %alert.alert_id, cycle = cycles, state = %state, "Reasoning");

            let decision = match self.decide(&transcript, &tool_schemas).await {
                Ok(decision) => decision,
                Err(e) => {
                    state = RunState::Aborted;
                    warn!(
                        alert_id = %alert.alert_id,
                        error = %e,
                        state = %state,
                        transcript_len = transcript.len(),
                        "Investigation aborted in reasoning"
                    );
                    return Err(e);
                }
            };

            match decision {
                Decision::Conclude {
                    confidence,
                    rationale,
                } => {
                    transcript.push(|turn| TranscriptEntry::Concluded {
                        turn,
                        confidence,
                        rationale: rationale.clone(),
                    });
                    break Conclusion {
                        confidence,
                        summary: rationale,
                        budget_exhausted: false,
                    };
                }
                Decision::CallTool { call, rationale } => {
                    state = RunState::Acting;
                    debug!(
                        alert_id = %alert.alert_id,
                        tool = %call.name,
                        state = %state,
                        "Invoking tool"
                    );

                    transcript.push(|turn| TranscriptEntry::Decision {
                        turn,
                        call: call.clone(),
                        rationale,
                    });

                    let tool_start = Instant::now();
                    let records = match timeout(
                        self.config.tool_timeout,
                        self.registry.invoke(&call),
                    )
                    .await
                    {
                        Err(_elapsed) => {
                            warn!(alert_id = %alert.alert_id, tool = %call.name, "Tool call timed out");
                            vec![crate::models::EvidenceRecord::ToolError {
                                tool: call.name.clone(),
                                message: format!(
                                    "timed out after {:?}",
                                    self.config.tool_timeout
                                ),
                            }]
                        }
                        Ok(Ok(records)) => records,
                        // A missing evidence collection can never yield
                        // evidence; surface it immediately.
                        Ok(Err(e @ AgentError::NotFound(_))) => {
                            state = RunState::Aborted;
                            warn!(
                                alert_id = %alert.alert_id,
                                error = %e,
                                state = %state,
                                transcript_len = transcript.len(),
                                "Investigation aborted: evidence collection missing"
                            );
                            return Err(e);
                        }
                        // Schema violations by the model are surfaced to it
                        // as an error observation; the run continues.
                        Ok(Err(e)) => {
                            warn!(alert_id = %alert.alert_id, tool = %call.name, error = %e, "Tool call rejected");
                            vec![crate::models::EvidenceRecord::ToolError {
                                tool: call.name.clone(),
                                message: e.to_string(),
                            }]
                        }
                    };

                    state = RunState::Observing;
                    let elapsed_ms = tool_start.elapsed().as_millis() as u64;
                    debug!(
                        alert_id = %alert.alert_id,
                        tool = %call.name,
                        records = records.len(),
                        elapsed_ms,
                        state = %state,
                        "Observation recorded"
                    );
                    transcript.push(|turn| TranscriptEntry::Observation {
                        turn,
                        tool: call.name.clone(),
                        records,
                        elapsed_ms,
                    });
                }
            }
        };

        state = RunState::Concluding;
        debug!(alert_id = %alert.alert_id, state = %state, "Concluding");

        let brief = match self.scorer.assemble(
            &alert,
            transcript,
            conclusion.confidence,
            conclusion.summary,
            start.elapsed().as_millis() as u64,
            conclusion.budget_exhausted,
        ) {
            Ok(brief) => brief,
            Err(e) => {
                state = RunState::Aborted;
                warn!(
                    alert_id = %alert.alert_id,
                    error = %e,
                    state = %state,
                    "Investigation aborted: invalid conclusion"
                );
                return Err(e);
            }
        };

        self.sink.save(&brief).await?;

        state = RunState::Finished;
        info!(
            alert_id = %alert.alert_id,
            brief_id = %brief.brief_id,
            recommendation = %brief.recommendation,
            duration_ms = brief.duration_ms,
            state = %state,
            "Investigation finished"
        );

        Ok(brief)
    }

    /// One reasoning step with the full driver retry policy applied.
    ///
    /// Malformed output gets a single corrective retry before the driver
    /// is declared unavailable; rate limiting and transient failures are
    /// retried with exponential backoff up to the configured budget.
    async fn decide(&self, transcript: &Transcript, tool_schemas: &[serde_json::Value]) -> Result<Decision> {
        let mut corrective: Option<String> = None;
        let mut malformed_seen = false;
        let mut transient_attempts: u32 = 0;

        loop {
            let attempt = timeout(
                self.config.driver_timeout,
                self.driver
                    .decide(transcript, tool_schemas, corrective.as_deref()),
            )
            .await
            .unwrap_or_else(|_elapsed| {
                Err(AgentError::TransientApiError(format!(
                    "driver timed out after {:?}",
                    self.config.driver_timeout
                )))
            });

            match attempt {
                Ok(decision) => return Ok(decision),
                Err(AgentError::MalformedResponse(detail)) => {
                    if malformed_seen {
                        return Err(AgentError::DriverUnavailable(format!(
                            "model output unparsable after corrective retry: {}",
                            detail
                        )));
                    }
                    warn!(error = %detail, "Malformed model response, retrying with corrective prompt");
                    malformed_seen = true;
                    corrective = Some(detail);
                }
                Err(e) if e.is_retryable() => {
                    if transient_attempts >= self.config.driver_retries {
                        return Err(e);
                    }
                    let delay = backoff_delay(self.config.retry_base_delay, transient_attempts);
                    warn!(
                        error = %e,
                        attempt = transient_attempts + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Transient driver failure, backing off"
                    );
                    transient_attempts += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

struct Conclusion {
    confidence: f64,
    summary: String,
    budget_exhausted: bool,
}

/// Exponential backoff with the exponent capped so large retry budgets
/// cannot overflow the multiplier.
fn backoff_delay(base: std::time::Duration, attempt: u32) -> std::time::Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.min(16)))
}
