//! Gemini-backed reasoning driver
//!
//! Sends the rendered transcript plus tool schemas to Gemini and parses
//! its structured reply into a [`Decision`].

use crate::error::AgentError;
use crate::gemini::GeminiClient;
use crate::models::{ToolCall, Transcript, TranscriptEntry};
use crate::Result;
use serde_json::Value;

use super::Decision;

const SYSTEM_PROMPT: &str = "\
You are an expert fraud investigation agent for a financial institution.

Your role:
1. Investigate the flagged transaction systematically using the available tools
2. Gather evidence from multiple data sources and cross-reference findings
3. Conclude with a confidence score once the evidence is sufficient

Investigation guidance:
- Start by examining the flagged transaction details
- Check the customer's KYC profile and risk level
- Review security events (SIEM logs) for suspicious activity
- Search for similar past cases and match known fraud patterns
- Be thorough but efficient: aim for 3-5 tool calls per investigation
- Do not call the same tool repeatedly with similar inputs

You must reply with exactly one JSON object and nothing else, in one of
two forms:

To gather more evidence:
{\"action\": \"call_tool\", \"tool\": \"<tool name>\", \"arguments\": { ... }, \"rationale\": \"<why>\"}

To finish the investigation:
{\"action\": \"conclude\", \"confidence\": <0.0-1.0>, \"rationale\": \"<evidence-based summary and reasoning>\"}";

pub struct GeminiDriver {
    client: GeminiClient,
}

impl GeminiDriver {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(api_key, model)?,
        })
    }

    fn build_prompt(
        transcript: &Transcript,
        tool_schemas: &[Value],
        corrective: Option<&str>,
    ) -> String {
        let mut prompt = String::new();

        if let Some(parse_error) = corrective {
            prompt.push_str(&format!(
                "Your previous reply could not be parsed ({}). Reply again with \
                 exactly one valid JSON object in the required format.\n\n",
                parse_error
            ));
        }

        prompt.push_str("Available tools:\n");
        for schema in tool_schemas {
            prompt.push_str(&format!("{}\n", schema));
        }

        prompt.push_str("\nInvestigation transcript so far:\n");
        prompt.push_str(&render_transcript(transcript));
        prompt.push_str("\nDecide your next step now.");

        prompt
    }
}

/// Flatten the transcript into the textual history sent to the model.
fn render_transcript(transcript: &Transcript) -> String {
    let mut out = String::new();

    for entry in transcript.entries() {
        match entry {
            TranscriptEntry::AlertReceived { alert, .. } => {
                out.push_str(&format!(
                    "[turn {}] ALERT transaction={} risk={:.2}: {}\n",
                    entry.turn(),
                    alert.transaction_id,
                    alert.initial_risk_score,
                    alert.description
                ));
            }
            TranscriptEntry::Decision { call, rationale, .. } => {
                out.push_str(&format!(
                    "[turn {}] CALLED {} args={} ({})\n",
                    entry.turn(),
                    call.name,
                    Value::Object(call.arguments.clone()),
                    rationale
                ));
            }
            TranscriptEntry::Observation { tool, records, .. } => {
                out.push_str(&format!(
                    "[turn {}] RESULT {} ({} record(s)):\n",
                    entry.turn(),
                    tool,
                    records.len()
                ));
                for record in records {
                    let line = serde_json::to_string(record)
                        .unwrap_or_else(|_| "<unserializable record>".to_string());
                    out.push_str(&format!("  {}\n", line));
                }
            }
            TranscriptEntry::Concluded {
                confidence,
                rationale,
                ..
            } => {
                out.push_str(&format!(
                    "[turn {}] CONCLUDED confidence={:.2}: {}\n",
                    entry.turn(),
                    confidence,
                    rationale
                ));
            }
        }
    }

    out
}

/// Parse the model's raw reply into a decision.
///
/// Tolerates a ```json fence around the object but nothing else; any
/// structural problem is a `MalformedResponse`.
pub fn parse_decision(raw: &str) -> Result<Decision> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let json: Value = serde_json::from_str(cleaned).map_err(|e| {
        AgentError::MalformedResponse(format!("not valid JSON: {} | raw={}", e, raw))
    })?;

    let action = json
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::MalformedResponse("missing 'action' field".to_string()))?;

    match action {
        "call_tool" => {
            let tool = json
                .get("tool")
                .and_then(Value::as_str)
                .ok_or_else(|| AgentError::MalformedResponse("missing 'tool' field".to_string()))?
                .to_string();

            let arguments = match json.get("arguments") {
                None => serde_json::Map::new(),
                Some(Value::Object(map)) => map.clone(),
                Some(other) => {
                    return Err(AgentError::MalformedResponse(format!(
                        "'arguments' is not an object: {}",
                        other
                    )))
                }
            };

            let rationale = json
                .get("rationale")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            Ok(Decision::CallTool {
                call: ToolCall {
                    name: tool,
                    arguments,
                },
                rationale,
            })
        }
        "conclude" => {
            let confidence = json.get("confidence").and_then(Value::as_f64).ok_or_else(|| {
                AgentError::MalformedResponse("conclusion without a parsable confidence".to_string())
            })?;

            let rationale = json
                .get("rationale")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            Ok(Decision::Conclude {
                confidence,
                rationale,
            })
        }
        other => Err(AgentError::MalformedResponse(format!(
            "unknown action '{}'",
            other
        ))),
    }
}

#[async_trait::async_trait]
impl super::ReasoningDriver for GeminiDriver {
    async fn decide(
        &self,
        transcript: &Transcript,
        tool_schemas: &[Value],
        corrective: Option<&str>,
    ) -> Result<Decision> {
        let prompt = Self::build_prompt(transcript, tool_schemas, corrective);
        let raw = self.client.generate(SYSTEM_PROMPT, &prompt).await?;
        parse_decision(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Alert;

    #[test]
    fn parses_tool_call_decision() {
        let decision = parse_decision(
            r#"{"action": "call_tool", "tool": "fetch_kyc_profile",
                "arguments": {"customer_id": "CUST-1"},
                "rationale": "check customer risk"}"#,
        )
        .unwrap();

        match decision {
            Decision::CallTool { call, rationale } => {
                assert_eq!(call.name, "fetch_kyc_profile");
                assert_eq!(call.arguments["customer_id"], "CUST-1");
                assert_eq!(rationale, "check customer risk");
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn parses_fenced_conclusion() {
        let decision = parse_decision(
            "```json\n{\"action\": \"conclude\", \"confidence\": 0.9, \"rationale\": \"strong evidence\"}\n```",
        )
        .unwrap();

        assert_eq!(
            decision,
            Decision::Conclude {
                confidence: 0.9,
                rationale: "strong evidence".to_string()
            }
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse_decision("I think we should escalate this one.").unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse(_)));
    }

    #[test]
    fn conclusion_without_confidence_is_malformed() {
        let err =
            parse_decision(r#"{"action": "conclude", "rationale": "looks fine"}"#).unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse(_)));
    }

    #[test]
    fn unknown_action_is_malformed() {
        let err = parse_decision(r#"{"action": "ponder"}"#).unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse(_)));
    }

    #[test]
    fn prompt_includes_alert_and_tools() {
        let mut transcript = Transcript::new();
        let alert = Alert::new("TXN-001", "large 3 AM transfer from new device", 0.85);
        transcript.push(|turn| crate::models::TranscriptEntry::AlertReceived { turn, alert });

        let schemas = vec![serde_json::json!({ "name": "fetch_kyc_profile" })];
        let prompt = GeminiDriver::build_prompt(&transcript, &schemas, None);

        assert!(prompt.contains("TXN-001"));
        assert!(prompt.contains("fetch_kyc_profile"));
        assert!(!prompt.contains("could not be parsed"));

        let corrective = GeminiDriver::build_prompt(&transcript, &schemas, Some("not valid JSON"));
        assert!(corrective.contains("could not be parsed"));
    }
}
