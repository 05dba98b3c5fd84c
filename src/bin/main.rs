use fraud_investigation_agent::{
    audit::{BriefArchive, BriefSink, JsonFileSink},
    config::AgentConfig,
    driver::{Decision, GeminiDriver, MockDriver, ReasoningDriver},
    investigation::InvestigationLoop,
    models::{Alert, EvidenceRecord, ToolCall},
    store::InMemoryEvidenceStore,
    tools::ToolRegistry,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    dotenv::dotenv().ok();

    info!("Fraud Investigation Agent starting");

    let config = AgentConfig::from_env()?;

    // Live driver when an API key is present, otherwise a scripted one so
    // the demo runs offline.
    let driver: Arc<dyn ReasoningDriver> = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            info!(model = %config.model, "Using Gemini reasoning driver");
            Arc::new(GeminiDriver::new(key, config.model.clone())?)
        }
        _ => {
            info!("GEMINI_API_KEY not set, using scripted driver");
            Arc::new(MockDriver::new(demo_script()))
        }
    };

    let registry = Arc::new(ToolRegistry::new(Arc::new(demo_store())));
    let archive = Arc::new(BriefArchive::new());
    let file_sink = JsonFileSink::new("investigation_results");

    let investigator = InvestigationLoop::new(driver, registry, archive, config);

    let alerts = vec![
        Alert::new(
            "TXN-20241106-001",
            "Transfer of $8,500 at 03:12 local time, 4.2 standard deviations above \
             the customer's mean, destination account opened 11 days ago",
            0.82,
        ),
        Alert::new(
            "TXN-20241106-002",
            "Recurring subscription charge of $14.99, matches established pattern",
            0.12,
        ),
    ];

    for alert in alerts {
        let transaction_id = alert.transaction_id.clone();
        match investigator.run(alert).await {
            Ok(brief) => {
                file_sink.save(&brief).await?;

                println!("\n=== INVESTIGATION BRIEF ===");
                println!("Transaction:    {}", brief.alert.transaction_id);
                println!("Recommendation: {}", brief.recommendation);
                println!("Confidence:     {:.2}", brief.confidence);
                println!("Tool calls:     {}", brief.tool_call_count);
                if brief.budget_exhausted {
                    println!("Note:           turn budget exhausted");
                }
                println!("Summary:        {}", brief.summary);
            }
            Err(e) => {
                eprintln!("Investigation of {} failed: {}", transaction_id, e);
            }
        }
    }

    Ok(())
}

/// Fixture evidence covering the demo alerts.
fn demo_store() -> InMemoryEvidenceStore {
    InMemoryEvidenceStore::new()
        .with_transaction(EvidenceRecord::Transaction {
            transaction_id: "TXN-20241106-001".to_string(),
            amount: 8500.0,
            timestamp: Utc::now(),
            hour: 3,
            is_night: true,
            is_weekend: false,
            amount_zscore: 4.2,
        })
        .with_transaction(EvidenceRecord::Transaction {
            transaction_id: "TXN-20241106-002".to_string(),
            amount: 14.99,
            timestamp: Utc::now(),
            hour: 14,
            is_night: false,
            is_weekend: false,
            amount_zscore: -0.1,
        })
        .with_case(EvidenceRecord::Case {
            case_id: "CASE-2023-0412".to_string(),
            fraud_type: "account_takeover".to_string(),
            status: "confirmed".to_string(),
            summary: "Night-time transfer to a newly opened account after a password reset"
                .to_string(),
            similarity: 0.91,
        })
        .with_case(EvidenceRecord::Case {
            case_id: "CASE-2023-0098".to_string(),
            fraud_type: "friendly_fraud".to_string(),
            status: "dismissed".to_string(),
            summary: "Disputed subscription renewal, cardholder later confirmed".to_string(),
            similarity: 0.3,
        })
        .with_pattern(EvidenceRecord::Pattern {
            name: "mule_account_funnel".to_string(),
            risk_level: "High".to_string(),
            description: "Large transfers into recently opened receiving accounts".to_string(),
            match_score: 0.87,
        })
}

/// Scripted decisions for offline runs: inspect the transaction, compare
/// against past cases, then conclude.
fn demo_script() -> Vec<fraud_investigation_agent::Result<Decision>> {
    let tool = |name: &str, args: serde_json::Value| {
        Ok(Decision::CallTool {
            call: ToolCall {
                name: name.to_string(),
                arguments: args.as_object().cloned().unwrap_or_default(),
            },
            rationale: "scripted demo step".to_string(),
        })
    };

    vec![
        // First alert: high risk, two lookups then escalate.
        tool(
            "get_transaction_details",
            json!({ "transaction_id": "TXN-20241106-001" }),
        ),
        tool(
            "query_similar_cases",
            json!({ "description": "night-time transfer to new account" }),
        ),
        Ok(Decision::Conclude {
            confidence: 0.9,
            rationale: "Amount anomaly, night-time timing and a 0.91-similar confirmed \
                        account-takeover case support escalation."
                .to_string(),
        }),
        // Second alert: benign pattern, dismiss after one lookup.
        tool(
            "get_transaction_details",
            json!({ "transaction_id": "TXN-20241106-002" }),
        ),
        Ok(Decision::Conclude {
            confidence: 0.1,
            rationale: "Recurring low-value charge consistent with an established \
                        subscription."
                .to_string(),
        }),
    ]
}
