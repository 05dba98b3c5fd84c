use fraud_investigation_agent::{
    api::start_server,
    audit::BriefArchive,
    config::AgentConfig,
    driver::{GeminiDriver, ReasoningDriver},
    investigation::InvestigationLoop,
    store::{EvidenceStore, HttpEvidenceStore, InMemoryEvidenceStore},
    tools::ToolRegistry,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!("GEMINI_API_KEY not set in .env, using mock key");
        "mock_key".to_string()
    });

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("Fraud Investigation Agent - API Server");
    info!(port = api_port, "Starting");

    let config = AgentConfig::from_env()?;

    let driver: Arc<dyn ReasoningDriver> =
        Arc::new(GeminiDriver::new(gemini_api_key, config.model.clone())?);

    // Remote evidence service when configured, empty in-memory store
    // otherwise.
    let store: Arc<dyn EvidenceStore> = match HttpEvidenceStore::from_env() {
        Some(store) => {
            info!("Using remote evidence service");
            Arc::new(store)
        }
        None => {
            info!("EVIDENCE_API_BASE_URL not set, using empty in-memory store");
            Arc::new(InMemoryEvidenceStore::new())
        }
    };

    let registry = Arc::new(ToolRegistry::new(store));
    let archive = Arc::new(BriefArchive::new());
    let investigator = Arc::new(InvestigationLoop::new(
        driver,
        registry,
        archive.clone(),
        config,
    ));

    info!("Investigation loop initialized");

    start_server(investigator, archive, api_port).await?;

    Ok(())
}
