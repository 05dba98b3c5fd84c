//! Fraud Investigation Agent
//!
//! An autonomous control loop for fraud alert triage:
//! - Receives alerts flagged by an upstream scoring model
//! - Reasons about each alert with an LLM-backed driver
//! - Gathers evidence through a fixed registry of query tools
//! - Maps the model's final confidence onto an analyst recommendation
//! - Persists an auditable brief for every completed run
//!
//! RUN LIFECYCLE:
//! STARTED -> REASONING -> (ACTING -> OBSERVING -> REASONING)* -> CONCLUDING -> FINISHED

pub mod api;
pub mod audit;
pub mod config;
pub mod driver;
pub mod error;
pub mod gemini;
pub mod investigation;
pub mod models;
pub mod scorer;
pub mod store;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use config::{AgentConfig, ScoreThresholds};
pub use investigation::InvestigationLoop;
