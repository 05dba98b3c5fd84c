//! Reasoning driver
//!
//! Wraps the language model behind a single decision function: given the
//! running transcript and the registered tool schemas, the driver either
//! selects the next tool call or declares the investigation complete. The
//! driver never mutates the transcript it is given.

use crate::models::{ToolCall, Transcript};
use crate::Result;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

pub mod gemini;
pub use gemini::GeminiDriver;

/// Closed set of outcomes a reasoning step can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    CallTool { call: ToolCall, rationale: String },
    Conclude { confidence: f64, rationale: String },
}

#[async_trait::async_trait]
pub trait ReasoningDriver: Send + Sync {
    /// Decide the next step of the investigation.
    ///
    /// `corrective` carries the parse error from a previous malformed
    /// response so the model can repair its output format; `None` on the
    /// first attempt of a turn.
    async fn decide(
        &self,
        transcript: &Transcript,
        tool_schemas: &[Value],
        corrective: Option<&str>,
    ) -> Result<Decision>;
}

/// Scripted driver for tests and the demo binary.
///
/// Plays back a fixed sequence of decisions (or failures); fails with
/// `DriverUnavailable` once the script runs out.
pub struct MockDriver {
    script: Mutex<VecDeque<Result<Decision>>>,
}

impl MockDriver {
    pub fn new(script: Vec<Result<Decision>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }
}

#[async_trait::async_trait]
impl ReasoningDriver for MockDriver {
    async fn decide(
        &self,
        _transcript: &Transcript,
        _tool_schemas: &[Value],
        _corrective: Option<&str>,
    ) -> Result<Decision> {
        let mut script = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        script.pop_front().unwrap_or_else(|| {
            Err(crate::error::AgentError::DriverUnavailable(
                "mock script exhausted".to_string(),
            ))
        })
    }
}
