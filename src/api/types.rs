//! API request and response types

use crate::registry::ToolDefinition;
use serde::{Deserialize, Serialize};

/// Request to evaluate one tool call against the gate
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub session_id: String,
    pub tool_name: String,
}

/// Response with the full tool registry
#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDefinition>,
}

/// Liveness probe response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
