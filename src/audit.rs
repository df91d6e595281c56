//! Audit emission for gate decisions.
//!
//! One structured record per evaluation, ALLOW or BLOCK. Audit is
//! best-effort observability: a failed write never fails the evaluation,
//! but it is logged and counted rather than dropped silently.

use crate::policy::Verdict;
use crate::registry::{Condition, ConditionSet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// One gate decision, as shipped to the audit sink.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub tool_name: String,
    pub condition: Condition,
    pub decision: Verdict,
    pub reason: String,
    pub conditions_before: ConditionSet,
    pub conditions_after: ConditionSet,
    pub conditions_met_count: usize,
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("audit serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("audit write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Sink that emits records through the structured log pipeline.
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let payload = serde_json::to_string(record)?;
        tracing::info!(
            target: "trifecta_gate::audit",
            session_id = %record.session_id,
            tool_name = %record.tool_name,
            decision = ?record.decision,
            %payload,
            "gate decision"
        );
        Ok(())
    }
}

/// Sink that appends one JSON line per record to a file.
pub struct JsonlAuditSink {
    file: tokio::sync::Mutex<tokio::fs::File>,
}

impl JsonlAuditSink {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuditError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            file: tokio::sync::Mutex::new(file),
        })
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        Ok(())
    }
}
