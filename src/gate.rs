//! Gate façade: registry lookup, policy evaluation, session commit, and
//! audit emission for one tool-call request.
//!
//! The façade is the sole writer to the session store. Allowed calls commit
//! through a bounded compare-and-swap retry loop, so two concurrent calls on
//! one session serialize via conflict-and-retry instead of losing updates.

use crate::audit::{AuditRecord, AuditSink};
use crate::policy::{self, Verdict};
use crate::registry::{Condition, ConditionSet, ToolDefinition, ToolRegistry};
use crate::store::{CommitOutcome, SessionStore, StoreError};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Attempts per evaluation before a session's commit races are surfaced to
/// the caller as a retryable conflict.
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Externally visible result of one evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct GateResult {
    pub decision: Verdict,
    pub tool_name: String,
    pub condition: Condition,
    pub reason: String,
    pub session_id: String,
    pub conditions_before: ConditionSet,
    pub conditions_after: ConditionSet,
}

/// Read-only projection of one session for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub active_conditions: ConditionSet,
    pub conditions_met: usize,
    pub conditions_total: usize,
    pub missing_conditions: Vec<Condition>,
    /// Safety invariant: BLOCK never commits state, so this must never be
    /// observed true.
    pub trifecta_complete: bool,
    pub call_count: u64,
}

#[derive(Error, Debug)]
pub enum GateError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("session '{session_id}' commit conflicted {attempts} times; retry the request")]
    Conflict { session_id: String, attempts: u32 },
}

pub struct Gate {
    registry: Arc<ToolRegistry>,
    store: Arc<dyn SessionStore>,
    audit: Arc<dyn AuditSink>,
    /// Audit writes that failed; best-effort sinks never fail the call.
    audit_failures: AtomicU64,
}

impl Gate {
    pub fn new(
        registry: Arc<ToolRegistry>,
        store: Arc<dyn SessionStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            registry,
            store,
            audit,
            audit_failures: AtomicU64::new(0),
        }
    }

    /// Evaluate one tool call for one session.
    pub async fn evaluate_call(
        &self,
        session_id: &str,
        tool_name: &str,
    ) -> Result<GateResult, GateError> {
        if session_id.is_empty() {
            return Err(GateError::InvalidRequest("session_id must be non-empty".into()));
        }
        if tool_name.is_empty() {
            return Err(GateError::InvalidRequest("tool_name must be non-empty".into()));
        }

        // Resolve before touching any session state: unknown tools must
        // leave no trace, not even a call count.
        let tool = self
            .registry
            .resolve(tool_name)
            .ok_or_else(|| GateError::UnknownTool(tool_name.to_string()))?
            .clone();

        let (before, outcome) = self.evaluate_and_commit(session_id, &tool).await?;
        self.store.record_call(session_id).await?;

        match outcome.verdict {
            Verdict::Allow => tracing::info!(
                session_id,
                tool_name,
                condition = %tool.condition,
                conditions_met = outcome.resulting.len(),
                "tool call allowed"
            ),
            Verdict::Block => tracing::warn!(
                session_id,
                tool_name,
                condition = %tool.condition,
                "tool call blocked; would complete the trifecta"
            ),
        }

        let result = GateResult {
            decision: outcome.verdict,
            tool_name: tool.name.clone(),
            condition: tool.condition,
            reason: outcome.reason,
            session_id: session_id.to_string(),
            conditions_before: before,
            conditions_after: outcome.resulting,
        };

        self.emit_audit(&result).await;
        Ok(result)
    }

    /// Snapshot, evaluate, and (for state-changing ALLOWs) commit with
    /// bounded CAS retries. Returns the pre-call set alongside the outcome.
    async fn evaluate_and_commit(
        &self,
        session_id: &str,
        tool: &ToolDefinition,
    ) -> Result<(ConditionSet, policy::PolicyOutcome), GateError> {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let snapshot = self.store.get_or_create(session_id).await?;
            let outcome = policy::evaluate(snapshot.conditions, tool.condition);

            // BLOCK and idempotent ALLOW leave state untouched; nothing to
            // commit, so nothing to race.
            if outcome.resulting == snapshot.conditions {
                return Ok((snapshot.conditions, outcome));
            }

            match self
                .store
                .commit(session_id, snapshot.version, outcome.resulting)
                .await?
            {
                CommitOutcome::Committed => return Ok((snapshot.conditions, outcome)),
                CommitOutcome::Conflict => {
                    tracing::debug!(session_id, tool_name = %tool.name, "commit conflict; retrying");
                }
            }
        }

        Err(GateError::Conflict {
            session_id: session_id.to_string(),
            attempts: MAX_COMMIT_ATTEMPTS,
        })
    }

    async fn emit_audit(&self, result: &GateResult) {
        let record = AuditRecord {
            timestamp: Utc::now(),
            session_id: result.session_id.clone(),
            tool_name: result.tool_name.clone(),
            condition: result.condition,
            decision: result.decision,
            reason: result.reason.clone(),
            conditions_before: result.conditions_before,
            conditions_after: result.conditions_after,
            conditions_met_count: result.conditions_after.len(),
        };

        if let Err(error) = self.audit.record(&record).await {
            let failures = self.audit_failures.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(%error, failures, "audit write failed");
        }
    }

    /// Read-only session projection. Never-seen sessions report the empty
    /// default rather than an error.
    pub async fn session_status(&self, session_id: &str) -> Result<SessionStatus, GateError> {
        if session_id.is_empty() {
            return Err(GateError::InvalidRequest("session_id must be non-empty".into()));
        }

        let snapshot = self.store.snapshot(session_id).await?;
        let (conditions, call_count) = snapshot
            .map(|s| (s.conditions, s.call_count))
            .unwrap_or((ConditionSet::EMPTY, 0));

        Ok(SessionStatus {
            session_id: session_id.to_string(),
            active_conditions: conditions,
            conditions_met: conditions.len(),
            conditions_total: Condition::ALL.len(),
            missing_conditions: conditions.missing(),
            trifecta_complete: conditions.is_complete(),
            call_count,
        })
    }

    /// Full registry dump, sorted by tool name.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.registry.all().into_iter().cloned().collect()
    }

    /// Audit writes that failed since startup.
    pub fn audit_failure_count(&self) -> u64 {
        self.audit_failures.load(Ordering::Relaxed)
    }
}
