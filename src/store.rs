//! Session store: the only shared mutable state in the gate.
//!
//! Per-session condition tracking behind a trait so single-instance
//! deployments can use the in-memory map while multi-instance deployments
//! plug in an external keyed store. Updates use optimistic concurrency
//! (snapshot version + compare-and-swap) so distinct sessions never block
//! each other and racing calls on one session cannot lose updates.

mod memory;

pub use memory::MemorySessionStore;

use crate::registry::ConditionSet;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Read-only view of one session, including the version token used for
/// compare-and-swap commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub conditions: ConditionSet,
    /// Incremented on every successful condition commit.
    pub version: u64,
    /// Total evaluated calls, ALLOW and BLOCK alike.
    pub call_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Result of a compare-and-swap commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Session advanced since the caller's snapshot; re-read and retry.
    Conflict,
}

/// Store infrastructure failures. Distinct from "session not found", which
/// `snapshot` reports as `None` and is a normal first-contact outcome.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return the session's current state, creating an empty session on
    /// first reference. Concurrent first access from one session id must
    /// create exactly one session.
    async fn get_or_create(&self, session_id: &str) -> Result<SessionSnapshot, StoreError>;

    /// Read-only view; `None` for a never-seen session id.
    async fn snapshot(&self, session_id: &str) -> Result<Option<SessionSnapshot>, StoreError>;

    /// Replace the session's condition set iff its version still equals
    /// `expected_version`. Conditions are monotonic; callers only ever
    /// commit supersets of what they read.
    async fn commit(
        &self,
        session_id: &str,
        expected_version: u64,
        conditions: ConditionSet,
    ) -> Result<CommitOutcome, StoreError>;

    /// Count one evaluated call (regardless of verdict) and refresh
    /// `last_seen_at`. Returns the new call count.
    async fn record_call(&self, session_id: &str) -> Result<u64, StoreError>;
}
