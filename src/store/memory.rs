//! In-memory session store for single-instance deployments.
//!
//! Backed by a sharded concurrent map; coordination is scoped to one map
//! entry, so calls against distinct sessions never contend. State is
//! volatile and resets on process restart. No eviction: session lifetime
//! policy belongs to the deployment, not this store.

use super::{CommitOutcome, SessionSnapshot, SessionStore, StoreError};
use crate::registry::ConditionSet;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug)]
struct SessionEntry {
    conditions: ConditionSet,
    version: u64,
    call_count: u64,
    created_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

impl SessionEntry {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            conditions: ConditionSet::EMPTY,
            version: 0,
            call_count: 0,
            created_at: now,
            last_seen_at: now,
        }
    }

    fn snapshot(&self, session_id: &str) -> SessionSnapshot {
        SessionSnapshot {
            session_id: session_id.to_string(),
            conditions: self.conditions,
            version: self.version,
            call_count: self.call_count,
            created_at: self.created_at,
            last_seen_at: self.last_seen_at,
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionEntry>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently held.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_or_create(&self, session_id: &str) -> Result<SessionSnapshot, StoreError> {
        let entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "creating session");
                SessionEntry::new(Utc::now())
            });
        Ok(entry.snapshot(session_id))
    }

    async fn snapshot(&self, session_id: &str) -> Result<Option<SessionSnapshot>, StoreError> {
        Ok(self
            .sessions
            .get(session_id)
            .map(|entry| entry.snapshot(session_id)))
    }

    async fn commit(
        &self,
        session_id: &str,
        expected_version: u64,
        conditions: ConditionSet,
    ) -> Result<CommitOutcome, StoreError> {
        // Entry lock covers the whole compare-and-swap.
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry::new(Utc::now()));

        if entry.version != expected_version {
            return Ok(CommitOutcome::Conflict);
        }

        entry.conditions = conditions;
        entry.version += 1;
        Ok(CommitOutcome::Committed)
    }

    async fn record_call(&self, session_id: &str) -> Result<u64, StoreError> {
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry::new(Utc::now()));
        entry.call_count += 1;
        entry.last_seen_at = Utc::now();
        Ok(entry.call_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Condition;
    use std::sync::Arc;

    #[tokio::test]
    async fn get_or_create_returns_empty_session() {
        let store = MemorySessionStore::new();
        let snap = store.get_or_create("s1").await.unwrap();
        assert_eq!(snap.session_id, "s1");
        assert!(snap.conditions.is_empty());
        assert_eq!(snap.version, 0);
        assert_eq!(snap.call_count, 0);
    }

    #[tokio::test]
    async fn snapshot_of_unknown_session_is_none() {
        let store = MemorySessionStore::new();
        assert!(store.snapshot("never-seen").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_succeeds_with_current_version() {
        let store = MemorySessionStore::new();
        let snap = store.get_or_create("s1").await.unwrap();

        let conditions = snap.conditions.with(Condition::PrivateData);
        let outcome = store.commit("s1", snap.version, conditions).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);

        let after = store.snapshot("s1").await.unwrap().unwrap();
        assert!(after.conditions.contains(Condition::PrivateData));
        assert_eq!(after.version, snap.version + 1);
    }

    #[tokio::test]
    async fn stale_version_conflicts() {
        let store = MemorySessionStore::new();
        let snap = store.get_or_create("s1").await.unwrap();

        let first = snap.conditions.with(Condition::PrivateData);
        assert_eq!(
            store.commit("s1", snap.version, first).await.unwrap(),
            CommitOutcome::Committed
        );

        // Second writer still holds version 0.
        let second = snap.conditions.with(Condition::UntrustedContent);
        assert_eq!(
            store.commit("s1", snap.version, second).await.unwrap(),
            CommitOutcome::Conflict
        );

        // The conflicting write left no trace.
        let after = store.snapshot("s1").await.unwrap().unwrap();
        assert!(after.conditions.contains(Condition::PrivateData));
        assert!(!after.conditions.contains(Condition::UntrustedContent));
    }

    #[tokio::test]
    async fn record_call_counts_exactly() {
        let store = MemorySessionStore::new();
        assert_eq!(store.record_call("s1").await.unwrap(), 1);
        assert_eq!(store.record_call("s1").await.unwrap(), 2);
        assert_eq!(store.record_call("s1").await.unwrap(), 3);

        // Counting never touches the condition version.
        let snap = store.snapshot("s1").await.unwrap().unwrap();
        assert_eq!(snap.version, 0);
        assert_eq!(snap.call_count, 3);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = MemorySessionStore::new();
        let a = store.get_or_create("a").await.unwrap();
        store
            .commit("a", a.version, a.conditions.with(Condition::PrivateData))
            .await
            .unwrap();

        let b = store.get_or_create("b").await.unwrap();
        assert!(b.conditions.is_empty());
    }

    #[tokio::test]
    async fn concurrent_first_access_creates_one_session() {
        let store = Arc::new(MemorySessionStore::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.get_or_create("shared").await.unwrap()
            }));
        }
        for handle in handles {
            let snap = handle.await.unwrap();
            assert_eq!(snap.version, 0);
            assert!(snap.conditions.is_empty());
        }
        assert_eq!(store.session_count(), 1);
    }
}
