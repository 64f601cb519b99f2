//! In-memory aura backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::traits::{AuraBackend, AuraRecord, AuraSlot, CasOutcome};
use crate::aura::{AuraState, SubjectId, SubjectKind};
use crate::error::DatabaseError;

/// Aura slots held in a `HashMap` behind an async `RwLock`.
///
/// Loads and conditional writes take the lock separately, so concurrent
/// updates race exactly like they would against a real database.
#[derive(Default)]
pub struct InMemoryBackend {
    slots: RwLock<HashMap<SubjectId, AuraSlot>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| matches!(slot, AuraSlot::Live(_)))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn live_record(subject: &SubjectId, state: AuraState, version: u64) -> AuraRecord {
    AuraRecord {
        subject: subject.clone(),
        state,
        version,
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl AuraBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, subject: &SubjectId) -> Result<Option<AuraRecord>, DatabaseError> {
        match self.slots.read().await.get(subject) {
            Some(AuraSlot::Live(record)) => Ok(Some(record.clone())),
            _ => Ok(None),
        }
    }

    async fn load_slot(&self, subject: &SubjectId) -> Result<AuraSlot, DatabaseError> {
        Ok(self
            .slots
            .read()
            .await
            .get(subject)
            .cloned()
            .unwrap_or(AuraSlot::Vacant { version: 0 }))
    }

    async fn compare_and_swap(
        &self,
        subject: &SubjectId,
        expected_version: u64,
        state: AuraState,
    ) -> Result<CasOutcome, DatabaseError> {
        let mut slots = self.slots.write().await;
        let stored_version = slots.get(subject).map(AuraSlot::version).unwrap_or(0);
        if stored_version != expected_version {
            return Ok(CasOutcome::Conflict);
        }

        let record = live_record(subject, state, expected_version + 1);
        slots.insert(subject.clone(), AuraSlot::Live(record.clone()));
        Ok(CasOutcome::Committed(record))
    }

    async fn insert_if_absent(
        &self,
        subject: &SubjectId,
        state: AuraState,
    ) -> Result<AuraRecord, DatabaseError> {
        let mut slots = self.slots.write().await;
        let version = match slots.get(subject) {
            Some(AuraSlot::Live(record)) => return Ok(record.clone()),
            Some(AuraSlot::Vacant { version }) => version + 1,
            None => 1,
        };
        let record = live_record(subject, state, version);
        slots.insert(subject.clone(), AuraSlot::Live(record.clone()));
        Ok(record)
    }

    async fn delete(&self, subject: &SubjectId) -> Result<bool, DatabaseError> {
        let mut slots = self.slots.write().await;
        let Some(AuraSlot::Live(record)) = slots.get(subject) else {
            return Ok(false);
        };
        let version = record.version + 1;
        slots.insert(subject.clone(), AuraSlot::Vacant { version });
        Ok(true)
    }

    async fn list(&self, kind: SubjectKind) -> Result<Vec<AuraRecord>, DatabaseError> {
        let slots = self.slots.read().await;
        let mut out: Vec<AuraRecord> = slots
            .values()
            .filter_map(|slot| match slot {
                AuraSlot::Live(record) if record.subject.kind == kind => Some(record.clone()),
                _ => None,
            })
            .collect();
        out.sort_by(|a, b| a.subject.id.cmp(&b.subject.id));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cas_insert_then_update() {
        let backend = InMemoryBackend::new();
        let alice = SubjectId::user("alice");

        let first = backend
            .compare_and_swap(&alice, 0, AuraState::new(1, 2, 3))
            .await
            .unwrap();
        let CasOutcome::Committed(record) = first else {
            panic!("expected commit");
        };
        assert_eq!(record.version, 1);

        // Stale insert conflicts now that a record exists.
        let stale = backend
            .compare_and_swap(&alice, 0, AuraState::new(9, 9, 9))
            .await
            .unwrap();
        assert_eq!(stale, CasOutcome::Conflict);

        let second = backend
            .compare_and_swap(&alice, 1, AuraState::new(4, 5, 6))
            .await
            .unwrap();
        assert!(matches!(second, CasOutcome::Committed(ref r) if r.version == 2));

        let loaded = backend.load(&alice).await.unwrap().unwrap();
        assert_eq!(loaded.state, AuraState::new(4, 5, 6));
        assert_eq!(loaded.version, 2);
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_existing() {
        let backend = InMemoryBackend::new();
        let group = SubjectId::group("g1");

        let first = backend
            .insert_if_absent(&group, AuraState::GROUP_INITIAL)
            .await
            .unwrap();
        assert_eq!(first.version, 1);

        let again = backend
            .insert_if_absent(&group, AuraState::new(0, 0, 0))
            .await
            .unwrap();
        assert_eq!(again.state, AuraState::GROUP_INITIAL);
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn delete_and_list() {
        let backend = InMemoryBackend::new();
        for id in ["bob", "alice"] {
            backend
                .insert_if_absent(&SubjectId::user(id), AuraState::USER_INITIAL)
                .await
                .unwrap();
        }
        backend
            .insert_if_absent(&SubjectId::group("g"), AuraState::GROUP_INITIAL)
            .await
            .unwrap();

        let users = backend.list(SubjectKind::User).await.unwrap();
        let ids: Vec<&str> = users.iter().map(|r| r.subject.id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob"]);

        assert!(backend.delete(&SubjectId::user("bob")).await.unwrap());
        assert!(!backend.delete(&SubjectId::user("bob")).await.unwrap());
        assert_eq!(backend.list(SubjectKind::User).await.unwrap().len(), 1);
        assert!(!backend.is_empty().await);
        assert_eq!(
            backend.load_slot(&SubjectId::user("bob")).await.unwrap(),
            AuraSlot::Vacant { version: 2 }
        );
    }

    #[tokio::test]
    async fn versions_keep_growing_across_delete() {
        let backend = InMemoryBackend::new();
        let group = SubjectId::group("g1");

        backend
            .compare_and_swap(&group, 0, AuraState::new(250, 5, 5))
            .await
            .unwrap();
        let stale_version = backend.load_slot(&group).await.unwrap().version();
        backend.delete(&group).await.unwrap();

        let fresh = backend
            .insert_if_absent(&group, AuraState::GROUP_INITIAL)
            .await
            .unwrap();
        assert_eq!(fresh.version, 3);

        let outcome = backend
            .compare_and_swap(&group, stale_version, AuraState::new(255, 0, 0))
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Conflict);
        assert_eq!(
            backend.load(&group).await.unwrap().unwrap().state,
            AuraState::GROUP_INITIAL
        );
    }
}
