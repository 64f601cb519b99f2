//! Backend-agnostic aura persistence trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aura::{AuraState, SubjectId, SubjectKind};
use crate::error::DatabaseError;

/// A persisted aura: one per subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraRecord {
    pub subject: SubjectId,
    pub state: AuraState,
    /// Incremented on every successful write. `0` is never stored; it
    /// stands for "no record yet" in [`AuraBackend::compare_and_swap`].
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Result of a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write landed; the record now carries `expected_version + 1`.
    Committed(AuraRecord),
    /// The stored version no longer matched. Nothing was written.
    Conflict,
}

/// A subject's slot as a writer sees it.
///
/// Deleting a subject leaves a vacant slot that remembers its version, so
/// versions only ever grow and a write computed before the delete can
/// never land on the subject after it is recreated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuraSlot {
    Live(AuraRecord),
    /// No live record. `version` is 0 if the subject never had one.
    Vacant { version: u64 },
}

impl AuraSlot {
    pub fn version(&self) -> u64 {
        match self {
            Self::Live(record) => record.version,
            Self::Vacant { version } => *version,
        }
    }
}

/// Storage for aura records with optimistic-concurrency writes.
#[async_trait]
pub trait AuraBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Load the live record for `subject`, if any.
    async fn load(&self, subject: &SubjectId) -> Result<Option<AuraRecord>, DatabaseError>;

    /// Load the slot for `subject`, vacant ones included.
    async fn load_slot(&self, subject: &SubjectId) -> Result<AuraSlot, DatabaseError>;

    /// Write `state` only if the slot version equals `expected_version`.
    ///
    /// `expected_version == 0` means the caller saw no slot at all: the
    /// write is an insert that conflicts if one has appeared since. A
    /// successful write to a vacant slot makes it live again.
    async fn compare_and_swap(
        &self,
        subject: &SubjectId,
        expected_version: u64,
        state: AuraState,
    ) -> Result<CasOutcome, DatabaseError>;

    /// Store `state` unless a live record exists. Returns the live record
    /// either way. A vacant slot is revived at its next version.
    async fn insert_if_absent(
        &self,
        subject: &SubjectId,
        state: AuraState,
    ) -> Result<AuraRecord, DatabaseError>;

    /// Vacate the slot, bumping its version. Returns whether a live record
    /// existed.
    async fn delete(&self, subject: &SubjectId) -> Result<bool, DatabaseError>;

    /// All records of one kind, ordered by subject id.
    async fn list(&self, kind: SubjectKind) -> Result<Vec<AuraRecord>, DatabaseError>;
}
