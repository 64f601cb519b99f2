//! Atomic aura updates over any [`AuraBackend`].
//!
//! Every update is a read-modify-write loop guarded by the record version:
//! load, compute with [`aura::update`](crate::aura::update), write only if
//! the version is unchanged, retry on conflict. Two concurrent updates to
//! one subject therefore always compose in some sequential order; neither
//! can overwrite the other.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::traits::{AuraBackend, AuraRecord, AuraSlot, CasOutcome};
use crate::aura::{self, AuraState, StepProfile, SubjectId, SubjectKind};
use crate::error::AuraError;
use crate::tone::Tone;

/// Default number of read-modify-write attempts per update.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// What an [`AuraStore::apply`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Neutral tone: nothing was read or written.
    NoOp,
    /// The aura moved (or was confirmed at a fixed point) and was persisted.
    Applied {
        previous: AuraState,
        record: AuraRecord,
    },
}

impl ApplyOutcome {
    /// The persisted state, if anything was written.
    pub fn state(&self) -> Option<AuraState> {
        match self {
            Self::NoOp => None,
            Self::Applied { record, .. } => Some(record.state),
        }
    }
}

/// The only way aura state is mutated.
pub struct AuraStore {
    backend: Arc<dyn AuraBackend>,
    max_attempts: u32,
}

impl AuraStore {
    pub fn new(backend: Arc<dyn AuraBackend>) -> Self {
        Self {
            backend,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the conflict retry bound (minimum 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Move `subject`'s aura one step toward `tone` under `profile`.
    ///
    /// A subject with no record starts from its kind's initial aura.
    /// Conflicts are retried immediately up to the attempt bound; running
    /// out surfaces as [`AuraError::StorageUnavailable`].
    pub async fn apply(
        &self,
        subject: &SubjectId,
        tone: Tone,
        profile: &StepProfile,
    ) -> Result<ApplyOutcome, AuraError> {
        if tone.is_neutral() {
            debug!(subject = %subject, "Neutral tone, aura left untouched");
            return Ok(ApplyOutcome::NoOp);
        }

        for attempt in 1..=self.max_attempts {
            let slot = self
                .backend
                .load_slot(subject)
                .await
                .map_err(|e| self.unavailable(subject, e))?;

            let (previous, version) = match slot {
                AuraSlot::Live(record) => (record.state, record.version),
                AuraSlot::Vacant { version } => (subject.kind.initial_aura(), version),
            };
            let next = aura::update(previous, tone, profile);

            match self
                .backend
                .compare_and_swap(subject, version, next)
                .await
                .map_err(|e| self.unavailable(subject, e))?
            {
                CasOutcome::Committed(record) => {
                    debug!(
                        subject = %subject,
                        tone = %tone,
                        from = %previous,
                        to = %record.state,
                        version = record.version,
                        attempt,
                        "Aura updated"
                    );
                    return Ok(ApplyOutcome::Applied { previous, record });
                }
                CasOutcome::Conflict => {
                    let conflict = AuraError::ConcurrentUpdateConflict {
                        subject: subject.clone(),
                        expected_version: version,
                    };
                    warn!(
                        subject = %subject,
                        attempt,
                        max = self.max_attempts,
                        "{conflict}, retrying"
                    );
                    tokio::task::yield_now().await;
                }
            }
        }

        error!(
            subject = %subject,
            attempts = self.max_attempts,
            backend = self.backend.name(),
            "Aura update kept conflicting, giving up"
        );
        Err(AuraError::StorageUnavailable {
            subject: subject.clone(),
            reason: format!(
                "{} concurrent update conflicts in a row",
                self.max_attempts
            ),
        })
    }

    /// Apply using the profile that matches the subject's kind.
    pub async fn apply_default(
        &self,
        subject: &SubjectId,
        tone: Tone,
    ) -> Result<ApplyOutcome, AuraError> {
        self.apply(subject, tone, &StepProfile::for_kind(subject.kind))
            .await
    }

    /// Current aura, or the kind's initial aura if none is stored.
    pub async fn current(&self, subject: &SubjectId) -> Result<AuraState, AuraError> {
        let stored = self
            .backend
            .load(subject)
            .await
            .map_err(|e| self.unavailable(subject, e))?;
        Ok(stored
            .map(|r| r.state)
            .unwrap_or_else(|| subject.kind.initial_aura()))
    }

    /// Stored record, if any.
    pub async fn record(&self, subject: &SubjectId) -> Result<Option<AuraRecord>, AuraError> {
        self.backend
            .load(subject)
            .await
            .map_err(|e| self.unavailable(subject, e))
    }

    /// Create the subject's aura at its initial colour. Idempotent.
    pub async fn register(&self, subject: &SubjectId) -> Result<AuraRecord, AuraError> {
        let record = self
            .backend
            .insert_if_absent(subject, subject.kind.initial_aura())
            .await
            .map_err(|e| self.unavailable(subject, e))?;
        debug!(subject = %subject, state = %record.state, "Aura registered");
        Ok(record)
    }

    /// Drop the subject's aura when the user or group is deleted.
    ///
    /// The slot's version keeps counting, so an update that read the old
    /// aura cannot land on a subject registered again later.
    pub async fn remove(&self, subject: &SubjectId) -> Result<bool, AuraError> {
        let removed = self
            .backend
            .delete(subject)
            .await
            .map_err(|e| self.unavailable(subject, e))?;
        debug!(subject = %subject, removed, "Aura removed");
        Ok(removed)
    }

    /// Every stored aura of one kind.
    pub async fn list(&self, kind: SubjectKind) -> Result<Vec<AuraRecord>, AuraError> {
        self.backend.list(kind).await.map_err(|e| AuraError::StorageUnavailable {
            subject: SubjectId {
                kind,
                id: "*".into(),
            },
            reason: e.to_string(),
        })
    }

    fn unavailable(&self, subject: &SubjectId, err: impl std::fmt::Display) -> AuraError {
        error!(subject = %subject, backend = self.backend.name(), error = %err, "Aura storage failed");
        AuraError::unavailable(subject, err)
    }
}
