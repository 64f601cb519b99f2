//! Shared types for the message pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aura::{AuraState, SubjectId};
use crate::error::PipelineError;
use crate::tone::Tone;

// ── Outbound message ────────────────────────────────────────────────

/// Where a message is going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Destination {
    /// One-to-one conversation.
    DirectUser { recipient_id: String },
    /// Group chat; the group's aura moves along with the sender's.
    GroupChat { group_id: String },
}

/// A message a user is sending, as handed over by the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: Uuid,
    pub sender_id: String,
    pub text: String,
    pub destination: Destination,
    pub sent_at: DateTime<Utc>,
}

impl OutboundMessage {
    pub fn new(sender_id: impl Into<String>, text: impl Into<String>, destination: Destination) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: sender_id.into(),
            text: text.into(),
            destination,
            sent_at: Utc::now(),
        }
    }

    /// A direct message to `recipient_id`.
    pub fn direct(
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            sender_id,
            text,
            Destination::DirectUser {
                recipient_id: recipient_id.into(),
            },
        )
    }

    /// A message to group `group_id`.
    pub fn group(
        sender_id: impl Into<String>,
        group_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            sender_id,
            text,
            Destination::GroupChat {
                group_id: group_id.into(),
            },
        )
    }

    /// The sender's aura subject.
    pub fn sender_subject(&self) -> SubjectId {
        SubjectId::user(self.sender_id.clone())
    }

    /// The group's aura subject, for group messages.
    pub fn group_subject(&self) -> Option<SubjectId> {
        match &self.destination {
            Destination::GroupChat { group_id } => Some(SubjectId::group(group_id.clone())),
            Destination::DirectUser { .. } => None,
        }
    }
}

// ── Result ──────────────────────────────────────────────────────────

/// An aura update that did not land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraFailure {
    pub subject: SubjectId,
    pub reason: String,
}

/// Whether the aura side of a send fully succeeded.
///
/// The message itself is never rolled back; a partial failure only means
/// one or both aura updates were lost and should be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    PartialFailure { failures: Vec<AuraFailure> },
}

impl DeliveryStatus {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::PartialFailure { .. } => "partial_failure",
        }
    }
}

/// What the message store persists alongside the message, and what a UI
/// renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub message_id: Uuid,
    /// Resolved tone. Neutral when the classifier found nothing or failed.
    pub tone: Tone,
    /// Classifier failure, if the tone is neutral because of one.
    pub classifier_error: Option<String>,
    /// Sender aura after this message. Unchanged for a neutral tone.
    /// `None` only when aura storage could not be reached.
    pub new_sender_aura: Option<AuraState>,
    /// Group aura after this message, for group messages. `None` for
    /// direct messages or when storage could not be reached.
    pub new_group_aura: Option<AuraState>,
    pub delivery: DeliveryStatus,
    pub processed_at: DateTime<Utc>,
}

impl PipelineResult {
    pub fn is_partial_failure(&self) -> bool {
        matches!(self.delivery, DeliveryStatus::PartialFailure { .. })
    }

    /// Convert a partial failure into an error naming the first subject
    /// that failed.
    pub fn ensure_delivered(self) -> Result<Self, PipelineError> {
        if let DeliveryStatus::PartialFailure { failures } = &self.delivery
            && let Some(first) = failures.first()
        {
            return Err(PipelineError::AuraUpdate {
                subject: first.subject.clone(),
                reason: first.reason.clone(),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(delivery: DeliveryStatus) -> PipelineResult {
        PipelineResult {
            message_id: Uuid::new_v4(),
            tone: Tone::Joyful,
            classifier_error: None,
            new_sender_aura: Some(AuraState::new(196, 241, 196)),
            new_group_aura: None,
            delivery,
            processed_at: Utc::now(),
        }
    }

    #[test]
    fn subjects_for_direct_message() {
        let msg = OutboundMessage::direct("alice", "bob", "hi");
        assert_eq!(msg.sender_subject(), SubjectId::user("alice"));
        assert_eq!(msg.group_subject(), None);
    }

    #[test]
    fn subjects_for_group_message() {
        let msg = OutboundMessage::group("alice", "climbers", "hi all");
        assert_eq!(msg.sender_subject(), SubjectId::user("alice"));
        assert_eq!(msg.group_subject(), Some(SubjectId::group("climbers")));
    }

    #[test]
    fn destination_serialization() {
        let json = serde_json::to_value(Destination::GroupChat {
            group_id: "g1".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "group_chat");
        assert_eq!(json["group_id"], "g1");
    }

    #[test]
    fn delivered_result_passes_through() {
        let ok = result(DeliveryStatus::Delivered);
        assert!(!ok.is_partial_failure());
        assert_eq!(ok.delivery.label(), "delivered");
        assert!(ok.ensure_delivered().is_ok());
    }

    #[test]
    fn partial_failure_becomes_error() {
        let failed = result(DeliveryStatus::PartialFailure {
            failures: vec![AuraFailure {
                subject: SubjectId::group("g1"),
                reason: "disk full".into(),
            }],
        });
        assert!(failed.is_partial_failure());
        assert_eq!(failed.delivery.label(), "partial_failure");
        match failed.ensure_delivered() {
            Err(PipelineError::AuraUpdate { subject, reason }) => {
                assert_eq!(subject, SubjectId::group("g1"));
                assert_eq!(reason, "disk full");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn result_serializes_for_the_message_store() {
        let json = serde_json::to_value(result(DeliveryStatus::Delivered)).unwrap();
        assert_eq!(json["tone"], "joyful");
        assert_eq!(json["new_sender_aura"]["g"], 241);
        assert!(json["new_group_aura"].is_null());
        assert_eq!(json["delivery"]["status"], "delivered");
    }
}
