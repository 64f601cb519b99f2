//! Message pipeline: classify an outgoing message and move auras.
//!
//! Flow for every send:
//! 1. Tone classification (external service, failures become neutral)
//! 2. Sender aura update with the user profile
//! 3. Group aura update with the group profile, for group messages
//!
//! The recipient of a direct message is never touched. Steps 2 and 3 run
//! concurrently; each is atomic on its own subject.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::aura::{AuraState, StepProfile, SubjectId};
use crate::error::{AuraError, PipelineError};
use crate::pipeline::types::{AuraFailure, DeliveryStatus, OutboundMessage, PipelineResult};
use crate::store::{ApplyOutcome, AuraStore};
use crate::tone::{CONFIDENCE_THRESHOLD, Tone, ToneClassifier, classify_scores};

/// Runs outgoing messages through classification and aura updates.
pub struct MessagePipeline {
    classifier: Arc<dyn ToneClassifier>,
    store: Arc<AuraStore>,
    tone_threshold: f64,
}

impl MessagePipeline {
    pub fn new(classifier: Arc<dyn ToneClassifier>, store: Arc<AuraStore>) -> Self {
        Self {
            classifier,
            store,
            tone_threshold: CONFIDENCE_THRESHOLD,
        }
    }

    /// Override the minimum classifier confidence.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.tone_threshold = threshold;
        self
    }

    pub fn store(&self) -> &Arc<AuraStore> {
        &self.store
    }

    /// Classify `text`. A failing classifier yields `Neutral` plus the
    /// error text so the caller can record it.
    pub async fn classify(&self, text: &str) -> (Tone, Option<String>) {
        match self.classifier.classify(text).await {
            Ok(scores) => {
                let tone = classify_scores(&scores, self.tone_threshold);
                debug!(
                    classifier = self.classifier.name(),
                    categories = scores.len(),
                    tone = %tone,
                    "Message classified"
                );
                (tone, None)
            }
            Err(e) => {
                warn!(
                    classifier = self.classifier.name(),
                    error = %e,
                    "Tone classification failed, treating message as neutral"
                );
                (Tone::Neutral, Some(e.to_string()))
            }
        }
    }

    /// Process one outgoing message.
    ///
    /// Never fails: aura storage problems are reported in
    /// [`PipelineResult::delivery`] and the message is still delivered.
    pub async fn handle(&self, message: OutboundMessage) -> PipelineResult {
        info!(
            id = %message.id,
            sender = %message.sender_id,
            "Processing outgoing message"
        );

        let (tone, classifier_error) = self.classify(&message.text).await;

        let sender = message.sender_subject();
        let group = message.group_subject();

        let sender_update = self.store.apply(&sender, tone, &StepProfile::USER);
        let group_update = async {
            match &group {
                Some(group) => Some(self.store.apply(group, tone, &StepProfile::GROUP).await),
                None => None,
            }
        };
        let (sender_result, group_result) = tokio::join!(sender_update, group_update);

        let mut failures = Vec::new();
        let new_sender_aura = self.settle(&sender, sender_result, &mut failures).await;
        let new_group_aura = match (group, group_result) {
            (Some(group), Some(result)) => self.settle(&group, result, &mut failures).await,
            _ => None,
        };

        let delivery = if failures.is_empty() {
            DeliveryStatus::Delivered
        } else {
            DeliveryStatus::PartialFailure { failures }
        };

        info!(
            id = %message.id,
            tone = %tone,
            delivery = delivery.label(),
            "Message processed"
        );

        PipelineResult {
            message_id: message.id,
            tone,
            classifier_error,
            new_sender_aura,
            new_group_aura,
            delivery,
            processed_at: Utc::now(),
        }
    }

    /// Like [`handle`](Self::handle), but a lost aura update is an error.
    pub async fn handle_strict(
        &self,
        message: OutboundMessage,
    ) -> Result<PipelineResult, PipelineError> {
        self.handle(message).await.ensure_delivered()
    }

    /// Process several messages concurrently. Results keep input order.
    pub async fn handle_batch(&self, messages: Vec<OutboundMessage>) -> Vec<PipelineResult> {
        let count = messages.len();
        info!(count, "Processing message batch");

        let results = join_all(messages.into_iter().map(|m| self.handle(m))).await;

        let partial = results.iter().filter(|r| r.is_partial_failure()).count();
        info!(total = count, partial, "Batch processing complete");
        results
    }

    /// Fold one aura update into the result, recording failures.
    ///
    /// A neutral message leaves the aura alone; the unchanged state is read
    /// back so the result always carries the colour to render. Failing that
    /// read is not a lost update, so it is only logged.
    async fn settle(
        &self,
        subject: &SubjectId,
        result: Result<ApplyOutcome, AuraError>,
        failures: &mut Vec<AuraFailure>,
    ) -> Option<AuraState> {
        match result {
            Ok(ApplyOutcome::Applied { record, .. }) => Some(record.state),
            Ok(ApplyOutcome::NoOp) => match self.store.current(subject).await {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!(subject = %subject, error = %e, "Could not read unchanged aura");
                    None
                }
            },
            Err(e) => {
                error!(subject = %subject, error = %e, "Aura update failed, message still delivered");
                failures.push(AuraFailure {
                    subject: subject.clone(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    /// Run [`handle`](Self::handle) on a background task.
    ///
    /// Cancelling the returned task before it completes abandons the
    /// message; an aura write either committed whole or not at all.
    pub fn spawn(self: &Arc<Self>, message: OutboundMessage) -> PipelineTask {
        let message_id = message.id;
        let pipeline = Arc::clone(self);
        let handle = tokio::spawn(async move { pipeline.handle(message).await });
        PipelineTask { handle, message_id }
    }
}

/// Handle to a message being processed in the background.
pub struct PipelineTask {
    handle: JoinHandle<PipelineResult>,
    message_id: Uuid,
}

impl PipelineTask {
    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    /// Abort processing. Has no effect once the task has finished.
    pub fn cancel(&self) {
        debug!(id = %self.message_id, "Cancelling message processing");
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the result.
    pub async fn join(self) -> Result<PipelineResult, PipelineError> {
        match self.handle.await {
            Ok(result) => Ok(result),
            Err(e) if e.is_cancelled() => Err(PipelineError::Cancelled),
            Err(e) => Err(PipelineError::TaskFailed(e.to_string())),
        }
    }
}
