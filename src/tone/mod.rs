//! Message tone: classifier results and the categories aura cares about.
//!
//! The classifier itself is an external service reached through the
//! [`ToneClassifier`] trait; this module only interprets what it returns.

pub mod classification;
pub mod classifier;
pub mod watson;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::ClassifierError;

pub use classification::{CONFIDENCE_THRESHOLD, Tone, ToneScore, classify_scores};
pub use classifier::{OfflineClassifier, ToneClassifier};
pub use watson::WatsonToneAnalyzer;

/// Create the classifier described by `config`: the Watson tone analyzer
/// when an API key is configured, otherwise [`OfflineClassifier`].
pub fn create_classifier(
    config: &EngineConfig,
) -> Result<Arc<dyn ToneClassifier>, ClassifierError> {
    match &config.classifier {
        Some(classifier_config) => {
            let analyzer = WatsonToneAnalyzer::new(classifier_config.clone())?;
            tracing::info!(url = %classifier_config.url, "Using Watson tone analyzer");
            Ok(Arc::new(analyzer))
        }
        None => {
            tracing::warn!("No tone analyzer configured, every message will be neutral");
            Ok(Arc::new(OfflineClassifier))
        }
    }
}
