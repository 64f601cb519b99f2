//! Classifier seam.

use async_trait::async_trait;

use super::classification::ToneScore;
use crate::error::ClassifierError;

/// External tone/sentiment service.
///
/// Implementations return every scored category for `text`, ordered by
/// descending confidence. An empty list is a valid answer ("nothing
/// notable"), not an error.
#[async_trait]
pub trait ToneClassifier: Send + Sync {
    /// Service name for logs.
    fn name(&self) -> &str;

    /// Score `text`.
    async fn classify(&self, text: &str) -> Result<Vec<ToneScore>, ClassifierError>;
}

/// Classifier used when no service is configured. Never finds a tone.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineClassifier;

#[async_trait]
impl ToneClassifier for OfflineClassifier {
    fn name(&self) -> &str {
        "offline"
    }

    async fn classify(&self, _text: &str) -> Result<Vec<ToneScore>, ClassifierError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_classifier_finds_nothing() {
        let classifier = OfflineClassifier;
        assert_eq!(classifier.name(), "offline");
        assert!(classifier.classify("I am furious").await.unwrap().is_empty());
    }
}
