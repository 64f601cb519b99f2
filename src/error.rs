//! Error types for the aura engine.

use std::time::Duration;

use crate::aura::SubjectId;

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Aura error: {0}")]
    Aura(#[from] AuraError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Tone classifier service errors.
///
/// None of these are fatal: the pipeline downgrades them to a neutral tone.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Classifier {service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("Authentication failed for classifier {service}")]
    AuthFailed { service: String },

    #[error("Classifier {service} rate limited, retry after {retry_after:?}")]
    RateLimited {
        service: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from classifier {service}: {reason}")]
    InvalidResponse { service: String, reason: String },
}

/// Aura store errors.
#[derive(Debug, thiserror::Error)]
pub enum AuraError {
    #[error("Aura storage unavailable for {subject}: {reason}")]
    StorageUnavailable { subject: SubjectId, reason: String },

    #[error("Concurrent update on {subject}: version {expected_version} is stale")]
    ConcurrentUpdateConflict {
        subject: SubjectId,
        expected_version: u64,
    },
}

impl AuraError {
    /// Wrap a backend failure for `subject`.
    pub fn unavailable(subject: &SubjectId, err: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable {
            subject: subject.clone(),
            reason: err.to_string(),
        }
    }

    /// The subject this error concerns.
    pub fn subject(&self) -> &SubjectId {
        match self {
            Self::StorageUnavailable { subject, .. } => subject,
            Self::ConcurrentUpdateConflict { subject, .. } => subject,
        }
    }
}

/// Pipeline-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Aura update failed for {subject}: {reason}")]
    AuraUpdate { subject: SubjectId, reason: String },

    #[error("Message handling was cancelled")]
    Cancelled,

    #[error("Message handling task failed: {0}")]
    TaskFailed(String),
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn startup(config: &EngineConfig) -> Result<()> {
        config.validate()?;
        let classifier: std::result::Result<(), ClassifierError> =
            Err(ClassifierError::AuthFailed {
                service: "watson".into(),
            });
        classifier?;
        Ok(())
    }

    #[test]
    fn startup_errors_lift_into_error() {
        let bad = EngineConfig {
            max_apply_attempts: 0,
            ..EngineConfig::default()
        };
        let err = startup(&bad).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
        assert!(err.to_string().contains("AURA_MAX_APPLY_ATTEMPTS"));

        let err = startup(&EngineConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Classifier(ClassifierError::AuthFailed { .. })));
    }

    #[test]
    fn aura_error_names_its_subject() {
        let subject = SubjectId::group("g1");
        let err: Error = AuraError::unavailable(&subject, "disk I/O error").into();
        assert_eq!(
            err.to_string(),
            "Aura error: Aura storage unavailable for group:g1: disk I/O error"
        );
    }
}
