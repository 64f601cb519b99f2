//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::tone::CONFIDENCE_THRESHOLD;

/// Default tone analyzer endpoint.
pub const DEFAULT_TONE_ANALYZER_URL: &str =
    "https://gateway-wdc.watsonplatform.net/tone-analyzer/api";

/// Default tone analyzer API version date.
pub const DEFAULT_TONE_ANALYZER_VERSION: &str = "2017-09-21";

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// libSQL database path (`:memory:` for an in-memory database).
    pub db_path: String,
    /// Read-modify-write attempts per aura update before giving up.
    pub max_apply_attempts: u32,
    /// Minimum top-category confidence for a non-neutral tone.
    pub tone_threshold: f64,
    /// Tone analyzer settings. `None` runs without a classifier.
    pub classifier: Option<ClassifierConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: "./data/aura.db".to_string(),
            max_apply_attempts: 5,
            tone_threshold: CONFIDENCE_THRESHOLD,
            classifier: None,
        }
    }
}

impl EngineConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup. Unparsable values are
    /// ignored in favour of the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup("AURA_DB_PATH").unwrap_or(defaults.db_path);

        let max_apply_attempts = lookup("AURA_MAX_APPLY_ATTEMPTS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_apply_attempts);

        let tone_threshold = lookup("AURA_TONE_THRESHOLD")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.tone_threshold);

        Self {
            db_path,
            max_apply_attempts,
            tone_threshold,
            classifier: ClassifierConfig::from_lookup(&lookup),
        }
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_apply_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AURA_MAX_APPLY_ATTEMPTS".into(),
                message: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.tone_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "AURA_TONE_THRESHOLD".into(),
                message: format!("{} is outside 0.0..=1.0", self.tone_threshold),
            });
        }
        if self.db_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "AURA_DB_PATH".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Tone analyzer connection settings.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Service base URL (without the `/v3/tone` path).
    pub url: String,
    pub api_key: SecretString,
    /// API version date sent as the `version` query parameter.
    pub version: String,
    pub timeout: Duration,
}

impl ClassifierConfig {
    /// Returns `None` when no API key is set.
    fn from_lookup<F>(lookup: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("TONE_ANALYZER_API_KEY").filter(|k| !k.trim().is_empty())?;

        let url = lookup("TONE_ANALYZER_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TONE_ANALYZER_URL.to_string());

        let version = lookup("TONE_ANALYZER_VERSION")
            .unwrap_or_else(|| DEFAULT_TONE_ANALYZER_VERSION.to_string());

        let timeout_secs: u64 = lookup("TONE_ANALYZER_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Some(Self {
            url,
            api_key: SecretString::from(api_key),
            version,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = EngineConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.db_path, "./data/aura.db");
        assert_eq!(config.max_apply_attempts, 5);
        assert!((config.tone_threshold - 0.70).abs() < f64::EPSILON);
        assert!(config.classifier.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("AURA_DB_PATH", ":memory:"),
            ("AURA_MAX_APPLY_ATTEMPTS", "8"),
            ("AURA_TONE_THRESHOLD", "0.5"),
            ("TONE_ANALYZER_API_KEY", "secret"),
            ("TONE_ANALYZER_URL", "http://localhost:9000/"),
            ("TONE_ANALYZER_TIMEOUT_SECS", "3"),
        ]));
        assert_eq!(config.db_path, ":memory:");
        assert_eq!(config.max_apply_attempts, 8);
        assert!((config.tone_threshold - 0.5).abs() < f64::EPSILON);

        let classifier = config.classifier.unwrap();
        assert_eq!(classifier.url, "http://localhost:9000");
        assert_eq!(classifier.api_key.expose_secret(), "secret");
        assert_eq!(classifier.version, DEFAULT_TONE_ANALYZER_VERSION);
        assert_eq!(classifier.timeout, Duration::from_secs(3));
    }

    #[test]
    fn unparsable_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("AURA_MAX_APPLY_ATTEMPTS", "lots"),
            ("AURA_TONE_THRESHOLD", "high"),
        ]));
        assert_eq!(config.max_apply_attempts, 5);
        assert!((config.tone_threshold - CONFIDENCE_THRESHOLD).abs() < f64::EPSILON);
    }

    #[test]
    fn blank_api_key_means_no_classifier() {
        let config = EngineConfig::from_lookup(lookup_from(&[("TONE_ANALYZER_API_KEY", "  ")]));
        assert!(config.classifier.is_none());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero_attempts = EngineConfig {
            max_apply_attempts: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            zero_attempts.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let bad_threshold = EngineConfig {
            tone_threshold: 1.5,
            ..EngineConfig::default()
        };
        assert!(bad_threshold.validate().is_err());

        let no_path = EngineConfig {
            db_path: " ".into(),
            ..EngineConfig::default()
        };
        assert!(no_path.validate().is_err());
    }
}
