//! IBM Watson Tone Analyzer client (v3 `tone` endpoint, emotion tones).

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::classification::ToneScore;
use super::classifier::ToneClassifier;
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;

const SERVICE: &str = "watson";

/// Tone analyzer reached over HTTPS with IAM API-key basic auth.
pub struct WatsonToneAnalyzer {
    config: ClassifierConfig,
    client: reqwest::Client,
}

impl WatsonToneAnalyzer {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassifierError::RequestFailed {
                service: SERVICE.into(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }

    fn tone_url(&self) -> String {
        format!("{}/v3/tone", self.config.url)
    }
}

#[async_trait]
impl ToneClassifier for WatsonToneAnalyzer {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn classify(&self, text: &str) -> Result<Vec<ToneScore>, ClassifierError> {
        let resp = self
            .client
            .post(self.tone_url())
            .query(&[
                ("version", self.config.version.as_str()),
                ("sentences", "false"),
                ("tones", "emotion"),
            ])
            .basic_auth("apikey", Some(self.config.api_key.expose_secret()))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| ClassifierError::RequestFailed {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ClassifierError::AuthFailed {
                service: SERVICE.into(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(std::time::Duration::from_secs);
            return Err(ClassifierError::RateLimited {
                service: SERVICE.into(),
                retry_after,
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::RequestFailed {
                service: SERVICE.into(),
                reason: format!("HTTP {status}: {}", body.chars().take(200).collect::<String>()),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ClassifierError::InvalidResponse {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;
        parse_tone_analysis(&body)
    }
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ToneAnalysis {
    document_tone: DocumentTone,
}

#[derive(Debug, Deserialize)]
struct DocumentTone {
    #[serde(default)]
    tones: Option<Vec<WatsonTone>>,
}

#[derive(Debug, Deserialize)]
struct WatsonTone {
    score: f64,
    tone_id: String,
}

/// Parse a `/v3/tone` response body into scores, highest first.
fn parse_tone_analysis(body: &str) -> Result<Vec<ToneScore>, ClassifierError> {
    let analysis: ToneAnalysis =
        serde_json::from_str(body).map_err(|e| ClassifierError::InvalidResponse {
            service: SERVICE.into(),
            reason: format!("JSON parse error: {e}"),
        })?;

    let mut scores: Vec<ToneScore> = analysis
        .document_tone
        .tones
        .unwrap_or_default()
        .into_iter()
        .map(|t| ToneScore::new(t.tone_id, t.score))
        .collect();
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(scores)
}
