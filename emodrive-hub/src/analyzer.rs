//! Emotion analyzer client
//!
//! Talks to an emotext-compatible HTTP service: the text goes out as a
//! `text/plain` POST body, the answer comes back as
//! `{"emotions": {...}, "polarity": {...}}`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use emodrive_core::{EmoError, EmoResult, EmotionMeasurement};

/// Default emotext endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:9003/";

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Text -> emotion measurement
#[async_trait]
pub trait EmotionAnalyzer: Send + Sync {
    /// Analyze one text; any transport or decode failure is an
    /// `EmoError::Analysis`
    async fn analyze(&self, text: &str) -> EmoResult<EmotionMeasurement>;
}

/// HTTP client for an emotext server
#[derive(Clone, Debug)]
pub struct EmotextClient {
    client: reqwest::Client,
    endpoint: String,
}

impl EmotextClient {
    pub fn new(endpoint: impl Into<String>) -> EmoResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EmoError::config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmotionAnalyzer for EmotextClient {
    async fn analyze(&self, text: &str) -> EmoResult<EmotionMeasurement> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(text.to_string())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EmoError::analysis(format!("emotext request failed: {}", e)))?;

        let measurement = response
            .json::<EmotionMeasurement>()
            .await
            .map_err(|e| EmoError::analysis(format!("emotext response undecodable: {}", e)))?;

        debug!(
            "emotext: {} emotions, {} polarity entries",
            measurement.emotions.len(),
            measurement.polarity.len()
        );
        Ok(measurement)
    }
}
