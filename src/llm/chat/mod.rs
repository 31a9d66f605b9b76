pub mod openai;
pub mod worker;

use async_trait::async_trait;
use log::error;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::{ AdvisorConfig, AdvisorType };
use crate::models::chat::ChatMessage;
use self::openai::OpenAIAdvisorClient;
use self::worker::WorkerAdvisorClient;

pub const DEFAULT_WORKER_URL: &str = "https://lorealbotworker.ams63tube.workers.dev/";

/// Returned in place of a reply whenever the advisor cannot be reached or
/// answers with something unusable.
pub const APOLOGY: &str = "Sorry — something went wrong calling the AI service.";

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("Advisor request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Advisor response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Advisor configuration error: {0}")]
    Config(String),
}

#[async_trait]
pub trait AdvisorClient: Send + Sync {
    /// Performs one round trip and returns the reply text, surfacing every
    /// failure.
    async fn request(&self, messages: &[ChatMessage]) -> Result<String, AdvisorError>;

    fn endpoint(&self) -> &str;

    /// Like `request`, but never fails: errors are logged and replaced with
    /// [`APOLOGY`].
    async fn send(&self, messages: &[ChatMessage]) -> String {
        match self.request(messages).await {
            Ok(text) => text,
            Err(e) => {
                error!("Advisor call to {} failed: {}", self.endpoint(), e);
                APOLOGY.to_string()
            }
        }
    }
}

/// `choices[0].message.content` when it is a non-empty string, otherwise the
/// whole response serialized back to JSON.
pub fn extract_completion_text(body: &JsonValue) -> String {
    body.pointer("/choices/0/message/content")
        .and_then(JsonValue::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

pub(crate) fn build_http_client(
    config: &AdvisorConfig,
    headers: reqwest::header::HeaderMap
) -> Result<reqwest::Client, AdvisorError> {
    Ok(
        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?
    )
}

pub fn new_client(config: &AdvisorConfig) -> Result<Arc<dyn AdvisorClient>, AdvisorError> {
    let client: Arc<dyn AdvisorClient> = match config.advisor_type {
        AdvisorType::Worker => {
            let specific_client = WorkerAdvisorClient::from_config(config)?;
            Arc::new(specific_client)
        }
        AdvisorType::OpenAI => {
            let specific_client = OpenAIAdvisorClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}
