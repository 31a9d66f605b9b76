use async_trait::async_trait;
use reqwest::header::{ HeaderMap, HeaderValue, CONTENT_TYPE };
use reqwest::Client as HttpClient;
use serde_json::Value as JsonValue;

use super::{ build_http_client, extract_completion_text, AdvisorClient, AdvisorError };
use crate::llm::AdvisorConfig;
use crate::models::chat::{ AdvisorRequest, ChatMessage };

/// Talks to a proxy worker that holds the model credentials itself and only
/// expects `{ "messages": [...] }`.
pub struct WorkerAdvisorClient {
    http: HttpClient,
    url: String,
}

impl WorkerAdvisorClient {
    pub fn from_config(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(Self {
            http: build_http_client(config, headers)?,
            url: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl AdvisorClient for WorkerAdvisorClient {
    async fn request(&self, messages: &[ChatMessage]) -> Result<String, AdvisorError> {
        let body = AdvisorRequest { model: None, messages };
        let resp = self.http
            .post(&self.url)
            .json(&body)
            .send().await?
            .error_for_status()?
            .json::<JsonValue>().await?;
        Ok(extract_completion_text(&resp))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
