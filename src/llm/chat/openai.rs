use async_trait::async_trait;
use log::debug;
use reqwest::header::{ HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE };
use reqwest::Client as HttpClient;
use serde_json::Value as JsonValue;

use super::{ build_http_client, extract_completion_text, AdvisorClient, AdvisorError };
use crate::llm::AdvisorConfig;
use crate::models::chat::{ AdvisorRequest, ChatMessage };

const DEFAULT_MODEL: &str = "gpt-4o";
const COMPLETIONS_ROUTE: &str = "/v1/chat/completions";

pub struct OpenAIAdvisorClient {
    http: HttpClient,
    url: String,
    model: String,
}

impl OpenAIAdvisorClient {
    pub fn new(
        api_key: &str,
        model: Option<String>,
        base_url: &str,
        config: &AdvisorConfig
    ) -> Result<Self, AdvisorError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| AdvisorError::Config(format!("Invalid API key format: {}", e)))?
        );

        let url = if base_url.ends_with(COMPLETIONS_ROUTE) {
            base_url.to_string()
        } else {
            format!("{}{}", base_url.trim_end_matches('/'), COMPLETIONS_ROUTE)
        };

        Ok(Self {
            http: build_http_client(config, headers)?,
            url,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn from_config(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let api_key = config.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AdvisorError::Config("OpenAI API key is required".to_string()))?;
        Self::new(api_key, config.model.clone(), &config.endpoint, config)
    }
}

#[async_trait]
impl AdvisorClient for OpenAIAdvisorClient {
    async fn request(&self, messages: &[ChatMessage]) -> Result<String, AdvisorError> {
        debug!("Sending {} messages to {} ({})", messages.len(), self.url, self.model);
        let body = AdvisorRequest { model: Some(self.model.as_str()), messages };
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::AdvisorType;

    fn config(endpoint: &str) -> AdvisorConfig {
        AdvisorConfig {
            advisor_type: AdvisorType::OpenAI,
            endpoint: endpoint.to_string(),
            api_key: Some("sk-test".to_string()),
            model: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn appends_completions_route_once() {
        let client = OpenAIAdvisorClient::from_config(&config("https://api.openai.com/")).unwrap();
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(client.model, DEFAULT_MODEL);

        let full = OpenAIAdvisorClient::from_config(
            &config("https://proxy.example/v1/chat/completions")
        ).unwrap();
        assert_eq!(full.endpoint(), "https://proxy.example/v1/chat/completions");
    }
}
