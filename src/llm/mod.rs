pub mod chat;
pub mod messages;

use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorType {
    /// A proxy worker that forwards `{messages}` to a hosted model.
    Worker,
    /// A direct OpenAI-compatible chat completions endpoint.
    OpenAI,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseAdvisorTypeError {
    message: String,
}

impl fmt::Display for ParseAdvisorTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseAdvisorTypeError {}

impl FromStr for AdvisorType {
    type Err = ParseAdvisorTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "worker" => Ok(AdvisorType::Worker),
            "openai" => Ok(AdvisorType::OpenAI),
            _ =>
                Err(ParseAdvisorTypeError {
                    message: format!("Invalid advisor type: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for AdvisorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvisorType::Worker => write!(f, "worker"),
            AdvisorType::OpenAI => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub advisor_type: AdvisorType,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            advisor_type: AdvisorType::Worker,
            endpoint: chat::DEFAULT_WORKER_URL.to_string(),
            api_key: None,
            model: None,
            timeout_secs: 60,
        }
    }
}
