use serde::Deserialize;
use std::path::Path;
use std::time::SystemTime;
use log::info;
use thiserror::Error;

pub const CHAT_SYSTEM_PROMPT: &str =
    "You are a L'Oréal product & routine advisor. Provide concise, practical routines and explanations.";
pub const ROUTINE_SYSTEM_PROMPT: &str =
    "You are a L'Oréal product & routine advisor. Provide clear AM/PM routines using the provided product data.";
pub const ROUTINE_REQUEST_PROMPT: &str =
    "Create a concise, step-by-step routine using the selected products. Include AM/PM and one short tip.";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt file IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Prompt JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Instruction texts sent to the advisor. Every field falls back to the
/// built-in wording when absent from the prompts file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    pub chat_system: String,
    pub routine_system: String,
    pub routine_request: String,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            chat_system: CHAT_SYSTEM_PROMPT.to_string(),
            routine_system: ROUTINE_SYSTEM_PROMPT.to_string(),
            routine_request: ROUTINE_REQUEST_PROMPT.to_string(),
            last_loaded: None,
        }
    }
}

pub fn load_prompts_from_str(json: &str) -> Result<PromptConfig, PromptError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<PromptConfig, PromptError> {
    let file_content = std::fs::read_to_string(&path)?;
    let mut config = load_prompts_from_str(&file_content)?;
    config.last_loaded = Some(SystemTime::now());
    Ok(config)
}

pub fn reload_prompts_if_changed<P: AsRef<Path>>(
    path: P,
    current_config: &PromptConfig
) -> Result<Option<PromptConfig>, PromptError> {
    let metadata = std::fs::metadata(&path)?;

    if let Ok(modified) = metadata.modified() {
        match current_config.last_loaded {
            Some(last_loaded) if modified <= last_loaded => {}
            Some(_) => {
                info!("Prompts file changed, reloading...");
                return Ok(Some(load_prompts(path)?));
            }
            None => {
                info!("No last_loaded timestamp, reloading prompts...");
                return Ok(Some(load_prompts(path)?));
            }
        }
    }
    Ok(None)
}
