//! Projection of the selection and conversation into advisor requests.
//!
//! Two framings exist on purpose: chat turns describe the selection as a
//! bulleted prose digest, routine requests embed it as pretty-printed JSON.
//! The model on the other end is prompted with exactly these shapes, so the
//! wording below is part of the contract.

use crate::config::prompt::PromptConfig;
use crate::models::chat::ChatMessage;
use crate::models::product::{ Product, ProductSummary };

/// `"Selected products:\n• brand — name: description\n...\n"`, or an empty
/// string when there is nothing to describe.
pub fn selection_digest(selection: &[Product]) -> String {
    if selection.is_empty() {
        return String::new();
    }
    let lines = selection
        .iter()
        .map(|p| format!("• {} — {}: {}", p.brand, p.name, p.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Selected products:\n{}\n", lines)
}

pub fn build_chat_request(
    prompts: &PromptConfig,
    selection: &[Product],
    history: &[ChatMessage],
    user_text: &str,
    include_selection: bool
) -> Vec<ChatMessage> {
    let digest = if include_selection { selection_digest(selection) } else { String::new() };

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(prompts.chat_system.as_str()));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(format!("{}\nUser request: {}", digest, user_text)));
    messages
}

pub fn serialize_selection(selection: &[Product]) -> Vec<ProductSummary> {
    selection.iter().map(ProductSummary::from).collect()
}

/// Builds a standalone routine request; prior chat turns are never included.
/// Callers are responsible for refusing an empty selection.
pub fn build_routine_request(
    prompts: &PromptConfig,
    selection: &[Product],
    user_prompt: &str
) -> Result<Vec<ChatMessage>, serde_json::Error> {
    let products_json = serde_json::to_string_pretty(&serialize_selection(selection))?;

    Ok(
        vec![
            ChatMessage::system(prompts.routine_system.as_str()),
            ChatMessage::user(
                format!("SelectedProductsJson:\n{}\n\nRequest: {}", products_json, user_prompt)
            )
        ]
    )
}
