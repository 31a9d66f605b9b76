use crate::models::chat::{ ChatMessage, Role };

/// Session-scoped chat history. Only user and assistant turns are kept; the
/// system instruction is synthesized for each request.
#[derive(Clone, Debug, Default)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Appends `message` unless it is a system entry, which is refused.
    pub fn append(&mut self, message: ChatMessage) -> bool {
        if message.role == Role::System {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub fn format_history_for_display(log: &ConversationLog) -> String {
    let mut result = String::new();
    for msg in log.messages() {
        let role_display = match msg.role {
            Role::User => "You",
            Role::Assistant => "Advisor",
            Role::System => "System",
        };
        result.push_str(&format!("{}: {}\n", role_display, msg.content));
    }
    result
}
