//! Conversation transcript
//!
//! Ordered, role-tagged model context. A transcript is owned by whoever
//! drives it (one question, or one chat session) and only ever grows.

use crate::core::{Message, Role, ToolCall};

/// Append-only message history with an optional system prompt
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    /// System prompt (always sent first)
    system_prompt: Option<String>,
    /// Message history
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transcript seeded with a system prompt
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(prompt.into()),
            messages: Vec::new(),
        }
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Add a user message
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Add an assistant message
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// Add the assistant message that requested capabilities
    pub fn add_tool_requests(&mut self, content: impl Into<String>, calls: Vec<ToolCall>) {
        self.push(Message::assistant_with_tool_calls(content, calls));
    }

    /// Add a capability result answering `call_id`
    pub fn add_tool_result(&mut self, call_id: impl Into<String>, content: impl Into<String>) {
        self.push(Message::tool(call_id, content));
    }

    /// Append any message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get all messages including system prompt, ready to send
    pub fn messages(&self) -> Vec<Message> {
        let mut result = Vec::with_capacity(self.messages.len() + 1);

        if let Some(ref prompt) = self.system_prompt {
            result.push(Message::system(prompt.clone()));
        }

        result.extend(self.messages.iter().cloned());
        result
    }

    /// Get messages without system prompt
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last user message
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// Get the last assistant message
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Start over; the system prompt is kept
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Get message count (system prompt excluded)
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
