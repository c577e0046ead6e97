//! Streaming chat session
//!
//! Plain multi-turn chat without capabilities. The session owns its
//! transcript; an exchange is only committed once the model has answered.

use std::sync::Arc;

use crate::agent::transcript::Transcript;
use crate::core::{Config, Message, RagentError, Result};
use crate::llm::{GenerateOptions, LLMProvider, StreamCallback};

pub struct ChatSession {
    llm: Arc<dyn LLMProvider>,
    model: String,
    transcript: Transcript,
    options: GenerateOptions,
}

impl ChatSession {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            transcript: Transcript::with_system_prompt(system_prompt),
            options: GenerateOptions {
                temperature: Some(0.7),
                ..Default::default()
            },
        }
    }

    /// Session using the configured answering model and chat prompt
    pub fn from_config(config: &Config, llm: Arc<dyn LLMProvider>) -> Self {
        Self::new(
            llm,
            config.models.answering.clone(),
            config.agent.chat_system_prompt.clone(),
        )
    }

    /// Send one user message and return the full reply.
    ///
    /// With `on_token` the reply is streamed through the callback as it arrives.
    pub async fn send(&mut self, input: &str, on_token: Option<StreamCallback>) -> Result<String> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RagentError::invalid_input("Message is required"));
        }

        let mut messages = self.transcript.messages();
        messages.push(Message::user(input));

        tracing::debug!(
            model = %self.model,
            history = self.transcript.len(),
            streaming = on_token.is_some(),
            "sending chat message"
        );

        let response = match on_token {
            Some(callback) => {
                self.llm
                    .chat_stream(&self.model, &messages, Some(self.options.clone()), callback)
                    .await?
            }
            None => {
                self.llm
                    .chat(&self.model, &messages, Some(self.options.clone()))
                    .await?
            }
        };

        self.transcript.add_user(input);
        self.transcript.add_assistant(response.content.clone());

        Ok(response.content)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Forget the exchanges so far
    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}
