//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::cli::repl::{Mode, Repl};

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
}

/// Parse and handle special commands
pub fn handle_command(input: &str, repl: &mut Repl) -> CommandResult {
    let input = input.trim();
    let mut parts = input.splitn(2, ' ');
    let cmd = parts.next().unwrap_or_default().to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    match cmd.as_str() {
        "exit" | "quit" | "q" => CommandResult::Exit,

        "clear" | "reset" => {
            repl.clear();
            CommandResult::Handled("Conversation cleared.".to_string())
        }

        "help" | "?" => CommandResult::Handled(help_text()),

        "status" => CommandResult::Handled(repl.status_text()),

        "mode" => {
            if args.is_empty() {
                return CommandResult::Handled(format!("Current mode: {}", repl.mode().as_str()));
            }
            match Mode::parse(args) {
                Some(mode) => {
                    repl.set_mode(mode);
                    CommandResult::Handled(format!("Mode set to: {}", mode.as_str()))
                }
                None => CommandResult::Handled(format!(
                    "Unknown mode: {}. Available: agent, chat",
                    args
                )),
            }
        }

        _ => {
            // Not a command, treat as normal input
            if input.starts_with('/') {
                CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                ))
            } else {
                CommandResult::Continue(input.to_string())
            }
        }
    }
}

/// Generate help text
fn help_text() -> String {
    r#"Ragent Commands:
─────────────────────────────────────────────
  help, ?              Show this help message
  exit, quit, q        Exit Ragent
  clear, reset         Clear chat history
  status               Show current configuration
  mode [agent|chat]    Show or switch the input mode

Modes:
  agent   Each line is a question; the agent may search the
          knowledge base or the web and cites its sources
  chat    Streaming conversation without capabilities

Keyboard Shortcuts:
  Ctrl+D           Exit Ragent
─────────────────────────────────────────────"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::core::{Config, Message, Result, ToolDefinition};
    use crate::llm::{GenerateOptions, LLMProvider, LLMResponse, StreamCallback};
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Silent;

    #[async_trait]
    impl LLMProvider for Silent {
        async fn chat(
            &self,
            _model: &str,
            _messages: &[Message],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            Ok(LLMResponse::default())
        }

        async fn chat_with_tools(
            &self,
            _model: &str,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            Ok(LLMResponse::default())
        }

        async fn chat_stream(
            &self,
            _model: &str,
            _messages: &[Message],
            _options: Option<GenerateOptions>,
            _on_token: StreamCallback,
        ) -> Result<LLMResponse> {
            Ok(LLMResponse::default())
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    fn repl() -> Repl {
        let agent = Agent::new(
            Config::default(),
            Arc::new(Silent),
            Arc::new(ToolRegistry::empty()),
        );
        Repl::new(Arc::new(agent), Mode::Agent)
    }

    #[test]
    fn test_exit_aliases() {
        let mut repl = repl();
        for cmd in ["exit", "quit", "q", "QUIT"] {
            assert_eq!(handle_command(cmd, &mut repl), CommandResult::Exit);
        }
    }

    #[test]
    fn test_mode_switch() {
        let mut repl = repl();
        handle_command("mode chat", &mut repl);
        assert_eq!(repl.mode(), Mode::Chat);

        let out = handle_command("mode bogus", &mut repl);
        assert!(matches!(out, CommandResult::Handled(ref s) if s.contains("Unknown mode")));
        assert_eq!(repl.mode(), Mode::Chat);
    }

    #[test]
    fn test_plain_input_passes_through() {
        let mut repl = repl();
        assert_eq!(
            handle_command("What is the refund policy?", &mut repl),
            CommandResult::Continue("What is the refund policy?".to_string())
        );
    }

    #[test]
    fn test_status_lists_mode_and_steps() {
        let mut repl = repl();
        let CommandResult::Handled(status) = handle_command("status", &mut repl) else {
            panic!("status should be handled");
        };
        assert!(status.contains("Mode:         agent"));
        assert!(status.contains("Max steps:    3"));
        assert!(status.contains("Capabilities: none"));
    }

    #[test]
    fn test_unknown_slash_command() {
        let mut repl = repl();
        let out = handle_command("/frobnicate", &mut repl);
        assert!(matches!(out, CommandResult::Handled(ref s) if s.contains("Unknown command")));
    }
}
