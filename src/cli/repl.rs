//! Interactive REPL for Ragent
//!
//! Two modes share one loop: `agent` answers each line with the retrieval
//! agent, `chat` keeps a streaming conversation going.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::agent::{Agent, AgentResult, ChatSession, Source};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::Result;

/// What plain input lines are sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Agent,
    Chat,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "agent" | "ask" => Some(Mode::Agent),
            "chat" => Some(Mode::Chat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Agent => "agent",
            Mode::Chat => "chat",
        }
    }
}

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    agent: Arc<Agent>,
    chat: ChatSession,
    mode: Mode,
    questions: usize,
}

impl Repl {
    /// Create a REPL around an existing agent
    pub fn new(agent: Arc<Agent>, mode: Mode) -> Self {
        let chat = ChatSession::from_config(agent.config(), agent.llm());
        Self {
            agent,
            chat,
            mode,
            questions: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Forget the chat history and question count
    pub fn clear(&mut self) {
        self.chat.clear();
        self.questions = 0;
    }

    /// Summary shown by the `status` command
    pub fn status_text(&self) -> String {
        let config = self.agent.config();
        let capabilities = self.agent.tools().names();
        format!(
            "Ragent Status:\n\
             ─────────────────────────────\n\
             Mode:         {}\n\
             Model:        {}\n\
             Endpoint:     {}\n\
             Capabilities: {}\n\
             Max steps:    {}\n\
             Questions:    {}\n\
             Chat history: {} messages\n\
             Streaming:    {}\n\
             Debug:        {}",
            self.mode.as_str(),
            config.models.answering,
            config.openai.base_url,
            if capabilities.is_empty() {
                "none".to_string()
            } else {
                capabilities.join(", ")
            },
            config.agent.max_steps,
            self.questions,
            self.chat.transcript().len(),
            if config.streaming.enabled { "on" } else { "off" },
            if config.agent.debug { "on" } else { "off" }
        )
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("{}> ", self.mode.as_str());
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, self) {
                CommandResult::Exit => {
                    println!("\nGoodbye!");
                    break;
                }
                CommandResult::Handled(output) => {
                    println!("{}\n", output);
                }
                CommandResult::Continue(line) => match self.mode {
                    Mode::Agent => self.ask(&line).await,
                    Mode::Chat => self.chat(&line).await,
                },
            }
        }

        Ok(())
    }

    async fn ask(&mut self, question: &str) {
        match self.agent.ask(question).await {
            Ok(result) => {
                self.questions += 1;
                println!("\n{}\n", render_result(&result));
            }
            Err(e) => eprintln!("\nError: {}\n", e),
        }
    }

    async fn chat(&mut self, input: &str) {
        let config = self.agent.config();
        let stream = config.streaming.enabled && config.streaming.print_tokens;

        println!();
        let on_token: Option<crate::llm::StreamCallback> = if stream {
            Some(Box::new(|token: &str| {
                print!("{}", token);
                let _ = io::stdout().flush();
            }))
        } else {
            None
        };

        match self.chat.send(input, on_token).await {
            Ok(_) if stream => println!("\n"),
            Ok(reply) => println!("{}\n", reply),
            Err(e) => eprintln!("Error: {}\n", e),
        }
    }

    /// Print the startup banner
    fn print_banner(&self) {
        let config = self.agent.config();

        println!();
        println!("Ragent - retrieval agent");
        println!("Endpoint:   {}", config.openai.base_url);
        println!("Model:      {}", config.models.answering);
        println!("Mode:       {}", self.mode.as_str());
        println!();
        println!("Commands: help, clear, status, mode [agent|chat], exit");
        println!("───────────────────────────────────────────────────────────");
    }
}

/// Format an answer with its citations for the terminal
pub fn render_result(result: &AgentResult) -> String {
    let mut out = result.answer.clone();

    if let Some(tool) = &result.tool_used {
        out.push_str(&format!("\n\n[via {}]", tool));
    }

    if let Some(sources) = result.sources.as_ref().filter(|s| !s.is_empty()) {
        out.push_str("\nSources:");
        for (i, source) in sources.iter().enumerate() {
            let line = match source {
                Source::KnowledgeBase {
                    content,
                    similarity,
                    ..
                } => format!("{:.2}  {}", similarity, first_line(content, 80)),
                Source::Web { title, url, .. } => format!("{} <{}>", title, url),
            };
            out.push_str(&format!("\n  {}. {}", i + 1, line));
        }
    }

    out
}

fn first_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max_chars {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}
