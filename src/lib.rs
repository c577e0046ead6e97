//! Ragent - Tool-Orchestrating Retrieval Agent
//!
//! Answers a question by letting a language model decide, one bounded step
//! at a time, whether to search a vector knowledge base, search the web, or
//! answer directly. Every answer comes back with the sources it rests on.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Provider abstraction with an OpenAI-compatible client
//! - **Tools**: Capability interface, registry, knowledge base and web search
//! - **Agent**: Reasoning loop, source normalization, chat sessions
//! - **Server**: HTTP front end (`POST /api/ask`)
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use ragent::{Agent, Config};
//!
//! #[tokio::main]
//! async fn main() -> ragent::Result<()> {
//!     let agent = Agent::from_config(Config::load())?;
//!     let result = agent.ask("What is the refund policy?").await?;
//!     println!("{} ({:?})", result.answer, result.tool_used);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod server;
pub mod tools;

// Re-export commonly used items
pub use agent::{Agent, AgentResult, Source};
pub use cli::Repl;
pub use core::{Config, RagentError, Result};
