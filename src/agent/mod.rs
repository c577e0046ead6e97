//! Agent module - orchestration and conversation management
//!
//! Contains the reasoning loop that coordinates model calls and capability
//! execution, source normalization, and the streaming chat session.

pub mod chat;
pub mod orchestrator;
pub mod prompts;
pub mod sources;
pub mod transcript;
pub mod turn;

pub use chat::ChatSession;
pub use orchestrator::{Agent, AgentRun};
pub use sources::{AgentResult, Normalized, Source, SourceNormalizer, SourcePrecedence};
pub use transcript::Transcript;
pub use turn::{CapabilityResult, LoopState, LoopStatus, Turn, TurnError};
