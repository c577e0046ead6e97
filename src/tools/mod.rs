//! Tools module - capabilities the agent can invoke
//!
//! Contains the capability interface, the built-in knowledge base and web
//! search capabilities, and the tool registry.

pub mod capability;
pub mod knowledge_base;
pub mod registry;
pub mod web_search;

pub use capability::{Capability, CapabilityOutput, UNKNOWN_CAPABILITY};
pub use knowledge_base::{DocumentRetriever, KnowledgeBaseSearch, RetrievedDocument, KNOWLEDGE_BASE_SEARCH};
pub use registry::{ToolRegistry, ToolRegistryBuilder};
pub use web_search::{WebHit, WebSearch, WebSearchBackend, WEB_SEARCH};
