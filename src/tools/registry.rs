//! Tool registry - maps capability names to implementations
//!
//! Built once, then frozen and shared read-only between concurrent questions.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{Config, RagentError, Result, ToolCall, ToolDefinition};
use crate::llm::OpenAiClient;
use crate::tools::capability::{Capability, CapabilityOutput};
use crate::tools::knowledge_base::{KnowledgeBaseSearch, SupabaseRetriever};
use crate::tools::web_search::{OpenAiWebSearch, WebSearch};

/// Registry of available capabilities
pub struct ToolRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
    /// Definitions sorted by name, computed once at build time
    definitions: Vec<ToolDefinition>,
}

/// Builder that validates names while capabilities are registered
#[derive(Default)]
pub struct ToolRegistryBuilder {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl ToolRegistryBuilder {
    /// Register a capability; names must be non-empty and unique
    pub fn register(mut self, capability: Arc<dyn Capability>) -> Result<Self> {
        let name = capability.name().to_string();

        if name.trim().is_empty() {
            return Err(RagentError::config("capability name must not be empty"));
        }
        if self.capabilities.contains_key(&name) {
            return Err(RagentError::config(format!(
                "capability '{}' is already registered",
                name
            )));
        }

        tracing::debug!(capability = %name, "registered capability");
        self.capabilities.insert(name, capability);
        Ok(self)
    }

    /// Freeze the registry
    pub fn build(self) -> ToolRegistry {
        let mut definitions: Vec<ToolDefinition> = self
            .capabilities
            .values()
            .map(|capability| capability.definition())
            .collect();
        definitions.sort_by(|a, b| a.function.name.cmp(&b.function.name));

        ToolRegistry {
            capabilities: self.capabilities,
            definitions,
        }
    }
}

impl ToolRegistry {
    /// Start building a registry
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// A registry with no capabilities; the model can only answer directly
    pub fn empty() -> Self {
        Self::builder().build()
    }

    /// Registry with the built-in knowledge base and web search capabilities.
    ///
    /// The knowledge base is skipped when its backend is not configured.
    pub fn from_config(config: &Config, client: &OpenAiClient) -> Result<Self> {
        let mut builder = Self::builder();

        if config.knowledge_base_configured() {
            let retriever = SupabaseRetriever::from_config(config, client.clone())?;
            let description = format!(
                "Retrieve specific information about {} to answer user questions.",
                config.knowledge_base.description
            );
            builder = builder.register(Arc::new(
                KnowledgeBaseSearch::new(Arc::new(retriever)).with_description(description),
            ))?;
        } else {
            tracing::warn!("knowledge base not configured, knowledgeBaseSearch disabled");
        }

        let web = OpenAiWebSearch::new(client.clone(), config.models.answering.clone());
        builder = builder.register(Arc::new(WebSearch::new(Arc::new(web))))?;

        Ok(builder.build())
    }

    /// Get all tool definitions, sorted by name
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Check whether a capability is registered
    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Get a capability by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.get(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.definitions
            .iter()
            .map(|d| d.function.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Execute a tool call; unknown names yield an error payload, never a failure
    pub async fn execute(&self, tool_call: &ToolCall) -> CapabilityOutput {
        match self.capabilities.get(&tool_call.name) {
            Some(capability) => {
                tracing::debug!(
                    capability = %tool_call.name,
                    call_id = %tool_call.id,
                    "executing capability"
                );
                capability.execute(tool_call.arguments.clone()).await
            }
            None => {
                tracing::warn!(
                    capability = %tool_call.name,
                    call_id = %tool_call.id,
                    "model requested an unknown capability"
                );
                CapabilityOutput::unknown_capability()
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
