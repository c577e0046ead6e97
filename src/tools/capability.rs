//! Capability interface
//!
//! A capability is a named operation the model can ask for. `execute` never
//! fails in the Rust sense: every problem comes back as
//! [`CapabilityOutput::Error`] so the orchestrator can hand it to the model.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::core::ToolDefinition;

/// Payload returned to the model for an unregistered capability name
pub const UNKNOWN_CAPABILITY: &str = "unknown capability";

/// Outcome of a capability invocation
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityOutput {
    /// Capability-specific JSON payload
    Success(Value),
    /// Structured failure, serialized as `{"error": "..."}`
    Error(String),
}

impl CapabilityOutput {
    /// Create a successful output
    pub fn success(payload: Value) -> Self {
        Self::Success(payload)
    }

    /// Create an error output
    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    /// Output used when the model names a capability that is not registered
    pub fn unknown_capability() -> Self {
        Self::Error(UNKNOWN_CAPABILITY.to_string())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The JSON handed back to the model
    pub fn to_json(&self) -> Value {
        match self {
            Self::Success(payload) => payload.clone(),
            Self::Error(msg) => json!({ "error": msg }),
        }
    }
}

impl Serialize for CapabilityOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Contract every retrieval tool satisfies
#[async_trait]
pub trait Capability: Send + Sync {
    /// Unique registry key, also the function name the model sees
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// JSON Schema of the structured input
    fn input_schema(&self) -> Value;

    /// Validate `input` and run the capability
    async fn execute(&self, input: Value) -> CapabilityOutput;

    /// Tool definition advertised to the model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), self.input_schema())
    }
}

/// Deserialize capability input into its typed argument struct.
///
/// Argument structs use `deny_unknown_fields`, so this is the schema check.
pub fn parse_input<T: DeserializeOwned>(input: Value) -> std::result::Result<T, CapabilityOutput> {
    serde_json::from_value(input)
        .map_err(|e| CapabilityOutput::error(format!("Invalid input: {}", e)))
}
