//! Source normalization
//!
//! Turns whatever the winning capability returned into the one `Source`
//! shape callers render, and decides which capability gets reported as
//! `toolUsed`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::turn::Turn;
use crate::tools::{CapabilityOutput, RetrievedDocument, WebHit, KNOWLEDGE_BASE_SEARCH, WEB_SEARCH};

/// A citation backing an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Source {
    /// A chunk from the vector knowledge base
    KnowledgeBase {
        content: String,
        metadata: Value,
        similarity: f64,
    },
    /// A page found by web search
    Web {
        title: String,
        url: String,
        snippet: String,
    },
}

impl From<RetrievedDocument> for Source {
    fn from(doc: RetrievedDocument) -> Self {
        Source::KnowledgeBase {
            content: doc.content,
            metadata: doc.metadata,
            similarity: doc.similarity,
        }
    }
}

impl From<WebHit> for Source {
    fn from(hit: WebHit) -> Self {
        Source::Web {
            title: hit.title,
            url: hit.url,
            snippet: hit.snippet,
        }
    }
}

/// What the caller gets back for a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    /// Never empty
    pub answer: String,
    /// `None` when no capability produced citable material
    pub sources: Option<Vec<Source>>,
    /// Capability credited for the answer
    pub tool_used: Option<String>,
}

impl AgentResult {
    /// An answer with no capability involvement
    pub fn direct(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: None,
            tool_used: None,
        }
    }
}

/// Order in which capabilities are credited when several ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePrecedence(Vec<String>);

impl SourcePrecedence {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    fn rank(&self, name: &str) -> usize {
        self.0
            .iter()
            .position(|n| n == name)
            .unwrap_or(self.0.len())
    }
}

impl Default for SourcePrecedence {
    /// Knowledge base first: internal documents are the stronger provenance
    fn default() -> Self {
        Self::new([KNOWLEDGE_BASE_SEARCH, WEB_SEARCH])
    }
}

/// Classification output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub tool_used: Option<String>,
    pub sources: Option<Vec<Source>>,
}

/// Maps turns to `toolUsed` and `sources`
#[derive(Debug, Clone, Default)]
pub struct SourceNormalizer {
    precedence: SourcePrecedence,
}

impl SourceNormalizer {
    pub fn new(precedence: SourcePrecedence) -> Self {
        Self { precedence }
    }

    /// Pick the capability to credit.
    ///
    /// Only registered capabilities count. Ties in precedence go to the one
    /// requested first.
    pub fn classify_tool_used(&self, turns: &[Turn]) -> Option<String> {
        turns
            .iter()
            .flat_map(Turn::known_requests)
            .enumerate()
            .min_by_key(|(position, name)| (self.precedence.rank(name), *position))
            .map(|(_, name)| name.to_string())
    }

    /// Classify and convert the credited capability's payload into sources
    pub fn normalize(&self, turns: &[Turn]) -> Normalized {
        let Some(tool_used) = self.classify_tool_used(turns) else {
            return Normalized::default();
        };

        let sources = turns
            .iter()
            .flat_map(|t| t.results())
            .filter(|r| r.name == tool_used)
            .find_map(|r| match &r.output {
                CapabilityOutput::Success(payload) => sources_from_payload(&tool_used, payload),
                CapabilityOutput::Error(msg) => {
                    tracing::debug!(capability = %tool_used, error = %msg, "skipping error payload");
                    None
                }
            });

        tracing::debug!(
            tool_used = %tool_used,
            sources = sources.as_ref().map(Vec::len),
            "normalized sources"
        );

        Normalized {
            tool_used: Some(tool_used),
            sources,
        }
    }
}

/// Convert one success payload; informational payloads yield `None`
pub fn sources_from_payload(capability: &str, payload: &Value) -> Option<Vec<Source>> {
    match capability {
        KNOWLEDGE_BASE_SEARCH => {
            let docs: Vec<RetrievedDocument> =
                decode_items(capability, payload.get("retrievedDocuments")?)?;
            Some(docs.into_iter().map(Source::from).collect())
        }
        WEB_SEARCH => {
            let hits: Vec<WebHit> = decode_items(capability, payload.get("results")?)?;
            Some(hits.into_iter().map(Source::from).collect())
        }
        _ => None,
    }
}

fn decode_items<T: DeserializeOwned>(capability: &str, items: &Value) -> Option<Vec<T>> {
    match serde_json::from_value(items.clone()) {
        Ok(items) => Some(items),
        Err(e) => {
            tracing::warn!(
                capability = %capability,
                error = %e,
                "payload does not hold readable sources"
            );
            None
        }
    }
}
