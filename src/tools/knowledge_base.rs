//! Knowledge base search capability
//!
//! Embeds the query and asks the vector store for the closest document
//! chunks. The store itself is behind [`DocumentRetriever`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::core::{Config, RagentError};
use crate::llm::OpenAiClient;
use crate::tools::capability::{parse_input, Capability, CapabilityOutput};

/// Registry name of the knowledge base capability
pub const KNOWLEDGE_BASE_SEARCH: &str = "knowledgeBaseSearch";

/// Message returned when the store has no match
pub const NO_MATCHES_INFO: &str =
    "No relevant information found in the knowledge base for that query.";

/// A document chunk returned by the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Raw chunk text
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Free-form metadata stored alongside the chunk
    #[serde(default)]
    pub metadata: Value,
    /// Similarity score reported by the store
    #[serde(default, deserialize_with = "null_as_default")]
    pub similarity: f64,
}

/// Store rows may carry `null` for columns the match function leaves empty
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Failures a retriever can report
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The similarity match itself failed
    #[error("Database query failed: {0}")]
    Match(String),

    /// Anything else (embedding, transport, decoding)
    #[error("Failed to execute knowledge base retrieval: {0}")]
    Execution(String),
}

impl From<RagentError> for RetrievalError {
    fn from(err: RagentError) -> Self {
        Self::Execution(err.to_string())
    }
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        Self::Execution(err.to_string())
    }
}

/// Backend that maps a query to ranked document chunks
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Return chunks ordered by descending similarity
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, RetrievalError>;
}

/// Retriever backed by OpenAI embeddings and a Supabase `match_documents` RPC
pub struct SupabaseRetriever {
    embedder: OpenAiClient,
    http: Client,
    embedding_model: String,
    rpc_url: String,
    api_key: String,
    match_count: usize,
}

impl SupabaseRetriever {
    /// Create a retriever from configuration
    pub fn from_config(config: &Config, embedder: OpenAiClient) -> crate::core::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.openai.timeout_secs))
            .build()?;

        let kb = &config.knowledge_base;
        Ok(Self {
            embedder,
            http,
            embedding_model: config.models.embedding.clone(),
            rpc_url: format!(
                "{}/rest/v1/rpc/{}",
                kb.supabase_url.trim_end_matches('/'),
                kb.match_function
            ),
            api_key: kb.supabase_key.clone(),
            match_count: kb.match_count,
        })
    }
}

#[async_trait]
impl DocumentRetriever for SupabaseRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        let embedding = self.embedder.embed(&self.embedding_model, query).await?;
        tracing::debug!(dimensions = embedding.len(), "generated query embedding");

        let response = self
            .http
            .post(&self.rpc_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "query_embedding": embedding,
                "match_count": self.match_count,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Match(format!("{} {}", status, text)));
        }

        Ok(response.json::<Vec<RetrievedDocument>>().await?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KnowledgeBaseArgs {
    query: String,
}

/// The `knowledgeBaseSearch` capability
pub struct KnowledgeBaseSearch {
    retriever: Arc<dyn DocumentRetriever>,
    description: String,
}

impl KnowledgeBaseSearch {
    pub fn new(retriever: Arc<dyn DocumentRetriever>) -> Self {
        Self {
            retriever,
            description: "Retrieve specific information from the knowledge base to answer user questions."
                .to_string(),
        }
    }

    /// Override the description shown to the model
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl Capability for KnowledgeBaseSearch {
    fn name(&self) -> &str {
        KNOWLEDGE_BASE_SEARCH
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The specific query or question to search for in the knowledge base."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, input: Value) -> CapabilityOutput {
        let args: KnowledgeBaseArgs = match parse_input(input) {
            Ok(args) => args,
            Err(out) => return out,
        };

        let query = args.query.trim();
        if query.is_empty() {
            return CapabilityOutput::error("Invalid input: query must not be empty");
        }

        tracing::info!(query, "knowledge base search");

        match self.retriever.retrieve(query).await {
            Ok(documents) if documents.is_empty() => {
                tracing::info!("no relevant documents found");
                CapabilityOutput::success(json!({ "info": NO_MATCHES_INFO }))
            }
            Ok(documents) => {
                tracing::info!(count = documents.len(), "retrieved document chunks");
                CapabilityOutput::success(json!({ "retrievedDocuments": documents }))
            }
            Err(e) => {
                tracing::warn!(error = %e, "knowledge base retrieval failed");
                CapabilityOutput::error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedRetriever(Result<Vec<RetrievedDocument>, String>);

    #[async_trait]
    impl DocumentRetriever for FixedRetriever {
        async fn retrieve(&self, _query: &str) -> Result<Vec<RetrievedDocument>, RetrievalError> {
            self.0.clone().map_err(RetrievalError::Match)
        }
    }

    fn doc(content: &str, similarity: f64) -> RetrievedDocument {
        RetrievedDocument {
            content: content.to_string(),
            metadata: json!({"source": "faq.md"}),
            similarity,
        }
    }

    #[tokio::test]
    async fn test_documents_are_returned_in_order() {
        let tool = KnowledgeBaseSearch::new(Arc::new(FixedRetriever(Ok(vec![
            doc("Refunds within 30 days", 0.91),
            doc("Contact support", 0.72),
        ]))));

        let out = tool.execute(json!({"query": "refund policy"})).await;
        let CapabilityOutput::Success(payload) = out else {
            panic!("expected success");
        };
        let docs = payload["retrievedDocuments"].as_array().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["content"], "Refunds within 30 days");
        assert_eq!(docs[1]["similarity"], 0.72);
    }

    #[tokio::test]
    async fn test_no_matches_is_info() {
        let tool = KnowledgeBaseSearch::new(Arc::new(FixedRetriever(Ok(vec![]))));
        let out = tool.execute(json!({"query": "anything"})).await;
        assert_eq!(out, CapabilityOutput::success(json!({"info": NO_MATCHES_INFO})));
    }

    #[tokio::test]
    async fn test_failure_becomes_error_payload() {
        let tool = KnowledgeBaseSearch::new(Arc::new(FixedRetriever(Err("timeout".into()))));
        let out = tool.execute(json!({"query": "anything"})).await;
        assert_eq!(out, CapabilityOutput::error("Database query failed: timeout"));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_before_retrieval() {
        let tool = KnowledgeBaseSearch::new(Arc::new(FixedRetriever(Ok(vec![doc("x", 1.0)]))));
        assert!(tool.execute(json!({"q": "typo"})).await.is_error());
        assert!(tool.execute(json!({"query": "   "})).await.is_error());
    }

    #[tokio::test]
    async fn test_supabase_retriever() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [0.5, 0.25]}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/match_documents"))
            .and(header("apikey", "sb-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"content": "Refunds within 30 days", "metadata": {"source": "faq"}, "similarity": 0.88}
            ])))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.knowledge_base.supabase_url = server.uri();
        config.knowledge_base.supabase_key = "sb-key".to_string();

        let embedder = OpenAiClient::with_base_url(server.uri(), "").unwrap();
        let retriever = SupabaseRetriever::from_config(&config, embedder).unwrap();
        let docs = retriever.retrieve("refunds").await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].similarity, 0.88);
    }

    #[test]
    fn test_row_with_null_columns() {
        let docs: Vec<RetrievedDocument> = serde_json::from_value(json!([
            {"content": "Refunds within 30 days", "metadata": null, "similarity": null},
            {"metadata": {"source": "faq"}, "similarity": 0.4}
        ]))
        .unwrap();

        assert_eq!(docs[0].similarity, 0.0);
        assert_eq!(docs[0].metadata, Value::Null);
        assert_eq!(docs[1].content, "");
        assert_eq!(docs[1].similarity, 0.4);
    }

    #[tokio::test]
    async fn test_supabase_match_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": [0.5]}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/match_documents"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad rpc"))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.knowledge_base.supabase_url = server.uri();
        config.knowledge_base.supabase_key = "sb-key".to_string();

        let embedder = OpenAiClient::with_base_url(server.uri(), "").unwrap();
        let retriever = SupabaseRetriever::from_config(&config, embedder).unwrap();
        let err = retriever.retrieve("refunds").await.unwrap_err();
        assert!(matches!(err, RetrievalError::Match(ref m) if m.contains("bad rpc")));
    }
}
