//! Web search capability
//!
//! Backed by the hosted `web_search_preview` tool of the Responses API. Hits
//! are read from the `url_citation` annotations on the returned text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::core::{RagentError, Result};
use crate::llm::OpenAiClient;
use crate::tools::capability::{parse_input, Capability, CapabilityOutput};

/// Registry name of the web search capability
pub const WEB_SEARCH: &str = "web_search_preview";

/// Message returned when the search produced no citable pages
pub const NO_RESULTS_INFO: &str = "No web results found for that query.";

/// One web page cited by the search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

/// Result of a web search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSearchResponse {
    /// Text the search backend wrote around its citations
    pub summary: String,
    /// Cited pages, in citation order
    pub results: Vec<WebHit>,
}

/// Backend able to search the web
#[async_trait]
pub trait WebSearchBackend: Send + Sync {
    async fn search(&self, query: &str) -> Result<WebSearchResponse>;
}

/// Web search through the hosted Responses API
pub struct OpenAiWebSearch {
    client: OpenAiClient,
    model: String,
}

impl OpenAiWebSearch {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Extract the output text and cited pages from a Responses API payload
    pub fn parse_response(body: &Value) -> Result<WebSearchResponse> {
        let output = body
            .get("output")
            .and_then(Value::as_array)
            .ok_or_else(|| RagentError::capability("Response contained no output"))?;

        let mut response = WebSearchResponse::default();

        let parts = output
            .iter()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("message"))
            .filter_map(|item| item.get("content").and_then(Value::as_array))
            .flatten()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"));

        for part in parts {
            let text = part.get("text").and_then(Value::as_str).unwrap_or_default();
            let annotations = part
                .get("annotations")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            for annotation in annotations {
                if annotation.get("type").and_then(Value::as_str) != Some("url_citation") {
                    continue;
                }
                let Some(url) = annotation.get("url").and_then(Value::as_str) else {
                    continue;
                };
                if response.results.iter().any(|hit| hit.url == url) {
                    continue;
                }

                let title = annotation
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or(url)
                    .to_string();
                let start = annotation.get("start_index").and_then(Value::as_u64);
                let end = annotation.get("end_index").and_then(Value::as_u64);
                let snippet = match (start, end) {
                    (Some(start), Some(end)) if end > start => text
                        .chars()
                        .skip(start as usize)
                        .take((end - start) as usize)
                        .collect(),
                    _ => String::new(),
                };

                response.results.push(WebHit {
                    title,
                    url: url.to_string(),
                    snippet,
                });
            }

            if !response.summary.is_empty() {
                response.summary.push('\n');
            }
            response.summary.push_str(text);
        }

        Ok(response)
    }
}

#[async_trait]
impl WebSearchBackend for OpenAiWebSearch {
    async fn search(&self, query: &str) -> Result<WebSearchResponse> {
        let body = json!({
            "model": self.model,
            "input": query,
            "tools": [{ "type": WEB_SEARCH }],
        });
        let response = self.client.post_json("responses", &body).await?;
        Self::parse_response(&response)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WebSearchArgs {
    query: String,
}

/// The `web_search_preview` capability
pub struct WebSearch {
    backend: Arc<dyn WebSearchBackend>,
}

impl WebSearch {
    pub fn new(backend: Arc<dyn WebSearchBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Capability for WebSearch {
    fn name(&self) -> &str {
        WEB_SEARCH
    }

    fn description(&self) -> &str {
        "Search the web for current, real-time or general information."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, input: Value) -> CapabilityOutput {
        let args: WebSearchArgs = match parse_input(input) {
            Ok(args) => args,
            Err(out) => return out,
        };

        let query = args.query.trim();
        if query.is_empty() {
            return CapabilityOutput::error("Invalid input: query must not be empty");
        }

        tracing::info!(query, "web search");

        match self.backend.search(query).await {
            Ok(response) if response.results.is_empty() => {
                tracing::info!("web search returned no citations");
                CapabilityOutput::success(json!({
                    "info": NO_RESULTS_INFO,
                    "summary": response.summary,
                }))
            }
            Ok(response) => {
                tracing::info!(count = response.results.len(), "web search results");
                CapabilityOutput::success(json!({
                    "summary": response.summary,
                    "results": response.results,
                }))
            }
            Err(e) => {
                tracing::warn!(error = %e, "web search failed");
                CapabilityOutput::error(format!("Web search failed: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn responses_body() -> Value {
        json!({
            "output": [
                {"type": "web_search_call", "id": "ws_1", "status": "completed"},
                {
                    "type": "message",
                    "content": [{
                        "type": "output_text",
                        "text": "Paris is sunny, 21C today.",
                        "annotations": [
                            {"type": "url_citation", "start_index": 0, "end_index": 15,
                             "url": "https://weather.example/paris", "title": "Paris weather"},
                            {"type": "url_citation", "start_index": 17, "end_index": 26,
                             "url": "https://weather.example/paris", "title": "Paris weather"},
                            {"type": "url_citation", "start_index": 17, "end_index": 26,
                             "url": "https://meteo.example/fr", "title": "Meteo"}
                        ]
                    }]
                }
            ]
        })
    }

    struct FixedBackend(std::result::Result<WebSearchResponse, String>);

    #[async_trait]
    impl WebSearchBackend for FixedBackend {
        async fn search(&self, _query: &str) -> Result<WebSearchResponse> {
            self.0.clone().map_err(RagentError::capability)
        }
    }

    #[test]
    fn test_parse_response_dedupes_urls_in_order() {
        let parsed = OpenAiWebSearch::parse_response(&responses_body()).unwrap();
        assert_eq!(parsed.summary, "Paris is sunny, 21C today.");
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].url, "https://weather.example/paris");
        assert_eq!(parsed.results[0].snippet, "Paris is sunny,");
        assert_eq!(parsed.results[1].title, "Meteo");
    }

    #[test]
    fn test_parse_response_without_output_fails() {
        assert!(OpenAiWebSearch::parse_response(&json!({"id": "resp_1"})).is_err());
    }

    #[tokio::test]
    async fn test_backend_calls_responses_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(responses_body()))
            .mount(&server)
            .await;

        let client = OpenAiClient::with_base_url(server.uri(), "").unwrap();
        let backend = OpenAiWebSearch::new(client, "gpt-4o-mini");
        let response = backend.search("weather in Paris").await.unwrap();
        assert_eq!(response.results.len(), 2);
    }

    #[tokio::test]
    async fn test_capability_payloads() {
        let hits = WebSearchResponse {
            summary: "sunny".to_string(),
            results: vec![WebHit {
                title: "Paris weather".to_string(),
                url: "https://weather.example/paris".to_string(),
                snippet: "sunny".to_string(),
            }],
        };
        let tool = WebSearch::new(Arc::new(FixedBackend(Ok(hits))));
        let CapabilityOutput::Success(payload) = tool.execute(json!({"query": "weather"})).await
        else {
            panic!("expected success");
        };
        assert_eq!(payload["results"][0]["url"], "https://weather.example/paris");

        let empty = WebSearch::new(Arc::new(FixedBackend(Ok(WebSearchResponse::default()))));
        let CapabilityOutput::Success(payload) = empty.execute(json!({"query": "x"})).await else {
            panic!("expected success");
        };
        assert_eq!(payload["info"], NO_RESULTS_INFO);
        assert!(payload.get("results").is_none());

        let failing = WebSearch::new(Arc::new(FixedBackend(Err("offline".to_string()))));
        let out = failing.execute(json!({"query": "x"})).await;
        assert!(matches!(out, CapabilityOutput::Error(ref m) if m.starts_with("Web search failed")));
    }
}
