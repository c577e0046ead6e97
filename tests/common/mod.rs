//! Shared fakes for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use ragent::core::{Config, Message, ToolCall, ToolDefinition};
use ragent::llm::{GenerateOptions, LLMProvider, LLMResponse, StreamCallback};
use ragent::tools::knowledge_base::RetrievalError;
use ragent::tools::web_search::WebSearchResponse;
use ragent::tools::{
    DocumentRetriever, KnowledgeBaseSearch, RetrievedDocument, ToolRegistry, WebHit, WebSearch,
    WebSearchBackend,
};
use ragent::{Agent, RagentError, Result};

/// Provider that replays canned responses and records what it was sent
pub struct ScriptedProvider {
    responses: Mutex<Vec<LLMResponse>>,
    repeat_last: bool,
    pub calls: Mutex<Vec<Vec<Message>>>,
    pub offered_tools: Mutex<Vec<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new(mut responses: Vec<LLMResponse>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            repeat_last: false,
            calls: Mutex::new(Vec::new()),
            offered_tools: Mutex::new(Vec::new()),
        }
    }

    /// Keep returning the final response once the script runs out
    pub fn repeating(response: LLMResponse) -> Self {
        let mut provider = Self::new(vec![response]);
        provider.repeat_last = true;
        provider
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next(&self) -> Result<LLMResponse> {
        let mut responses = self.responses.lock().unwrap();
        if self.repeat_last && responses.len() == 1 {
            return Ok(responses[0].clone());
        }
        responses
            .pop()
            .ok_or_else(|| RagentError::llm("scripted provider ran out of responses"))
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        _model: &str,
        messages: &[Message],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.next()
    }

    async fn chat_with_tools(
        &self,
        _model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        _options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.offered_tools
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.function.name.clone()).collect());
        self.next()
    }

    async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
        on_token: StreamCallback,
    ) -> Result<LLMResponse> {
        let response = self.chat(model, messages, options).await?;
        on_token(&response.content);
        Ok(response)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Knowledge base that returns a fixed result and counts queries
pub struct FakeRetriever {
    documents: std::result::Result<Vec<RetrievedDocument>, String>,
    pub queries: AtomicUsize,
}

impl FakeRetriever {
    pub fn with_documents(documents: Vec<RetrievedDocument>) -> Self {
        Self {
            documents: Ok(documents),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            documents: Err(msg.to_string()),
            queries: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DocumentRetriever for FakeRetriever {
    async fn retrieve(
        &self,
        _query: &str,
    ) -> std::result::Result<Vec<RetrievedDocument>, RetrievalError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.documents
            .clone()
            .map_err(RetrievalError::Match)
    }
}

/// Web backend with a fixed response
pub struct FakeWeb(pub WebSearchResponse);

#[async_trait]
impl WebSearchBackend for FakeWeb {
    async fn search(&self, _query: &str) -> Result<WebSearchResponse> {
        Ok(self.0.clone())
    }
}

pub fn refund_documents() -> Vec<RetrievedDocument> {
    vec![
        RetrievedDocument {
            content: "Subscriptions can be refunded within 30 days of purchase.".to_string(),
            metadata: json!({"source": "faq.md"}),
            similarity: 0.89,
        },
        RetrievedDocument {
            content: "Email support to request a refund.".to_string(),
            metadata: json!({"source": "support.md"}),
            similarity: 0.81,
        },
    ]
}

pub fn paris_weather() -> WebSearchResponse {
    WebSearchResponse {
        summary: "Sunny, 24°C in Paris today.".to_string(),
        results: vec![WebHit {
            title: "Paris forecast".to_string(),
            url: "https://weather.example/paris".to_string(),
            snippet: "Sunny, 24°C".to_string(),
        }],
    }
}

pub fn registry(retriever: Arc<FakeRetriever>, web: WebSearchResponse) -> ToolRegistry {
    ToolRegistry::builder()
        .register(Arc::new(KnowledgeBaseSearch::new(retriever)))
        .and_then(|b| b.register(Arc::new(WebSearch::new(Arc::new(FakeWeb(web))))))
        .expect("registry builds")
        .build()
}

pub fn agent(provider: Arc<ScriptedProvider>, tools: ToolRegistry) -> Agent {
    Agent::new(Config::default(), provider, Arc::new(tools))
}

pub fn call(id: &str, name: &str, query: &str) -> ToolCall {
    ToolCall::with_id(id, name, json!({ "query": query }))
}

/// Parse a tool message back into JSON
pub fn tool_payload(message: &Message) -> Value {
    serde_json::from_str(&message.content).expect("tool content is JSON")
}
