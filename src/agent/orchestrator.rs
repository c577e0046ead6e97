//! Agent orchestrator
//!
//! Runs the bounded reasoning loop for one question: ask the model, run the
//! capabilities it requests, feed the results back, and stop when it answers
//! or the step budget is spent.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::agent::prompts::{fallback_answer, retrieval_system_prompt, NO_RESPONSE_ANSWER};
use crate::agent::sources::{AgentResult, SourceNormalizer};
use crate::agent::transcript::Transcript;
use crate::agent::turn::{LoopState, LoopStatus, Turn};
use crate::core::{Config, RagentError, Result, ToolCall};
use crate::llm::{GenerateOptions, LLMProvider, OpenAiClient};
use crate::tools::{CapabilityOutput, ToolRegistry};

/// Payload recorded when a capability task panicked or was cancelled
const TASK_FAILED: &str = "capability task failed";

/// Everything that happened while answering one question
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub result: AgentResult,
    pub turns: Vec<Turn>,
    pub status: LoopStatus,
    pub transcript: Transcript,
}

/// Answers questions by letting the model pick capabilities
pub struct Agent {
    config: Config,
    llm: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    normalizer: SourceNormalizer,
    system_prompt: String,
}

impl Agent {
    /// Create an agent from explicit parts
    pub fn new(config: Config, llm: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>) -> Self {
        let system_prompt = config
            .agent
            .system_prompt
            .clone()
            .unwrap_or_else(|| retrieval_system_prompt(&config.knowledge_base.description));

        Self {
            config,
            llm,
            tools,
            normalizer: SourceNormalizer::default(),
            system_prompt,
        }
    }

    /// Create an agent backed by the OpenAI-compatible API and the built-in capabilities
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let client = OpenAiClient::from_config(&config)?;
        let tools = ToolRegistry::from_config(&config, &client)?;

        tracing::info!(
            model = %config.models.answering,
            capabilities = ?tools.names(),
            max_steps = config.agent.max_steps,
            "agent ready"
        );

        Ok(Self::new(config, Arc::new(client), Arc::new(tools)))
    }

    /// Replace the source normalizer
    pub fn with_normalizer(mut self, normalizer: SourceNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Answer a question
    pub async fn ask(&self, question: &str) -> Result<AgentResult> {
        self.run(question).await.map(|run| run.result)
    }

    /// Answer a question and keep the turns and transcript for inspection
    pub async fn run(&self, question: &str) -> Result<AgentRun> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagentError::invalid_input("Question is required"));
        }

        tracing::info!(question = %question, "question received");

        let mut transcript = Transcript::with_system_prompt(self.system_prompt.clone());
        transcript.add_user(question);

        let mut state = LoopState::new(self.config.agent.max_steps);

        while state.should_continue() {
            let index = state.steps_taken();
            tracing::debug!(turn = index + 1, max = state.max_steps, "calling model");

            let response = self
                .llm
                .chat_with_tools(
                    &self.config.models.answering,
                    &transcript.messages(),
                    self.tools.definitions(),
                    Some(GenerateOptions {
                        temperature: Some(0.1),
                        ..Default::default()
                    }),
                )
                .await?;

            if response.tool_calls.is_empty() {
                if !response.content.trim().is_empty() {
                    transcript.add_assistant(response.content.clone());
                }
                state.finish(Turn::new(index, response.content, Vec::new()));
                break;
            }

            state.status = LoopStatus::Invoking;
            let mut turn = Turn::new(index, response.content, response.tool_calls);
            transcript.add_tool_requests(turn.text.clone(), turn.requests.clone());

            tracing::info!(
                turn = index + 1,
                capabilities = ?turn.requests.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
                "dispatching capabilities"
            );

            let outputs = self.execute_tools(&turn.requests).await;
            let ids: Vec<String> = turn.requests.iter().map(|r| r.id.clone()).collect();

            for (id, output) in ids.iter().zip(outputs) {
                if let CapabilityOutput::Error(ref msg) = output {
                    tracing::warn!(call_id = %id, error = %msg, "capability returned an error");
                }
                transcript.add_tool_result(id, output.to_json().to_string());
                turn.record_result(id, output)?;
            }

            state.complete_invocation(turn);
        }

        if state.status == LoopStatus::StepBudgetExhausted {
            tracing::warn!(steps = state.steps_taken(), "step budget exhausted");
        }

        let normalized = self.normalizer.normalize(&state.turns);

        let text = match state.status {
            LoopStatus::Done => state
                .turns
                .last()
                .map(|t| t.text.trim())
                .filter(|t| !t.is_empty()),
            _ => state.latest_text(),
        };

        let answer = match (text, normalized.tool_used.as_deref()) {
            (Some(text), _) => text.to_string(),
            (None, Some(capability)) => {
                tracing::debug!(capability = %capability, "model wrote no answer, using fallback");
                fallback_answer(capability)
            }
            (None, None) => {
                tracing::debug!("model produced nothing");
                NO_RESPONSE_ANSWER.to_string()
            }
        };

        tracing::info!(
            status = ?state.status,
            steps = state.steps_taken(),
            tool_used = ?normalized.tool_used,
            "question answered"
        );

        Ok(AgentRun {
            result: AgentResult {
                answer,
                sources: normalized.sources,
                tool_used: normalized.tool_used,
            },
            status: state.status,
            turns: state.turns,
            transcript,
        })
    }

    /// Run every call concurrently; outputs come back in request order
    async fn execute_tools(&self, tool_calls: &[ToolCall]) -> Vec<CapabilityOutput> {
        let mut set = JoinSet::new();

        for (position, call) in tool_calls.iter().cloned().enumerate() {
            let tools = Arc::clone(&self.tools);
            set.spawn(async move {
                let output = tools.execute(&call).await;
                (position, output)
            });
        }

        let mut outputs: Vec<Option<CapabilityOutput>> = vec![None; tool_calls.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((position, output)) => outputs[position] = Some(output),
                Err(e) => tracing::error!(error = %e, "capability task did not finish"),
            }
        }

        outputs
            .into_iter()
            .map(|output| output.unwrap_or_else(|| CapabilityOutput::error(TASK_FAILED)))
            .collect()
    }

    /// Get current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registered capabilities
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The provider, shared with chat sessions
    pub fn llm(&self) -> Arc<dyn LLMProvider> {
        Arc::clone(&self.llm)
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Message, ToolDefinition};
    use crate::llm::{LLMResponse, StreamCallback};
    use crate::tools::Capability;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    struct Scripted(Mutex<Vec<LLMResponse>>);

    impl Scripted {
        fn new(mut responses: Vec<LLMResponse>) -> Self {
            responses.reverse();
            Self(Mutex::new(responses))
        }
    }

    #[async_trait]
    impl LLMProvider for Scripted {
        async fn chat(
            &self,
            _model: &str,
            _messages: &[Message],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            unreachable!("orchestrator always offers tools")
        }

        async fn chat_with_tools(
            &self,
            _model: &str,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _options: Option<GenerateOptions>,
        ) -> Result<LLMResponse> {
            self.0
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| RagentError::llm("script exhausted"))
        }

        async fn chat_stream(
            &self,
            _model: &str,
            _messages: &[Message],
            _options: Option<GenerateOptions>,
            _on_token: StreamCallback,
        ) -> Result<LLMResponse> {
            unreachable!()
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Sleeps for `ms` then echoes its name, so completion order differs from request order
    struct Slow(&'static str, u64);

    #[async_trait]
    impl Capability for Slow {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "slow"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _input: Value) -> CapabilityOutput {
            tokio::time::sleep(Duration::from_millis(self.1)).await;
            CapabilityOutput::success(json!({ "from": self.0 }))
        }
    }

    fn agent_with(responses: Vec<LLMResponse>, tools: ToolRegistry) -> Agent {
        Agent::new(
            Config::default(),
            Arc::new(Scripted::new(responses)),
            Arc::new(tools),
        )
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let agent = agent_with(vec![], ToolRegistry::empty());
        let err = agent.ask("   ").await.unwrap_err();
        assert!(matches!(err, RagentError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_outputs_keep_request_order() {
        let tools = ToolRegistry::builder()
            .register(Arc::new(Slow("slow", 50)))
            .and_then(|b| b.register(Arc::new(Slow("fast", 1))))
            .unwrap()
            .build();
        let agent = agent_with(vec![], tools);

        let calls = vec![
            ToolCall::with_id("a", "slow", json!({})),
            ToolCall::with_id("b", "fast", json!({})),
        ];
        let outputs = agent.execute_tools(&calls).await;
        assert_eq!(outputs[0], CapabilityOutput::success(json!({"from": "slow"})));
        assert_eq!(outputs[1], CapabilityOutput::success(json!({"from": "fast"})));
    }

    #[tokio::test]
    async fn test_transcript_pairs_requests_and_results() {
        let tools = ToolRegistry::builder()
            .register(Arc::new(Slow("lookup", 1)))
            .unwrap()
            .build();
        let agent = agent_with(
            vec![
                LLMResponse::with_tool_calls(
                    "",
                    vec![ToolCall::with_id("c1", "lookup", json!({"query": "x"}))],
                ),
                LLMResponse::text("Done."),
            ],
            tools,
        );

        let run = agent.run("What is x?").await.unwrap();
        assert_eq!(run.status, LoopStatus::Done);
        assert_eq!(run.turns.len(), 2);
        assert!(run.turns[0].is_complete());

        let history = run.transcript.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(history[3].content, "Done.");
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces_as_error() {
        let agent = agent_with(vec![], ToolRegistry::empty());
        assert!(matches!(agent.ask("hello").await, Err(RagentError::Llm(_))));
    }

    #[tokio::test]
    async fn test_empty_answer_without_capabilities() {
        let agent = agent_with(vec![LLMResponse::text("")], ToolRegistry::empty());
        let result = agent.ask("hello").await.unwrap();
        assert_eq!(result, AgentResult::direct(NO_RESPONSE_ANSWER));
    }
}
