//! Agent loop state management
//!
//! Tracks the Turns of one question: what the model said, which capabilities
//! it asked for, and what came back for each invocation id.

use std::collections::HashSet;
use thiserror::Error;

use crate::core::{generate_call_id, RagentError, ToolCall};
use crate::tools::{CapabilityOutput, UNKNOWN_CAPABILITY};

/// Where the orchestration loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    /// Waiting on the model
    Reasoning,
    /// Running the capabilities the model asked for
    Invoking,
    /// The model answered without asking for more capabilities
    Done,
    /// The step budget ran out before the model answered
    StepBudgetExhausted,
}

/// Correlation failures when recording capability results
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("result for '{0}' does not match any request in this turn")]
    Orphan(String),

    #[error("result for '{0}' was already recorded")]
    Duplicate(String),
}

impl From<TurnError> for RagentError {
    fn from(err: TurnError) -> Self {
        RagentError::Other(err.to_string())
    }
}

/// Result of one capability invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityResult {
    /// Invocation id of the request this answers
    pub call_id: String,
    /// Capability name, copied from the request
    pub name: String,
    pub output: CapabilityOutput,
}

/// One round of the orchestration loop
#[derive(Debug, Clone)]
pub struct Turn {
    /// 0-based position within the question
    pub index: usize,
    /// Text produced by the model (possibly empty)
    pub text: String,
    /// Capabilities requested by the model
    pub requests: Vec<ToolCall>,
    /// Results, each correlated to one of `requests`
    results: Vec<CapabilityResult>,
}

impl Turn {
    /// Create a turn; repeated invocation ids are replaced so every id is unique
    pub fn new(index: usize, text: impl Into<String>, mut requests: Vec<ToolCall>) -> Self {
        let mut seen = HashSet::new();
        for request in &mut requests {
            while !seen.insert(request.id.clone()) {
                let fresh = generate_call_id();
                tracing::debug!(old = %request.id, new = %fresh, "re-keyed duplicate call id");
                request.id = fresh;
            }
        }

        Self {
            index,
            text: text.into(),
            requests,
            results: Vec::new(),
        }
    }

    /// Record the output for `call_id`, which must be an unanswered request of this turn
    pub fn record_result(
        &mut self,
        call_id: &str,
        output: CapabilityOutput,
    ) -> Result<(), TurnError> {
        let request = self
            .requests
            .iter()
            .find(|r| r.id == call_id)
            .ok_or_else(|| TurnError::Orphan(call_id.to_string()))?;

        if self.results.iter().any(|r| r.call_id == call_id) {
            return Err(TurnError::Duplicate(call_id.to_string()));
        }

        self.results.push(CapabilityResult {
            call_id: call_id.to_string(),
            name: request.name.clone(),
            output,
        });
        Ok(())
    }

    pub fn results(&self) -> &[CapabilityResult] {
        &self.results
    }

    /// Get the result recorded for an invocation id
    pub fn result_for(&self, call_id: &str) -> Option<&CapabilityResult> {
        self.results.iter().find(|r| r.call_id == call_id)
    }

    /// Whether every request has a result
    pub fn is_complete(&self) -> bool {
        self.requests
            .iter()
            .all(|r| self.result_for(&r.id).is_some())
    }

    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }

    /// Names of requested capabilities that existed in the registry
    pub fn known_requests(&self) -> impl Iterator<Item = &str> + '_ {
        self.requests
            .iter()
            .filter(|r| {
                !matches!(
                    self.result_for(&r.id).map(|res| &res.output),
                    Some(CapabilityOutput::Error(msg)) if msg == UNKNOWN_CAPABILITY
                )
            })
            .map(|r| r.name.as_str())
    }
}

/// State of the orchestration loop for one question
#[derive(Debug, Clone)]
pub struct LoopState {
    /// Completed turns, in order
    pub turns: Vec<Turn>,
    /// Maximum model turns
    pub max_steps: usize,
    pub status: LoopStatus,
}

impl LoopState {
    /// Create a new loop state with the given step budget
    pub fn new(max_steps: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_steps,
            status: LoopStatus::Reasoning,
        }
    }

    /// Check if the model should be called again
    pub fn should_continue(&self) -> bool {
        self.status == LoopStatus::Reasoning && self.turns.len() < self.max_steps
    }

    pub fn steps_taken(&self) -> usize {
        self.turns.len()
    }

    /// Close the loop with a turn that requested nothing
    pub fn finish(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.status = LoopStatus::Done;
    }

    /// Store a turn whose capabilities have run and move back to reasoning,
    /// or stop if the budget is spent
    pub fn complete_invocation(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.status = if self.turns.len() >= self.max_steps {
            LoopStatus::StepBudgetExhausted
        } else {
            LoopStatus::Reasoning
        };
    }

    /// Most recent non-empty model text
    pub fn latest_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .map(|t| t.text.trim())
            .find(|t| !t.is_empty())
    }
}
