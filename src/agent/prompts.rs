//! Prompt text used by the orchestrator

use crate::tools::{KNOWLEDGE_BASE_SEARCH, WEB_SEARCH};

/// Answer used when the model produced no text and invoked nothing
pub const NO_RESPONSE_ANSWER: &str = "I couldn't generate a response.";

/// System instruction describing when to use each capability
pub fn retrieval_system_prompt(knowledge_base_description: &str) -> String {
    format!(
        r#"You are a helpful assistant for {kb}.
Your primary goal is to answer the user's question accurately.

TOOL USAGE GUIDE:
1. Use '{kb_tool}' ONLY IF the question is specifically about {kb}. Do not use it for general knowledge, current events, or unrelated topics.
2. Use '{web_tool}' IF the question needs current, real-time information (news, weather, events, definitions) or general knowledge outside the knowledge base.
3. Answer directly IF you already know the answer or the question is conversational and needs no external data.

After using a tool, integrate its findings into a concise, helpful answer. State clearly whether the information came from the knowledge base or a web search. If a tool reports an error, tell the user you could not retrieve the information."#,
        kb = knowledge_base_description,
        kb_tool = KNOWLEDGE_BASE_SEARCH,
        web_tool = WEB_SEARCH,
    )
}

/// Human label for a capability name
pub fn capability_label(name: &str) -> &str {
    match name {
        WEB_SEARCH => "web search",
        KNOWLEDGE_BASE_SEARCH => "knowledge base",
        other => other,
    }
}

/// Answer used when a capability ran but the model wrote nothing
pub fn fallback_answer(capability: &str) -> String {
    format!(
        "I used the {} tool but didn't generate a final summary. You can check the retrieved sources.",
        capability_label(capability)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_both_capabilities() {
        let prompt = retrieval_system_prompt("Scrimba");
        assert!(prompt.contains("knowledgeBaseSearch"));
        assert!(prompt.contains("web_search_preview"));
        assert!(prompt.contains("assistant for Scrimba"));
    }

    #[test]
    fn test_fallback_answer_names_capability() {
        assert!(fallback_answer("web_search_preview").contains("web search tool"));
        assert!(fallback_answer("knowledgeBaseSearch").contains("knowledge base tool"));
        assert!(fallback_answer("calculator").contains("calculator tool"));
    }
}
