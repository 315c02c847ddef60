//! Per-question conversation state.
//!
//! A [`Conversation`] is owned by exactly one planner run and dropped when the
//! run ends. Turns are typed; they are lowered to OpenAI-shaped
//! [`ChatMessage`]s only when the model is called.

use serde::Serialize;

use crate::planner::FailureReason;
use crate::types::{ChatMessage, ToolRequest, ToolResult};

/// One unit of conversation history.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "turn", rename_all = "snake_case")]
pub enum Turn {
    UserQuestion { text: String },
    AssistantToolRequest { text: Option<String>, request: ToolRequest },
    ToolResult { result: ToolResult },
    /// Assistant text that announced a tool call without making one.
    AssistantDraft { text: String },
    /// Loop-authored steering message (nudge, repeat warning).
    Guidance { text: String },
    AssistantFinalAnswer { text: String },
    Failure { reason: FailureReason },
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    system_framing: String,
    turns: Vec<Turn>,
}

impl Conversation {
    /// Seed with the system framing and the user question.
    pub fn start(system_framing: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            system_framing: system_framing.into(),
            turns: vec![Turn::UserQuestion {
                text: question.into(),
            }],
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn question(&self) -> &str {
        match self.turns.first() {
            Some(Turn::UserQuestion { text }) => text,
            _ => "",
        }
    }

    /// True once a final answer or failure marker has been appended.
    pub fn is_closed(&self) -> bool {
        matches!(
            self.turns.last(),
            Some(Turn::AssistantFinalAnswer { .. } | Turn::Failure { .. })
        )
    }

    pub fn push_tool_request(&mut self, text: Option<String>, request: ToolRequest) {
        self.turns.push(Turn::AssistantToolRequest { text, request });
    }

    /// Append the result for the request that immediately precedes it.
    /// Results that do not answer the pending request are dropped with a warning.
    pub fn push_tool_result(&mut self, result: ToolResult) {
        let answers_pending = matches!(
            self.turns.last(),
            Some(Turn::AssistantToolRequest { request, .. }) if request.call_id == result.call_id
        );
        if !answers_pending {
            tracing::warn!(call_id = %result.call_id, "Tool result without a matching request; dropped");
            return;
        }
        self.turns.push(Turn::ToolResult { result });
    }

    pub fn push_draft(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::AssistantDraft { text: text.into() });
    }

    pub fn push_guidance(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::Guidance { text: text.into() });
    }

    pub fn finish_with_answer(&mut self, text: impl Into<String>) {
        if !self.is_closed() {
            self.turns.push(Turn::AssistantFinalAnswer { text: text.into() });
        }
    }

    pub fn finish_with_failure(&mut self, reason: FailureReason) {
        if !self.is_closed() {
            self.turns.push(Turn::Failure { reason });
        }
    }

    /// Snapshot for the completion capability.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.push(ChatMessage::system(&self.system_framing));
        for turn in &self.turns {
            match turn {
                Turn::UserQuestion { text } => messages.push(ChatMessage::user(text)),
                Turn::AssistantToolRequest { text, request } => messages.push(
                    ChatMessage::assistant_with_tool_calls(text.as_deref(), vec![request.to_call()]),
                ),
                Turn::ToolResult { result } => {
                    messages.push(ChatMessage::tool_result(&result.call_id, &result.render_for_model()))
                }
                Turn::AssistantDraft { text } => messages.push(ChatMessage::assistant(text)),
                Turn::Guidance { text } => messages.push(ChatMessage::user(text)),
                Turn::AssistantFinalAnswer { .. } | Turn::Failure { .. } => {}
            }
        }
        messages
    }
}
