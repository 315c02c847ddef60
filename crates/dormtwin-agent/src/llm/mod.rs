//! LLM HTTP client for chat completions with tool calling.
//!
//! Supports two API formats:
//!   - **OpenAI-compatible**: `/chat/completions` (GPT-4o, Gemini's OpenAI endpoint, DeepSeek, ...)
//!   - **Claude Native**: `/v1/messages` (Anthropic Claude)
//!
//! Auto-detects which API to use based on model name or API base URL.
//! The planner talks to the model only through [`CompletionProvider`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use dormtwin_core::config::LlmConfig;

use crate::types::{ChatMessage, ModelReply, ToolCall, ToolDefinition, ToolFormat, ToolRequest};

mod claude;
mod openai;


/// Final answer used when the model returns neither text nor a tool call.
pub const EMPTY_REPLY_ANSWER: &str = "I was unable to generate a response.";

/// The completion capability: one call per planner iteration.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelReply>;
}

/// Detect API format from model name or API base.
pub fn detect_tool_format(model: &str, api_base: &str) -> ToolFormat {
    let model_lower = model.to_lowercase();
    let base_lower = api_base.to_lowercase();

    if model_lower.starts_with("claude")
        || base_lower.contains("anthropic")
        || base_lower.contains("claude")
    {
        ToolFormat::Claude
    } else {
        ToolFormat::OpenAI
    }
}

/// LLM client supporting both OpenAI and Claude API formats.
pub struct LlmClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: Option<f64>,
    max_tokens: usize,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("failed to build LLM HTTP client")?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Non-streaming chat completion call (auto-routes based on model/api_base).
    pub async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChatCompletionResponse> {
        match detect_tool_format(&self.model, &self.api_base) {
            ToolFormat::Claude => self.claude_chat_completion(messages, tools).await,
            ToolFormat::OpenAI => self.openai_chat_completion(messages, tools).await,
        }
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelReply> {
        let tools = if tools.is_empty() { None } else { Some(tools) };
        let response = self.chat_completion(messages, tools).await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "LLM usage"
            );
        }
        reply_from_response(response)
    }
}

/// Reduce a completion response to the planner's two-way decision.
/// Only the first tool call is honoured; the loop runs one tool at a time.
pub fn reply_from_response(response: ChatCompletionResponse) -> Result<ModelReply> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .context("No choices in LLM response")?;
    let message = choice.message;
    let text = message.content.filter(|t| !t.trim().is_empty());

    let mut calls = message.tool_calls.unwrap_or_default().into_iter();
    if let Some(first) = calls.next() {
        let dropped: Vec<String> = calls.map(|c| c.function.name).collect();
        if !dropped.is_empty() {
            tracing::warn!(
                honoured = %first.function.name,
                dropped = ?dropped,
                "Model requested several tools at once; only the first is dispatched"
            );
        }
        return Ok(ModelReply::ToolRequest {
            text,
            request: ToolRequest::from_call(&first),
        });
    }

    Ok(ModelReply::FinalAnswer(
        text.unwrap_or_else(|| EMPTY_REPLY_ANSWER.to_string()),
    ))
}

// ─── Response types ─────────────────────────────────────────────────────────
// Fields id/model/index/finish_reason/role are required for API
// deserialization but not read by our code.

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChoiceMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: String,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}
