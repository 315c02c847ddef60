//! Anthropic Claude API implementation.

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::types::{parse_claude_tool_calls, ChatMessage, ToolDefinition};

use super::{ChatCompletionResponse, Choice, ChoiceMessage, LlmClient, Usage};

impl LlmClient {
    /// Split out the system prompt and batch consecutive tool results into a
    /// single user message, as the Messages API requires.
    pub(super) fn convert_messages_for_claude(
        messages: &[ChatMessage],
    ) -> (Option<String>, Vec<Value>) {
        let mut system_prompt: Option<String> = None;
        let mut claude_messages: Vec<Value> = Vec::new();
        let mut pending_tool_results: Vec<Value> = Vec::new();

        for msg in messages {
            if msg.role != "tool" && !pending_tool_results.is_empty() {
                claude_messages.push(json!({
                    "role": "user",
                    "content": std::mem::take(&mut pending_tool_results)
                }));
            }

            match msg.role.as_str() {
                "system" => {
                    if let Some(ref content) = msg.content {
                        system_prompt = Some(match system_prompt {
                            Some(existing) => format!("{}\n\n{}", existing, content),
                            None => content.clone(),
                        });
                    }
                }
                "user" => {
                    claude_messages.push(json!({
                        "role": "user",
                        "content": msg.content.as_deref().unwrap_or("")
                    }));
                }
                "assistant" => {
                    let mut content_blocks: Vec<Value> = Vec::new();

                    if let Some(ref text) = msg.content {
                        if !text.is_empty() {
                            content_blocks.push(json!({ "type": "text", "text": text }));
                        }
                    }

                    if let Some(ref tool_calls) = msg.tool_calls {
                        for tc in tool_calls {
                            let input: Value =
                                serde_json::from_str(&tc.function.arguments).unwrap_or(json!({}));
                            content_blocks.push(json!({
                                "type": "tool_use",
                                "id": tc.id,
                                "name": tc.function.name,
                                "input": input
                            }));
                        }
                    }

                    if !content_blocks.is_empty() {
                        claude_messages.push(json!({
                            "role": "assistant",
                            "content": content_blocks
                        }));
                    }
                }
                "tool" => {
                    pending_tool_results.push(json!({
                        "type": "tool_result",
                        "tool_use_id": msg.tool_call_id.as_deref().unwrap_or(""),
                        "content": msg.content.as_deref().unwrap_or("")
                    }));
                }
                _ => {}
            }
        }

        if !pending_tool_results.is_empty() {
            claude_messages.push(json!({
                "role": "user",
                "content": pending_tool_results
            }));
        }

        (system_prompt, claude_messages)
    }

    pub(super) async fn claude_chat_completion(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChatCompletionResponse> {
        let url = format!("{}/v1/messages", self.api_base.trim_end_matches("/v1"));

        let (system_prompt, claude_messages) = Self::convert_messages_for_claude(messages);

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": claude_messages,
        });

        if let Some(system) = &system_prompt {
            body["system"] = json!(system);
        }
        if let Some(temp) = self.temperature {
            body["temperature"] = json!(temp);
        }
        if let Some(tools) = tools {
            if !tools.is_empty() {
                let claude_tools: Vec<Value> = tools.iter().map(|t| t.to_claude_format()).collect();
                body["tools"] = json!(claude_tools);
            }
        }

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Claude API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Claude API error ({}): {}", status, body_text);
        }

        let response: Value = resp.json().await.context("Failed to parse Claude response")?;
        Ok(Self::convert_claude_response(response, &self.model))
    }

    pub(super) fn convert_claude_response(response: Value, model: &str) -> ChatCompletionResponse {
        let content_blocks = response
            .get("content")
            .and_then(|c| c.as_array())
            .cloned()
            .unwrap_or_default();

        let text_content: String = content_blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect();
        let tool_calls = parse_claude_tool_calls(&content_blocks);

        let stop_reason = response
            .get("stop_reason")
            .and_then(|s| s.as_str())
            .map(|s| match s {
                "end_turn" => "stop",
                "tool_use" => "tool_calls",
                other => other,
            })
            .map(String::from);

        let usage = response.get("usage").and_then(|u| {
            let input = u.get("input_tokens")?.as_u64()?;
            let output = u.get("output_tokens")?.as_u64()?;
            Some(Usage {
                prompt_tokens: input,
                completion_tokens: output,
                total_tokens: input + output,
            })
        });

        ChatCompletionResponse {
            id: response
                .get("id")
                .and_then(|i| i.as_str())
                .unwrap_or("")
                .to_string(),
            model: model.to_string(),
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage {
                    role: "assistant".to_string(),
                    content: (!text_content.is_empty()).then_some(text_content),
                    tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                },
                finish_reason: stop_reason,
            }],
            usage,
        }
    }
}
