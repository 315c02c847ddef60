//! Shared types for the agent crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use dormtwin_core::config::{GraphConfig, LlmConfig, PlannerSettings, SeriesConfig};

use crate::normalize::NormalizedRows;

/// Everything needed to wire a planner from the environment.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub llm: LlmConfig,
    pub graph: GraphConfig,
    pub series: SeriesConfig,
    pub planner: PlannerSettings,
}

impl AgentConfig {
    /// Load from environment variables (reads `.env` first).
    pub fn from_env() -> Self {
        dormtwin_core::config::load_dotenv();
        Self {
            llm: LlmConfig::from_env(),
            graph: GraphConfig::from_env(),
            series: SeriesConfig::from_env(),
            planner: PlannerSettings::from_env(),
        }
    }
}

// ─── OpenAI-compatible chat types ───────────────────────────────────────────

/// A chat message in OpenAI format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_role(role: &str, content: Option<&str>) -> Self {
        Self {
            role: role.to_string(),
            content: content.map(str::to_string),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: &str) -> Self {
        Self::with_role("system", Some(content))
    }

    pub fn user(content: &str) -> Self {
        Self::with_role("user", Some(content))
    }

    pub fn assistant(content: &str) -> Self {
        Self::with_role("assistant", Some(content))
    }

    pub fn assistant_with_tool_calls(content: Option<&str>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::with_role("assistant", content)
        }
    }

    pub fn tool_result(tool_call_id: &str, content: &str) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.to_string()),
            ..Self::with_role("tool", Some(content))
        }
    }
}

/// A tool call on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, as OpenAI sends it.
    pub arguments: String,
}

/// Supported completion wire formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFormat {
    /// OpenAI function calling (GPT-4o, Gemini's OpenAI endpoint, DeepSeek, ...)
    OpenAI,
    /// Anthropic Messages API
    Claude,
}

/// OpenAI-compatible tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDef,
}

impl ToolDefinition {
    /// Claude expects `{ name, description, input_schema }`.
    pub fn to_claude_format(&self) -> Value {
        serde_json::json!({
            "name": self.function.name,
            "description": self.function.description,
            "input_schema": self.function.parameters
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Parse `tool_use` blocks from a Claude response into OpenAI-shaped calls.
pub fn parse_claude_tool_calls(content_blocks: &[Value]) -> Vec<ToolCall> {
    content_blocks
        .iter()
        .filter(|b| b.get("type").and_then(|v| v.as_str()) == Some("tool_use"))
        .map(|block| {
            let id = block.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
            let name = block.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
            let input = block.get("input").cloned().unwrap_or(serde_json::json!({}));
            ToolCall {
                id,
                call_type: "function".to_string(),
                function: FunctionCall {
                    name,
                    arguments: input.to_string(),
                },
            }
        })
        .collect()
}

// ─── Planner-level types ────────────────────────────────────────────────────

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolRequest {
    pub call_id: String,
    pub tool_name: String,
    /// Parsed argument object. Arguments that are not valid JSON are kept as
    /// a JSON string so the registry can report them.
    pub arguments: Value,
}

impl ToolRequest {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    pub fn from_call(call: &ToolCall) -> Self {
        let raw = call.function.arguments.trim();
        let arguments = if raw.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        };
        Self::new(call.id.clone(), call.function.name.clone(), arguments)
    }

    pub fn to_call(&self) -> ToolCall {
        ToolCall {
            id: self.call_id.clone(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: self.tool_name.clone(),
                arguments: self.arguments.to_string(),
            },
        }
    }

    /// Same tool and same arguments, ignoring the call id.
    pub fn same_invocation(&self, other: &ToolRequest) -> bool {
        self.tool_name == other.tool_name && self.arguments == other.arguments
    }
}

/// What the completion capability decided to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    ToolRequest {
        /// Text the model sent alongside the call, if any.
        text: Option<String>,
        request: ToolRequest,
    },
    FinalAnswer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    Rejected,
    ExecutionError,
}

/// Outcome of one dispatch. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub call_id: String,
    pub tool_name: String,
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<NormalizedRows>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ToolResult {
    pub fn ok(request: &ToolRequest, rows: NormalizedRows) -> Self {
        Self {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            status: ToolStatus::Ok,
            rows: Some(rows),
            error_detail: None,
        }
    }

    pub fn rejected(request: &ToolRequest, reason: impl Into<String>) -> Self {
        Self {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            status: ToolStatus::Rejected,
            rows: None,
            error_detail: Some(reason.into()),
        }
    }

    pub fn execution_error(request: &ToolRequest, detail: impl Into<String>) -> Self {
        Self {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            status: ToolStatus::ExecutionError,
            rows: None,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }

    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, |r| r.len())
    }

    /// Text placed in the tool message the model sees.
    pub fn render_for_model(&self) -> String {
        let body = match (&self.status, &self.rows) {
            (ToolStatus::Ok, Some(rows)) => {
                let mut v = serde_json::json!({
                    "status": "ok",
                    "row_count": rows.len(),
                    "truncated": rows.truncated,
                    "rows": rows.records,
                });
                if rows.truncated {
                    v["total_rows"] = serde_json::json!(rows.total_rows);
                }
                v
            }
            (status, _) => serde_json::json!({
                "status": status,
                "error": self.error_detail.as_deref().unwrap_or(""),
            }),
        };
        body.to_string()
    }
}

/// One executed tool step, kept for display after the run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStep {
    pub iteration: usize,
    pub tool_name: String,
    /// Query text the model supplied, when it supplied one.
    pub query: Option<String>,
    pub result: ToolResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, RawResultSet};
    use crate::normalize::normalize;
    use serde_json::json;

    #[test]
    fn test_tool_request_from_call_parses_arguments() {
        let call = ToolCall {
            id: "call_1".to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: "queryGraph".to_string(),
                arguments: r#"{"query":"MATCH (r:Room) RETURN r"}"#.to_string(),
            },
        };
        let req = ToolRequest::from_call(&call);
        assert_eq!(req.arguments["query"], "MATCH (r:Room) RETURN r");
        assert_eq!(req.to_call().function.name, "queryGraph");
    }

    #[test]
    fn test_tool_request_bad_json_kept_as_string() {
        let call = ToolCall {
            id: "c".to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: "querySeries".to_string(),
                arguments: "SELECT 1".to_string(),
            },
        };
        assert_eq!(ToolRequest::from_call(&call).arguments, json!("SELECT 1"));
    }

    #[test]
    fn test_same_invocation_ignores_call_id() {
        let a = ToolRequest::new("1", "queryGraph", json!({"query": "RETURN 1"}));
        let b = ToolRequest::new("2", "queryGraph", json!({"query": "RETURN 1"}));
        let c = ToolRequest::new("3", "querySeries", json!({"query": "RETURN 1"}));
        assert!(a.same_invocation(&b));
        assert!(!a.same_invocation(&c));
    }

    #[test]
    fn test_render_ok_result() {
        let req = ToolRequest::new("1", "queryGraph", json!({}));
        let raw = RawResultSet::new(vec!["unit_id".into()], vec![vec![json!("AC-1")]]);
        let result = ToolResult::ok(&req, normalize(&raw, Backend::Graph, 20));
        assert_eq!(
            result.render_for_model(),
            r#"{"status":"ok","row_count":1,"truncated":false,"rows":[{"unit_id":"AC-1"}]}"#
        );
    }

    #[test]
    fn test_render_rejected_result() {
        let req = ToolRequest::new("1", "querySeries", json!({}));
        let result = ToolResult::rejected(&req, "write operation 'DELETE' is not allowed");
        let v: Value = serde_json::from_str(&result.render_for_model()).unwrap();
        assert_eq!(v["status"], "rejected");
        assert_eq!(v["error"], "write operation 'DELETE' is not allowed");
    }
}
