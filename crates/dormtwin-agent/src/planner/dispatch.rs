//! Dispatching sub-module: resolve, validate, execute, normalize.
//!
//! Every outcome is a [`ToolResult`]; nothing here ends the run. The
//! validator runs on every call, right before the backend is touched.

use serde_json::json;

use crate::backend::sanitize::sanitize_error;
use crate::normalize::normalize;
use crate::registry::ToolRegistry;
use crate::trace::{RunTrace, TraceEventKind};
use crate::types::{ToolRequest, ToolResult};
use crate::validator;

pub(super) struct Dispatched {
    pub result: ToolResult,
    /// Query text, when the request carried one.
    pub query: Option<String>,
}

pub(super) async fn dispatch(
    registry: &ToolRegistry,
    request: &ToolRequest,
    max_rows: usize,
    trace: &RunTrace,
    iteration: usize,
) -> Dispatched {
    let dispatched = dispatch_inner(registry, request, max_rows, trace, iteration).await;
    let result = &dispatched.result;
    trace.emit(
        TraceEventKind::ToolDispatch,
        iteration,
        json!({
            "tool": request.tool_name,
            "query": dispatched.query,
            "status": result.status,
            "rows": result.row_count(),
            "truncated": result.rows.as_ref().is_some_and(|r| r.truncated),
        }),
    );
    dispatched
}

async fn dispatch_inner(
    registry: &ToolRegistry,
    request: &ToolRequest,
    max_rows: usize,
    trace: &RunTrace,
    iteration: usize,
) -> Dispatched {
    let descriptor = match registry.resolve(&request.tool_name) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(tool = %request.tool_name, "Unknown tool requested");
            return Dispatched {
                result: ToolResult::execution_error(request, e.to_string()),
                query: None,
            };
        }
    };

    let query = match descriptor.extract_query(request) {
        Ok(q) => q,
        Err(e) => {
            tracing::warn!(tool = %request.tool_name, error = %e, "Invalid tool arguments");
            return Dispatched {
                result: ToolResult::execution_error(request, e.to_string()),
                query: None,
            };
        }
    };

    let verdict = validator::validate(descriptor.dialect(), query);
    if !verdict.allowed {
        let reason = verdict.reason.unwrap_or_else(|| "query rejected".to_string());
        tracing::info!(tool = %request.tool_name, reason = %reason, "Query rejected by validator");
        trace.emit(
            TraceEventKind::ValidationRejected,
            iteration,
            json!({
                "tool": request.tool_name,
                "dialect": descriptor.dialect(),
                "query": query,
                "reason": reason,
            }),
        );
        return Dispatched {
            result: ToolResult::rejected(request, reason),
            query: Some(query.to_string()),
        };
    }

    tracing::info!(tool = %request.tool_name, "Executing query");
    let backend = descriptor.backend.kind();
    let result = match descriptor.backend.execute(query).await {
        Ok(raw) => ToolResult::ok(request, normalize(&raw, backend, max_rows)),
        Err(e) => {
            let detail = sanitize_error(&e);
            tracing::warn!(tool = %request.tool_name, error = %detail, "Backend query failed");
            trace.emit(
                TraceEventKind::BackendError,
                iteration,
                json!({
                    "tool": request.tool_name,
                    "backend": backend,
                    "category": e.category(),
                    "detail": detail,
                }),
            );
            ToolResult::execution_error(request, detail)
        }
    };

    Dispatched {
        result,
        query: Some(query.to_string()),
    }
}
