//! dormtwin-agent: answers building questions by letting a language model
//! query a graph store and a time-series store through validated, read-only
//! tools.
//!
//! Layers, leaves first:
//!   - `validator`: deny-by-keyword read-only gate per dialect
//!   - `registry`:  the closed tool set and its backend bindings
//!   - `normalize`: backend rows to ordered scalar records
//!   - `planner`:   the bounded model ↔ tool loop
//!   - `trace`:     best-effort structured events around each step
//!
//! Thin adapters: `llm` (completion capability) and `backend` (Neo4j HTTP,
//! InfluxDB 3 SQL).

pub mod backend;
pub mod conversation;
pub mod llm;
pub mod normalize;
pub mod planner;
pub mod prompt;
pub mod registry;
pub mod trace;
pub mod types;
pub mod validator;

use std::sync::Arc;

use anyhow::Result;

pub use backend::{Backend, BackendError, InfluxSqlBackend, Neo4jHttpBackend, QueryBackend, RawResultSet};
pub use llm::{CompletionProvider, LlmClient};
pub use planner::{FailureReason, LoopOutcome, Planner, PlannerResult};
pub use registry::{ToolKind, ToolRegistry};
pub use types::AgentConfig;
pub use validator::{validate, Dialect, ValidationVerdict};

/// Wire both HTTP backends from config.
pub fn build_registry(config: &AgentConfig) -> Result<ToolRegistry> {
    let graph: Arc<dyn QueryBackend> = Arc::new(Neo4jHttpBackend::new(&config.graph)?);
    let series: Arc<dyn QueryBackend> = Arc::new(InfluxSqlBackend::new(&config.series)?);
    Ok(ToolRegistry::standard(graph, series))
}

/// Planner backed by the configured LLM and both HTTP backends, tracing to
/// `tracing` plus the optional JSONL trace log.
pub fn build_planner(config: &AgentConfig, trace_log: Option<&str>) -> Result<Planner> {
    let provider: Arc<dyn CompletionProvider> = Arc::new(LlmClient::new(&config.llm)?);
    let registry = build_registry(config)?;
    Ok(Planner::new(provider, registry, config.planner.clone()).with_trace_sink(trace::default_sink(trace_log)))
}
