//! Subcommand handlers. `main` only parses arguments and dispatches here.

pub mod ask;
pub mod chat;
pub mod check;
mod render;
pub mod validate;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use dormtwin_agent::{build_planner, AgentConfig, Planner};
use dormtwin_core::config::ObservabilityConfig;

use crate::cli::LlmArgs;

/// Environment config with CLI overrides applied.
pub(crate) fn build_config(args: &LlmArgs) -> AgentConfig {
    let mut config = AgentConfig::from_env();
    if let Some(base) = &args.api_base {
        config.llm.api_base = base.trim_end_matches('/').to_string();
    }
    if let Some(key) = &args.api_key {
        config.llm.api_key = key.clone();
    }
    if let Some(model) = &args.model {
        config.llm.model = model.clone();
    }
    if let Some(n) = args.max_iterations {
        config.planner.max_iterations = n.max(1);
    }
    if let Some(secs) = args.timeout {
        config.planner.question_timeout_secs = (secs > 0).then_some(secs);
    }
    config
}

/// Planner from env + CLI overrides. Fails early when no API key is set.
pub(crate) fn planner_from_args(args: &LlmArgs) -> Result<Planner> {
    let config = build_config(args);
    if config.llm.api_key.trim().is_empty() {
        anyhow::bail!(
            "API key required. Set DORMTWIN_API_KEY (or OPENAI_API_KEY / GEMINI_API_KEY) or use --api-key."
        );
    }
    let trace_log = ObservabilityConfig::from_env().trace_log.as_deref();
    build_planner(&config, trace_log).context("Failed to set up planner")
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create tokio runtime")
}

/// Cancel `token` on Ctrl-C. Abort the handle once the guarded work is done.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling…");
            token.cancel();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_win() {
        let args = LlmArgs {
            api_base: Some("http://localhost:11434/v1/".to_string()),
            api_key: Some("k".to_string()),
            model: Some("qwen2.5:7b".to_string()),
            max_iterations: Some(0),
            timeout: Some(0),
        };
        let config = build_config(&args);
        assert_eq!(config.llm.api_base, "http://localhost:11434/v1");
        assert_eq!(config.llm.model, "qwen2.5:7b");
        assert_eq!(config.planner.max_iterations, 1);
        assert!(config.planner.question_timeout_secs.is_none());
    }
}
