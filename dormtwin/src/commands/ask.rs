//! `dormtwin ask`: one question, one planner run.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use super::{cancel_on_ctrl_c, planner_from_args, render, runtime};
use crate::cli::LlmArgs;

pub fn run_ask(question: &str, llm: &LlmArgs, json: bool, verbose: bool) -> Result<ExitCode> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("question must not be empty");
    }
    let planner = planner_from_args(llm)?;
    let rt = runtime()?;

    let result = rt.block_on(async {
        let token = CancellationToken::new();
        let ctrl_c = cancel_on_ctrl_c(token.clone());
        let result = planner.run(question, &token).await;
        ctrl_c.abort();
        result
    });

    if json {
        let out = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        println!("{}", out);
    } else {
        render::print_result(&result, verbose);
    }

    Ok(if result.outcome.is_answer() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
