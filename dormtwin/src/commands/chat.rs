//! `dormtwin chat`: interactive REPL. Each line is answered by a fresh
//! planner run; nothing carries over between questions.

use std::process::ExitCode;

use anyhow::Result;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;

use super::{cancel_on_ctrl_c, planner_from_args, render, runtime};
use crate::cli::LlmArgs;

pub fn run_chat(llm: &LlmArgs, verbose: bool) -> Result<ExitCode> {
    let planner = planner_from_args(llm)?;
    let rt = runtime()?;

    eprintln!("┌────────────────────────────────────────────────────────────");
    eprintln!("│  dormtwin chat  ·  max {} iteration(s) per question", planner.settings().max_iterations);
    eprintln!("│  /exit to quit  ·  Ctrl-C cancels a running question");
    eprintln!("└────────────────────────────────────────────────────────────\n");

    let mut rl = rustyline::DefaultEditor::new()
        .map_err(|e| anyhow::anyhow!("Failed to create line editor: {}", e))?;

    loop {
        match rl.readline("You> ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);
                if matches!(input, "/exit" | "/quit" | "/q") {
                    break;
                }

                let result = rt.block_on(async {
                    let token = CancellationToken::new();
                    let ctrl_c = cancel_on_ctrl_c(token.clone());
                    let result = planner.run(input, &token).await;
                    ctrl_c.abort();
                    result
                });
                render::print_result(&result, verbose);
                println!();
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Readline error");
                break;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
