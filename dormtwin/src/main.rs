mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use dormtwin_core::observability::{init_tracing, TracingMode};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mode = match cli.command {
        Commands::Chat { .. } => TracingMode::Chat,
        _ => TracingMode::Default,
    };
    init_tracing(mode);

    match cli.command {
        Commands::Ask { question, llm, json, verbose } => {
            commands::ask::run_ask(&question.join(" "), &llm, json, verbose)
        }
        Commands::Chat { llm, verbose } => commands::chat::run_chat(&llm, verbose),
        Commands::Validate { dialect, query } => {
            Ok(commands::validate::run_validate(dialect.into(), &query.join(" ")))
        }
        Commands::Check => commands::check::run_check(),
    }
}
