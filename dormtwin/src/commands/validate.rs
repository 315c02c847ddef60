//! `dormtwin validate`: run the read-only gate on a query without executing it.

use std::process::ExitCode;

use dormtwin_agent::{validate, Dialect};

pub fn run_validate(dialect: Dialect, query: &str) -> ExitCode {
    let verdict = validate(dialect, query);
    if verdict.allowed {
        println!("allowed ({})", dialect);
        ExitCode::SUCCESS
    } else {
        println!("rejected: {}", verdict.reason.as_deref().unwrap_or("query rejected"));
        ExitCode::FAILURE
    }
}
