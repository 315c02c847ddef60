//! Terminal rendering of planner results.

use dormtwin_agent::types::{AgentStep, ToolStatus};
use dormtwin_agent::PlannerResult;

/// Rows printed per step in verbose mode.
const MAX_ROWS_SHOWN: usize = 10;

pub(super) fn print_steps(steps: &[AgentStep], verbose: bool) {
    if steps.is_empty() {
        return;
    }
    eprintln!("┌─ Queries ─────────────────────────────────────────────────");
    for (i, step) in steps.iter().enumerate() {
        let status = match step.result.status {
            ToolStatus::Ok => {
                let rows = step.result.rows.as_ref();
                let n = rows.map_or(0, |r| r.len());
                let more = if rows.is_some_and(|r| r.truncated) { "+" } else { "" };
                format!("ok, {}{} row(s)", n, more)
            }
            ToolStatus::Rejected => "rejected".to_string(),
            ToolStatus::ExecutionError => "failed".to_string(),
        };
        eprintln!("│  {}. {} ({})", i + 1, step.tool_name, status);
        if let Some(q) = &step.query {
            for line in q.lines() {
                eprintln!("│       {}", line.trim_end());
            }
        }
        if let Some(detail) = &step.result.error_detail {
            eprintln!("│     ✗ {}", detail);
        }
        if verbose {
            if let Some(rows) = &step.result.rows {
                for record in rows.records.iter().take(MAX_ROWS_SHOWN) {
                    let line = serde_json::to_string(record).unwrap_or_default();
                    eprintln!("│     · {}", line);
                }
                if rows.len() > MAX_ROWS_SHOWN {
                    eprintln!("│     · … {} more", rows.len() - MAX_ROWS_SHOWN);
                }
            }
        }
    }
    eprintln!("└───────────────────────────────────────────────────────────");
}

pub(super) fn print_result(result: &PlannerResult, verbose: bool) {
    print_steps(&result.steps, verbose);
    println!("\n{}", result.response);
    if verbose {
        eprintln!(
            "\n({} iteration(s), {} tool call(s), {} ms)",
            result.iterations, result.tool_calls, result.elapsed_ms
        );
    }
}
