//! `dormtwin check`: reachability of both backends and LLM configuration.

use std::process::ExitCode;

use anyhow::{Context, Result};

use dormtwin_agent::backend::sanitize::sanitize_error;
use dormtwin_agent::{build_registry, AgentConfig};

use super::runtime;

pub fn run_check() -> Result<ExitCode> {
    let config = AgentConfig::from_env();
    let registry = build_registry(&config).context("Failed to set up backends")?;
    let rt = runtime()?;

    eprintln!("graph:  {} (database {})", config.graph.url, config.graph.database);
    eprintln!("series: {} (database {})", config.series.url, config.series.database);

    let mut healthy = true;
    rt.block_on(async {
        for descriptor in registry.descriptors() {
            match descriptor.backend.ping().await {
                Ok(()) => println!("✓ {} ({}) reachable", descriptor.kind, descriptor.backend.kind()),
                Err(e) => {
                    healthy = false;
                    println!("✗ {} ({}) {}", descriptor.kind, descriptor.backend.kind(), sanitize_error(&e));
                }
            }
        }
    });

    if config.llm.api_key.trim().is_empty() {
        healthy = false;
        println!("✗ llm: no API key configured");
    } else {
        println!("✓ llm: {} via {}", config.llm.model, config.llm.api_base);
    }

    Ok(if healthy { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
