use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

/// Tether API client
#[derive(Debug, Parser)]
#[command(name = "tether", about = "Call a JSON API that reports errors as RFC 9457 problem documents")]
pub struct Args {
    /// Log filter, overrides the configured one
    #[arg(long, env = "TETHER_LOG")]
    pub log_filter: Option<String>,

    /// Per-request timeout such as `10s` or `1m30s`
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a resource, retrying transient failures
    Get { path: String },
    /// Delete a resource
    Delete { path: String },
    /// Create a resource
    Post(WithBody),
    /// Replace a resource
    Put(WithBody),
    /// Update part of a resource
    Patch(WithBody),
    /// Validate configuration and print the effective settings
    CheckConfig,
}

#[derive(Debug, clap::Args)]
pub struct WithBody {
    pub path: String,

    /// JSON request body
    #[arg(short, long, value_parser = parse_json)]
    pub data: Value,
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    duration_str::parse(raw).map_err(|e| e.to_string())
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))
}
