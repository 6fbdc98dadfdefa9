//! Tracing initialization for the dental MCP servers.
//!
//! Output always goes to stderr: under the stdio transport stdout carries the
//! MCP protocol and a stray log line would corrupt it.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives, e.g. `info` or `warn,dental_mcp_speech=debug`
//! - `LOG_FORMAT`: `text` (default) or `json` for log collectors on hosted platforms

use std::str::FromStr;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable single-line output
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format '{}'. Valid options: text, json", other)),
        }
    }
}

impl LogFormat {
    /// Read `LOG_FORMAT`, falling back to text for unset or unknown values.
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Try to install the global subscriber.
///
/// Returns `Err(())` if a subscriber is already set, which happens when tests
/// initialize tracing more than once per process.
pub fn try_init_tracing_with(default_level: &str, format: LogFormat) -> Result<(), ()> {
    let registry = tracing_subscriber::registry().with(env_filter(default_level));

    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::NONE),
            )
            .try_init()
            .map_err(|_| ()),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
            .map_err(|_| ()),
    }
}

/// Initialize tracing with `info` as the default level.
///
/// A second call is a no-op.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Initialize tracing with a custom default level used when `RUST_LOG` is unset.
pub fn init_tracing_with_default(default_level: &str) {
    if try_init_tracing_with(default_level, LogFormat::from_env()).is_err() {
        tracing::debug!("Tracing subscriber already initialized");
    }
}
