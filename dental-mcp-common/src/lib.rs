//! Dental MCP Common Library
//!
//! Shared utilities for configuration, Google OAuth, error handling, tracing and
//! MCP transport setup used by the speech and calendar servers.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod tracing;
pub mod transport;

#[cfg(test)]
mod server_test;

pub use config::{BusinessHours, CalendarConfig, SpeechConfig, SynthesisProfile};
pub use error::{AuthError, ConfigError, Error, Result, SynthesisError};
pub use server::{McpServerBuilder, ServerError, shutdown_channel};
pub use transport::{Transport, TransportArgs, TransportMode};
