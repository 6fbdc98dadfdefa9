//! Workspace-level integration tests for the dental voice desk MCP servers.
//!
//! These tests verify:
//! - Each server can be created without credentials
//! - Tool registration and schema generation across both servers
//! - Parameter validation at the tool boundary

pub mod server_startup;
pub mod tool_schema;
