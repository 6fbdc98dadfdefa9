//! Dental MCP Calendar Server Library
//!
//! MCP server that lets a voice agent check availability, book, list, cancel
//! and reschedule dental appointments in Google Calendar.
//!
//! Besides the `/mcp` endpoint, the HTTP transport serves status routes and a
//! session-less JSON-RPC endpoint at `POST /` (see [`routes`]).

pub mod client;
pub mod handler;
pub mod routes;
pub mod server;
pub mod slots;

pub use client::{CalendarClient, Event, EventDateTime};
pub use handler::CalendarHandler;
pub use server::CalendarServer;
