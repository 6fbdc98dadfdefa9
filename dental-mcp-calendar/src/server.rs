//! MCP Server implementation for the Calendar server.
//!
//! This module provides the MCP server handler that exposes:
//! - `check_available_slots` to find free slots on a day
//! - `book_appointment` to create an appointment
//! - `list_appointments` for a date range
//! - `get_appointment_details` for one appointment
//! - `cancel_appointment` which marks an appointment as cancelled
//! - `reschedule_appointment` which moves an appointment
//!
//! [`CalendarServer::call_tool_json`] is shared by the MCP transport and the
//! plain JSON-RPC route in [`crate::routes`].

use crate::handler::{
    AppointmentIdParams, BookAppointmentParams, CalendarHandler, CancelAppointmentParams,
    CheckSlotsParams, ListAppointmentsParams, RescheduleAppointmentParams,
};
use dental_mcp_common::config::CalendarConfig;
use dental_mcp_common::error::Error;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo, Tool},
};
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const CHECK_SLOTS_TOOL: &str = "check_available_slots";
pub const BOOK_TOOL: &str = "book_appointment";
pub const LIST_TOOL: &str = "list_appointments";
pub const DETAILS_TOOL: &str = "get_appointment_details";
pub const CANCEL_TOOL: &str = "cancel_appointment";
pub const RESCHEDULE_TOOL: &str = "reschedule_appointment";

/// MCP Server for dental appointments.
#[derive(Clone)]
pub struct CalendarServer {
    /// Handler for calendar operations, created on first tool call
    handler: Arc<RwLock<Option<CalendarHandler>>>,
    /// Server configuration
    config: CalendarConfig,
}

impl CalendarServer {
    /// Create a new CalendarServer with the given configuration.
    ///
    /// Credentials are not read until the first tool call.
    pub fn new(config: CalendarConfig) -> Self {
        Self {
            handler: Arc::new(RwLock::new(None)),
            config,
        }
    }

    /// Create a server around a ready handler.
    pub fn with_handler(handler: CalendarHandler) -> Self {
        Self {
            config: handler.config.clone(),
            handler: Arc::new(RwLock::new(Some(handler))),
        }
    }

    /// Initialize the handler (called lazily on first use).
    async fn ensure_handler(&self) -> Result<(), Error> {
        if self.handler.read().await.is_some() {
            return Ok(());
        }
        let mut handler = self.handler.write().await;
        if handler.is_none() {
            *handler = Some(CalendarHandler::new(self.config.clone())?);
        }
        Ok(())
    }

    /// Run a tool and return its result as JSON text.
    ///
    /// Arguments are checked before the calendar service is initialized, so
    /// bad input is reported as such even when credentials are missing.
    pub async fn call_tool_json(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<String, McpError> {
        let call = ToolCall::parse(name, arguments)?;

        info!(tool = %name, "Calling tool");

        self.ensure_handler().await.map_err(|e| {
            warn!(error = %e, "Calendar service unavailable");
            McpError::internal_error(format!("Failed to initialize calendar service: {}", e), None)
        })?;

        let handler_guard = self.handler.read().await;
        let handler = handler_guard
            .as_ref()
            .ok_or_else(|| McpError::internal_error("Handler not initialized", None))?;

        match call {
            ToolCall::CheckSlots(p) => encode(name, handler.check_available_slots(p).await),
            ToolCall::Book(p) => encode(name, handler.book_appointment(p).await),
            ToolCall::List(p) => encode(name, handler.list_appointments(p).await),
            ToolCall::Details(p) => encode(name, handler.get_appointment_details(p).await),
            ToolCall::Cancel(p) => encode(name, handler.cancel_appointment(p).await),
            ToolCall::Reschedule(p) => encode(name, handler.reschedule_appointment(p).await),
        }
    }
}

/// A tool call with its decoded arguments.
enum ToolCall {
    CheckSlots(CheckSlotsParams),
    Book(BookAppointmentParams),
    List(ListAppointmentsParams),
    Details(AppointmentIdParams),
    Cancel(CancelAppointmentParams),
    Reschedule(RescheduleAppointmentParams),
}

impl ToolCall {
    /// Missing `arguments` are treated as an empty object so that the
    /// parameter error names the missing field.
    fn parse(name: &str, arguments: Option<Map<String, Value>>) -> Result<Self, McpError> {
        let arguments = Value::Object(arguments.unwrap_or_default());
        Ok(match name {
            CHECK_SLOTS_TOOL => Self::CheckSlots(parse_args(arguments)?),
            BOOK_TOOL => Self::Book(parse_args(arguments)?),
            LIST_TOOL => Self::List(parse_args(arguments)?),
            DETAILS_TOOL => Self::Details(parse_args(arguments)?),
            CANCEL_TOOL => Self::Cancel(parse_args(arguments)?),
            RESCHEDULE_TOOL => Self::Reschedule(parse_args(arguments)?),
            _ => {
                return Err(McpError::invalid_params(format!("Unknown tool: {}", name), None));
            }
        })
    }
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, McpError> {
    serde_json::from_value(arguments)
        .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {}", e), None))
}

fn encode<T: Serialize>(tool: &str, result: Result<T, Error>) -> Result<String, McpError> {
    let value = result.map_err(|e| to_mcp_error(tool, e))?;
    serde_json::to_string(&value).map_err(|e| to_mcp_error(tool, e.into()))
}

fn to_mcp_error(tool: &str, err: Error) -> McpError {
    if err.is_validation() {
        McpError::invalid_params(err.to_string(), None)
    } else {
        warn!(tool = %tool, error = %err, "Tool failed");
        McpError::internal_error(format!("{} failed: {}", tool, err), None)
    }
}

fn input_schema<T: JsonSchema>() -> Arc<Map<String, Value>> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema).unwrap_or_default() {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(Map::new()),
    }
}

fn tool(name: &'static str, description: &'static str, input_schema: Arc<Map<String, Value>>) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        description: Some(Cow::Borrowed(description)),
        input_schema,
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }
}

/// Definitions of every tool, in the order they are listed.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        tool(
            CHECK_SLOTS_TOOL,
            "Check available appointment slots for a specific date (YYYY-MM-DD). \
             Returns free start times within business hours.",
            input_schema::<CheckSlotsParams>(),
        ),
        tool(
            BOOK_TOOL,
            "Book a new appointment for a patient at a date (YYYY-MM-DD) and time (HH:MM).",
            input_schema::<BookAppointmentParams>(),
        ),
        tool(
            LIST_TOOL,
            "List appointments between two dates (YYYY-MM-DD), both inclusive.",
            input_schema::<ListAppointmentsParams>(),
        ),
        tool(
            DETAILS_TOOL,
            "Get details of a specific appointment by event id.",
            input_schema::<AppointmentIdParams>(),
        ),
        tool(
            CANCEL_TOOL,
            "Cancel an appointment. The event is kept and marked as cancelled with the reason.",
            input_schema::<CancelAppointmentParams>(),
        ),
        tool(
            RESCHEDULE_TOOL,
            "Reschedule an appointment to a new date (YYYY-MM-DD) and time (HH:MM).",
            input_schema::<RescheduleAppointmentParams>(),
        ),
    ]
}

impl ServerHandler for CalendarServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Appointment calendar of a dental practice backed by Google Calendar. \
                 Use check_available_slots before book_appointment; list_appointments, \
                 get_appointment_details, cancel_appointment and reschedule_appointment \
                 manage existing appointments."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<rmcp::model::ListToolsResult, McpError>> + Send + '_
    {
        async move {
            Ok(rmcp::model::ListToolsResult {
                tools: tool_definitions(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let text = self.call_tool_json(params.name.as_ref(), params.arguments).await?;
            Ok(CallToolResult::success(vec![Content::text(text)]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;
    use serde_json::json;

    fn args(value: Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn test_server_info() {
        let server = CalendarServer::new(CalendarConfig::default());
        let info = server.get_info();
        assert!(info.instructions.unwrap().contains("check_available_slots"));
    }

    #[tokio::test]
    async fn test_ready_handler_is_not_write_locked() {
        let config = CalendarConfig::default();
        let client = crate::client::CalendarClient::new(
            &config,
            dental_mcp_common::auth::AuthProvider::static_token("t"),
        );
        let server = CalendarServer::with_handler(CalendarHandler::with_client(config, client));

        // A call in flight holds a read guard; another call must not wait for it.
        let in_flight = server.handler.read().await;
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            server.ensure_handler(),
        )
        .await;
        drop(in_flight);

        assert!(matches!(result, Ok(Ok(()))));
    }

    #[test]
    fn test_tool_definitions() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(
            names,
            vec![
                CHECK_SLOTS_TOOL,
                BOOK_TOOL,
                LIST_TOOL,
                DETAILS_TOOL,
                CANCEL_TOOL,
                RESCHEDULE_TOOL
            ]
        );

        let book = &tools[1];
        let required = book.input_schema.get("required").unwrap().as_array().unwrap();
        assert_eq!(required.len(), 5);

        let cancel = &tools[4];
        let required = cancel.input_schema.get("required").unwrap().as_array().unwrap();
        assert_eq!(required, &vec![json!("event_id")]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let server = CalendarServer::new(CalendarConfig::default());
        let err = server.call_tool_json("delete_everything", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("delete_everything"));
    }

    #[tokio::test]
    async fn test_bad_arguments_reported_before_credentials() {
        let server = CalendarServer::new(CalendarConfig::default());
        let err = server
            .call_tool_json(RESCHEDULE_TOOL, args(json!({"event_id": "e1"})))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("new_date"));
    }

    #[tokio::test]
    async fn test_missing_credentials_reported_on_call() {
        let server = CalendarServer::new(CalendarConfig::default());
        let err = server
            .call_tool_json(CHECK_SLOTS_TOOL, args(json!({"date": "2025-03-04"})))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("GOOGLE_OAUTH_CREDENTIALS"));
    }

    #[test]
    fn test_validation_maps_to_invalid_params() {
        let err = to_mcp_error(BOOK_TOOL, Error::validation("date is required"));
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_api_failure_maps_to_internal_error() {
        let err = to_mcp_error(LIST_TOOL, Error::api("/events", 503, "backend down"));
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.starts_with("list_appointments failed"));
    }
}
