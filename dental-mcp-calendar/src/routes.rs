//! Plain HTTP routes served next to the MCP endpoint.
//!
//! Some voice platforms post bare JSON-RPC to the server root instead of
//! opening an MCP session, so `POST /` answers `tools/list` and `tools/call`
//! directly. The remaining routes are status probes.

use crate::server::{CalendarServer, tool_definitions};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use rmcp::model::{ErrorCode, ProtocolVersion};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

/// Name reported by the status routes.
pub const SERVER_NAME: &str = "dental-calendar-mcp";

/// Interface version reported by the status routes.
pub const SERVER_VERSION: &str = "1.0.0";

const JSONRPC_VERSION: &str = "2.0";

/// Build the status and JSON-RPC routes.
pub fn router(server: CalendarServer) -> Router {
    Router::new()
        .route("/", get(status).post(json_rpc))
        .route("/health", get(health))
        .route("/mcp/info", get(mcp_info))
        .with_state(server)
}

async fn status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "server": SERVER_NAME,
        "version": SERVER_VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health() -> Json<&'static str> {
    Json("ok")
}

async fn mcp_info() -> Json<Value> {
    Json(json!({
        "protocol": "mcp",
        "version": SERVER_VERSION,
        "capabilities": {"tools": true},
        "server": SERVER_NAME,
    }))
}

async fn json_rpc(State(server): State<CalendarServer>, body: Bytes) -> Response {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Unparsable JSON-RPC body");
            return Json(error_response(
                Value::Null,
                ErrorCode::PARSE_ERROR,
                format!("Parse error: {}", e),
            ))
            .into_response();
        }
    };

    match dispatch(&server, request).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Answer one JSON-RPC request. Returns `None` for notifications.
pub async fn dispatch(server: &CalendarServer, request: Value) -> Option<Value> {
    let Value::Object(mut request) = request else {
        return Some(error_response(
            Value::Null,
            ErrorCode::INVALID_REQUEST,
            "Invalid Request",
        ));
    };

    let id = request.remove("id");
    let Some(method) = request.get("method").and_then(Value::as_str).map(str::to_string) else {
        return Some(error_response(
            id.unwrap_or(Value::Null),
            ErrorCode::INVALID_REQUEST,
            "Invalid Request: missing method",
        ));
    };
    if id.is_none() && method.starts_with("notifications/") {
        debug!(method = %method, "Ignoring notification");
        return None;
    }
    let id = id.unwrap_or(Value::Null);
    let params = request.remove("params").unwrap_or(Value::Null);

    info!(method = %method, "JSON-RPC request");

    let response = match method.as_str() {
        "initialize" => success_response(
            id,
            json!({
                "protocolVersion": ProtocolVersion::LATEST,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
            }),
        ),
        "ping" => success_response(id, json!({})),
        "tools/list" => success_response(id, json!({ "tools": tool_definitions() })),
        "tools/call" => call_tool(server, id, params).await,
        other => error_response(
            id,
            ErrorCode::METHOD_NOT_FOUND,
            format!("Unknown method: {}", other),
        ),
    };
    Some(response)
}

async fn call_tool(server: &CalendarServer, id: Value, params: Value) -> Value {
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return error_response(id, ErrorCode::INVALID_PARAMS, "Missing tool name");
    };
    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => {
            return error_response(id, ErrorCode::INVALID_PARAMS, "arguments must be an object");
        }
    };

    match server.call_tool_json(name, arguments).await {
        Ok(text) => success_response(
            id,
            json!({ "content": [{"type": "text", "text": text}] }),
        ),
        Err(e) => error_response(id, e.code, e.message),
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": result })
}

fn error_response(id: Value, code: ErrorCode, message: impl Into<String>) -> Value {
    let mut error = Map::new();
    error.insert("code".to_string(), json!(code.0));
    error.insert("message".to_string(), Value::String(message.into()));
    json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "error": error })
}
