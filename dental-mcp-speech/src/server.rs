//! MCP Server implementation for the Speech server.
//!
//! Exposes a single `speech_synthesize` tool so an agent can narrate
//! appointment confirmations and reminders.

use crate::converter::{AUDIO_MIME_TYPE, SpeechConverter};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use dental_mcp_common::config::SpeechConfig;
use dental_mcp_common::error::Error;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo, Tool},
};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::info;

/// Tool name.
pub const SYNTHESIZE_TOOL: &str = "speech_synthesize";

/// MCP Server for speech synthesis.
#[derive(Clone)]
pub struct SpeechServer {
    /// Converter shared by all tool calls. Credentials are only checked by
    /// the remote service on the first request.
    converter: Arc<SpeechConverter>,
}

/// Tool parameters for speech_synthesize.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SpeechSynthesizeToolParams {
    /// Text to narrate
    pub text: String,
    /// ElevenLabs voice id; the configured default voice is used when omitted
    #[serde(default)]
    pub voice_id: Option<String>,
    /// Local path to write the MP3 to; base64 audio is returned when omitted
    #[serde(default)]
    pub output_file: Option<String>,
}

impl SpeechServer {
    /// Create a new SpeechServer with the given configuration.
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            converter: Arc::new(SpeechConverter::new(config)),
        }
    }

    /// Synthesize speech and return it as MCP content.
    pub async fn synthesize(
        &self,
        params: SpeechSynthesizeToolParams,
    ) -> Result<CallToolResult, McpError> {
        info!(text_len = params.text.len(), "Synthesizing speech");

        let converter = &self.converter;
        let audio = converter
            .synthesize(&params.text, params.voice_id.as_deref())
            .await
            .map_err(to_mcp_error)?;

        let content = match params.output_file {
            Some(path) => {
                converter.persist(&audio, &path).await.map_err(to_mcp_error)?;
                Content::text(format!("Audio saved to: {}", path))
            }
            None => Content::text(format!(
                "data:{};base64,{}",
                AUDIO_MIME_TYPE,
                BASE64.encode(&audio)
            )),
        };

        Ok(CallToolResult::success(vec![content]))
    }
}

fn to_mcp_error(err: Error) -> McpError {
    if err.is_validation() {
        McpError::invalid_params(err.to_string(), None)
    } else {
        McpError::internal_error(format!("Speech synthesis failed: {}", err), None)
    }
}

/// Definitions of the tools this server exposes.
pub fn tool_definitions() -> Vec<Tool> {
    let schema = schema_for!(SpeechSynthesizeToolParams);
    let input_schema = match serde_json::to_value(&schema).unwrap_or_default() {
        serde_json::Value::Object(map) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    };

    vec![Tool {
        name: Cow::Borrowed(SYNTHESIZE_TOOL),
        description: Some(Cow::Borrowed(
            "Convert text to speech with an ElevenLabs voice. \
             Returns base64-encoded MP3 audio or saves it to a local file.",
        )),
        input_schema,
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }]
}

impl ServerHandler for SpeechServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Text-to-speech server backed by ElevenLabs. \
                 Use the speech_synthesize tool to turn appointment messages into MP3 audio."
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
            match params.name.as_ref() {
                SYNTHESIZE_TOOL => {
                    let tool_params: SpeechSynthesizeToolParams = params
                        .arguments
                        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
                        .transpose()
                        .map_err(|e| {
                            McpError::invalid_params(format!("Invalid parameters: {}", e), None)
                        })?
                        .ok_or_else(|| McpError::invalid_params("Missing parameters", None))?;

                    self.synthesize(tool_params).await
                }
                _ => Err(McpError::invalid_params(
                    format!("Unknown tool: {}", params.name),
                    None,
                )),
            }
        }
    }
}
