//! Server startup integration tests.
//!
//! Both servers defer credential checks to the first tool call, so they must
//! come up with nothing but defaults.

use dental_mcp_common::{CalendarConfig, SpeechConfig};
use rmcp::ServerHandler;

fn speech_config() -> SpeechConfig {
    SpeechConfig::new("test-key").with_base_url("http://127.0.0.1:1")
}

fn calendar_config() -> CalendarConfig {
    CalendarConfig {
        api_base_url: "http://127.0.0.1:1".to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dental_mcp_calendar::CalendarServer;
    use dental_mcp_common::McpServerBuilder;
    use dental_mcp_speech::SpeechServer;

    #[test]
    fn test_speech_server_startup() {
        let info = SpeechServer::new(speech_config()).get_info();
        let instructions = info.instructions.unwrap().to_lowercase();
        assert!(instructions.contains("speech"));
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_calendar_server_startup_without_credentials() {
        let info = CalendarServer::new(calendar_config()).get_info();
        let instructions = info.instructions.unwrap().to_lowercase();
        assert!(instructions.contains("appointment"));
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_no_server_offers_resources() {
        assert!(SpeechServer::new(speech_config()).get_info().capabilities.resources.is_none());
        assert!(CalendarServer::new(calendar_config()).get_info().capabilities.resources.is_none());
    }

    #[tokio::test]
    async fn test_calendar_router_builds_with_status_routes() {
        let server = CalendarServer::new(calendar_config());
        let _router = McpServerBuilder::new(server.clone())
            .with_routes(dental_mcp_calendar::routes::router(server))
            .router();
    }
}
