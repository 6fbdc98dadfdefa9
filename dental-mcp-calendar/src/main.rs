//! Dental MCP Calendar Server
//!
//! MCP server for booking dental appointments in Google Calendar.

use anyhow::Result;
use clap::Parser;
use dental_mcp_calendar::{CalendarServer, routes};
use dental_mcp_common::{CalendarConfig, McpServerBuilder, TransportArgs};

#[derive(Parser, Debug)]
#[command(name = "dental-mcp-calendar")]
#[command(about = "MCP server for dental appointments in Google Calendar")]
struct Args {
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dental_mcp_common::tracing::init_tracing();

    let args = Args::parse();
    let config = CalendarConfig::from_env()?;

    if config.oauth_credentials.is_none() {
        tracing::warn!("GOOGLE_OAUTH_CREDENTIALS not set; tool calls will fail until it is");
    }
    tracing::info!(
        calendar_id = %config.calendar_id,
        timezone = config.timezone.name(),
        hours = %config.hours.label(),
        "dental-mcp-calendar server starting..."
    );

    let server = CalendarServer::new(config);
    let transport = args.transport.into_transport();

    McpServerBuilder::new(server.clone())
        .with_transport(transport)
        .with_routes(routes::router(server))
        .run()
        .await?;

    Ok(())
}
