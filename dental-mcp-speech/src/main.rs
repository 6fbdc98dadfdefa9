//! Dental MCP Speech Server
//!
//! MCP server for text-to-speech using the ElevenLabs API. With `--say` it
//! instead converts a single message and writes it to `--out`.

use anyhow::Result;
use clap::Parser;
use dental_mcp_common::{McpServerBuilder, SpeechConfig, TransportArgs};
use dental_mcp_speech::{SpeechConverter, SpeechServer};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dental-mcp-speech")]
#[command(about = "MCP server for text-to-speech using the ElevenLabs API")]
struct Args {
    #[command(flatten)]
    transport: TransportArgs,

    /// Convert this text once and exit instead of serving MCP
    #[arg(long)]
    say: Option<String>,

    /// Voice id for --say
    #[arg(long, requires = "say")]
    voice_id: Option<String>,

    /// Output file for --say
    #[arg(long, default_value = "output.mp3")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dental_mcp_common::tracing::init_tracing();

    let args = Args::parse();
    let config = SpeechConfig::from_env()?;

    if let Some(text) = args.say {
        let converter = SpeechConverter::new(config);
        converter
            .synthesize_to_file(&text, args.voice_id.as_deref(), &args.out)
            .await?;
        return Ok(());
    }

    tracing::info!("dental-mcp-speech server starting...");

    let server = SpeechServer::new(config);
    let transport = args.transport.into_transport();

    McpServerBuilder::new(server)
        .with_transport(transport)
        .run()
        .await?;

    Ok(())
}
