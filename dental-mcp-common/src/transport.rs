//! MCP transport selection.
//!
//! The servers speak MCP over stdio when launched as a subprocess by a local
//! agent, or over streamable HTTP when deployed behind a public URL for a hosted
//! voice agent. SSE clients are answered by the same HTTP service.
//!
//! # Example
//!
//! ```ignore
//! use dental_mcp_common::transport::TransportArgs;
//! use clap::Parser;
//!
//! #[derive(Parser)]
//! struct Args {
//!     #[command(flatten)]
//!     transport: TransportArgs,
//! }
//!
//! let transport = Args::parse().transport.into_transport();
//! ```

use clap::{Args, ValueEnum};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Port used when neither `--port` nor `PORT` is given.
pub const DEFAULT_PORT: u16 = 8000;

/// Transport mode for MCP server communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Standard input/output (default). Logs must go to stderr in this mode.
    #[default]
    Stdio,
    /// Streamable HTTP on the given address.
    Http {
        /// Address to bind
        addr: SocketAddr,
    },
    /// Server-Sent Events on the given address.
    Sse {
        /// Address to bind
        addr: SocketAddr,
    },
}

impl Transport {
    /// Create a new stdio transport.
    pub fn stdio() -> Self {
        Transport::Stdio
    }

    /// HTTP transport on all interfaces.
    pub fn http(port: u16) -> Self {
        Transport::Http {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        }
    }

    /// SSE transport on all interfaces.
    pub fn sse(port: u16) -> Self {
        Transport::Sse {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        }
    }

    /// Whether this is the stdio transport.
    pub fn is_stdio(&self) -> bool {
        matches!(self, Transport::Stdio)
    }

    /// Bound address for network transports.
    pub fn addr(&self) -> Option<SocketAddr> {
        match self {
            Transport::Stdio => None,
            Transport::Http { addr } | Transport::Sse { addr } => Some(*addr),
        }
    }

    /// Port for network transports.
    pub fn port(&self) -> Option<u16> {
        self.addr().map(|a| a.port())
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio => write!(f, "stdio"),
            Transport::Http { addr } => write!(f, "http ({})", addr),
            Transport::Sse { addr } => write!(f, "sse ({})", addr),
        }
    }
}

/// Transport mode parsed from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    #[default]
    Stdio,
    Http,
    Sse,
}

/// Command-line arguments for transport configuration.
#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Transport mode
    #[arg(long, value_enum, env = "MCP_TRANSPORT", default_value_t = TransportMode::Stdio, ignore_case = true)]
    pub transport: TransportMode,

    /// Interface to bind for HTTP/SSE
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port for HTTP/SSE (platforms such as Railway inject PORT)
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl TransportArgs {
    /// Convert command-line arguments into a Transport configuration.
    pub fn into_transport(self) -> Transport {
        let addr = SocketAddr::new(self.host, self.port);
        match self.transport {
            TransportMode::Stdio => Transport::Stdio,
            TransportMode::Http => Transport::Http { addr },
            TransportMode::Sse => Transport::Sse { addr },
        }
    }
}

impl Default for TransportArgs {
    fn default() -> Self {
        Self {
            transport: TransportMode::Stdio,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}
