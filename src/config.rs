//! Server configuration
//!
//! [`ServerOptions`] carries every tunable of the server: listener address, route
//! paths, origin policy and the per-connection limits. Values start from
//! [`ServerOptions::default`] and can be overridden from command-line flags or
//! their environment variables, parsed by [`Args`].

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::errors::Error;

/// Maximum inbound message size in bytes
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4096;
/// Idle-read timeout, reset after every successful read
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
/// Deadline for writing a single response
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Origins accepted by exact (case-insensitive) match
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "http://localhost:4000",
    "http://localhost:8080",
    "http://127.0.0.1:4000",
    "http://127.0.0.1:8080",
];

/// Substrings that admit any origin containing them (development hosts)
pub const DEFAULT_DEV_ORIGIN_SUBSTRINGS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Configuration options for the server
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Address to bind the listener to
    pub bind_address: SocketAddr,
    /// Path for the WebSocket endpoint
    pub websocket_path: String,
    /// Path for the plain HTTP landing endpoint
    pub landing_path: String,
    /// Fully qualified origins allowed to connect
    pub allowed_origins: Vec<String>,
    /// Origin substrings that bypass the allow-list
    pub dev_origin_substrings: Vec<String>,
    /// Maximum size of an inbound message in bytes
    pub max_message_size: usize,
    /// Idle-read timeout
    pub idle_timeout: Duration,
    /// Write timeout
    pub write_timeout: Duration,
    /// Enable debug logging
    pub verbose: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 4000)),
            websocket_path: "/ws".to_string(),
            landing_path: "/".to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            dev_origin_substrings: DEFAULT_DEV_ORIGIN_SUBSTRINGS.iter()
                .map(|s| s.to_string())
                .collect(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            verbose: false,
        }
    }
}

/// Command-line arguments
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "wsdispatch")]
#[command(about = "WebSocket message server with a text and arithmetic command protocol")]
#[command(version)]
pub struct Args {
    /// Address to bind the listener to
    #[arg(long, env = "WSDISPATCH_ADDR")]
    pub addr: Option<SocketAddr>,

    /// Path for the WebSocket endpoint
    #[arg(long)]
    pub ws_path: Option<String>,

    /// Origin allowed to connect (repeatable or comma-separated, replaces the defaults)
    #[arg(
        long = "allowed-origin",
        env = "WSDISPATCH_ALLOWED_ORIGINS",
        value_delimiter = ','
    )]
    pub allowed_origins: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerOptions {
    /// Build validated options from the defaults overridden by parsed arguments
    pub fn from_args(args: Args) -> Result<Self, Error> {
        let mut options = Self::default();

        if let Some(addr) = args.addr {
            options.bind_address = addr;
        }
        if let Some(path) = args.ws_path {
            options.websocket_path = path;
        }

        let origins: Vec<String> = args.allowed_origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if !origins.is_empty() {
            options.allowed_origins = origins;
        }

        options.verbose = args.verbose;
        options.validate()?;
        Ok(options)
    }

    /// Check that the options describe a servable router
    pub fn validate(&self) -> Result<(), Error> {
        for path in [&self.websocket_path, &self.landing_path] {
            if !path.starts_with('/') {
                return Err(Error::config(format!("path must start with '/': {}", path)));
            }
        }
        if self.websocket_path == self.landing_path {
            return Err(
                Error::config(format!("websocket and landing paths collide: {}", self.landing_path))
            );
        }
        if self.max_message_size == 0 {
            return Err(Error::config("max_message_size must be positive"));
        }
        if self.idle_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(Error::config("timeouts must be positive"));
        }
        Ok(())
    }
}
