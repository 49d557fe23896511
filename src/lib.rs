//! wsdispatch
//!
//! A single-connection WebSocket message server. Each accepted connection runs an
//! isolated session that answers every text message with one reply:
//! - structured messages (JSON objects) are evaluated as arithmetic commands
//! - plain-text messages go through a small prefix protocol (`UPPER:`, `REVERSE:`)
//!   and are numbered with a process-wide message counter
//!
//! Upgrades are gated by an origin policy, and every session enforces an idle-read
//! deadline, a write deadline and a maximum message size.

pub mod command;
pub mod config;
pub mod errors;
pub mod origin;
pub mod server;
pub mod session;
pub mod text;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use command::{ CommandRequest, CommandResponse, ParseError, process_command };
pub use config::{ Args, ServerOptions };
pub use errors::Error;
pub use origin::OriginValidator;
pub use server::{ ServerHandle, router, serve, spawn };
pub use session::{ CloseReason, ConnectionSession, Dispatcher, SessionConfig };
pub use text::{ MessageCounter, transform_text };
