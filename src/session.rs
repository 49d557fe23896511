//! WebSocket connection session
//!
//! A [`ConnectionSession`] owns one upgraded connection and drives it through an
//! explicit state machine:
//!
//! ```text
//! Open -> Reading -> Dispatching -> Writing -> Reading -> ... -> Closed
//! ```
//!
//! Reads are bounded by a sliding idle deadline, writes by a fixed write timeout.
//! Any transport failure is terminal. The socket is released exactly once, when
//! the session reaches `Closed` or when the task unwinds.

use axum::extract::ws::{ CloseFrame, Message };
use futures_util::{ Sink, SinkExt, Stream, StreamExt };
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{ Instant, timeout, timeout_at };
use uuid::Uuid;

use crate::command::{ parse_error_payload, process_command };
use crate::config::ServerOptions;
use crate::text::{ MessageCounter, transform_text };

/// Close codes that end a session without being treated as errors
pub const NORMAL_CLOSE_CODES: [u16; 2] = [1000, 1001];

/// Per-session timeouts
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Idle-read timeout, re-armed after every successful read
    pub idle_timeout: Duration,
    /// Deadline for each write
    pub write_timeout: Duration,
}

impl SessionConfig {
    /// Take the session timeouts from the server options
    pub fn from_options(options: &ServerOptions) -> Self {
        Self {
            idle_timeout: options.idle_timeout,
            write_timeout: options.write_timeout,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_options(&ServerOptions::default())
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer sent a close frame
    PeerClosed {
        /// Close code, if the frame carried one
        code: Option<u16>,
    },
    /// No message arrived before the idle deadline
    IdleTimeout,
    /// Reading failed, including oversized messages and connections dropped
    /// without a close handshake
    ReadError(String),
    /// A response could not be written before the write deadline
    WriteTimeout,
    /// Writing a response failed
    WriteError(String),
}

impl CloseReason {
    /// Whether this termination is worth reporting as an error
    pub fn is_abnormal(&self) -> bool {
        match self {
            CloseReason::PeerClosed { code: None } => false,
            CloseReason::PeerClosed { code: Some(code) } => !NORMAL_CLOSE_CODES.contains(code),
            CloseReason::IdleTimeout => false,
            CloseReason::ReadError(_) | CloseReason::WriteTimeout | CloseReason::WriteError(_) => {
                true
            }
        }
    }
}

/// Routes an inbound text payload to the command processor or the text protocol
#[derive(Debug, Clone)]
pub struct Dispatcher {
    counter: Arc<MessageCounter>,
}

impl Dispatcher {
    pub fn new(counter: Arc<MessageCounter>) -> Self {
        Self { counter }
    }

    /// Build the reply for one text message
    pub fn dispatch(&self, text: &str) -> String {
        if is_structured(text) {
            match process_command(text.as_bytes()) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(err) => {
                    tracing::warn!("JSON processing error: {}", err);
                    parse_error_payload(&err)
                }
            }
        } else {
            transform_text(text, &self.counter)
        }
    }
}

/// Structured payloads are JSON objects, recognised by their leading `{`
pub fn is_structured(text: &str) -> bool {
    text.starts_with('{')
}

enum SessionState {
    Open,
    Reading,
    Dispatching(Message),
    Writing(String),
    Closed(CloseReason),
}

/// One upgraded connection and its processing loop
pub struct ConnectionSession<S> {
    id: Uuid,
    socket: S,
    config: SessionConfig,
    dispatcher: Dispatcher,
}

impl<S, E> ConnectionSession<S>
    where
        S: Stream<Item = Result<Message, E>> + Sink<Message, Error = E> + Unpin,
        E: Display
{
    pub fn new(socket: S, config: SessionConfig, counter: Arc<MessageCounter>) -> Self {
        Self {
            id: Uuid::new_v4(),
            socket,
            config,
            dispatcher: Dispatcher::new(counter),
        }
    }

    /// Session identifier used in log output
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run the session until a terminal condition and report why it ended
    pub async fn run(self) -> CloseReason {
        let ConnectionSession { id, socket, config, dispatcher } = self;

        // Released on every exit path, including unwinding
        let mut socket = scopeguard::guard(socket, move |_| {
            tracing::debug!("WebSocket session {} released", id);
        });

        let mut deadline = Instant::now() + config.idle_timeout;
        let mut state = SessionState::Open;

        loop {
            state = match state {
                SessionState::Open => {
                    tracing::debug!("WebSocket session {} opened", id);
                    SessionState::Reading
                }
                SessionState::Reading => {
                    let next = read_next(&mut *socket, deadline).await;
                    if !matches!(next, SessionState::Closed(_)) {
                        deadline = Instant::now() + config.idle_timeout;
                    }
                    next
                }
                SessionState::Dispatching(message) => {
                    match message {
                        Message::Text(text) => SessionState::Writing(dispatcher.dispatch(text.as_str())),
                        other => {
                            tracing::trace!("session {} ignoring non-text frame: {:?}", id, other);
                            SessionState::Reading
                        }
                    }
                }
                SessionState::Writing(reply) => {
                    write_reply(&mut *socket, reply, config.write_timeout).await
                }
                SessionState::Closed(reason) => {
                    log_close(id, &reason, &config);
                    if !matches!(reason, CloseReason::WriteTimeout | CloseReason::WriteError(_)) {
                        // Best-effort close handshake; the transport may already be gone
                        let _ = timeout(config.write_timeout, SinkExt::close(&mut *socket)).await;
                    }
                    return reason;
                }
            };
        }
    }
}

async fn read_next<S, E>(socket: &mut S, deadline: Instant) -> SessionState
    where S: Stream<Item = Result<Message, E>> + Unpin, E: Display
{
    match timeout_at(deadline, socket.next()).await {
        Err(_) => SessionState::Closed(CloseReason::IdleTimeout),
        Ok(None) => {
            SessionState::Closed(
                CloseReason::ReadError("connection closed without close frame".to_string())
            )
        }
        Ok(Some(Err(e))) => SessionState::Closed(CloseReason::ReadError(e.to_string())),
        Ok(Some(Ok(Message::Close(frame)))) => {
            let code = frame.map(|CloseFrame { code, .. }| code);
            SessionState::Closed(CloseReason::PeerClosed { code })
        }
        Ok(Some(Ok(message))) => SessionState::Dispatching(message),
    }
}

async fn write_reply<S, E>(socket: &mut S, reply: String, write_timeout: Duration) -> SessionState
    where S: Sink<Message, Error = E> + Unpin, E: Display
{
    match timeout(write_timeout, socket.send(Message::Text(reply.into()))).await {
        Ok(Ok(())) => SessionState::Reading,
        Ok(Err(e)) => SessionState::Closed(CloseReason::WriteError(e.to_string())),
        Err(_) => SessionState::Closed(CloseReason::WriteTimeout),
    }
}

fn log_close(id: Uuid, reason: &CloseReason, config: &SessionConfig) {
    match reason {
        CloseReason::PeerClosed { code } if !reason.is_abnormal() => {
            tracing::debug!("WebSocket session {} closed by peer (code {:?})", id, code);
        }
        CloseReason::PeerClosed { code } => {
            tracing::warn!("read error on session {}: unexpected close code {:?}", id, code);
        }
        CloseReason::IdleTimeout => {
            tracing::debug!(
                "WebSocket session {} idle for {:?}, closing",
                id,
                config.idle_timeout
            );
        }
        CloseReason::ReadError(e) => {
            tracing::warn!("read error on session {}: {}", id, e);
        }
        CloseReason::WriteTimeout => {
            tracing::warn!(
                "write error on session {}: timed out after {:?}",
                id,
                config.write_timeout
            );
        }
        CloseReason::WriteError(e) => {
            tracing::warn!("write error on session {}: {}", id, e);
        }
    }
}
