//! Command channel - strict request/reply protocol that mutates the display state
//!
//! Every request gets exactly one reply. `set_info_text` and `set_warn_text`
//! take two requests: the token is acknowledged first, then the next message is
//! the text itself. The wait for that text is bounded by a deadline.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::mode::Mode;
use crate::state::{DisplayState, TextSlot};

/// Reply to every accepted request
pub const REPLY_OK: &str = "OK";
/// Reply when a two-phase text update never received its payload
pub const REPLY_TIMEOUT: &str = "ERR_TIMEOUT";

/// Longest a text update may wait for its payload
pub const MAX_PAYLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Error type for command channel operations
#[derive(Debug)]
pub enum ChannelError {
    /// Could not bind the listening socket
    Bind { addr: SocketAddr, source: io::Error },
    /// The client closed its connection
    Disconnected,
    /// A message exceeded the size limit
    MessageTooLong { limit: usize },
    /// IO error on the connection
    Io(io::Error),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelError::Bind { addr, source } => write!(f, "Failed to bind {}: {}", addr, source),
            ChannelError::Disconnected => write!(f, "Client disconnected"),
            ChannelError::MessageTooLong { limit } => {
                write!(f, "Message longer than {} bytes", limit)
            }
            ChannelError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::Bind { source, .. } => Some(source),
            ChannelError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ChannelError {
    fn from(e: io::Error) -> Self {
        ChannelError::Io(e)
    }
}

/// Message transport beneath the protocol
pub trait Transport {
    /// Take one pending message without blocking
    fn try_recv(&mut self) -> Result<Option<String>, ChannelError>;

    /// Send a reply to the current client
    fn send(&mut self, reply: &str) -> Result<(), ChannelError>;
}

/// A decoded request token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch to a mode
    Switch(Mode),
    /// Restart the timing session and show it
    ResetTiming,
    /// Start a two-phase text update
    SetText(TextSlot),
    /// Anything else; acknowledged without effect
    Unknown(String),
}

impl Command {
    pub fn parse(token: &str) -> Command {
        match token {
            "reset_timing" => Command::ResetTiming,
            "set_info_text" => Command::SetText(TextSlot::Info),
            "set_warn_text" => Command::SetText(TextSlot::Warning),
            other => match Mode::from_token(other) {
                Some(mode) => Command::Switch(mode),
                None => Command::Unknown(other.to_string()),
            },
        }
    }
}

/// Protocol position of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    /// Waiting for a request token
    Idle,
    /// A text update was acknowledged; the next message is its payload
    AwaitingPayload { slot: TextSlot, deadline: Instant },
}

/// What a single poll did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing was pending
    Nothing,
    /// A request token was applied and acknowledged
    Applied(Command),
    /// Still waiting for a text payload
    Waiting(TextSlot),
    /// A text payload was stored and its mode shown
    TextStored(TextSlot),
    /// The payload deadline passed; an error reply was sent
    TimedOut(TextSlot),
    /// The client went away mid-exchange
    Aborted(TextSlot),
}

/// Request/reply state machine over a `Transport`
pub struct CommandChannel<T: Transport> {
    transport: T,
    phase: ChannelPhase,
    payload_timeout: Duration,
}

impl<T: Transport> CommandChannel<T> {
    /// Timeouts above `MAX_PAYLOAD_TIMEOUT` are clamped to it
    pub fn new(transport: T, payload_timeout: Duration) -> Self {
        if payload_timeout > MAX_PAYLOAD_TIMEOUT {
            tracing::warn!(
                requested = ?payload_timeout,
                limit = ?MAX_PAYLOAD_TIMEOUT,
                "payload timeout clamped"
            );
        }
        Self {
            transport,
            phase: ChannelPhase::Idle,
            payload_timeout: payload_timeout.min(MAX_PAYLOAD_TIMEOUT),
        }
    }

    pub fn payload_timeout(&self) -> Duration {
        self.payload_timeout
    }

    pub fn phase(&self) -> ChannelPhase {
        self.phase
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Handle at most one pending message
    ///
    /// `now` stamps timing resets; `at` is checked against the payload deadline.
    pub fn poll(&mut self, state: &mut DisplayState, now: DateTime<Utc>, at: Instant) -> PollOutcome {
        match self.phase {
            ChannelPhase::Idle => self.poll_request(state, now, at),
            ChannelPhase::AwaitingPayload { slot, deadline } => {
                self.poll_payload(state, slot, deadline, at)
            }
        }
    }

    fn poll_request(&mut self, state: &mut DisplayState, now: DateTime<Utc>, at: Instant) -> PollOutcome {
        let message = match self.transport.try_recv() {
            Ok(Some(message)) => message,
            Ok(None) => return PollOutcome::Nothing,
            Err(ChannelError::Disconnected) => return PollOutcome::Nothing,
            Err(e) => {
                tracing::warn!(error = %e, "dropped command client");
                return PollOutcome::Nothing;
            }
        };
        tracing::debug!(message = %message, "request received");
        state.note_command();

        let command = Command::parse(&message);
        match &command {
            Command::Switch(mode) => {
                state.transition(*mode);
            }
            Command::ResetTiming => {
                state.reset_timing(now);
                state.transition(Mode::ElapsedTiming);
            }
            Command::SetText(slot) => {
                if self.reply(REPLY_OK) {
                    // An unrepresentable deadline times out on the next poll
                    let deadline = at.checked_add(self.payload_timeout).unwrap_or(at);
                    self.phase = ChannelPhase::AwaitingPayload {
                        slot: *slot,
                        deadline,
                    };
                    return PollOutcome::Waiting(*slot);
                }
                return PollOutcome::Aborted(*slot);
            }
            Command::Unknown(token) => {
                tracing::warn!(token = %token, "unknown command acknowledged without effect");
            }
        }

        self.reply(REPLY_OK);
        PollOutcome::Applied(command)
    }

    fn poll_payload(
        &mut self,
        state: &mut DisplayState,
        slot: TextSlot,
        deadline: Instant,
        at: Instant,
    ) -> PollOutcome {
        match self.transport.try_recv() {
            Ok(Some(text)) => {
                self.phase = ChannelPhase::Idle;
                state.set_text(slot, text);
                state.transition(slot.mode());
                self.reply(REPLY_OK);
                PollOutcome::TextStored(slot)
            }
            Ok(None) if at >= deadline => {
                tracing::warn!(?slot, timeout = ?self.payload_timeout, "text payload never arrived");
                self.phase = ChannelPhase::Idle;
                self.reply(REPLY_TIMEOUT);
                PollOutcome::TimedOut(slot)
            }
            Ok(None) => PollOutcome::Waiting(slot),
            Err(e) => {
                tracing::warn!(?slot, error = %e, "client lost while waiting for text payload");
                self.phase = ChannelPhase::Idle;
                PollOutcome::Aborted(slot)
            }
        }
    }

    /// Send a reply, returning false if the client could not be reached
    fn reply(&mut self, reply: &str) -> bool {
        match self.transport.send(reply) {
            Ok(()) => {
                tracing::trace!(reply, "reply sent");
                true
            }
            Err(e) => {
                tracing::warn!(reply, error = %e, "failed to send reply");
                false
            }
        }
    }
}

/// Something queued on a `MemoryTransport`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Message(String),
    Disconnect,
}

/// In-process transport fed from a queue
#[derive(Debug, Default)]
pub struct MemoryTransport {
    incoming: VecDeque<Incoming>,
    replies: Vec<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.incoming.push_back(Incoming::Message(message.into()));
    }

    pub fn push_disconnect(&mut self) {
        self.incoming.push_back(Incoming::Disconnect);
    }

    /// Replies sent so far
    pub fn replies(&self) -> &[String] {
        &self.replies
    }
}

impl Transport for MemoryTransport {
    fn try_recv(&mut self) -> Result<Option<String>, ChannelError> {
        match self.incoming.pop_front() {
            Some(Incoming::Message(message)) => Ok(Some(message)),
            Some(Incoming::Disconnect) => Err(ChannelError::Disconnected),
            None => Ok(None),
        }
    }

    fn send(&mut self, reply: &str) -> Result<(), ChannelError> {
        self.replies.push(reply.to_string());
        Ok(())
    }
}
