//
// connection.rs
//
// Lifecycle of the remote command source (chat listener)
//

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Connection status of the remote command source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Status bar text.
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Connected => "Connected",
        }
    }

    /// Next state after `event`, or `None` when the event does not apply.
    ///
    /// A start request while connecting or connected is coalesced into a
    /// no-op; acknowledgements and failures only count while connecting.
    pub fn apply(self, event: ConnectionEvent) -> Option<ConnectionState> {
        use ConnectionEvent::*;
        use ConnectionState::*;

        match (self, event) {
            (Disconnected, StartRequested) => Some(Connecting),
            (Connecting, Acknowledged(_)) => Some(Connected),
            (Connecting, Failed(_)) => Some(Disconnected),
            (Connecting | Connected, Stopped | Exited) => Some(Disconnected),
            _ => None,
        }
    }
}

/// Input to the connection state machine.
///
/// Outcomes of a start carry the attempt number handed out when that start
/// was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    StartRequested,
    Acknowledged(u64),
    Failed(u64),
    Stopped,
    /// The source went away on its own.
    Exited,
}

impl ConnectionEvent {
    pub fn attempt(self) -> Option<u64> {
        match self {
            ConnectionEvent::Acknowledged(attempt) | ConnectionEvent::Failed(attempt) => {
                Some(attempt)
            }
            _ => None,
        }
    }
}

/// Connection state plus the number of the current start attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionTracker {
    state: ConnectionState,
    attempt: u64,
}

impl ConnectionTracker {
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of the most recent accepted start; 0 before the first one.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Apply `event`, returning the new state when it changed.
    ///
    /// Acknowledgements and failures of any attempt but the latest are
    /// dropped, so a stale start can neither connect nor fail a newer one.
    pub fn apply(&mut self, event: ConnectionEvent) -> Option<ConnectionState> {
        if event.attempt().is_some_and(|attempt| attempt != self.attempt) {
            return None;
        }
        let next = self.state.apply(event)?;
        if event == ConnectionEvent::StartRequested {
            self.attempt += 1;
        }
        self.state = next;
        Some(next)
    }
}

/// Parameters of the `startchat` request.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatParams {
    pub channels: Vec<String>,
    pub client_id: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ChatParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatParams")
            .field("channels", &self.channels)
            .field("username", &self.username)
            .field("client_id", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Something that turns chat messages into highlight commands.
///
/// Highlight traffic flows back separately, as notifications; this trait
/// only covers the start/stop handshake.
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// Resolves once the source acknowledges the connection.
    async fn start(&self, params: ChatParams) -> anyhow::Result<()>;

    /// `Ok(false)` when the source refused to stop.
    async fn stop(&self) -> anyhow::Result<bool>;
}
