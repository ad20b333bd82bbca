//! Chat message types for Relay.
//!
//! These values are what producers submit and what subscribers receive.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix epoch seconds.
#[must_use]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// A chat message routed by the broker.
///
/// A message is either a broadcast (fanned out to every registered
/// subscriber) or private (delivered to `recipient` only), selected by the
/// `broadcast` flag. `recipient` is meaningful only for private messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identity of the sender.
    pub sender: String,
    /// Target identity for private delivery.
    pub recipient: String,
    /// Text payload.
    pub content: String,
    /// Whether this message goes to all subscribers.
    pub broadcast: bool,
    /// Unix epoch seconds. Zero means "unset"; the routing loop stamps the
    /// current time before delivery.
    pub timestamp: i64,
}

impl Message {
    /// Create a broadcast message.
    #[must_use]
    pub fn broadcast(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            recipient: String::new(),
            content: content.into(),
            broadcast: true,
            timestamp: 0,
        }
    }

    /// Create a private message addressed to a single recipient.
    #[must_use]
    pub fn direct(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            content: content.into(),
            broadcast: false,
            timestamp: 0,
        }
    }

    /// Set an explicit timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}
