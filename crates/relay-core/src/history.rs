//! In-memory message history for Relay.
//!
//! The history is an append-only log, independent of the broker: a caller
//! that wants a record of traffic appends here alongside `submit`.

use crate::message::{unix_timestamp, Message};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::trace;

/// Initial backing capacity for the log.
const INITIAL_CAPACITY: usize = 100;

/// History errors.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The message has no sender.
    #[error("sender cannot be empty")]
    MissingSender,

    /// The message has no content.
    #[error("content cannot be empty")]
    MissingContent,
}

/// An append-only, in-memory log of chat messages.
#[derive(Debug)]
pub struct History {
    messages: RwLock<Vec<Message>>,
}

impl History {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::with_capacity(INITIAL_CAPACITY)),
        }
    }

    /// Append a message to the log.
    ///
    /// A zero timestamp is stamped with the current time, mirroring what
    /// the broker does on delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the message has an empty sender or content.
    pub async fn append(&self, mut message: Message) -> Result<(), HistoryError> {
        if message.sender.is_empty() {
            return Err(HistoryError::MissingSender);
        }
        if message.content.is_empty() {
            return Err(HistoryError::MissingContent);
        }
        if message.timestamp == 0 {
            message.timestamp = unix_timestamp();
        }

        let mut messages = self.messages.write().await;
        messages.push(message);
        trace!(total = messages.len(), "Message appended to history");
        Ok(())
    }

    /// Get stored messages, optionally filtered by sender.
    pub async fn query(&self, sender: Option<&str>) -> Vec<Message> {
        let messages = self.messages.read().await;
        match sender {
            Some(sender) => messages
                .iter()
                .filter(|m| m.sender == sender)
                .cloned()
                .collect(),
            None => messages.clone(),
        }
    }

    /// Get the number of stored messages.
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Check if the history is empty.
    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
