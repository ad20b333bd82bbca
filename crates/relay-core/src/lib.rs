//! # relay-core
//!
//! In-process chat message broker with broadcast and private routing.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Broker** - routes submitted messages to subscriber mailboxes
//! - **Message** - the chat message value type
//! - **History** - append-only in-memory message log
//! - **Roster** - validated directory of registered users
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Producer   │────▶│   Broker    │────▶│  Mailboxes  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!
//! ┌─────────────┐     ┌─────────────┐
//! │  History    │     │   Roster    │   (siblings; never called
//! └─────────────┘     └─────────────┘    by the broker)
//! ```
//!
//! Producers [`submit`](Broker::submit) messages into a bounded inbound
//! queue; a single routing task fans them out. Sends into subscriber
//! mailboxes are non-blocking and drop on full, so one stalled subscriber
//! never stalls the rest. Shutdown is driven by a caller-owned
//! cancellation token; once it fires, every mailbox is closed and further
//! submissions fail.

pub mod broker;
pub mod history;
pub mod message;
pub mod roster;

pub use broker::{Broker, BrokerConfig, BrokerError, UserId};
pub use history::{History, HistoryError};
pub use message::{unix_timestamp, Message};
pub use roster::{Roster, RosterError, User};
