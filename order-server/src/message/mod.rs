//! Durable message bus
//!
//! Embedded at-least-once bus: publishers connect over TCP (or call
//! [`MessageBus::publish`] in process), messages are journaled in redb, and
//! durable subscriptions resume from their last acknowledged position after
//! a restart.
//!
//! - [`journal`] - redb message log and durable cursors
//! - [`bus`] - publish / subscribe front
//! - [`subscription`] - durable subscription
//! - [`tcp_server`] - TCP ingress for publishers

pub mod bus;
pub mod journal;
pub mod subscription;
pub mod tcp_server;

pub use bus::MessageBus;
pub use journal::{Delivery, JournalError, JournalResult, MessageJournal};
pub use subscription::Subscription;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Connected publisher information
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedClient {
    pub id: String,
    pub addr: Option<String>,
    pub connected_at: DateTime<Utc>,
}
