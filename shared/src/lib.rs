//! Shared types for the order ingestion service
//!
//! Types used by both the server and the client tools: the order document
//! with its validator, and the bus wire protocol.

pub mod message;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use message::{BusMessage, EventType, FrameError};
pub use order::{Delivery, Item, Order, Payment, ValidationError, validate};
