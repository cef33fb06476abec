//! Shared type definitions.

pub mod id;

pub use id::{CallId, ConnectionId, UserId};
