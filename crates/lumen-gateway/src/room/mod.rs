//! Typed rooms: keys, membership, and typing-state tracking.
//!
//! Membership is ephemeral by contract: it lives only for the duration of
//! a connection and is never persisted. Clients re-join after reconnecting.

pub mod key;
pub mod manager;
pub mod typing;

pub use key::RoomKey;
pub use manager::RoomManager;
pub use typing::{TypingTarget, TypingTracker};
