//! # lumen-presence
//!
//! Presence storage for the Lumen realtime gateway. Provides:
//!
//! - The [`PresenceStore`] trait over a TTL-keyed key/value store
//! - Redis and in-memory providers, selected by configuration
//! - The best-effort [`PresenceTracker`] used by the gateway engine
//!
//! Presence is not a correctness-critical path: a store outage degrades to
//! "treat as offline" and never blocks connection handling.

pub mod keys;
pub mod manager;
pub mod memory;
pub mod redis;
pub mod store;
pub mod tracker;

pub use manager::PresenceManager;
pub use store::PresenceStore;
pub use tracker::PresenceTracker;
