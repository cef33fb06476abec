//! # lumen-gateway
//!
//! The realtime gateway engine for the Lumen platform:
//!
//! - Socket registry with multi-device fan-out (`connection`)
//! - Ephemeral typed rooms and typing indicators (`room`)
//! - 1:1 call signaling with tracked call sessions (`call`)
//! - Multi-party voice-room mesh signaling (`voiceroom`)
//! - The wire event protocol (`event`)
//! - Push-notification seam (`push`), metrics, and the axum transport
//!   (`ws`, `router`, `handlers`)
//!
//! The registry is process-local: "deliver to user" reaches every device
//! connected to *this* instance. Room membership is not persisted; clients
//! re-join rooms after reconnecting.

pub mod call;
pub mod connection;
pub mod engine;
pub mod error;
pub mod event;
pub mod handlers;
pub mod metrics;
pub mod push;
pub mod room;
pub mod router;
pub mod state;
pub mod voiceroom;
pub mod ws;

pub use engine::GatewayEngine;
pub use state::AppState;
