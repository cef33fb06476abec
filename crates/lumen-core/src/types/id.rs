//! Typed identifiers used across the gateway.

use uuid::Uuid;

/// Canonical user identifier.
///
/// This is the profile id resolved from the authentication subject, or the
/// raw subject itself when no profile mapping exists. It is an opaque string
/// owned by the identity service, not a UUID the gateway mints.
pub type UserId = String;

/// Unique identifier of a single WebSocket connection, minted by the
/// gateway when the connection is registered.
pub type ConnectionId = Uuid;

/// Unique identifier of a 1:1 call, minted on `call:initiate`.
pub type CallId = Uuid;
