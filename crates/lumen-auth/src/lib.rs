//! # lumen-auth
//!
//! Handshake authentication for the Lumen realtime gateway:
//!
//! - JWT claims and HS256 token verification (fail closed in production,
//!   decode-without-verify only when no secret is configured outside it)
//! - Identity resolution from an authentication subject to a canonical
//!   profile id, with a raw-subject fallback

pub mod claims;
pub mod resolver;
pub mod verifier;

pub use claims::Claims;
pub use resolver::{IdentityResolver, resolver_from_config};
pub use verifier::TokenVerifier;
