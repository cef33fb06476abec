//! Presence key naming.

use lumen_core::types::UserId;

/// Builds the presence record key for a user.
pub fn presence_key(user_id: &UserId) -> String {
    format!("presence:{user_id}")
}
