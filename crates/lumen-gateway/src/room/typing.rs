//! Outstanding typing-indicator state per connection.
//!
//! Typing events themselves are pure room broadcasts; this tracker only
//! remembers which targets a connection said `isTyping: true` to, so the
//! engine can broadcast the matching `false` when the connection drops
//! mid-type.

use std::collections::HashSet;

use dashmap::DashMap;

use lumen_core::types::ConnectionId;

/// Where a typing indicator was sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypingTarget {
    /// A direct-message conversation.
    Conversation(String),
    /// A server channel.
    Channel(String),
}

/// Tracks outstanding `isTyping: true` state per connection.
#[derive(Debug, Default)]
pub struct TypingTracker {
    active: DashMap<ConnectionId, HashSet<TypingTarget>>,
}

impl TypingTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a typing start.
    pub fn start(&self, conn_id: ConnectionId, target: TypingTarget) {
        self.active.entry(conn_id).or_default().insert(target);
    }

    /// Clears a typing target after an explicit stop.
    pub fn stop(&self, conn_id: ConnectionId, target: &TypingTarget) {
        if let Some(mut targets) = self.active.get_mut(&conn_id) {
            targets.remove(target);
        }
        self.active
            .remove_if(&conn_id, |_, targets| targets.is_empty());
    }

    /// Removes and returns every outstanding target for a connection.
    pub fn drain(&self, conn_id: ConnectionId) -> Vec<TypingTarget> {
        match self.active.remove(&conn_id) {
            Some((_, targets)) => targets.into_iter().collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_drain_returns_outstanding_targets() {
        let tracker = TypingTracker::new();
        let conn = Uuid::new_v4();
        tracker.start(conn, TypingTarget::Conversation("1".to_string()));
        tracker.start(conn, TypingTarget::Channel("c2".to_string()));
        tracker.stop(conn, &TypingTarget::Channel("c2".to_string()));

        let drained = tracker.drain(conn);
        assert_eq!(drained, vec![TypingTarget::Conversation("1".to_string())]);
        assert!(tracker.drain(conn).is_empty());
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let tracker = TypingTracker::new();
        let conn = Uuid::new_v4();
        tracker.stop(conn, &TypingTarget::Conversation("1".to_string()));
        assert!(tracker.drain(conn).is_empty());
    }
}
