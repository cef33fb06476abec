//! Room membership bookkeeping.

use std::collections::HashSet;

use dashmap::DashMap;

use lumen_core::types::ConnectionId;

use super::key::RoomKey;

/// Tracks which connections are in which rooms.
///
/// Pure membership: broadcasting is the engine's job, which resolves
/// members here and delivers through the socket registry.
#[derive(Debug, Default)]
pub struct RoomManager {
    /// Room → member connections.
    rooms: DashMap<RoomKey, HashSet<ConnectionId>>,
    /// Connection → joined rooms (reverse index for disconnect cleanup).
    memberships: DashMap<ConnectionId, HashSet<RoomKey>>,
}

impl RoomManager {
    /// Creates an empty room manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a room. Idempotent; returns `true` if the
    /// connection was not already a member.
    pub fn join(&self, conn_id: ConnectionId, key: RoomKey) -> bool {
        let added = self.rooms.entry(key.clone()).or_default().insert(conn_id);
        if added {
            self.memberships.entry(conn_id).or_default().insert(key);
        }
        added
    }

    /// Adds a connection to a room and returns the members present before
    /// the insert. Snapshot and insert happen under the room's entry
    /// guard, so two connections joining concurrently each observe the
    /// other (one in its snapshot, the other through the caller's join
    /// announcement). The snapshot never contains the joiner itself, even
    /// on a repeated join.
    pub fn join_and_snapshot(&self, conn_id: ConnectionId, key: RoomKey) -> Vec<ConnectionId> {
        let (prior, added) = {
            let mut members = self.rooms.entry(key.clone()).or_default();
            let prior: Vec<ConnectionId> = members
                .iter()
                .copied()
                .filter(|id| *id != conn_id)
                .collect();
            (prior, members.insert(conn_id))
        };
        if added {
            self.memberships.entry(conn_id).or_default().insert(key);
        }
        prior
    }

    /// Removes a connection from a room. Leaving a room the connection is
    /// not in is a no-op, not an error.
    pub fn leave(&self, conn_id: ConnectionId, key: &RoomKey) -> bool {
        let removed = match self.rooms.get_mut(key) {
            Some(mut members) => members.remove(&conn_id),
            None => false,
        };
        self.rooms.remove_if(key, |_, members| members.is_empty());

        if let Some(mut joined) = self.memberships.get_mut(&conn_id) {
            joined.remove(key);
        }
        self.memberships
            .remove_if(&conn_id, |_, joined| joined.is_empty());

        removed
    }

    /// Removes a connection from every room it joined, returning those
    /// rooms (used for implicit leave on disconnect).
    pub fn leave_all(&self, conn_id: ConnectionId) -> Vec<RoomKey> {
        let joined: Vec<RoomKey> = match self.memberships.remove(&conn_id) {
            Some((_, rooms)) => rooms.into_iter().collect(),
            None => Vec::new(),
        };

        for key in &joined {
            if let Some(mut members) = self.rooms.get_mut(key) {
                members.remove(&conn_id);
            }
            self.rooms.remove_if(key, |_, members| members.is_empty());
        }

        joined
    }

    /// Returns the members of a room.
    pub fn members(&self, key: &RoomKey) -> Vec<ConnectionId> {
        self.rooms
            .get(key)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Checks membership.
    pub fn is_member(&self, conn_id: ConnectionId, key: &RoomKey) -> bool {
        self.rooms
            .get(key)
            .map(|members| members.contains(&conn_id))
            .unwrap_or(false)
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn conversation(id: &str) -> RoomKey {
        RoomKey::Conversation(id.to_string())
    }

    #[test]
    fn test_join_is_idempotent() {
        let rooms = RoomManager::new();
        let conn = Uuid::new_v4();
        assert!(rooms.join(conn, conversation("1")));
        assert!(!rooms.join(conn, conversation("1")));
        assert_eq!(rooms.members(&conversation("1")).len(), 1);
    }

    #[test]
    fn test_leave_twice_is_noop() {
        let rooms = RoomManager::new();
        let conn = Uuid::new_v4();
        rooms.join(conn, conversation("1"));
        assert!(rooms.leave(conn, &conversation("1")));
        assert!(!rooms.leave(conn, &conversation("1")));
        assert_eq!(rooms.room_count(), 0);
    }

    #[test]
    fn test_leave_all_returns_joined_rooms() {
        let rooms = RoomManager::new();
        let conn = Uuid::new_v4();
        let other = Uuid::new_v4();
        rooms.join(conn, conversation("1"));
        rooms.join(conn, RoomKey::Server("s1".to_string()));
        rooms.join(other, conversation("1"));

        let mut left = rooms.leave_all(conn);
        left.sort_by_key(|k| k.to_string());
        assert_eq!(
            left,
            vec![
                conversation("1"),
                RoomKey::Server("s1".to_string()),
            ]
        );

        // The other member stays.
        assert_eq!(rooms.members(&conversation("1")), vec![other]);
        assert!(rooms.leave_all(conn).is_empty());
    }

    #[test]
    fn test_join_and_snapshot_reports_prior_members() {
        let rooms = RoomManager::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(rooms.join_and_snapshot(a, conversation("1")).is_empty());
        assert_eq!(rooms.join_and_snapshot(b, conversation("1")), vec![a]);
        // A repeated join never lists the joiner itself.
        assert_eq!(rooms.join_and_snapshot(b, conversation("1")), vec![a]);
        assert_eq!(rooms.members(&conversation("1")).len(), 2);
    }

    #[test]
    fn test_concurrent_joiners_are_mutually_visible() {
        use std::sync::Arc;
        use std::thread;

        let rooms = Arc::new(RoomManager::new());
        let ids: Vec<ConnectionId> = (0..8).map(|_| Uuid::new_v4()).collect();

        let handles: Vec<_> = ids
            .iter()
            .map(|&conn| {
                let rooms = Arc::clone(&rooms);
                thread::spawn(move || (conn, rooms.join_and_snapshot(conn, conversation("1"))))
            })
            .collect();
        let results: Vec<(ConnectionId, Vec<ConnectionId>)> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        // Every pair of joiners must have seen each other at least once,
        // whichever order their inserts landed in.
        for (i, (a, snap_a)) in results.iter().enumerate() {
            for (b, snap_b) in results.iter().skip(i + 1) {
                assert!(
                    snap_a.contains(b) || snap_b.contains(a),
                    "joiners {a} and {b} missed each other"
                );
            }
        }
    }

    #[test]
    fn test_empty_rooms_are_dropped() {
        let rooms = RoomManager::new();
        let conn = Uuid::new_v4();
        rooms.join(conn, conversation("1"));
        rooms.leave(conn, &conversation("1"));
        assert_eq!(rooms.room_count(), 0);
        assert!(!rooms.is_member(conn, &conversation("1")));
    }
}
