//! Multi-party voice-room mesh signaling.
//!
//! Unlike 1:1 calls, mesh signaling addresses a specific connection: each
//! WebRTC peer connection is bound to one physical socket. The join
//! handshake enumerates existing participants so the new peer can initiate
//! one offer per participant (full-mesh, O(n²) pairwise exchanges).

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use lumen_core::types::{ConnectionId, UserId};

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::SocketRegistry;
use crate::event::{ServerEvent, VoiceRoomPeer, codes};
use crate::metrics::GatewayMetrics;
use crate::room::key::RoomKey;
use crate::room::manager::RoomManager;

/// Relays voice-room signaling between room participants.
#[derive(Debug)]
pub struct VoiceRoomRelay {
    registry: Arc<SocketRegistry>,
    rooms: Arc<RoomManager>,
    metrics: Arc<GatewayMetrics>,
}

impl VoiceRoomRelay {
    /// Creates a new relay over the shared registry and room manager.
    pub fn new(
        registry: Arc<SocketRegistry>,
        rooms: Arc<RoomManager>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            registry,
            rooms,
            metrics,
        }
    }

    /// Join handshake: announce the joiner to existing members, then reply
    /// with the enumerated participant list (excluding the joiner).
    pub fn join(&self, handle: &Arc<ConnectionHandle>, room_id: &str, user_info: Option<Value>) {
        let key = RoomKey::VoiceRoom(room_id.to_string());

        // Insert and snapshot under one guard so concurrent joiners
        // cannot miss each other in the handshake.
        let existing = self.rooms.join_and_snapshot(handle.id, key);

        let joined = ServerEvent::VoiceRoomUserJoined {
            room_id: room_id.to_string(),
            user_id: handle.user_id.clone(),
            user_info,
        };
        let sent = self
            .registry
            .send_to_connections(&existing, &joined, None);
        self.metrics.messages_sent(sent);

        let peers: Vec<VoiceRoomPeer> = existing
            .iter()
            .filter_map(|conn_id| self.registry.get(conn_id))
            .map(|peer| VoiceRoomPeer {
                connection_id: peer.id,
                user_id: peer.user_id.clone(),
            })
            .collect();

        debug!(
            conn_id = %handle.id,
            room_id = %room_id,
            peers = peers.len(),
            "Voice room join handshake"
        );

        handle.send(&ServerEvent::VoiceRoomExistingUsers {
            room_id: room_id.to_string(),
            users: peers,
        });
        self.metrics.messages_sent(1);
    }

    /// Leaves the room and announces the departure to remaining members.
    pub fn leave(&self, handle: &Arc<ConnectionHandle>, room_id: &str) {
        let key = RoomKey::VoiceRoom(room_id.to_string());
        if !self.rooms.leave(handle.id, &key) {
            return;
        }
        self.announce_left(room_id, &handle.user_id, &key);
    }

    /// Announces a departure for a room the connection already left
    /// (implicit leave on disconnect).
    pub fn announce_left(&self, room_id: &str, user_id: &UserId, key: &RoomKey) {
        let event = ServerEvent::VoiceRoomUserLeft {
            room_id: room_id.to_string(),
            user_id: user_id.clone(),
        };
        let members = self.rooms.members(key);
        let sent = self.registry.send_to_connections(&members, &event, None);
        self.metrics.messages_sent(sent);
    }

    /// Relays a mesh SDP offer.
    pub fn offer(
        &self,
        handle: &Arc<ConnectionHandle>,
        room_id: &str,
        target_connection_id: Option<ConnectionId>,
        target_user_id: Option<UserId>,
        offer: Value,
    ) {
        let event = ServerEvent::VoiceRoomOffer {
            room_id: room_id.to_string(),
            from_user_id: handle.user_id.clone(),
            from_connection_id: handle.id,
            offer,
        };
        self.route(handle, target_connection_id, target_user_id, &event);
    }

    /// Relays a mesh SDP answer.
    pub fn answer(
        &self,
        handle: &Arc<ConnectionHandle>,
        room_id: &str,
        target_connection_id: Option<ConnectionId>,
        target_user_id: Option<UserId>,
        answer: Value,
    ) {
        let event = ServerEvent::VoiceRoomAnswer {
            room_id: room_id.to_string(),
            from_user_id: handle.user_id.clone(),
            from_connection_id: handle.id,
            answer,
        };
        self.route(handle, target_connection_id, target_user_id, &event);
    }

    /// Relays a mesh ICE candidate.
    pub fn ice_candidate(
        &self,
        handle: &Arc<ConnectionHandle>,
        room_id: &str,
        target_connection_id: Option<ConnectionId>,
        target_user_id: Option<UserId>,
        candidate: Value,
    ) {
        let event = ServerEvent::VoiceRoomIceCandidate {
            room_id: room_id.to_string(),
            from_user_id: handle.user_id.clone(),
            from_connection_id: handle.id,
            candidate,
        };
        self.route(handle, target_connection_id, target_user_id, &event);
    }

    /// Broadcasts an ephemeral state event to the room, excluding the
    /// sender.
    pub fn broadcast_state(&self, handle: &Arc<ConnectionHandle>, room_id: &str, event: ServerEvent) {
        let key = RoomKey::VoiceRoom(room_id.to_string());
        let members = self.rooms.members(&key);
        let sent = self
            .registry
            .send_to_connections(&members, &event, Some(handle.id));
        self.metrics.messages_sent(sent);
    }

    /// Routes a signal by exact connection when given, else by user
    /// fan-out, else rejects with `MISSING_TARGET`.
    fn route(
        &self,
        sender: &Arc<ConnectionHandle>,
        target_connection_id: Option<ConnectionId>,
        target_user_id: Option<UserId>,
        event: &ServerEvent,
    ) {
        let sent = if let Some(conn_id) = target_connection_id {
            self.registry.send_to_connections(&[conn_id], event, None)
        } else if let Some(user_id) = target_user_id {
            self.registry.send_to_user(&user_id, event)
        } else {
            self.metrics.event_rejected();
            sender.send(&ServerEvent::error(
                codes::MISSING_TARGET,
                "Signal carries neither targetConnectionId nor targetUserId",
            ));
            return;
        };

        if sent == 0 {
            self.metrics.event_rejected();
            sender.send(&ServerEvent::error(
                codes::TARGET_UNREACHABLE,
                "Target peer has no live connection",
            ));
        } else {
            self.metrics.messages_sent(sent);
        }
    }
}
