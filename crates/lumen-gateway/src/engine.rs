//! Top-level gateway engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use lumen_core::config::gateway::GatewayConfig;
use lumen_core::types::{ConnectionId, UserId};
use lumen_presence::PresenceTracker;
use lumen_presence::tracker::{STATUS_OFFLINE, STATUS_ONLINE};

use crate::call::relay::CallRelay;
use crate::call::session::CallSessionTable;
use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::SocketRegistry;
use crate::event::{ClientEvent, ServerEvent, codes};
use crate::metrics::GatewayMetrics;
use crate::push::PushSender;
use crate::room::key::RoomKey;
use crate::room::manager::RoomManager;
use crate::room::typing::{TypingTarget, TypingTracker};
use crate::voiceroom::VoiceRoomRelay;

/// Central engine coordinating the registry, rooms, presence, and the
/// signaling relays.
#[derive(Clone)]
pub struct GatewayEngine {
    /// Socket registry.
    pub registry: Arc<SocketRegistry>,
    /// Room membership.
    pub rooms: Arc<RoomManager>,
    /// Outstanding typing state.
    pub typing: Arc<TypingTracker>,
    /// Tracked call sessions.
    pub sessions: Arc<CallSessionTable>,
    /// 1:1 call relay.
    pub calls: Arc<CallRelay>,
    /// Voice-room relay.
    pub voice: Arc<VoiceRoomRelay>,
    /// Presence tracker.
    pub presence: Arc<PresenceTracker>,
    /// Metrics collector.
    pub metrics: Arc<GatewayMetrics>,
    config: GatewayConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for GatewayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayEngine").finish()
    }
}

impl GatewayEngine {
    /// Creates a new engine with all subsystems.
    pub fn new(
        config: GatewayConfig,
        presence: Arc<PresenceTracker>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics = Arc::new(GatewayMetrics::new());
        let registry = Arc::new(SocketRegistry::new());
        let rooms = Arc::new(RoomManager::new());
        let typing = Arc::new(TypingTracker::new());
        let sessions = Arc::new(CallSessionTable::new());
        let calls = Arc::new(CallRelay::new(
            registry.clone(),
            sessions.clone(),
            push,
            metrics.clone(),
        ));
        let voice = Arc::new(VoiceRoomRelay::new(
            registry.clone(),
            rooms.clone(),
            metrics.clone(),
        ));

        info!("Gateway engine initialized");

        Self {
            registry,
            rooms,
            typing,
            sessions,
            calls,
            voice,
            presence,
            metrics,
            config,
            shutdown_tx,
        }
    }

    /// Registers an authenticated connection.
    ///
    /// Returns the handle and the receiver the transport task drains for
    /// outbound frames. A 0→1 device transition marks the user online and
    /// broadcasts `presence:update` to everyone else.
    pub async fn register(
        &self,
        user_id: UserId,
        email: Option<String>,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(user_id.clone(), email, tx));

        let first = self.registry.add(handle.clone());
        self.metrics.connection_opened();

        // Per-user cap: evict the oldest connection once over the limit.
        let connections = self.registry.connections_for(&user_id);
        if connections.len() > self.config.max_connections_per_user {
            if let Some(oldest) = connections
                .iter()
                .filter(|c| c.id != handle.id)
                .min_by_key(|c| c.connected_at)
            {
                warn!(
                    user_id = %user_id,
                    evicted = %oldest.id,
                    max = self.config.max_connections_per_user,
                    "User over connection cap, evicting oldest"
                );
                let evicted_id = oldest.id;
                self.deregister(&evicted_id).await;
            }
        }

        info!(conn_id = %handle.id, user_id = %user_id, "Connection registered");

        if first {
            self.presence.mark_online(&user_id).await;
            let update = ServerEvent::PresenceUpdate {
                user_id: user_id.clone(),
                status: STATUS_ONLINE.to_string(),
            };
            let sent = self.registry.broadcast_all(&update, Some(handle.id));
            self.metrics.messages_sent(sent);
        }

        (handle, rx)
    }

    /// Deregisters a connection: clears typing state, leaves all rooms
    /// (announcing server and voice-room departures), and on the user's
    /// last device marks them offline and broadcasts the transition.
    pub async fn deregister(&self, conn_id: &ConnectionId) {
        let Some(handle) = self.registry.get(conn_id) else {
            return;
        };
        handle.mark_closed();

        // Auto-clear typing state the client never stopped.
        for target in self.typing.drain(*conn_id) {
            let (key, event) = match target {
                TypingTarget::Conversation(id) => (
                    RoomKey::Conversation(id.clone()),
                    ServerEvent::TypingUpdate {
                        conversation_id: id,
                        user_id: handle.user_id.clone(),
                        is_typing: false,
                    },
                ),
                TypingTarget::Channel(id) => (
                    RoomKey::Channel(id.clone()),
                    ServerEvent::ChannelTyping {
                        channel_id: id,
                        user_id: handle.user_id.clone(),
                        is_typing: false,
                    },
                ),
            };
            self.broadcast_to_room(&key, &event, Some(*conn_id));
        }

        // Implicit leave of every joined room.
        for key in self.rooms.leave_all(*conn_id) {
            match &key {
                RoomKey::Server(server_id) => {
                    let event = ServerEvent::MemberOffline {
                        user_id: handle.user_id.clone(),
                        server_id: server_id.clone(),
                    };
                    self.broadcast_to_room(&key, &event, None);
                }
                RoomKey::VoiceRoom(room_id) => {
                    self.voice.announce_left(room_id, &handle.user_id, &key);
                }
                _ => {}
            }
        }

        if let Some((_, last)) = self.registry.remove(conn_id) {
            self.metrics.connection_closed();
            info!(conn_id = %conn_id, user_id = %handle.user_id, "Connection deregistered");

            if last {
                self.presence.mark_offline(&handle.user_id).await;
                let update = ServerEvent::PresenceUpdate {
                    user_id: handle.user_id.clone(),
                    status: STATUS_OFFLINE.to_string(),
                };
                let sent = self.registry.broadcast_all(&update, None);
                self.metrics.messages_sent(sent);
            }
        }
    }

    /// Processes one inbound frame from a client.
    pub async fn handle_event(&self, conn_id: &ConnectionId, raw: &str) {
        self.metrics.message_received();

        let Some(handle) = self.registry.get(conn_id) else {
            warn!(conn_id = %conn_id, "Frame from unknown connection");
            return;
        };

        let event: ClientEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "Unparseable inbound frame");
                self.metrics.event_rejected();
                handle.send(&ServerEvent::error(
                    codes::INVALID_MESSAGE,
                    format!("Failed to parse event: {e}"),
                ));
                return;
            }
        };

        match event {
            ClientEvent::JoinRoom { room_id } => {
                self.rooms.join(*conn_id, RoomKey::Conversation(room_id));
            }
            ClientEvent::LeaveRoom { room_id } => {
                self.rooms.leave(*conn_id, &RoomKey::Conversation(room_id));
            }
            ClientEvent::ServerJoin { server_id } => {
                let key = RoomKey::Server(server_id.clone());
                self.rooms.join(*conn_id, key.clone());
                let event = ServerEvent::MemberOnline {
                    user_id: handle.user_id.clone(),
                    server_id,
                };
                self.broadcast_to_room(&key, &event, Some(*conn_id));
            }
            ClientEvent::ServerLeave { server_id } => {
                let key = RoomKey::Server(server_id.clone());
                self.rooms.leave(*conn_id, &key);
                let event = ServerEvent::MemberOffline {
                    user_id: handle.user_id.clone(),
                    server_id,
                };
                self.broadcast_to_room(&key, &event, None);
            }
            ClientEvent::ChannelJoin { channel_id } => {
                self.rooms.join(*conn_id, RoomKey::Channel(channel_id));
            }
            ClientEvent::ChannelLeave { channel_id } => {
                self.rooms.leave(*conn_id, &RoomKey::Channel(channel_id));
            }
            ClientEvent::ChannelTypingStart { channel_id } => {
                self.typing
                    .start(*conn_id, TypingTarget::Channel(channel_id.clone()));
                self.channel_typing(&handle, channel_id, true);
            }
            ClientEvent::ChannelTypingStop { channel_id } => {
                self.typing
                    .stop(*conn_id, &TypingTarget::Channel(channel_id.clone()));
                self.channel_typing(&handle, channel_id, false);
            }
            ClientEvent::TypingStart { conversation_id } => {
                self.typing.start(
                    *conn_id,
                    TypingTarget::Conversation(conversation_id.clone()),
                );
                self.conversation_typing(&handle, conversation_id, true);
            }
            ClientEvent::TypingStop { conversation_id } => {
                self.typing.stop(
                    *conn_id,
                    &TypingTarget::Conversation(conversation_id.clone()),
                );
                self.conversation_typing(&handle, conversation_id, false);
            }

            ClientEvent::CallInitiate {
                target_user_id,
                call_type,
                caller_info,
            } => {
                self.calls
                    .initiate(&handle, target_user_id, call_type, caller_info);
            }
            ClientEvent::CallAnswer {
                call_id,
                target_user_id,
                sdp,
            } => {
                self.calls.answer(&handle, call_id, target_user_id, sdp);
            }
            ClientEvent::CallReject {
                call_id,
                target_user_id,
            } => {
                self.calls.reject(&handle, call_id, target_user_id);
            }
            ClientEvent::CallIceCandidate {
                call_id,
                target_user_id,
                candidate,
            } => {
                self.calls
                    .ice_candidate(&handle, call_id, target_user_id, candidate);
            }
            ClientEvent::CallEnd {
                call_id,
                target_user_id,
            } => {
                self.calls.end(&handle, call_id, target_user_id);
            }
            ClientEvent::CallOffer {
                target_user_id,
                sdp,
            } => {
                self.calls.offer(&handle, target_user_id, sdp);
            }

            ClientEvent::VoiceRoomJoin { room_id, user_info } => {
                self.voice.join(&handle, &room_id, user_info);
            }
            ClientEvent::VoiceRoomLeave { room_id } => {
                self.voice.leave(&handle, &room_id);
            }
            ClientEvent::VoiceRoomOffer {
                room_id,
                target_user_id,
                target_connection_id,
                offer,
            } => {
                self.voice
                    .offer(&handle, &room_id, target_connection_id, target_user_id, offer);
            }
            ClientEvent::VoiceRoomAnswer {
                room_id,
                target_user_id,
                target_connection_id,
                answer,
            } => {
                self.voice.answer(
                    &handle,
                    &room_id,
                    target_connection_id,
                    target_user_id,
                    answer,
                );
            }
            ClientEvent::VoiceRoomIceCandidate {
                room_id,
                target_user_id,
                target_connection_id,
                candidate,
            } => {
                self.voice.ice_candidate(
                    &handle,
                    &room_id,
                    target_connection_id,
                    target_user_id,
                    candidate,
                );
            }
            ClientEvent::VoiceRoomScreenStart { room_id } => {
                let event = ServerEvent::VoiceRoomScreenStarted {
                    room_id: room_id.clone(),
                    user_id: handle.user_id.clone(),
                };
                self.voice.broadcast_state(&handle, &room_id, event);
            }
            ClientEvent::VoiceRoomScreenStop { room_id } => {
                let event = ServerEvent::VoiceRoomScreenStopped {
                    room_id: room_id.clone(),
                    user_id: handle.user_id.clone(),
                };
                self.voice.broadcast_state(&handle, &room_id, event);
            }
            ClientEvent::VoiceRoomMuteChange { room_id, is_muted } => {
                let event = ServerEvent::VoiceRoomUserMuteChanged {
                    room_id: room_id.clone(),
                    user_id: handle.user_id.clone(),
                    is_muted,
                };
                self.voice.broadcast_state(&handle, &room_id, event);
            }
            ClientEvent::VoiceRoomVideoChange {
                room_id,
                is_video_off,
            } => {
                let event = ServerEvent::VoiceRoomUserVideoChanged {
                    room_id: room_id.clone(),
                    user_id: handle.user_id.clone(),
                    is_video_off,
                };
                self.voice.broadcast_state(&handle, &room_id, event);
            }

            ClientEvent::Pong { .. } => {
                handle.record_pong().await;
            }
        }
    }

    /// Broadcasts an event to a room's members.
    pub fn broadcast_to_room(
        &self,
        key: &RoomKey,
        event: &ServerEvent,
        exclude: Option<ConnectionId>,
    ) {
        let members = self.rooms.members(key);
        let sent = self.registry.send_to_connections(&members, event, exclude);
        self.metrics.messages_sent(sent);
    }

    fn conversation_typing(&self, handle: &Arc<ConnectionHandle>, conversation_id: String, is_typing: bool) {
        let key = RoomKey::Conversation(conversation_id.clone());
        let event = ServerEvent::TypingUpdate {
            conversation_id,
            user_id: handle.user_id.clone(),
            is_typing,
        };
        self.broadcast_to_room(&key, &event, Some(handle.id));
    }

    fn channel_typing(&self, handle: &Arc<ConnectionHandle>, channel_id: String, is_typing: bool) {
        let key = RoomKey::Channel(channel_id.clone());
        let event = ServerEvent::ChannelTyping {
            channel_id,
            user_id: handle.user_id.clone(),
            is_typing,
        };
        self.broadcast_to_room(&key, &event, Some(handle.id));
    }

    /// One pass of background maintenance: re-arm presence TTLs for
    /// connected users and prune dead call sessions.
    pub async fn run_maintenance_cycle(&self) {
        let user_ids = self.registry.connected_user_ids();
        if !user_ids.is_empty() {
            self.presence.refresh(&user_ids).await;
        }
        let pruned = self
            .sessions
            .prune(self.config.call_session_max_age_seconds);
        if pruned > 0 {
            debug!(pruned, "Pruned stale call sessions");
        }
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Gracefully shuts the engine down: closes every connection and
    /// marks connected users offline (best-effort).
    pub async fn shutdown(&self) {
        info!("Shutting down gateway engine");
        let _ = self.shutdown_tx.send(());

        for user_id in self.registry.connected_user_ids() {
            self.presence.mark_offline(&user_id).await;
        }
        for handle in self.registry.all_connections() {
            handle.mark_closed();
            self.registry.remove(&handle.id);
        }

        info!("Gateway engine shut down");
    }

    /// Heartbeat timing derived from the engine config.
    pub fn heartbeat_config(&self) -> crate::connection::heartbeat::HeartbeatConfig {
        (&self.config).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lumen_core::config::presence::PresenceConfig;
    use lumen_presence::PresenceManager;
    use lumen_presence::memory::MemoryPresenceStore;

    use crate::push::NoopPushSender;

    fn make_engine() -> GatewayEngine {
        let presence_config = PresenceConfig::default();
        let manager = Arc::new(PresenceManager::from_store(Arc::new(
            MemoryPresenceStore::new(&presence_config.memory),
        )));
        GatewayEngine::new(
            GatewayConfig::default(),
            Arc::new(PresenceTracker::new(manager, &presence_config)),
            Arc::new(NoopPushSender),
        )
    }

    fn parse(frame: &str) -> serde_json::Value {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn test_presence_tracks_connection_count() {
        let engine = make_engine();
        let user = "u1".to_string();

        let (a, _rx_a) = engine.register(user.clone(), None).await;
        assert!(engine.presence.is_online(&user).await);

        let (b, _rx_b) = engine.register(user.clone(), None).await;
        engine.deregister(&a.id).await;
        assert!(engine.presence.is_online(&user).await);

        engine.deregister(&b.id).await;
        assert!(!engine.presence.is_online(&user).await);

        let statuses = engine.presence.batch_status(&[user.clone()]).await;
        assert_eq!(statuses.get(&user), Some(&false));
    }

    #[tokio::test]
    async fn test_presence_broadcast_excludes_new_connection() {
        let engine = make_engine();
        let (_watcher, mut watcher_rx) = engine.register("w".to_string(), None).await;

        let (_conn, mut new_rx) = engine.register("u1".to_string(), None).await;

        let frame = parse(&watcher_rx.recv().await.unwrap());
        assert_eq!(frame["event"], "presence:update");
        assert_eq!(frame["data"]["userId"], "u1");
        assert_eq!(frame["data"]["status"], "online");
        assert!(new_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_device_triggers_no_online_broadcast() {
        let engine = make_engine();
        let (_watcher, mut watcher_rx) = engine.register("w".to_string(), None).await;

        let (_a, _rx_a) = engine.register("u1".to_string(), None).await;
        let _ = watcher_rx.recv().await; // online broadcast for first device

        let (_b, _rx_b) = engine.register("u1".to_string(), None).await;
        assert!(watcher_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_clears_typing_state() {
        let engine = make_engine();
        let (typist, _typist_rx) = engine.register("t".to_string(), None).await;
        let (reader, mut reader_rx) = engine.register("r".to_string(), None).await;

        engine
            .handle_event(
                &typist.id,
                r#"{"event":"join:room","data":{"roomId":"42"}}"#,
            )
            .await;
        engine
            .handle_event(
                &reader.id,
                r#"{"event":"join:room","data":{"roomId":"42"}}"#,
            )
            .await;
        engine
            .handle_event(
                &typist.id,
                r#"{"event":"typing:start","data":{"conversationId":"42"}}"#,
            )
            .await;

        let frame = parse(&reader_rx.recv().await.unwrap());
        assert_eq!(frame["event"], "typing:update");
        assert_eq!(frame["data"]["isTyping"], true);

        engine.deregister(&typist.id).await;

        let frame = parse(&reader_rx.recv().await.unwrap());
        assert_eq!(frame["event"], "typing:update");
        assert_eq!(frame["data"]["isTyping"], false);
        assert_eq!(frame["data"]["userId"], "t");
    }

    #[tokio::test]
    async fn test_server_membership_events() {
        let engine = make_engine();
        let (member, _member_rx) = engine.register("m".to_string(), None).await;
        let (observer, mut observer_rx) = engine.register("o".to_string(), None).await;

        engine
            .handle_event(
                &observer.id,
                r#"{"event":"server:join","data":{"serverId":"s1"}}"#,
            )
            .await;
        engine
            .handle_event(
                &member.id,
                r#"{"event":"server:join","data":{"serverId":"s1"}}"#,
            )
            .await;

        let frame = parse(&observer_rx.recv().await.unwrap());
        assert_eq!(frame["event"], "member:online");
        assert_eq!(frame["data"]["userId"], "m");

        // Implicit leave on disconnect still announces member:offline.
        engine.deregister(&member.id).await;
        let frame = parse(&observer_rx.recv().await.unwrap());
        assert_eq!(frame["event"], "member:offline");
        assert_eq!(frame["data"]["userId"], "m");
    }

    #[tokio::test]
    async fn test_leaving_room_stops_broadcasts() {
        let engine = make_engine();
        let (a, _rx_a) = engine.register("a".to_string(), None).await;
        let (b, mut rx_b) = engine.register("b".to_string(), None).await;

        engine
            .handle_event(&a.id, r#"{"event":"join:room","data":{"roomId":"1"}}"#)
            .await;
        engine
            .handle_event(&b.id, r#"{"event":"join:room","data":{"roomId":"1"}}"#)
            .await;
        engine
            .handle_event(&b.id, r#"{"event":"leave:room","data":{"roomId":"1"}}"#)
            .await;
        // Leaving twice is a no-op.
        engine
            .handle_event(&b.id, r#"{"event":"leave:room","data":{"roomId":"1"}}"#)
            .await;

        engine
            .handle_event(
                &a.id,
                r#"{"event":"typing:start","data":{"conversationId":"1"}}"#,
            )
            .await;
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_error_ack() {
        let engine = make_engine();
        let (conn, mut rx) = engine.register("u".to_string(), None).await;

        engine.handle_event(&conn.id, "{not json").await;
        let frame = parse(&rx.recv().await.unwrap());
        assert_eq!(frame["event"], "error");
        assert_eq!(frame["data"]["code"], codes::INVALID_MESSAGE);

        engine
            .handle_event(&conn.id, r#"{"event":"join:room","data":{}}"#)
            .await;
        let frame = parse(&rx.recv().await.unwrap());
        assert_eq!(frame["data"]["code"], codes::INVALID_MESSAGE);
    }

    #[tokio::test]
    async fn test_connection_cap_evicts_oldest() {
        let presence_config = PresenceConfig::default();
        let manager = Arc::new(PresenceManager::from_store(Arc::new(
            MemoryPresenceStore::new(&presence_config.memory),
        )));
        let engine = GatewayEngine::new(
            GatewayConfig {
                max_connections_per_user: 2,
                ..GatewayConfig::default()
            },
            Arc::new(PresenceTracker::new(manager, &presence_config)),
            Arc::new(NoopPushSender),
        );

        let (a, _rx_a) = engine.register("u".to_string(), None).await;
        let (_b, _rx_b) = engine.register("u".to_string(), None).await;
        let (_c, _rx_c) = engine.register("u".to_string(), None).await;

        assert!(engine.registry.get(&a.id).is_none());
        assert_eq!(engine.registry.connections_for(&"u".to_string()).len(), 2);
        assert!(engine.presence.is_online(&"u".to_string()).await);
    }

    #[tokio::test]
    async fn test_heartbeat_timeout_frees_connection() {
        use std::time::Duration;

        use crate::connection::heartbeat::{HeartbeatConfig, run_heartbeat};

        let engine = make_engine();
        let (handle, _rx) = engine.register("u1".to_string(), None).await;

        // Never send a pong. The loop must finish on its own so the
        // transport task wakes up and tears the connection down.
        let config = HeartbeatConfig {
            ping_interval: Duration::from_millis(10),
            ping_timeout: Duration::from_millis(5),
        };
        tokio::time::timeout(
            Duration::from_secs(5),
            run_heartbeat(handle.clone(), config),
        )
        .await
        .unwrap();
        assert!(!handle.is_alive());

        engine.deregister(&handle.id).await;
        engine.run_maintenance_cycle().await;

        assert!(engine.registry.get(&handle.id).is_none());
        assert!(!engine.presence.is_online(&"u1".to_string()).await);
    }

    #[tokio::test]
    async fn test_voiceroom_disconnect_announces_departure() {
        let engine = make_engine();
        let (a, _rx_a) = engine.register("a".to_string(), None).await;
        let (b, mut rx_b) = engine.register("b".to_string(), None).await;

        engine
            .handle_event(&a.id, r#"{"event":"voiceroom:join","data":{"roomId":"7"}}"#)
            .await;
        engine
            .handle_event(&b.id, r#"{"event":"voiceroom:join","data":{"roomId":"7"}}"#)
            .await;
        let _ = rx_b.recv().await; // existing-users

        engine.deregister(&a.id).await;
        let frame = parse(&rx_b.recv().await.unwrap());
        assert_eq!(frame["event"], "voiceroom:user-left");
        assert_eq!(frame["data"]["userId"], "a");
    }
}
