//! Wire event definitions for the gateway protocol.
//!
//! Events are adjacently tagged: `{"event": "call:initiate", "data": {...}}`.
//! Signaling payloads (SDP, ICE candidates, caller/user info) are opaque
//! JSON values relayed verbatim; the gateway never inspects them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lumen_core::types::{CallId, ConnectionId, UserId};

/// Error codes carried by outbound `error` events.
pub mod codes {
    /// The inbound frame could not be parsed as a known event.
    pub const INVALID_MESSAGE: &str = "INVALID_MESSAGE";
    /// The referenced call id has no active session.
    pub const UNKNOWN_CALL: &str = "UNKNOWN_CALL";
    /// Another device already answered this call.
    pub const CALL_ALREADY_ANSWERED: &str = "CALL_ALREADY_ANSWERED";
    /// The target user has no live connections on this instance.
    pub const TARGET_UNREACHABLE: &str = "TARGET_UNREACHABLE";
    /// A voice-room signal carried neither a target connection nor a
    /// target user.
    pub const MISSING_TARGET: &str = "MISSING_TARGET";
}

/// Media type of a 1:1 call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    /// Audio-only call.
    Audio,
    /// Audio + video call.
    Video,
}

/// Events sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Join a conversation room.
    #[serde(rename = "join:room", rename_all = "camelCase")]
    JoinRoom { room_id: String },
    /// Leave a conversation room.
    #[serde(rename = "leave:room", rename_all = "camelCase")]
    LeaveRoom { room_id: String },
    /// Join a server room (emits `member:online` to the room).
    #[serde(rename = "server:join", rename_all = "camelCase")]
    ServerJoin { server_id: String },
    /// Leave a server room (emits `member:offline` to the room).
    #[serde(rename = "server:leave", rename_all = "camelCase")]
    ServerLeave { server_id: String },
    /// Join a channel room.
    #[serde(rename = "channel:join", rename_all = "camelCase")]
    ChannelJoin { channel_id: String },
    /// Leave a channel room.
    #[serde(rename = "channel:leave", rename_all = "camelCase")]
    ChannelLeave { channel_id: String },
    /// Start typing in a channel.
    #[serde(rename = "channel:typing:start", rename_all = "camelCase")]
    ChannelTypingStart { channel_id: String },
    /// Stop typing in a channel.
    #[serde(rename = "channel:typing:stop", rename_all = "camelCase")]
    ChannelTypingStop { channel_id: String },
    /// Start typing in a conversation.
    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart { conversation_id: String },
    /// Stop typing in a conversation.
    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop { conversation_id: String },

    /// Initiate a 1:1 call to a user (any of their devices may answer).
    #[serde(rename = "call:initiate", rename_all = "camelCase")]
    CallInitiate {
        target_user_id: UserId,
        #[serde(rename = "type")]
        call_type: CallType,
        caller_info: Option<Value>,
    },
    /// Answer an incoming call. First answer wins.
    #[serde(rename = "call:answer", rename_all = "camelCase")]
    CallAnswer {
        call_id: CallId,
        target_user_id: UserId,
        sdp: Value,
    },
    /// Reject an incoming call.
    #[serde(rename = "call:reject", rename_all = "camelCase")]
    CallReject {
        call_id: CallId,
        target_user_id: UserId,
    },
    /// Relay an ICE candidate for a call.
    #[serde(rename = "call:ice-candidate", rename_all = "camelCase")]
    CallIceCandidate {
        call_id: CallId,
        target_user_id: UserId,
        candidate: Value,
    },
    /// End a call. Ending twice is a no-op.
    #[serde(rename = "call:end", rename_all = "camelCase")]
    CallEnd {
        call_id: CallId,
        target_user_id: UserId,
    },
    /// Relay an SDP offer outside the tracked call handshake.
    #[serde(rename = "call:offer", rename_all = "camelCase")]
    CallOffer { target_user_id: UserId, sdp: Value },

    /// Join a voice room (triggers the existing-users handshake).
    #[serde(rename = "voiceroom:join", rename_all = "camelCase")]
    VoiceRoomJoin {
        room_id: String,
        user_info: Option<Value>,
    },
    /// Leave a voice room.
    #[serde(rename = "voiceroom:leave", rename_all = "camelCase")]
    VoiceRoomLeave { room_id: String },
    /// Relay a mesh SDP offer to a specific peer.
    #[serde(rename = "voiceroom:offer", rename_all = "camelCase")]
    VoiceRoomOffer {
        room_id: String,
        #[serde(default)]
        target_user_id: Option<UserId>,
        #[serde(default)]
        target_connection_id: Option<ConnectionId>,
        offer: Value,
    },
    /// Relay a mesh SDP answer to a specific peer.
    #[serde(rename = "voiceroom:answer", rename_all = "camelCase")]
    VoiceRoomAnswer {
        room_id: String,
        #[serde(default)]
        target_user_id: Option<UserId>,
        #[serde(default)]
        target_connection_id: Option<ConnectionId>,
        answer: Value,
    },
    /// Relay a mesh ICE candidate to a specific peer.
    #[serde(rename = "voiceroom:ice-candidate", rename_all = "camelCase")]
    VoiceRoomIceCandidate {
        room_id: String,
        #[serde(default)]
        target_user_id: Option<UserId>,
        #[serde(default)]
        target_connection_id: Option<ConnectionId>,
        candidate: Value,
    },
    /// Announce screen sharing started.
    #[serde(rename = "voiceroom:screen-start", rename_all = "camelCase")]
    VoiceRoomScreenStart { room_id: String },
    /// Announce screen sharing stopped.
    #[serde(rename = "voiceroom:screen-stop", rename_all = "camelCase")]
    VoiceRoomScreenStop { room_id: String },
    /// Announce a mute state change.
    #[serde(rename = "voiceroom:mute-change", rename_all = "camelCase")]
    VoiceRoomMuteChange { room_id: String, is_muted: bool },
    /// Announce a video state change.
    #[serde(rename = "voiceroom:video-change", rename_all = "camelCase")]
    VoiceRoomVideoChange { room_id: String, is_video_off: bool },

    /// Heartbeat response.
    #[serde(rename = "pong", rename_all = "camelCase")]
    Pong { timestamp: i64 },
}

/// A voice-room participant as reported in the join handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceRoomPeer {
    /// The participant's exact connection.
    pub connection_id: ConnectionId,
    /// The participant's user id.
    pub user_id: UserId,
}

/// Events sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Global presence transition for a user.
    #[serde(rename = "presence:update", rename_all = "camelCase")]
    PresenceUpdate { user_id: UserId, status: String },
    /// A member joined a server room.
    #[serde(rename = "member:online", rename_all = "camelCase")]
    MemberOnline { user_id: UserId, server_id: String },
    /// A member left a server room.
    #[serde(rename = "member:offline", rename_all = "camelCase")]
    MemberOffline { user_id: UserId, server_id: String },
    /// Typing indicator in a channel.
    #[serde(rename = "channel:typing", rename_all = "camelCase")]
    ChannelTyping {
        channel_id: String,
        user_id: UserId,
        is_typing: bool,
    },
    /// Typing indicator in a conversation.
    #[serde(rename = "typing:update", rename_all = "camelCase")]
    TypingUpdate {
        conversation_id: String,
        user_id: UserId,
        is_typing: bool,
    },

    /// Acknowledgement to the initiator carrying the generated call id.
    #[serde(rename = "call:initiated", rename_all = "camelCase")]
    CallInitiated {
        call_id: CallId,
        target_user_id: UserId,
    },
    /// An incoming 1:1 call, fanned out to every device of the target.
    #[serde(rename = "call:incoming", rename_all = "camelCase")]
    CallIncoming {
        call_id: CallId,
        caller_id: UserId,
        #[serde(rename = "type")]
        call_type: CallType,
        caller_info: Option<Value>,
    },
    /// The call was answered.
    #[serde(rename = "call:accepted", rename_all = "camelCase")]
    CallAccepted {
        call_id: CallId,
        user_id: UserId,
        sdp: Value,
    },
    /// The call was rejected.
    #[serde(rename = "call:rejected", rename_all = "camelCase")]
    CallRejected { call_id: CallId, user_id: UserId },
    /// The call ended.
    #[serde(rename = "call:ended", rename_all = "camelCase")]
    CallEnded { call_id: CallId, user_id: UserId },
    /// ICE candidate relay for a call.
    #[serde(rename = "call:ice-candidate", rename_all = "camelCase")]
    CallIceCandidate {
        call_id: CallId,
        user_id: UserId,
        candidate: Value,
    },
    /// SDP offer relay outside the tracked call handshake.
    #[serde(rename = "call:offer", rename_all = "camelCase")]
    CallOffer { from_user_id: UserId, sdp: Value },

    /// A new participant joined the voice room.
    #[serde(rename = "voiceroom:user-joined", rename_all = "camelCase")]
    VoiceRoomUserJoined {
        room_id: String,
        user_id: UserId,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_info: Option<Value>,
    },
    /// A participant left the voice room.
    #[serde(rename = "voiceroom:user-left", rename_all = "camelCase")]
    VoiceRoomUserLeft { room_id: String, user_id: UserId },
    /// Join handshake reply: every other participant in the room.
    #[serde(rename = "voiceroom:existing-users", rename_all = "camelCase")]
    VoiceRoomExistingUsers {
        room_id: String,
        users: Vec<VoiceRoomPeer>,
    },
    /// Mesh SDP offer from a specific peer.
    #[serde(rename = "voiceroom:offer", rename_all = "camelCase")]
    VoiceRoomOffer {
        room_id: String,
        from_user_id: UserId,
        from_connection_id: ConnectionId,
        offer: Value,
    },
    /// Mesh SDP answer from a specific peer.
    #[serde(rename = "voiceroom:answer", rename_all = "camelCase")]
    VoiceRoomAnswer {
        room_id: String,
        from_user_id: UserId,
        from_connection_id: ConnectionId,
        answer: Value,
    },
    /// Mesh ICE candidate from a specific peer.
    #[serde(rename = "voiceroom:ice-candidate", rename_all = "camelCase")]
    VoiceRoomIceCandidate {
        room_id: String,
        from_user_id: UserId,
        from_connection_id: ConnectionId,
        candidate: Value,
    },
    /// Screen sharing started in the room.
    #[serde(rename = "voiceroom:screen-started", rename_all = "camelCase")]
    VoiceRoomScreenStarted { room_id: String, user_id: UserId },
    /// Screen sharing stopped in the room.
    #[serde(rename = "voiceroom:screen-stopped", rename_all = "camelCase")]
    VoiceRoomScreenStopped { room_id: String, user_id: UserId },
    /// A participant's mute state changed.
    #[serde(rename = "voiceroom:user-mute-changed", rename_all = "camelCase")]
    VoiceRoomUserMuteChanged {
        room_id: String,
        user_id: UserId,
        is_muted: bool,
    },
    /// A participant's video state changed.
    #[serde(rename = "voiceroom:user-video-changed", rename_all = "camelCase")]
    VoiceRoomUserVideoChanged {
        room_id: String,
        user_id: UserId,
        is_video_off: bool,
    },

    /// Heartbeat probe.
    #[serde(rename = "ping", rename_all = "camelCase")]
    Ping { timestamp: i64 },
    /// Error acknowledgement for a rejected inbound event.
    #[serde(rename = "error", rename_all = "camelCase")]
    Error { code: String, message: String },
}

impl ServerEvent {
    /// Builds an error event from a code and message.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
