//! Typed room keys.

use std::fmt;

/// A typed logical room, rendered on the wire as `"{type}:{id}"`
/// (e.g. `conversation:42`, `voiceroom:7`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// Direct-message conversation.
    Conversation(String),
    /// Community server (membership emits member-presence events).
    Server(String),
    /// Channel within a server.
    Channel(String),
    /// Comment thread under a post.
    Post(String),
    /// Comment thread under a short video.
    Short(String),
    /// Multi-party voice room.
    VoiceRoom(String),
}

impl RoomKey {
    /// Parses a `"{type}:{id}"` room name.
    pub fn parse(raw: &str) -> Option<Self> {
        let (kind, id) = raw.split_once(':')?;
        if id.is_empty() {
            return None;
        }
        match kind {
            "conversation" => Some(Self::Conversation(id.to_string())),
            "server" => Some(Self::Server(id.to_string())),
            "channel" => Some(Self::Channel(id.to_string())),
            "post" => Some(Self::Post(id.to_string())),
            "short" => Some(Self::Short(id.to_string())),
            "voiceroom" => Some(Self::VoiceRoom(id.to_string())),
            _ => None,
        }
    }

    /// Returns the room's raw id without the type prefix.
    pub fn id(&self) -> &str {
        match self {
            Self::Conversation(id)
            | Self::Server(id)
            | Self::Channel(id)
            | Self::Post(id)
            | Self::Short(id)
            | Self::VoiceRoom(id) => id,
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conversation(id) => write!(f, "conversation:{id}"),
            Self::Server(id) => write!(f, "server:{id}"),
            Self::Channel(id) => write!(f, "channel:{id}"),
            Self::Post(id) => write!(f, "post:{id}"),
            Self::Short(id) => write!(f, "short:{id}"),
            Self::VoiceRoom(id) => write!(f, "voiceroom:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse_agree() {
        let keys = [
            RoomKey::Conversation("42".to_string()),
            RoomKey::Server("s1".to_string()),
            RoomKey::Channel("c9".to_string()),
            RoomKey::Post("p3".to_string()),
            RoomKey::Short("sh8".to_string()),
            RoomKey::VoiceRoom("7".to_string()),
        ];
        for key in keys {
            assert_eq!(RoomKey::parse(&key.to_string()), Some(key));
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(RoomKey::parse("conversation"), None);
        assert_eq!(RoomKey::parse("conversation:"), None);
        assert_eq!(RoomKey::parse("dungeon:1"), None);
    }
}
