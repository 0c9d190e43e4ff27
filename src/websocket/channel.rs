use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::websocket::types::{Direction, Opcode, Payload};

/// Port value used by the proxy when the target port is not known.
pub const UNSPECIFIED_PORT: i32 = -1;

// Snapshot of an established (or establishing) WebSocket channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDto {
    pub id: i64,
    pub host: String,
    #[serde(default = "unspecified_port")]
    pub port: i32,
    /// Handshake request URI, empty when the handshake was never stored.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub start_timestamp: Option<i64>,
    #[serde(default)]
    pub end_timestamp: Option<i64>,
    #[serde(default)]
    pub history_id: Option<i64>,
}

fn unspecified_port() -> i32 {
    UNSPECIFIED_PORT
}

impl ChannelDto {
    pub fn new(id: i64, host: &str, port: i32) -> Self {
        ChannelDto {
            id,
            host: host.to_string(),
            port,
            url: String::new(),
            start_timestamp: None,
            end_timestamp: None,
            history_id: None,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }
}

// A single frame exchanged over a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub channel_id: i64,
    pub message_id: i64,
    pub opcode: Opcode,
    pub direction: Direction,
    pub payload: Payload,
    #[serde(default)]
    pub timestamp: i64,
}

impl MessageDto {
    pub fn new(channel_id: i64, message_id: i64, opcode: Opcode, direction: Direction, payload: Payload) -> Self {
        MessageDto {
            channel_id,
            message_id,
            opcode,
            direction,
            payload,
            timestamp: 0,
        }
    }

    pub fn text(channel_id: i64, message_id: i64, direction: Direction, text: &str) -> Self {
        Self::new(channel_id, message_id, Opcode::Text, direction, Payload::from(text))
    }
}

/// The HTTP upgrade request that opened a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeMessage {
    pub request_uri: String,
    /// True when the upgrade happened over TLS.
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub history_id: Option<i64>,
}

impl HandshakeMessage {
    pub fn new(request_uri: &str, secure: bool) -> Self {
        HandshakeMessage {
            request_uri: request_uri.to_string(),
            secure,
            history_id: None,
        }
    }
}

/// What the tree map needs from a proxied connection.
///
/// Resolving the handshake may hit storage (history references) or parse
/// headers, so it can fail; callers must treat failure as "skip this channel".
pub trait ProxyHandle: Send + Sync {
    fn channel(&self) -> ChannelDto;

    fn handshake(&self) -> Result<HandshakeMessage>;
}

/// A proxy handle backed by recorded values, used when replaying captures.
#[derive(Debug, Clone)]
pub struct RecordedProxy {
    pub channel: ChannelDto,
    handshake: std::result::Result<HandshakeMessage, String>,
}

impl RecordedProxy {
    pub fn new(channel: ChannelDto, handshake: HandshakeMessage) -> Self {
        RecordedProxy {
            channel,
            handshake: Ok(handshake),
        }
    }

    /// A handle whose handshake lookup fails with `reason`.
    pub fn unresolvable(channel: ChannelDto, reason: &str) -> Self {
        RecordedProxy {
            channel,
            handshake: Err(reason.to_string()),
        }
    }
}

impl ProxyHandle for RecordedProxy {
    fn channel(&self) -> ChannelDto {
        self.channel.clone()
    }

    fn handshake(&self) -> Result<HandshakeMessage> {
        self.handshake.clone().map_err(|reason| Error::HandshakeUnresolved {
            channel_id: self.channel.id,
            reason,
        })
    }

}
