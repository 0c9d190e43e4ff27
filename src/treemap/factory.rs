use log::debug;

use crate::config::MessageGrouping;
use crate::data::schemes::is_secure_scheme;
use crate::error::Result;
use crate::treemap::content::{MessageContent, MessageRef, NodeContent};
use crate::treemap::namer::{handshake_key, normalize_uri, websocket_host_name};
use crate::websocket::channel::UNSPECIFIED_PORT;
use crate::websocket::{ChannelDto, HandshakeMessage, MessageDto};

/// Contents needed to place a new connection, root downwards.
#[derive(Debug, Clone)]
pub struct ConnectionChain {
    pub host: NodeContent,
    pub handshake_folder: NodeContent,
    pub handshake: NodeContent,
}

/// Turns proxy DTOs into node contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeFactory {
    grouping: MessageGrouping,
}

impl NodeFactory {
    pub fn new(grouping: MessageGrouping) -> Self {
        NodeFactory { grouping }
    }

    pub fn connection_chain(&self, channel: &ChannelDto, handshake: &HandshakeMessage) -> Result<ConnectionChain> {
        let raw_uri = if handshake.request_uri.trim().is_empty() {
            // Handshake never stored: fall back to what the channel knows.
            if channel.url.trim().is_empty() {
                channel.host.as_str()
            } else {
                channel.url.as_str()
            }
        } else {
            handshake.request_uri.as_str()
        };
        let url = normalize_uri(raw_uri)?;

        let secure = handshake.secure || is_secure_scheme(url.scheme());
        let port = if channel.port == UNSPECIFIED_PORT {
            url.port_or_known_default().map_or(UNSPECIFIED_PORT, i32::from)
        } else {
            channel.port
        };
        let host = match url.host_str() {
            Some(host) => host,
            None => channel.host.as_str(),
        };

        let host_name = websocket_host_name(secure, host, port);
        let key = handshake_key(&url)?;
        debug!("Channel #{} resolves to host {} via handshake {}", channel.id, host_name, key);

        let history_id = handshake.history_id.or(channel.history_id);
        Ok(ConnectionChain {
            host: NodeContent::host(&host_name, channel.id),
            handshake_folder: NodeContent::HandshakeFolder,
            handshake: NodeContent::handshake(&key, channel.id, history_id),
        })
    }

    pub fn message_folder(&self, message: &MessageDto) -> NodeContent {
        match self.grouping {
            MessageGrouping::Flat => NodeContent::message_folder(None),
            MessageGrouping::ByKind => NodeContent::message_folder(Some((message.direction, message.opcode))),
        }
    }

    pub fn message_content(&self, message: &MessageDto) -> NodeContent {
        NodeContent::Message(MessageContent::new(
            message.payload.clone(),
            message.direction,
            message.opcode,
            MessageRef {
                channel_id: message.channel_id,
                message_id: message.message_id,
                timestamp: message.timestamp,
            },
        ))
    }
}
