//! Identity values carried by tree nodes.
//!
//! Content ordering is the only deduplication mechanism: two sibling contents
//! that compare equal are the same logical entity and get merged.

use std::cmp::Ordering;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::analyzer::{AnalyzedPayload, AnalyzerManager};
use crate::websocket::{Direction, Opcode, Payload};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFolderContent {
    /// Canonical `scheme://host[:port]`.
    pub host_name: String,
    /// Channels seen for this host, sorted and unique.
    pub channels: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeContent {
    /// Normalised `scheme://host[:port]path`.
    pub uri: String,
    pub channels: Vec<i64>,
    pub history_ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageFolderContent {
    /// `None` for the single per-host folder.
    pub kind: Option<(Direction, Opcode)>,
}

/// One observation of a message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: i64,
    pub message_id: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct MessageContent {
    pub payload: Payload,
    pub direction: Direction,
    pub opcode: Opcode,
    pub occurrences: Vec<MessageRef>,
    analyzed: OnceLock<Option<AnalyzedPayload>>,
}

impl MessageContent {
    pub fn new(payload: Payload, direction: Direction, opcode: Opcode, occurrence: MessageRef) -> Self {
        MessageContent {
            payload,
            direction,
            opcode,
            occurrences: vec![occurrence],
            analyzed: OnceLock::new(),
        }
    }

    /// Analyse the payload on first use; later calls return the cached result.
    pub fn analyzed(&self, analyzers: &AnalyzerManager) -> Option<&AnalyzedPayload> {
        self.analyzed
            .get_or_init(|| analyzers.analyze(&self.payload))
            .as_ref()
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed.get().is_some()
    }

    /// Forget the cached analysis; the next name request analyses again.
    pub fn reset_analysis(&mut self) {
        self.analyzed = OnceLock::new();
    }

    pub fn first_seen(&self) -> Option<i64> {
        self.occurrences.iter().map(|occurrence| occurrence.timestamp).min()
    }

    fn key_cmp(&self, other: &Self) -> Ordering {
        self.payload
            .as_bytes()
            .cmp(other.payload.as_bytes())
            .then(self.direction.cmp(&other.direction))
            .then(self.opcode.cmp(&other.opcode))
    }
}

#[derive(Debug, Clone)]
pub enum NodeContent {
    Root,
    HostFolder(HostFolderContent),
    HandshakeFolder,
    Handshake(HandshakeContent),
    MessageFolder(MessageFolderContent),
    Message(MessageContent),
}

fn union_sorted(target: &mut Vec<i64>, extra: &[i64]) {
    target.extend_from_slice(extra);
    target.sort_unstable();
    target.dedup();
}

impl NodeContent {
    pub fn host(host_name: &str, channel_id: i64) -> Self {
        NodeContent::HostFolder(HostFolderContent {
            host_name: host_name.to_string(),
            channels: vec![channel_id],
        })
    }

    pub fn handshake(uri: &str, channel_id: i64, history_id: Option<i64>) -> Self {
        NodeContent::Handshake(HandshakeContent {
            uri: uri.to_string(),
            channels: vec![channel_id],
            history_ids: history_id.into_iter().collect(),
        })
    }

    pub fn message_folder(kind: Option<(Direction, Opcode)>) -> Self {
        NodeContent::MessageFolder(MessageFolderContent { kind })
    }

    fn rank(&self) -> u8 {
        match self {
            NodeContent::Root => 0,
            NodeContent::HostFolder(_) => 1,
            NodeContent::HandshakeFolder => 2,
            NodeContent::Handshake(_) => 3,
            NodeContent::MessageFolder(_) => 4,
            NodeContent::Message(_) => 5,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeContent::Root => "root",
            NodeContent::HostFolder(_) => "host",
            NodeContent::HandshakeFolder => "handshake-folder",
            NodeContent::Handshake(_) => "handshake",
            NodeContent::MessageFolder(_) => "message-folder",
            NodeContent::Message(_) => "message",
        }
    }

    /// Fold a duplicate observation into this content.
    ///
    /// Returns false, leaving `self` untouched, when `other` is not the same entity.
    pub fn merge(&mut self, other: NodeContent) -> bool {
        if *self != other {
            return false;
        }
        match (self, other) {
            (NodeContent::HostFolder(host), NodeContent::HostFolder(other)) => {
                union_sorted(&mut host.channels, &other.channels);
            }
            (NodeContent::Handshake(handshake), NodeContent::Handshake(other)) => {
                union_sorted(&mut handshake.channels, &other.channels);
                union_sorted(&mut handshake.history_ids, &other.history_ids);
            }
            (NodeContent::Message(message), NodeContent::Message(other)) => {
                message.occurrences.extend(other.occurrences);
            }
            _ => {}
        }
        true
    }

    /// Channels referenced by this content.
    pub fn channels(&self) -> Vec<i64> {
        match self {
            NodeContent::HostFolder(host) => host.channels.clone(),
            NodeContent::Handshake(handshake) => handshake.channels.clone(),
            NodeContent::Message(message) => {
                let mut channels: Vec<i64> = message.occurrences.iter().map(|o| o.channel_id).collect();
                channels.sort_unstable();
                channels.dedup();
                channels
            }
            _ => Vec::new(),
        }
    }

    pub fn observation_count(&self) -> usize {
        match self {
            NodeContent::HostFolder(host) => host.channels.len(),
            NodeContent::Handshake(handshake) => handshake.channels.len(),
            NodeContent::Message(message) => message.occurrences.len(),
            _ => 0,
        }
    }

    /// True for contents that stand for observed traffic rather than structure.
    pub fn is_visited(&self) -> bool {
        self.observation_count() > 0
    }

    pub fn as_message(&self) -> Option<&MessageContent> {
        match self {
            NodeContent::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<&HostFolderContent> {
        match self {
            NodeContent::HostFolder(host) => Some(host),
            _ => None,
        }
    }
}

impl Ord for NodeContent {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (NodeContent::HostFolder(a), NodeContent::HostFolder(b)) => a.host_name.cmp(&b.host_name),
            (NodeContent::Handshake(a), NodeContent::Handshake(b)) => a.uri.cmp(&b.uri),
            (NodeContent::MessageFolder(a), NodeContent::MessageFolder(b)) => a.kind.cmp(&b.kind),
            (NodeContent::Message(a), NodeContent::Message(b)) => a.key_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for NodeContent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NodeContent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NodeContent {}
