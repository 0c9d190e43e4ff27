//! Indented text dump of the tree, one entry per node.

use std::fmt::Write;

use itertools::Itertools;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::treemap::content::{MessageContent, NodeContent};
use crate::treemap::map::TreeView;
use crate::treemap::node::{NodeId, Tree};
use crate::websocket::Payload;

const INDENT: &str = "  ";

/// Dump the whole tree, root first.
pub fn export_tree(view: &TreeView<'_>) -> String {
    let mut out = String::new();
    write_node(view, Tree::ROOT, 0, &mut out);
    out
}

/// RFC 3339 rendering of a millisecond timestamp; the raw value when out of range.
pub fn format_timestamp(millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_else(|| millis.to_string())
}

fn storage(content: &NodeContent) -> &'static str {
    match content {
        NodeContent::Handshake(handshake) if !handshake.history_ids.is_empty() => "history",
        _ => "memory",
    }
}

fn join_ids(ids: &[i64]) -> String {
    format!("[{}]", ids.iter().join(", "))
}

fn message_fields(message: &MessageContent) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("direction", message.direction.to_string()),
        ("opcode", message.opcode.to_string()),
        ("length", message.payload.len().to_string()),
        ("occurrences", message.occurrences.len().to_string()),
    ];
    if let Some(first_seen) = message.first_seen() {
        fields.push(("first_seen", format_timestamp(first_seen)));
    }
    if let Payload::Binary(bytes) = &message.payload {
        if std::str::from_utf8(bytes).is_err() {
            fields.push(("payload", hex::encode(bytes)));
        }
    }
    fields
}

fn component_fields(content: &NodeContent) -> Vec<(&'static str, String)> {
    match content {
        NodeContent::Root | NodeContent::HandshakeFolder => Vec::new(),
        NodeContent::HostFolder(host) => vec![("channels", join_ids(&host.channels))],
        NodeContent::Handshake(handshake) => vec![
            ("uri", handshake.uri.clone()),
            ("channels", join_ids(&handshake.channels)),
            ("history", join_ids(&handshake.history_ids)),
        ],
        NodeContent::MessageFolder(folder) => match folder.kind {
            Some((direction, opcode)) => vec![("direction", direction.to_string()), ("opcode", opcode.to_string())],
            None => Vec::new(),
        },
        NodeContent::Message(message) => message_fields(message),
    }
}

fn write_node(view: &TreeView<'_>, id: NodeId, depth: usize, out: &mut String) {
    let content = view.tree.content(id);
    let pad = INDENT.repeat(depth * 2);
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}- node: {}", pad, view.name(id));
    let _ = writeln!(out, "{}{}storage: {}", pad, INDENT, storage(content));
    let _ = writeln!(out, "{}{}visited: {}", pad, INDENT, content.is_visited());
    let _ = writeln!(out, "{}{}type: {}", pad, INDENT, content.kind_name());
    for (key, value) in component_fields(content) {
        let _ = writeln!(out, "{}{}{}: {}", pad, INDENT, key, value);
    }

    let children = view.tree.children(id);
    if children.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}{}children:", pad, INDENT);
    for child in children {
        write_node(view, *child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::{ChannelDto, Direction, HandshakeMessage, MessageDto, Opcode, RecordedProxy};
    use crate::WebSocketTreeMap;

    #[test]
    fn timestamps_are_rfc3339() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_timestamp(1_500), "1970-01-01T00:00:01.5Z");
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }

    #[test]
    fn dump_layout() {
        let map = WebSocketTreeMap::default();
        map.create_tree();
        let mut handshake = HandshakeMessage::new("http://a.example/chat", false);
        handshake.history_id = Some(12);
        map.add_connection(&RecordedProxy::new(ChannelDto::new(3, "a.example", 80), handshake));
        let mut frame = MessageDto::new(3, 1, Opcode::Binary, Direction::Incoming, Payload::Binary(vec![0xde, 0xad]));
        frame.timestamp = 1_000;
        map.add_message(&frame);

        let dump = map.export();
        let expected = "\
- node: WebSockets
  storage: memory
  visited: false
  type: root
  children:
    - node: ws://a.example
      storage: memory
      visited: true
      type: host
      channels: [3]
      children:
        - node: Handshakes
          storage: memory
          visited: false
          type: handshake-folder
          children:
            - node: http://a.example/chat
              storage: history
              visited: true
              type: handshake
              uri: http://a.example/chat
              channels: [3]
              history: [12]
        - node: Messages
          storage: memory
          visited: false
          type: message-folder
          children:
            - node: unreadable binary
              storage: memory
              visited: true
              type: message
              direction: incoming
              opcode: BINARY
              length: 2
              occurrences: 1
              first_seen: 1970-01-01T00:00:01Z
              payload: dead
";
        assert_eq!(dump, expected);
    }
}
