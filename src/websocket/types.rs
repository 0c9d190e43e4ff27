use std::fmt;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use crate::data::opcodes::{get_opcode_name, is_control_opcode};

// WebSocket frame opcodes (RFC 6455, section 5.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl Opcode {
    /// Recognize an opcode from the low nibble of a frame header.
    pub fn from_raw(value: u8) -> Option<Self> {
        Opcode::from_u8(value)
    }

    pub fn as_raw(self) -> u8 {
        self as u8
    }

    pub fn is_control(self) -> bool {
        is_control_opcode(self.as_raw())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match get_opcode_name(self.as_raw()) {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "0x{:X}", self.as_raw()),
        }
    }
}

// Frame direction as seen by the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client to server
    Outgoing,
    /// Server to client
    Incoming,
}

/// WebSocket communication state of a proxied channel.
///
/// `Excluded` and `Included` are never a channel's own state; the proxy uses
/// them to tell observers a channel was added to or removed from an ignore list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProxyState {
    Connecting,
    Open,
    Closing,
    Closed,
    Excluded,
    Included,
}

/// Payload of a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// UTF-8 view of the payload; `None` for binary data that is not valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(data) => std::str::from_utf8(data).ok(),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn opcode_from_raw_rejects_reserved_values() {
        assert_eq!(Opcode::from_raw(0x1), Some(Opcode::Text));
        assert_eq!(Opcode::from_raw(0xA), Some(Opcode::Pong));
        assert_eq!(Opcode::from_raw(0x3), None);
        assert_eq!(Opcode::from_raw(0xB), None);
    }

    #[test]
    fn opcode_display_uses_upper_case_names() {
        assert_eq!(Opcode::Text.to_string(), "TEXT");
        assert_eq!(Opcode::Ping.to_string(), "PING");
        assert!(Opcode::Close.is_control());
        assert!(!Opcode::Binary.is_control());
    }

    #[test]
    fn direction_orders_outgoing_first() {
        assert!(Direction::Outgoing < Direction::Incoming);
        assert_eq!(Direction::from_str("incoming").unwrap(), Direction::Incoming);
        assert_eq!(Direction::Outgoing.to_string(), "outgoing");
    }

    #[test]
    fn binary_payload_text_view() {
        assert_eq!(Payload::Binary(b"abc".to_vec()).as_text(), Some("abc"));
        assert_eq!(Payload::Binary(vec![0xff, 0xfe]).as_text(), None);
        assert_eq!(Payload::from("héllo").len(), 6);
    }
}
