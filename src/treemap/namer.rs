//! Host name canonicalisation and node display names.

use url::Url;

use crate::analyzer::AnalyzerManager;
use crate::config::MapConfig;
use crate::data::schemes::{default_port, has_scheme, SECURE_PORT};
use crate::error::{Error, Result};
use crate::treemap::content::{MessageContent, NodeContent};

pub const ROOT_NAME: &str = "WebSockets";

/// Canonical host key `scheme://host[:port]`.
///
/// The scheme is `wss` for TLS connections and for port 443, `ws` otherwise.
/// The port is left out when it is the scheme default or unspecified (`<= 0`).
pub fn websocket_host_name(secure: bool, host: &str, port: i32) -> String {
    let scheme = if secure || port == i32::from(SECURE_PORT) { "wss" } else { "ws" };
    let host = host.to_ascii_lowercase();
    let default = default_port(scheme).map(i32::from);
    if port <= 0 || Some(port) == default {
        format!("{}://{}", scheme, host)
    } else {
        format!("{}://{}:{}", scheme, host, port)
    }
}

/// Parse a request URI, defaulting a missing scheme to `http`.
pub fn normalize_uri(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let with_scheme = if has_scheme(raw) {
        raw.to_string()
    } else if raw.starts_with("//") {
        format!("http:{}", raw)
    } else {
        format!("http://{}", raw)
    };
    let url = Url::parse(&with_scheme).map_err(|source| Error::InvalidUri {
        uri: raw.to_string(),
        source,
    })?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::MissingHost(raw.to_string()));
    }
    Ok(url)
}

/// `scheme://host[:port]path` of a handshake, default ports omitted.
pub fn handshake_key(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::MissingHost(url.to_string()))?;
    let port = match url.port() {
        Some(port) if Some(port) != default_port(url.scheme()) => format!(":{}", port),
        _ => String::new(),
    };
    let path = if url.path().is_empty() { "/" } else { url.path() };
    Ok(format!("{}://{}{}{}", url.scheme(), host, port, path))
}

/// Strategy producing display names for node contents.
pub trait NodeNamer: Send + Sync {
    fn name(&self, content: &NodeContent, analyzers: &AnalyzerManager) -> String;
}

#[derive(Debug, Clone)]
pub struct SimpleNodeNamer {
    handshake_folder_name: String,
    message_folder_name: String,
    unreadable_placeholder: String,
    max_leaf_name_length: usize,
}

impl Default for SimpleNodeNamer {
    fn default() -> Self {
        Self::new(&MapConfig::default())
    }
}

impl SimpleNodeNamer {
    pub fn new(config: &MapConfig) -> Self {
        SimpleNodeNamer {
            handshake_folder_name: config.handshake_folder_name.clone(),
            message_folder_name: config.message_folder_name.clone(),
            unreadable_placeholder: config.unreadable_placeholder.clone(),
            max_leaf_name_length: config.max_leaf_name_length,
        }
    }

    fn message_name(&self, message: &MessageContent, analyzers: &AnalyzerManager) -> String {
        if message.payload.is_empty() {
            return format!("[{}]", message.opcode);
        }
        let name = match message.analyzed(analyzers) {
            Some(analyzed) => analyzers.leaf_name(analyzed),
            None => None,
        };
        let name = match name {
            Some(name) => name,
            None => match message.payload.as_text() {
                Some(text) => text.to_string(),
                None => return self.unreadable_placeholder.clone(),
            },
        };
        self.truncate(name)
    }

    fn truncate(&self, name: String) -> String {
        if self.max_leaf_name_length == 0 || name.chars().count() <= self.max_leaf_name_length {
            return name;
        }
        let mut short: String = name.chars().take(self.max_leaf_name_length).collect();
        short.push_str("...");
        short
    }
}

impl NodeNamer for SimpleNodeNamer {
    fn name(&self, content: &NodeContent, analyzers: &AnalyzerManager) -> String {
        match content {
            NodeContent::Root => ROOT_NAME.to_string(),
            NodeContent::HostFolder(host) => host.host_name.clone(),
            NodeContent::HandshakeFolder => self.handshake_folder_name.clone(),
            NodeContent::Handshake(handshake) => handshake.uri.clone(),
            NodeContent::MessageFolder(folder) => match folder.kind {
                None => self.message_folder_name.clone(),
                Some((direction, opcode)) => {
                    format!("{} ({} {})", self.message_folder_name, direction, opcode)
                }
            },
            NodeContent::Message(message) => self.message_name(message, analyzers),
        }
    }
}
