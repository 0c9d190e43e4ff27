//! Replay of recorded proxy captures.
//!
//! A capture is a JSON-lines file, one [`CaptureEvent`] per line. Events are
//! fed to a [`WebSocketObserver`] exactly as the live proxy would report them.

use std::collections::HashMap;
use std::fmt::Write;
use std::io::BufRead;

use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::treemap::WebSocketTreeMap;
use crate::websocket::{ChannelDto, HandshakeMessage, MessageDto, ProxyState, RecordedProxy, WebSocketObserver};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CaptureEvent {
    /// A channel starts connecting.
    Connection {
        channel: ChannelDto,
        #[serde(default)]
        handshake: Option<HandshakeMessage>,
        /// Why the handshake could not be recovered, when it could not.
        #[serde(default)]
        handshake_error: Option<String>,
    },
    State {
        channel_id: i64,
        state: ProxyState,
    },
    Frame {
        message: MessageDto,
    },
}

impl CaptureEvent {
    /// Parse one capture line; `None` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(line)?))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub lines: usize,
    pub events: usize,
    pub skipped: usize,
}

pub struct Replay<'a> {
    observer: &'a dyn WebSocketObserver,
    proxies: HashMap<i64, RecordedProxy>,
    stats: ReplayStats,
}

impl<'a> Replay<'a> {
    pub fn new(observer: &'a dyn WebSocketObserver) -> Self {
        Replay {
            observer,
            proxies: HashMap::new(),
            stats: ReplayStats::default(),
        }
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    pub fn apply(&mut self, event: CaptureEvent) {
        self.stats.events += 1;
        match event {
            CaptureEvent::Connection {
                channel,
                handshake,
                handshake_error,
            } => {
                let proxy = match (handshake, handshake_error) {
                    (Some(handshake), None) => RecordedProxy::new(channel, handshake),
                    (_, Some(reason)) => RecordedProxy::unresolvable(channel, &reason),
                    (None, None) => RecordedProxy::unresolvable(channel, "no handshake recorded"),
                };
                self.observer.on_state_change(ProxyState::Connecting, &proxy);
                self.proxies.insert(proxy.channel.id, proxy);
            }
            CaptureEvent::State { channel_id, state } => match self.proxies.get(&channel_id) {
                Some(proxy) => self.observer.on_state_change(state, proxy),
                None => warn!("State {} for unknown channel #{}", state, channel_id),
            },
            CaptureEvent::Frame { message } => {
                self.observer.on_message_frame(message.channel_id, &message);
            }
        }
    }

    /// Replay every line of `reader`. Malformed lines are logged and skipped;
    /// read errors abort the replay.
    pub fn replay_reader<R: BufRead>(&mut self, reader: R) -> Result<ReplayStats> {
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            self.stats.lines += 1;
            match CaptureEvent::parse(&line) {
                Ok(Some(event)) => self.apply(event),
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping capture line {}: {}", index + 1, e);
                    self.stats.skipped += 1;
                }
            }
        }
        debug!(
            "Replayed {} events from {} lines ({} skipped)",
            self.stats.events, self.stats.lines, self.stats.skipped
        );
        Ok(self.stats)
    }
}

/// One line per host: name, channels and number of distinct messages.
pub fn summary(map: &WebSocketTreeMap) -> String {
    let channels = map.channels_per_host();
    let messages = map.messages_per_host();
    let mut out = String::new();
    for (host, channels) in &channels {
        let count = messages.get(host).map_or(0, Vec::len);
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{}  channels: [{}]  messages: {}",
            host,
            channels.iter().join(", "),
            count
        );
    }
    out
}
