//! Incremental tree map of WebSocket traffic.
//!
//! The proxy layer reports connection state changes and frames through
//! [`websocket::WebSocketObserver`]; [`treemap::WebSocketTreeMap`] turns them
//! into a sorted tree of hosts, handshakes and messages and tells registered
//! [`treemap::NodeObserver`]s about every node it creates.

pub mod analyzer;
pub mod config;
pub mod data;
pub mod error;
pub mod replay;
pub mod treemap;
pub mod websocket;

pub use config::{MapConfig, MessageGrouping};
pub use error::{Error, Result};
pub use treemap::{NodeEvent, NodeId, NodeObserver, Tree, WebSocketTreeMap};
