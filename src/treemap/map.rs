//! The tree map orchestrator.
//!
//! Proxy threads call into the map concurrently. Every mutation and every read
//! runs under one map-wide lock; children lists are edited in place, so there
//! is no finer-grained locking. Node observers are called after the lock is
//! released, on the thread that caused the change.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};

use crate::analyzer::{AnalyzerManager, PayloadAnalyzer};
use crate::config::MapConfig;
use crate::treemap::export::export_tree;
use crate::treemap::factory::NodeFactory;
use crate::treemap::namer::{NodeNamer, SimpleNodeNamer};
use crate::treemap::node::{NodeId, Tree};
use crate::treemap::observer::{NodeEvent, NodeObserver, ObserverId, ObserverRegistry};
use crate::websocket::{MessageDto, ProxyHandle, ProxyState, WebSocketObserver};

/// Position of the tree map among the proxy's observers.
pub const TREE_MAP_OBSERVING_ORDER: i32 = 100;

/// Channel and message ids mapped to their tree positions.
#[derive(Debug, Default)]
struct RowMapper {
    channel_hosts: HashMap<i64, NodeId>,
    messages: HashMap<(i64, i64), NodeId>,
}

impl RowMapper {
    fn clear(&mut self) {
        self.channel_hosts.clear();
        self.messages.clear();
    }

    fn rebuild(&mut self, tree: &Tree) {
        self.clear();
        for host in tree.host_nodes() {
            for channel in tree.content(host).channels() {
                self.channel_hosts.insert(channel, host);
            }
            for message in tree.message_nodes(host) {
                if let Some(content) = tree.content(message).as_message() {
                    for occurrence in &content.occurrences {
                        self.messages.insert((occurrence.channel_id, occurrence.message_id), message);
                    }
                }
            }
        }
    }
}

struct MapState {
    tree: Option<Tree>,
    rows: RowMapper,
    analyzers: AnalyzerManager,
}

impl MapState {
    fn reset_analysis(&mut self) {
        if let Some(tree) = self.tree.as_mut() {
            tree.reset_analysis();
        }
    }
}

/// Read access to the tree together with the means to name its nodes.
pub struct TreeView<'a> {
    pub tree: &'a Tree,
    namer: &'a dyn NodeNamer,
    analyzers: &'a AnalyzerManager,
}

impl<'a> TreeView<'a> {
    pub fn name(&self, id: NodeId) -> String {
        self.namer.name(self.tree.content(id), self.analyzers)
    }

    /// Linear scan, names are not the sort key for every content type.
    pub fn find_child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.tree
            .children(parent)
            .iter()
            .copied()
            .find(|child| self.name(*child) == name)
    }

    pub fn child_names(&self, parent: NodeId) -> Vec<String> {
        self.tree.children(parent).iter().map(|child| self.name(*child)).collect()
    }
}

pub struct WebSocketTreeMap {
    state: Mutex<MapState>,
    observers: Mutex<ObserverRegistry>,
    namer: Box<dyn NodeNamer>,
    factory: NodeFactory,
}

impl Default for WebSocketTreeMap {
    fn default() -> Self {
        Self::new(&MapConfig::default())
    }
}

impl WebSocketTreeMap {
    pub fn new(config: &MapConfig) -> Self {
        Self::with_namer(config, Box::new(SimpleNodeNamer::new(config)))
    }

    pub fn with_namer(config: &MapConfig, namer: Box<dyn NodeNamer>) -> Self {
        WebSocketTreeMap {
            state: Mutex::new(MapState {
                tree: None,
                rows: RowMapper::default(),
                analyzers: AnalyzerManager::from_names(&config.analyzers),
            }),
            observers: Mutex::new(ObserverRegistry::default()),
            namer,
            factory: NodeFactory::new(config.message_grouping),
        }
    }

    // A thread that panicked mid-update leaves the tree usable; keep serving it.
    fn lock_state(&self) -> MutexGuard<'_, MapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_observers(&self) -> MutexGuard<'_, ObserverRegistry> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_tree(&self) {
        let mut state = self.lock_state();
        if state.tree.is_some() {
            debug!("WebSocket tree already created");
            return;
        }
        state.tree = Some(Tree::new());
        info!("WebSocket tree created");
    }

    pub fn is_active(&self) -> bool {
        self.lock_state().tree.is_some()
    }

    /// Wipe the tree back to its root. Observers and analyzers are kept.
    pub fn clear(&self) {
        let mut state = self.lock_state();
        if let Some(tree) = state.tree.as_mut() {
            tree.clear();
        }
        state.rows.clear();
        info!("WebSocket tree cleared");
    }

    /// Rebuild the channel and message registry from the tree contents.
    pub fn reset_row_mapper(&self) {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        match state.tree.as_ref() {
            Some(tree) => state.rows.rebuild(tree),
            None => state.rows.clear(),
        }
        debug!(
            "Row mapper rebuilt: {} channels, {} messages",
            state.rows.channel_hosts.len(),
            state.rows.messages.len()
        );
    }

    pub fn add_node_observer(&self, observer: Arc<dyn NodeObserver>) -> ObserverId {
        self.lock_observers().add(observer)
    }

    pub fn remove_node_observer(&self, id: ObserverId) -> bool {
        self.lock_observers().remove(id)
    }

    pub fn node_observer_count(&self) -> usize {
        self.lock_observers().len()
    }

    /// Cached analyses are dropped so equal payloads keep equal names.
    pub fn add_analyzer(&self, analyzer: Box<dyn PayloadAnalyzer>) -> bool {
        let mut state = self.lock_state();
        let added = state.analyzers.add(analyzer);
        if added {
            state.reset_analysis();
        }
        added
    }

    pub fn remove_analyzer(&self, name: &str) -> bool {
        let mut state = self.lock_state();
        let removed = state.analyzers.remove(name);
        if removed {
            state.reset_analysis();
        }
        removed
    }

    pub fn analyzer_names(&self) -> Vec<&'static str> {
        self.lock_state().analyzers.names()
    }

    /// Place the channel behind `proxy` and return its handshake node.
    ///
    /// Handshake resolution failures are logged and leave the tree unchanged.
    pub fn add_connection(&self, proxy: &dyn ProxyHandle) -> Option<NodeId> {
        let channel = proxy.channel();
        let handshake = match proxy.handshake() {
            Ok(handshake) => handshake,
            Err(e) => {
                error!("Failed to resolve handshake of channel #{}: {}", channel.id, e);
                return None;
            }
        };
        let chain = match self.factory.connection_chain(&channel, &handshake) {
            Ok(chain) => chain,
            Err(e) => {
                error!("Failed to place channel #{}: {}", channel.id, e);
                return None;
            }
        };

        let watched = self.is_watched();
        let (handshake_node, events) = {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            let tree = match state.tree.as_mut() {
                Some(tree) => tree,
                None => {
                    warn!("Channel #{} observed before the WebSocket tree was created", channel.id);
                    return None;
                }
            };

            let mut created = Vec::new();
            let (host, new) = tree.add_child(Tree::ROOT, chain.host);
            if new {
                created.push(host);
            }
            let (folder, new) = tree.add_child(host, chain.handshake_folder);
            if new {
                created.push(folder);
            }
            let (handshake_node, new) = tree.add_child(folder, chain.handshake);
            if new {
                created.push(handshake_node);
            }
            state.rows.channel_hosts.insert(channel.id, host);

            let events = if watched {
                self.events(tree, &state.analyzers, &created)
            } else {
                Vec::new()
            };
            (handshake_node, events)
        };

        debug!("Channel #{} placed at {}", channel.id, handshake_node);
        self.notify(&events);
        Some(handshake_node)
    }

    /// Place a frame below its channel's host and return the message node.
    ///
    /// Frames of channels with no host node are logged and dropped.
    pub fn add_message(&self, message: &MessageDto) -> Option<NodeId> {
        let watched = self.is_watched();
        let (leaf, events) = {
            let mut guard = self.lock_state();
            let state = &mut *guard;
            let tree = match state.tree.as_mut() {
                Some(tree) => tree,
                None => {
                    warn!("Message #{} observed before the WebSocket tree was created", message.message_id);
                    return None;
                }
            };
            let host = match state.rows.channel_hosts.get(&message.channel_id) {
                Some(host) => *host,
                None => {
                    error!(
                        "No host node for channel #{}, dropping message #{}",
                        message.channel_id, message.message_id
                    );
                    return None;
                }
            };

            let mut created = Vec::new();
            let (folder, new) = tree.add_child(host, self.factory.message_folder(message));
            if new {
                created.push(folder);
            }
            let (leaf, new) = tree.add_child(folder, self.factory.message_content(message));
            if new {
                created.push(leaf);
            }
            state.rows.messages.insert((message.channel_id, message.message_id), leaf);

            let events = if watched {
                self.events(tree, &state.analyzers, &created)
            } else {
                Vec::new()
            };
            (leaf, events)
        };

        self.notify(&events);
        Some(leaf)
    }

    /// Node holding the given message, if it was placed.
    pub fn message_node(&self, channel_id: i64, message_id: i64) -> Option<NodeId> {
        self.lock_state().rows.messages.get(&(channel_id, message_id)).copied()
    }

    pub fn host_node_of_channel(&self, channel_id: i64) -> Option<NodeId> {
        self.lock_state().rows.channel_hosts.get(&channel_id).copied()
    }

    // Building events names nodes, which analyses message payloads.
    fn is_watched(&self) -> bool {
        !self.lock_observers().is_empty()
    }

    fn events(&self, tree: &Tree, analyzers: &AnalyzerManager, created: &[NodeId]) -> Vec<NodeEvent> {
        created
            .iter()
            .map(|id| NodeEvent {
                node: *id,
                parent: tree.parent(*id),
                index: tree.index_of(*id).unwrap_or(0),
                name: self.namer.name(tree.content(*id), analyzers),
                kind: tree.content(*id).kind_name(),
            })
            .collect()
    }

    fn notify(&self, events: &[NodeEvent]) {
        if events.is_empty() {
            return;
        }
        let observers = self.lock_observers().snapshot();
        for observer in observers {
            match events {
                [single] => observer.node_added(single),
                batch => observer.nodes_added(batch),
            }
        }
    }

    /// Run `f` against the tree under the map lock; `None` before `create_tree`.
    pub fn with_tree<R>(&self, f: impl FnOnce(&TreeView<'_>) -> R) -> Option<R> {
        let state = self.lock_state();
        let tree = state.tree.as_ref()?;
        let view = TreeView {
            tree,
            namer: self.namer.as_ref(),
            analyzers: &state.analyzers,
        };
        Some(f(&view))
    }

    pub fn host_count(&self) -> usize {
        self.with_tree(|view| view.tree.host_nodes().len()).unwrap_or(0)
    }

    pub fn host_names(&self) -> Vec<String> {
        self.with_tree(|view| view.child_names(Tree::ROOT)).unwrap_or_default()
    }

    /// Message leaf names grouped by host name.
    pub fn messages_per_host(&self) -> BTreeMap<String, Vec<String>> {
        self.with_tree(|view| {
            view.tree
                .messages_per_host()
                .into_iter()
                .map(|(host, messages)| {
                    let names = messages.into_iter().map(|id| view.name(id)).collect();
                    (view.name(host), names)
                })
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn channels_per_host(&self) -> BTreeMap<String, Vec<i64>> {
        self.with_tree(|view| {
            view.tree
                .channels_per_host()
                .into_iter()
                .map(|(host, channels)| (view.name(host), channels))
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn export(&self) -> String {
        self.with_tree(export_tree).unwrap_or_default()
    }
}

impl WebSocketObserver for WebSocketTreeMap {
    fn observing_order(&self) -> i32 {
        TREE_MAP_OBSERVING_ORDER
    }

    fn on_message_frame(&self, channel_id: i64, message: &MessageDto) -> bool {
        if channel_id != message.channel_id {
            debug!(
                "Frame reported for channel #{} carries channel #{}",
                channel_id, message.channel_id
            );
        }
        self.add_message(message);
        true
    }

    fn on_state_change(&self, state: ProxyState, proxy: &dyn ProxyHandle) {
        if state == ProxyState::Connecting {
            self.add_connection(proxy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MessageGrouping;
    use crate::treemap::observer::ChannelNodeObserver;
    use crate::websocket::{ChannelDto, Direction, HandshakeMessage, Opcode, Payload, RecordedProxy};
    use std::thread;

    fn proxy(id: i64, host: &str, port: i32, uri: &str) -> RecordedProxy {
        RecordedProxy::new(ChannelDto::new(id, host, port), HandshakeMessage::new(uri, false))
    }

    fn active_map() -> WebSocketTreeMap {
        let map = WebSocketTreeMap::default();
        map.create_tree();
        map
    }

    #[test]
    fn end_to_end_single_message() {
        let map = active_map();
        map.add_connection(&proxy(1, "www.example.com", 80, "http://www.example.com:80"))
            .unwrap();
        map.add_message(&MessageDto::text(1, 1, Direction::Outgoing, "Example Payload"))
            .unwrap();

        assert_eq!(map.host_names(), vec!["ws://www.example.com"]);
        map.with_tree(|view| {
            let host = view.tree.host_nodes()[0];
            let messages = view.find_child_by_name(host, "Messages").unwrap();
            assert_eq!(view.child_names(messages), vec!["Example Payload"]);
            view.tree.assert_sorted();
        })
        .unwrap();
    }

    #[test]
    fn equivalent_hosts_share_one_node() {
        let map = active_map();
        map.add_connection(&proxy(1, "example.com", 443, "https://example.com")).unwrap();
        map.add_connection(&proxy(2, "example.com", 443, "https://example.com:443")).unwrap();

        assert_eq!(map.host_count(), 1);
        assert_eq!(map.channels_per_host()["wss://example.com"], vec![1, 2]);
        assert_eq!(map.host_node_of_channel(1), map.host_node_of_channel(2));
    }

    #[test]
    fn message_without_host_is_dropped() {
        let map = active_map();
        map.add_connection(&proxy(1, "a.example", 80, "http://a.example/")).unwrap();
        let before = map.host_count();

        assert_eq!(map.add_message(&MessageDto::text(42, 1, Direction::Incoming, "lost")), None);
        assert_eq!(map.host_count(), before);
        assert!(map.messages_per_host()["ws://a.example"].is_empty());
    }

    #[test]
    fn opposite_directions_get_distinct_nodes() {
        let map = active_map();
        map.add_connection(&proxy(1, "a.example", 80, "http://a.example/")).unwrap();
        let out = map.add_message(&MessageDto::text(1, 1, Direction::Outgoing, "same")).unwrap();
        let inc = map.add_message(&MessageDto::text(1, 2, Direction::Incoming, "same")).unwrap();
        let again = map.add_message(&MessageDto::text(1, 3, Direction::Outgoing, "same")).unwrap();

        assert_ne!(out, inc);
        assert_eq!(out, again);
        assert_eq!(map.message_node(1, 3), Some(out));
        assert_eq!(map.messages_per_host()["ws://a.example"].len(), 2);
    }

    #[test]
    fn unresolvable_handshake_leaves_tree_unchanged() {
        let map = active_map();
        let broken = RecordedProxy::unresolvable(ChannelDto::new(5, "a.example", 80), "history reference missing");
        assert_eq!(map.add_connection(&broken), None);
        assert_eq!(map.with_tree(|view| view.tree.len()), Some(1));
        assert_eq!(map.host_node_of_channel(5), None);
    }

    #[test]
    fn uninitialised_map_ignores_events() {
        let map = WebSocketTreeMap::default();
        assert!(!map.is_active());
        assert_eq!(map.add_connection(&proxy(1, "a.example", 80, "http://a.example/")), None);
        assert_eq!(map.add_message(&MessageDto::text(1, 1, Direction::Outgoing, "x")), None);
        assert_eq!(map.export(), "");
    }

    #[test]
    fn observers_receive_batches_of_new_nodes() {
        let map = active_map();
        let (observer, receiver) = ChannelNodeObserver::unbounded();
        let id = map.add_node_observer(Arc::new(observer));

        map.add_connection(&proxy(1, "a.example", 80, "http://a.example/chat")).unwrap();
        let batch = receiver.try_recv().unwrap();
        let kinds: Vec<_> = batch.iter().map(|event| event.kind).collect();
        assert_eq!(kinds, vec!["host", "handshake-folder", "handshake"]);
        assert_eq!(batch[0].parent, Some(Tree::ROOT));
        assert_eq!(batch[2].name, "http://a.example/chat");

        // Second channel to the same handshake creates nothing.
        map.add_connection(&proxy(2, "a.example", 80, "http://a.example/chat")).unwrap();
        assert!(receiver.try_recv().is_err());

        map.add_message(&MessageDto::text(1, 1, Direction::Outgoing, "[1,2]")).unwrap();
        let batch = receiver.try_recv().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].name, "[1, 2]");

        map.add_message(&MessageDto::text(2, 2, Direction::Outgoing, "other")).unwrap();
        let batch = receiver.try_recv().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].index, 1);

        assert!(map.remove_node_observer(id));
        map.add_message(&MessageDto::text(1, 3, Direction::Incoming, "late")).unwrap();
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn clear_keeps_observers_and_analyzers() {
        let map = active_map();
        let (observer, receiver) = ChannelNodeObserver::unbounded();
        map.add_node_observer(Arc::new(observer));
        map.add_connection(&proxy(1, "a.example", 80, "http://a.example/")).unwrap();
        map.clear();

        assert!(map.is_active());
        assert_eq!(map.host_count(), 0);
        assert_eq!(map.node_observer_count(), 1);
        assert_eq!(map.analyzer_names(), vec!["json"]);
        assert_eq!(map.add_message(&MessageDto::text(1, 1, Direction::Outgoing, "x")), None);

        receiver.try_recv().unwrap();
        map.add_connection(&proxy(1, "a.example", 80, "http://a.example/")).unwrap();
        assert_eq!(receiver.try_recv().unwrap().len(), 3);
    }

    #[test]
    fn row_mapper_is_rebuilt_from_contents() {
        let map = active_map();
        map.add_connection(&proxy(1, "a.example", 80, "http://a.example/")).unwrap();
        map.add_connection(&proxy(2, "b.example", 8080, "http://b.example:8080/")).unwrap();
        let leaf = map.add_message(&MessageDto::text(2, 7, Direction::Incoming, "hello")).unwrap();

        map.reset_row_mapper();
        assert_eq!(map.message_node(2, 7), Some(leaf));
        let host = map.host_node_of_channel(2).unwrap();
        assert_eq!(map.with_tree(|view| view.name(host)).unwrap(), "ws://b.example:8080");
        assert!(map.add_message(&MessageDto::text(1, 8, Direction::Outgoing, "again")).is_some());
    }

    #[test]
    fn by_kind_grouping_creates_folders_lazily() {
        let config = MapConfig {
            message_grouping: MessageGrouping::ByKind,
            ..MapConfig::default()
        };
        let map = WebSocketTreeMap::new(&config);
        map.create_tree();
        map.add_connection(&proxy(1, "a.example", 80, "http://a.example/")).unwrap();
        map.add_message(&MessageDto::text(1, 1, Direction::Outgoing, "x")).unwrap();
        map.add_message(&MessageDto::new(1, 2, Opcode::Binary, Direction::Incoming, Payload::Binary(vec![0xff])))
            .unwrap();
        map.add_message(&MessageDto::text(1, 3, Direction::Outgoing, "y")).unwrap();

        let names = map
            .with_tree(|view| {
                let host = view.tree.host_nodes()[0];
                view.child_names(host)
            })
            .unwrap();
        assert_eq!(
            names,
            vec!["Handshakes", "Messages (outgoing TEXT)", "Messages (incoming BINARY)"]
        );
        assert_eq!(
            map.messages_per_host()["ws://a.example"],
            vec!["x", "y", "unreadable binary"]
        );
    }

    #[test]
    fn removing_the_json_analyzer_changes_names() {
        let map = active_map();
        map.add_connection(&proxy(1, "a.example", 80, "http://a.example/")).unwrap();
        map.add_message(&MessageDto::text(1, 1, Direction::Outgoing, "{\"a\": 1}")).unwrap();
        assert_eq!(map.messages_per_host()["ws://a.example"], vec!["{a: 1}"]);

        assert!(map.remove_analyzer("json"));
        assert!(!map.remove_analyzer("json"));
        assert_eq!(map.messages_per_host()["ws://a.example"], vec!["{\"a\": 1}"]);
        assert!(map.add_analyzer(Box::new(crate::analyzer::JsonAnalyzer)));
        assert_eq!(map.analyzer_names(), vec!["json"]);
    }

    #[test]
    fn analyzer_added_later_renames_existing_messages() {
        let config = MapConfig {
            analyzers: Vec::new(),
            ..MapConfig::default()
        };
        let map = WebSocketTreeMap::new(&config);
        map.create_tree();
        map.add_connection(&proxy(1, "a.example", 80, "http://a.example/")).unwrap();
        map.add_message(&MessageDto::text(1, 1, Direction::Outgoing, "{\"k\":\"v\"}")).unwrap();
        assert_eq!(map.messages_per_host()["ws://a.example"], vec!["{\"k\":\"v\"}"]);

        assert!(map.add_analyzer(Box::new(crate::analyzer::JsonAnalyzer)));
        map.add_connection(&proxy(2, "b.example", 80, "http://b.example/")).unwrap();
        map.add_message(&MessageDto::text(2, 1, Direction::Outgoing, "{\"k\":\"v\"}")).unwrap();

        let names = map.messages_per_host();
        assert_eq!(names["ws://a.example"], vec!["{k: v}"]);
        assert_eq!(names["ws://a.example"], names["ws://b.example"]);
    }

    #[test]
    fn unobserved_messages_are_analysed_on_first_name_request() {
        let map = active_map();
        map.add_connection(&proxy(1, "a.example", 80, "http://a.example/")).unwrap();
        let leaf = map.add_message(&MessageDto::text(1, 1, Direction::Outgoing, "[1,2]")).unwrap();

        let analyzed = |map: &WebSocketTreeMap| {
            map.with_tree(|view| view.tree.content(leaf).as_message().unwrap().is_analyzed())
                .unwrap()
        };
        assert!(!analyzed(&map));
        assert_eq!(map.messages_per_host()["ws://a.example"], vec!["[1, 2]"]);
        assert!(analyzed(&map));
    }

    #[test]
    fn event_index_matches_position_after_the_mutation() {
        let map = active_map();
        let (observer, receiver) = ChannelNodeObserver::unbounded();
        map.add_node_observer(Arc::new(observer));
        map.add_connection(&proxy(1, "a.example", 80, "http://a.example/")).unwrap();
        map.add_message(&MessageDto::text(1, 1, Direction::Outgoing, "b")).unwrap();
        map.add_message(&MessageDto::text(1, 2, Direction::Outgoing, "a")).unwrap();

        let events: Vec<_> = receiver.try_iter().flatten().collect();
        let last = events.last().unwrap();
        assert_eq!(last.index, 0);
        // Later inserts shift siblings; the live position comes from the tree.
        let first_leaf = events.iter().find(|event| event.name == "b").unwrap();
        assert_eq!(first_leaf.index, 0);
        assert_eq!(map.with_tree(|view| view.tree.index_of(first_leaf.node)).unwrap(), Some(1));
    }

    #[test]
    fn state_changes_other_than_connecting_are_ignored() {
        let map = active_map();
        let handle = proxy(1, "a.example", 80, "http://a.example/");
        map.on_state_change(ProxyState::Open, &handle);
        assert_eq!(map.host_count(), 0);
        map.on_state_change(ProxyState::Connecting, &handle);
        assert_eq!(map.host_count(), 1);
        assert!(map.on_message_frame(99, &MessageDto::text(99, 1, Direction::Outgoing, "x")));
    }

    #[test]
    fn concurrent_events_keep_the_tree_sorted() {
        let map = Arc::new(active_map());
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let map = Arc::clone(&map);
                thread::spawn(move || {
                    let channel = worker as i64;
                    let host = format!("h{}.example", worker % 3);
                    let uri = format!("http://{}/socket", host);
                    map.add_connection(&proxy(channel, &host, 80, &uri)).unwrap();
                    for i in 0..50 {
                        let direction = if i % 2 == 0 { Direction::Outgoing } else { Direction::Incoming };
                        let text = format!("msg-{}", i % 10);
                        map.add_message(&MessageDto::text(channel, i, direction, &text)).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(map.host_count(), 3);
        for names in map.messages_per_host().values() {
            assert_eq!(names.len(), 10);
        }
        map.with_tree(|view| view.tree.assert_sorted()).unwrap();
    }
}
