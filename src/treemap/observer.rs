use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use log::debug;
use serde::Serialize;

use crate::treemap::node::NodeId;

/// A node created by the tree map, as it was at insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeEvent {
    pub node: NodeId,
    pub parent: Option<NodeId>,
    /// Position among the parent's children right after insertion.
    ///
    /// Advisory only: observers run outside the map lock, so batches from
    /// different threads can arrive out of order and later inserts shift
    /// siblings. Resolve the current position from `node` and `parent`
    /// (`Tree::index_of`) when it matters.
    pub index: usize,
    pub name: String,
    pub kind: &'static str,
}

/// Receives notifications about newly created nodes.
///
/// Notifications are delivered synchronously on the thread that mutated the
/// tree, after the tree lock has been released.
pub trait NodeObserver: Send + Sync {
    fn node_added(&self, event: &NodeEvent);

    fn nodes_added(&self, events: &[NodeEvent]) {
        for event in events {
            self.node_added(event);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Observer table with explicit registration and removal.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(ObserverId, Arc<dyn NodeObserver>)>,
}

impl ObserverRegistry {
    pub fn add(&mut self, observer: Arc<dyn NodeObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Copy of the current observers, so callbacks can run without the registry lock.
    pub fn snapshot(&self) -> Vec<Arc<dyn NodeObserver>> {
        self.observers.iter().map(|(_, observer)| observer.clone()).collect()
    }
}

/// Forwards node batches over a channel to a consumer on another thread.
#[derive(Debug, Clone)]
pub struct ChannelNodeObserver {
    sender: Sender<Vec<NodeEvent>>,
}

impl ChannelNodeObserver {
    pub fn new(sender: Sender<Vec<NodeEvent>>) -> Self {
        ChannelNodeObserver { sender }
    }

    /// Observer plus the receiving end of an unbounded channel.
    pub fn unbounded() -> (Self, Receiver<Vec<NodeEvent>>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self::new(sender), receiver)
    }
}

impl NodeObserver for ChannelNodeObserver {
    fn node_added(&self, event: &NodeEvent) {
        self.nodes_added(std::slice::from_ref(event));
    }

    fn nodes_added(&self, events: &[NodeEvent]) {
        if self.sender.send(events.to_vec()).is_err() {
            debug!("Node event receiver disconnected, dropping {} events", events.len());
        }
    }
}
