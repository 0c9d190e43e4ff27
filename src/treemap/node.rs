//! Ordered n-ary tree stored in an arena.
//!
//! Nodes are addressed by [`NodeId`]; a node's parent is an index rather than
//! a pointer, and a node lives as long as its parent lists it. Children are
//! kept sorted by content at all times.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::treemap::content::{MessageRef, NodeContent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub content: NodeContent,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    /// Nodes reachable from the root.
    attached: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Tree {
            nodes: vec![TreeNode {
                content: NodeContent::Root,
                parent: None,
                children: Vec::new(),
            }],
            attached: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    /// Number of nodes reachable from the root, root included.
    pub fn len(&self) -> usize {
        self.attached
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn content(&self, id: NodeId) -> &NodeContent {
        &self.nodes[id.0].content
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    fn search(&self, parent: NodeId, content: &NodeContent) -> std::result::Result<usize, usize> {
        self.nodes[parent.0]
            .children
            .binary_search_by(|child| self.nodes[child.0].content.cmp(content))
    }

    /// Insert `content` below `parent`, or merge it into an equal sibling.
    ///
    /// Returns the resolved node and whether it was created.
    pub fn add_child(&mut self, parent: NodeId, content: NodeContent) -> (NodeId, bool) {
        match self.search(parent, &content) {
            Ok(pos) => {
                let existing = self.nodes[parent.0].children[pos];
                self.nodes[existing.0].content.merge(content);
                (existing, false)
            }
            Err(pos) => {
                let id = NodeId(self.nodes.len());
                self.nodes.push(TreeNode {
                    content,
                    parent: Some(parent),
                    children: Vec::new(),
                });
                self.nodes[parent.0].children.insert(pos, id);
                self.attached += 1;
                (id, true)
            }
        }
    }

    pub fn find_child(&self, parent: NodeId, content: &NodeContent) -> Option<NodeId> {
        self.search(parent, content)
            .ok()
            .map(|pos| self.nodes[parent.0].children[pos])
    }

    pub fn child_at(&self, parent: NodeId, pos: usize) -> Result<NodeId> {
        let children = &self.nodes[parent.0].children;
        children.get(pos).copied().ok_or(Error::ChildIndexOutOfRange {
            index: pos,
            len: children.len(),
        })
    }

    /// Detach the child at `pos` together with its subtree.
    pub fn remove_child_at(&mut self, parent: NodeId, pos: usize) -> Result<NodeId> {
        let len = self.nodes[parent.0].children.len();
        if pos >= len {
            return Err(Error::ChildIndexOutOfRange { index: pos, len });
        }
        let removed = self.nodes[parent.0].children.remove(pos);
        self.nodes[removed.0].parent = None;
        self.attached -= self.subtree_size(removed);
        Ok(removed)
    }

    fn subtree_size(&self, id: NodeId) -> usize {
        1 + self.nodes[id.0]
            .children
            .iter()
            .map(|child| self.subtree_size(*child))
            .sum::<usize>()
    }

    /// Position of `id` among its siblings.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.nodes[id.0].parent?;
        self.nodes[parent.0].children.iter().position(|child| *child == id)
    }

    /// Same parent and equal content: the same logical entity.
    pub fn same_entity(&self, a: NodeId, b: NodeId) -> bool {
        self.nodes[a.0].parent == self.nodes[b.0].parent && self.nodes[a.0].content == self.nodes[b.0].content
    }

    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Depth-first over the leaves below `start`, collecting non-`None` results of `f`.
    pub fn iterate_over_leaf<T, F>(&self, start: NodeId, f: &mut F, acc: &mut Vec<T>)
    where
        F: FnMut(&Tree, NodeId) -> Option<T>,
    {
        let node = &self.nodes[start.0];
        if node.is_leaf() {
            if let Some(value) = f(self, start) {
                acc.push(value);
            }
            return;
        }
        for child in &node.children {
            self.iterate_over_leaf(*child, f, acc);
        }
    }

    /// Pre-order walk of every node below and including `start`.
    pub fn walk<F>(&self, start: NodeId, f: &mut F)
    where
        F: FnMut(NodeId, usize),
    {
        fn visit<F: FnMut(NodeId, usize)>(tree: &Tree, id: NodeId, depth: usize, f: &mut F) {
            f(id, depth);
            for child in &tree.nodes[id.0].children {
                visit(tree, *child, depth + 1, f);
            }
        }
        visit(self, start, 0, f)
    }

    pub fn host_nodes(&self) -> Vec<NodeId> {
        self.nodes[0]
            .children
            .iter()
            .copied()
            .filter(|id| matches!(self.nodes[id.0].content, NodeContent::HostFolder(_)))
            .collect()
    }

    /// Closest host folder at or above `id`.
    pub fn host_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if matches!(self.nodes[node.0].content, NodeContent::HostFolder(_)) {
                return Some(node);
            }
            current = self.nodes[node.0].parent;
        }
        None
    }

    pub fn message_nodes(&self, start: NodeId) -> Vec<NodeId> {
        let mut messages = Vec::new();
        self.iterate_over_leaf(
            start,
            &mut |tree: &Tree, id| tree.content(id).as_message().map(|_| id),
            &mut messages,
        );
        messages
    }

    /// Message leaves grouped by host node.
    pub fn messages_per_host(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        self.host_nodes()
            .into_iter()
            .map(|host| (host, self.message_nodes(host)))
            .collect()
    }

    /// Every message observation grouped by host node.
    pub fn message_refs_per_host(&self) -> BTreeMap<NodeId, Vec<MessageRef>> {
        self.messages_per_host()
            .into_iter()
            .map(|(host, messages)| {
                let refs = messages
                    .iter()
                    .filter_map(|id| self.content(*id).as_message())
                    .flat_map(|message| message.occurrences.iter().copied())
                    .collect();
                (host, refs)
            })
            .collect()
    }

    pub fn channels_per_host(&self) -> BTreeMap<NodeId, Vec<i64>> {
        self.host_nodes()
            .into_iter()
            .map(|host| (host, self.content(host).channels()))
            .collect()
    }

    /// Drop cached payload analyses of every message.
    pub fn reset_analysis(&mut self) {
        for node in &mut self.nodes {
            if let NodeContent::Message(message) = &mut node.content {
                message.reset_analysis();
            }
        }
    }

    /// Drop every node but the root.
    ///
    /// Ids are handed out again afterwards: a `NodeId` obtained before the
    /// call may name a different node, or none at all, once the tree regrows.
    /// Drop held ids when clearing.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].children.clear();
        self.attached = 1;
    }

    #[cfg(test)]
    pub(crate) fn assert_sorted(&self) {
        self.walk(Self::ROOT, &mut |id, _| {
            let children = self.children(id);
            for pair in children.windows(2) {
                assert!(
                    self.content(pair[0]) < self.content(pair[1]),
                    "children of {} out of order: {:?} !< {:?}",
                    id,
                    self.content(pair[0]),
                    self.content(pair[1])
                );
            }
        });
    }
}
