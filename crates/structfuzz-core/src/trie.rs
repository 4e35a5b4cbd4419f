//! Prefix tree of execution traces.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. A node is
//! "visited" once some trace has ended at it; inserting a trace that ends at
//! an unvisited node is a new path.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct TrieNode<K> {
    parent: Option<NodeId>,
    key: Option<K>,
    children: HashMap<K, NodeId>,
    count: u64,
}

impl<K> TrieNode<K> {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// How many inserted traces ended here.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_visited(&self) -> bool {
        self.count > 0
    }
}

/// The outcome of inserting one trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inserted {
    pub node: NodeId,
    pub is_new: bool,
}

#[derive(Debug, Clone)]
pub struct Trie<K> {
    nodes: Vec<TrieNode<K>>,
    paths: usize,
}

impl<K: Clone + Eq + Hash> Default for Trie<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash> Trie<K> {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode {
                parent: None,
                key: None,
                children: HashMap::new(),
                count: 0,
            }],
            paths: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Walk `trace` from the root, creating missing nodes, and count one
    /// visit at the last node. An empty trace ends at the root.
    pub fn insert<I>(&mut self, trace: I) -> Inserted
    where
        I: IntoIterator<Item = K>,
    {
        let mut current = self.root();
        for key in trace {
            current = match self.nodes[current.0].children.get(&key) {
                Some(child) => *child,
                None => {
                    let child = NodeId(self.nodes.len());
                    self.nodes.push(TrieNode {
                        parent: Some(current),
                        key: Some(key.clone()),
                        children: HashMap::new(),
                        count: 0,
                    });
                    self.nodes[current.0].children.insert(key, child);
                    child
                }
            };
        }
        let node = &mut self.nodes[current.0];
        let is_new = node.count == 0;
        node.count += 1;
        if is_new {
            self.paths += 1;
        }
        Inserted {
            node: current,
            is_new,
        }
    }

    /// The node a trace ends at, without modifying the trie.
    pub fn get<'k, I>(&self, trace: I) -> Option<NodeId>
    where
        I: IntoIterator<Item = &'k K>,
        K: 'k,
    {
        let mut current = self.root();
        for key in trace {
            current = *self.nodes[current.0].children.get(key)?;
        }
        Some(current)
    }

    /// Whether some inserted trace ended exactly at the end of `trace`.
    pub fn contains_path<'k, I>(&self, trace: I) -> bool
    where
        I: IntoIterator<Item = &'k K>,
        K: 'k,
    {
        self.get(trace)
            .is_some_and(|id| self.nodes[id.0].is_visited())
    }

    pub fn node(&self, id: NodeId) -> &TrieNode<K> {
        &self.nodes[id.0]
    }

    pub fn count(&self, id: NodeId) -> u64 {
        self.nodes[id.0].count
    }

    /// Keys from the root down to `id`.
    pub fn trace(&self, id: NodeId) -> Vec<K> {
        let mut keys = Vec::new();
        let mut current = Some(id);
        while let Some(at) = current {
            let node = &self.nodes[at.0];
            if let Some(key) = &node.key {
                keys.push(key.clone());
            }
            current = node.parent;
        }
        keys.reverse();
        keys
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths == 0
    }

    /// Number of distinct traces inserted.
    pub fn paths(&self) -> usize {
        self.paths
    }
}
