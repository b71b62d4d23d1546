//! Search tree with arena allocation.
//!
//! Nodes are stored in a contiguous `Vec` and referenced by `NodeId`
//! indices; parents are back-references, children owned id lists. The tree
//! lives for exactly one decision: it is built during a `run()` and
//! discarded with the result.

use game_core::Score;

use crate::node::{NodeId, SearchNode};

/// Arena-based search tree over actions of type `A`.
#[derive(Debug)]
pub struct SearchTree<A, O> {
    nodes: Vec<SearchNode<A, O>>,
    root: NodeId,
}

impl<A: Copy + Eq, O: Score> SearchTree<A, O> {
    /// Create a tree holding only a root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![SearchNode::new_root()],
            root: NodeId(0),
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &SearchNode<A, O> {
        &self.nodes[id.0 as usize]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut SearchNode<A, O> {
        &mut self.nodes[id.0 as usize]
    }

    /// Total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The arena slice, for read-only walks over every node.
    #[inline]
    pub fn arena(&self) -> &[SearchNode<A, O>] {
        &self.nodes
    }

    /// Parent of `id`, or `None` at the root.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let p = self.get(id).parent;
        if p.is_none() {
            None
        } else {
            Some(p)
        }
    }

    /// Add a child reached from `parent_id` by `action`.
    pub fn add_child(&mut self, parent_id: NodeId, action: A) -> NodeId {
        let depth = self.get(parent_id).depth + 1;
        let child = SearchNode::new_child(parent_id, depth, action);
        let child_id = NodeId(self.nodes.len() as u32);
        self.nodes.push(child);
        self.get_mut(parent_id).children.push((action, child_id));
        child_id
    }

    /// Legal actions at `id` that have no child yet, in `legal` order.
    pub fn missing_actions(&self, id: NodeId, legal: &[A]) -> Vec<A> {
        let children = &self.get(id).children;
        legal
            .iter()
            .copied()
            .filter(|a| !children.iter().any(|(ca, _)| ca == a))
            .collect()
    }

    /// Children of `id` whose actions are legal under the current position,
    /// in insertion order.
    pub fn available_children(&self, id: NodeId, legal: &[A]) -> Vec<(A, NodeId)> {
        self.get(id)
            .children
            .iter()
            .copied()
            .filter(|(a, _)| legal.contains(a))
            .collect()
    }

    /// Bump the availability count of every selectable sibling of `taken`
    /// at `parent_id`. The taken child itself is not counted.
    pub fn record_availability(&mut self, parent_id: NodeId, taken: NodeId, legal: &[A]) {
        let siblings: Vec<NodeId> = self
            .get(parent_id)
            .children
            .iter()
            .filter(|(a, id)| *id != taken && legal.contains(a))
            .map(|(_, id)| *id)
            .collect();
        for id in siblings {
            self.get_mut(id).n_accent += 1;
        }
    }

    /// The root child with the most visits, with ties broken by insertion
    /// order. Returns (action, visit count).
    pub fn best_action(&self) -> Option<(A, u32)> {
        let root = self.get(self.root);
        let mut best: Option<(A, u32)> = None;
        for &(action, id) in &root.children {
            let visits = self.get(id).n;
            if best.map_or(true, |(_, bv)| visits > bv) {
                best = Some((action, visits));
            }
        }
        best
    }

    /// Diagnostic snapshot of the tree shape.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: self.get(self.root).n,
            max_depth: self.nodes.iter().map(|n| n.depth).max().unwrap_or(0),
        }
    }
}

impl<A: Copy + Eq, O: Score> Default for SearchTree<A, O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about a search tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub max_depth: u32,
}
