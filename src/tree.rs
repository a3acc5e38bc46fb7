//! Decoding tree of an RC-SCAN decoder
//!
//! The tree is built once from the frozen-bit mask. Every node covers a contiguous range of code
//! positions. A node whose sub-mask is all `Zero` is a [`NodeKind::Frozen`] leaf, one whose
//! sub-mask is all `One` is a [`NodeKind::Information`] leaf, and any other node is split into
//! two children covering the first and second halves of its range. Nodes are stored in an arena
//! in pre-order, so that the root has index `0` and every child follows its parent.

use std::ops::Range;

use crate::{Bit, Mask};

/// Index of a node in the arena of a [`DecodingTree`]
pub type NodeId = usize;

/// Kind of a decoding tree node
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
pub enum NodeKind {
    /// Leaf whose positions are all frozen
    Frozen,
    /// Leaf whose positions all carry information
    Information,
    /// Node with mixed sub-mask, split into two halves
    Split {
        /// Child covering the first half of the positions
        left: NodeId,
        /// Child covering the second half of the positions
        right: NodeId,
    },
}

/// Node of a decoding tree
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Node {
    /// Node kind
    pub kind: NodeKind,
    /// First code position covered by the node
    pub start: usize,
    /// Number of code positions covered by the node
    pub len: usize,
    /// Distance from the root
    pub depth: usize,
    /// Offset of the node's working buffers in decoder storage
    pub(crate) buf_offset: usize,
}

impl Node {
    /// Returns `true` if the node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        !matches!(self.kind, NodeKind::Split { .. })
    }

    /// Returns range of code positions covered by the node.
    #[must_use]
    pub fn positions(&self) -> Range<usize> {
        self.start .. self.start + self.len
    }

    /// Returns range of the node's working buffers in decoder storage.
    pub(crate) fn buf_range(&self) -> Range<usize> {
        self.buf_offset .. self.buf_offset + self.len
    }
}

/// Decoding tree derived from a frozen-bit mask
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct DecodingTree {
    /// Mask from which the tree was built
    mask: Mask,
    /// All nodes, in pre-order
    nodes: Vec<Node>,
    /// Leaves, from left to right
    leaves: Vec<NodeId>,
    /// Total length of the working buffers of all nodes
    buf_len: usize,
}

impl DecodingTree {
    /// Returns decoding tree for given mask.
    ///
    /// # Examples
    ///
    /// ```
    /// use polar_scan::tree::{DecodingTree, NodeKind};
    /// use polar_scan::Mask;
    ///
    /// let mask = Mask::new(&[0, 0, 0, 1, 1, 1, 1, 1])?;
    /// let tree = DecodingTree::build(&mask);
    /// assert_eq!(tree.leaves().len(), 4);
    /// assert!(matches!(tree.root().kind, NodeKind::Split { .. }));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn build(mask: &Mask) -> Self {
        let mut tree = Self {
            mask: mask.clone(),
            nodes: Vec::with_capacity(2 * mask.len() - 1),
            leaves: Vec::new(),
            buf_len: 0,
        };
        tree.add_node(0, mask.len(), 0);
        tree
    }

    /// Returns the mask from which the tree was built.
    #[must_use]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Returns root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Returns node with given index.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not the index of a node of the tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Returns all nodes, in pre-order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns indices of all leaves, from left to right.
    #[must_use]
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    /// Returns sub-masks of all leaves, from left to right.
    #[must_use]
    pub fn leaf_masks(&self) -> Vec<&[Bit]> {
        self.leaves
            .iter()
            .map(|&id| &self.mask.bits()[self.nodes[id].positions()])
            .collect()
    }

    /// Returns sub-mask of given node.
    #[must_use]
    pub fn sub_mask(&self, id: NodeId) -> &[Bit] {
        &self.mask.bits()[self.nodes[id].positions()]
    }

    /// Returns depth of the tree (`0` for a single-leaf tree).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }

    /// Returns total length of the working buffers of all nodes.
    pub(crate) fn buf_len(&self) -> usize {
        self.buf_len
    }

    /// Adds node covering given positions, along with all its descendants, and returns its index.
    fn add_node(&mut self, start: usize, len: usize, depth: usize) -> NodeId {
        let id = self.nodes.len();
        let kind = leaf_kind(&self.mask.bits()[start .. start + len]);
        self.nodes.push(Node {
            kind: kind.unwrap_or(NodeKind::Frozen),
            start,
            len,
            depth,
            buf_offset: self.buf_len,
        });
        self.buf_len += len;
        match kind {
            Some(leaf) => {
                self.leaves.push(id);
                self.nodes[id].kind = leaf;
            }
            None => {
                // Mixed sub-masks have length at least 2
                let half = len / 2;
                let left = self.add_node(start, half, depth + 1);
                let right = self.add_node(start + half, half, depth + 1);
                self.nodes[id].kind = NodeKind::Split { left, right };
            }
        }
        id
    }
}

/// Returns leaf kind for given sub-mask, or `None` if the sub-mask is not constant.
fn leaf_kind(sub_mask: &[Bit]) -> Option<NodeKind> {
    if sub_mask.iter().all(|&b| b == Bit::Zero) {
        Some(NodeKind::Frozen)
    } else if sub_mask.iter().all(|&b| b == Bit::One) {
        Some(NodeKind::Information)
    } else {
        None
    }
}
