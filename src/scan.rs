//! Soft-information propagation over the decoding tree of an RC-SCAN decoder
//!
//! Every node of the tree holds two working buffers of the same length as its range of code
//! positions: `channel`, with the LLR values passed down to the node, and `beta`, with the belief
//! passed up from the node. For a split node whose channel buffer is the concatenation of halves
//! `a` and `b`, with children `l` and `r`, one pass computes (in this order)
//!
//! - `l.channel[i] = f(a[i], b[i] + r.beta[i])`, followed by a pass over the left subtree;
//! - `r.channel[i] = f(a[i], l.beta[i]) + b[i]`, followed by a pass over the right subtree;
//! - `beta[i] = f(l.beta[i], r.beta[i] + b[i])` and `beta[i + M] = f(l.beta[i], a[i]) + r.beta[i]`,
//!
//! where `f` is the check-node combine rule and `M` is the length of each child. Leaves are never
//! updated: a frozen leaf believes with certainty that all its bits are `0` (beta [`INF`]), and an
//! information leaf has no prior belief (beta `0`).

use itertools::izip;
use serde::{Deserialize, Serialize};

use crate::tree::{DecodingTree, Node, NodeId, NodeKind};

/// Belief of a frozen leaf. Large enough to act as an infinite LLR in all combine rules, and small
/// enough that sums of it with channel LLR values stay finite.
pub const INF: f64 = 1e100;

/// Enumeration of check-node combine rules, with each variant holding the number of SCAN
/// iterations
#[derive(Clone, Eq, Hash, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub enum ScanAlgo {
    /// Min-sum approximation of the check-node rule
    MinSum(u32),
    /// Exact check-node rule in the log domain
    BoxPlus(u32),
}

impl ScanAlgo {
    /// Returns the name of the variant.
    fn name(&self) -> &str {
        match self {
            ScanAlgo::MinSum(_) => "Min-Sum",
            ScanAlgo::BoxPlus(_) => "Box-Plus",
        }
    }

    /// Returns the number of SCAN iterations held in the variant.
    #[must_use]
    pub fn num_iter(self) -> u32 {
        match self {
            ScanAlgo::MinSum(n) | ScanAlgo::BoxPlus(n) => n,
        }
    }
}

impl Default for ScanAlgo {
    fn default() -> Self {
        ScanAlgo::MinSum(1)
    }
}

impl std::fmt::Display for ScanAlgo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} combining, {} SCAN iterations",
            self.name(),
            self.num_iter()
        )
    }
}

/// Working buffers for all nodes of a decoding tree
#[derive(Clone, Debug)]
pub(crate) struct Workspace {
    /// LLR values passed down to each node
    pub(crate) channel: Vec<f64>,
    /// Beliefs passed up from each node
    pub(crate) beta: Vec<f64>,
}

impl Workspace {
    /// Returns new workspace for given tree.
    pub(crate) fn new(tree: &DecodingTree) -> Self {
        let mut ws = Self {
            channel: vec![0.0; tree.buf_len()],
            beta: vec![0.0; tree.buf_len()],
        };
        ws.reset_beliefs(tree);
        ws
    }

    /// Clears all LLR values and sets the root LLR values.
    pub(crate) fn load_root_channel(&mut self, tree: &DecodingTree, llr: &[f64]) {
        self.channel.fill(0.0);
        self.channel[tree.root().buf_range()].copy_from_slice(llr);
    }

    /// Sets leaf beliefs, and clears the beliefs of all split nodes.
    pub(crate) fn reset_beliefs(&mut self, tree: &DecodingTree) {
        for node in tree.nodes() {
            let init_val = match node.kind {
                NodeKind::Frozen => INF,
                NodeKind::Information | NodeKind::Split { .. } => 0.0,
            };
            self.beta[node.buf_range()].fill(init_val);
        }
    }

    /// Returns LLR values passed down to a node.
    pub(crate) fn channel(&self, node: &Node) -> &[f64] {
        &self.channel[node.buf_range()]
    }

    /// Returns belief passed up from a node.
    pub(crate) fn beta(&self, node: &Node) -> &[f64] {
        &self.beta[node.buf_range()]
    }
}

/// Runs SCAN iterations over the whole tree, starting from cleared beliefs.
///
/// The root LLR values must already be loaded into the workspace.
pub(crate) fn decode(tree: &DecodingTree, ws: &mut Workspace, scan_algo: ScanAlgo) {
    ws.reset_beliefs(tree);
    for _ in 0 .. scan_algo.num_iter() {
        run_pass(tree, ws, scan_algo, 0);
    }
    debug_assert!(ws.beta.iter().all(|x| x.is_finite()));
}

/// Runs one pass over the subtree rooted at given node.
fn run_pass(tree: &DecodingTree, ws: &mut Workspace, scan_algo: ScanAlgo, id: NodeId) {
    let node = tree.node(id);
    if let NodeKind::Split { left, right } = node.kind {
        let (left_node, right_node) = (tree.node(left), tree.node(right));
        debug_assert!(left_node.len == node.len / 2 && right_node.len == node.len / 2);
        compute_left_channel(node, left_node, right_node, ws, scan_algo);
        run_pass(tree, ws, scan_algo, left);
        compute_right_channel(node, left_node, right_node, ws, scan_algo);
        run_pass(tree, ws, scan_algo, right);
        compute_beta(node, left_node, right_node, ws, scan_algo);
    }
}

/// Computes LLR values for the left child of a split node.
fn compute_left_channel(
    node: &Node,
    left: &Node,
    right: &Node,
    ws: &mut Workspace,
    scan_algo: ScanAlgo,
) {
    // Children are stored after their parent
    let (head, tail) = ws.channel.split_at_mut(left.buf_offset);
    let (llr_a, llr_b) = head[node.buf_range()].split_at(left.len);
    let right_beta = &ws.beta[right.buf_range()];
    let llr_left = &mut tail[.. left.len];
    for (llr_left, &a, &b, &beta_right) in izip!(llr_left, llr_a, llr_b, right_beta) {
        *llr_left = check_node(a, b + beta_right, scan_algo);
    }
}

/// Computes LLR values for the right child of a split node.
fn compute_right_channel(
    node: &Node,
    left: &Node,
    right: &Node,
    ws: &mut Workspace,
    scan_algo: ScanAlgo,
) {
    let (head, tail) = ws.channel.split_at_mut(right.buf_offset);
    let (llr_a, llr_b) = head[node.buf_range()].split_at(right.len);
    let left_beta = &ws.beta[left.buf_range()];
    let llr_right = &mut tail[.. right.len];
    for (llr_right, &a, &b, &beta_left) in izip!(llr_right, llr_a, llr_b, left_beta) {
        *llr_right = check_node(a, beta_left, scan_algo) + b;
    }
}

/// Computes belief of a split node from the beliefs of its children.
fn compute_beta(node: &Node, left: &Node, right: &Node, ws: &mut Workspace, scan_algo: ScanAlgo) {
    let (head, tail) = ws.beta.split_at_mut(left.buf_offset);
    let (beta_a, beta_b) = head[node.buf_range()].split_at_mut(left.len);
    let left_beta = &tail[.. left.len];
    let right_beta = &tail[right.buf_offset - left.buf_offset ..][.. right.len];
    let (llr_a, llr_b) = ws.channel[node.buf_range()].split_at(left.len);
    for (beta_a, beta_b, &beta_left, &beta_right, &a, &b) in
        izip!(beta_a, beta_b, left_beta, right_beta, llr_a, llr_b)
    {
        *beta_a = check_node(beta_left, beta_right + b, scan_algo);
        *beta_b = check_node(beta_left, a, scan_algo) + beta_right;
    }
}

/// Returns the check-node combination of two LLR values for given combine rule.
fn check_node(x: f64, y: f64, scan_algo: ScanAlgo) -> f64 {
    let min_abs = x.abs().min(y.abs());
    let min_sum = if (x < 0.0) == (y < 0.0) {
        min_abs
    } else {
        -min_abs
    };
    match scan_algo {
        ScanAlgo::MinSum(_) => min_sum,
        ScanAlgo::BoxPlus(_) => {
            min_sum + box_plus_correction_term((x + y).abs())
                - box_plus_correction_term((x - y).abs())
        }
    }
}

/// Returns the correction term `ln(1 + exp(-abs_val))` of the exact check-node rule.
fn box_plus_correction_term(abs_val: f64) -> f64 {
    (-abs_val).exp().ln_1p()
}

#[cfg(test)]
mod tests_of_functions {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::Mask;

    fn reference_tree() -> DecodingTree {
        DecodingTree::build(
            &Mask::new(&[0, 0, 0, 0, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1]).unwrap(),
        )
    }

    #[test]
    fn test_scan_algo() {
        assert_eq!(ScanAlgo::default(), ScanAlgo::MinSum(1));
        assert_eq!(ScanAlgo::BoxPlus(4).num_iter(), 4);
        assert_eq!(
            ScanAlgo::MinSum(2).to_string(),
            "Min-Sum combining, 2 SCAN iterations"
        );
    }

    #[test]
    fn test_check_node_min_sum() {
        let algo = ScanAlgo::MinSum(1);
        assert_float_eq!(check_node(2.0, 3.0, algo), 2.0, abs <= 1e-12);
        assert_float_eq!(check_node(-2.0, 3.0, algo), -2.0, abs <= 1e-12);
        assert_float_eq!(check_node(2.0, -1.5, algo), -1.5, abs <= 1e-12);
        assert_float_eq!(check_node(-2.0, -1.5, algo), 1.5, abs <= 1e-12);
        assert_float_eq!(check_node(INF, -1.5, algo), -1.5, abs <= 1e-12);
        assert_float_eq!(check_node(0.0, -1.5, algo), 0.0, abs <= 1e-12);
    }

    #[test]
    fn test_check_node_box_plus() {
        let algo = ScanAlgo::BoxPlus(1);
        // 2 * atanh(tanh(x / 2) * tanh(y / 2))
        let exact = |x: f64, y: f64| 2.0 * ((x / 2.0).tanh() * (y / 2.0).tanh()).atanh();
        for (x, y) in [(2.0, 3.0), (-0.5, 1.2), (4.0, -4.0), (-1.0, -0.1), (0.0, 2.0)] {
            assert_float_eq!(check_node(x, y, algo), exact(x, y), abs <= 1e-9);
        }
        // Finite for extreme inputs
        assert_float_eq!(check_node(INF, -1.5, algo), -1.5, abs <= 1e-12);
        assert_float_eq!(check_node(INF, INF, algo), INF, r2nd <= 1e-12);
        assert!(check_node(-1e300, 1e300, algo).is_finite());
    }

    #[test]
    fn test_box_plus_correction_term() {
        assert_float_eq!(box_plus_correction_term(0.0), 2f64.ln(), abs <= 1e-12);
        assert_float_eq!(box_plus_correction_term(INF), 0.0, abs <= 1e-12);
    }

    #[test]
    fn test_workspace_new() {
        let tree = reference_tree();
        let ws = Workspace::new(&tree);
        assert_eq!(ws.channel.len(), 64);
        for node in tree.nodes() {
            let correct_beta = match node.kind {
                NodeKind::Frozen => INF,
                _ => 0.0,
            };
            assert!(ws.beta(node).iter().all(|&x| x == correct_beta));
            assert!(ws.channel(node).iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn test_load_root_channel() {
        let tree = reference_tree();
        let mut ws = Workspace::new(&tree);
        ws.channel.fill(5.0);
        let llr: Vec<f64> = (0 .. 16).map(f64::from).collect();
        ws.load_root_channel(&tree, &llr);
        assert_float_eq!(ws.channel(tree.root()).to_vec(), llr, abs_all <= 1e-12);
        assert!(ws.channel[16 ..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_compute_children_channel() {
        let mask = Mask::new(&[0, 1, 1, 1]).unwrap();
        let tree = DecodingTree::build(&mask);
        let mut ws = Workspace::new(&tree);
        ws.load_root_channel(&tree, &[1.0, -2.0, 3.0, 0.5]);
        let (root, left, right) = (tree.node(0), tree.node(1), tree.node(4));
        let algo = ScanAlgo::MinSum(1);
        // Right child is an information leaf with zero belief
        compute_left_channel(root, left, right, &mut ws, algo);
        assert_float_eq!(ws.channel(left).to_vec(), vec![1.0, -0.5], abs_all <= 1e-12);
        ws.beta[left.buf_range()].copy_from_slice(&[-1.5, 4.0]);
        compute_right_channel(root, left, right, &mut ws, algo);
        assert_float_eq!(ws.channel(right).to_vec(), vec![2.0, -1.5], abs_all <= 1e-12);
        ws.beta[right.buf_range()].copy_from_slice(&[0.25, -0.75]);
        compute_beta(root, left, right, &mut ws, algo);
        assert_float_eq!(
            ws.beta(root).to_vec(),
            vec![-1.5, -0.25, -0.75, -2.75],
            abs_all <= 1e-12
        );
    }

    #[test]
    fn test_decode_noiseless() {
        let tree = reference_tree();
        let mut ws = Workspace::new(&tree);
        let llr = [
            -2.0, -2.0, 2.0, -2.0, -2.0, 2.0, -2.0, 2.0, 2.0, -2.0, 2.0, -2.0, 2.0, 2.0, -2.0,
            -2.0,
        ];
        ws.load_root_channel(&tree, &llr);
        decode(&tree, &mut ws, ScanAlgo::MinSum(1));
        assert_float_eq!(
            ws.beta(tree.root()).to_vec(),
            vec![
                -2.0, -2.0, 2.0, 6.0, -2.0, 2.0, -2.0, 2.0, 2.0, -2.0, 2.0, -2.0, 2.0, 2.0, -2.0,
                -2.0
            ],
            abs_all <= 1e-12
        );
        // Channel LLR values of the first leaf
        assert_float_eq!(
            ws.channel(tree.node(2)).to_vec(),
            vec![2.0, 2.0, 2.0, -2.0],
            abs_all <= 1e-12
        );
        // Leaf beliefs are never overwritten
        assert!(ws.beta(tree.node(2)).iter().all(|&x| x == INF));
        assert!(ws.beta(tree.node(14)).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_decode_repeatable() {
        let tree = reference_tree();
        let mut ws = Workspace::new(&tree);
        let llr: Vec<f64> = (0 .. 16).map(|k| f64::from(k % 5) - 1.7).collect();
        ws.load_root_channel(&tree, &llr);
        decode(&tree, &mut ws, ScanAlgo::BoxPlus(3));
        let first_beta = ws.beta.clone();
        decode(&tree, &mut ws, ScanAlgo::BoxPlus(3));
        assert_float_eq!(ws.beta, first_beta, abs_all <= 1e-12);
    }

    #[test]
    fn test_decode_iterations() {
        let tree = reference_tree();
        let mut ws = Workspace::new(&tree);
        let llr = [
            -1.9, -1.7, 2.6, -1.7, -1.1, 2.6, -1.3, 2.4, 2.2, -1.8, 2.1, -1.9, 2.3, 2.2, -1.5,
            -1.2,
        ];
        ws.load_root_channel(&tree, &llr);
        decode(&tree, &mut ws, ScanAlgo::MinSum(1));
        let beta_one_iter = ws.beta(tree.root()).to_vec();
        decode(&tree, &mut ws, ScanAlgo::MinSum(2));
        let beta_two_iter = ws.beta(tree.root()).to_vec();
        // Second iteration reuses right-subtree beliefs from the first one
        assert!(beta_one_iter
            .iter()
            .zip(&beta_two_iter)
            .any(|(x, y)| (x - y).abs() > 1e-6));
        assert!(beta_two_iter.iter().all(|x| x.is_finite()));
    }
}
