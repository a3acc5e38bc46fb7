//! Decoder for polar codes based on reduced-complexity soft cancellation (RC-SCAN)

use std::ops::Range;

use tracing::debug;

use crate::scan::{self, ScanAlgo, Workspace};
use crate::tree::{DecodingTree, NodeId, NodeKind};
use crate::{utils, Bit, Error, Mask};

/// Decoder lifecycle
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
enum State {
    /// No received LLR values yet
    Uninitialized,
    /// Received LLR values loaded, results not yet computed
    Initialized,
    /// Results available for the loaded LLR values
    Decoded,
}

/// RC-SCAN decoder for a polar code with a given frozen-bit mask
///
/// The decoding tree and all working buffers are built once, so that one decoder can be reused
/// for any number of received words: load each one with [`Decoder::set_initial_state`], run
/// [`Decoder::decode`], and read the results.
#[derive(Clone, Debug)]
pub struct Decoder {
    /// Decoding tree built from the mask
    tree: DecodingTree,
    /// Working buffers of all tree nodes
    ws: Workspace,
    /// Combine rule and number of SCAN iterations
    scan_algo: ScanAlgo,
    /// Whether information bits are read from the codeword rather than the source vector
    systematic: bool,
    /// Lifecycle state
    state: State,
    /// Root-level belief after the final SCAN iteration
    result_beta: Vec<f64>,
    /// Decided source vector
    source_bits: Vec<Bit>,
    /// Decided codeword
    codeword: Vec<Bit>,
}

impl Decoder {
    /// Returns decoder for given mask, with the default combine rule and number of iterations.
    ///
    /// # Parameters
    ///
    /// - `mask`: One value per code position, with `0` marking a frozen position and `1` an
    ///   information position. The number of values must be a power of `2`.
    ///
    /// - `systematic`: Whether the message is carried at the information positions of the
    ///   codeword (`true`) or of the source vector (`false`).
    ///
    /// # Errors
    ///
    /// Returns an error if the mask is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use polar_scan::Decoder;
    ///
    /// let decoder = Decoder::new(&[0, 0, 0, 1, 0, 1, 1, 1], true)?;
    /// assert_eq!(decoder.code_length(), 8);
    /// assert!(Decoder::new(&[0, 1, 1], true).is_err());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(mask: &[u8], systematic: bool) -> Result<Self, Error> {
        Self::with_algo(mask, systematic, ScanAlgo::default())
    }

    /// Returns decoder for given mask, combine rule and number of iterations.
    ///
    /// # Errors
    ///
    /// Returns an error if the mask is invalid or if the number of SCAN iterations is `0`.
    pub fn with_algo(mask: &[u8], systematic: bool, scan_algo: ScanAlgo) -> Result<Self, Error> {
        Self::from_mask(Mask::new(mask)?, systematic, scan_algo)
    }

    /// Returns decoder for given validated mask, combine rule and number of iterations.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of SCAN iterations is `0`.
    pub fn from_mask(mask: Mask, systematic: bool, scan_algo: ScanAlgo) -> Result<Self, Error> {
        if scan_algo.num_iter() == 0 {
            return Err(Error::InvalidInput(
                "Number of SCAN iterations cannot be zero".to_string(),
            ));
        }
        let tree = DecodingTree::build(&mask);
        let ws = Workspace::new(&tree);
        let code_length = mask.len();
        debug!(
            code_length,
            num_info_bits = mask.num_info_bits(),
            num_leaves = tree.leaves().len(),
            depth = tree.depth(),
            "built decoding tree"
        );
        Ok(Self {
            tree,
            ws,
            scan_algo,
            systematic,
            state: State::Uninitialized,
            result_beta: vec![0.0; code_length],
            source_bits: vec![Bit::Zero; code_length],
            codeword: vec![Bit::Zero; code_length],
        })
    }

    /// Returns code length.
    #[must_use]
    pub fn code_length(&self) -> usize {
        self.tree.mask().len()
    }

    /// Returns frozen-bit mask.
    #[must_use]
    pub fn mask(&self) -> &Mask {
        self.tree.mask()
    }

    /// Returns decoding tree.
    #[must_use]
    pub fn tree(&self) -> &DecodingTree {
        &self.tree
    }

    /// Returns combine rule and number of SCAN iterations.
    #[must_use]
    pub fn scan_algo(&self) -> ScanAlgo {
        self.scan_algo
    }

    /// Returns `true` if the message is read from the codeword.
    #[must_use]
    pub fn is_systematic(&self) -> bool {
        self.systematic
    }

    /// Loads received LLR values, discarding any previous results.
    ///
    /// # Parameters
    ///
    /// - `codeword_llr`: Log-likelihood-ratio (LLR) values for the code bits, with positive values
    ///   indicating that `Zero` is more likely.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of LLR values differs from the code length, or if any of
    /// them is not finite.
    pub fn set_initial_state(&mut self, codeword_llr: &[f64]) -> Result<(), Error> {
        if codeword_llr.len() != self.code_length() {
            return Err(Error::LengthMismatch {
                expected: self.code_length(),
                found: codeword_llr.len(),
            });
        }
        if let Some(pos) = codeword_llr.iter().position(|x| !x.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "LLR value at position {pos} is not finite (found {})",
                codeword_llr[pos]
            )));
        }
        self.ws.load_root_channel(&self.tree, codeword_llr);
        self.ws.reset_beliefs(&self.tree);
        self.state = State::Initialized;
        Ok(())
    }

    /// Runs SCAN iterations on the loaded LLR values, and computes the results.
    ///
    /// Calling this again without loading new LLR values gives the same results.
    ///
    /// # Errors
    ///
    /// Returns an error if no LLR values have been loaded.
    pub fn decode(&mut self) -> Result<(), Error> {
        if self.state == State::Uninitialized {
            return Err(Error::NotInitialized);
        }
        scan::decode(&self.tree, &mut self.ws, self.scan_algo);
        self.result_beta.copy_from_slice(self.ws.beta(self.tree.root()));
        self.decide();
        self.state = State::Decoded;
        debug!(
            scan_algo = %self.scan_algo,
            num_ones = self.codeword.iter().filter(|&&b| b == Bit::One).count(),
            "decoded received word"
        );
        Ok(())
    }

    /// Returns codeword decisions for given LLR values.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of LLR values differs from the code length, or if any of
    /// them is not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use polar_scan::{Bit, Decoder};
    /// use Bit::{One, Zero};
    ///
    /// let mut decoder = Decoder::new(&[0, 1], false)?;
    /// assert_eq!(decoder.decode_llr(&[1.0, -3.0])?, [One, One]);
    /// assert_eq!(decoder.message()?, None);
    /// assert_eq!(decoder.info_bits()?, [One]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn decode_llr(&mut self, codeword_llr: &[f64]) -> Result<Vec<Bit>, Error> {
        self.set_initial_state(codeword_llr)?;
        self.decode()?;
        Ok(self.codeword.clone())
    }

    /// Returns root-level belief: the received LLR values combined with the beliefs passed up
    /// from both halves of the tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the loaded LLR values have not been decoded.
    pub fn result_beta(&self) -> Result<&[f64], Error> {
        self.check_decoded()?;
        Ok(&self.result_beta)
    }

    /// Returns decided codeword, which always satisfies the frozen-bit constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if the loaded LLR values have not been decoded.
    pub fn codeword(&self) -> Result<&[Bit], Error> {
        self.check_decoded()?;
        Ok(&self.codeword)
    }

    /// Returns decided source vector, whose frozen positions are always `Zero`.
    ///
    /// # Errors
    ///
    /// Returns an error if the loaded LLR values have not been decoded.
    pub fn source_bits(&self) -> Result<&[Bit], Error> {
        self.check_decoded()?;
        Ok(&self.source_bits)
    }

    /// Returns codeword bits at the information positions for a systematic decoder, and `None`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the loaded LLR values have not been decoded.
    pub fn message(&self) -> Result<Option<Vec<Bit>>, Error> {
        self.check_decoded()?;
        Ok(self.systematic.then(|| self.at_info_positions(&self.codeword)))
    }

    /// Returns decided information bits: codeword bits at the information positions for a
    /// systematic decoder, and source bits at the information positions otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the loaded LLR values have not been decoded.
    pub fn info_bits(&self) -> Result<Vec<Bit>, Error> {
        self.check_decoded()?;
        if self.systematic {
            Ok(self.at_info_positions(&self.codeword))
        } else {
            Ok(self.at_info_positions(&self.source_bits))
        }
    }

    /// Returns view of the root node.
    #[must_use]
    pub fn root(&self) -> NodeView<'_> {
        NodeView {
            decoder: self,
            id: 0,
        }
    }

    /// Returns views of all leaves, from left to right.
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeView<'_>> {
        self.tree
            .leaves()
            .iter()
            .map(|&id| NodeView { decoder: self, id })
            .collect()
    }

    /// Checks that results are available.
    fn check_decoded(&self) -> Result<(), Error> {
        if self.state == State::Decoded {
            Ok(())
        } else {
            Err(Error::NotDecoded)
        }
    }

    /// Returns bits of a length-`N` sequence at the information positions.
    fn at_info_positions(&self, bits: &[Bit]) -> Vec<Bit> {
        bits.iter()
            .zip(self.tree.mask().bits())
            .filter(|&(_, &m)| m == Bit::One)
            .map(|(&b, _)| b)
            .collect()
    }

    /// Computes source and codeword decisions from the node buffers.
    ///
    /// Leaves are resolved first; split nodes then combine the codewords of their children as
    /// `[x_l ^ x_r, x_r]`. Children follow their parent in the arena, so visiting nodes in reverse
    /// order visits both children of a node before the node itself.
    fn decide(&mut self) {
        for node in self.tree.nodes().iter().rev() {
            let range = node.positions();
            match node.kind {
                NodeKind::Frozen => {
                    self.source_bits[range.clone()].fill(Bit::Zero);
                    self.codeword[range].fill(Bit::Zero);
                }
                NodeKind::Information => {
                    let soft: Vec<f64> = self
                        .ws
                        .channel(node)
                        .iter()
                        .zip(self.ws.beta(node))
                        .map(|(&llr, &beta)| llr + beta)
                        .collect();
                    let bits = utils::bpsk_slicer(&soft);
                    self.codeword[range.clone()].copy_from_slice(&bits);
                    // Rate-one sub-code: source bits are the codeword transformed back
                    self.source_bits[range.clone()].copy_from_slice(&bits);
                    polar_transform(&mut self.source_bits[range]);
                }
                NodeKind::Split { .. } => {
                    combine_halves(&mut self.codeword[range]);
                }
            }
        }
    }
}

/// Replaces the bits `[x_l, x_r]` with `[x_l ^ x_r, x_r]`.
fn combine_halves(bits: &mut [Bit]) {
    let (first, second) = bits.split_at_mut(bits.len() / 2);
    for (x, &y) in first.iter_mut().zip(second.iter()) {
        *x ^= y;
    }
}

/// Applies the polar transform in place. The transform is its own inverse.
fn polar_transform(bits: &mut [Bit]) {
    let mut half = 1;
    while half < bits.len() {
        for block in bits.chunks_exact_mut(2 * half) {
            combine_halves(block);
        }
        half *= 2;
    }
}

/// Read-only view of a node of a decoder's tree, along with its working buffers
#[derive(Clone, Debug, Copy)]
pub struct NodeView<'a> {
    /// Decoder owning the node
    decoder: &'a Decoder,
    /// Node index
    id: NodeId,
}

impl<'a> NodeView<'a> {
    /// Returns node index.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.decoder.tree.node(self.id).kind
    }

    /// Returns `true` if the node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.decoder.tree.node(self.id).is_leaf()
    }

    /// Returns range of code positions covered by the node.
    #[must_use]
    pub fn positions(&self) -> Range<usize> {
        self.decoder.tree.node(self.id).positions()
    }

    /// Returns sub-mask of the node.
    #[must_use]
    pub fn sub_mask(&self) -> &'a [Bit] {
        self.decoder.tree.sub_mask(self.id)
    }

    /// Returns LLR values passed down to the node.
    #[must_use]
    pub fn channel(&self) -> &'a [f64] {
        self.decoder.ws.channel(self.decoder.tree.node(self.id))
    }

    /// Returns belief passed up from the node.
    #[must_use]
    pub fn beta(&self) -> &'a [f64] {
        self.decoder.ws.beta(self.decoder.tree.node(self.id))
    }

    /// Returns views of the two children of a split node, and `None` for a leaf.
    #[must_use]
    pub fn children(&self) -> Option<(NodeView<'a>, NodeView<'a>)> {
        match self.kind() {
            NodeKind::Split { left, right } => Some((
                NodeView {
                    decoder: self.decoder,
                    id: left,
                },
                NodeView {
                    decoder: self.decoder,
                    id: right,
                },
            )),
            NodeKind::Frozen | NodeKind::Information => None,
        }
    }
}
