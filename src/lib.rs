//! This crate implements the reduced-complexity soft cancellation (RC-SCAN) decoder for polar
//! codes. A polar code of length `N = 2^n` is defined by a mask that marks each position of the
//! source vector as either frozen (fixed to `0`) or information-carrying. The decoder builds a
//! binary decomposition tree from the mask, in which constant sub-masks (all frozen or all
//! information) terminate the recursion, and then passes soft beliefs (log-likelihood ratios)
//! down and up the tree to arrive at a decision on the transmitted codeword.
//!
//! # Examples
//!
//! ```
//! use polar_scan::{Bit, Decoder};
//! use Bit::{One, Zero};
//!
//! let mask = [0, 0, 0, 1, 0, 1, 1, 1];
//! let mut decoder = Decoder::new(&mask, true)?;
//! let codeword_llr = [-2.1, 1.9, -2.3, 1.7, -1.8, 2.2, -2.0, 2.4];
//! let codeword = decoder.decode_llr(&codeword_llr)?;
//! assert_eq!(codeword, [One, Zero, One, Zero, One, Zero, One, Zero]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

use thiserror::Error;

pub mod batch;
pub mod coordination;
mod decoder;
pub mod mask;
pub mod scan;
pub mod tree;
pub mod utils;

pub use decoder::{Decoder, NodeView};
pub use mask::Mask;
pub use scan::ScanAlgo;

/// Custom error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid frozen-bit mask
    #[error("Invalid mask: {0}")]
    InvalidMask(String),
    /// Wrong number of received LLR values
    #[error("Expected {expected} LLR values (found {found})")]
    LengthMismatch {
        /// Code length
        expected: usize,
        /// Number of values supplied
        found: usize,
    },
    /// Invalid input error
    #[error("{0}")]
    InvalidInput(String),
    /// Decoding attempted before the initial state was set
    #[error("Decoder state has not been initialized")]
    NotInitialized,
    /// Decoding results requested before decoding
    #[error("No decoding results available")]
    NotDecoded,
    /// File read/write error
    #[error("{0}")]
    FileReadWriteError(#[from] std::io::Error),
    /// Serde read/write error
    #[error("{0}")]
    SerdeReadWriteError(#[from] serde_json::Error),
    /// Coordination service could not be reached or rejected a request
    #[error("Coordination request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Enumeration of binary symbol values
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
pub enum Bit {
    /// Binary symbol `0`
    Zero = 0,
    /// Binary symbol `1`
    One = 1,
}

impl std::ops::BitXor for Bit {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        if self == rhs {
            Bit::Zero
        } else {
            Bit::One
        }
    }
}

impl std::ops::BitXorAssign for Bit {
    fn bitxor_assign(&mut self, rhs: Self) {
        *self = *self ^ rhs;
    }
}

impl From<Bit> for u8 {
    fn from(bit: Bit) -> Self {
        match bit {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }
}

impl TryFrom<u8> for Bit {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(Bit::Zero),
            1 => Ok(Bit::One),
            _ => Err(Error::InvalidInput(format!(
                "Expected binary value 0 or 1 (found {value})"
            ))),
        }
    }
}
