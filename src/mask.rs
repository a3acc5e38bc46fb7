//! Frozen-bit mask of a polar code
//!
//! A mask holds one [`Bit`] per position of the source vector of a polar code of length `N = 2^n`,
//! with `Zero` marking a frozen position and `One` an information position.

use serde::{Deserialize, Serialize};

use crate::{Bit, Error};

/// Frozen-bit mask of a polar code
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Mask(Vec<Bit>);

impl Mask {
    /// Returns mask corresponding to given binary values.
    ///
    /// # Parameters
    ///
    /// - `values`: One value per code position, with `0` marking a frozen position and `1` an
    ///   information position. The number of values must be a power of `2`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of values is not a power of `2`, or if any value is neither
    /// `0` nor `1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use polar_scan::Mask;
    ///
    /// let mask = Mask::new(&[0, 0, 0, 1, 0, 1, 1, 1])?;
    /// assert_eq!(mask.info_positions(), [3, 5, 6, 7]);
    /// assert!(Mask::new(&[0, 1, 1]).is_err());
    /// assert!(Mask::new(&[0, 2]).is_err());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(values: &[u8]) -> Result<Self, Error> {
        check_length(values.len())?;
        let bits = values
            .iter()
            .enumerate()
            .map(|(pos, &value)| {
                Bit::try_from(value).map_err(|_| {
                    Error::InvalidMask(format!(
                        "Expected 0 or 1 at position {pos} (found {value})"
                    ))
                })
            })
            .collect::<Result<Vec<Bit>, Error>>()?;
        Ok(Self(bits))
    }

    /// Returns mask corresponding to given bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of bits is not a power of `2`.
    pub fn from_bits(bits: Vec<Bit>) -> Result<Self, Error> {
        check_length(bits.len())?;
        Ok(Self(bits))
    }

    /// Returns mask with the `num_info_bits` most reliable positions of a length-`code_length`
    /// polar code marked as information positions.
    ///
    /// Reliabilities are the Bhattacharyya parameters of the synthesized bit channels, obtained by
    /// recursion from the parameter `exp(-Es/N0)` of a BPSK-AWGN channel at the design SNR. The
    /// recursion runs in the log domain so that long codes do not underflow. Positions of equal
    /// reliability are taken in increasing order.
    ///
    /// # Parameters
    ///
    /// - `code_length`: Code length (must be a power of `2`).
    ///
    /// - `num_info_bits`: Number of information positions (cannot exceed `code_length`).
    ///
    /// - `design_snr_db`: Ratio (dB) of symbol energy to noise power spectral density for which
    ///   the code is designed.
    ///
    /// # Errors
    ///
    /// Returns an error if `code_length` is not a power of `2` or if `num_info_bits` exceeds it.
    ///
    /// # Examples
    ///
    /// ```
    /// use polar_scan::Mask;
    ///
    /// let mask = Mask::bhattacharyya(8, 4, 0.0)?;
    /// assert_eq!(mask.info_positions(), [3, 5, 6, 7]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn bhattacharyya(
        code_length: usize,
        num_info_bits: usize,
        design_snr_db: f64,
    ) -> Result<Self, Error> {
        check_length(code_length)?;
        if num_info_bits > code_length {
            return Err(Error::InvalidMask(format!(
                "Number of information bits ({num_info_bits}) exceeds code length ({code_length})"
            )));
        }
        let log_z = log_bhattacharyya_parameters(code_length, design_snr_db);
        let mut positions: Vec<usize> = (0 .. code_length).collect();
        positions.sort_by(|&i, &j| log_z[i].total_cmp(&log_z[j]));
        let mut bits = vec![Bit::Zero; code_length];
        for &pos in &positions[.. num_info_bits] {
            bits[pos] = Bit::One;
        }
        Ok(Self(bits))
    }

    /// Returns code length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the mask has no positions (never the case for a valid mask).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the mask bits.
    #[must_use]
    pub fn bits(&self) -> &[Bit] {
        &self.0
    }

    /// Returns information positions in increasing order.
    #[must_use]
    pub fn info_positions(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == Bit::One)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Returns number of information positions.
    #[must_use]
    pub fn num_info_bits(&self) -> usize {
        self.0.iter().filter(|&&b| b == Bit::One).count()
    }
}

impl TryFrom<Vec<u8>> for Mask {
    type Error = Error;

    fn try_from(values: Vec<u8>) -> Result<Self, Error> {
        Self::new(&values)
    }
}

impl From<Mask> for Vec<u8> {
    fn from(mask: Mask) -> Self {
        mask.0.into_iter().map(u8::from).collect()
    }
}

/// Checks that a mask length is a power of `2`.
fn check_length(len: usize) -> Result<(), Error> {
    if len.is_power_of_two() {
        Ok(())
    } else {
        Err(Error::InvalidMask(format!(
            "Mask length must be a power of 2 (found {len})"
        )))
    }
}

/// Returns natural logarithms of the Bhattacharyya parameters of all synthesized bit channels.
///
/// The first half of the positions sees the degraded channel `W(z) = 2z - z^2` of the top-level
/// transform and the second half the upgraded channel `B(z) = z^2`, recursively.
fn log_bhattacharyya_parameters(code_length: usize, design_snr_db: f64) -> Vec<f64> {
    let mut log_z = vec![-(10f64.powf(0.1 * design_snr_db))];
    while log_z.len() < code_length {
        log_z = log_z
            .iter()
            .flat_map(|&x| [x + (2.0 - x.exp()).ln(), 2.0 * x])
            .collect();
    }
    log_z
}

#[cfg(test)]
mod tests_of_mask {
    use super::*;
    use Bit::{One, Zero};

    #[test]
    fn test_new() {
        // Invalid input
        assert!(Mask::new(&[]).is_err());
        assert!(Mask::new(&[0, 1, 1]).is_err());
        assert!(Mask::new(&[0, 1, 1, 1, 0, 0]).is_err());
        assert!(Mask::new(&[0, 1, 3, 1]).is_err());
        // Valid input
        assert_eq!(Mask::new(&[1]).unwrap().bits(), [One]);
        let mask = Mask::new(&[0, 0, 1, 1]).unwrap();
        assert_eq!(mask.bits(), [Zero, Zero, One, One]);
        assert_eq!(mask.len(), 4);
        assert!(!mask.is_empty());
    }

    #[test]
    fn test_from_bits() {
        assert!(Mask::from_bits(vec![Zero, One, One]).is_err());
        assert!(Mask::from_bits(vec![Zero, One]).is_ok());
    }

    #[test]
    fn test_info_positions() {
        let mask = Mask::new(&[0, 0, 0, 0, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1]).unwrap();
        assert_eq!(mask.info_positions(), [5, 6, 7, 9, 10, 11, 12, 13, 14, 15]);
        assert_eq!(mask.num_info_bits(), 10);
    }

    #[test]
    fn test_bhattacharyya() {
        // Invalid input
        assert!(Mask::bhattacharyya(12, 4, 0.0).is_err());
        assert!(Mask::bhattacharyya(8, 9, 0.0).is_err());
        // Valid input
        let mask = Mask::bhattacharyya(8, 4, 0.0).unwrap();
        assert_eq!(mask.info_positions(), [3, 5, 6, 7]);
        assert_eq!(Mask::bhattacharyya(8, 0, 0.0).unwrap().num_info_bits(), 0);
        assert_eq!(Mask::bhattacharyya(8, 8, 0.0).unwrap().num_info_bits(), 8);
        let mask = Mask::bhattacharyya(1024, 512, 1.0).unwrap();
        assert_eq!(mask.num_info_bits(), 512);
        // Last position is always the most reliable, first position the least reliable
        assert_eq!(mask.bits()[1023], One);
        assert_eq!(mask.bits()[0], Zero);
    }

    #[test]
    fn test_log_bhattacharyya_parameters() {
        let log_z = log_bhattacharyya_parameters(2, 0.0);
        let z0 = (-1f64).exp();
        assert!((log_z[0].exp() - (2.0 * z0 - z0 * z0)).abs() < 1e-12);
        assert!((log_z[1].exp() - z0 * z0).abs() < 1e-12);
    }

    #[test]
    fn test_serde() {
        let mask: Mask = serde_json::from_str("[0, 1, 1, 1]").unwrap();
        assert_eq!(mask.bits(), [Zero, One, One, One]);
        assert_eq!(serde_json::to_string(&mask).unwrap(), "[0,1,1,1]");
        assert!(serde_json::from_str::<Mask>("[0, 1, 1]").is_err());
        assert!(serde_json::from_str::<Mask>("[0, 5]").is_err());
    }
}
