//! Batch decoding of received frames for a polar code
//!
//! Frames are read from a JSON file holding one vector of LLR values per frame, optionally along
//! with the transmitted codewords. Frames are decoded in parallel, with one decoder per worker
//! thread, and the decisions are saved to a JSON file together with a summary of the errors
//! with respect to the transmitted codewords.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{utils, Bit, Decoder, Error, Mask, ScanAlgo};

/// Parameters for batch decoding
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct BatchParams {
    /// Frozen-bit mask of the code
    pub mask: Mask,
    /// Whether the message is carried at the information positions of the codeword
    pub systematic: bool,
    /// Combine rule and number of SCAN iterations
    pub scan_algo: ScanAlgo,
}

impl BatchParams {
    /// Returns decoder for the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of SCAN iterations is `0`.
    pub fn decoder(&self) -> Result<Decoder, Error> {
        Decoder::from_mask(self.mask.clone(), self.systematic, self.scan_algo)
    }
}

/// Received frames, along with the transmitted codewords if known
#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct FrameSet {
    /// LLR values of each frame, with positive values indicating that `Zero` is more likely
    pub llr: Vec<Vec<f64>>,
    /// Transmitted codeword of each frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codewords: Option<Vec<Vec<u8>>>,
}

/// Decoding results for one frame
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct FrameResult {
    /// Decided codeword
    pub codeword: Vec<u8>,
    /// Decided information bits
    pub info_bits: Vec<u8>,
    /// Root-level belief
    pub result_beta: Vec<f64>,
}

/// Error counts for a batch of frames
#[derive(Clone, Eq, PartialEq, Debug, Copy, Default, Deserialize, Serialize)]
pub struct BatchSummary {
    /// Number of frames decoded
    pub num_frames: usize,
    /// Number of frames whose transmitted codeword is known
    pub num_checked_frames: usize,
    /// Number of checked frames with at least one codeword bit error
    pub num_frame_errors: usize,
    /// Total number of codeword bit errors in the checked frames
    pub num_bit_errors: usize,
}

impl BatchSummary {
    /// Returns frame error rate over the checked frames, or `None` if no frame was checked.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn frame_error_rate(&self) -> Option<f64> {
        (self.num_checked_frames > 0)
            .then(|| self.num_frame_errors as f64 / self.num_checked_frames as f64)
    }
}

/// Contents of a batch results file
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct BatchResults {
    /// Parameters used for decoding
    pub params: BatchParams,
    /// Error counts
    pub summary: BatchSummary,
    /// Results for each frame, in input order
    pub frames: Vec<FrameResult>,
}

/// Decodes frames read from a JSON file, and saves the results to a JSON file.
///
/// # Parameters
///
/// - `params`: Parameters for batch decoding.
///
/// - `input_path`: JSON file with a [`FrameSet`].
///
/// - `output_path`: JSON file to which the [`BatchResults`] must be saved.
///
/// # Returns
///
/// - `summary`: Error counts for the batch.
///
/// # Errors
///
/// Returns an error if either file cannot be read or written, if the input is not a valid frame
/// set, if any frame has the wrong number of LLR values, or if any transmitted codeword is
/// invalid.
pub fn run_batch(
    params: &BatchParams,
    input_path: &Path,
    output_path: &Path,
) -> Result<BatchSummary, Error> {
    let frame_set: FrameSet = serde_json::from_reader(BufReader::new(File::open(input_path)?))?;
    debug!(
        num_frames = frame_set.llr.len(),
        path = %input_path.display(),
        "read frames"
    );
    let frames = decode_frames(params, &frame_set.llr)?;
    let summary = summarize(&frames, frame_set.codewords.as_deref())?;
    info!(
        num_frames = summary.num_frames,
        num_frame_errors = summary.num_frame_errors,
        num_bit_errors = summary.num_bit_errors,
        "{}",
        params.scan_algo
    );
    let results = BatchResults {
        params: params.clone(),
        summary,
        frames,
    };
    serde_json::to_writer_pretty(BufWriter::new(File::create(output_path)?), &results)?;
    Ok(summary)
}

/// Returns decoding results for given frames, in input order.
///
/// # Errors
///
/// Returns an error if the number of SCAN iterations is `0`, or if any frame has the wrong number
/// of LLR values or a value that is not finite.
pub fn decode_frames(params: &BatchParams, llr: &[Vec<f64>]) -> Result<Vec<FrameResult>, Error> {
    let template = params.decoder()?;
    llr.par_iter()
        .map_init(
            || template.clone(),
            |decoder, frame_llr| decode_frame(decoder, frame_llr),
        )
        .collect()
}

/// Returns decoding results for one frame.
fn decode_frame(decoder: &mut Decoder, frame_llr: &[f64]) -> Result<FrameResult, Error> {
    let codeword = decoder.decode_llr(frame_llr)?;
    Ok(FrameResult {
        codeword: codeword.into_iter().map(u8::from).collect(),
        info_bits: decoder.info_bits()?.into_iter().map(u8::from).collect(),
        result_beta: decoder.result_beta()?.to_vec(),
    })
}

/// Returns error counts of decided codewords with respect to transmitted codewords.
///
/// # Errors
///
/// Returns an error if the number of transmitted codewords differs from the number of frames, or
/// if any transmitted codeword has the wrong length or a value other than `0` and `1`.
pub fn summarize(
    frames: &[FrameResult],
    codewords: Option<&[Vec<u8>]>,
) -> Result<BatchSummary, Error> {
    let mut summary = BatchSummary {
        num_frames: frames.len(),
        ..BatchSummary::default()
    };
    let Some(codewords) = codewords else {
        return Ok(summary);
    };
    if codewords.len() != frames.len() {
        return Err(Error::InvalidInput(format!(
            "Expected {} transmitted codewords (found {})",
            frames.len(),
            codewords.len()
        )));
    }
    for (frame, codeword) in frames.iter().zip(codewords) {
        if codeword.len() != frame.codeword.len() {
            return Err(Error::InvalidInput(format!(
                "Expected transmitted codeword of length {} (found {})",
                frame.codeword.len(),
                codeword.len()
            )));
        }
        let codeword = codeword
            .iter()
            .map(|&value| Bit::try_from(value))
            .collect::<Result<Vec<Bit>, Error>>()?;
        let codeword_hat = frame
            .codeword
            .iter()
            .map(|&value| Bit::try_from(value))
            .collect::<Result<Vec<Bit>, Error>>()?;
        let num_bit_errors = utils::error_count(&codeword_hat, &codeword);
        summary.num_checked_frames += 1;
        summary.num_bit_errors += num_bit_errors;
        if num_bit_errors > 0 {
            summary.num_frame_errors += 1;
        }
    }
    Ok(summary)
}
