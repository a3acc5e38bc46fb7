//! This crate decodes frames of LLR values for a polar code with the RC-SCAN decoder. Decoding
//! parameters are specified on the command line, frames are read from a JSON file, and decoding
//! results are saved to a JSON file. A summary of the results can optionally be reported to a
//! simulation coordination service.
//!
//! Build the executable with `cargo build --release` and then run `./target/release/polar-scan -h`
//! for help on the command-line interface.

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

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use clap::{crate_name, crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use polar_scan::batch::{self, BatchParams, BatchSummary};
use polar_scan::coordination::{Client, RouteParams};
use polar_scan::{Mask, ScanAlgo};
use serde_json::{Map, Value};
use tracing::{info, warn, Level};

/// Main function
fn main() -> Result<()> {
    let timer = Instant::now();
    let matches = command_line_parser().get_matches();
    tracing_subscriber::fmt()
        .with_max_level(log_level_from_matches(&matches))
        .with_writer(std::io::stderr)
        .init();
    let params = batch_params(&matches)?;
    info!(
        code_length = params.mask.len(),
        num_info_bits = params.mask.num_info_bits(),
        systematic = params.systematic,
        "{}",
        params.scan_algo
    );
    let summary = batch::run_batch(
        &params,
        Path::new(&frames_filename_from_matches(&matches)),
        Path::new(&json_filename_from_matches(&matches)),
    )?;
    if let Some(url) = report_url_from_matches(&matches) {
        report_summary(&url, &summary, &route_params(&matches));
    }
    info!("Elapsed time: {:.3?}", timer.elapsed());
    Ok(())
}

/// Returns command line parser.
fn command_line_parser() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about("Decodes frames of LLR values for a polar code with the RC-SCAN decoder")
        .arg(mask_filename())
        .arg(code_length())
        .arg(num_info_bits())
        .arg(design_snr_db())
        .arg(scan_algo_name())
        .arg(num_scan_iter())
        .arg(systematic())
        .arg(frames_filename())
        .arg(json_filename())
        .arg(report_url())
        .arg(code_id())
        .arg(code_type())
        .arg(channel_type())
        .arg(log_level())
}

/// Returns argument for name of JSON file with the frozen-bit mask.
fn mask_filename() -> Arg {
    Arg::new("mask_filename")
        .short('m')
        .help("Name of JSON file with the frozen-bit mask (overrides -n, -k and -d)")
}

/// Returns argument for code length.
fn code_length() -> Arg {
    Arg::new("code_length")
        .short('n')
        .value_parser(value_parser!(u32))
        .default_value("128")
        .help("Code length (power of 2)")
}

/// Returns argument for number of information bits.
fn num_info_bits() -> Arg {
    Arg::new("num_info_bits")
        .short('k')
        .value_parser(value_parser!(u32))
        .default_value("64")
        .help("Number of information bits")
}

/// Returns argument for design Es/N0 (dB).
fn design_snr_db() -> Arg {
    Arg::new("design_snr_db")
        .short('d')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("0.0")
        .help("Design Es/N0 (dB) for mask construction")
}

/// Returns argument for combine rule name.
fn scan_algo_name() -> Arg {
    Arg::new("scan_algo_name")
        .short('a')
        .value_parser(["MinSum", "BoxPlus"])
        .default_value("MinSum")
        .help("Check-node combine rule name")
}

/// Returns argument for number of SCAN iterations.
fn num_scan_iter() -> Arg {
    Arg::new("num_scan_iter")
        .short('t')
        .value_parser(value_parser!(u32).range(1 ..))
        .default_value("1")
        .help("Number of SCAN iterations")
}

/// Returns flag for systematic decoding.
fn systematic() -> Arg {
    Arg::new("systematic")
        .short('s')
        .action(ArgAction::SetTrue)
        .help("Read information bits from the codeword rather than the source vector")
}

/// Returns argument for name of JSON file with the received frames.
fn frames_filename() -> Arg {
    Arg::new("frames_filename")
        .short('i')
        .default_value("frames.json")
        .help("Name of JSON file with the received frames")
}

/// Returns argument for name of JSON file to which results must be saved.
fn json_filename() -> Arg {
    Arg::new("json_filename")
        .short('f')
        .default_value("results.json")
        .help("Name of JSON file to which results must be saved")
}

/// Returns argument for URL of coordination service.
fn report_url() -> Arg {
    Arg::new("report_url")
        .short('u')
        .help("URL of coordination service to which the summary must be reported")
}

/// Returns argument for code identifier.
fn code_id() -> Arg {
    Arg::new("code_id")
        .short('c')
        .value_parser(value_parser!(u64))
        .default_value("0")
        .help("Code identifier for the coordination service")
}

/// Returns argument for code type.
fn code_type() -> Arg {
    Arg::new("code_type")
        .long("code-type")
        .default_value("polar")
        .help("Code type for the coordination service")
}

/// Returns argument for channel type.
fn channel_type() -> Arg {
    Arg::new("channel_type")
        .long("channel-type")
        .default_value("awgn")
        .help("Channel type for the coordination service")
}

/// Returns argument for log level.
fn log_level() -> Arg {
    Arg::new("log_level")
        .short('l')
        .value_parser(["error", "warn", "info", "debug", "trace"])
        .default_value("info")
        .help("Log level")
}

/// Returns batch decoding parameters based on command-line arguments.
fn batch_params(matches: &ArgMatches) -> Result<BatchParams> {
    let mask = match matches.get_one::<String>("mask_filename") {
        Some(filename) => serde_json::from_reader(BufReader::new(File::open(filename)?))?,
        None => Mask::bhattacharyya(
            usize::try_from(code_length_from_matches(matches))?,
            usize::try_from(num_info_bits_from_matches(matches))?,
            design_snr_db_from_matches(matches),
        )?,
    };
    Ok(BatchParams {
        mask,
        systematic: matches.get_flag("systematic"),
        scan_algo: scan_algo_from_matches(matches),
    })
}

/// Sends batch summary to coordination service, logging any failure.
fn report_summary(url: &str, summary: &BatchSummary, route_params: &RouteParams) {
    let outcome = Client::new(url).and_then(|client| {
        let result = match serde_json::to_value(summary)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        client.save_result(&result, route_params)
    });
    match outcome {
        Ok(()) => info!(url, code_id = route_params.code_id, "Reported summary"),
        Err(e) => warn!(url, error = %e, "Could not report summary"),
    }
}

// OK to unwrap in the functions below: All arguments they read have default values.

/// Returns route parameters for the coordination service.
fn route_params(matches: &ArgMatches) -> RouteParams {
    RouteParams {
        code_id: *matches.get_one("code_id").unwrap(),
        code_type: matches.get_one::<String>("code_type").unwrap().to_string(),
        channel_type: matches
            .get_one::<String>("channel_type")
            .unwrap()
            .to_string(),
    }
}


/// Returns code length.
fn code_length_from_matches(matches: &ArgMatches) -> u32 {
    *matches.get_one("code_length").unwrap()
}

/// Returns number of information bits.
fn num_info_bits_from_matches(matches: &ArgMatches) -> u32 {
    *matches.get_one("num_info_bits").unwrap()
}

/// Returns design Es/N0 (dB).
fn design_snr_db_from_matches(matches: &ArgMatches) -> f64 {
    *matches.get_one("design_snr_db").unwrap()
}

/// Returns combine rule and number of SCAN iterations.
fn scan_algo_from_matches(matches: &ArgMatches) -> ScanAlgo {
    let num_scan_iter = *matches.get_one("num_scan_iter").unwrap();
    match matches
        .get_one::<String>("scan_algo_name")
        .unwrap()
        .as_str()
    {
        "MinSum" => ScanAlgo::MinSum(num_scan_iter),
        "BoxPlus" => ScanAlgo::BoxPlus(num_scan_iter),
        _ => panic!("Invalid combine rule name"),
    }
}

/// Returns name of JSON file with the received frames.
fn frames_filename_from_matches(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("frames_filename")
        .unwrap()
        .to_string()
}

/// Returns name of JSON file to which results must be saved.
fn json_filename_from_matches(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("json_filename")
        .unwrap()
        .to_string()
}

/// Returns URL of coordination service, if any.
fn report_url_from_matches(matches: &ArgMatches) -> Option<String> {
    matches.get_one::<String>("report_url").cloned()
}

/// Returns log level.
fn log_level_from_matches(matches: &ArgMatches) -> Level {
    match matches.get_one::<String>("log_level").unwrap().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}
