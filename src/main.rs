//
// Copyright © 2023 Arm Limited. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//

mod error;
mod plot;
mod trace;

use anyhow::Context;
use clap::{ArgAction, Parser};
use log::info;
use std::{
    ffi::OsString,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    process::ExitCode,
};

use crate::trace::PopulationTrace;

/// Exit status when no input file was given.
const USAGE_EXIT: u8 = 1;
/// Exit status for fatal errors while reading the trace or drawing the chart.
const FATAL_EXIT: u8 = 2;

/// Plots the population of complexes over simulated time from a simulation trace
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_override_self = true)]
struct Args {
    /// Trace file(s) to read. Only the last one given is plotted.
    /// The chart is written next to it, with ".png" appended to its name
    #[arg(value_name = "INPUT_FILE")]
    input_files: Vec<PathBuf>,

    /// Colon-separated list of complexes to plot. All complexes are plotted if empty
    #[arg(short = 'c', value_name = "COMPLEX_LIST", allow_hyphen_values = true)]
    complexes: Option<String>,

    /// Reduce points density: only plot every Nth iteration
    #[arg(long = "rpd", value_name = "N", default_value = "1")]
    reduce_points_density: NonZeroUsize,

    /// Also save the aligned population series as JSON to this file
    #[arg(long, value_name = "PATH")]
    series_json: Option<PathBuf>,

    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

// clap has no multi-letter short flags, so accept the single-dash spelling of `--rpd`.
// The value following `-c` is a complex list and is never rewritten.
fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    let mut after_complex_flag = false;
    args.into_iter()
        .map(|arg| {
            let is_value = std::mem::replace(&mut after_complex_flag, arg == "-c");
            if is_value {
                return arg;
            }
            let long = arg
                .to_str()
                .and_then(|s| s.strip_prefix("-rpd"))
                .filter(|rest| rest.is_empty() || rest.starts_with('='))
                .map(|rest| OsString::from(format!("--rpd{rest}")));
            long.unwrap_or(arg)
        })
        .collect()
}

fn parse_complex_list(list: Option<&str>) -> Vec<String> {
    match list {
        None | Some("") => vec![],
        Some(list) => list.split(':').map(str::to_string).collect(),
    }
}

fn print_usage() {
    let program = std::env::args_os()
        .next()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| "population_grapher".to_string());
    println!("Usage: {program} <input_file> [ -c complex_list ] [ -rpd N ]");
    println!("complex_list is a colon-separated list of complexes to plot; -rpd N plots only every Nth point.");
}

fn run(args: &Args, input: &Path) -> anyhow::Result<()> {
    let trace = PopulationTrace::from_path(input)
        .with_context(|| format!("reading trace {}", input.display()))?;
    info!(
        "Read {} iterations of {} complexes from {}",
        trace.iterations(),
        trace.complex_names().len(),
        input.display()
    );

    // Resolved before anything is written, so an unknown complex leaves no output behind
    let selection = parse_complex_list(args.complexes.as_deref());
    let series = plot::select_series(&trace, &selection, args.reduce_points_density)?;

    if let Some(json_path) = &args.series_json {
        trace
            .write_json(json_path)
            .with_context(|| format!("saving series JSON to {}", json_path.display()))?;
        info!("Saved series JSON to {}", json_path.display());
    }

    let output = plot::output_path(input);
    plot::draw(&output, &series).context("drawing the population chart")?;

    println!("Saved {} series to {}", series.len(), output.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse_from(normalize_args(std::env::args_os()));

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let Some(input) = args.input_files.last() else {
        print_usage();
        return ExitCode::from(USAGE_EXIT);
    };

    match run(&args, input) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(FATAL_EXIT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(normalize_args(args.iter().map(OsString::from))).unwrap()
    }

    #[test]
    fn test_single_dash_rpd() {
        let args = normalize_args(["prog", "-rpd", "4", "-rpd=2", "-rpdx", "-c"].map(OsString::from));
        assert_eq!(args, ["prog", "--rpd", "4", "--rpd=2", "-rpdx", "-c"].map(OsString::from));
    }

    #[test]
    fn test_rpd_as_complex_list_value() {
        let args = normalize_args(["prog", "-c", "-rpd", "-rpd", "2"].map(OsString::from));
        assert_eq!(args, ["prog", "-c", "-rpd", "--rpd", "2"].map(OsString::from));

        let args = parse(&["prog", "trace.out", "-c", "-rpd", "-rpd", "2"]);
        assert_eq!(args.complexes.as_deref(), Some("-rpd"));
        assert_eq!(args.reduce_points_density.get(), 2);
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["prog", "trace.out"]);
        assert_eq!(args.input_files, vec![PathBuf::from("trace.out")]);
        assert_eq!(args.complexes, None);
        assert_eq!(args.reduce_points_density.get(), 1);
        assert_eq!(args.series_json, None);
    }

    #[test]
    fn test_flags_interleaved_with_input() {
        let args = parse(&["prog", "-rpd", "3", "first.out", "-c", "A:B(x)", "second.out"]);
        assert_eq!(args.input_files.last(), Some(&PathBuf::from("second.out")));
        assert_eq!(args.complexes.as_deref(), Some("A:B(x)"));
        assert_eq!(args.reduce_points_density.get(), 3);
    }

    #[test]
    fn test_repeated_option_last_wins() {
        let args = parse(&["prog", "-c", "A", "-c", "B", "trace.out", "-rpd", "2", "-rpd", "5"]);
        assert_eq!(args.complexes.as_deref(), Some("B"));
        assert_eq!(args.reduce_points_density.get(), 5);
    }

    #[test]
    fn test_zero_stride_rejected() {
        let result = Args::try_parse_from(normalize_args(
            ["prog", "trace.out", "-rpd", "0"].map(OsString::from),
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_input_parses() {
        let args = parse(&["prog", "-c", "A"]);
        assert!(args.input_files.is_empty());
    }

    #[test]
    fn test_complex_list() {
        assert!(parse_complex_list(None).is_empty());
        assert!(parse_complex_list(Some("")).is_empty());
        assert_eq!(parse_complex_list(Some("A")), vec!["A"]);
        assert_eq!(
            parse_complex_list(Some("A(x,y|1):B:C(s(p))")),
            vec!["A(x,y|1)", "B", "C(s(p))"]
        );
    }
}
