//! Command-line parsing for the `slicer-rs` binary.
//!
//! Hand-rolled (no clap dependency) to keep binary size small and boot
//! fast.
//!
//! # Grammar
//!
//! ```text
//! slicer-rs <file.csv> [<device-column>] [OPTIONS]
//! slicer-rs --help | -h
//! ```
//!
//! The input must carry a `.csv` extension; anything else is rejected
//! before the file is even opened.

use std::env;
use std::path::{Path, PathBuf};

use crate::orchestrator::RunConfig;

/// Parsed invocation: the run configuration plus presentation flags.
pub struct CliConfig {
    pub run: RunConfig,
    /// Suppress JSONL events and the result preview.
    pub quiet: bool,
}

/// Parse `std::env::args_os()` into a [`CliConfig`].
///
/// Exits the process with code 2 on invalid arguments, printing a
/// diagnostic and usage summary to stderr.
pub fn parse_args() -> CliConfig {
    let mut args = env::args_os();
    let exe = args.next().unwrap_or_else(|| "slicer-rs".into());

    let mut input: Option<PathBuf> = None;
    let mut column: Option<String> = None;
    let mut workers: Option<usize> = None;
    let mut analyzer: Option<PathBuf> = None;
    let mut socket_dir: Option<PathBuf> = None;
    let mut keep_response_header = false;
    let mut quiet = false;

    for arg in args {
        if let Some(flag) = arg.to_str() {
            if let Some(rest) = flag.strip_prefix("--column=") {
                column = Some(rest.to_string());
                continue;
            }
            if let Some(rest) = flag.strip_prefix("--workers=") {
                let n: usize = parse_or_exit(rest, "--workers");
                if n == 0 {
                    eprintln!("--workers must be >= 1");
                    std::process::exit(2);
                }
                workers = Some(n);
                continue;
            }
            if let Some(rest) = flag.strip_prefix("--analyzer=") {
                analyzer = Some(PathBuf::from(rest));
                continue;
            }
            if let Some(rest) = flag.strip_prefix("--socket-dir=") {
                socket_dir = Some(PathBuf::from(rest));
                continue;
            }
            match flag {
                "--keep-response-header" => {
                    keep_response_header = true;
                    continue;
                }
                "--quiet" | "-q" => {
                    quiet = true;
                    continue;
                }
                "--help" | "-h" => {
                    print_usage(&exe);
                    std::process::exit(0);
                }
                _ if flag.starts_with("--") => {
                    eprintln!("unknown flag: {flag}");
                    print_usage(&exe);
                    std::process::exit(2);
                }
                _ => {}
            }
        }

        // Positionals: input path first, then the device column name.
        if input.is_none() {
            input = Some(PathBuf::from(arg));
        } else if column.is_none() {
            column = Some(arg.to_string_lossy().into_owned());
        } else {
            eprintln!("error: too many positional arguments");
            print_usage(&exe);
            std::process::exit(2);
        }
    }

    let Some(input) = input else {
        eprintln!("error: an input file is required");
        print_usage(&exe);
        std::process::exit(2);
    };

    if !has_csv_extension(&input) {
        eprintln!(
            "error: input must have a .csv extension: {}",
            input.display()
        );
        std::process::exit(2);
    }

    let mut run = RunConfig::new(input);
    if let Some(column) = column {
        run.column = column;
    }
    run.workers = workers;
    if let Some(analyzer) = analyzer {
        run.analyzer = analyzer;
    }
    if let Some(socket_dir) = socket_dir {
        run.socket_dir = socket_dir;
    }
    run.strip_response_header = !keep_response_header;

    CliConfig { run, quiet }
}

/// True when `path` ends in a literal `.csv` extension.
pub fn has_csv_extension(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "csv")
}

fn parse_or_exit<T: std::str::FromStr>(s: &str, flag: &str) -> T {
    s.parse().unwrap_or_else(|_| {
        eprintln!("invalid {flag} value: {s}");
        std::process::exit(2);
    })
}

fn print_usage(exe: &std::ffi::OsStr) {
    eprintln!(
        "usage: {} <file.csv> [<device-column>] [OPTIONS]

ARGS:
    <file.csv>                Input file (record separator LF, fields '|')
    <device-column>           Header name of the device column (default: device)

OPTIONS:
    --column=<name>           Device column name (same as the positional)
    --workers=<N>             Worker threads (default: processor count)
    --analyzer=<path>         Analyzer executable spawned per chunk
    --socket-dir=<dir>        Directory for worker sockets (default: /tmp)
    --keep-response-header    Do not subtract a header row from each
                              non-empty worker response
    --quiet, -q               Suppress JSONL events and the result preview
    --help, -h                Show this help",
        exe.to_string_lossy()
    );
}
