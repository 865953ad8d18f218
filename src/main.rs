use std::io;
use std::process::ExitCode;

use slicer_rs::cli;
use slicer_rs::events::{EventSink, JsonlEventSink, NullEventSink};
use slicer_rs::orchestrator::{run, RunSummary};
use slicer_rs::scan::line_at;

/// Rows shown per worker in the result preview.
const PREVIEW_LINES: usize = 10;

fn main() -> ExitCode {
    let cli = cli::parse_args();

    let events: Box<dyn EventSink> = if cli.quiet {
        Box::new(NullEventSink)
    } else {
        Box::new(JsonlEventSink::new(io::stdout()))
    };

    let summary = match run(&cli.run, events.as_ref()) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("slicer-rs: {err}");
            return ExitCode::FAILURE;
        }
    };

    if !cli.quiet {
        print_preview(&summary);
    }

    eprintln!(
        "data_lines={} devices={} malformed={} workers={} tally={} elapsed_ms={}",
        summary.data_lines,
        summary.devices,
        summary.malformed_lines,
        summary.workers,
        summary.total_tally,
        summary.elapsed_ms,
    );

    ExitCode::SUCCESS
}

/// Prints the first few response rows per worker, the way an operator
/// sanity-checks a run without paging through the full output.
fn print_preview(summary: &RunSummary) {
    for outcome in &summary.outcomes {
        if outcome.output.is_empty() {
            continue;
        }
        eprintln!("worker {}: {} response lines", outcome.id, outcome.lines);
        let mut pos = 0;
        for _ in 0..PREVIEW_LINES {
            if pos >= outcome.output.len() {
                break;
            }
            let line = line_at(&outcome.output, pos);
            eprintln!("  {}", String::from_utf8_lossy(line));
            pos += line.len() + 1;
        }
    }
}
