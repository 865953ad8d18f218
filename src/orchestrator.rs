//! End-to-end run composition.
//!
//! Stage order: map the file, scan rows in parallel, build the device
//! index, locate the keyed column, partition into one chunk per worker,
//! enqueue everything and close the queue, run the worker pool, then
//! aggregate per-worker tallies. Resources unwind in reverse order of
//! acquisition: the worker scope joins before the queue, index, and
//! mapping drop, so no borrowed state can outlive the map.
//!
//! Fatal errors occur only before workers start. Once the pool is
//! running, every failure is per-chunk and the run completes with a
//! summary.

use std::path::PathBuf;
use std::time::Instant;

use crate::errors::FatalError;
use crate::events::{EventSink, RunEvent, StageEvent, SummaryEvent, WorkerEvent};
use crate::index::{locate_column, DeviceIndex};
use crate::mapping::SourceMap;
use crate::partition::partition;
use crate::queue::{ChunkQueue, WorkItem};
use crate::scan::scan_lines;
use crate::worker::{run_pool, WorkerConfig, WorkerOutcome, DEFAULT_RECV_BUF_LEN};

/// Default analyzer command, matching the layout this tool is usually
/// deployed next to. Overridable; the core treats it as an opaque
/// executable implementing the socket protocol.
pub const DEFAULT_ANALYZER: &str = "./src/script/analyze_data.py";

/// Default device column name.
pub const DEFAULT_COLUMN: &str = "device";

/// Everything a run needs to know.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Input file path.
    pub input: PathBuf,
    /// Header name of the device column.
    pub column: String,
    /// Worker count override; `None` means one per available processor.
    pub workers: Option<usize>,
    /// Analyzer executable.
    pub analyzer: PathBuf,
    /// Directory for the per-worker socket files.
    pub socket_dir: PathBuf,
    /// Subtract one row per non-empty worker result, compensating for
    /// analyzers that re-emit the header as their first output row.
    pub strip_response_header: bool,
    /// Per-worker receive buffer size.
    pub recv_buf_len: usize,
}

impl RunConfig {
    /// Defaults for `input`: `device` column, one worker per processor,
    /// sockets in `/tmp`, header compensation on.
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            column: DEFAULT_COLUMN.to_string(),
            workers: None,
            analyzer: PathBuf::from(DEFAULT_ANALYZER),
            socket_dir: PathBuf::from("/tmp"),
            strip_response_header: true,
            recv_buf_len: DEFAULT_RECV_BUF_LEN,
        }
    }

    fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| num_cpus::get())
            .max(1)
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Data rows found by the scan.
    pub data_lines: usize,
    /// Distinct devices in the index.
    pub devices: usize,
    /// Rows skipped during indexing.
    pub malformed_lines: usize,
    /// Workers (and chunks) in the run.
    pub workers: usize,
    /// Aggregate response-row tally, after header compensation.
    pub total_tally: u64,
    /// Per-worker outputs, ordered by worker id.
    pub outcomes: Vec<WorkerOutcome>,
    /// Wall-clock duration of the whole run in milliseconds.
    pub elapsed_ms: u64,
}

/// Runs the full pipeline for `cfg`, emitting stage/worker/summary
/// events into `events`.
pub fn run(cfg: &RunConfig, events: &dyn EventSink) -> Result<RunSummary, FatalError> {
    let t_run = Instant::now();

    let t_stage = Instant::now();
    let map = SourceMap::open(&cfg.input)?;
    events.emit(RunEvent::Stage(StageEvent {
        stage: "map",
        elapsed_ms: t_stage.elapsed().as_millis() as u64,
        items: map.len() as u64,
    }));

    let workers = cfg.worker_count();
    let bytes = map.bytes();

    let t_stage = Instant::now();
    let lines = scan_lines(bytes, workers);
    events.emit(RunEvent::Stage(StageEvent {
        stage: "scan",
        elapsed_ms: t_stage.elapsed().as_millis() as u64,
        items: lines.len() as u64,
    }));

    let column = locate_column(lines.header(bytes), &cfg.column)?;

    let t_stage = Instant::now();
    let index = DeviceIndex::build(bytes, &lines, column, workers);
    events.emit(RunEvent::Stage(StageEvent {
        stage: "index",
        elapsed_ms: t_stage.elapsed().as_millis() as u64,
        items: index.device_count() as u64,
    }));

    let t_stage = Instant::now();
    let chunks = partition(bytes, &index, workers);
    debug_assert_eq!(chunks.len(), workers);
    events.emit(RunEvent::Stage(StageEvent {
        stage: "partition",
        elapsed_ms: t_stage.elapsed().as_millis() as u64,
        items: chunks.len() as u64,
    }));

    // All chunks are enqueued before any worker starts, so the bounded
    // queue (capacity = worker count) never blocks the producer, and a
    // closed empty queue is each worker's exit signal.
    let header = lines.header(bytes);
    let queue = ChunkQueue::new(workers);
    let chunk_count = chunks.len();
    for chunk in chunks {
        queue.enqueue(WorkItem { header, chunk });
    }
    queue.close();

    let worker_cfg = WorkerConfig {
        analyzer: cfg.analyzer.clone(),
        socket_dir: cfg.socket_dir.clone(),
        recv_buf_len: cfg.recv_buf_len,
    };

    let t_stage = Instant::now();
    let outcomes = run_pool(&queue, workers, &worker_cfg);
    events.emit(RunEvent::Stage(StageEvent {
        stage: "dispatch",
        elapsed_ms: t_stage.elapsed().as_millis() as u64,
        items: queue.dequeued(),
    }));
    debug_assert_eq!(queue.depth(), 0);

    let mut total_tally = 0u64;
    for outcome in &outcomes {
        let tally = if cfg.strip_response_header && !outcome.output.is_empty() {
            outcome.lines.saturating_sub(1)
        } else {
            outcome.lines
        };
        total_tally += tally;
        events.emit(RunEvent::Worker(WorkerEvent {
            worker: outcome.id as u64,
            chunks_processed: outcome.stats.chunks_processed,
            chunks_failed: outcome.stats.chunks_failed,
            bytes_received: outcome.stats.bytes_received,
            lines: outcome.lines,
        }));
    }

    let summary = RunSummary {
        data_lines: lines.len(),
        devices: index.device_count(),
        malformed_lines: index.malformed_lines(),
        workers,
        total_tally,
        outcomes,
        elapsed_ms: t_run.elapsed().as_millis() as u64,
    };

    events.emit(RunEvent::Summary(SummaryEvent {
        status: "complete",
        elapsed_ms: summary.elapsed_ms,
        data_lines: summary.data_lines as u64,
        devices: summary.devices as u64,
        malformed_lines: summary.malformed_lines as u64,
        workers: summary.workers as u64,
        chunks: chunk_count as u64,
        tally: summary.total_tally,
    }));
    events.flush();

    // `queue`, `index`, `lines`, and finally `map` drop here, in reverse
    // order of acquisition; all workers joined inside `run_pool`.
    Ok(summary)
}
