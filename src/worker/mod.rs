//! Worker pool: drain the chunk queue, dispatch each chunk to an
//! analysis subprocess, collect responses.
//!
//! # Architecture
//!
//! ```text
//! ChunkQueue (shared, mutex-free channel)
//!   |  dequeue
//!   v
//! Worker 0: [bind socket -> spawn analyzer -> send -> recv -> reap] loop
//! Worker 1: ...
//! Worker N-1: queue drained and closed -> exit
//!
//! Per-worker (share-nothing):
//!   - own socket path (worker id in the filename)
//!   - own reusable receive buffer
//!   - own result buffer and stats
//! ```
//!
//! A failed chunk never poisons its worker: the error is counted, the
//! analyzer (if launched) is reaped, the socket file is removed, and the
//! worker loops. No lock is held across any blocking I/O; the only
//! shared mutable state is the queue.

mod ipc;

use std::path::PathBuf;
use std::thread;

use memchr::memchr_iter;

use crate::errors::ChunkError;
use crate::queue::ChunkQueue;

/// Default receive buffer size (1 MiB).
pub const DEFAULT_RECV_BUF_LEN: usize = 1024 * 1024;

/// Configuration shared by every worker in the pool.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Analyzer executable, launched once per chunk with
    /// `--uds-location <socket>`.
    pub analyzer: PathBuf,
    /// Directory the per-worker socket files live in.
    pub socket_dir: PathBuf,
    /// Size of each worker's reusable receive buffer.
    pub recv_buf_len: usize,
}

impl WorkerConfig {
    /// Config for `analyzer` with sockets in `/tmp` and the default
    /// receive buffer.
    pub fn new(analyzer: PathBuf) -> Self {
        Self {
            analyzer,
            socket_dir: PathBuf::from("/tmp"),
            recv_buf_len: DEFAULT_RECV_BUF_LEN,
        }
    }
}

/// Per-worker counters, aggregated into the run summary.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerStats {
    /// Chunks fully processed (response collected).
    pub chunks_processed: u64,
    /// Chunks dropped on any per-chunk error.
    pub chunks_failed: u64,
    /// Payload bytes sent (header + LF + chunk).
    pub bytes_sent: u64,
    /// Response bytes received.
    pub bytes_received: u64,
    /// Socket setup failures (bind/listen/accept).
    pub socket_errors: u64,
    /// Analyzer launch failures.
    pub spawn_errors: u64,
    /// Send/receive failures.
    pub io_errors: u64,
}

/// One worker's collected output.
#[derive(Debug)]
pub struct WorkerOutcome {
    /// Worker id (also the socket path discriminator).
    pub id: usize,
    /// Concatenated response bytes from every chunk this worker
    /// processed. Possibly empty.
    pub output: Vec<u8>,
    /// LF count over `output`.
    pub lines: u64,
    pub stats: WorkerStats,
}

impl WorkerOutcome {
    fn new(id: usize) -> Self {
        Self {
            id,
            output: Vec::new(),
            lines: 0,
            stats: WorkerStats::default(),
        }
    }
}

/// Runs `workers` threads until the queue is drained, returning one
/// outcome per worker, ordered by worker id.
pub fn run_pool(queue: &ChunkQueue<'_>, workers: usize, cfg: &WorkerConfig) -> Vec<WorkerOutcome> {
    let workers = workers.max(1);
    let mut outcomes = Vec::with_capacity(workers);
    thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|id| s.spawn(move || worker_loop(id, queue, cfg)))
            .collect();
        for handle in handles {
            outcomes.push(handle.join().expect("worker thread panicked"));
        }
    });
    outcomes
}

fn worker_loop(id: usize, queue: &ChunkQueue<'_>, cfg: &WorkerConfig) -> WorkerOutcome {
    let mut outcome = WorkerOutcome::new(id);
    let mut recv_buf = vec![0u8; cfg.recv_buf_len.max(1)];

    while let Some(item) = queue.dequeue() {
        let sent = item.header.len() as u64 + 1 + item.chunk.data.len() as u64;
        match ipc::dispatch_chunk(id, &item, cfg, &mut recv_buf) {
            Ok(response) => {
                outcome.stats.chunks_processed += 1;
                outcome.stats.bytes_sent += sent;
                outcome.stats.bytes_received += response.len() as u64;
                outcome.lines += count_lf(&response);
                outcome.output.extend_from_slice(&response);
            }
            Err(err) => {
                outcome.stats.chunks_failed += 1;
                match err {
                    ChunkError::Socket(_) => outcome.stats.socket_errors += 1,
                    ChunkError::Spawn(_) => outcome.stats.spawn_errors += 1,
                    ChunkError::Send(_) | ChunkError::Recv(_) => outcome.stats.io_errors += 1,
                }
            }
        }
        // The chunk's buffer drops here, as soon as its result is
        // collected; peak memory stays bounded by in-flight chunks.
        drop(item);
    }

    outcome
}

/// Number of LF bytes in `bytes`.
#[inline]
fn count_lf(bytes: &[u8]) -> u64 {
    memchr_iter(b'\n', bytes).count() as u64
}
