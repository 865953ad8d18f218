//! Device-balanced sharding of delimited sensor data across analysis
//! subprocesses.
//!
//! The pipeline ingests one pipe-delimited file of sensor rows and fans
//! its rows out to `N` external analyzer processes, keeping every row of
//! a device in the same shard:
//!
//! ```text
//! mapping (A) -> line scan (B) -> device index (C) -> LPT partition (D)
//!      -> chunk queue (E) -> worker pool + socket IPC (F) -> totals (G)
//! ```
//!
//! - [`mapping`] maps the whole file read-only; everything downstream
//!   stores offsets into it, so the map is the single owner of the
//!   backing region.
//! - [`scan`] finds every data row in parallel, with block boundaries
//!   realigned so no row is seen twice.
//! - [`index`] groups rows by device id (FNV-1a chained table, sharded
//!   lock-free build).
//! - [`partition`] assigns whole devices to exactly `N` chunks,
//!   heaviest-first, so per-chunk row counts stay balanced.
//! - [`queue`] hands chunks to [`worker`]s, which stream each chunk to a
//!   freshly spawned analyzer over a Unix socket and collect the reply.
//! - [`orchestrator`] composes the stages and aggregates tallies;
//!   [`events`] carries structured JSONL telemetry; [`errors`] defines
//!   the per-stage failure taxonomy.

pub mod cli;
pub mod errors;
pub mod events;
pub mod index;
pub mod mapping;
pub mod orchestrator;
pub mod partition;
pub mod queue;
pub mod scan;
pub mod worker;

pub use errors::{ChunkError, FatalError, IndexError, MapError};
pub use index::{locate_column, DeviceIndex, DeviceTable};
pub use mapping::SourceMap;
pub use orchestrator::{run, RunConfig, RunSummary};
pub use partition::{partition, Chunk};
pub use queue::{ChunkQueue, WorkItem};
pub use scan::{line_at, scan_lines, LineIndex};
pub use worker::{run_pool, WorkerConfig, WorkerOutcome, WorkerStats};
