//! Error types for the sharding pipeline stages.
//!
//! Errors are stage-specific to keep diagnostics precise and avoid a
//! single monolithic error enum that grows unbounded. All enums are
//! `#[non_exhaustive]` to allow adding variants without breaking callers;
//! consumers should include a fallback match arm.
//!
//! # Policy
//! - [`MapError`] and [`IndexError`] occur before any worker starts and
//!   are fatal: the run is abandoned and resources are released.
//! - [`ChunkError`] is scoped to a single chunk: the worker records it,
//!   drops the chunk, and continues draining the queue.
//! - I/O errors preserve their source to keep diagnostics actionable.

use std::fmt;
use std::io;

/// Errors from opening and mapping the input file.
///
/// These occur before the line scan begins and typically indicate a
/// missing, unreadable, or empty input.
#[derive(Debug)]
#[non_exhaustive]
pub enum MapError {
    /// I/O error during open or metadata lookup.
    Io(io::Error),
    /// The file has zero length; there is nothing to map.
    EmptyFile,
    /// The kernel rejected the mapping request.
    Map(io::Error),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::EmptyFile => write!(f, "input file is empty"),
            Self::Map(err) => write!(f, "memory mapping failed: {err}"),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) | Self::Map(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MapError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Errors from locating the device column in the header.
#[derive(Debug)]
#[non_exhaustive]
pub enum IndexError {
    /// No header field matched the requested column name.
    ColumnNotFound {
        /// The column name that was searched for.
        name: String,
    },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnNotFound { name } => {
                write!(f, "column '{name}' not found in header")
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// Per-chunk dispatch errors.
///
/// A chunk that fails never poisons its worker: the error is counted in
/// the worker's stats, the subprocess (if launched) is reaped, the socket
/// file is removed, and the worker moves on to the next chunk.
#[derive(Debug)]
#[non_exhaustive]
pub enum ChunkError {
    /// Socket setup failed (bind, listen, or accept).
    Socket(io::Error),
    /// The analysis subprocess could not be launched.
    Spawn(io::Error),
    /// Writing the chunk to the subprocess failed.
    Send(io::Error),
    /// Reading the response failed; partial bytes are discarded.
    Recv(io::Error),
}

impl ChunkError {
    /// Short stable tag for stats and event output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Socket(_) => "socket",
            Self::Spawn(_) => "spawn",
            Self::Send(_) => "send",
            Self::Recv(_) => "recv",
        }
    }
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket(err) => write!(f, "socket error: {err}"),
            Self::Spawn(err) => write!(f, "subprocess launch failed: {err}"),
            Self::Send(err) => write!(f, "send to subprocess failed: {err}"),
            Self::Recv(err) => write!(f, "receive from subprocess failed: {err}"),
        }
    }
}

impl std::error::Error for ChunkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Socket(err) | Self::Spawn(err) | Self::Send(err) | Self::Recv(err) => Some(err),
        }
    }
}

/// Fatal pipeline errors surfaced to the binary's exit path.
///
/// Raised only before the worker phase; once workers are running, all
/// failures are per-chunk and the run completes.
#[derive(Debug)]
#[non_exhaustive]
pub enum FatalError {
    /// Mapping the input failed.
    Map(MapError),
    /// The device column could not be located.
    Index(IndexError),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(err) => write!(f, "{err}"),
            Self::Index(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Map(err) => Some(err),
            Self::Index(err) => Some(err),
        }
    }
}

impl From<MapError> for FatalError {
    fn from(err: MapError) -> Self {
        Self::Map(err)
    }
}

impl From<IndexError> for FatalError {
    fn from(err: IndexError) -> Self {
        Self::Index(err)
    }
}
