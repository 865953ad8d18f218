//! Per-chunk subprocess dispatch over a local stream socket.
//!
//! # Protocol
//!
//! For every chunk the worker:
//! 1. unlinks any stale socket file and binds a listener at
//!    `<dir>/uds_slice_<worker>.sock` (backlog 1),
//! 2. spawns the analyzer with `--uds-location <path>`,
//! 3. accepts, writes `header LF chunk-bytes`, and closes the
//!    connection (the analyzer reads to EOF),
//! 4. accepts a second connection on the same listener and reads the
//!    response to EOF into a fixed buffer,
//! 5. reaps the analyzer and unlinks the socket file.
//!
//! The analyzer contract is therefore: connect, read to EOF, reconnect,
//! write, close, exit. Two connections, half-duplex each.
//!
//! Accepts poll in non-blocking mode so an analyzer that dies without
//! connecting (or without responding) fails the chunk instead of
//! wedging the worker. A response connection that never arrives is
//! classified as a receive failure.

use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use crate::errors::ChunkError;
use crate::queue::WorkItem;

use super::WorkerConfig;

/// Poll interval while waiting for the analyzer to connect.
const ACCEPT_POLL: Duration = Duration::from_millis(2);

/// Socket filename for a worker id. The id keeps concurrent workers'
/// sockets from colliding.
pub(super) fn socket_path(dir: &Path, worker: usize) -> PathBuf {
    dir.join(format!("uds_slice_{worker}.sock"))
}

/// Removes the socket file when the exchange is over, success or not.
struct SocketGuard {
    path: PathBuf,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Sends one chunk to a freshly spawned analyzer and returns its
/// response bytes.
///
/// The analyzer is always reaped before this returns, on every path
/// where it was spawned. `recv_buf` is the caller's reusable receive
/// buffer (sized by [`WorkerConfig::recv_buf_len`]).
pub(super) fn dispatch_chunk(
    worker: usize,
    item: &WorkItem<'_>,
    cfg: &WorkerConfig,
    recv_buf: &mut [u8],
) -> Result<Vec<u8>, ChunkError> {
    let path = socket_path(&cfg.socket_dir, worker);

    // A previous run may have died without cleanup; the bind would fail
    // on the leftover file otherwise.
    let _ = fs::remove_file(&path);
    let listener = UnixListener::bind(&path).map_err(ChunkError::Socket)?;
    listener.set_nonblocking(true).map_err(ChunkError::Socket)?;
    let _guard = SocketGuard { path: path.clone() };

    let mut child = Command::new(&cfg.analyzer)
        .arg("--uds-location")
        .arg(&path)
        .stdin(Stdio::null())
        .spawn()
        .map_err(ChunkError::Spawn)?;

    let result = exchange(&listener, &mut child, item, recv_buf);

    // Reap unconditionally: a failed exchange tears down the listener
    // and the connection, which unblocks the analyzer's reads/writes and
    // lets it exit.
    let _ = child.wait();

    result
}

fn exchange(
    listener: &UnixListener,
    child: &mut Child,
    item: &WorkItem<'_>,
    recv_buf: &mut [u8],
) -> Result<Vec<u8>, ChunkError> {
    // Send phase: header, LF, then the chunk rows.
    let mut conn = accept_or_reap(listener, child, ChunkError::Socket)?;
    send_payload(&mut conn, item).map_err(ChunkError::Send)?;
    drop(conn);

    // Receive phase: the analyzer reconnects to deliver its output.
    let mut conn = accept_or_reap(listener, child, |err| {
        // No response connection ever arrived: the chunk produced no
        // bytes, which is a receive failure, not a socket-setup one.
        ChunkError::Recv(err)
    })?;
    let mut response = Vec::new();
    loop {
        match conn.read(recv_buf) {
            Ok(0) => break,
            Ok(n) => response.extend_from_slice(&recv_buf[..n]),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ChunkError::Recv(e)),
        }
    }
    Ok(response)
}

fn send_payload(conn: &mut UnixStream, item: &WorkItem<'_>) -> io::Result<()> {
    conn.write_all(item.header)?;
    conn.write_all(b"\n")?;
    conn.write_all(&item.chunk.data)?;
    conn.flush()
}

/// Accepts a connection, polling so a dead analyzer cannot wedge the
/// worker.
///
/// If the child exits, one final accept drains a connection it may have
/// made just before dying; only then is the wait abandoned. `classify`
/// maps the no-connection outcome to the caller's error phase.
fn accept_or_reap(
    listener: &UnixListener,
    child: &mut Child,
    classify: impl Fn(io::Error) -> ChunkError,
) -> Result<UnixStream, ChunkError> {
    loop {
        match listener.accept() {
            Ok((conn, _)) => {
                conn.set_nonblocking(false).map_err(ChunkError::Socket)?;
                return Ok(conn);
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                let exited = matches!(child.try_wait(), Ok(Some(_)));
                if exited {
                    // Drain a race: connect then immediate exit still
                    // leaves the connection queued on the listener.
                    match listener.accept() {
                        Ok((conn, _)) => {
                            conn.set_nonblocking(false).map_err(ChunkError::Socket)?;
                            return Ok(conn);
                        }
                        Err(ref e2) if e2.kind() == io::ErrorKind::WouldBlock => {
                            return Err(classify(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "analyzer exited without connecting",
                            )));
                        }
                        Err(e2) => return Err(ChunkError::Socket(e2)),
                    }
                }
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => return Err(ChunkError::Socket(e)),
        }
    }
}
