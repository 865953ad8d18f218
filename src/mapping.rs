//! Read-only whole-file mapping.
//!
//! The input file is mapped once and treated as an immutable byte arena
//! for the rest of the run. Every downstream structure (line index,
//! device index, chunk plans) stores *offsets* into this region rather
//! than pointers, so the mapping is the only pointer-bearing owner and
//! nothing can outlive it by construction.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::errors::MapError;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// An immutable mapping of the whole input file.
///
/// Owns the backing region; dropping the value releases it. Callers hold
/// `&[u8]` borrows from [`SourceMap::bytes`] only while the map is alive,
/// which the borrow checker enforces.
#[derive(Debug)]
pub struct SourceMap {
    map: Mmap,
}

impl SourceMap {
    /// Opens `path` read-only and maps the entire file.
    ///
    /// Fails with [`MapError::Io`] on open/stat failure,
    /// [`MapError::EmptyFile`] for zero-length files (the kernel rejects
    /// zero-length mappings, and there is nothing to process anyway), and
    /// [`MapError::Map`] if the mapping itself fails.
    pub fn open(path: &Path) -> Result<Self, MapError> {
        let file = File::open(path).map_err(MapError::Io)?;
        let meta = file.metadata().map_err(MapError::Io)?;
        if meta.len() == 0 {
            return Err(MapError::EmptyFile);
        }

        // SAFETY: the input file is treated as immutable for the duration
        // of the run; the mapping is read-only and private.
        let map = unsafe { Mmap::map(&file) }.map_err(MapError::Map)?;
        advise_sequential(&file, &map);

        Ok(Self { map })
    }

    /// The mapped bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.map
    }

    /// Length of the mapped region in bytes. Never zero.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(unix)]
fn advise_sequential(file: &File, map: &Mmap) {
    // SAFETY: the descriptor is valid for the duration of `fadvise`, and
    // the mmap pointer/length are valid for `madvise`. Both calls are
    // advisory; errors are silently ignored.
    unsafe {
        #[cfg(target_os = "linux")]
        let _ = libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL);
        #[cfg(not(target_os = "linux"))]
        let _ = file;
        let _ = libc::madvise(
            map.as_ptr() as *mut libc::c_void,
            map.len(),
            libc::MADV_SEQUENTIAL,
        );
    }
}

#[cfg(not(unix))]
fn advise_sequential(_file: &File, _map: &Mmap) {}
