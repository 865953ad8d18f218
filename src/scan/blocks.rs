//! Block partitioning for the parallel line scan.
//!
//! The mapping is divided into one contiguous block per scan thread.
//! Block boundaries are then realigned so that a row belongs to exactly
//! one block: each block after the first advances its start to the byte
//! immediately following the next LF at or after the naive split point,
//! and the removed prefix is absorbed by the previous block.
//!
//! After realignment every non-empty block starts at a genuine row start
//! (byte 0, or the byte after an LF), and every block except the last
//! ends on an LF. Rows therefore never straddle blocks, which is what
//! makes the per-block scans mergeable without a dedupe pass.

use memchr::memchr;

/// A half-open byte range of the mapping assigned to one scan thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Block {
    pub start: usize,
    pub end: usize,
}

impl Block {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// Splits `bytes` into `count` realigned blocks.
///
/// Always returns exactly `count` blocks (some possibly empty) covering
/// `bytes` without gaps or overlap. Starts are non-decreasing.
pub(crate) fn split_blocks(bytes: &[u8], count: usize) -> Vec<Block> {
    let count = count.max(1);
    let len = bytes.len();
    let base = len / count;

    // Naive split: every block gets `base` bytes, the last absorbs the
    // remainder. Realignment then moves each interior boundary forward
    // past the next LF.
    let mut starts = Vec::with_capacity(count + 1);
    starts.push(0);
    for i in 1..count {
        starts.push(realign(bytes, i * base));
    }
    starts.push(len);

    // Realigned starts are non-decreasing: a later naive split point can
    // only find its next LF at or after an earlier one. Blocks therefore
    // tile the input exactly, with empty blocks where realignment pushed
    // a start past the next naive boundary.
    debug_assert!(starts.windows(2).all(|w| w[0] <= w[1]));

    let blocks: Vec<Block> = starts
        .windows(2)
        .map(|w| Block {
            start: w[0],
            end: w[1],
        })
        .collect();

    debug_assert_eq!(blocks.len(), count);
    blocks
}

/// Advances `pos` to the byte immediately following the next LF at or
/// after it, or to the end of `bytes` if no LF remains.
#[inline]
fn realign(bytes: &[u8], pos: usize) -> usize {
    match memchr(b'\n', &bytes[pos..]) {
        Some(rel) => pos + rel + 1,
        None => bytes.len(),
    }
}
