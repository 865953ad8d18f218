//! Scan completeness and determinism across thread counts.
//!
//! The parallel scan must agree with a naive single-pass reference for
//! every thread count: same row count, same row starts, no row counted
//! twice at a block boundary, none omitted.

use proptest::prelude::*;

use slicer_rs::scan::{line_at, scan_lines};

/// Naive reference: walk the bytes once, recording each row start, then
/// drop the header.
fn reference_data_starts(bytes: &[u8]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        starts.push(pos);
        match bytes[pos..].iter().position(|&b| b == b'\n') {
            Some(rel) => pos += rel + 1,
            None => break,
        }
    }
    if starts.is_empty() {
        starts
    } else {
        starts.split_off(1)
    }
}

/// Rows of printable bytes (possibly empty, possibly containing pipes),
/// assembled into a file with a header and an optional trailing LF.
fn file_strategy() -> impl Strategy<Value = Vec<u8>> {
    let row = proptest::collection::vec(
        prop_oneof![
            // Mostly field-ish bytes, some pipes.
            proptest::char::range('a', 'z').prop_map(|c| c as u8),
            Just(b'|'),
            proptest::num::u8::ANY.prop_filter("no LF inside a row", |&b| b != b'\n'),
        ],
        0..40,
    );
    let rows = proptest::collection::vec(row, 0..64);
    (rows, any::<bool>()).prop_map(|(rows, trailing_lf)| {
        let mut file = b"id|device|temp".to_vec();
        for row in &rows {
            file.push(b'\n');
            file.extend_from_slice(row);
        }
        if trailing_lf {
            file.push(b'\n');
        }
        file
    })
}

proptest! {
    #[test]
    fn scan_matches_reference_for_all_thread_counts(file in file_strategy()) {
        let expected = reference_data_starts(&file);
        for threads in [1usize, 2, 4, 8] {
            let index = scan_lines(&file, threads);
            prop_assert_eq!(index.starts(), expected.as_slice(), "threads={}", threads);
            prop_assert_eq!(index.len(), expected.len());
        }
    }

    #[test]
    fn scan_is_deterministic(file in file_strategy(), threads in 1usize..=8) {
        let a = scan_lines(&file, threads);
        let b = scan_lines(&file, threads);
        prop_assert_eq!(a.starts(), b.starts());
    }

    #[test]
    fn row_starts_are_strictly_increasing(file in file_strategy()) {
        let index = scan_lines(&file, 4);
        for w in index.starts().windows(2) {
            prop_assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn rows_reconstruct_the_file_body(file in file_strategy()) {
        // Concatenating header + each row (re-terminated) reproduces the
        // file modulo the optional trailing LF.
        let index = scan_lines(&file, 4);
        let mut rebuilt = index.header(&file).to_vec();
        rebuilt.push(b'\n');
        for &start in index.starts() {
            rebuilt.extend_from_slice(line_at(&file, start));
            rebuilt.push(b'\n');
        }
        let mut normalized = file.clone();
        if normalized.last() != Some(&b'\n') {
            normalized.push(b'\n');
        }
        prop_assert_eq!(rebuilt, normalized);
    }
}

#[test]
fn trailing_lf_and_not_agree_on_count() {
    let with = b"h\na\nb\n";
    let without = b"h\na\nb";
    assert_eq!(scan_lines(with, 3).len(), 2);
    assert_eq!(scan_lines(without, 3).len(), 2);
}

/// The proptest corpus stays below the sequential-scan clamp, so this
/// deterministic case forces a genuinely multi-block scan: varied row
/// lengths, empty rows, and a missing final LF, at a size that fans out
/// to 8 blocks.
#[test]
fn multi_block_scan_matches_reference() {
    let mut file = b"id|device|temp".to_vec();
    let mut rng: u64 = 0x5eed;
    while file.len() < 640 * 1024 {
        // xorshift; row lengths 0..31 so boundaries land everywhere.
        rng ^= rng << 13;
        rng ^= rng >> 7;
        rng ^= rng << 17;
        let row_len = (rng % 31) as usize;
        file.push(b'\n');
        for i in 0..row_len {
            file.push(if i == 2 { b'|' } else { b'a' + (rng as u8).wrapping_add(i as u8) % 26 });
        }
    }
    // End on an unterminated row.
    if file.last() == Some(&b'\n') {
        file.extend_from_slice(b"tail|q|21");
    }
    assert_ne!(file.last(), Some(&b'\n'));

    let expected = reference_data_starts(&file);
    for threads in [1usize, 2, 4, 8] {
        let index = scan_lines(&file, threads);
        assert_eq!(index.starts(), expected.as_slice(), "threads={threads}");
    }
}
