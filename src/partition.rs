//! Device-balanced chunk construction.
//!
//! Longest-processing-time greedy: devices are sorted by row count
//! descending (ties broken by id so the output is a pure function of the
//! input) and each is assigned to the bucket with the fewest rows so
//! far (ties to the lowest bucket index). A device is never split across
//! buckets, so the worst-case imbalance is bounded by the largest
//! device's row count.
//!
//! Exactly one chunk is materialized per bucket, including empty ones,
//! so the chunk count always equals the worker count. Chunk bytes are
//! the device's rows in file order, devices in assignment order, every
//! row LF-terminated (a missing terminator on the final row of the file
//! is repaired here).

use crate::index::DeviceIndex;
use crate::scan::line_at;

/// An owned, LF-terminated slice of the input assigned to one worker.
#[derive(Debug)]
pub struct Chunk {
    /// Index of the bucket (and worker) this chunk was built for.
    pub worker: usize,
    /// Concatenated rows, each ending with LF. May be empty.
    pub data: Vec<u8>,
    /// Number of rows in `data`.
    pub lines: usize,
    /// Number of devices whose rows are in `data`.
    pub devices: usize,
}

/// Partitions all indexed rows into exactly `buckets` chunks.
pub fn partition(bytes: &[u8], index: &DeviceIndex, buckets: usize) -> Vec<Chunk> {
    assert!(buckets > 0, "bucket count must be positive");

    // Sort devices heaviest-first; ties by id keep the plan deterministic.
    let mut devices: Vec<(&[u8], &[usize])> = index.iter().collect();
    devices.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));

    // Greedy assignment to the currently lightest bucket.
    let mut plans: Vec<BucketPlan> = (0..buckets).map(|_| BucketPlan::default()).collect();
    for (slot, (_, lines)) in devices.iter().enumerate() {
        let lightest = lightest_bucket(&plans);
        let plan = &mut plans[lightest];
        plan.device_slots.push(slot);
        plan.total_lines += lines.len();
    }

    plans
        .into_iter()
        .enumerate()
        .map(|(worker, plan)| materialize(bytes, &devices, worker, plan))
        .collect()
}

#[derive(Default)]
struct BucketPlan {
    /// Indices into the sorted device list, in assignment order.
    device_slots: Vec<usize>,
    total_lines: usize,
}

fn lightest_bucket(plans: &[BucketPlan]) -> usize {
    let mut best = 0;
    for (i, plan) in plans.iter().enumerate().skip(1) {
        if plan.total_lines < plans[best].total_lines {
            best = i;
        }
    }
    best
}

fn materialize(
    bytes: &[u8],
    devices: &[(&[u8], &[usize])],
    worker: usize,
    plan: BucketPlan,
) -> Chunk {
    // Exact capacity: every row is copied without its LF and one is
    // appended, so each row contributes len + 1.
    let capacity: usize = plan
        .device_slots
        .iter()
        .flat_map(|&slot| devices[slot].1.iter())
        .map(|&start| line_at(bytes, start).len() + 1)
        .sum();

    let mut data = Vec::with_capacity(capacity);
    let mut lines = 0usize;
    for &slot in &plan.device_slots {
        for &start in devices[slot].1 {
            data.extend_from_slice(line_at(bytes, start));
            data.push(b'\n');
            lines += 1;
        }
    }

    debug_assert_eq!(data.len(), capacity);
    debug_assert_eq!(lines, plan.total_lines);

    Chunk {
        worker,
        data,
        lines,
        devices: plan.device_slots.len(),
    }
}
