//! Device table behavior against a reference model.
//!
//! The chained FNV-1a table must agree with a plain `HashMap` model for
//! any insertion sequence: same device set, same per-device offset
//! lists, same totals, across growth boundaries.

use std::collections::HashMap;

use proptest::prelude::*;

use slicer_rs::index::DeviceTable;

fn id_strategy() -> impl Strategy<Value = Vec<u8>> {
    // Short ids from a small alphabet force collisions and repeats;
    // the occasional empty id is legal.
    proptest::collection::vec(proptest::sample::select(b"abc|x_0".to_vec()), 0..5)
}

proptest! {
    #[test]
    fn table_matches_hashmap_model(ids in proptest::collection::vec(id_strategy(), 0..400)) {
        let mut table = DeviceTable::with_expected_lines(ids.len());
        let mut model: HashMap<Vec<u8>, Vec<usize>> = HashMap::new();

        for (i, id) in ids.iter().enumerate() {
            let offset = i * 10;
            table.insert_line(id, offset);
            model.entry(id.clone()).or_default().push(offset);
        }

        prop_assert_eq!(table.device_count(), model.len());
        prop_assert_eq!(table.total_lines(), ids.len());

        for (id, offsets) in &model {
            prop_assert_eq!(table.lines_of(id), Some(offsets.as_slice()));
        }
        prop_assert_eq!(table.lines_of(b"never-inserted-device"), None);

        // Snapshot covers every key exactly once.
        let mut snapshot: Vec<Vec<u8>> = table.all_devices().iter().map(|d| d.to_vec()).collect();
        snapshot.sort();
        let mut expected: Vec<Vec<u8>> = model.keys().cloned().collect();
        expected.sort();
        prop_assert_eq!(snapshot, expected);
    }

    #[test]
    fn insertion_order_is_stable(ids in proptest::collection::vec(id_strategy(), 0..100)) {
        let mut a = DeviceTable::with_expected_lines(ids.len());
        let mut b = DeviceTable::with_expected_lines(ids.len());
        for (i, id) in ids.iter().enumerate() {
            a.insert_line(id, i);
            b.insert_line(id, i);
        }
        prop_assert_eq!(a.all_devices(), b.all_devices());
    }
}
