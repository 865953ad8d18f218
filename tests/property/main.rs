//! Property-based tests for the scan and partition stages.
//!
//! Run with: `cargo test --test property`

mod index;
mod scan;
