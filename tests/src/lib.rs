//! # MLBF Test Suite
//!
//! Unified test crate for flows that span the blocklist library and the
//! runtime.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── filter_benchmarks.rs   # Snapshot, filter and stash timings
//! └── src/
//!     └── integration/
//!         ├── generation_flow.rs     # Multi-cycle runs over JSON files
//!         └── legacy_import_flow.rs  # Legacy blocklist into a live filter
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p mlbf-tests
//!
//! # Benchmarks
//! cargo bench -p mlbf-tests
//! ```

#![allow(dead_code)]

pub mod integration;
