//! Adapters Layer (Driven Adapters)
//!
//! Implementations of the outbound ports.
//!
//! ## Adapters
//!
//! - `memory` - In-process block store, resolver, publisher and snapshot store
//! - `json_file` - JSON files on disk; the publisher writes one directory per
//!   collection

pub mod json_file;
pub mod memory;

pub use json_file::{write_atomic, write_json, DirectoryPublisher, JsonBlockFile, JsonSnapshotStore, JsonVersionFile};
pub use memory::{InMemoryBlockStore, InMemorySnapshotStore, InMemoryVersionResolver, RecordingPublisher};
