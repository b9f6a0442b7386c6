//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - API for external callers
//! - Driven Ports (outbound) - Block store, version resolver, publisher and
//!   snapshot persistence

pub mod inbound;
pub mod outbound;

pub use inbound::MlbfApi;
pub use outbound::{ArtifactPublisher, BlockStore, SnapshotStore, VersionResolver};
