//! Service Layer
//!
//! Contains the application service that runs generation cycles against
//! the outbound ports.

pub mod generation_service;

pub use generation_service::{CycleOutcome, MlbfGenerationService, DEFAULT_COLLECTION};
