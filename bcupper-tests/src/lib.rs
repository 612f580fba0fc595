//! Test utilities for bcupper
//!
//! This crate provides shared test utilities, mock implementations,
//! and helper functions for testing bcupper.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::from_builder(ConfigBuilder::minimal());
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::{ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use bcupper::config::{
    BackupJob, Config, DirectoryConfig, GlobalConfig, Protocol, RemoteConfig, RetentionMode,
};
pub use bcupper::managers::backup::{
    BackupManager, BackupSettings, BatchSummary, JobOutcome, JobReport, JobWarning,
};
pub use bcupper::transport::{ArtifactMetadata, Transport, TransportKind};

// Re-export mock implementations from the main crate
pub use bcupper::transport::mock::{MockTransport, MockTransportFactory, TransportCall};
pub use bcupper::utils::size::mock::MockSpaceProbe;
