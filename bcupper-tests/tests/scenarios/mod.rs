//! Backup scenario tests for bcupper
//!
//! These tests drive the backup manager end to end against an in-memory
//! transport or a real local destination, with the space probe mocked.

mod batch;
mod local_rotation;
mod preflight;
mod remote;

use bcupper::config::{resolve_jobs, Config};
use bcupper::managers::backup::{BackupManager, BackupSettings};
use bcupper::transport::mock::{MockTransport, MockTransportFactory};
use bcupper::transport::TransportKind;
use bcupper::utils::size::mock::MockSpaceProbe;

/// Manager whose every job talks to `transport`
pub fn mock_manager(
    config: &Config,
    transport: &MockTransport,
    kind: TransportKind,
    probe: MockSpaceProbe,
) -> BackupManager {
    BackupManager::with_components(
        BackupSettings::from_global(&config.global),
        resolve_jobs(config),
        Box::new(MockTransportFactory::new(transport.clone(), kind)),
        Box::new(probe),
    )
}
