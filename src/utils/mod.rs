pub mod archive;
pub mod locker;
pub mod retry;
pub mod size;

// Re-export commonly used types and traits (used by test crate)
pub use archive::{archive_name, produce_archive, ArchiveHandle, StagedArchive};
pub use size::{RealSpaceProbe, SpaceProbe};
