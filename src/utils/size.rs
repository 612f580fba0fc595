//! Source size and destination capacity probes
//!
//! Symbolic links are followed: a link counts as the size of its target, and
//! a link cycle aborts the walk with an error.

use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively sum the size of every regular file under `path`
///
/// Any unreadable entry fails the whole probe; no partial sum is returned.
pub fn folder_size(path: &Path) -> io::Result<u64> {
    let mut total = 0u64;

    for entry in WalkDir::new(path).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }

    Ok(total)
}

/// Bytes available to the current (unprivileged) user on the filesystem holding `path`
pub fn free_space(path: &Path) -> io::Result<u64> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(io::Error::from)?;
    #[allow(clippy::unnecessary_cast)]
    let available = stat.fragment_size() as u64 * stat.blocks_available() as u64;
    Ok(available)
}

/// Abstraction over the size probes, enabling mocking in tests
pub trait SpaceProbe {
    fn folder_size(&self, path: &Path) -> io::Result<u64>;

    fn free_space(&self, path: &Path) -> io::Result<u64>;
}

/// Default implementation using the real filesystem
#[derive(Debug, Clone, Default)]
pub struct RealSpaceProbe;

impl SpaceProbe for RealSpaceProbe {
    fn folder_size(&self, path: &Path) -> io::Result<u64> {
        folder_size(path)
    }

    fn free_space(&self, path: &Path) -> io::Result<u64> {
        free_space(path)
    }
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;

    /// Reports fixed sizes regardless of path
    #[derive(Debug, Clone, Copy)]
    pub struct MockSpaceProbe {
        pub source_size: u64,
        pub free_space: u64,
    }

    impl MockSpaceProbe {
        pub fn new(source_size: u64, free_space: u64) -> Self {
            Self {
                source_size,
                free_space,
            }
        }

        /// Plenty of room for anything
        pub fn roomy() -> Self {
            Self::new(0, u64::MAX)
        }
    }

    impl SpaceProbe for MockSpaceProbe {
        fn folder_size(&self, _path: &Path) -> io::Result<u64> {
            Ok(self.source_size)
        }

        fn free_space(&self, _path: &Path) -> io::Result<u64> {
            Ok(self.free_space)
        }
    }
}
