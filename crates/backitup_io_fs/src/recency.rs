//! Modification-time comparison between a source file and its destination.

use std::fs;
use std::path::Path;

use filetime::FileTime;

/// Outcome of comparing source and destination modification times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumRecency {
    /// Destination absent or its metadata unreadable; copy required.
    Missing,
    /// Source at least as new as destination; copy (over)writes destination.
    SourceNewer,
    /// Destination strictly newer; copy may be skipped.
    DestNewer,
}

impl EnumRecency {
    /// Whether the file bytes must be (re)written.
    pub fn requires_copy(self) -> bool {
        !matches!(self, Self::DestNewer)
    }
}

/// Compare modification times of `path_src` and `path_dst`.
///
/// Equal timestamps count as [`EnumRecency::SourceNewer`]. An unreadable source
/// also yields `SourceNewer` so the copy attempt surfaces the real I/O error.
/// Advisory only: never gate directory creation on this.
pub fn check_destination_recency(path_src: &Path, path_dst: &Path) -> EnumRecency {
    let Ok(stat_dst) = fs::metadata(path_dst) else {
        return EnumRecency::Missing;
    };
    let Ok(stat_src) = fs::metadata(path_src) else {
        return EnumRecency::SourceNewer;
    };

    let file_time_src = FileTime::from_last_modification_time(&stat_src);
    let file_time_dst = FileTime::from_last_modification_time(&stat_dst);
    if file_time_dst > file_time_src {
        EnumRecency::DestNewer
    } else {
        EnumRecency::SourceNewer
    }
}
