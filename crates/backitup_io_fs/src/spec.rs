//! Backup specification models, work-list data model and error types.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::conf::C_SHADOW_DIR_NAME;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Which way a run mirrors files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumBackupDirection {
    /// Working tree -> shadow root.
    Backup,
    /// Shadow root -> working tree.
    Restore,
}

impl EnumBackupDirection {
    /// Numeric direction flag (`0` = backup, `1` = restore).
    pub fn as_flag(self) -> u8 {
        match self {
            Self::Backup => 0,
            Self::Restore => 1,
        }
    }

    /// Inverse of [`EnumBackupDirection::as_flag`].
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Self::Backup),
            1 => Some(Self::Restore),
            _ => None,
        }
    }
}

impl fmt::Display for EnumBackupDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backup => write!(f, "backup"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// Kind of filesystem entry being mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumEntryKind {
    /// Regular file; subject to the backup suffix convention.
    File,
    /// Directory; mapped without suffix.
    Directory,
}

/// Pattern matching mode for user exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

/// Category of a per-entry failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumEntryErrorKind {
    /// Path missing or unreadable at walk time.
    Access,
    /// Destination directory could not be created.
    DirectoryCreate,
    /// Path lacks the expected root prefix, marker or suffix.
    PathMapping,
    /// Open/read/write/rename failure during copy.
    Io,
}

impl fmt::Display for EnumEntryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_name = match self {
            Self::Access => "access",
            Self::DirectoryCreate => "mkdir",
            Self::PathMapping => "mapping",
            Self::Io => "io",
        };
        write!(f, "{c_name}")
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region OptionsAndRoots

/// Input options for [`crate::run_backup`].
#[derive(Debug, Clone)]
pub struct SpecBackupOptions {
    /// Extra exclude patterns applied to entry basenames (files and directories).
    pub patterns_exclude: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumPatternMode,
    /// Maximum worker threads for the copy stage.
    pub num_workers_max: Option<usize>,
    /// Evaluate every decision but write no file bytes.
    pub if_dry_run: bool,
}

impl Default for SpecBackupOptions {
    fn default() -> Self {
        Self {
            patterns_exclude: None,
            rule_pattern: EnumPatternMode::Glob,
            num_workers_max: None,
            if_dry_run: false,
        }
    }
}

/// The two roots a run translates between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBackupRoots {
    /// Working tree root.
    pub path_dir_working: PathBuf,
    /// Shadow root (`<working>/.backup`).
    pub path_dir_shadow: PathBuf,
}

impl SpecBackupRoots {
    /// Roots for `path_dir_working` with the conventional shadow location.
    pub fn new(path_dir_working: impl Into<PathBuf>) -> Self {
        let path_dir_working = path_dir_working.into();
        let path_dir_shadow = path_dir_working.join(C_SHADOW_DIR_NAME);
        Self {
            path_dir_working,
            path_dir_shadow,
        }
    }

    /// Root that is read in `direction`.
    pub fn path_dir_source(&self, direction: EnumBackupDirection) -> &Path {
        match direction {
            EnumBackupDirection::Backup => &self.path_dir_working,
            EnumBackupDirection::Restore => &self.path_dir_shadow,
        }
    }

    /// Root that is written in `direction`.
    pub fn path_dir_destination(&self, direction: EnumBackupDirection) -> &Path {
        match direction {
            EnumBackupDirection::Backup => &self.path_dir_shadow,
            EnumBackupDirection::Restore => &self.path_dir_working,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkList

/// One discovered regular file awaiting a copy decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFileEntry {
    /// Absolute source path under the root being read.
    pub path_file_src: PathBuf,
    /// Mapping direction used for this entry.
    pub direction: EnumBackupDirection,
    /// Sequential discovery id (1..N), diagnostic only.
    pub task_id: usize,
    /// Bytes written by the copy unit; 0 when skipped or failed.
    pub bytes_copied: u64,
}

/// Ordered, growable list of discovered files.
///
/// Insertion order is discovery order: directory pre-order, entries within a
/// directory in `read_dir` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecWorkList {
    l_entries: Vec<SpecFileEntry>,
}

impl SpecWorkList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file and return its assigned `task_id`.
    pub fn push_file(&mut self, path_file_src: PathBuf, direction: EnumBackupDirection) -> usize {
        let task_id = self.l_entries.len() + 1;
        self.l_entries.push(SpecFileEntry {
            path_file_src,
            direction,
            task_id,
            bytes_copied: 0,
        });
        task_id
    }

    pub fn len(&self) -> usize {
        self.l_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.l_entries.is_empty()
    }

    pub fn entries(&self) -> &[SpecFileEntry] {
        &self.l_entries
    }

    pub fn entries_mut(&mut self) -> &mut [SpecFileEntry] {
        &mut self.l_entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpecFileEntry> {
        self.l_entries.iter()
    }
}

impl<'a> IntoIterator for &'a SpecWorkList {
    type Item = &'a SpecFileEntry;
    type IntoIter = std::slice::Iter<'a, SpecFileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.l_entries.iter()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// One per-entry failure with path, category and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEntryError {
    /// Failed source or destination path.
    pub path: PathBuf,
    /// Failure category.
    pub kind: EnumEntryErrorKind,
    /// User-facing error text.
    pub message: String,
}

impl fmt::Display for SpecEntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path.display(), self.message)
    }
}

/// A path could not be translated between roots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathMappingError {
    #[error("Path {} is not under root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("File name of {} does not carry the `{suffix}` suffix", path.display())]
    MissingSuffix { path: PathBuf, suffix: String },

    #[error("Path {} has no component below its root", path.display())]
    NoRelativeComponent { path: PathBuf },
}

/// Whole-run failures; every other failure is per-entry and lands in the report.
#[derive(Debug, Error)]
pub enum BackupRunError {
    #[error("Cannot determine working directory: {0}")]
    WorkingDirUnavailable(#[source] io::Error),

    #[error("Working root is not a directory: {}", .0.display())]
    WorkingRootNotDirectory(PathBuf),

    #[error("Failed to create shadow root {}: {source}", path.display())]
    ShadowRootInitFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Shadow root path is occupied by a non-directory: {}", .0.display())]
    ShadowRootOccupied(PathBuf),

    #[error("Nothing to restore, shadow root does not exist: {}", .0.display())]
    ShadowRootMissing(PathBuf),

    #[error("Invalid exclude pattern: {0}")]
    InvalidPattern(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
