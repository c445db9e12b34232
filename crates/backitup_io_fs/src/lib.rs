//! `backitup_io_fs` v1:
//! Shadow-directory backup and restore engine.
//!
//! Module layout:
//! - `conf`    : structural constants (shadow name, suffix, reserved names)
//! - `spec`    : enums/options/work list/errors
//! - `mapper`  : root-to-root path translation
//! - `walk`    : traversal and directory mirroring
//! - `recency` : modification-time comparison
//! - `copy`    : bounded concurrent copy stage
//! - `backup`  : run orchestration
//! - `report`  : run-time report model
//! - `util`    : shared helper functions

pub mod backup;
pub mod conf;
pub mod copy;
pub mod mapper;
pub mod recency;
pub mod report;
pub mod spec;
mod util;
pub mod walk;

pub use backup::{ensure_shadow_root, resolve_working_root, run_backup};
pub use conf::{C_BACKUP_SUFFIX, C_SHADOW_DIR_NAME, C_VCS_DIR_NAME, TUP_RESERVED_NAMES};
pub use copy::{SpecCopyTotals, run_copy_engine};
pub use mapper::{derive_relative_path, map_path};
pub use recency::{EnumRecency, check_destination_recency};
pub use report::{ReportBackup, ReportBackupBuilder};
pub use spec::{
    BackupRunError, EnumBackupDirection, EnumEntryErrorKind, EnumEntryKind, EnumPatternMode,
    PathMappingError, SpecBackupOptions, SpecBackupRoots, SpecEntryError, SpecFileEntry,
    SpecWorkList,
};
pub use walk::walk_tree;
