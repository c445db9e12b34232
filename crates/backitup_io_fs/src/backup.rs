//! Run orchestration: shadow-root bootstrap, walk phase, copy phase.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use tracing::{debug, info};

use crate::conf::C_SHADOW_DIR_NAME;
use crate::copy::run_copy_engine;
use crate::report::{ReportBackup, ReportBackupBuilder};
use crate::spec::{BackupRunError, EnumBackupDirection, SpecBackupOptions, SpecBackupRoots};
use crate::walk::walk_tree;

/// Absolute working root: `path_dir` if given (relative paths are resolved
/// against the current directory), otherwise the current directory.
pub fn resolve_working_root(path_dir: Option<&Path>) -> Result<PathBuf, BackupRunError> {
    let path_dir_cwd = std::env::current_dir().map_err(BackupRunError::WorkingDirUnavailable)?;
    let path_dir_working = match path_dir {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => path_dir_cwd.join(path),
        None => path_dir_cwd,
    };
    if !path_dir_working.is_dir() {
        return Err(BackupRunError::WorkingRootNotDirectory(path_dir_working));
    }
    Ok(path_dir_working)
}

/// Create `<path_dir_working>/.backup` unless it already exists.
///
/// An existing directory is reused; any other entry under that name (file,
/// symlink) is fatal.
pub fn ensure_shadow_root(path_dir_working: &Path) -> Result<PathBuf, BackupRunError> {
    let path_dir_shadow = path_dir_working.join(C_SHADOW_DIR_NAME);
    match fs::symlink_metadata(&path_dir_shadow) {
        Ok(meta_shadow) if meta_shadow.is_dir() => {
            debug!(path = %path_dir_shadow.display(), "shadow root already exists");
            return Ok(path_dir_shadow);
        }
        Ok(_) => return Err(BackupRunError::ShadowRootOccupied(path_dir_shadow)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(BackupRunError::ShadowRootInitFailed {
                path: path_dir_shadow,
                source: e,
            });
        }
    }

    let mut dir_builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        dir_builder.mode(0o700);
    }
    dir_builder
        .create(&path_dir_shadow)
        .map_err(|e| BackupRunError::ShadowRootInitFailed {
            path: path_dir_shadow.clone(),
            source: e,
        })?;
    info!(path = %path_dir_shadow.display(), "created shadow root");
    Ok(path_dir_shadow)
}

/// Run one backup or restore over `path_dir_working`.
///
/// Phases run strictly in order: the walk (including all directory creation)
/// completes before any copy starts, and every copy completes before the
/// report is built. Per-entry failures are collected in the returned
/// [`ReportBackup`]; only whole-run preconditions yield [`BackupRunError`].
pub fn run_backup(
    path_dir_working: &Path,
    direction: EnumBackupDirection,
    spec_options: &SpecBackupOptions,
    flag_cancel: &AtomicBool,
) -> Result<ReportBackup, BackupRunError> {
    if !path_dir_working.is_dir() {
        return Err(BackupRunError::WorkingRootNotDirectory(
            path_dir_working.to_path_buf(),
        ));
    }
    let spec_roots = SpecBackupRoots::new(path_dir_working);
    match direction {
        EnumBackupDirection::Backup => {
            ensure_shadow_root(&spec_roots.path_dir_working)?;
        }
        EnumBackupDirection::Restore => match fs::symlink_metadata(&spec_roots.path_dir_shadow) {
            Ok(meta_shadow) if meta_shadow.is_dir() => {}
            Ok(_) => {
                return Err(BackupRunError::ShadowRootOccupied(spec_roots.path_dir_shadow));
            }
            Err(_) => return Err(BackupRunError::ShadowRootMissing(spec_roots.path_dir_shadow)),
        },
    }

    info!(
        %direction,
        source = %spec_roots.path_dir_source(direction).display(),
        destination = %spec_roots.path_dir_destination(direction).display(),
        "walk phase started"
    );
    let mut builder_report = ReportBackupBuilder::new(direction);
    let mut work_list = walk_tree(&spec_roots, direction, spec_options, &mut builder_report)?;

    let spec_totals = run_copy_engine(
        &mut work_list,
        &spec_roots,
        spec_options,
        flag_cancel,
        &mut builder_report,
    );
    builder_report.set_copy_totals(spec_totals);

    let report = builder_report.build();
    info!("{}", report.summary());
    Ok(report)
}
