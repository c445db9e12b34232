//! Root-to-root path translation.
//!
//! Pure functions: nothing in this module touches the filesystem.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::conf::C_BACKUP_SUFFIX;
use crate::spec::{EnumBackupDirection, EnumEntryKind, PathMappingError, SpecBackupRoots};

/// Translate `path` from the source root of `direction` to the destination root.
///
/// - `Backup`: the working-root prefix is replaced by the shadow root; files get
///   [`C_BACKUP_SUFFIX`] appended to their name.
/// - `Restore`: everything up to and including the shadow marker is dropped and
///   the remainder re-joined onto the working root; files have the suffix stripped.
///
/// Directories are mapped without any suffix handling.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use backitup_io_fs::{EnumBackupDirection, EnumEntryKind, SpecBackupRoots, map_path};
///
/// let roots = SpecBackupRoots::new("/w");
/// let path_dst = map_path(
///     Path::new("/w/sub/b.txt"),
///     EnumBackupDirection::Backup,
///     EnumEntryKind::File,
///     &roots,
/// )
/// .unwrap();
/// assert_eq!(path_dst, Path::new("/w/.backup/sub/b.txt.bak"));
/// ```
pub fn map_path(
    path: &Path,
    direction: EnumBackupDirection,
    kind: EnumEntryKind,
    roots: &SpecBackupRoots,
) -> Result<PathBuf, PathMappingError> {
    let path_rel = derive_relative_path(path, direction, roots)?;
    let path_dst = roots.path_dir_destination(direction).join(&path_rel);
    if kind == EnumEntryKind::Directory {
        return Ok(path_dst);
    }

    let name_src = path_rel
        .file_name()
        .ok_or_else(|| PathMappingError::NoRelativeComponent {
            path: path.to_path_buf(),
        })?;
    let name_dst = match direction {
        EnumBackupDirection::Backup => append_backup_suffix(name_src),
        EnumBackupDirection::Restore => {
            strip_backup_suffix(name_src).ok_or_else(|| PathMappingError::MissingSuffix {
                path: path.to_path_buf(),
                suffix: C_BACKUP_SUFFIX.to_string(),
            })?
        }
    };
    Ok(path_dst.with_file_name(name_dst))
}

/// Components of `path` below the source root of `direction`.
///
/// Matching is component-wise, so `/w2/a` is not considered under `/w`.
pub fn derive_relative_path(
    path: &Path,
    direction: EnumBackupDirection,
    roots: &SpecBackupRoots,
) -> Result<PathBuf, PathMappingError> {
    let path_dir_root = roots.path_dir_source(direction);
    let mut iter_components = path.components();
    for comp_root in path_dir_root.components() {
        match iter_components.next() {
            Some(comp_path) if comp_path == comp_root => {}
            _ => {
                return Err(PathMappingError::OutsideRoot {
                    path: path.to_path_buf(),
                    root: path_dir_root.to_path_buf(),
                });
            }
        }
    }
    Ok(iter_components.as_path().to_path_buf())
}

fn append_backup_suffix(name: &OsStr) -> OsString {
    let mut name_dst = name.to_os_string();
    name_dst.push(C_BACKUP_SUFFIX);
    name_dst
}

#[cfg(unix)]
fn strip_backup_suffix(name: &OsStr) -> Option<OsString> {
    use std::os::unix::ffi::{OsStrExt, OsStringExt};

    let raw_stem = name.as_bytes().strip_suffix(C_BACKUP_SUFFIX.as_bytes())?;
    if raw_stem.is_empty() {
        return None;
    }
    Some(OsString::from_vec(raw_stem.to_vec()))
}

#[cfg(not(unix))]
fn strip_backup_suffix(name: &OsStr) -> Option<OsString> {
    let c_stem = name.to_str()?.strip_suffix(C_BACKUP_SUFFIX)?;
    if c_stem.is_empty() {
        return None;
    }
    Some(OsString::from(c_stem))
}
