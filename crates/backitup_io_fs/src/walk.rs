//! Directory traversal: mirrors directory structure into the destination root
//! and collects regular files into a [`SpecWorkList`].

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::conf::{is_reserved_name, is_temp_file_name};
use crate::mapper::map_path;
use crate::report::ReportBackupBuilder;
use crate::spec::{
    BackupRunError, EnumBackupDirection, EnumEntryErrorKind, EnumEntryKind, SpecBackupOptions,
    SpecBackupRoots, SpecWorkList,
};
use crate::util::SpecExcludePatterns;

struct SpecWalkContext<'a> {
    spec_roots: &'a SpecBackupRoots,
    direction: EnumBackupDirection,
    spec_pats: SpecExcludePatterns,
    work_list: SpecWorkList,
    builder_report: &'a mut ReportBackupBuilder,
}

/// Walk the source root of `direction` and return every schedulable file.
///
/// Directory mirroring happens during the walk, so by the time this returns
/// each entry's destination directory exists (or its creation failure has been
/// recorded in `builder_report`). Per-entry problems never abort the walk;
/// only an invalid exclude pattern does.
pub fn walk_tree(
    spec_roots: &SpecBackupRoots,
    direction: EnumBackupDirection,
    spec_options: &SpecBackupOptions,
    builder_report: &mut ReportBackupBuilder,
) -> Result<SpecWorkList, BackupRunError> {
    let spec_pats = SpecExcludePatterns::from_raw(
        spec_options.patterns_exclude.as_deref(),
        spec_options.rule_pattern,
    )?;

    let mut spec_walk_ctx = SpecWalkContext {
        spec_roots,
        direction,
        spec_pats,
        work_list: SpecWorkList::new(),
        builder_report,
    };
    let path_dir_root = spec_roots.path_dir_source(direction);
    walk_directory(path_dir_root, &mut spec_walk_ctx);

    debug!(
        n_files = spec_walk_ctx.work_list.len(),
        root = %path_dir_root.display(),
        "walk finished"
    );
    Ok(spec_walk_ctx.work_list)
}

fn walk_directory(path_dir: &Path, spec_walk_ctx: &mut SpecWalkContext<'_>) {
    let iter_entries = match fs::read_dir(path_dir) {
        Ok(iter) => iter,
        Err(e) => {
            spec_walk_ctx.builder_report.add_error(
                path_dir.to_path_buf(),
                EnumEntryErrorKind::Access,
                format!("Failed to read directory ({e})"),
            );
            return;
        }
    };

    if path_dir != spec_walk_ctx.spec_roots.path_dir_source(spec_walk_ctx.direction)
        && !mirror_directory(path_dir, spec_walk_ctx)
    {
        return;
    }

    for entry_res in iter_entries {
        let entry = match entry_res {
            Ok(v) => v,
            Err(e) => {
                spec_walk_ctx.builder_report.add_error(
                    path_dir.to_path_buf(),
                    EnumEntryErrorKind::Access,
                    format!("Failed to read directory entry ({e})"),
                );
                continue;
            }
        };

        let path_entry = entry.path();
        let c_name = entry.file_name().to_string_lossy().to_string();
        if is_reserved_name(&c_name) {
            continue;
        }
        if spec_walk_ctx.spec_pats.is_excluded(&c_name) {
            debug!(path = %path_entry.display(), "excluded by pattern");
            continue;
        }

        let cfg_file_type = match entry.file_type() {
            Ok(v) => v,
            Err(e) => {
                spec_walk_ctx.builder_report.add_error(
                    path_entry,
                    EnumEntryErrorKind::Access,
                    format!("Failed to inspect entry ({e})"),
                );
                continue;
            }
        };

        if cfg_file_type.is_dir() {
            walk_directory(&path_entry, spec_walk_ctx);
        } else if cfg_file_type.is_file() {
            if is_temp_file_name(&c_name) {
                spec_walk_ctx.builder_report.add_warning(format!(
                    "Leftover temp file from an interrupted copy skipped: {}",
                    path_entry.display()
                ));
                continue;
            }
            handle_file_entry(&path_entry, spec_walk_ctx);
        } else if cfg_file_type.is_symlink() {
            spec_walk_ctx
                .builder_report
                .add_warning(format!("Symlink skipped: {}", path_entry.display()));
        } else {
            spec_walk_ctx
                .builder_report
                .add_warning(format!("Special file skipped: {}", path_entry.display()));
        }
    }
}

/// Create the destination counterpart of `path_dir`.
///
/// Returns `false` when the subtree must not be descended into.
fn mirror_directory(path_dir: &Path, spec_walk_ctx: &mut SpecWalkContext<'_>) -> bool {
    let path_dir_dst = match map_path(
        path_dir,
        spec_walk_ctx.direction,
        EnumEntryKind::Directory,
        spec_walk_ctx.spec_roots,
    ) {
        Ok(v) => v,
        Err(e) => {
            spec_walk_ctx.builder_report.add_error(
                path_dir.to_path_buf(),
                EnumEntryErrorKind::PathMapping,
                e.to_string(),
            );
            return false;
        }
    };

    match fs::create_dir_all(&path_dir_dst) {
        Ok(_) => {
            debug!(path = %path_dir_dst.display(), "mirrored directory");
            spec_walk_ctx.builder_report.add_dir_mirrored();
        }
        Err(e) => {
            spec_walk_ctx.builder_report.add_error(
                path_dir_dst,
                EnumEntryErrorKind::DirectoryCreate,
                format!("Failed to create directory ({e})"),
            );
        }
    }
    true
}

fn handle_file_entry(path_file: &Path, spec_walk_ctx: &mut SpecWalkContext<'_>) {
    if let Err(e) = fs::File::open(path_file) {
        spec_walk_ctx.builder_report.add_error(
            path_file.to_path_buf(),
            EnumEntryErrorKind::Access,
            format!("File is not readable ({e})"),
        );
        return;
    }

    if let Err(e) = map_path(
        path_file,
        spec_walk_ctx.direction,
        EnumEntryKind::File,
        spec_walk_ctx.spec_roots,
    ) {
        spec_walk_ctx.builder_report.add_error(
            path_file.to_path_buf(),
            EnumEntryErrorKind::PathMapping,
            e.to_string(),
        );
        return;
    }

    let task_id = spec_walk_ctx
        .work_list
        .push_file(path_file.to_path_buf(), spec_walk_ctx.direction);
    spec_walk_ctx.builder_report.add_scanned();
    debug!(task_id, path = %path_file.display(), "scheduled");
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::walk_tree;
    use crate::report::ReportBackupBuilder;
    use crate::spec::{
        EnumBackupDirection, EnumEntryErrorKind, EnumPatternMode, SpecBackupOptions,
        SpecBackupRoots,
    };

    fn write_text(path: &Path, txt: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, txt).expect("write text");
    }

    fn walk(
        spec_roots: &SpecBackupRoots,
        direction: EnumBackupDirection,
        spec_options: &SpecBackupOptions,
    ) -> (Vec<String>, ReportBackupBuilder) {
        let mut builder = ReportBackupBuilder::new(direction);
        let work_list =
            walk_tree(spec_roots, direction, spec_options, &mut builder).expect("walk tree");
        let l_rel = work_list
            .iter()
            .map(|e| {
                e.path_file_src
                    .strip_prefix(spec_roots.path_dir_source(direction))
                    .expect("under root")
                    .to_string_lossy()
                    .to_string()
            })
            .collect();
        (l_rel, builder)
    }

    #[test]
    fn walk_backup_collects_files_and_mirrors_dirs() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_roots = SpecBackupRoots::new(tmp.path());
        std::fs::create_dir_all(&spec_roots.path_dir_shadow).expect("mkdir shadow");
        write_text(&tmp.path().join("a.txt"), "aaaaaaaaaa");
        write_text(&tmp.path().join("sub/b.txt"), "b");
        write_text(&tmp.path().join("sub/deep/c.txt"), "c");
        std::fs::create_dir_all(tmp.path().join("empty")).expect("mkdir empty");

        let (mut l_rel, builder) = walk(
            &spec_roots,
            EnumBackupDirection::Backup,
            &SpecBackupOptions::default(),
        );
        l_rel.sort();
        assert_eq!(l_rel, vec!["a.txt", "sub/b.txt", "sub/deep/c.txt"]);
        assert_eq!(builder.cnt_scanned, 3);
        assert_eq!(builder.cnt_dirs_mirrored, 3);
        assert!(builder.errors.is_empty());

        assert!(spec_roots.path_dir_shadow.join("sub/deep").is_dir());
        assert!(spec_roots.path_dir_shadow.join("empty").is_dir());
        assert!(!spec_roots.path_dir_shadow.join("a.txt.bak").exists());
    }

    #[test]
    fn walk_assigns_task_ids_in_discovery_order() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_roots = SpecBackupRoots::new(tmp.path());
        write_text(&tmp.path().join("x/1.txt"), "1");
        write_text(&tmp.path().join("y/2.txt"), "2");
        write_text(&tmp.path().join("3.txt"), "3");

        let mut builder = ReportBackupBuilder::new(EnumBackupDirection::Backup);
        let work_list = walk_tree(
            &spec_roots,
            EnumBackupDirection::Backup,
            &SpecBackupOptions::default(),
            &mut builder,
        )
        .expect("walk tree");
        let l_ids: Vec<usize> = work_list.iter().map(|e| e.task_id).collect();
        assert_eq!(l_ids, vec![1, 2, 3]);
        assert!(
            work_list
                .iter()
                .all(|e| e.direction == EnumBackupDirection::Backup)
        );
    }

    #[test]
    fn walk_skips_reserved_entries() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_roots = SpecBackupRoots::new(tmp.path());
        write_text(&tmp.path().join("keep.txt"), "k");
        write_text(&tmp.path().join(".git/HEAD"), "ref");
        write_text(&tmp.path().join(".backup/old.txt.bak"), "old");
        write_text(&tmp.path().join("sub/.git/config"), "cfg");
        write_text(&tmp.path().join(".gitignore"), "target");

        let (mut l_rel, builder) = walk(
            &spec_roots,
            EnumBackupDirection::Backup,
            &SpecBackupOptions::default(),
        );
        l_rel.sort();
        assert_eq!(l_rel, vec![".gitignore", "keep.txt"]);
        assert!(!spec_roots.path_dir_shadow.join(".git").exists());
        assert!(!spec_roots.path_dir_shadow.join(".backup").exists());
        assert!(!spec_roots.path_dir_shadow.join("sub/.git").exists());
        assert!(builder.errors.is_empty());
    }

    #[test]
    fn walk_restore_reads_shadow_and_mirrors_into_working() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_roots = SpecBackupRoots::new(tmp.path());
        write_text(&spec_roots.path_dir_shadow.join("a.txt.bak"), "a");
        write_text(&spec_roots.path_dir_shadow.join("sub/b.txt.bak"), "b");

        let (mut l_rel, builder) = walk(
            &spec_roots,
            EnumBackupDirection::Restore,
            &SpecBackupOptions::default(),
        );
        l_rel.sort();
        assert_eq!(l_rel, vec!["a.txt.bak", "sub/b.txt.bak"]);
        assert!(tmp.path().join("sub").is_dir());
        assert_eq!(builder.cnt_dirs_mirrored, 1);
    }

    #[test]
    fn walk_restore_reports_unsuffixed_file_as_mapping_error() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_roots = SpecBackupRoots::new(tmp.path());
        write_text(&spec_roots.path_dir_shadow.join("a.txt.bak"), "a");
        write_text(&spec_roots.path_dir_shadow.join("stray.txt"), "s");

        let (l_rel, builder) = walk(
            &spec_roots,
            EnumBackupDirection::Restore,
            &SpecBackupOptions::default(),
        );
        assert_eq!(l_rel, vec!["a.txt.bak"]);
        assert_eq!(builder.errors.len(), 1);
        assert_eq!(builder.errors[0].kind, EnumEntryErrorKind::PathMapping);
    }

    #[test]
    fn walk_skips_leftover_temp_files_with_warning() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_roots = SpecBackupRoots::new(tmp.path());
        write_text(&tmp.path().join("a.txt"), "a");
        write_text(&tmp.path().join(".backitup-Xy12Ab.tmp"), "partial");
        write_text(&spec_roots.path_dir_shadow.join("a.txt.bak"), "a");
        write_text(&spec_roots.path_dir_shadow.join(".backitup-Qw34Er.tmp"), "partial");

        for direction in [EnumBackupDirection::Backup, EnumBackupDirection::Restore] {
            let (l_rel, builder) = walk(&spec_roots, direction, &SpecBackupOptions::default());
            let c_expected = match direction {
                EnumBackupDirection::Backup => "a.txt",
                EnumBackupDirection::Restore => "a.txt.bak",
            };
            assert_eq!(l_rel, vec![c_expected]);
            assert!(builder.errors.is_empty());
            assert_eq!(builder.warnings.len(), 1);
            assert!(builder.warnings[0].contains("Leftover temp file"));
        }
    }

    #[test]
    fn walk_applies_user_exclude_patterns() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_roots = SpecBackupRoots::new(tmp.path());
        write_text(&tmp.path().join("main.rs"), "fn main() {}");
        write_text(&tmp.path().join("build.log"), "log");
        write_text(&tmp.path().join("target/debug/app"), "bin");

        let spec_options = SpecBackupOptions {
            patterns_exclude: Some(vec!["*.log".to_string(), "target".to_string()]),
            rule_pattern: EnumPatternMode::Glob,
            ..SpecBackupOptions::default()
        };
        let (l_rel, _) = walk(&spec_roots, EnumBackupDirection::Backup, &spec_options);
        assert_eq!(l_rel, vec!["main.rs"]);
        assert!(!spec_roots.path_dir_shadow.join("target").exists());
    }

    #[test]
    fn walk_reports_directory_create_failure_and_still_schedules() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_roots = SpecBackupRoots::new(tmp.path());
        write_text(&tmp.path().join("sub/b.txt"), "b");
        write_text(&spec_roots.path_dir_shadow.join("sub"), "a file in the way");

        let (l_rel, builder) = walk(
            &spec_roots,
            EnumBackupDirection::Backup,
            &SpecBackupOptions::default(),
        );
        assert_eq!(l_rel, vec!["sub/b.txt"]);
        assert_eq!(builder.errors.len(), 1);
        assert_eq!(builder.errors[0].kind, EnumEntryErrorKind::DirectoryCreate);
    }

    #[cfg(unix)]
    #[test]
    fn walk_skips_symlinks_with_warning() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().expect("tempdir");
        let spec_roots = SpecBackupRoots::new(tmp.path());
        write_text(&tmp.path().join("real.txt"), "r");
        symlink(tmp.path().join("real.txt"), tmp.path().join("link.txt")).expect("symlink");

        let (l_rel, builder) = walk(
            &spec_roots,
            EnumBackupDirection::Backup,
            &SpecBackupOptions::default(),
        );
        assert_eq!(l_rel, vec!["real.txt"]);
        assert!(
            builder
                .warnings
                .iter()
                .any(|w| w.contains("Symlink skipped"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn walk_excludes_unreadable_file() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().expect("tempdir");
        let spec_roots = SpecBackupRoots::new(tmp.path());
        write_text(&tmp.path().join("ok.txt"), "ok");
        let path_locked = tmp.path().join("locked.txt");
        write_text(&path_locked, "secret");
        std::fs::set_permissions(&path_locked, std::fs::Permissions::from_mode(0o000))
            .expect("chmod");
        if std::fs::File::open(&path_locked).is_ok() {
            // Privileged user: permission bits are not enforced.
            return;
        }

        let (l_rel, builder) = walk(
            &spec_roots,
            EnumBackupDirection::Backup,
            &SpecBackupOptions::default(),
        );
        assert_eq!(l_rel, vec!["ok.txt"]);
        assert_eq!(builder.errors.len(), 1);
        assert_eq!(builder.errors[0].kind, EnumEntryErrorKind::Access);
    }

    #[test]
    fn walk_missing_root_is_access_error() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_roots = SpecBackupRoots::new(tmp.path());

        let (l_rel, builder) = walk(
            &spec_roots,
            EnumBackupDirection::Restore,
            &SpecBackupOptions::default(),
        );
        assert!(l_rel.is_empty());
        assert_eq!(builder.errors.len(), 1);
        assert_eq!(builder.errors[0].kind, EnumEntryErrorKind::Access);
    }
}
