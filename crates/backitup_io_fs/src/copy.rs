//! Concurrent file-copy stage.

use std::fs::{self, File, Permissions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::conf::{C_TEMP_FILE_PREFIX, C_TEMP_FILE_SUFFIX};
use crate::mapper::map_path;
use crate::recency::{EnumRecency, check_destination_recency};
use crate::report::ReportBackupBuilder;
use crate::spec::{
    EnumEntryErrorKind, EnumEntryKind, SpecBackupOptions, SpecBackupRoots, SpecFileEntry,
    SpecWorkList,
};
use crate::util::{calculate_worker_limit, stream_chunked};

/// Aggregate of one copy stage, derived from the work list after the join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecCopyTotals {
    /// Entries with `bytes_copied > 0`.
    pub cnt_files_copied: u64,
    /// Sum of `bytes_copied` over all entries.
    pub cnt_bytes_copied: u64,
}

impl SpecCopyTotals {
    pub fn from_work_list(work_list: &SpecWorkList) -> Self {
        work_list
            .iter()
            .fold(Self::default(), |mut spec_totals, spec_entry| {
                if spec_entry.bytes_copied > 0 {
                    spec_totals.cnt_files_copied += 1;
                    spec_totals.cnt_bytes_copied += spec_entry.bytes_copied;
                }
                spec_totals
            })
    }
}

#[derive(Debug)]
enum EnumCopyOutcome {
    Copied {
        path_file_dst: PathBuf,
        bytes_copied: u64,
        if_overwrote: bool,
    },
    SkippedCurrent {
        path_file_dst: PathBuf,
    },
    SkippedDryRun {
        path_file_dst: PathBuf,
        recency: EnumRecency,
    },
    Cancelled,
    Failed {
        path: PathBuf,
        kind: EnumEntryErrorKind,
        message: String,
    },
}

/// Copy every entry of `work_list` to its mapped destination.
///
/// Each entry is an independent unit executed on a pool of at most
/// `num_workers_max` threads. Units share nothing but `flag_cancel`; each one
/// writes only its own `bytes_copied`. The call returns after every unit has
/// finished, failed, been skipped or been cancelled. Outcomes are recorded in
/// `builder_report`; the returned totals are the only source of the copied
/// file and byte counters.
///
/// Destination bytes are streamed into a temp file next to the destination and
/// renamed over it, so an aborted unit never leaves a partial destination.
pub fn run_copy_engine(
    work_list: &mut SpecWorkList,
    spec_roots: &SpecBackupRoots,
    spec_options: &SpecBackupOptions,
    flag_cancel: &AtomicBool,
    builder_report: &mut ReportBackupBuilder,
) -> SpecCopyTotals {
    if work_list.is_empty() {
        return SpecCopyTotals::default();
    }

    let n_workers_max = calculate_worker_limit(spec_options.num_workers_max);
    let if_dry_run = spec_options.if_dry_run;
    info!(
        n_files = work_list.len(),
        n_workers = n_workers_max,
        if_dry_run,
        "copy phase started"
    );

    let run_unit = |spec_entry: &mut SpecFileEntry| {
        let outcome = copy_file_entry(spec_entry, spec_roots, if_dry_run, flag_cancel);
        if let EnumCopyOutcome::Copied { bytes_copied, .. } = &outcome {
            spec_entry.bytes_copied = *bytes_copied;
        }
        (spec_entry.task_id, outcome)
    };

    let l_outcomes: Vec<(usize, EnumCopyOutcome)> = if n_workers_max <= 1 {
        work_list.entries_mut().iter_mut().map(run_unit).collect()
    } else {
        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(n_workers_max)
            .thread_name(|n_idx| format!("backitup-copy-{n_idx}"))
            .build();
        match thread_pool {
            Ok(thread_pool) => thread_pool.install(|| {
                work_list
                    .entries_mut()
                    .par_iter_mut()
                    .map(run_unit)
                    .collect()
            }),
            Err(e) => {
                builder_report.add_warning(format!(
                    "Failed to initialize thread pool (workers={n_workers_max}, {e}); fallback to serial copy."
                ));
                work_list.entries_mut().iter_mut().map(run_unit).collect()
            }
        }
    };

    apply_outcomes(l_outcomes, builder_report);
    let spec_totals = SpecCopyTotals::from_work_list(work_list);
    info!(
        cnt_files_copied = spec_totals.cnt_files_copied,
        cnt_bytes_copied = spec_totals.cnt_bytes_copied,
        "copy phase finished"
    );
    spec_totals
}

fn apply_outcomes(
    l_outcomes: Vec<(usize, EnumCopyOutcome)>,
    builder_report: &mut ReportBackupBuilder,
) {
    let mut n_cancelled: usize = 0;
    for (task_id, outcome) in l_outcomes {
        match outcome {
            EnumCopyOutcome::Copied {
                path_file_dst,
                bytes_copied,
                if_overwrote,
            } => {
                debug!(task_id, bytes_copied, path = %path_file_dst.display(), "copied");
                if if_overwrote {
                    builder_report.add_warning(format!(
                        "Overwrote existing destination: {}",
                        path_file_dst.display()
                    ));
                }
            }
            EnumCopyOutcome::SkippedCurrent { path_file_dst } => {
                debug!(task_id, path = %path_file_dst.display(), "destination is newer, skipped");
                builder_report.add_skipped();
            }
            EnumCopyOutcome::SkippedDryRun {
                path_file_dst,
                recency,
            } => {
                info!(task_id, ?recency, path = %path_file_dst.display(), "dry-run: would copy");
                builder_report.add_skipped();
            }
            EnumCopyOutcome::Cancelled => {
                n_cancelled += 1;
                builder_report.add_skipped();
            }
            EnumCopyOutcome::Failed {
                path,
                kind,
                message,
            } => builder_report.add_error(path, kind, message),
        }
    }

    if n_cancelled > 0 {
        builder_report.if_cancelled = true;
        builder_report.add_warning(format!(
            "Copy cancelled; {n_cancelled} entries were not copied"
        ));
    }
}

fn copy_file_entry(
    spec_entry: &SpecFileEntry,
    spec_roots: &SpecBackupRoots,
    if_dry_run: bool,
    flag_cancel: &AtomicBool,
) -> EnumCopyOutcome {
    if flag_cancel.load(Ordering::Relaxed) {
        return EnumCopyOutcome::Cancelled;
    }

    let path_file_src = &spec_entry.path_file_src;
    let path_file_dst = match map_path(
        path_file_src,
        spec_entry.direction,
        EnumEntryKind::File,
        spec_roots,
    ) {
        Ok(v) => v,
        Err(e) => {
            return EnumCopyOutcome::Failed {
                path: path_file_src.clone(),
                kind: EnumEntryErrorKind::PathMapping,
                message: e.to_string(),
            };
        }
    };

    let recency = check_destination_recency(path_file_src, &path_file_dst);
    if !recency.requires_copy() {
        return EnumCopyOutcome::SkippedCurrent { path_file_dst };
    }
    if if_dry_run {
        return EnumCopyOutcome::SkippedDryRun {
            path_file_dst,
            recency,
        };
    }

    let res_copy = copy_file_atomic(path_file_src, &path_file_dst, flag_cancel);
    outcome_of_copy(res_copy, path_file_dst, recency)
}

fn outcome_of_copy(
    res_copy: io::Result<Option<u64>>,
    path_file_dst: PathBuf,
    recency: EnumRecency,
) -> EnumCopyOutcome {
    match res_copy {
        Ok(Some(bytes_copied)) => EnumCopyOutcome::Copied {
            path_file_dst,
            bytes_copied,
            if_overwrote: recency == EnumRecency::SourceNewer,
        },
        Ok(None) => EnumCopyOutcome::Cancelled,
        Err(e) => EnumCopyOutcome::Failed {
            path: path_file_dst,
            kind: EnumEntryErrorKind::Io,
            message: e.to_string(),
        },
    }
}

/// Stream `path_file_src` into a sibling temp file of `path_file_dst`, then
/// rename it into place.
///
/// The renamed file takes the permissions of the destination it replaces, or
/// of the source when there is none, never the private mode of the temp file.
fn copy_file_atomic(
    path_file_src: &Path,
    path_file_dst: &Path,
    flag_cancel: &AtomicBool,
) -> io::Result<Option<u64>> {
    let mut file_src = File::open(path_file_src)?;
    let permissions = match fs::metadata(path_file_dst) {
        Ok(meta_dst) => meta_dst.permissions(),
        Err(_) => file_src.metadata()?.permissions(),
    };
    write_file_atomic(&mut file_src, path_file_dst, permissions, flag_cancel)
}

/// `Ok(None)` means cancelled; the temp file is removed on drop and the
/// destination is left untouched.
fn write_file_atomic<R: Read>(
    reader: &mut R,
    path_file_dst: &Path,
    permissions: Permissions,
    flag_cancel: &AtomicBool,
) -> io::Result<Option<u64>> {
    let path_dir_parent = path_file_dst.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Destination has no parent directory: {}",
                path_file_dst.display()
            ),
        )
    })?;

    let mut file_tmp = tempfile::Builder::new()
        .prefix(C_TEMP_FILE_PREFIX)
        .suffix(C_TEMP_FILE_SUFFIX)
        .tempfile_in(path_dir_parent)?;
    let Some(bytes_copied) = stream_chunked(reader, &mut file_tmp, flag_cancel)? else {
        return Ok(None);
    };
    file_tmp.as_file().set_permissions(permissions)?;
    file_tmp.persist(path_file_dst).map_err(|e| e.error)?;
    Ok(Some(bytes_copied))
}
