//! Backup report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use crate::copy::SpecCopyTotals;
use crate::spec::{EnumBackupDirection, EnumEntryErrorKind, SpecEntryError};

/// Aggregate counters and diagnostics for one backup or restore run.
#[derive(Debug, Clone)]
pub struct ReportBackup {
    /// Direction of the run.
    pub direction: EnumBackupDirection,
    /// Regular files scheduled by the walk.
    pub cnt_scanned: u64,
    /// Destination directories created or reused.
    pub cnt_dirs_mirrored: u64,
    /// Entries whose copy wrote more than zero bytes.
    pub cnt_files_copied: u64,
    /// Total bytes written across all entries.
    pub cnt_bytes_copied: u64,
    /// Entries skipped because the destination was current, or by dry-run/cancel.
    pub cnt_skipped: u64,
    /// Whether the copy phase observed a cancellation request.
    pub if_cancelled: bool,
    /// Non-fatal warnings collected during traversal/copy.
    pub warnings: Vec<String>,
    /// Per-entry failures.
    pub errors: Vec<SpecEntryError>,
}

impl ReportBackup {
    /// Number of collected per-entry errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Number of collected errors of `kind`.
    pub fn error_count_of(&self, kind: EnumEntryErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_dirs_mirrored".to_string(), self.cnt_dirs_mirrored);
        dict_counts.insert("cnt_files_copied".to_string(), self.cnt_files_copied);
        dict_counts.insert("cnt_bytes_copied".to_string(), self.cnt_bytes_copied);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Final user-facing summary line.
    pub fn summary(&self) -> String {
        format!(
            "{} files copied ({} bytes)",
            self.cnt_files_copied, self.cnt_bytes_copied
        )
    }

    /// Human-readable one-line counter dump.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} dirs={} copied={} bytes={} skipped={} errors={} warnings={}",
            self.cnt_scanned,
            self.cnt_dirs_mirrored,
            self.cnt_files_copied,
            self.cnt_bytes_copied,
            self.cnt_skipped,
            self.error_count(),
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportBackup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_prefix = match self.direction {
            EnumBackupDirection::Backup => "[BACKUP]",
            EnumBackupDirection::Restore => "[RESTORE]",
        };
        write!(f, "{}", self.format(c_prefix))
    }
}

/// Mutable accumulator shared by the walk and copy phases.
///
/// Every warning and error is also emitted as a `tracing` warning.
#[derive(Debug, Clone)]
pub struct ReportBackupBuilder {
    pub direction: EnumBackupDirection,
    pub cnt_scanned: u64,
    pub cnt_dirs_mirrored: u64,
    pub cnt_files_copied: u64,
    pub cnt_bytes_copied: u64,
    pub cnt_skipped: u64,
    pub if_cancelled: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<SpecEntryError>,
}

impl ReportBackupBuilder {
    pub fn new(direction: EnumBackupDirection) -> Self {
        Self {
            direction,
            cnt_scanned: 0,
            cnt_dirs_mirrored: 0,
            cnt_files_copied: 0,
            cnt_bytes_copied: 0,
            cnt_skipped: 0,
            if_cancelled: false,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    pub fn add_dir_mirrored(&mut self) {
        self.cnt_dirs_mirrored += 1;
    }

    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    /// Take the copied file and byte counters from the copy stage totals.
    pub fn set_copy_totals(&mut self, spec_totals: SpecCopyTotals) {
        self.cnt_files_copied = spec_totals.cnt_files_copied;
        self.cnt_bytes_copied = spec_totals.cnt_bytes_copied;
    }

    pub fn add_warning(&mut self, warning: String) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Add one path-scoped error.
    pub fn add_error(&mut self, path: PathBuf, kind: EnumEntryErrorKind, message: String) {
        let spec_error = SpecEntryError {
            path,
            kind,
            message,
        };
        warn!("{spec_error}");
        self.errors.push(spec_error);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportBackup {
        ReportBackup {
            direction: self.direction,
            cnt_scanned: self.cnt_scanned,
            cnt_dirs_mirrored: self.cnt_dirs_mirrored,
            cnt_files_copied: self.cnt_files_copied,
            cnt_bytes_copied: self.cnt_bytes_copied,
            cnt_skipped: self.cnt_skipped,
            if_cancelled: self.if_cancelled,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}
