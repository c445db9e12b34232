//! Structural constants shared by the walker, mapper and copy engine.

/// Basename of the shadow root created under the working directory.
pub const C_SHADOW_DIR_NAME: &str = ".backup";
/// Suffix appended to every backed-up file name.
pub const C_BACKUP_SUFFIX: &str = ".bak";
/// Version-control metadata directory skipped during traversal.
pub const C_VCS_DIR_NAME: &str = ".git";
/// Entry names the walker never schedules and never descends into.
pub const TUP_RESERVED_NAMES: [&str; 4] = [".", "..", C_SHADOW_DIR_NAME, C_VCS_DIR_NAME];

/// Name prefix of the in-flight temp file written next to each destination.
pub const C_TEMP_FILE_PREFIX: &str = ".backitup-";
/// Name suffix of the in-flight temp file.
pub const C_TEMP_FILE_SUFFIX: &str = ".tmp";

/// Read/write chunk size used when streaming file bytes.
pub const N_COPY_CHUNK_BYTES: usize = 64 * 1024;
/// Upper bound for the default worker count when none is configured.
pub const N_WORKERS_DEFAULT_MAX: usize = 8;

/// Whether `name` is one of [`TUP_RESERVED_NAMES`].
pub fn is_reserved_name(name: &str) -> bool {
    TUP_RESERVED_NAMES.contains(&name)
}

/// Whether `name` looks like a temp file left behind by an interrupted copy.
pub fn is_temp_file_name(name: &str) -> bool {
    name.len() > C_TEMP_FILE_PREFIX.len() + C_TEMP_FILE_SUFFIX.len()
        && name.starts_with(C_TEMP_FILE_PREFIX)
        && name.ends_with(C_TEMP_FILE_SUFFIX)
}
