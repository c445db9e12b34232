use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::conf::{N_COPY_CHUNK_BYTES, N_WORKERS_DEFAULT_MAX};
use crate::spec::{BackupRunError, EnumPatternMode};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypePatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

/// Compiled user exclude patterns, matched against entry basenames.
#[derive(Debug, Clone, Default)]
pub(crate) struct SpecExcludePatterns {
    patterns_exclude: Option<TypePatternSeq>,
}

impl SpecExcludePatterns {
    pub(crate) fn from_raw(
        patterns_exclude: Option<&[String]>,
        rule_pattern: EnumPatternMode,
    ) -> Result<Self, BackupRunError> {
        Ok(Self {
            patterns_exclude: _compile(patterns_exclude, rule_pattern)?,
        })
    }

    pub(crate) fn is_excluded(&self, name: &str) -> bool {
        match &self.patterns_exclude {
            None => false,
            Some(TypePatternSeq::Literal(v)) => v.iter().any(|p| name.contains(p.as_str())),
            Some(TypePatternSeq::Glob(v)) => v.iter().any(|p| p.is_match(name)),
            Some(TypePatternSeq::Regex(v)) => v.iter().any(|p| p.is_match(name)),
        }
    }
}

fn _compile(
    patterns: Option<&[String]>,
    rule_pattern: EnumPatternMode,
) -> Result<Option<TypePatternSeq>, BackupRunError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumPatternMode::Literal => Ok(Some(TypePatternSeq::Literal(patterns.to_vec()))),
        EnumPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| BackupRunError::InvalidPattern(format!("`{pattern}` ({e})")))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypePatternSeq::Glob(l_glob)))
        }
        EnumPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex = Regex::new(pattern)
                    .map_err(|e| BackupRunError::InvalidPattern(format!("`{pattern}` ({e})")))?;
                l_regex.push(regex);
            }
            Ok(Some(TypePatternSeq::Regex(l_regex)))
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Workers

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, N_WORKERS_DEFAULT_MAX),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Streaming

/// Stream `reader` into `writer` in [`N_COPY_CHUNK_BYTES`] chunks.
///
/// Returns `Ok(None)` when `flag_cancel` is raised between chunks; the caller
/// owns discarding whatever was partially written.
pub(crate) fn stream_chunked<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    flag_cancel: &AtomicBool,
) -> io::Result<Option<u64>> {
    let mut buf = vec![0_u8; N_COPY_CHUNK_BYTES];
    let mut n_bytes_total: u64 = 0;
    loop {
        if flag_cancel.load(Ordering::Relaxed) {
            return Ok(None);
        }
        let n_read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n_read])?;
        n_bytes_total += n_read as u64;
    }
    writer.flush()?;
    Ok(Some(n_bytes_total))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
