//! Command-line arguments and their mapping onto run options.

use std::path::PathBuf;

use backitup_io_fs::{EnumBackupDirection, EnumPatternMode, SpecBackupOptions};
use clap::{ArgAction, Parser, ValueEnum};

/// Mirror the working directory into `.backup`, or restore it from there.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "backitup",
    version,
    about = "Mirror the working directory into .backup, or restore it from there",
    after_help = "EXAMPLES:\n    \
        backitup                      # back up the current directory\n    \
        backitup --restore            # restore files from .backup\n    \
        backitup --exclude '*.log' -j 4\n    \
        backitup -C ~/project --dry-run -v"
)]
pub struct CliArgs {
    /// Restore files from .backup into the working tree
    #[arg(short = 'r', long)]
    pub restore: bool,

    /// Working directory to operate on (defaults to the current directory)
    #[arg(short = 'C', long = "directory", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Maximum number of concurrent copy workers
    #[arg(short = 'j', long = "workers", value_name = "NUM")]
    pub workers: Option<usize>,

    /// Skip entries whose name matches PATTERN (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// How --exclude patterns are interpreted
    #[arg(long, value_enum, default_value_t = CliPatternMode::Glob)]
    pub pattern_mode: CliPatternMode,

    /// Report what would be copied without writing any file
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliPatternMode {
    Glob,
    Regex,
    Literal,
}

impl From<CliPatternMode> for EnumPatternMode {
    fn from(value: CliPatternMode) -> Self {
        match value {
            CliPatternMode::Glob => EnumPatternMode::Glob,
            CliPatternMode::Regex => EnumPatternMode::Regex,
            CliPatternMode::Literal => EnumPatternMode::Literal,
        }
    }
}

impl CliArgs {
    pub fn direction(&self) -> EnumBackupDirection {
        if self.restore {
            EnumBackupDirection::Restore
        } else {
            EnumBackupDirection::Backup
        }
    }

    pub fn to_backup_options(&self) -> SpecBackupOptions {
        SpecBackupOptions {
            patterns_exclude: (!self.exclude_patterns.is_empty())
                .then(|| self.exclude_patterns.clone()),
            rule_pattern: self.pattern_mode.into(),
            num_workers_max: self.workers,
            if_dry_run: self.dry_run,
        }
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "backitup=info,backitup_io_fs=info,warn",
            1 => "backitup=debug,backitup_io_fs=debug,warn",
            _ => "backitup=trace,backitup_io_fs=trace,warn",
        }
    }
}

#[cfg(test)]
mod tests {
    use backitup_io_fs::{EnumBackupDirection, EnumPatternMode};
    use clap::Parser;

    use super::CliArgs;

    #[test]
    fn no_arguments_means_backup() {
        let args = CliArgs::try_parse_from(["backitup"]).expect("parse");
        assert_eq!(args.direction(), EnumBackupDirection::Backup);

        let spec_options = args.to_backup_options();
        assert!(spec_options.patterns_exclude.is_none());
        assert_eq!(spec_options.rule_pattern, EnumPatternMode::Glob);
        assert!(!spec_options.if_dry_run);
        assert_eq!(args.log_directive(), "backitup=info,backitup_io_fs=info,warn");
    }

    #[test]
    fn restore_flag_selects_restore() {
        let args = CliArgs::try_parse_from(["backitup", "-r"]).expect("parse short");
        assert_eq!(args.direction(), EnumBackupDirection::Restore);
        let args = CliArgs::try_parse_from(["backitup", "--restore"]).expect("parse long");
        assert_eq!(args.direction(), EnumBackupDirection::Restore);
    }

    #[test]
    fn stray_arguments_are_usage_errors() {
        assert!(CliArgs::try_parse_from(["backitup", "extra"]).is_err());
        assert!(CliArgs::try_parse_from(["backitup", "--bogus"]).is_err());
        assert!(CliArgs::try_parse_from(["backitup", "-v", "-q"]).is_err());
    }

    #[test]
    fn options_are_mapped() {
        let args = CliArgs::try_parse_from([
            "backitup",
            "--exclude",
            "*.log",
            "--exclude",
            "^tmp",
            "--pattern-mode",
            "regex",
            "-j",
            "3",
            "--dry-run",
            "-vv",
        ])
        .expect("parse");

        let spec_options = args.to_backup_options();
        assert_eq!(
            spec_options.patterns_exclude,
            Some(vec!["*.log".to_string(), "^tmp".to_string()])
        );
        assert_eq!(spec_options.rule_pattern, EnumPatternMode::Regex);
        assert_eq!(spec_options.num_workers_max, Some(3));
        assert!(spec_options.if_dry_run);
        assert_eq!(
            args.log_directive(),
            "backitup=trace,backitup_io_fs=trace,warn"
        );
    }
}
