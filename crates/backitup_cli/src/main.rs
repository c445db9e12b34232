//! backitup - shadow-directory backup and restore.
//!
//! Entry point for the CLI application.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use backitup_io_fs::{ReportBackup, resolve_working_root, run_backup};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::CliArgs;

const N_EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    setup_logging(&args);

    match run(&args) {
        Ok(report) => {
            println!("{}", report.summary());
            if report.if_cancelled {
                ExitCode::from(N_EXIT_INTERRUPTED)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<ReportBackup> {
    let direction = args.direction();
    let path_dir_working = resolve_working_root(args.directory.as_deref())
        .context("Failed to resolve working directory")?;

    let flag_cancel = Arc::new(AtomicBool::new(false));
    let flag_handler = Arc::clone(&flag_cancel);
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, finishing in-flight copies...");
        flag_handler.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let report = run_backup(
        &path_dir_working,
        direction,
        &args.to_backup_options(),
        &flag_cancel,
    )
    .with_context(|| format!("{direction} of {} failed", path_dir_working.display()))?;

    info!("{report}");
    Ok(report)
}

fn setup_logging(args: &CliArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
