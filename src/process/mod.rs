//! # Processes
//!
//! Every ingestion job implements [`Process`]: it owns a name, a named
//! [`Logger`] and the collaborators it was constructed with, and exposes
//! `run` and `clean`. Jobs are driven by [`execute`], which always calls
//! `clean` after `run`, whether `run` succeeded or not.
//!
//! Collaborators are injected at construction. The `from_settings`
//! constructors derive them from [`Settings`] once and fail fast when
//! configuration is missing.

use std::time::Instant;

use async_trait::async_trait;
use clap::ValueEnum;

use crate::{config::Settings, error::ProcessError, logging::Logger};

mod raw;

pub use raw::GetRawDataFromSource;

#[async_trait]
pub trait Process: Send {
    fn name(&self) -> &str;

    fn logger(&self) -> &Logger;

    /// Executes the job. Only the first call does any work.
    async fn run(&mut self) -> Result<(), ProcessError>;

    /// Releases or rolls back whatever `run` touched. Safe to call after a
    /// failed or skipped `run`, and a no-op when there is nothing to clean.
    async fn clean(&mut self) -> Result<(), ProcessError>;
}

/// Runs `process` and cleans it up afterwards.
///
/// Returns the `run` error if there was one, otherwise the `clean` error.
pub async fn execute(process: &mut dyn Process) -> Result<(), ProcessError> {
    let started = Instant::now();
    process.logger().info(format!("Starting {}", process.name()));

    let run_result = process.run().await;
    if let Err(e) = &run_result {
        process.logger().error(format!("Run failed: {}", e));
    }

    let clean_result = process.clean().await;
    if let Err(e) = &clean_result {
        process.logger().error(format!("Clean failed: {}", e));
    }

    let result = run_result.and(clean_result);
    if result.is_ok() {
        process.logger().info(format!(
            "Finished {} in {:.1?}",
            process.name(),
            started.elapsed()
        ));
    }
    result
}

/// The processes selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProcessKind {
    /// Fetch playlists and tracks from Spotify into the raw zone
    Raw,
}

impl ProcessKind {
    pub fn process_name(self) -> &'static str {
        match self {
            ProcessKind::Raw => "get-raw-data-from-spotify",
        }
    }
}

/// Builds the process for `kind` from `settings`.
pub async fn build(kind: ProcessKind, settings: &Settings) -> Result<Box<dyn Process>, ProcessError> {
    match kind {
        ProcessKind::Raw => Ok(Box::new(
            GetRawDataFromSource::from_settings(kind.process_name(), settings).await?,
        )),
    }
}
