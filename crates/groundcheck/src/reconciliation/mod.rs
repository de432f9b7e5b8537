//! Out-of-band batch writers driven by tabular source files.
//!
//! Jobs go through the same storage traits as interactive traffic, so the
//! record invariants hold for bulk rows too. They are meant for maintenance
//! windows: nothing here coordinates with concurrent officer writes.

mod officers;
mod parser;
mod regions;
mod status;

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Serialize;

pub use officers::{reset_admin, OfficerImportJob};
pub use regions::{parse_flag, RegionFlagJob};
pub use status::StatusReconciliation;

/// Per-row tallies for one job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub updated: u64,
    pub not_found: u64,
    pub skipped: u64,
    pub duplicates: u64,
    pub errors: u64,
}

impl JobReport {
    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Updated => self.updated += 1,
            RowOutcome::NotFound => self.not_found += 1,
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Duplicate => self.duplicates += 1,
            RowOutcome::Failed => self.errors += 1,
        }
    }

    pub fn processed(&self) -> u64 {
        self.updated + self.not_found + self.skipped + self.duplicates + self.errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Updated,
    NotFound,
    Skipped,
    Duplicate,
    Failed,
}

impl RowOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RowOutcome::Updated => "updated",
            RowOutcome::NotFound => "not_found",
            RowOutcome::Skipped => "skipped",
            RowOutcome::Duplicate => "duplicate",
            RowOutcome::Failed => "error",
        }
    }
}

/// Fatal job failure. Individual bad rows never end up here.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("unable to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unreadable source file: {0}")]
    Source(#[from] csv::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Repository(#[from] crate::storage::RepositoryError),
}

pub(crate) fn open_source(path: &Path) -> Result<File, JobError> {
    File::open(path).map_err(|source| JobError::Open {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn warn_maintenance_window(job: &'static str, rows: usize) {
    tracing::warn!(
        job,
        rows,
        "bulk job starting; interactive traffic must be paused for the duration"
    );
}

pub(crate) fn log_summary(job: &'static str, report: &JobReport) {
    tracing::info!(
        job,
        processed = report.processed(),
        updated = report.updated,
        not_found = report.not_found,
        skipped = report.skipped,
        duplicates = report.duplicates,
        errors = report.errors,
        "bulk job finished"
    );
}
