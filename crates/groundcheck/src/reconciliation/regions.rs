use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::parser::{read_rows, SheetRow};
use super::{log_summary, open_source, warn_maintenance_window, JobError, JobReport, RowOutcome};
use crate::regions::{RegionCode, RegionRepository};

const JOB: &str = "region_allow_new";

/// `true` (any case), `1` and `yes` enable the flag; everything else clears it.
pub fn parse_flag(raw: Option<&str>) -> bool {
    match raw.map(str::trim) {
        Some(value) => {
            value.eq_ignore_ascii_case("true") || value == "1" || value.eq_ignore_ascii_case("yes")
        }
        None => false,
    }
}

/// Sets the per-region "new submissions allowed" flag from `(code, flag)` rows.
pub struct RegionFlagJob {
    regions: Arc<dyn RegionRepository>,
}

impl RegionFlagJob {
    pub fn new(regions: Arc<dyn RegionRepository>) -> Self {
        Self { regions }
    }

    pub async fn run_path(&self, path: &Path) -> Result<JobReport, JobError> {
        info!(job = JOB, path = %path.display(), "reading source file");
        self.run(open_source(path)?).await
    }

    pub async fn run<R: Read>(&self, reader: R) -> Result<JobReport, JobError> {
        let rows = read_rows(reader)?;
        warn_maintenance_window(JOB, rows.len());

        let mut report = JobReport::default();
        for row in &rows {
            report.record(self.process(row).await);
        }

        log_summary(JOB, &report);
        Ok(report)
    }

    async fn process(&self, row: &SheetRow) -> RowOutcome {
        let Some(code) = row.cell(0).map(RegionCode::new) else {
            warn!(job = JOB, line = row.line, "row skipped: missing region code");
            return RowOutcome::Skipped;
        };
        let allow = parse_flag(row.cell(1));

        match self.regions.set_allow_new(&code, allow).await {
            Ok(true) => {
                debug!(job = JOB, line = row.line, code = %code, allow, "region updated");
                RowOutcome::Updated
            }
            Ok(false) => {
                warn!(job = JOB, line = row.line, code = %code, "region not found");
                RowOutcome::NotFound
            }
            Err(err) => {
                error!(job = JOB, line = row.line, code = %code, error = %err, "row failed");
                RowOutcome::Failed
            }
        }
    }
}
