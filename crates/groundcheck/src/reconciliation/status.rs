use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::parser::{read_rows, SheetRow};
use super::{log_summary, open_source, warn_maintenance_window, JobError, JobReport, RowOutcome};
use crate::auth::OfficerIdentity;
use crate::verification::{
    Clock, Coordinate, Idsbr, OperatingStatus, VerificationStore, VerificationUpdate,
    WriteOutcome,
};

const JOB: &str = "status_reconciliation";

/// Marks records verified by the system from `(idsbr, status, lat, lng)` rows,
/// overriding whichever officer owned them.
pub struct StatusReconciliation {
    store: Arc<dyn VerificationStore>,
    clock: Arc<dyn Clock>,
}

struct StatusRow {
    idsbr: Idsbr,
    status: OperatingStatus,
    coordinate: Option<Coordinate>,
}

impl StatusReconciliation {
    pub fn new(store: Arc<dyn VerificationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
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
            let outcome = self.process(row).await;
            report.record(outcome);
        }

        log_summary(JOB, &report);
        Ok(report)
    }

    async fn process(&self, row: &SheetRow) -> RowOutcome {
        let Some(parsed) = parse_row(row) else {
            warn!(job = JOB, line = row.line, "row skipped: missing or malformed fields");
            return RowOutcome::Skipped;
        };

        let update = VerificationUpdate {
            idsbr: parsed.idsbr.clone(),
            coordinate: parsed.coordinate,
            status: parsed.status,
            owner: OfficerIdentity::system(),
            verified_at: self.clock.civil_now(),
        };

        match self.store.verify_unconditionally(update).await {
            Ok(WriteOutcome::Applied { record, .. }) => {
                debug!(
                    job = JOB,
                    line = row.line,
                    idsbr = %record.idsbr,
                    status = record.status.as_ref().map(OperatingStatus::as_str).unwrap_or(""),
                    "record updated"
                );
                RowOutcome::Updated
            }
            Ok(WriteOutcome::NotFound) => {
                warn!(job = JOB, line = row.line, idsbr = %parsed.idsbr, "idsbr not found");
                RowOutcome::NotFound
            }
            Ok(WriteOutcome::Rejected(_)) => {
                error!(
                    job = JOB,
                    line = row.line,
                    idsbr = %parsed.idsbr,
                    "unconditional write was rejected"
                );
                RowOutcome::Failed
            }
            Err(err) => {
                error!(job = JOB, line = row.line, idsbr = %parsed.idsbr, error = %err, "row failed");
                RowOutcome::Failed
            }
        }
    }
}

fn parse_row(row: &SheetRow) -> Option<StatusRow> {
    let idsbr = Idsbr::new(row.cell(0)?);
    let status = OperatingStatus::parse(row.cell(1)?).ok()?;

    let coordinate = match (row.cell(2), row.cell(3)) {
        (None, None) => None,
        (Some(lat), Some(lng)) => {
            let latitude = lat.parse::<f64>().ok()?;
            let longitude = lng.parse::<f64>().ok()?;
            Some(Coordinate::new(latitude, longitude).ok()?)
        }
        _ => return None,
    };

    Some(StatusRow {
        idsbr,
        status,
        coordinate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Officer, Role};
    use crate::storage::InMemoryStore;
    use crate::verification::{FixedClock, VerificationRecord};
    use chrono::{TimeZone, Utc};

    fn fixture() -> (Arc<InMemoryStore>, StatusReconciliation) {
        let store = Arc::new(InMemoryStore::default());
        let mut located =
            VerificationRecord::unverified("BIZ002", "Toko Dua", "Jl. Dua", "3201010001");
        located.coordinate = Some(Coordinate::new(-6.5, 106.9).expect("valid"));
        store.load_records(vec![
            VerificationRecord::unverified("BIZ001", "Toko Satu", "Jl. Satu", "3201010001"),
            located,
        ]);
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 1, 5, 2, 0, 0).unwrap(),
        ));
        let job = StatusReconciliation::new(store.clone(), clock);
        (store, job)
    }

    #[tokio::test]
    async fn rows_are_tallied_by_outcome() {
        let (_, job) = fixture();
        let source = "idsbr,status,lat,lng\n\
                      BIZ001,active,-6.2,106.8\n\
                      BIZ999,active,-6.2,106.8\n\
                      ,active,-6.2,106.8\n\
                      BIZ002,closed,,\n\
                      BIZ001,active,-6.2,\n\
                      BIZ001,active,north,106.8\n";
        let report = job.run(source.as_bytes()).await.expect("job runs");
        assert_eq!(report.updated, 2);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.errors, 0);
    }

    #[tokio::test]
    async fn system_write_overrides_owner_and_keeps_coordinate_when_absent() {
        let (store, job) = fixture();
        let owner = Officer::new(OfficerIdentity::new("Ani", "ani@desa.id"), Role::Officer);
        store
            .verify_guarded(
                VerificationUpdate {
                    idsbr: Idsbr::new("BIZ002"),
                    coordinate: None,
                    status: OperatingStatus::parse("active").expect("valid"),
                    owner: owner.identity.clone(),
                    verified_at: Utc::now().naive_utc(),
                },
                owner,
            )
            .await
            .expect("owner write");

        job.run("h\nBIZ002,closed\n".as_bytes())
            .await
            .expect("job runs");

        let record = store
            .fetch(&Idsbr::new("BIZ002"))
            .await
            .expect("fetch")
            .expect("present");
        assert_eq!(record.owner, Some(OfficerIdentity::system()));
        assert_eq!(record.status.as_ref().map(OperatingStatus::as_str), Some("closed"));
        assert_eq!(record.coordinate.map(|c| c.latitude), Some(-6.5));
        assert_eq!(
            record.verified_at.map(|at| at.to_string()),
            Some("2026-01-05 09:00:00".to_string())
        );
    }
}
