use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::parser::{read_rows, SheetRow};
use super::{log_summary, open_source, warn_maintenance_window, JobError, JobReport, RowOutcome};
use crate::auth::{CredentialScheme, OfficerAccount, OfficerDirectory, OfficerIdentity, Role};
use crate::storage::RepositoryError;

const JOB: &str = "officer_import";

/// Provisions officer accounts from `(name, email, password)` rows.
pub struct OfficerImportJob {
    directory: Arc<dyn OfficerDirectory>,
    scheme: Arc<dyn CredentialScheme>,
}

impl OfficerImportJob {
    pub fn new(directory: Arc<dyn OfficerDirectory>, scheme: Arc<dyn CredentialScheme>) -> Self {
        Self { directory, scheme }
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
        let (Some(name), Some(email), Some(password)) = (row.cell(0), row.cell(1), row.cell(2))
        else {
            warn!(job = JOB, line = row.line, "row skipped: missing name, email or password");
            return RowOutcome::Skipped;
        };

        match self.directory.find_by_email(email).await {
            Ok(Some(_)) => {
                warn!(job = JOB, line = row.line, email, "account already exists");
                return RowOutcome::Duplicate;
            }
            Ok(None) => {}
            Err(err) => {
                error!(job = JOB, line = row.line, email, error = %err, "lookup failed");
                return RowOutcome::Failed;
            }
        }

        let account = OfficerAccount {
            identity: OfficerIdentity::new(name, email),
            credential: self.scheme.hash(password),
            role: Role::Officer,
        };

        match self.directory.insert_account(account).await {
            Ok(()) => {
                debug!(job = JOB, line = row.line, email, "account created");
                RowOutcome::Updated
            }
            Err(RepositoryError::Conflict) => {
                warn!(job = JOB, line = row.line, email, "account already exists");
                RowOutcome::Duplicate
            }
            Err(err) => {
                error!(job = JOB, line = row.line, email, error = %err, "insert failed");
                RowOutcome::Failed
            }
        }
    }
}

/// Replace whatever account holds `email` with an administrator account.
pub async fn reset_admin(
    directory: &dyn OfficerDirectory,
    scheme: &dyn CredentialScheme,
    name: &str,
    email: &str,
    password: &str,
) -> Result<OfficerAccount, JobError> {
    let (name, email) = (name.trim(), email.trim());
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(JobError::InvalidArgument(
            "name, email and password are required".to_string(),
        ));
    }

    let account = OfficerAccount {
        identity: OfficerIdentity::new(name, email),
        credential: scheme.hash(password),
        role: Role::Admin,
    };
    directory.replace_account(account.clone()).await?;
    info!(email, "administrator account reset");
    Ok(account)
}
