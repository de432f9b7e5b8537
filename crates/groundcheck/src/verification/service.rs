use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::clock::{civil_time, Clock};
use super::domain::{
    required_text, Coordinate, Idsbr, OperatingStatus, ValidationError, VerificationRecord,
    VerificationSubmission, VerificationUpdate,
};
use super::repository::{VerificationStore, WriteOutcome};
use crate::auth::Officer;
use crate::pagination::{Page, PageRequest};
use crate::regions::RegionCode;
use crate::storage::RepositoryError;

/// Attempts at minting a fresh identifier before giving up.
const DISCOVERY_ID_ATTEMPTS: usize = 3;

static DISCOVERY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn mint_discovery_id(now: DateTime<Utc>) -> Idsbr {
    let sequence = DISCOVERY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    Idsbr(format!("NEW-{}-{sequence}", now.timestamp_millis()))
}

/// Officer-facing verification workflow on top of a [`VerificationStore`].
pub struct VerificationService {
    store: Arc<dyn VerificationStore>,
    clock: Arc<dyn Clock>,
}

impl VerificationService {
    pub fn new(store: Arc<dyn VerificationStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn list_region_records(
        &self,
        region_code: &str,
        request: &PageRequest,
    ) -> Result<Page<VerificationRecord>, VerificationError> {
        let region = RegionCode::new(region_code);
        Ok(self.store.list_by_region(&region, request).await?)
    }

    pub async fn record(&self, idsbr: &Idsbr) -> Result<VerificationRecord, VerificationError> {
        self.store
            .fetch(idsbr)
            .await?
            .ok_or_else(|| VerificationError::NotFound(idsbr.clone()))
    }

    /// Records verified by `email`.
    pub async fn completed_count(&self, email: &str) -> Result<u64, VerificationError> {
        Ok(self.store.count_verified_by(email).await?)
    }

    /// Apply an officer's submission: either register a newly discovered
    /// business or verify an existing one through the ownership lock.
    pub async fn submit(
        &self,
        officer: &Officer,
        submission: VerificationSubmission,
    ) -> Result<VerificationRecord, VerificationError> {
        let coordinate = Coordinate::new(submission.latitude, submission.longitude)?;
        let status = OperatingStatus::parse(&submission.status)?;

        if submission.is_new {
            return self
                .register_discovered(officer, submission, coordinate, status)
                .await;
        }

        let idsbr = required_text(submission.idsbr.as_deref(), "idsbr").map(Idsbr)?;
        self.verify_existing(officer, idsbr, coordinate, status)
            .await
    }

    async fn verify_existing(
        &self,
        officer: &Officer,
        idsbr: Idsbr,
        coordinate: Coordinate,
        status: OperatingStatus,
    ) -> Result<VerificationRecord, VerificationError> {
        let update = VerificationUpdate {
            idsbr: idsbr.clone(),
            coordinate: Some(coordinate),
            status,
            owner: officer.identity.clone(),
            verified_at: self.clock.civil_now(),
        };

        match self.store.verify_guarded(update, officer.clone()).await? {
            WriteOutcome::Applied { record, reason } => {
                info!(
                    idsbr = %record.idsbr,
                    officer = %officer.identity.email,
                    reason = reason.label(),
                    "verification recorded"
                );
                Ok(record)
            }
            WriteOutcome::Rejected(conflict) => {
                let owner_email = conflict.owner.map(|owner| owner.email);
                warn!(
                    idsbr = %idsbr,
                    officer = %officer.identity.email,
                    owner = owner_email.as_deref().unwrap_or("<none>"),
                    "verification rejected: record locked by another officer"
                );
                Err(VerificationError::LockConflict { idsbr, owner_email })
            }
            WriteOutcome::NotFound => Err(VerificationError::NotFound(idsbr)),
        }
    }

    async fn register_discovered(
        &self,
        officer: &Officer,
        submission: VerificationSubmission,
        coordinate: Coordinate,
        status: OperatingStatus,
    ) -> Result<VerificationRecord, VerificationError> {
        let name = required_text(submission.name.as_deref(), "name")?;
        let region_code = required_text(submission.region_code.as_deref(), "region_code")?;
        let address = submission
            .address
            .map(|address| address.trim().to_string())
            .unwrap_or_default();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = self.clock.now();
            let record = VerificationRecord {
                idsbr: mint_discovery_id(now),
                name: name.clone(),
                address: address.clone(),
                region_code: RegionCode::new(&region_code),
                coordinate: Some(coordinate),
                status: Some(status.clone()),
                is_verified: true,
                owner: Some(officer.identity.clone()),
                verified_at: Some(civil_time(now)),
            };

            match self.store.insert_discovered(record).await {
                Ok(stored) => {
                    info!(
                        idsbr = %stored.idsbr,
                        region = %stored.region_code,
                        officer = %officer.identity.email,
                        "new business registered"
                    );
                    return Ok(stored);
                }
                Err(RepositoryError::Conflict) if attempt < DISCOVERY_ID_ATTEMPTS => {
                    warn!(attempt, "minted identifier collided, retrying");
                }
                Err(RepositoryError::MissingReference) => {
                    warn!(
                        region = %region_code,
                        officer = %officer.identity.email,
                        "new business rejected: unknown region"
                    );
                    return Err(ValidationError::UnknownRegion(region_code).into());
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Error raised by the verification service.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("record owned by another officer")]
    LockConflict {
        idsbr: Idsbr,
        owner_email: Option<String>,
    },
    #[error("business {0} not found")]
    NotFound(Idsbr),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
