use async_trait::async_trait;

use super::domain::{Idsbr, VerificationRecord, VerificationUpdate};
use super::policy::{LockConflict, ProceedReason, WriteGate};
use crate::auth::Officer;
use crate::leaderboard::{OfficerTally, ProgressStats};
use crate::pagination::{Page, PageRequest};
use crate::regions::RegionCode;
use crate::storage::RepositoryError;

/// Result of the conditional write primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Applied {
        record: VerificationRecord,
        reason: ProceedReason,
    },
    Rejected(LockConflict),
    NotFound,
}

/// Persistent home of verification records.
///
/// `apply_write` is the only mutation of an existing record. It evaluates the
/// gate against the stored ownership and applies the update as one atomic unit
/// with respect to other writers of the same identifier.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Unverified first, then by name, then insertion order.
    async fn list_by_region(
        &self,
        region: &RegionCode,
        request: &PageRequest,
    ) -> Result<Page<VerificationRecord>, RepositoryError>;

    async fn fetch(&self, idsbr: &Idsbr) -> Result<Option<VerificationRecord>, RepositoryError>;

    async fn count_verified_by(&self, email: &str) -> Result<u64, RepositoryError>;

    /// Insert a record discovered in the field. Duplicate identifiers fail
    /// with [`RepositoryError::Conflict`].
    async fn insert_discovered(
        &self,
        record: VerificationRecord,
    ) -> Result<VerificationRecord, RepositoryError>;

    async fn apply_write(
        &self,
        update: VerificationUpdate,
        gate: WriteGate,
    ) -> Result<WriteOutcome, RepositoryError>;

    /// Verified-record counts per (name, email), filtered by officer name.
    async fn officer_tallies(&self, name_search: &str)
        -> Result<Vec<OfficerTally>, RepositoryError>;

    async fn progress(&self) -> Result<ProgressStats, RepositoryError>;

    /// Verified records, most recently verified first.
    async fn verified_records(&self) -> Result<Vec<VerificationRecord>, RepositoryError>;

    /// Interactive entry point: the requester must pass the ownership lock.
    async fn verify_guarded(
        &self,
        update: VerificationUpdate,
        requester: Officer,
    ) -> Result<WriteOutcome, RepositoryError> {
        self.apply_write(update, WriteGate::OwnershipChecked(requester))
            .await
    }

    /// Bulk entry point: overrides any owner. See [`WriteGate::Unconditional`].
    async fn verify_unconditionally(
        &self,
        update: VerificationUpdate,
    ) -> Result<WriteOutcome, RepositoryError> {
        self.apply_write(update, WriteGate::Unconditional).await
    }
}
