//! Read-only aggregates over verified records for the admin dashboard.

use std::sync::Arc;

use serde::Serialize;

use crate::export::ExportRow;
use crate::pagination::{Page, PageRequest};
use crate::storage::RepositoryError;
use crate::verification::VerificationStore;

/// Verified-record count for one (name, email) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfficerTally {
    pub name: String,
    pub email: String,
    pub total: u64,
}

/// Global progress counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressStats {
    pub total: u64,
    pub verified: u64,
    pub pending: u64,
}

pub struct LeaderboardEngine {
    store: Arc<dyn VerificationStore>,
}

impl LeaderboardEngine {
    pub fn new(store: Arc<dyn VerificationStore>) -> Self {
        Self { store }
    }

    /// Officers by verified count (desc), then name, then e-mail.
    pub async fn leaderboard(
        &self,
        request: &PageRequest,
    ) -> Result<Page<OfficerTally>, RepositoryError> {
        let mut tallies = self.store.officer_tallies(request.search()).await?;
        rank(&mut tallies);
        Ok(Page::from_ordered(tallies, request))
    }

    pub async fn progress(&self) -> Result<ProgressStats, RepositoryError> {
        self.store.progress().await
    }

    /// Verified records, most recent first, shaped for the spreadsheet export.
    pub async fn export_rows(&self) -> Result<Vec<ExportRow>, RepositoryError> {
        let records = self.store.verified_records().await?;
        Ok(records.iter().map(ExportRow::from).collect())
    }
}

pub(crate) fn rank(tallies: &mut [OfficerTally]) {
    tallies.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.email.cmp(&b.email))
    });
}
