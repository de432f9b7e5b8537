use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryError;
use crate::auth::{OfficerAccount, OfficerDirectory, Session, SessionStore};
use crate::leaderboard::{OfficerTally, ProgressStats};
use crate::pagination::{matches_search, Page, PageRequest};
use crate::regions::{Region, RegionCode, RegionQuery, RegionRepository};
use crate::verification::{
    Decision, Idsbr, VerificationRecord, VerificationStore, VerificationUpdate, WriteGate,
    WriteOutcome,
};

/// Single-process store. All state sits behind one mutex, so a gate check and
/// the write it allows can never interleave with another writer.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    regions: BTreeMap<RegionCode, Region>,
    /// Insertion order doubles as the listing tie-breaker.
    records: Vec<VerificationRecord>,
    positions: HashMap<Idsbr, usize>,
    accounts: HashMap<String, OfficerAccount>,
    sessions: HashMap<String, Session>,
}

impl State {
    fn push_record(&mut self, record: VerificationRecord) -> Result<(), RepositoryError> {
        if self.positions.contains_key(&record.idsbr) {
            return Err(RepositoryError::Conflict);
        }
        self.positions
            .insert(record.idsbr.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }
}

impl InMemoryStore {
    pub fn with_regions(regions: impl IntoIterator<Item = Region>) -> Self {
        let store = Self::default();
        store.load_regions(regions);
        store
    }

    /// Administrative load of region reference data.
    pub fn load_regions(&self, regions: impl IntoIterator<Item = Region>) {
        let mut state = self.lock_recovering();
        for region in regions {
            state.regions.insert(region.code.clone(), region);
        }
    }

    /// Administrative load of registry records. Existing identifiers are
    /// left untouched and reported back.
    pub fn load_records(&self, records: impl IntoIterator<Item = VerificationRecord>) -> Vec<Idsbr> {
        let mut state = self.lock_recovering();
        let mut duplicates = Vec::new();
        for record in records {
            let idsbr = record.idsbr.clone();
            if state.push_record(record).is_err() {
                duplicates.push(idsbr);
            }
        }
        duplicates
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
    }

    fn lock_recovering(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RegionRepository for InMemoryStore {
    async fn find_regions(&self, query: &RegionQuery) -> Result<Vec<Region>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .regions
            .values()
            .filter(|region| query.matches(region))
            .cloned()
            .collect())
    }

    async fn set_allow_new(
        &self,
        code: &RegionCode,
        allow: bool,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.lock()?;
        match state.regions.get_mut(code) {
            Some(region) => {
                region.allow_new = allow;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl VerificationStore for InMemoryStore {
    async fn list_by_region(
        &self,
        region: &RegionCode,
        request: &PageRequest,
    ) -> Result<Page<VerificationRecord>, RepositoryError> {
        let state = self.lock()?;
        let mut matching: Vec<(usize, &VerificationRecord)> = state
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| {
                record.region_code == *region && matches_search(&record.name, request.search())
            })
            .collect();

        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            a.is_verified
                .cmp(&b.is_verified)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| seq_a.cmp(seq_b))
        });

        let ordered = matching.into_iter().map(|(_, record)| record.clone()).collect();
        Ok(Page::from_ordered(ordered, request))
    }

    async fn fetch(&self, idsbr: &Idsbr) -> Result<Option<VerificationRecord>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .positions
            .get(idsbr)
            .map(|position| state.records[*position].clone()))
    }

    async fn count_verified_by(&self, email: &str) -> Result<u64, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .records
            .iter()
            .filter(|record| {
                record.is_verified
                    && record
                        .owner
                        .as_ref()
                        .is_some_and(|owner| owner.email == email)
            })
            .count() as u64)
    }

    async fn insert_discovered(
        &self,
        record: VerificationRecord,
    ) -> Result<VerificationRecord, RepositoryError> {
        let mut state = self.lock()?;
        if !state.regions.contains_key(&record.region_code) {
            return Err(RepositoryError::MissingReference);
        }
        state.push_record(record.clone())?;
        Ok(record)
    }

    async fn apply_write(
        &self,
        update: VerificationUpdate,
        gate: WriteGate,
    ) -> Result<WriteOutcome, RepositoryError> {
        let mut state = self.lock()?;
        let Some(position) = state.positions.get(&update.idsbr).copied() else {
            return Ok(WriteOutcome::NotFound);
        };

        let record = &mut state.records[position];
        match gate.evaluate(&record.ownership()) {
            Decision::Reject(conflict) => Ok(WriteOutcome::Rejected(conflict)),
            Decision::Proceed(reason) => {
                record.apply(&update);
                Ok(WriteOutcome::Applied {
                    record: record.clone(),
                    reason,
                })
            }
        }
    }

    async fn officer_tallies(
        &self,
        name_search: &str,
    ) -> Result<Vec<OfficerTally>, RepositoryError> {
        let state = self.lock()?;
        let mut counts: BTreeMap<(String, String), u64> = BTreeMap::new();
        for record in state.records.iter().filter(|record| record.is_verified) {
            let Some(owner) = &record.owner else {
                continue;
            };
            if !matches_search(&owner.name, name_search) {
                continue;
            }
            *counts
                .entry((owner.name.clone(), owner.email.clone()))
                .or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|((name, email), total)| OfficerTally { name, email, total })
            .collect())
    }

    async fn progress(&self) -> Result<ProgressStats, RepositoryError> {
        let state = self.lock()?;
        let total = state.records.len() as u64;
        let verified = state
            .records
            .iter()
            .filter(|record| record.is_verified)
            .count() as u64;
        Ok(ProgressStats {
            total,
            verified,
            pending: total - verified,
        })
    }

    async fn verified_records(&self) -> Result<Vec<VerificationRecord>, RepositoryError> {
        let state = self.lock()?;
        let mut verified: Vec<VerificationRecord> = state
            .records
            .iter()
            .filter(|record| record.is_verified)
            .cloned()
            .collect();
        verified.sort_by(|a, b| b.verified_at.cmp(&a.verified_at));
        Ok(verified)
    }
}

#[async_trait]
impl OfficerDirectory for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<OfficerAccount>, RepositoryError> {
        let state = self.lock()?;
        Ok(state.accounts.get(email).cloned())
    }

    async fn insert_account(&self, account: OfficerAccount) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if state.accounts.contains_key(&account.identity.email) {
            return Err(RepositoryError::Conflict);
        }
        state
            .accounts
            .insert(account.identity.email.clone(), account);
        Ok(())
    }

    async fn replace_account(&self, account: OfficerAccount) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state
            .accounts
            .insert(account.identity.email.clone(), account);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn save_session(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if state.sessions.contains_key(&session.token) {
            return Err(RepositoryError::Conflict);
        }
        state
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .sessions
            .get(token)
            .filter(|session| session.expires_at > now)
            .cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<bool, RepositoryError> {
        let mut state = self.lock()?;
        Ok(state.sessions.remove(token).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut state = self.lock()?;
        let before = state.sessions.len();
        state.sessions.retain(|_, session| session.expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}
