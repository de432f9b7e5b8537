//! Storage backends for regions, verification records, officer accounts and
//! login sessions.
//!
//! Both backends implement the same repository traits. [`memory::InMemoryStore`]
//! serves development and tests; [`postgres::PgStore`] is the shared store used
//! when several service instances and bulk jobs run against one database.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use crate::auth::{OfficerDirectory, SessionStore};
use crate::regions::RegionRepository;
use crate::verification::VerificationStore;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    /// A foreign key (such as a record's region) names a row that does not exist.
    #[error("referenced row does not exist")]
    MissingReference,
    #[error("storage operation timed out")]
    Timeout,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// One backend seen through each of its repository traits.
#[derive(Clone)]
pub struct Stores {
    pub regions: Arc<dyn RegionRepository>,
    pub records: Arc<dyn VerificationStore>,
    pub officers: Arc<dyn OfficerDirectory>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Stores {
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: RegionRepository + VerificationStore + OfficerDirectory + SessionStore + 'static,
    {
        Self {
            regions: backend.clone(),
            records: backend.clone(),
            officers: backend.clone(),
            sessions: backend,
        }
    }
}
