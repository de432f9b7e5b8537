//! Administrative region hierarchy encoded as code prefixes.

mod domain;
mod index;

use async_trait::async_trait;

use crate::storage::RepositoryError;

pub use domain::{Region, RegionCode, RegionQuery, ROOT_CODE_MAX_LEN};
pub use index::RegionIndex;

/// Flat region table. Implementations evaluate [`RegionQuery`] and return
/// matches in any order; [`RegionIndex`] owns ordering.
#[async_trait]
pub trait RegionRepository: Send + Sync {
    async fn find_regions(&self, query: &RegionQuery) -> Result<Vec<Region>, RepositoryError>;

    /// Returns `false` when no region carries `code`.
    async fn set_allow_new(&self, code: &RegionCode, allow: bool)
        -> Result<bool, RepositoryError>;
}
