use std::sync::Arc;

use super::{Region, RegionCode, RegionQuery, RegionRepository};
use crate::storage::RepositoryError;

/// Tree view over the region table.
#[derive(Clone)]
pub struct RegionIndex {
    repository: Arc<dyn RegionRepository>,
}

impl RegionIndex {
    pub fn new(repository: Arc<dyn RegionRepository>) -> Self {
        Self { repository }
    }

    /// Top-level regions ordered by name.
    pub async fn list_roots(&self) -> Result<Vec<Region>, RepositoryError> {
        let regions = self.repository.find_regions(&RegionQuery::Roots).await?;
        Ok(by_name(regions))
    }

    /// Every region below `parent_code`, ordered by name. An unknown parent has
    /// no children; an empty parent code lists the roots.
    pub async fn list_children(&self, parent_code: &str) -> Result<Vec<Region>, RepositoryError> {
        let parent = RegionCode::new(parent_code);
        if parent.is_empty() {
            return self.list_roots().await;
        }

        let regions = self
            .repository
            .find_regions(&RegionQuery::DescendantsOf(parent))
            .await?;
        Ok(by_name(regions))
    }

    /// Root-first chain of existing regions ending at `code` (inclusive when
    /// `code` itself exists).
    pub async fn ancestry(&self, code: &str) -> Result<Vec<Region>, RepositoryError> {
        let target = RegionCode::new(code);
        if target.is_empty() {
            return Ok(Vec::new());
        }

        let mut path = self
            .repository
            .find_regions(&RegionQuery::PathTo(target))
            .await?;
        path.sort_by_key(|region| region.code.as_str().len());
        Ok(path)
    }

    /// The existing region whose code is the longest proper prefix of `code`.
    pub async fn parent_of(&self, code: &str) -> Result<Option<Region>, RepositoryError> {
        let target = RegionCode::new(code);
        let path = self.ancestry(code).await?;
        Ok(path
            .into_iter()
            .filter(|region| region.code != target)
            .last())
    }
}

fn by_name(mut regions: Vec<Region>) -> Vec<Region> {
    regions.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
    regions
}
