use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Officer, OfficerIdentity, Role};
use crate::storage::RepositoryError;

/// Login account. `credential` is whatever the configured
/// [`CredentialScheme`](super::CredentialScheme) produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerAccount {
    pub identity: OfficerIdentity,
    #[serde(skip_serializing)]
    pub credential: String,
    pub role: Role,
}

impl OfficerAccount {
    pub fn officer(&self) -> Officer {
        Officer::new(self.identity.clone(), self.role)
    }
}

/// Account lookup and provisioning.
#[async_trait]
pub trait OfficerDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<OfficerAccount>, RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the e-mail is taken.
    async fn insert_account(&self, account: OfficerAccount) -> Result<(), RepositoryError>;

    /// Drops any account with the same e-mail and stores this one.
    async fn replace_account(&self, account: OfficerAccount) -> Result<(), RepositoryError>;
}
