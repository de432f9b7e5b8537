use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::{CredentialScheme, Officer, OfficerDirectory, Role, SessionRegistry};
use crate::storage::RepositoryError;

/// Successful login payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginGrant {
    pub token: String,
    pub role: Role,
    pub name: String,
    pub email: String,
}

/// Composes the account directory, credential scheme and session table.
pub struct AuthService {
    directory: Arc<dyn OfficerDirectory>,
    scheme: Arc<dyn CredentialScheme>,
    sessions: Arc<SessionRegistry>,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn OfficerDirectory>,
        scheme: Arc<dyn CredentialScheme>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            directory,
            scheme,
            sessions,
        }
    }

    /// Check credentials and open a session. No session state exists on failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, AuthError> {
        let email = email.trim();
        let account = self.directory.find_by_email(email).await?;

        let Some(account) = account else {
            warn!(email, "login rejected: unknown account");
            return Err(AuthError::InvalidCredentials);
        };
        if !self.scheme.verify(password, &account.credential) {
            warn!(email, "login rejected: credential mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.sessions.open(account.officer()).await?;
        info!(email, role = account.role.label(), "officer signed in");

        Ok(LoginGrant {
            token: session.token,
            role: account.role,
            name: account.identity.name,
            email: account.identity.email,
        })
    }

    /// Revoke `token`; `false` when it was not a live session.
    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.sessions.close(token).await?)
    }

    pub async fn authenticate(&self, token: &str) -> Result<Officer, AuthError> {
        self.sessions
            .resolve(token)
            .await?
            .ok_or(AuthError::MissingSession)
    }
}

/// Error raised while establishing who is calling.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("authentication required")]
    MissingSession,
    #[error("administrator access required")]
    Forbidden,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
