//! Officer identity, credential checks and bearer sessions.
//!
//! The session layer only carries who is calling and with which role; the
//! verification core trusts whatever [`Officer`] it is handed.

mod credentials;
mod directory;
mod extract;
mod service;
mod session;

use serde::{Deserialize, Serialize};

pub use credentials::{CredentialScheme, SaltedSha256};
pub use directory::{OfficerAccount, OfficerDirectory};
pub(crate) use extract::bearer_token;
pub use extract::{AdminOfficer, AuthenticatedOfficer};
pub use service::{AuthError, AuthService, LoginGrant};
pub use session::{Session, SessionRegistry, SessionStore};

/// Name and e-mail stamped onto every record an officer verifies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfficerIdentity {
    pub name: String,
    pub email: String,
}

impl OfficerIdentity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Identity stamped by bulk reconciliation jobs.
    pub fn system() -> Self {
        Self::new("SYSTEM", "system@auto")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Officer,
    Admin,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Officer => "officer",
            Role::Admin => "admin",
        }
    }

    /// Unknown or missing roles fall back to the least privileged one.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Role::Admin,
            _ => Role::Officer,
        }
    }
}

/// Authenticated caller: identity plus privilege level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officer {
    pub identity: OfficerIdentity,
    pub role: Role,
}

impl Officer {
    pub fn new(identity: OfficerIdentity, role: Role) -> Self {
        Self { identity, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn email(&self) -> &str {
        &self.identity.email
    }
}
