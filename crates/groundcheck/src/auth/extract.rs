use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use super::{AuthError, AuthService, Officer};
use crate::storage::RepositoryError;

/// Caller resolved from an `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedOfficer(pub Officer);

/// Like [`AuthenticatedOfficer`] but rejects non-admin callers with 403.
#[derive(Debug, Clone)]
pub struct AdminOfficer(pub Officer);

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedOfficer
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthService>::from_ref(state);
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingSession)?;
        auth.authenticate(token).await.map(AuthenticatedOfficer)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminOfficer
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedOfficer(officer) =
            AuthenticatedOfficer::from_request_parts(parts, state).await?;
        if !officer.is_admin() {
            return Err(AuthError::Forbidden);
        }
        Ok(AdminOfficer(officer))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::InvalidCredentials | AuthError::MissingSession => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Repository(RepositoryError::Timeout) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AuthError::Repository(err) => {
                error!(error = %err, "session storage failure");
                "storage temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };
        let payload = json!({ "error": message });
        (status, Json(payload)).into_response()
    }
}
