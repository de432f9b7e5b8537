//! JSON API consumed by the officer and admin dashboards.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRef, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::auth::{AdminOfficer, AuthError, AuthService, AuthenticatedOfficer};
use crate::export;
use crate::leaderboard::LeaderboardEngine;
use crate::pagination::PageRequest;
use crate::regions::RegionIndex;
use crate::storage::{RepositoryError, Stores};
use crate::verification::{Clock, VerificationError, VerificationService, VerificationSubmission};

/// Services shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<AuthService>,
    pub regions: RegionIndex,
    pub verification: Arc<VerificationService>,
    pub leaderboard: Arc<LeaderboardEngine>,
    pub clock: Arc<dyn Clock>,
}

impl ApiState {
    pub fn new(stores: &Stores, auth: Arc<AuthService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            auth,
            regions: RegionIndex::new(stores.regions.clone()),
            verification: Arc::new(VerificationService::new(
                stores.records.clone(),
                clock.clone(),
            )),
            leaderboard: Arc::new(LeaderboardEngine::new(stores.records.clone())),
            clock,
        }
    }
}

impl FromRef<ApiState> for Arc<AuthService> {
    fn from_ref(state: &ApiState) -> Self {
        state.auth.clone()
    }
}

pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/login", post(login_handler))
        .route("/api/logout", post(logout_handler))
        .route("/api/regions", get(region_roots_handler))
        .route("/api/regions/:code", get(region_children_handler))
        .route("/api/regions/:code/ancestry", get(region_ancestry_handler))
        .route("/api/records/:region_code", get(records_handler))
        .route("/api/verifications", post(verification_handler))
        .route("/api/officers/me/stats", get(officer_stats_handler))
        .route("/api/admin/leaderboard", get(leaderboard_handler))
        .route("/api/admin/stats", get(progress_handler))
        .route("/api/admin/export", get(export_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

pub(crate) async fn login_handler(
    State(state): State<ApiState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_rejection_response(rejection),
    };
    match state.auth.login(&request.email, &request.password).await {
        Ok(grant) => (StatusCode::OK, Json(grant)).into_response(),
        Err(AuthError::Repository(err)) => repository_error_response(err),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn logout_handler(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let Some(token) = crate::auth::bearer_token(&headers) else {
        return AuthError::MissingSession.into_response();
    };
    match state.auth.logout(token).await {
        Ok(revoked) => (StatusCode::OK, Json(json!({ "success": revoked }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn region_roots_handler(
    State(state): State<ApiState>,
    AuthenticatedOfficer(_officer): AuthenticatedOfficer,
) -> Response {
    match state.regions.list_roots().await {
        Ok(regions) => (StatusCode::OK, Json(regions)).into_response(),
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn region_children_handler(
    State(state): State<ApiState>,
    AuthenticatedOfficer(_officer): AuthenticatedOfficer,
    Path(code): Path<String>,
) -> Response {
    match state.regions.list_children(&code).await {
        Ok(regions) => (StatusCode::OK, Json(regions)).into_response(),
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn region_ancestry_handler(
    State(state): State<ApiState>,
    AuthenticatedOfficer(_officer): AuthenticatedOfficer,
    Path(code): Path<String>,
) -> Response {
    match state.regions.ancestry(&code).await {
        Ok(path) => (StatusCode::OK, Json(path)).into_response(),
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn records_handler(
    State(state): State<ApiState>,
    AuthenticatedOfficer(_officer): AuthenticatedOfficer,
    Path(region_code): Path<String>,
    Query(request): Query<PageRequest>,
) -> Response {
    match state
        .verification
        .list_region_records(&region_code, &request)
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => verification_error_response(err),
    }
}

pub(crate) async fn verification_handler(
    State(state): State<ApiState>,
    AuthenticatedOfficer(officer): AuthenticatedOfficer,
    payload: Result<Json<VerificationSubmission>, JsonRejection>,
) -> Response {
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_rejection_response(rejection),
    };
    match state.verification.submit(&officer, submission).await {
        Ok(record) => (StatusCode::OK, Json(json!({ "success": true, "record": record })))
            .into_response(),
        Err(err) => verification_error_response(err),
    }
}

pub(crate) async fn officer_stats_handler(
    State(state): State<ApiState>,
    AuthenticatedOfficer(officer): AuthenticatedOfficer,
) -> Response {
    match state.verification.completed_count(officer.email()).await {
        Ok(total) => (StatusCode::OK, Json(json!({ "total": total }))).into_response(),
        Err(err) => verification_error_response(err),
    }
}

pub(crate) async fn leaderboard_handler(
    State(state): State<ApiState>,
    AdminOfficer(_admin): AdminOfficer,
    Query(request): Query<PageRequest>,
) -> Response {
    match state.leaderboard.leaderboard(&request).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn progress_handler(
    State(state): State<ApiState>,
    AdminOfficer(_admin): AdminOfficer,
) -> Response {
    match state.leaderboard.progress().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn export_handler(
    State(state): State<ApiState>,
    AdminOfficer(admin): AdminOfficer,
) -> Response {
    let rows = match state.leaderboard.export_rows().await {
        Ok(rows) => rows,
        Err(err) => return repository_error_response(err),
    };

    let body = match export::to_csv_bytes(&rows) {
        Ok(body) => body,
        Err(err) => {
            error!(error = %err, "failed to render export");
            let payload = json!({ "error": "export could not be generated" });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response();
        }
    };

    tracing::info!(admin = %admin.identity.email, rows = rows.len(), "export generated");
    let disposition = format!(
        "attachment; filename=\"Export_GC_Pro_{}.csv\"",
        state.clock.now().timestamp_millis()
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// Malformed request bodies keep axum's status but use the `{"error"}` shape.
fn json_rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({ "error": rejection.body_text() });
    (rejection.status(), Json(payload)).into_response()
}

fn verification_error_response(err: VerificationError) -> Response {
    match err {
        VerificationError::LockConflict { idsbr, owner_email } => {
            let payload = json!({
                "error": "record owned by another officer",
                "idsbr": idsbr,
                "owner": owner_email,
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        VerificationError::NotFound(idsbr) => {
            let payload = json!({
                "error": format!("business {idsbr} not found"),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        VerificationError::Invalid(invalid) => {
            let payload = json!({
                "error": invalid.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        VerificationError::Repository(err) => repository_error_response(err),
    }
}

fn repository_error_response(err: RepositoryError) -> Response {
    error!(error = %err, "storage failure while serving request");
    let status = match err {
        RepositoryError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
        RepositoryError::Conflict
        | RepositoryError::MissingReference
        | RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": "storage temporarily unavailable",
    });
    (status, Json(payload)).into_response()
}
