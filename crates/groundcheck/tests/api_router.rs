//! HTTP contract of the JSON API, exercised with `oneshot` requests against
//! an in-memory backend.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use groundcheck::auth::{
    AuthService, CredentialScheme, OfficerAccount, OfficerDirectory, OfficerIdentity, Role,
    SaltedSha256, SessionRegistry,
};
use groundcheck::regions::Region;
use groundcheck::router::{api_router, ApiState};
use groundcheck::storage::{InMemoryStore, Stores};
use groundcheck::verification::{SystemClock, VerificationRecord};

async fn app() -> Router {
    let store = Arc::new(InMemoryStore::with_regions(vec![
        Region::new("3201", "Kabupaten Bogor"),
        Region::new("3201010", "Cibinong"),
        Region::new("3201010001", "Pakansari"),
    ]));
    store.load_records((1..=12).map(|n| {
        VerificationRecord::unverified(
            format!("BIZ{n:03}"),
            format!("Usaha {n:02}"),
            "Jl. Raya",
            "3201010001",
        )
    }));

    let scheme = Arc::new(SaltedSha256);
    for (name, email, role) in [
        ("Ani", "ani@desa.id", Role::Officer),
        ("Budi", "budi@desa.id", Role::Officer),
        ("Administrator", "admin@desa.id", Role::Admin),
    ] {
        store
            .insert_account(OfficerAccount {
                identity: OfficerIdentity::new(name, email),
                credential: scheme.hash("rahasia"),
                role,
            })
            .await
            .expect("account stored");
    }

    let clock = Arc::new(SystemClock);
    let stores = Stores::from_backend(store);
    let sessions = Arc::new(SessionRegistry::new(
        stores.sessions.clone(),
        chrono::Duration::hours(1),
        clock.clone(),
    ));
    let auth = Arc::new(AuthService::new(stores.officers.clone(), scheme, sessions));
    api_router(ApiState::new(&stores, auth, clock))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send_json(
        app,
        post("/api/login", None, json!({ "email": email, "password": "rahasia" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().expect("token issued").to_string()
}

fn verification(idsbr: &str, status: &str) -> Value {
    json!({
        "idsbr": idsbr,
        "latitude": -6.2,
        "longitude": 106.8,
        "status": status,
        "is_new": false,
    })
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = app().await;
    let (status, body) = send_json(
        &app,
        post(
            "/api/login",
            None,
            json!({ "email": "ani@desa.id", "password": "salah" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid email or password");
}

#[tokio::test]
async fn login_returns_role_and_identity() {
    let app = app().await;
    let (status, body) = send_json(
        &app,
        post(
            "/api/login",
            None,
            json!({ "email": "admin@desa.id", "password": "rahasia" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    assert_eq!(body["name"], "Administrator");
    assert!(body["token"].as_str().is_some_and(|token| !token.is_empty()));
}

#[tokio::test]
async fn region_tree_is_browsable() {
    let app = app().await;
    let token = login(&app, "ani@desa.id").await;

    let (status, roots) = send_json(&app, get("/api/regions", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roots.as_array().map(Vec::len), Some(2));

    let (_, children) = send_json(&app, get("/api/regions/3201010", &token)).await;
    assert_eq!(children[0]["code"], "3201010001");
    assert_eq!(children[0]["allow_new"], false);

    let (_, path) = send_json(&app, get("/api/regions/3201010001/ancestry", &token)).await;
    let names: Vec<_> = path
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|region| region["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Kabupaten Bogor", "Cibinong", "Pakansari"]);

    let (_, unknown) = send_json(&app, get("/api/regions/9999", &token)).await;
    assert_eq!(unknown, json!([]));
}

#[tokio::test]
async fn records_are_paginated() {
    let app = app().await;
    let token = login(&app, "ani@desa.id").await;

    let (status, page) = send_json(&app, get("/api/records/3201010001", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["current_page"], 1);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["data"].as_array().map(Vec::len), Some(10));

    let (_, second) = send_json(&app, get("/api/records/3201010001?page=2", &token)).await;
    assert_eq!(second["data"].as_array().map(Vec::len), Some(2));

    let (_, searched) =
        send_json(&app, get("/api/records/3201010001?search=usaha%2011", &token)).await;
    assert_eq!(searched["data"][0]["idsbr"], "BIZ011");
    assert_eq!(searched["total_pages"], 1);
}

#[tokio::test]
async fn unparsable_page_numbers_default_to_the_first_page() {
    let app = app().await;
    let ani = login(&app, "ani@desa.id").await;
    let admin = login(&app, "admin@desa.id").await;

    for uri in [
        "/api/records/3201010001?page=",
        "/api/records/3201010001?page=abc",
    ] {
        let (status, page) = send_json(&app, get(uri, &ani)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(page["current_page"], 1, "{uri}");
        assert_eq!(page["data"].as_array().map(Vec::len), Some(10), "{uri}");
    }

    let (status, board) = send_json(&app, get("/api/admin/leaderboard?page=abc", &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["current_page"], 1);
}

#[tokio::test]
async fn verification_lock_is_enforced_over_http() {
    let app = app().await;
    let ani = login(&app, "ani@desa.id").await;
    let budi = login(&app, "budi@desa.id").await;
    let admin = login(&app, "admin@desa.id").await;

    let (status, body) = send_json(
        &app,
        post("/api/verifications", Some(&ani), verification("BIZ001", "active")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["owner"]["email"], "ani@desa.id");

    let (status, body) = send_json(
        &app,
        post("/api/verifications", Some(&budi), verification("BIZ001", "closed")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "record owned by another officer");

    let (status, body) = send_json(
        &app,
        post("/api/verifications", Some(&admin), verification("BIZ001", "closed")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["owner"]["email"], "admin@desa.id");

    let (_, stats) = send_json(&app, get("/api/officers/me/stats", &ani)).await;
    assert_eq!(stats["total"], 0);
    let (_, stats) = send_json(&app, get("/api/officers/me/stats", &admin)).await;
    assert_eq!(stats["total"], 1);
}

#[tokio::test]
async fn bad_submissions_map_to_client_errors() {
    let app = app().await;
    let ani = login(&app, "ani@desa.id").await;

    let (status, _) = send_json(
        &app,
        post("/api/verifications", Some(&ani), verification("BIZ404", "active")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut invalid = verification("BIZ001", "active");
    invalid["latitude"] = json!(-95.0);
    let (status, _) = send_json(&app, post("/api/verifications", Some(&ani), invalid)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send_json(
        &app,
        post("/api/verifications", None, verification("BIZ001", "active")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_bodies_use_the_error_envelope() {
    let app = app().await;
    let ani = login(&app, "ani@desa.id").await;

    let mut missing_latitude = verification("BIZ001", "active");
    missing_latitude
        .as_object_mut()
        .expect("object")
        .remove("latitude");
    let (status, body) =
        send_json(&app, post("/api/verifications", Some(&ani), missing_latitude)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().is_some_and(|message| !message.is_empty()));

    let broken = Request::builder()
        .method(Method::POST)
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .expect("request");
    let (status, body) = send_json(&app, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn new_business_under_unknown_region_is_unprocessable() {
    let app = app().await;
    let ani = login(&app, "ani@desa.id").await;
    let admin = login(&app, "admin@desa.id").await;

    let (status, body) = send_json(
        &app,
        post(
            "/api/verifications",
            Some(&ani),
            json!({
                "latitude": -6.21,
                "longitude": 106.81,
                "status": "active",
                "is_new": true,
                "name": "Kios Liar",
                "region_code": "NOPE",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unknown region `NOPE`");

    let (_, stats) = send_json(&app, get("/api/admin/stats", &admin)).await;
    assert_eq!(stats["total"], 12);
}

#[tokio::test]
async fn new_business_submission_creates_a_verified_record() {
    let app = app().await;
    let ani = login(&app, "ani@desa.id").await;

    let (status, body) = send_json(
        &app,
        post(
            "/api/verifications",
            Some(&ani),
            json!({
                "latitude": -6.21,
                "longitude": 106.81,
                "status": "active",
                "is_new": true,
                "name": "Kios Pulsa",
                "address": "Jl. Baru",
                "region_code": "3201010001",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["record"]["idsbr"]
        .as_str()
        .is_some_and(|id| id.starts_with("NEW-")));
    assert_eq!(body["record"]["is_verified"], true);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = app().await;
    let ani = login(&app, "ani@desa.id").await;
    let admin = login(&app, "admin@desa.id").await;

    send(
        &app,
        post("/api/verifications", Some(&ani), verification("BIZ002", "active")),
    )
    .await;

    for uri in ["/api/admin/leaderboard", "/api/admin/stats", "/api/admin/export"] {
        let (status, _) = send(&app, get(uri, &ani)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }

    let (status, board) = send_json(&app, get("/api/admin/leaderboard", &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["data"][0]["email"], "ani@desa.id");
    assert_eq!(board["data"][0]["total"], 1);

    let (_, stats) = send_json(&app, get("/api/admin/stats", &admin)).await;
    assert_eq!(stats, json!({ "total": 12, "verified": 1, "pending": 11 }));
}

#[tokio::test]
async fn export_streams_csv_attachment() {
    let app = app().await;
    let ani = login(&app, "ani@desa.id").await;
    let admin = login(&app, "admin@desa.id").await;
    send(
        &app,
        post("/api/verifications", Some(&ani), verification("BIZ003", "active")),
    )
    .await;

    let response = app
        .clone()
        .oneshot(get("/api/admin/export", &admin))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/csv"));
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("Export_GC_Pro_"));

    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf-8");
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("IDSBR,Business Name"));
    assert!(lines[1].starts_with("BIZ003,Usaha 03,"));
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = app().await;
    let token = login(&app, "ani@desa.id").await;

    let (status, _) = send_json(&app, post("/api/logout", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/api/regions", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
