//! End-to-end tests driving the router against an in-memory database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use salon_api::auth::JwtManager;
use salon_api::{router, AppState};
use salon_core::PermissionKind;
use salon_db::{Database, DbConfig, NewBarber};

async fn setup() -> (Router, AppState) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let state = AppState::new(db, JwtManager::new("test-secret".to_string(), 600));
    (router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Signs up and logs in; returns (user id, token).
async fn sign_in(app: &Router, email: &str) -> (String, String) {
    let (status, user) = send(
        app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({
            "email": email,
            "password": "long enough",
            "first_name": "Test",
            "last_name": "User",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, token) = send(
        app,
        Method::POST,
        "/api/auth/token",
        None,
        Some(json!({ "email": email, "password": "long enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
        user["id"].as_str().unwrap().to_string(),
        token["access_token"].as_str().unwrap().to_string(),
    )
}

async fn create_salon(app: &Router, token: &str, name: &str, parent_id: Option<&str>) -> String {
    let (status, salon) = send(
        app,
        Method::POST,
        "/api/salons",
        Some(token),
        Some(json!({ "name": name, "parent_id": parent_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", salon);
    salon["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = setup().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_sign_up_token_and_me() {
    let (app, _) = setup().await;
    let (user_id, token) = sign_in(&app, "carl@salon.test").await;

    let (status, me) = send(&app, Method::GET, "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["id"], user_id.as_str());
    assert!(me["user"].get("password_hash").is_none());
    assert_eq!(me["permissions"], json!([]));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/token",
        None,
        Some(json!({ "email": "carl@salon.test", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_duplicate_sign_up_conflicts() {
    let (app, _) = setup().await;
    sign_in(&app, "dup@salon.test").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({
            "email": "dup@salon.test",
            "password": "long enough",
            "first_name": "Again",
            "last_name": "User",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let (app, _) = setup().await;
    let (status, body) = send(&app, Method::GET, "/api/salons", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, Method::GET, "/api/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_foreign_salon_is_forbidden_and_hidden() {
    let (app, _) = setup().await;
    let (_, owner) = sign_in(&app, "owner@salon.test").await;
    let (_, stranger) = sign_in(&app, "stranger@salon.test").await;
    let salon_id = create_salon(&app, &owner, "Downtown", None).await;

    let uri = format!("/api/salons/{}", salon_id);
    let (status, body) = send(&app, Method::GET, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, page) = send(&app, Method::GET, "/api/salons", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 0);

    let (_, page) = send(&app, Method::GET, "/api/salons", Some(&owner), None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["per_page"], 10);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_grant_on_parent_reaches_child() {
    let (app, _) = setup().await;
    let (_, owner) = sign_in(&app, "owner@salon.test").await;
    let (cashier_id, cashier) = sign_in(&app, "cashier@salon.test").await;
    let parent = create_salon(&app, &owner, "Downtown", None).await;
    let child = create_salon(&app, &owner, "Uptown", Some(&parent)).await;

    let registers = format!("/api/salons/{}/cash-registers", child);
    let (status, _) = send(&app, Method::GET, &registers, Some(&cashier), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/salons/{}/permissions", parent),
        Some(&owner),
        Some(json!({ "user_id": cashier_id, "permission": "manage_finance" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, page) = send(&app, Method::GET, &registers, Some(&cashier), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"], json!([]));

    let (_, access) = send(
        &app,
        Method::GET,
        &format!("/api/salons/{}/access", child),
        Some(&cashier),
        None,
    )
    .await;
    assert_eq!(access["is_owner"], false);
    assert_eq!(access["permissions"], json!([PermissionKind::ManageFinance]));

    // Finance does not open inventory.
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/salons/{}/items", child),
        Some(&cashier),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reference_writes_need_staff() {
    let (app, _) = setup().await;
    let (_, token) = sign_in(&app, "plain@salon.test").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/currencies",
        Some(&token),
        Some(json!({ "code": "EUR", "name": "Euro" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, page) = send(&app, Method::GET, "/api/currencies", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page["items"].is_array());
}

#[tokio::test]
async fn test_payment_moves_register_balance() {
    let (app, state) = setup().await;
    let (owner_id, owner) = sign_in(&app, "owner@salon.test").await;
    let salon_id = create_salon(&app, &owner, "Downtown", None).await;

    let (status, register) = send(
        &app,
        Method::POST,
        &format!("/api/salons/{}/cash-registers", salon_id),
        Some(&owner),
        Some(json!({ "name": "Front desk", "opening_balance_cents": 100000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let register_id = register["id"].as_str().unwrap().to_string();

    let kind = state.db.barber_types().create("Senior", "").await.unwrap();
    let barber = state
        .db
        .barbers()
        .create(
            &salon_id,
            NewBarber {
                user_id: owner_id,
                barber_type_id: kind.id,
                address: "1 Main St".to_string(),
                phone: "555-0100".to_string(),
            },
        )
        .await
        .unwrap();

    let (status, payment) = send(
        &app,
        Method::POST,
        &format!("/api/salons/{}/payments", salon_id),
        Some(&owner),
        Some(json!({
            "barber_id": barber.id,
            "amount_cents": 25000,
            "start_date": "2024-05-01",
            "end_date": "2024-05-31",
            "cash_register_id": register_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", payment);
    assert_eq!(payment["booked_cents"], -25000);

    let register_uri = format!("/api/salons/{}/cash-registers/{}", salon_id, register_id);
    let (_, register) = send(&app, Method::GET, &register_uri, Some(&owner), None).await;
    assert_eq!(register["balance_cents"], 75000);

    let payment_uri = format!(
        "/api/salons/{}/payments/{}",
        salon_id,
        payment["id"].as_str().unwrap()
    );
    let (status, _) = send(&app, Method::DELETE, &payment_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, register) = send(&app, Method::GET, &register_uri, Some(&owner), None).await;
    assert_eq!(register["balance_cents"], 100000);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/salons/{}/payments", salon_id),
        Some(&owner),
        Some(json!({
            "barber_id": barber.id,
            "amount_cents": 0,
            "start_date": "2024-05-01",
            "end_date": "2024-05-31",
            "cash_register_id": register_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_salon_is_not_found() {
    let (app, _) = setup().await;
    let (_, token) = sign_in(&app, "someone@salon.test").await;
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/salons/does-not-exist/shaves",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_barber_sign_up_waits_for_activation() {
    let (app, state) = setup().await;
    state
        .db
        .users()
        .create(salon_db::NewUser {
            email: "root@salon.test".to_string(),
            first_name: "Root".to_string(),
            last_name: "Admin".to_string(),
            password_hash: salon_api::auth::hash_password("long enough").unwrap(),
            is_active: true,
            is_staff: true,
            is_superuser: true,
        })
        .await
        .unwrap();
    let (status, token) = send(
        &app,
        Method::POST,
        "/api/auth/token",
        None,
        Some(json!({ "email": "root@salon.test", "password": "long enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let root = token["access_token"].as_str().unwrap().to_string();

    let (status, barber) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({
            "email": "dave@salon.test",
            "password": "long enough",
            "first_name": "Dave",
            "last_name": "Barber",
            "role": "barber",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(barber["is_active"], false);

    let login = json!({ "email": "dave@salon.test", "password": "long enough" });
    let (status, _) = send(&app, Method::POST, "/api/auth/token", None, Some(login.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let activate = format!("/api/users/{}/activate", barber["id"].as_str().unwrap());
    let (status, user) = send(&app, Method::POST, &activate, Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["is_active"], true);

    let (status, _) = send(&app, Method::POST, "/api/auth/token", None, Some(login)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_email_fails_like_a_wrong_password() {
    let (app, _) = setup().await;
    sign_in(&app, "carl@salon.test").await;

    let (status, wrong) = send(
        &app,
        Method::POST,
        "/api/auth/token",
        None,
        Some(json!({ "email": "carl@salon.test", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = send(
        &app,
        Method::POST,
        "/api/auth/token",
        None,
        Some(json!({ "email": "nobody@salon.test", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
}

#[tokio::test]
async fn test_list_bounds_are_validated() {
    let (app, _) = setup().await;
    let (_, token) = sign_in(&app, "carl@salon.test").await;

    let uri = format!("/api/salons?page={}", i64::MAX);
    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let uri = format!("/api/salons?name={}", "x".repeat(101));
    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
