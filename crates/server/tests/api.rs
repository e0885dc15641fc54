use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use server::ServerState;

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = engine::Engine::builder().database(db).build().await.unwrap();
    server::router(ServerState {
        engine: Arc::new(engine),
    })
}

fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn health_needs_no_user() {
    let app = app().await;
    let res = app.clone().oneshot(request("GET", "/", None, None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_empty_user_header_is_unauthorized() {
    let app = app().await;

    let (status, _) = send(&app, request("GET", "/account/aggregate", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request("GET", "/account/aggregate", Some("  "), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ledger_round_trip_over_http() {
    let app = app().await;

    let (status, body) = send(&app, request("POST", "/account", Some("alice"), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total_balance"], "0.00");

    let (status, _) = send(&app, request("POST", "/account", Some("alice"), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, created) = send(
        &app,
        request(
            "POST",
            "/transactions",
            Some("alice"),
            Some(json!({"kind": "expense", "amount": "50", "title": "Groceries"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["amount"], "50.00");
    assert_eq!(created["version"], 1);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        request(
            "PATCH",
            &format!("/transactions/{id}"),
            Some("alice"),
            Some(json!({"amount": "30", "expected_version": 1})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["version"], 2);

    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/transactions/{id}"),
            Some("alice"),
            Some(json!({"amount": "20", "expected_version": 1})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, aggregate) = send(&app, request("GET", "/account/aggregate", Some("alice"), None)).await;
    assert_eq!(aggregate["total_balance"], "-30.00");

    let (status, page) = send(
        &app,
        request("GET", "/transactions?kinds=expense&limit=5", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["limit"], 5);

    let (status, _) = send(
        &app,
        request("GET", &format!("/transactions/{id}"), Some("bob"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/transactions/{id}"), Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/transactions/{id}"), Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, report) = send(&app, request("GET", "/account/verify", Some("alice"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["consistent"], true);
    assert_eq!(report["stored"]["total_balance"], "0.00");
}

#[tokio::test]
async fn invalid_amount_is_unprocessable() {
    let app = app().await;
    send(&app, request("POST", "/account", Some("alice"), None)).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/transactions",
            Some("alice"),
            Some(json!({"kind": "income", "amount": "1.234", "title": "Salary"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().is_some());

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/transactions",
            Some("alice"),
            Some(json!({"kind": "income", "amount": "0", "title": "Salary"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, aggregate) = send(&app, request("GET", "/account/aggregate", Some("alice"), None)).await;
    assert_eq!(aggregate["total_balance"], "0.00");
}

#[tokio::test]
async fn create_without_account_is_not_found() {
    let app = app().await;
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/transactions",
            Some("carol"),
            Some(json!({"kind": "budget", "amount": "100", "title": "Monthly"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
