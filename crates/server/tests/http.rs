use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;

use migration::MigratorTrait;
use server::{ServerState, app};

async fn test_app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();

    let engine = engine::Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    app(ServerState {
        engine: Arc::new(engine),
        db,
    })
}

fn basic_auth(username: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic_auth("alice", "password"));
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn requests_without_credentials_are_unauthorized() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/accounts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/accounts")
                .header(header::AUTHORIZATION, basic_auth("alice", "nope"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn account_lifecycle_over_http() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/accounts",
            Some(json!({
                "name": "Checking",
                "kind": "bank",
                "opening_balance": "100.00"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/accounts/{id}"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let account = json_body(response).await;
    assert_eq!(account["balance_cents"], 10_000);
    assert_eq!(account["balance"], "100.00");
}

#[tokio::test]
async fn expense_moves_the_balance_over_http() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/accounts",
            Some(json!({
                "name": "Checking",
                "kind": "bank",
                "opening_balance": "100.00"
            })),
        ))
        .await
        .unwrap();
    let account_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/transactions",
            Some(json!({
                "amount": "30.00",
                "kind": "expense",
                "account_id": account_id,
                "description": "Groceries"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let tx = json_body(response).await;
    assert_eq!(tx["amount_cents"], 3_000);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/accounts/{account_id}"), None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["balance_cents"], 7_000);
}

#[tokio::test]
async fn invalid_amounts_are_unprocessable() {
    let app = test_app().await;

    let response = app
        .oneshot(request(
            "POST",
            "/transactions",
            Some(json!({
                "amount": "12.345",
                "kind": "expense"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("decimals"));
}

#[tokio::test]
async fn unknown_debt_is_not_found() {
    let app = test_app().await;

    let response = app
        .oneshot(request(
            "GET",
            "/debts/00000000-0000-0000-0000-000000000000",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_category_conflicts() {
    let app = test_app().await;
    let payload = json!({ "name": "Food", "kind": "expense" });

    let response = app
        .clone()
        .oneshot(request("POST", "/categories", Some(payload.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(request("POST", "/categories", Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn settlement_distribution_over_http() {
    let app = test_app().await;

    for (amount, description) in [("60.00", "Dinner"), ("40.00", "Taxi")] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/transactions",
                Some(json!({
                    "amount": amount,
                    "kind": "expense",
                    "description": description,
                    "reimbursable": true,
                    "settlement_group": "trip",
                    "counterparty": "Bob"
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/settlements",
            Some(json!({
                "amount": "50.00",
                "settlement_group": "trip"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let allocations = body["allocations"].as_array().unwrap();
    assert_eq!(allocations.len(), 2);
    let total: i64 = allocations
        .iter()
        .map(|a| a["amount_cents"].as_i64().unwrap())
        .sum();
    assert_eq!(total, 5_000);

    // Settling more than remains pending is rejected.
    let response = app
        .oneshot(request(
            "POST",
            "/settlements",
            Some(json!({
                "amount": "60.00",
                "settlement_group": "trip"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
