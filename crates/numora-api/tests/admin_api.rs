use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use numora_api::routes::router;
use numora_api::{AppState, AppStateInner};
use numora_db::Database;
use numora_types::amount::AmountInput;
use numora_types::api::Claims;
use numora_types::models::{Role, TransactionKind};

const SECRET: &str = "test-secret";

fn token(sub: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        username: format!("{}-name", sub),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn setup() -> (Router, AppState) {
    let db = Database::open_in_memory().unwrap();
    db.grant_role("operator", Role::Admin).unwrap();
    db.create_profile("alice", "Alice", "ALICE1").unwrap();
    db.post_entry("alice", TransactionKind::Credit, Decimal::from(100), None)
        .unwrap();

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: SECRET.to_string(),
    });
    (router(state.clone()), state)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(sub) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(sub)));
    }
    let req = match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn dec(v: &Value) -> Decimal {
    Decimal::from_str(v.as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_admin_gate() {
    let (app, state) = setup();

    let (status, body) = call(&app, Method::GET, "/admin/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, body) = call(&app, Method::GET, "/admin/users", Some("alice"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert!(body["message"].is_string());

    let (status, body) = call(&app, Method::GET, "/admin/users", Some("operator"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Health stays public
    let (status, _) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    assert!(state.db.is_admin("operator").unwrap());
}

#[tokio::test]
async fn test_credit_user_flow() {
    let (app, state) = setup();

    let (status, body) = call(
        &app,
        Method::POST,
        "/admin/users/alice/credit",
        Some("operator"),
        Some(json!({ "amount": 50, "description": "bonus" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "credit");
    assert_eq!(dec(&body["amount"]), Decimal::from(50));
    assert_eq!(state.db.balance("alice").unwrap(), Decimal::from(150));

    let (status, body) = call(
        &app,
        Method::POST,
        "/admin/users/alice/credit",
        Some("operator"),
        Some(json!({ "amount": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert_eq!(state.db.balance("alice").unwrap(), Decimal::from(150));

    let (status, body) = call(
        &app,
        Method::POST,
        "/admin/users/nobody/credit",
        Some("operator"),
        Some(json!({ "amount": "5" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_seller_code_approval_flow() {
    let (app, state) = setup();
    let s = state.db.create_seller_submission("alice", "0700123456").unwrap();

    let base = format!("/admin/seller-numbers/{}", s.id);
    let (status, body) = call(&app, Method::POST, &format!("{}/approve", base), Some("operator"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}/grant-code-entry", base),
        Some("operator"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code_status"], "can_enter");

    state.db.submit_code(&s.id, "1234").unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}/approve-code", base),
        Some("operator"),
        Some(json!({ "credit_amount": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("{}/approve-code", base),
        Some("operator"),
        Some(json!({ "credit_amount": 200 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code_status"], "approved");
    assert_eq!(dec(&body["balance_added"]), Decimal::from(200));
    assert_eq!(state.db.balance("alice").unwrap(), Decimal::from(300));

    let (status, body) = call(&app, Method::POST, &format!("{}/reject", base), Some("operator"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state_transition");

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("{}/phone", base),
        Some("operator"),
        Some(json!({ "phone_number": "0799000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phone_number"], "0799000000");

    let (status, _) = call(&app, Method::DELETE, &base, Some("operator"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = call(&app, Method::GET, "/admin/seller-numbers", Some("operator"), None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_recharge_flow() {
    let (app, state) = setup();
    let r = state
        .db
        .create_recharge_request("alice", "0700123456", &AmountInput::new("30"))
        .unwrap();

    let uri = format!("/admin/recharge-requests/{}/complete", r.id);
    let (status, body) = call(&app, Method::POST, &uri, Some("operator"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(state.db.balance("alice").unwrap(), Decimal::from(70));

    let (status, _) = call(&app, Method::POST, &uri, Some("operator"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(state.db.balance("alice").unwrap(), Decimal::from(70));

    let (_, detail) = call(&app, Method::GET, "/admin/users/alice", Some("operator"), None).await;
    assert_eq!(detail["transactions"][0]["type"], "recharge_debit");
    assert_eq!(dec(&detail["profile"]["balance"]), Decimal::from(70));
}

#[tokio::test]
async fn test_offers_and_user_removal() {
    let (app, state) = setup();

    for (title, priority) in [("a", 1), ("b", 9), ("c", 1)] {
        let (status, _) = call(
            &app,
            Method::POST,
            "/admin/offers",
            Some("operator"),
            Some(json!({ "title": title, "priority": priority })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, offers) = call(&app, Method::GET, "/admin/offers", Some("operator"), None).await;
    let titles: Vec<_> = offers
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["b", "c", "a"]);

    let id = offers[0]["id"].as_str().unwrap().to_string();
    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/admin/offers/{}/active", id),
        Some("operator"),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, _) = call(&app, Method::DELETE, "/admin/users/alice", Some("operator"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, stats) = call(&app, Method::GET, "/admin/stats", Some("operator"), None).await;
    assert_eq!(stats["users"], 0);
    assert!(state.db.recent_transactions("alice", 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_bodies_are_validation_errors() {
    let (app, state) = setup();
    let submission = state
        .db
        .create_seller_submission("alice", "0700123456")
        .unwrap();

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/admin/seller-numbers/{}/phone", submission.id),
        Some("operator"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert!(body["message"].as_str().unwrap().contains("phone_number"));

    let (status, body) = call(
        &app,
        Method::POST,
        "/admin/offers",
        Some("operator"),
        Some(json!({ "priority": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = call(
        &app,
        Method::POST,
        "/admin/users/alice/credit",
        Some("operator"),
        Some(json!("not json")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    // Missing content type
    let req = Request::builder()
        .method(Method::POST)
        .uri("/admin/users/alice/credit")
        .header(header::AUTHORIZATION, format!("Bearer {}", token("operator")))
        .body(Body::from("{\"amount\": 5}"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(state.db.balance("alice").unwrap(), Decimal::from(100));
    assert_eq!(
        state.db.get_seller_submission(&submission.id).unwrap().phone_number,
        "0700123456"
    );
}
