use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Engine, NewUser};
use server::{ServerState, router};

const PRESIDENT: (&str, &str) = ("pres", "secret");

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    engine
        .bootstrap_president(NewUser::new(PRESIDENT.0, PRESIDENT.1, "Ada", "Lovelace"))
        .await
        .unwrap();

    router(ServerState {
        engine: Arc::new(engine),
    })
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    credentials: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some((username, password)) = credentials {
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        request = request.header(header::AUTHORIZATION, format!("Basic {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_member(app: &Router, username: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/users",
        Some(PRESIDENT),
        Some(json!({
            "username": username,
            "password": "secret",
            "first_name": "Bob",
            "last_name": "Martin",
            "family": "12",
            "year": 2024
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

/// Shop "bar" with its self-sale module enabled and one product.
async fn open_bar(app: &Router, price_minor: i64) -> (i64, i64) {
    let (status, shop) = send(
        app,
        Method::POST,
        "/shops",
        Some(PRESIDENT),
        Some(json!({ "name": "bar" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{shop}");
    let shop_id = shop["id"].as_i64().unwrap();

    let (status, _) = send(
        app,
        Method::PUT,
        &format!("/shops/{shop_id}/modules/self_sale"),
        Some(PRESIDENT),
        Some(json!({ "enabled": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, product) = send(
        app,
        Method::POST,
        &format!("/shops/{shop_id}/products"),
        Some(PRESIDENT),
        Some(json!({ "name": "Beer", "base_price_minor": price_minor, "stock": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    (shop_id, product["id"].as_i64().unwrap())
}

#[tokio::test]
async fn authenticated_routes_require_credentials() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/shops", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, Method::GET, "/shops", Some(("pres", "wrong")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/shops", Some(("nobody", "secret")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/shops", Some(PRESIDENT), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn user_listing_is_public_but_creation_is_not() {
    let app = app().await;
    create_member(&app, "bob").await;

    let (status, body) = send(&app, Method::GET, "/users", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let usernames: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|user| user["username"].as_str().unwrap())
        .collect();
    assert_eq!(usernames, ["bob", "pres"]);
    assert!(body[0].get("balance_minor").is_none());

    let (status, body) = send(&app, Method::GET, "/users?year=2024", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        Method::POST,
        "/users",
        None,
        Some(json!({
            "username": "eve",
            "password": "secret",
            "first_name": "Eve",
            "last_name": "Doe"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn self_registration_is_disabled_by_default() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "username": "eve",
            "password": "secret",
            "first_name": "Eve",
            "last_name": "Doe"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
}

#[tokio::test]
async fn self_sale_debits_the_buyer() {
    let app = app().await;
    let bob = create_member(&app, "bob").await;
    let (shop_id, product_id) = open_bar(&app, 250).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/movements",
        Some(PRESIDENT),
        Some(json!({ "recipient_id": bob, "amount_minor": 1000, "justification": "top up" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, sale) = send(
        &app,
        Method::POST,
        "/sales",
        Some(("bob", "secret")),
        Some(json!({
            "shop_id": shop_id,
            "module": "self_sale",
            "lines": [{ "product_id": product_id, "quantity": 2 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    assert_eq!(sale["amount_minor"], 500);
    assert_eq!(sale["sender_id"], bob);

    let (status, balance) = send(
        &app,
        Method::GET,
        &format!("/users/{bob}/balance"),
        Some(("bob", "secret")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["balance_minor"], 500);
    assert_eq!(balance["forecast_minor"], 500);

    let sale_id = sale["id"].as_i64().unwrap();
    let (status, fetched) = send(
        &app,
        Method::GET,
        &format!("/sales/{sale_id}"),
        Some(("bob", "secret")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["lines"][0]["unit_price_minor"], 250);

    let (status, ledger) = send(
        &app,
        Method::GET,
        &format!("/users/{bob}/ledger"),
        Some(("bob", "secret")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ledger[0]["reason"], "sale");
    assert_eq!(ledger[0]["balance_after_minor"], 500);
}

#[tokio::test]
async fn business_rules_and_permissions_map_to_statuses() {
    let app = app().await;
    let bob = create_member(&app, "bob").await;
    let (shop_id, product_id) = open_bar(&app, 250).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/sales",
        Some(("bob", "secret")),
        Some(json!({
            "shop_id": shop_id,
            "module": "self_sale",
            "lines": [{ "product_id": product_id, "quantity": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        body["error"].as_str().unwrap().starts_with("Insufficient credit"),
        "{body}"
    );

    let (status, _) = send(
        &app,
        Method::POST,
        "/shops",
        Some(("bob", "secret")),
        Some(json!({ "name": "kfet" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::GET,
        "/users/1",
        Some(("bob", "secret")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/users/{bob}"),
        Some(("bob", "secret")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/sales/999", Some(PRESIDENT), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/shops",
        Some(PRESIDENT),
        Some(json!({ "name": "bar" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/shops/{shop_id}/modules/nothing"),
        Some(PRESIDENT),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn deactivated_users_can_no_longer_log_in() {
    let app = app().await;
    let bob = create_member(&app, "bob").await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/users/{bob}"),
        Some(PRESIDENT),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/shops", Some(("bob", "secret")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/users/{bob}/activate"),
        Some(PRESIDENT),
        Some(json!({ "active": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], true);

    let (status, _) = send(&app, Method::GET, "/shops", Some(("bob", "secret")), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn shared_event_lifecycle() {
    let app = app().await;
    let bob = create_member(&app, "bob").await;

    let (status, event) = send(
        &app,
        Method::POST,
        "/events",
        Some(("bob", "secret")),
        Some(json!({ "description": "Barbecue", "date": "2026-06-21T18:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{event}");
    let event_id = event["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/events/{event_id}/participants"),
        Some(("bob", "secret")),
        Some(json!({ "user_id": bob, "weight": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/events/{event_id}/price"),
        Some(("bob", "secret")),
        Some(json!({ "price_minor": 300 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, balance) = send(
        &app,
        Method::GET,
        &format!("/users/{bob}/balance"),
        Some(("bob", "secret")),
        None,
    )
    .await;
    assert_eq!(balance["balance_minor"], 0);
    assert_eq!(balance["forecast_minor"], -300);

    let (status, finished) = send(
        &app,
        Method::POST,
        &format!("/events/{event_id}/finish"),
        Some(("bob", "secret")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["done"], true);

    let (_, balance) = send(
        &app,
        Method::GET,
        &format!("/users/{bob}/balance"),
        Some(("bob", "secret")),
        None,
    )
    .await;
    assert_eq!(balance["balance_minor"], -300);
    assert_eq!(balance["forecast_minor"], -300);
}

#[tokio::test]
async fn templates_are_checked_against_known_tags() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/notifications/templates/validate",
        Some(PRESIDENT),
        Some(json!({ "text": "Hello {{ recipient.surname }}" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (_, body) = send(
        &app,
        Method::POST,
        "/notifications/templates/validate",
        Some(PRESIDENT),
        Some(json!({ "text": "Hello {{ sender }}" })),
    )
    .await;
    assert_eq!(body["valid"], false);
    assert!(body["error"].is_string());
}
