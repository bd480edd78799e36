//! Integration tests for the HTTP client
//!
//! These tests spin up a small axum server standing in for the Tracex API
//! and verify:
//! - envelopes and list pagination are decoded
//! - the bearer token is attached, except on public routes
//! - status codes map to the right error kinds and messages
//! - a 401 clears the token and announces the expired session
//! - bulk bodies and the CSV export follow the wire contract

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracex::client::export::ExportQuery;
use tracex::core::entity::{Credentials, ExpensePatch};
use tracex::core::error::ApiError;
use tracex::prelude::*;

// =============================================================================
// Mock server
// =============================================================================

#[derive(Clone, Default)]
struct Recorder {
    bodies: Arc<Mutex<Vec<Value>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl Recorder {
    fn saw_auth(&self, headers: &HeaderMap) {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.auth.lock().unwrap().push(value);
    }
}

fn expense_json(id: &str) -> Value {
    json!({
        "id": id,
        "date": "2024-04-01",
        "amount": 12.5,
        "category": "Food",
        "description": "Lunch",
        "createdAt": "2024-04-01T10:00:00Z",
        "updatedAt": "2024-04-01T10:00:00Z"
    })
}

async fn list_expenses(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.saw_auth(&headers);
    rec.queries.lock().unwrap().push(query);
    Json(json!({
        "success": true,
        "data": [expense_json("e1"), expense_json("e2")],
        "pagination": {
            "page": 2, "limit": 20, "total": 42,
            "totalPages": 3, "hasNext": true, "hasPrev": true
        }
    }))
}

async fn create_expense(Json(_body): Json<Value>) -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "error": "Validation failed",
            "fields": [{ "field": "amount", "message": "Amount must be positive" }]
        })),
    )
}

async fn get_expense(Path(id): Path<String>) -> impl IntoResponse {
    if id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Expense not found" })),
        );
    }
    (StatusCode::OK, Json(json!({ "success": true, "data": expense_json(&id) })))
}

async fn delete_expense(Path(_id): Path<String>) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn bulk_delete(State(rec): State<Recorder>, Json(body): Json<Value>) -> Json<Value> {
    let deleted = body["ids"].as_array().map_or(0, Vec::len);
    rec.bodies.lock().unwrap().push(body);
    Json(json!({ "success": true, "deleted": deleted }))
}

async fn bulk_update(State(rec): State<Recorder>, Json(body): Json<Value>) -> Json<Value> {
    let count = body["ids"].as_array().map_or(0, Vec::len);
    rec.bodies.lock().unwrap().push(body);
    Json(json!({ "data": [], "count": count }))
}

async fn summary() -> impl IntoResponse {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, "30")],
        Json(json!({ "success": false, "error": "Too many requests" })),
    )
}

async fn categories() -> impl IntoResponse {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": "Invalid token" })),
    )
}

async fn export(Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
    if query.get("category").map(String::as_str) == Some("broken") {
        return (StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new(), "export exploded".to_string());
    }
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_DISPOSITION,
        "attachment; filename=\"expenses-2024-04.csv\"".parse().unwrap(),
    );
    (StatusCode::OK, headers, "date,amount\n2024-04-01,12.5\n".to_string())
}

async fn sign_in(Json(body): Json<Value>) -> impl IntoResponse {
    if body["password"] != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Invalid credentials" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "user": { "id": "u1", "email": body["email"] },
            "token": "tok-123"
        })),
    )
}

async fn me(State(rec): State<Recorder>, headers: HeaderMap) -> Json<Value> {
    rec.saw_auth(&headers);
    Json(json!({ "success": true, "data": { "user": { "id": "u1", "email": "ana@example.com" } } }))
}

async fn public_budget(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Json<Value> {
    rec.saw_auth(&headers);
    Json(json!({
        "budget": { "id": "b1", "year": 2024, "month": 4, "limit": 500.0, "shareSlug": slug },
        "spending": 125.0,
        "limit": 500.0,
        "remaining": 375.0,
        "percentUsed": 25.0,
        "expenseCount": 7
    }))
}

async fn start_server(rec: Recorder) -> SocketAddr {
    let app = Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/api/v1/expenses", get(list_expenses).post(create_expense))
        .route("/api/v1/expenses/bulk", axum::routing::delete(bulk_delete).patch(bulk_update))
        .route("/api/v1/expenses/summary", get(summary))
        .route("/api/v1/expenses/export", get(export))
        .route("/api/v1/expenses/{id}", get(get_expense).delete(delete_expense))
        .route("/api/v1/categories", get(categories))
        .route("/api/v1/auth/signin", post(sign_in))
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/public/budgets/{slug}", get(public_budget))
        .with_state(rec);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

struct Harness {
    client: ApiClient,
    tokens: Arc<InMemoryTokenStore>,
    events: EventBus,
    rec: Recorder,
}

async fn harness(token: Option<&str>) -> Harness {
    let rec = Recorder::default();
    let addr = start_server(rec.clone()).await;
    let config = ClientConfig {
        api_url: format!("http://{}", addr),
        ..ClientConfig::default()
    };
    let tokens = Arc::new(match token {
        Some(token) => InMemoryTokenStore::with_token(token),
        None => InMemoryTokenStore::new(),
    });
    let events = EventBus::new(16);
    let client = ApiClient::new(&config, tokens.clone(), events.clone()).unwrap();
    Harness {
        client,
        tokens,
        events,
        rec,
    }
}

// =============================================================================
// Expenses
// =============================================================================

#[tokio::test]
async fn test_list_decodes_page_and_sends_query() {
    let h = harness(Some("tok")).await;
    let mut query = FilterQuery::default();
    FilterChange::search_input("Lunch").apply_to(&mut query);
    query.page = 2;

    let page = ExpenseService::list(&h.client, &query).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page.items[0].id, "e1");
    assert_eq!(page.pagination.total_pages, 3);
    assert!(page.pagination.has_next);

    let sent = h.rec.queries.lock().unwrap()[0].clone();
    assert_eq!(sent.get("page").map(String::as_str), Some("2"));
    assert_eq!(sent.get("limit").map(String::as_str), Some("20"));
    assert_eq!(sent.get("search").map(String::as_str), Some("Lunch"));
    assert!(!sent.contains_key("category"));
    assert_eq!(h.rec.auth.lock().unwrap()[0].as_deref(), Some("Bearer tok"));
}

#[tokio::test]
async fn test_validation_error_carries_fields() {
    let h = harness(Some("tok")).await;
    let draft = ExpenseForm {
        date: "2024-04-01".to_string(),
        amount: "5".to_string(),
        category: "Food".to_string(),
        description: String::new(),
    }
    .validate()
    .unwrap();

    let err = ExpenseService::create(&h.client, &draft).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    match err {
        TracexError::Api(ApiError::Validation { message, fields }) => {
            assert_eq!(message, "Validation failed");
            assert_eq!(fields[0].field, "amount");
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_not_found_is_distinct() {
    let h = harness(Some("tok")).await;
    let err = ExpenseService::get(&h.client, "missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.closes_editor());
    assert_eq!(err.to_string(), "Expense not found");

    let found = ExpenseService::get(&h.client, "e9").await.unwrap();
    assert_eq!(found.id, "e9");
}

#[tokio::test]
async fn test_delete_accepts_no_content() {
    let h = harness(Some("tok")).await;
    ExpenseService::delete(&h.client, "e1").await.unwrap();
}

#[tokio::test]
async fn test_rate_limit_message_uses_retry_after() {
    let h = harness(Some("tok")).await;
    let err = h
        .client
        .summary(&Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert_eq!(err.to_string(), "Too many requests. Retry in 30s.");
}

#[tokio::test]
async fn test_bulk_bodies_follow_wire_contract() {
    let h = harness(Some("tok")).await;
    let ids = vec!["a".to_string(), "b".to_string()];

    let deleted = ExpenseService::bulk_delete(&h.client, &ids).await.unwrap();
    assert_eq!(deleted, 2);

    let patch = ExpensePatch {
        category: Some("Travel".to_string()),
        ..Default::default()
    };
    let updated = ExpenseService::bulk_update(&h.client, &ids, &patch).await.unwrap();
    assert_eq!(updated.count, 2);

    let bodies = h.rec.bodies.lock().unwrap().clone();
    assert_eq!(bodies[0], json!({ "ids": ["a", "b"] }));
    assert_eq!(bodies[1], json!({ "ids": ["a", "b"], "category": "Travel" }));
}

// =============================================================================
// Session handling
// =============================================================================

#[tokio::test]
async fn test_unauthorized_clears_token_and_announces_expiry() {
    let h = harness(Some("stale")).await;
    let mut rx = h.events.subscribe();

    let err = CategoryService::list(&h.client).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.notice(), Notice::error("Session expired"));
    assert_eq!(h.tokens.get_token(), None);
    assert_eq!(rx.try_recv().unwrap().event, ClientEvent::SessionExpired);
}

#[tokio::test]
async fn test_sign_in_then_restore() {
    let h = harness(None).await;
    let session = Session::new(Arc::new(h.client.clone()), h.tokens.clone());

    let user = session
        .sign_in(&Credentials::new("ana@example.com", "secret"))
        .await
        .unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(h.tokens.get_token().as_deref(), Some("tok-123"));

    let restored = session.restore().await.unwrap();
    assert_eq!(restored.email, "ana@example.com");
    assert_eq!(h.rec.auth.lock().unwrap()[0].as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn test_public_budget_is_fetched_without_token() {
    let h = harness(Some("tok")).await;
    let compare = h.client.public_by_slug("team-trip").await.unwrap();
    assert_eq!(compare.budget.share_slug.as_deref(), Some("team-trip"));
    assert_eq!(compare.expense_count, 7);
    assert_eq!(h.rec.auth.lock().unwrap()[0], None);
}

// =============================================================================
// Export and health
// =============================================================================

#[tokio::test]
async fn test_export_uses_suggested_filename() {
    let h = harness(Some("tok")).await;
    let export = h.client.export_csv(&ExportQuery::default()).await.unwrap();
    assert_eq!(export.filename, "expenses-2024-04.csv");
    assert!(export.as_text().starts_with("date,amount"));
}

#[tokio::test]
async fn test_export_failure_reports_raw_text() {
    let h = harness(Some("tok")).await;
    let query = ExportQuery {
        category: Some("broken".to_string()),
        ..Default::default()
    };
    let err = h.client.export_csv(&query).await.unwrap_err();
    assert_eq!(err.to_string(), "export exploded");
}

#[tokio::test]
async fn test_health() {
    let h = harness(None).await;
    assert!(h.client.health().await.unwrap());
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig {
        api_url: format!("http://{}", addr),
        ..ClientConfig::default()
    };
    let client = ApiClient::new(&config, Arc::new(InMemoryTokenStore::new()), EventBus::new(4)).unwrap();
    let err = client.health().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.notice(), Notice::error("Check your connection"));
}
