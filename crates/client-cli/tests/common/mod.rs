//! In-process mock of the subscription API.
//!
//! Serves the same paths and envelopes as the real service from seeded JSON
//! and counts requests per endpoint so tests can assert on network traffic.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use packdesk::config::ApiConfig;
use packdesk::ApiClient;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const CUSTOMER_EMAIL: &str = "jane@example.com";
pub const PASSWORD: &str = "secret1";
pub const ADMIN_TOKEN: &str = "admin-token";
pub const CUSTOMER_TOKEN: &str = "customer-token";
pub const TAKEN_EMAIL: &str = "taken@example.com";
pub const UNKNOWN_PACK: &str = "999";

#[derive(Debug, Default)]
pub struct Data {
    pub packs: Vec<Value>,
    pub customers: Vec<Value>,
    pub subscriptions: Vec<Value>,
    pub history: Vec<Value>,
    pub current: Option<Value>,
    next_id: u64,
}

impl Data {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MockState {
    pub data: Arc<Mutex<Data>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    /// Make the current-subscription endpoint answer with a non-JSON 500
    pub fail_current: Arc<AtomicBool>,
}

impl MockState {
    pub fn seeded() -> Self {
        let data = Data {
            packs: vec![
                json!({"id": 1, "name": "Basic", "sku": "BAS-1", "price": 9.99, "description": "Starter", "validity_months": 1}),
                json!({"id": 2, "name": "Pro", "sku": "PRO-12", "price": 99.0, "description": null, "validity_months": 12}),
                json!({"id": 3, "name": "Team", "sku": "TEAM-12", "price": 249.0, "validity_months": 12}),
            ],
            customers: vec![
                json!({"id": 1, "name": "Jane Doe", "email": CUSTOMER_EMAIL, "phone": "555-0100", "total_subscriptions": 2, "has_active_subscription": true, "created_at": "2024-01-05T10:00:00Z"}),
                json!({"id": 2, "name": "Sam Roe", "email": "sam@example.com", "phone": null, "total_subscriptions": 1, "has_active_subscription": false, "created_at": "2024-02-11T08:30:00Z"}),
                json!({"id": 3, "name": "Kim Poe", "email": "kim@example.com", "total_subscriptions": 0, "has_active_subscription": false}),
            ],
            subscriptions: vec![
                json!({"id": 1, "customer_id": 1, "pack_id": 2, "status": "active", "pack_name": "Pro", "pack_price": 99.0, "customer_name": "Jane Doe"}),
                json!({"id": 2, "customer_id": 2, "pack_id": 1, "status": "requested", "pack_name": "Basic", "customer_name": "Sam Roe"}),
                json!({"id": 3, "customer_id": 1, "pack_id": 1, "status": "active", "pack_name": "Basic", "customer_name": "Jane Doe"}),
                json!({"id": 4, "customer_id": 2, "pack_id": 3, "status": "expired", "pack_name": "Team", "customer_name": "Sam Roe"}),
            ],
            history: vec![
                json!({"id": 1, "pack_id": 2, "status": "active", "pack_name": "Pro", "requested_at": "2024-01-05T10:00:00Z"}),
                json!({"id": 3, "pack_id": 1, "status": "active", "pack_name": "Basic"}),
            ],
            current: Some(json!({"id": 1, "pack_id": 2, "status": "active", "pack_name": "Pro", "expires_at": "2025-01-05T10:00:00Z"})),
            next_id: 100,
        };

        Self {
            data: Arc::new(Mutex::new(data)),
            ..Self::default()
        }
    }

    fn hit(&self, name: &str) {
        *self.hits.lock().unwrap().entry(name.to_string()).or_default() += 1;
    }

    pub fn hits(&self, name: &str) -> usize {
        self.hits.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }

    pub fn set_fail_current(&self, fail: bool) {
        self.fail_current.store(fail, Ordering::SeqCst);
    }

    pub fn pack_ids(&self) -> Vec<String> {
        let data = self.data.lock().unwrap();
        data.packs.iter().map(|p| p["id"].to_string()).collect()
    }
}

fn ok(data: Value) -> Response {
    Json(json!({"success": true, "data": data})).into_response()
}

fn ack(message: &str) -> Response {
    Json(json!({"success": true, "message": message})).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"success": false, "message": message}))).into_response()
}

/// `None` when the bearer token is one of `tokens`
fn reject(headers: &HeaderMap, tokens: &[&str]) -> Option<Response> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if tokens.contains(&token) => None,
        _ => Some(failure(StatusCode::UNAUTHORIZED, "Unauthorized")),
    }
}

fn same_id(value: &Value, id: &str) -> bool {
    match &value["id"] {
        Value::String(s) => s == id,
        other => other.to_string() == id,
    }
}

fn page<T: Clone>(items: &[T], page: Option<usize>, limit: Option<usize>) -> Vec<T> {
    let limit = limit.unwrap_or(10).max(1);
    let start = (page.unwrap_or(1).max(1) - 1) * limit;
    items.iter().skip(start).take(limit).cloned().collect()
}

#[derive(Debug, Deserialize)]
struct PageParams {
    page: Option<usize>,
    limit: Option<usize>,
    status: Option<String>,
}

async fn admin_login(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.hit("admin_login");
    if body["email"] == ADMIN_EMAIL && body["password"] == PASSWORD {
        ok(json!({"token": ADMIN_TOKEN}))
    } else {
        failure(StatusCode::UNAUTHORIZED, "Invalid email or password")
    }
}

async fn customer_login(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.hit("customer_login");
    if body["email"] == CUSTOMER_EMAIL && body["password"] == PASSWORD {
        ok(json!({"token": CUSTOMER_TOKEN}))
    } else {
        failure(StatusCode::UNAUTHORIZED, "Invalid email or password")
    }
}

async fn register(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.hit("register");
    if body["email"] == TAKEN_EMAIL {
        return failure(StatusCode::CONFLICT, "Email already registered");
    }
    ack("Registration successful")
}

async fn profile(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.hit("profile");
    if let Some(rejection) = reject(&headers, &[CUSTOMER_TOKEN]) {
        return rejection;
    }
    ok(json!({"name": "Jane Doe", "email": CUSTOMER_EMAIL, "phone": "555-0100"}))
}

async fn current_subscription(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.hit("current");
    if let Some(rejection) = reject(&headers, &[CUSTOMER_TOKEN]) {
        return rejection;
    }
    if state.fail_current.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    let current = state.data.lock().unwrap().current.clone();
    ok(current.unwrap_or(Value::Null))
}

async fn history(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.hit("history");
    if let Some(rejection) = reject(&headers, &[CUSTOMER_TOKEN]) {
        return rejection;
    }
    let history = state.data.lock().unwrap().history.clone();
    ok(Value::Array(history))
}

async fn request_subscription(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.hit("request");
    if let Some(rejection) = reject(&headers, &[CUSTOMER_TOKEN]) {
        return rejection;
    }
    let pack_id = body["pack_id"].as_str().unwrap_or_default().to_string();
    if pack_id == UNKNOWN_PACK {
        return failure(StatusCode::NOT_FOUND, "Pack not found");
    }
    let mut data = state.data.lock().unwrap();
    let id = data.next_id();
    data.history
        .push(json!({"id": id, "pack_id": pack_id, "status": "requested"}));
    ack("Subscription requested")
}

async fn list_packs(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.hit("packs");
    if let Some(rejection) = reject(&headers, &[ADMIN_TOKEN, CUSTOMER_TOKEN]) {
        return rejection;
    }
    let packs = state.data.lock().unwrap().packs.clone();
    ok(Value::Array(packs))
}

async fn create_pack(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    state.hit("create_pack");
    if let Some(rejection) = reject(&headers, &[ADMIN_TOKEN]) {
        return rejection;
    }
    let mut data = state.data.lock().unwrap();
    if data.packs.iter().any(|p| p["sku"] == body["sku"]) {
        return failure(StatusCode::CONFLICT, "SKU already exists");
    }
    body["id"] = json!(data.next_id());
    data.packs.push(body);
    ack("Pack created")
}

async fn update_pack(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(mut body): Json<Value>,
) -> Response {
    state.hit("update_pack");
    if let Some(rejection) = reject(&headers, &[ADMIN_TOKEN]) {
        return rejection;
    }
    let mut data = state.data.lock().unwrap();
    match data.packs.iter_mut().find(|p| same_id(p, &id)) {
        Some(pack) => {
            body["id"] = pack["id"].clone();
            *pack = body;
            ack("Pack updated")
        }
        None => failure(StatusCode::NOT_FOUND, "Pack not found"),
    }
}

async fn delete_pack(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    state.hit("delete_pack");
    if let Some(rejection) = reject(&headers, &[ADMIN_TOKEN]) {
        return rejection;
    }
    let mut data = state.data.lock().unwrap();
    let before = data.packs.len();
    data.packs.retain(|p| !same_id(p, &id));
    if data.packs.len() == before {
        return failure(StatusCode::NOT_FOUND, "Pack not found");
    }
    ack("Pack deleted")
}

async fn metrics(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.hit("metrics");
    if let Some(rejection) = reject(&headers, &[ADMIN_TOKEN]) {
        return rejection;
    }
    let data = state.data.lock().unwrap();
    let count = |status: &str| data.subscriptions.iter().filter(|s| s["status"] == status).count();
    let revenue: f64 = data
        .subscriptions
        .iter()
        .filter(|s| s["status"] == "active")
        .filter_map(|s| s["pack_price"].as_f64())
        .sum();
    ok(json!({
        "totalCustomers": data.customers.len(),
        "totalSubscriptions": data.subscriptions.len(),
        "activeSubscriptions": count("active"),
        "pendingSubscriptions": count("requested"),
        "expiredSubscriptions": count("expired"),
        "totalRevenue": revenue,
    }))
}

async fn customers(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Response {
    state.hit("customers");
    if let Some(rejection) = reject(&headers, &[ADMIN_TOKEN]) {
        return rejection;
    }
    let data = state.data.lock().unwrap();
    ok(Value::Array(page(&data.customers, params.page, params.limit)))
}

async fn update_customer(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    state.hit("update_customer");
    if let Some(rejection) = reject(&headers, &[ADMIN_TOKEN]) {
        return rejection;
    }
    let mut data = state.data.lock().unwrap();
    match data.customers.iter_mut().find(|c| same_id(c, &id)) {
        Some(customer) => {
            for key in ["name", "email", "phone"] {
                customer[key] = body[key].clone();
            }
            ack("Customer updated")
        }
        None => failure(StatusCode::NOT_FOUND, "Customer not found"),
    }
}

async fn delete_customer(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    state.hit("delete_customer");
    if let Some(rejection) = reject(&headers, &[ADMIN_TOKEN]) {
        return rejection;
    }
    let mut data = state.data.lock().unwrap();
    let before = data.customers.len();
    data.customers.retain(|c| !same_id(c, &id));
    if data.customers.len() == before {
        return failure(StatusCode::NOT_FOUND, "Customer not found");
    }
    ack("Customer deleted")
}

async fn subscriptions(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Response {
    state.hit("subscriptions");
    if let Some(rejection) = reject(&headers, &[ADMIN_TOKEN]) {
        return rejection;
    }
    let data = state.data.lock().unwrap();
    let matching: Vec<Value> = data
        .subscriptions
        .iter()
        .filter(|s| match params.status.as_deref() {
            None | Some("") => true,
            Some(status) => s["status"] == status,
        })
        .cloned()
        .collect();
    ok(Value::Array(page(&matching, params.page, params.limit)))
}

async fn update_status(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    state.hit("update_status");
    if let Some(rejection) = reject(&headers, &[ADMIN_TOKEN]) {
        return rejection;
    }
    let mut data = state.data.lock().unwrap();
    match data.subscriptions.iter_mut().find(|s| same_id(s, &id)) {
        Some(subscription) => {
            subscription["status"] = body["status"].clone();
            ack("Status updated")
        }
        None => failure(StatusCode::NOT_FOUND, "Subscription not found"),
    }
}

async fn assign(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.hit("assign");
    if let Some(rejection) = reject(&headers, &[ADMIN_TOKEN]) {
        return rejection;
    }
    let customer_id = body["customer_id"].clone();
    let pack_id = body["pack_id"].clone();
    let mut data = state.data.lock().unwrap();
    let id = data.next_id();
    data.subscriptions.push(json!({
        "id": id,
        "customer_id": customer_id,
        "pack_id": pack_id,
        "status": "active",
    }));
    ack("Subscription assigned")
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/api/admin/login", post(admin_login))
        .route("/api/customer/login", post(customer_login))
        .route("/api/customer/register", post(register))
        .route("/api/customer/profile", get(profile))
        .route("/api/v1/pack", post(create_pack))
        .route("/api/v1/packs", get(list_packs))
        .route("/api/v1/pack/:id", put(update_pack).delete(delete_pack))
        .route("/api/v1/customer/subscription", get(current_subscription))
        .route("/api/v1/customer/subscription/history", get(history))
        .route("/api/v1/customer/subscription/request", post(request_subscription))
        .route("/api/v1/admin/dashboard/metrics", get(metrics))
        .route("/api/v1/customers", get(customers))
        .route("/api/v1/customer/:id", put(update_customer).delete(delete_customer))
        .route("/api/v1/subscriptions", get(subscriptions))
        .route("/api/v1/subscription/:id/status", put(update_status))
        .route("/api/v1/subscription/assign", post(assign))
        .with_state(state)
}

/// A running mock server on an ephemeral port
pub struct MockApi {
    pub state: MockState,
    pub base_url: String,
}

impl MockApi {
    pub async fn start() -> Self {
        Self::start_with(MockState::seeded()).await
    }

    pub async fn start_with(state: MockState) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base_url: format!("http://{addr}/api"),
        }
    }

    pub fn config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            resource_prefix: "/v1".to_string(),
            timeout_secs: 5,
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config()).unwrap()
    }

    pub fn admin(&self) -> ApiClient {
        self.client().with_token(ADMIN_TOKEN)
    }

    pub fn customer(&self) -> ApiClient {
        self.client().with_token(CUSTOMER_TOKEN)
    }
}
