//! Mock API backend for integration tests
//!
//! Answers with plain JSON on success and RFC 9457 problem documents on
//! failure, and records every request it receives.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Every route lives under this prefix
pub const API_PREFIX: &str = "/api";

/// Token the backend accepts as a bearer credential
pub const VALID_TOKEN: &str = "mock-access-token";

/// Value of the `XSRF-TOKEN` cookie handed out by `/csrf`
pub const CSRF_TOKEN: &str = "csrf-7f3a";

pub const CSRF_PROBLEM: &str = "https://tether.dev/problems/csrf-mismatch";
pub const NOT_FOUND_PROBLEM: &str = "https://tether.dev/problems/not-found";

/// One request as seen by the backend
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub csrf: Option<String>,
    pub cookie: Option<String>,
    pub accept: Option<String>,
}

/// Mock API server bound to a random local port
pub struct MockApi {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockApiState>,
}

struct MockApiState {
    requests: Mutex<Vec<RecordedRequest>>,
    /// Failures `/flaky` still returns before it recovers
    flaky_failures: AtomicU32,
}

impl MockApi {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_flaky(0).await
    }

    /// Start a server whose `/flaky` route fails `n` times with 503
    pub async fn start_flaky(n: u32) -> anyhow::Result<Self> {
        let state = Arc::new(MockApiState {
            requests: Mutex::new(Vec::new()),
            flaky_failures: AtomicU32::new(n),
        });

        let api = Router::new()
            .route("/csrf", routing::get(handle_csrf))
            .route("/projects", routing::get(handle_list_projects).post(handle_create_project))
            .route("/projects/{id}", routing::delete(handle_delete_project))
            .route("/missing", routing::get(handle_missing))
            .route("/unavailable", routing::get(handle_unavailable))
            .route("/flaky", routing::get(handle_flaky))
            .route("/expired", routing::get(handle_expired))
            .route("/validation", routing::post(handle_validation))
            .route("/plain-failure", routing::get(handle_plain_failure))
            .with_state(Arc::clone(&state));

        let app = Router::new()
            .nest(API_PREFIX, api)
            .layer(middleware::from_fn_with_state(Arc::clone(&state), record));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL including the API prefix
    pub fn base_url(&self) -> String {
        format!("http://{}{API_PREFIX}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Requests received for `path`, relative to the API prefix
    pub fn count(&self, path: &str) -> usize {
        let full = format!("{API_PREFIX}{path}");
        self.requests().iter().filter(|r| r.path == full).count()
    }

    /// Most recent request for `path`, relative to the API prefix
    pub fn last(&self, path: &str) -> Option<RecordedRequest> {
        let full = format!("{API_PREFIX}{path}");
        self.requests().into_iter().rev().find(|r| r.path == full)
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn record(State(state): State<Arc<MockApiState>>, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);

    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_owned(),
        authorization: value(header::AUTHORIZATION.as_str()),
        csrf: value("x-xsrf-token"),
        cookie: value(header::COOKIE.as_str()),
        accept: value(header::ACCEPT.as_str()),
    };
    state.requests.lock().unwrap().push(recorded);

    next.run(request).await
}

fn problem(status: StatusCode, body: &Value) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/problem+json")],
        body.to_string(),
    )
        .into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// -- Handlers --

async fn handle_csrf() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, format!("XSRF-TOKEN={CSRF_TOKEN}; Path=/"))],
    )
}

async fn handle_list_projects(headers: HeaderMap) -> Response {
    let expected = format!("Bearer {VALID_TOKEN}");
    if header_str(&headers, "authorization") != Some(expected.as_str()) {
        return problem(
            StatusCode::UNAUTHORIZED,
            &json!({"title": "Unauthorized", "status": 401, "detail": "bearer token missing or invalid"}),
        );
    }

    Json(json!([{"id": 1, "name": "tether"}])).into_response()
}

async fn handle_create_project(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let header_token = header_str(&headers, "x-xsrf-token");
    let cookie_token = header_str(&headers, "cookie")
        .into_iter()
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "XSRF-TOKEN")
        .map(|(_, value)| value);

    if header_token.is_none() || header_token != cookie_token {
        return problem(
            StatusCode::FORBIDDEN,
            &json!({
                "type": CSRF_PROBLEM,
                "title": "CSRF token mismatch",
                "status": 403,
                "detail": "the X-XSRF-TOKEN header must echo the XSRF-TOKEN cookie"
            }),
        );
    }

    (StatusCode::CREATED, Json(json!({"id": 2, "name": body["name"]}))).into_response()
}

async fn handle_delete_project(Path(_id): Path<u32>) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn handle_missing() -> Response {
    problem(
        StatusCode::NOT_FOUND,
        &json!({
            "type": NOT_FOUND_PROBLEM,
            "title": "Not Found",
            "status": 404,
            "detail": "No project with id 99",
            "instance": "/api/missing"
        }),
    )
}

async fn handle_unavailable() -> Response {
    problem(
        StatusCode::SERVICE_UNAVAILABLE,
        &json!({"title": "Service Unavailable", "status": 503, "detail": "database is in maintenance"}),
    )
}

async fn handle_flaky(State(state): State<Arc<MockApiState>>) -> Response {
    let failing = state
        .flaky_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();

    if failing {
        return problem(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({"title": "Service Unavailable", "status": 503}),
        );
    }

    Json(json!({"status": "recovered"})).into_response()
}

/// Slow enough that concurrent callers overlap
async fn handle_expired() -> Response {
    tokio::time::sleep(Duration::from_millis(25)).await;

    problem(
        StatusCode::UNAUTHORIZED,
        &json!({"title": "Unauthorized", "status": 401, "detail": "session expired"}),
    )
}

async fn handle_validation() -> Response {
    problem(
        StatusCode::UNPROCESSABLE_ENTITY,
        &json!({
            "type": "https://tether.dev/problems/validation",
            "title": "Validation failed",
            "status": 422,
            "errors": [{"field": "name", "message": "must not be empty"}]
        }),
    )
}

async fn handle_plain_failure() -> Response {
    (StatusCode::BAD_GATEWAY, "upstream connect error").into_response()
}
