//! api-server — HTTP API for the greeting services workspace.
//!
//! Serves every variant from one process:
//! - `/api/greetings`: greetings read from the relational store.
//! - `/api/v1/greetings`: greetings generated in memory with a shared counter.
//! - `/products`: product list/create/lookup over the store.
//! - `/api/info`: static metadata plus the current time.
//!
//! Storage is SQLite (file) by default or in-memory when
//! `STORAGE_PROVIDER=memory`.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # in-memory store, JSON logs
//! STORAGE_PROVIDER=memory LOG_FORMAT=json cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;
mod repo;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use domain::seed::{seed_greetings, seed_products};
use domain::service::GreetingGenerator;
use domain::{Clock, GeneratedGreeting, Greeting, Product, ProductInput, SystemClock};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::repo::AnyRepo;

/// Constant `message` field of `/api/info`.
const INFO_MESSAGE: &str = "Greeting services demo";

#[derive(Clone)]
struct AppState {
    repo: AnyRepo,
    generator: Arc<GreetingGenerator<SystemClock>>,
    clock: SystemClock,
    app_name: Arc<str>,
}

impl AppState {
    fn new(repo: AnyRepo, app_name: &str) -> Self {
        Self {
            repo,
            generator: Arc::new(GreetingGenerator::new(SystemClock)),
            clock: SystemClock,
            app_name: Arc::from(app_name),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_ephemeral();

    let repo = build_repo(&cfg);
    if cfg.seed_data {
        seed_store(&repo);
    }
    let state = AppState::new(repo, &cfg.app_name);

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = router(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "bind failed");
            std::process::exit(1);
        }
    };
    info!(%addr, app = %cfg.app_name, "api-server listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

/// Route table. Layers (tracing, request ids, CORS) are added by `main`.
fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/greetings", get(list_greetings))
        .route("/api/greetings/:id", get(get_greeting))
        .route(
            "/api/v1/greetings",
            get(list_generated_greetings).post(create_generated_greeting),
        )
        .route("/api/v1/greetings/:id", get(get_generated_greeting))
        .route("/api/info", get(get_info))
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", get(get_product))
        .with_state(state)
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct the store from config; an unusable SQLite file falls back to memory.
fn build_repo(cfg: &config::Config) -> AnyRepo {
    match cfg.storage_provider {
        config::StorageProvider::Sqlite => match AnyRepo::sqlite(&cfg.db_path) {
            Ok(r) => {
                info!(path = %cfg.db_path.display(), "using sqlite store");
                r
            }
            Err(e) => {
                error!(path = %cfg.db_path.display(), err = %e, "failed to open sqlite store, falling back to memory");
                AnyRepo::memory()
            }
        },
        config::StorageProvider::Memory => AnyRepo::memory(),
    }
}

fn seed_store(repo: &AnyRepo) {
    match seed_products(repo.products()) {
        Ok(0) => info!(backend = repo.backend(), "products already present, seed skipped"),
        Ok(n) => info!(backend = repo.backend(), inserted = n, "seeded products"),
        Err(e) => error!(err = %e, "product seed failed"),
    }
    match seed_greetings(repo.greetings()) {
        Ok(0) => info!(backend = repo.backend(), "greetings already present, seed skipped"),
        Ok(n) => info!(backend = repo.backend(), inserted = n, "seeded greetings"),
        Err(e) => error!(err = %e, "greeting seed failed"),
    }
}

#[derive(Deserialize)]
struct CreateGreetingReq {
    message: String,
}

#[derive(Deserialize)]
struct CreateProductReq {
    id: Option<i64>,
    name: String,
    price: f64,
}

#[derive(Deserialize)]
struct InfoQuery {
    include: Option<String>,
}

#[derive(Serialize)]
struct GreetingOut {
    id: i64,
    message: String,
    language: String,
}

impl From<Greeting> for GreetingOut {
    fn from(g: Greeting) -> Self {
        Self {
            id: g.id,
            message: g.message,
            language: g.language,
        }
    }
}

#[derive(Serialize)]
struct GeneratedGreetingOut {
    id: u64,
    message: String,
    timestamp: String,
}

impl From<GeneratedGreeting> for GeneratedGreetingOut {
    fn from(g: GeneratedGreeting) -> Self {
        Self {
            id: g.id,
            message: g.message,
            timestamp: http_common::system_time_to_rfc3339(g.timestamp),
        }
    }
}

#[derive(Serialize)]
struct ProductOut {
    id: i64,
    name: String,
    price: f64,
}

impl From<Product> for ProductOut {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            price: p.price,
        }
    }
}

#[derive(Serialize)]
struct InfoOut {
    app: String,
    timestamp: String,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    greetings: Option<Vec<GreetingOut>>,
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(http_common::json_err("internal")),
    )
        .into_response()
}

fn ok_list<T, U: Serialize + From<T>>(items: Vec<T>) -> Response {
    let out: Vec<U> = items.into_iter().map(U::from).collect();
    (StatusCode::OK, Json(out)).into_response()
}

async fn list_greetings(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.greetings().find_all() {
        Ok(items) => ok_list::<_, GreetingOut>(items),
        Err(e) => {
            error!(err = ?e, "list greetings error");
            internal_error()
        }
    }
}

async fn get_greeting(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.repo.greetings().find_by_id(id) {
        Ok(Some(g)) => (StatusCode::OK, Json(GreetingOut::from(g))).into_response(),
        Ok(None) => {
            warn!(id, "greeting 404");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            error!(id, err = ?e, "greeting lookup error");
            internal_error()
        }
    }
}

async fn list_generated_greetings(State(state): State<AppState>) -> impl IntoResponse {
    let items = state.generator.list();
    ok_list::<_, GeneratedGreetingOut>(items)
}

async fn create_generated_greeting(
    State(state): State<AppState>,
    Json(body): Json<CreateGreetingReq>,
) -> impl IntoResponse {
    let created = state.generator.create(body.message);
    info!(id = created.id, "generated greeting created");
    (StatusCode::OK, Json(GeneratedGreetingOut::from(created)))
}

// Looks the id up in a freshly regenerated list; see GreetingGenerator::find_by_id.
async fn get_generated_greeting(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.generator.find_by_id(id) {
        Some(g) => (StatusCode::OK, Json(GeneratedGreetingOut::from(g))).into_response(),
        None => {
            warn!(id, issued = state.generator.issued(), "generated greeting 404");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn get_info(State(state): State<AppState>, Query(q): Query<InfoQuery>) -> impl IntoResponse {
    let greetings = match q.include.as_deref() {
        Some("greetings") => match state.repo.greetings().find_all() {
            Ok(items) => Some(items.into_iter().map(GreetingOut::from).collect()),
            Err(e) => {
                error!(err = ?e, "info greetings error");
                return internal_error();
            }
        },
        _ => None,
    };
    let out = InfoOut {
        app: state.app_name.to_string(),
        timestamp: http_common::system_time_to_rfc3339(state.clock.now()),
        message: INFO_MESSAGE,
        greetings,
    };
    (StatusCode::OK, Json(out)).into_response()
}

async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.products().find_all() {
        Ok(items) => ok_list::<_, ProductOut>(items),
        Err(e) => {
            error!(err = ?e, "list products error");
            internal_error()
        }
    }
}

async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductReq>,
) -> impl IntoResponse {
    let input = ProductInput {
        id: body.id,
        name: body.name,
        price: body.price,
    };
    match state.repo.products().save(input) {
        Ok(p) => {
            info!(id = p.id, name = %p.name, "product saved");
            (StatusCode::OK, Json(ProductOut::from(p))).into_response()
        }
        Err(e) => {
            error!(err = ?e, "product save error");
            internal_error()
        }
    }
}

async fn get_product(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.repo.products().find_by_id(id) {
        Ok(Some(p)) => (StatusCode::OK, Json(ProductOut::from(p))).into_response(),
        Ok(None) => {
            warn!(id, "product 404");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            error!(id, err = ?e, "product lookup error");
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::collections::HashSet;
    use std::time::SystemTime;
    use tower::util::ServiceExt;

    fn app() -> Router {
        let repo = AnyRepo::memory();
        seed_store(&repo);
        router(AppState::new(repo, "test-app"))
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(router, req).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(router: &Router, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(router, req).await
    }

    fn ids(v: &serde_json::Value) -> Vec<u64> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|g| g["id"].as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn stored_greetings_list_and_lookup() {
        let router = app();

        let (status, list) = get_json(&router, "/api/greetings").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&list), vec![1, 2, 3]);
        assert_eq!(list[0]["language"], "en");

        let (status, one) = get_json(&router, "/api/greetings/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(one, list[1]);
    }

    #[tokio::test]
    async fn missing_ids_are_404_with_empty_body() {
        let router = app();
        for uri in [
            "/api/greetings/999",
            "/api/greetings/-1",
            "/products/999",
            "/products/-1",
            "/api/v1/greetings/999",
            "/api/v1/greetings/-1",
        ] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let (status, body) = send(&router, req).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert!(body.is_empty(), "{uri}");
        }
    }

    #[tokio::test]
    async fn store_failures_are_500_with_json_error() {
        let router = router(AppState::new(AnyRepo::failing(), "test-app"));
        let mut responses = Vec::new();
        for uri in [
            "/api/greetings",
            "/api/greetings/1",
            "/products",
            "/products/1",
            "/api/info?include=greetings",
        ] {
            responses.push((uri, get_json(&router, uri).await));
        }
        let (status, body) =
            post_json(&router, "/products", r#"{"name":"Mouse","price":25.0}"#).await;
        responses.push(("POST /products", (status, serde_json::from_slice(&body).unwrap())));

        for (uri, (status, v)) in responses {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert_eq!(v["error"]["code"], "internal", "{uri}");
            assert_eq!(v["error"]["message"], "Internal server error", "{uri}");
        }

        // Routes that never touch the store keep working.
        let (status, _) = get_json(&router, "/api/info").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = get_json(&router, "/api/v1/greetings").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn non_numeric_id_is_bad_request() {
        let router = app();
        let req = Request::builder()
            .uri("/api/greetings/abc")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generated_greetings_never_repeat_ids() {
        let router = app();
        let (status, first) = get_json(&router, "/api/v1/greetings").await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = get_json(&router, "/api/v1/greetings").await;

        let a: HashSet<u64> = ids(&first).into_iter().collect();
        let b: HashSet<u64> = ids(&second).into_iter().collect();
        assert_eq!(a.len(), 2);
        assert!(a.is_disjoint(&b));
        assert!(first[0]["timestamp"].as_str().unwrap().ends_with('Z'));

        // An id from an earlier listing is already behind the counter.
        let uri = format!("/api/v1/greetings/{}", ids(&first)[0]);
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _) = send(&router, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_generated_greeting_returns_200() {
        let router = app();
        let (status, body) = post_json(&router, "/api/v1/greetings", r#"{"message":"Hei!"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["id"], 1);
        assert_eq!(v["message"], "Hei!");
    }

    #[tokio::test]
    async fn seeded_products_in_insertion_order() {
        let router = app();
        let (status, list) = get_json(&router, "/products").await;
        assert_eq!(status, StatusCode::OK);
        let got: Vec<(String, f64)> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|p| {
                (
                    p["name"].as_str().unwrap().to_string(),
                    p["price"].as_f64().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            got,
            vec![
                ("Laptop".to_string(), 1200.00),
                ("Mouse".to_string(), 25.00),
                ("Keyboard".to_string(), 75.00),
            ]
        );
    }

    #[tokio::test]
    async fn create_product_assigns_fresh_id() {
        let router = app();
        let (_, before) = get_json(&router, "/products").await;
        let seen: HashSet<u64> = ids(&before).into_iter().collect();

        let (status, body) =
            post_json(&router, "/products", r#"{"name":"Laptop","price":1200.00}"#).await;
        assert_eq!(status, StatusCode::OK);
        let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let id = created["id"].as_u64().unwrap();
        assert!(!seen.contains(&id));
        assert_eq!(created["name"], "Laptop");
        assert_eq!(created["price"].as_f64(), Some(1200.00));

        let (status, fetched) = get_json(&router, &format!("/products/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_product_missing_field_is_rejected() {
        let router = app();
        let (status, _) = post_json(&router, "/products", r#"{"name":"Laptop"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn info_timestamp_within_request_window() {
        let router = app();
        let before = SystemTime::now();
        let (status, info) = get_json(&router, "/api/info").await;
        let after = SystemTime::now();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(info["app"], "test-app");
        assert_eq!(info["message"], INFO_MESSAGE);
        assert!(info.get("greetings").is_none());

        let ts = http_common::rfc3339_to_system_time(info["timestamp"].as_str().unwrap()).unwrap();
        assert!(before <= ts && ts <= after);
    }

    #[tokio::test]
    async fn info_can_embed_greetings() {
        let router = app();
        let (status, info) = get_json(&router, "/api/info?include=greetings").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&info["greetings"]), vec![1, 2, 3]);
    }
}
