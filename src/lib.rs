pub mod auth;
pub mod config;
pub mod database;
pub mod discount;
pub mod errors;
pub mod handlers;
pub mod logger;
pub mod models;
pub mod rate_limiter;
pub mod response;
pub mod upload;
pub mod validation;

use std::path::Path;
use std::time::Duration;

use axum::extract::State;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};

use discount::DiscountEngine;
use response::ApiResponse;

/// Global application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub http: reqwest::Client,
    pub engine: DiscountEngine,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool) -> Result<Self, String> {
        let timeout = config::get_config().upload.request_timeout_secs;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
        Ok(Self {
            engine: DiscountEngine::new(db.clone()),
            db,
            http,
        })
    }
}

async fn health(State(state): State<AppState>) -> Result<Json<ApiResponse<()>>, errors::AppError> {
    database::connection::health_check(&state.db).await?;
    Ok(Json(ApiResponse::message_only("ok")))
}

/// The full route surface. Admin routes gate themselves through the
/// `AdminUser` extractor.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Discounts (admin)
        .route("/discounts", get(handlers::discounts::list))
        .route("/discounts", post(handlers::discounts::create))
        .route("/discounts/stats", get(handlers::discounts::stats))
        .route(
            "/discounts/validate/{code}",
            get(handlers::discounts::validate_code_admin),
        )
        .route("/discounts/{id}", get(handlers::discounts::get_by_id))
        .route("/discounts/{id}", put(handlers::discounts::update))
        .route("/discounts/{id}", delete(handlers::discounts::delete))
        .route("/discounts/{id}/toggle", patch(handlers::discounts::toggle))
        // Discounts (public storefront)
        .route(
            "/mobile/discounts/validate",
            post(handlers::discounts::validate_mobile),
        )
        .route(
            "/mobile/discounts/apply",
            post(handlers::discounts::apply_mobile),
        )
        // Orders
        .route("/orders", post(handlers::orders::create))
        .route("/orders/apply-discount", post(handlers::orders::apply_discount))
        .route("/orders/{id}/discount", get(handlers::orders::get_discount))
        .route("/admin/orders", get(handlers::orders::list_admin))
        .route(
            "/admin/orders/{id}/status",
            patch(handlers::orders::update_status),
        )
        // Products
        .route("/products", get(handlers::products::list))
        .route("/products", post(handlers::products::create))
        .route("/products/{id}", get(handlers::products::get_by_id))
        .route("/products/{id}", put(handlers::products::update))
        .route("/products/{id}", delete(handlers::products::delete))
        // Categories
        .route("/categories", get(handlers::categories::list))
        .route("/categories", post(handlers::categories::create))
        .route("/categories/names", get(handlers::categories::names))
        .route("/categories/{id}", get(handlers::categories::get_by_id))
        .route("/categories/{id}", put(handlers::categories::update))
        .route("/categories/{id}", delete(handlers::categories::delete))
        // Banners
        .route("/admin/banners", get(handlers::banners::list))
        .route("/admin/banners", post(handlers::banners::create))
        .route("/admin/banners/{id}", put(handlers::banners::update))
        .route("/admin/banners/{id}", delete(handlers::banners::delete))
        .route("/active-banners", get(handlers::banners::list_active))
        // Users
        .route("/admin/users", get(handlers::users::list))
        .route("/admin/users/{id}", put(handlers::users::update))
        .route("/admin/users/{id}", delete(handlers::users::delete))
        // Dashboard
        .route("/admin/total-revenue", get(handlers::dashboard::total_revenue))
        .route("/admin/order-status", get(handlers::dashboard::order_status))
        .route("/admin/total-orders", get(handlers::dashboard::total_orders))
        .route("/admin/total-users", get(handlers::dashboard::total_users))
        .route("/admin/active-users", get(handlers::dashboard::active_users))
        .with_state(state)
}

/// Initialize config, logging, and the database, then serve until the
/// process is stopped.
pub async fn run(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Seed the process environment from a .env file if one is present,
    // then freeze the global config.
    config::AppConfig::load_from_file(&data_dir.join(".env"));
    let config = config::init_config();
    config.validate()?;

    if let Err(e) = logger::init_global_logger(data_dir) {
        eprintln!("Warning: failed to initialize logger: {}", e);
    }

    log_info!(
        "APP",
        "Application starting",
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "environment": config.environment.as_str(),
            "data_dir": data_dir.to_string_lossy()
        })
    );

    let pool = database::connection::init_db(data_dir).await?;
    log_info!(
        "DATABASE",
        "Database connection pool initialized",
        serde_json::json!({ "pool_size": pool.size() })
    );

    let state = AppState::new(pool)?;
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log_info!(
        "APP",
        "Listening",
        serde_json::json!({ "addr": addr })
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}
