//! Admin dashboard aggregations over orders and users.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::auth::guard::AdminUser;
use crate::errors::AppError;
use crate::response::ApiResponse;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalRevenue {
    pub total_revenue: f64,
}

/// `GET /admin/total-revenue` — sum of final amounts over completed orders.
pub async fn total_revenue(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TotalRevenue>>, AppError> {
    let total: Option<f64> = sqlx::query_scalar(
        "SELECT SUM(final_amount) FROM orders WHERE order_status = 'order_completed'",
    )
    .fetch_one(&state.db)
    .await?;

    Ok(Json(ApiResponse::ok(TotalRevenue {
        total_revenue: total.unwrap_or(0.0),
    })))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MonthlyOrderStatus {
    /// `YYYY-MM`.
    pub month: String,
    pub completed: i64,
    pub cancelled: i64,
}

/// `GET /admin/order-status` — per-month completed vs cancelled counts.
pub async fn order_status(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<MonthlyOrderStatus>>>, AppError> {
    let rows = sqlx::query_as::<_, MonthlyOrderStatus>(
        "SELECT substr(created_at, 1, 7) AS month,
                SUM(CASE WHEN order_status = 'order_completed' THEN 1 ELSE 0 END) AS completed,
                SUM(CASE WHEN order_status = 'order_cancelled' THEN 1 ELSE 0 END) AS cancelled
         FROM orders
         GROUP BY month
         ORDER BY month ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::ok(rows)))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MonthlyOrderCount {
    pub month: String,
    pub count: i64,
}

/// `GET /admin/total-orders` — per-month order counts.
pub async fn total_orders(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<MonthlyOrderCount>>>, AppError> {
    let rows = sqlx::query_as::<_, MonthlyOrderCount>(
        "SELECT substr(created_at, 1, 7) AS month, COUNT(*) AS count
         FROM orders
         GROUP BY month
         ORDER BY month ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::ok(rows)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalUsers {
    pub total_users: i64,
}

/// `GET /admin/total-users`
pub async fn total_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TotalUsers>>, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;
    Ok(Json(ApiResponse::ok(TotalUsers { total_users: total })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUsers {
    pub active_users: i64,
}

/// `GET /admin/active-users`
pub async fn active_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ActiveUsers>>, AppError> {
    let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1")
        .fetch_one(&state.db)
        .await?;
    Ok(Json(ApiResponse::ok(ActiveUsers {
        active_users: active,
    })))
}
