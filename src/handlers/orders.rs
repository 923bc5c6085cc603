//! Order intake plus the order-side discount operations.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::auth::guard::AdminUser;
use crate::discount::engine::savings_percentage;
use crate::errors::AppError;
use crate::models::order::{
    amount_from_items, ApplyDiscountToOrderPayload, CreateOrderPayload, DiscountAppliedView,
    Order, OrderWithNewFlag, UpdateOrderStatusPayload,
};
use crate::response::ApiResponse;
use crate::{log_info, AppState};

/// `POST /orders` — storefront order intake. Amounts from the client are
/// advisory; the original amount is recomputed from the line items when
/// absent, and the final amount falls back to original minus discount.
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    if payload.items.is_empty() {
        return Err(AppError::Validation(
            "Order must contain at least one item".to_string(),
        ));
    }

    let id = Uuid::new_v4().to_string();
    let reference = Uuid::new_v4().simple().to_string();
    let now = Utc::now();

    // Client amounts are advisory; floor them at zero on intake.
    let discount_amount = payload.discount_amount.unwrap_or(0.0).max(0.0);
    let original_amount = payload
        .original_amount
        .unwrap_or_else(|| amount_from_items(&payload.items))
        .max(0.0);
    let final_amount = payload
        .final_amount
        .unwrap_or(original_amount - discount_amount)
        .max(0.0);

    sqlx::query(
        "INSERT INTO orders
            (id, items, delivery_address, delivery_option, payment_status, order_status,
             payment_reference_code, discount_coupon, discount_amount, original_amount,
             final_amount, user_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(SqlJson(&payload.items))
    .bind(SqlJson(&payload.delivery_address))
    .bind(&payload.delivery_option)
    .bind(payload.payment_status)
    .bind(payload.order_status)
    .bind(&reference)
    .bind(&payload.discount_coupon)
    .bind(discount_amount)
    .bind(original_amount)
    .bind(final_amount)
    .bind(payload.user_id)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await?;

    let order = fetch_order(&state, &id).await?;
    log_info!(
        "ORDER",
        "order created",
        serde_json::json!({ "id": order.id, "final_amount": order.final_amount })
    );
    Ok(Json(ApiResponse::ok_with_message(
        "Order placed successfully",
        order,
    )))
}

/// `GET /orders/{id}/discount` — the discount snapshot recorded on an
/// order, if any.
pub async fn get_discount(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DiscountAppliedView>>, AppError> {
    let order = fetch_order(&state, &id).await?;

    match order.discount_coupon {
        Some(coupon) => Ok(Json(ApiResponse::ok(DiscountAppliedView {
            coupon,
            amount: order.discount_amount,
            savings: savings_percentage(order.discount_amount, order.original_amount),
        }))),
        None => Err(AppError::NotFound(
            "No discount applied to this order".to_string(),
        )),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedToOrder {
    pub order: Order,
    pub discount_coupon: String,
    pub discount_amount: f64,
    pub final_amount: f64,
}

/// `POST /orders/apply-discount` — write the discount snapshot onto an
/// existing order and consume one usage.
pub async fn apply_discount(
    State(state): State<AppState>,
    Json(payload): Json<ApplyDiscountToOrderPayload>,
) -> Result<Json<ApiResponse<AppliedToOrder>>, AppError> {
    let (order, discount, quote) = state
        .engine
        .apply_to_order(&payload.order_id, &payload.discount_code, payload.original_amount)
        .await?;

    Ok(Json(ApiResponse::ok_with_message(
        "Discount applied to order",
        AppliedToOrder {
            order,
            discount_coupon: discount.code,
            discount_amount: quote.discount_amount,
            final_amount: quote.final_amount,
        },
    )))
}

/// `GET /admin/orders` — all orders, newest first; orders from the last
/// 24 hours carry `is_new`.
pub async fn list_admin(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<OrderWithNewFlag>>>, AppError> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;

    let cutoff = Utc::now() - Duration::hours(24);
    let flagged = orders
        .into_iter()
        .map(|order| {
            let is_new = order.created_at > cutoff;
            OrderWithNewFlag { order, is_new }
        })
        .collect();

    Ok(Json(ApiResponse::ok(flagged)))
}

/// `PATCH /admin/orders/{id}/status`
pub async fn update_status(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOrderStatusPayload>,
) -> Result<Json<ApiResponse<Order>>, AppError> {
    let result = sqlx::query("UPDATE orders SET order_status = ?, updated_at = ? WHERE id = ?")
        .bind(payload.status)
        .bind(Utc::now())
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Order not found".to_string()));
    }

    let order = fetch_order(&state, &id).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Order status updated",
        order,
    )))
}

async fn fetch_order(state: &AppState, id: &str) -> Result<Order, AppError> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}
