//! Discount admin CRUD plus the public storefront validate/apply endpoints.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use sqlx::types::Json as SqlJson;

use crate::auth::guard::AdminUser;
use crate::discount::engine::{Application, Validation};
use crate::discount::OrderContext;
use crate::errors::AppError;
use crate::models::discount::{
    CreateDiscountPayload, Discount, DiscountStats, UpdateDiscountPayload,
};
use crate::rate_limiter::APPLY_DISCOUNT_LIMIT;
use crate::response::{ApiResponse, Paginated, Pagination};
use crate::validation::{
    normalize_code, validate_date_window, validate_discount_code, validate_discount_value,
    validate_max_usage, validate_min_order_amount, validate_name,
};
use crate::{log_info, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ListDiscountsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
}

/// `GET /discounts` — paginated admin list, newest first.
pub async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListDiscountsQuery>,
) -> Result<Json<ApiResponse<Paginated<Discount>>>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * limit;

    let mut where_clause = String::from("WHERE 1=1");
    let search = query.search.as_deref().map(|s| format!("%{}%", s.trim()));
    if search.is_some() {
        where_clause.push_str(" AND (code LIKE ? OR name LIKE ?)");
    }
    match query.status.as_deref() {
        Some("active") => where_clause.push_str(" AND is_active = 1"),
        Some("inactive") => where_clause.push_str(" AND is_active = 0"),
        _ => {}
    }

    let count_sql = format!("SELECT COUNT(*) FROM discounts {}", where_clause);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(ref pattern) = search {
        count_query = count_query.bind(pattern).bind(pattern);
    }
    let total = count_query.fetch_one(&state.db).await?;

    let list_sql = format!(
        "SELECT * FROM discounts {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        where_clause
    );
    let mut list_query = sqlx::query_as::<_, Discount>(&list_sql);
    if let Some(ref pattern) = search {
        list_query = list_query.bind(pattern).bind(pattern);
    }
    let items = list_query
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(ApiResponse::ok(Paginated {
        items,
        pagination: Pagination::new(page, limit, total),
    })))
}

/// `GET /discounts/stats` — counts for the admin dashboard cards.
pub async fn stats(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DiscountStats>>, AppError> {
    let now = Utc::now();
    let row: (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN is_active = 1 AND start_date <= ? AND end_date >= ? THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN end_date < ? THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN start_date > ? THEN 1 ELSE 0 END), 0)
         FROM discounts",
    )
    .bind(now)
    .bind(now)
    .bind(now)
    .bind(now)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(ApiResponse::ok(DiscountStats {
        total: row.0,
        active: row.1,
        expired: row.2,
        upcoming: row.3,
    })))
}

/// `GET /discounts/{id}`
pub async fn get_by_id(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Discount>>, AppError> {
    let discount = fetch_discount(&state, id).await?;
    Ok(Json(ApiResponse::ok(discount)))
}

/// `POST /discounts`
pub async fn create(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateDiscountPayload>,
) -> Result<Json<ApiResponse<Discount>>, AppError> {
    validate_discount_code(&payload.code).map_err(AppError::Validation)?;
    validate_name(&payload.name).map_err(AppError::Validation)?;
    validate_discount_value(payload.r#type, payload.value).map_err(AppError::Validation)?;
    validate_date_window(payload.start_date, payload.end_date).map_err(AppError::Validation)?;
    validate_min_order_amount(payload.min_order_amount).map_err(AppError::Validation)?;
    if let Some(max_usage) = payload.max_usage {
        validate_max_usage(max_usage).map_err(AppError::Validation)?;
    }

    let code = normalize_code(&payload.code);
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO discounts
            (code, name, description, type, value, max_discount, min_order_amount,
             max_usage, used_count, applicable_products, applicable_categories,
             start_date, end_date, is_active, is_first_time_only, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&code)
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.r#type)
    .bind(payload.value)
    .bind(payload.max_discount)
    .bind(payload.min_order_amount)
    .bind(payload.max_usage)
    .bind(SqlJson(&payload.applicable_products))
    .bind(SqlJson(&payload.applicable_categories))
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.is_active.unwrap_or(true))
    .bind(payload.is_first_time_only)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await;

    let result = match result {
        Ok(res) => res,
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::Duplicate(
                "Discount code already exists".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let discount = fetch_discount(&state, result.last_insert_rowid()).await?;
    log_info!(
        "DISCOUNT",
        "discount created",
        serde_json::json!({ "code": discount.code, "type": discount.r#type.as_str() })
    );
    Ok(Json(ApiResponse::ok_with_message(
        "Discount created successfully",
        discount,
    )))
}

/// `PUT /discounts/{id}` — partial update; only present fields change and
/// only present fields are re-validated, except the date window which is
/// always checked against the merged values.
pub async fn update(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateDiscountPayload>,
) -> Result<Json<ApiResponse<Discount>>, AppError> {
    let existing = fetch_discount(&state, id).await?;

    let code = match payload.code {
        Some(ref code) => {
            validate_discount_code(code).map_err(AppError::Validation)?;
            normalize_code(code)
        }
        None => existing.code.clone(),
    };
    if let Some(ref name) = payload.name {
        validate_name(name).map_err(AppError::Validation)?;
    }
    let r#type = payload.r#type.unwrap_or(existing.r#type);
    let value = payload.value.unwrap_or(existing.value);
    if payload.r#type.is_some() || payload.value.is_some() {
        validate_discount_value(r#type, value).map_err(AppError::Validation)?;
    }
    let start_date = payload.start_date.unwrap_or(existing.start_date);
    let end_date = payload.end_date.unwrap_or(existing.end_date);
    validate_date_window(start_date, end_date).map_err(AppError::Validation)?;
    let min_order_amount = payload.min_order_amount.unwrap_or(existing.min_order_amount);
    if payload.min_order_amount.is_some() {
        validate_min_order_amount(min_order_amount).map_err(AppError::Validation)?;
    }
    if let Some(max_usage) = payload.max_usage {
        validate_max_usage(max_usage).map_err(AppError::Validation)?;
    }

    let result = sqlx::query(
        "UPDATE discounts SET
            code = ?, name = ?, description = ?, type = ?, value = ?,
            max_discount = ?, min_order_amount = ?, max_usage = ?,
            applicable_products = ?, applicable_categories = ?,
            start_date = ?, end_date = ?, is_active = ?, is_first_time_only = ?,
            updated_at = ?
         WHERE id = ?",
    )
    .bind(&code)
    .bind(payload.name.as_deref().unwrap_or(&existing.name).trim())
    .bind(payload.description.as_ref().or(existing.description.as_ref()))
    .bind(r#type)
    .bind(value)
    .bind(payload.max_discount.or(existing.max_discount))
    .bind(min_order_amount)
    .bind(payload.max_usage.or(existing.max_usage))
    .bind(SqlJson(
        payload
            .applicable_products
            .unwrap_or_else(|| existing.applicable_products.0.clone()),
    ))
    .bind(SqlJson(
        payload
            .applicable_categories
            .unwrap_or_else(|| existing.applicable_categories.0.clone()),
    ))
    .bind(start_date)
    .bind(end_date)
    .bind(payload.is_active.unwrap_or(existing.is_active))
    .bind(payload.is_first_time_only.unwrap_or(existing.is_first_time_only))
    .bind(Utc::now())
    .bind(id)
    .execute(&state.db)
    .await;

    if let Err(sqlx::Error::Database(err)) = &result {
        if err.is_unique_violation() {
            return Err(AppError::Duplicate(
                "Discount code already exists".to_string(),
            ));
        }
    }
    result?;

    let discount = fetch_discount(&state, id).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Discount updated successfully",
        discount,
    )))
}

/// `DELETE /discounts/{id}`
pub async fn delete(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let result = sqlx::query("DELETE FROM discounts WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Discount not found".to_string()));
    }
    Ok(Json(ApiResponse::message_only(
        "Discount deleted successfully",
    )))
}

/// `PATCH /discounts/{id}/toggle`
pub async fn toggle(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Discount>>, AppError> {
    let existing = fetch_discount(&state, id).await?;
    sqlx::query("UPDATE discounts SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(!existing.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(&state.db)
        .await?;

    let discount = fetch_discount(&state, id).await?;
    let message = if discount.is_active {
        "Discount activated"
    } else {
        "Discount deactivated"
    };
    Ok(Json(ApiResponse::ok_with_message(message, discount)))
}

/// `GET /discounts/validate/{code}` — read-only admin check; never touches
/// `used_count`.
pub async fn validate_code_admin(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<Discount>>, AppError> {
    let discount = state.engine.find_by_code(&code).await?;
    crate::discount::engine::check_redeemable(&discount, Utc::now())
        .map_err(AppError::Discount)?;
    Ok(Json(ApiResponse::ok_with_message(
        "Discount code is valid",
        discount,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileValidatePayload {
    pub code: String,
    pub order_amount: f64,
    #[serde(default)]
    pub product_ids: Vec<i64>,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// `POST /mobile/discounts/validate` — storefront check with full order
/// context. Read-only.
pub async fn validate_mobile(
    State(state): State<AppState>,
    Json(payload): Json<MobileValidatePayload>,
) -> Result<Json<ApiResponse<Validation>>, AppError> {
    let ctx = OrderContext {
        order_amount: payload.order_amount,
        user_id: payload.user_id,
        product_ids: payload.product_ids,
        category_ids: payload.category_ids,
    };
    let validation = state.engine.validate(&payload.code, &ctx).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Discount code is valid",
        validation,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileApplyPayload {
    pub code: String,
    pub order_amount: f64,
}

/// `POST /mobile/discounts/apply` — consumes one usage. Rate limited per
/// caller and code so one shopper cannot exhaust a hot coupon's budget
/// for everyone else.
pub async fn apply_mobile(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<MobileApplyPayload>,
) -> Result<Json<ApiResponse<Application>>, AppError> {
    let key = apply_limit_key(addr.ip(), &normalize_code(&payload.code));
    if let Err(msg) = APPLY_DISCOUNT_LIMIT.check(&key, "apply") {
        crate::log_warn!("DISCOUNT", "apply rate limited");
        return Err(AppError::RateLimited(msg));
    }

    let application = state.engine.apply(&payload.code, payload.order_amount).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Discount applied successfully",
        application,
    )))
}

fn apply_limit_key(ip: IpAddr, code: &str) -> String {
    format!("{}:{}", ip, code)
}

async fn fetch_discount(state: &AppState, id: i64) -> Result<Discount, AppError> {
    sqlx::query_as::<_, Discount>("SELECT * FROM discounts WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Discount not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limiter::RateLimiter;

    #[test]
    fn test_apply_limit_is_scoped_per_caller_and_code() {
        let limiter = RateLimiter::new(1, 60);
        let first: IpAddr = "10.0.0.1".parse().unwrap();
        let second: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check(&apply_limit_key(first, "save10"), "apply").is_ok());
        assert!(limiter.check(&apply_limit_key(second, "save10"), "apply").is_ok());
        assert!(limiter.check(&apply_limit_key(first, "save10"), "apply").is_err());
        assert!(limiter.check(&apply_limit_key(first, "welcome20"), "apply").is_ok());
    }
}
