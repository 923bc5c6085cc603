//! Promotional banners: admin CRUD plus the public active-banner feed.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;

use crate::auth::guard::AdminUser;
use crate::errors::AppError;
use crate::handlers::uploads::{read_form, upload_all};
use crate::models::banner::Banner;
use crate::response::ApiResponse;
use crate::AppState;

/// `GET /admin/banners`
pub async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Banner>>>, AppError> {
    let banners = sqlx::query_as::<_, Banner>("SELECT * FROM banners ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(ApiResponse::ok(banners)))
}

/// `GET /active-banners` — public storefront feed.
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Banner>>>, AppError> {
    let banners = sqlx::query_as::<_, Banner>(
        "SELECT * FROM banners WHERE is_active = 1 ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(ApiResponse::ok(banners)))
}

/// `POST /admin/banners` — multipart: `title`, optional `link` and
/// `isActive`, plus the banner image file.
pub async fn create(
    admin: AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Banner>>, AppError> {
    let form = read_form(multipart).await?;
    let title = form.required_text("title")?.trim().to_string();
    let link = form
        .text("link")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let is_active = form
        .text("isActive")
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(true);

    let image = upload_all(&state.http, &admin.0, &form.files)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Validation("Banner image is required".to_string()))?;

    let result = sqlx::query(
        "INSERT INTO banners (title, image, link, is_active, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&title)
    .bind(&image)
    .bind(&link)
    .bind(is_active)
    .bind(Utc::now())
    .execute(&state.db)
    .await?;

    let banner = fetch_banner(&state, result.last_insert_rowid()).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Banner created successfully",
        banner,
    )))
}

/// `PUT /admin/banners/{id}` — multipart partial update.
pub async fn update(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Banner>>, AppError> {
    let existing = fetch_banner(&state, id).await?;
    let form = read_form(multipart).await?;

    let title = match form.text("title") {
        Some(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
        _ => existing.title.clone(),
    };
    let link = match form.text("link") {
        Some(raw) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
        Some(_) => None,
        None => existing.link.clone(),
    };
    let is_active = match form.text("isActive") {
        Some(raw) => raw.trim().eq_ignore_ascii_case("true"),
        None => existing.is_active,
    };
    let image = if form.files.is_empty() {
        existing.image.clone()
    } else {
        upload_all(&state.http, &admin.0, &form.files)
            .await?
            .into_iter()
            .next()
            .unwrap_or(existing.image.clone())
    };

    sqlx::query("UPDATE banners SET title = ?, image = ?, link = ?, is_active = ? WHERE id = ?")
        .bind(&title)
        .bind(&image)
        .bind(&link)
        .bind(is_active)
        .bind(id)
        .execute(&state.db)
        .await?;

    let banner = fetch_banner(&state, id).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Banner updated successfully",
        banner,
    )))
}

/// `DELETE /admin/banners/{id}`
pub async fn delete(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let result = sqlx::query("DELETE FROM banners WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Banner not found".to_string()));
    }
    Ok(Json(ApiResponse::message_only("Banner deleted successfully")))
}

async fn fetch_banner(state: &AppState, id: i64) -> Result<Banner, AppError> {
    sqlx::query_as::<_, Banner>("SELECT * FROM banners WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Banner not found".to_string()))
}
