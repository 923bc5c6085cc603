//! Category catalog: public reads, admin writes with an optional image.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;

use crate::auth::guard::AdminUser;
use crate::errors::AppError;
use crate::handlers::uploads::{read_form, upload_all};
use crate::models::category::{Category, CategoryName};
use crate::response::ApiResponse;
use crate::validation::validate_name;
use crate::AppState;

/// `GET /categories`
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Category>>>, AppError> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(ApiResponse::ok(categories)))
}

/// `GET /categories/names` — slim projection for the storefront picker.
pub async fn names(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryName>>>, AppError> {
    let names =
        sqlx::query_as::<_, CategoryName>("SELECT name, image FROM categories ORDER BY name ASC")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(ApiResponse::ok(names)))
}

/// `GET /categories/{id}`
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Category>>, AppError> {
    let category = fetch_category(&state, id).await?;
    Ok(Json(ApiResponse::ok(category)))
}

/// `POST /categories` — multipart: `name` plus an optional image file.
pub async fn create(
    admin: AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Category>>, AppError> {
    let form = read_form(multipart).await?;
    let name = form.required_text("name")?.trim().to_string();
    validate_name(&name).map_err(AppError::Validation)?;

    let image = upload_all(&state.http, &admin.0, &form.files).await?.into_iter().next();

    let result = sqlx::query("INSERT INTO categories (name, image, created_at) VALUES (?, ?, ?)")
        .bind(&name)
        .bind(&image)
        .bind(Utc::now())
        .execute(&state.db)
        .await;

    let result = match result {
        Ok(res) => res,
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::Duplicate("Category already exists".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let category = fetch_category(&state, result.last_insert_rowid()).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Category created successfully",
        category,
    )))
}

/// `PUT /categories/{id}` — multipart partial update; a new image file
/// replaces the stored one.
pub async fn update(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Category>>, AppError> {
    let existing = fetch_category(&state, id).await?;
    let form = read_form(multipart).await?;

    let name = match form.text("name") {
        Some(raw) if !raw.trim().is_empty() => {
            validate_name(raw).map_err(AppError::Validation)?;
            raw.trim().to_string()
        }
        _ => existing.name.clone(),
    };
    let image = if form.files.is_empty() {
        existing.image.clone()
    } else {
        upload_all(&state.http, &admin.0, &form.files).await?.into_iter().next()
    };

    let result = sqlx::query("UPDATE categories SET name = ?, image = ? WHERE id = ?")
        .bind(&name)
        .bind(&image)
        .bind(id)
        .execute(&state.db)
        .await;

    if let Err(sqlx::Error::Database(err)) = &result {
        if err.is_unique_violation() {
            return Err(AppError::Duplicate("Category already exists".to_string()));
        }
    }
    result?;

    let category = fetch_category(&state, id).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Category updated successfully",
        category,
    )))
}

/// `DELETE /categories/{id}`
pub async fn delete(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Category not found".to_string()));
    }
    Ok(Json(ApiResponse::message_only(
        "Category deleted successfully",
    )))
}

async fn fetch_category(state: &AppState, id: i64) -> Result<Category, AppError> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
}
