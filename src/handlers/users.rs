//! Admin user management.

use axum::extract::{Path, State};
use axum::Json;

use crate::auth::guard::AdminUser;
use crate::errors::AppError;
use crate::models::user::{UpdateUserPayload, User};
use crate::response::ApiResponse;
use crate::validation::validate_email;
use crate::AppState;

/// `GET /admin/users`
pub async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(ApiResponse::ok(users)))
}

/// `PUT /admin/users/{id}` — partial update.
pub async fn update(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let existing = fetch_user(&state, id).await?;

    let email = match payload.email {
        Some(ref email) => {
            validate_email(email).map_err(AppError::Validation)?;
            email.trim().to_lowercase()
        }
        None => existing.email.clone(),
    };
    let name = match payload.name {
        Some(ref name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => existing.name.clone(),
    };
    let is_active = payload.is_active.unwrap_or(existing.is_active);

    let result = sqlx::query("UPDATE users SET name = ?, email = ?, is_active = ? WHERE id = ?")
        .bind(&name)
        .bind(&email)
        .bind(is_active)
        .bind(id)
        .execute(&state.db)
        .await;

    if let Err(sqlx::Error::Database(err)) = &result {
        if err.is_unique_violation() {
            return Err(AppError::Duplicate("Email already in use".to_string()));
        }
    }
    result?;

    let user = fetch_user(&state, id).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "User updated successfully",
        user,
    )))
}

/// `DELETE /admin/users/{id}`
pub async fn delete(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(Json(ApiResponse::message_only("User deleted successfully")))
}

async fn fetch_user(state: &AppState, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
