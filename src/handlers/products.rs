//! Product catalog. Reads are public for the storefront; writes are admin
//! and accept multipart bodies with up to six gallery images, which are
//! proxied to the image host before the row is written.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use sqlx::types::Json as SqlJson;

use crate::auth::guard::AdminUser;
use crate::errors::AppError;
use crate::handlers::uploads::{parse_string_array, read_form, upload_all};
use crate::models::product::Product;
use crate::response::ApiResponse;
use crate::validation::{validate_name, validate_price, validate_stock};
use crate::{log_info, AppState};

/// `GET /products`
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Product>>>, AppError> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// `GET /products/{id}`
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    let product = fetch_product(&state, id).await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// `POST /products` — multipart: text fields plus image files.
pub async fn create(
    admin: AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    let form = read_form(multipart).await?;

    let name = form.required_text("name")?.trim().to_string();
    validate_name(&name).map_err(AppError::Validation)?;
    let description = form.text("description").unwrap_or_default().to_string();
    let price: f64 = parse_number(form.required_text("price")?, "price")?;
    validate_price(price).map_err(AppError::Validation)?;
    let sale_price = match form.text("salePrice") {
        Some(raw) if !raw.trim().is_empty() => {
            let parsed = parse_number(raw, "salePrice")?;
            validate_price(parsed).map_err(AppError::Validation)?;
            Some(parsed)
        }
        _ => None,
    };
    let stock: i64 = parse_number(form.required_text("stock")?, "stock")?;
    validate_stock(stock).map_err(AppError::Validation)?;

    let category = parse_string_array(form.text("category"));
    if category.is_empty() {
        return Err(AppError::Validation("category is required".to_string()));
    }
    let colors = parse_string_array(form.text("colors"));
    let sizes = parse_string_array(form.text("sizes"));

    let images = upload_all(&state.http, &admin.0, &form.files).await?;
    if images.is_empty() {
        return Err(AppError::Validation(
            "At least one product image is required".to_string(),
        ));
    }

    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO products
            (name, category, description, price, sale_price, stock, images, colors, sizes,
             created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&name)
    .bind(SqlJson(&category))
    .bind(&description)
    .bind(price)
    .bind(sale_price)
    .bind(stock)
    .bind(SqlJson(&images))
    .bind(SqlJson(&colors))
    .bind(SqlJson(&sizes))
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await?;

    let product = fetch_product(&state, result.last_insert_rowid()).await?;
    log_info!(
        "PRODUCT",
        "product created",
        serde_json::json!({ "id": product.id, "name": product.name })
    );
    Ok(Json(ApiResponse::ok_with_message(
        "Product created successfully",
        product,
    )))
}

/// `PUT /products/{id}` — multipart partial update. New image files, when
/// present, replace the gallery; existing URLs can be kept by sending them
/// in the `images` field.
pub async fn update(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Product>>, AppError> {
    let existing = fetch_product(&state, id).await?;
    let form = read_form(multipart).await?;

    let name = match form.text("name") {
        Some(raw) if !raw.trim().is_empty() => {
            validate_name(raw).map_err(AppError::Validation)?;
            raw.trim().to_string()
        }
        _ => existing.name.clone(),
    };
    let description = form
        .text("description")
        .map(str::to_string)
        .unwrap_or_else(|| existing.description.clone());
    let price = match form.text("price") {
        Some(raw) if !raw.trim().is_empty() => {
            let parsed = parse_number(raw, "price")?;
            validate_price(parsed).map_err(AppError::Validation)?;
            parsed
        }
        _ => existing.price,
    };
    let sale_price = match form.text("salePrice") {
        Some(raw) if !raw.trim().is_empty() => Some(parse_number(raw, "salePrice")?),
        _ => existing.sale_price,
    };
    let stock = match form.text("stock") {
        Some(raw) if !raw.trim().is_empty() => {
            let parsed = parse_number(raw, "stock")?;
            validate_stock(parsed).map_err(AppError::Validation)?;
            parsed
        }
        _ => existing.stock,
    };
    let category = match form.text("category") {
        Some(_) => parse_string_array(form.text("category")),
        None => existing.category.0.clone(),
    };
    let colors = match form.text("colors") {
        Some(_) => parse_string_array(form.text("colors")),
        None => existing.colors.0.clone(),
    };
    let sizes = match form.text("sizes") {
        Some(_) => parse_string_array(form.text("sizes")),
        None => existing.sizes.0.clone(),
    };

    let mut images = match form.text("images") {
        Some(_) => parse_string_array(form.text("images")),
        None => existing.images.0.clone(),
    };
    if !form.files.is_empty() {
        images = upload_all(&state.http, &admin.0, &form.files).await?;
    }
    if images.is_empty() {
        return Err(AppError::Validation(
            "At least one product image is required".to_string(),
        ));
    }

    sqlx::query(
        "UPDATE products SET
            name = ?, category = ?, description = ?, price = ?, sale_price = ?,
            stock = ?, images = ?, colors = ?, sizes = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&name)
    .bind(SqlJson(&category))
    .bind(&description)
    .bind(price)
    .bind(sale_price)
    .bind(stock)
    .bind(SqlJson(&images))
    .bind(SqlJson(&colors))
    .bind(SqlJson(&sizes))
    .bind(Utc::now())
    .bind(id)
    .execute(&state.db)
    .await?;

    let product = fetch_product(&state, id).await?;
    Ok(Json(ApiResponse::ok_with_message(
        "Product updated successfully",
        product,
    )))
}

/// `DELETE /products/{id}`
pub async fn delete(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Product not found".to_string()));
    }
    Ok(Json(ApiResponse::message_only(
        "Product deleted successfully",
    )))
}

fn parse_number<T: std::str::FromStr>(raw: &str, field: &str) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("{} must be a number", field)))
}

async fn fetch_product(state: &AppState, id: i64) -> Result<Product, AppError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}
