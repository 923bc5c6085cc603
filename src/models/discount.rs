use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// Wire field names follow the admin UI contract (camelCase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub id: i64,
    /// Unique, stored upper-cased; lookups normalize first.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(rename = "type")]
    pub r#type: DiscountType,
    pub value: f64,
    /// Cap on the computed amount; only meaningful for percentage discounts.
    pub max_discount: Option<f64>,
    pub min_order_amount: f64,
    pub max_usage: Option<i64>,
    pub used_count: i64,
    pub applicable_products: Json<Vec<i64>>,
    pub applicable_categories: Json<Vec<String>>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    /// Declared but not enforced against order history; kept so existing
    /// admin data round-trips.
    pub is_first_time_only: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiscountPayload {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub r#type: DiscountType,
    pub value: f64,
    pub max_discount: Option<f64>,
    #[serde(default)]
    pub min_order_amount: f64,
    pub max_usage: Option<i64>,
    #[serde(default)]
    pub applicable_products: Vec<i64>,
    #[serde(default)]
    pub applicable_categories: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_first_time_only: bool,
}

/// Partial update: every field optional, validation runs only for fields
/// that are present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDiscountPayload {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub r#type: Option<DiscountType>,
    pub value: Option<f64>,
    pub max_discount: Option<f64>,
    pub min_order_amount: Option<f64>,
    pub max_usage: Option<i64>,
    pub applicable_products: Option<Vec<i64>>,
    pub applicable_categories: Option<Vec<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub is_first_time_only: Option<bool>,
}

/// Counts for the admin dashboard cards.
#[derive(Debug, Serialize)]
pub struct DiscountStats {
    pub total: i64,
    pub active: i64,
    pub expired: i64,
    pub upcoming: i64,
}
