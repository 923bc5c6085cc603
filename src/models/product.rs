use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Category labels, not foreign keys; a product can sit in several.
    pub category: Json<Vec<String>>,
    pub description: String,
    pub price: f64,
    pub sale_price: Option<f64>,
    pub stock: i64,
    /// Hosted image URLs returned by the image host.
    pub images: Json<Vec<String>>,
    pub colors: Json<Vec<String>>,
    pub sizes: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
