use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Hosted image URL, set when an image was uploaded with the category.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Slim projection for the storefront category picker.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CategoryName {
    pub name: String,
    pub image: Option<String>,
}
