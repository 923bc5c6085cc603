use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Banner {
    pub id: i64,
    pub title: String,
    pub image: String,
    pub link: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
