//! Response envelope shared by every endpoint: `{success, message?, data?}`.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Pagination block returned by list endpoints. Field names match the
/// admin UI contract.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            current_page: page,
            total_pages,
            total_items: total,
            items_per_page: per_page,
        }
    }
}

/// A list payload together with its pagination block.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::<()>::failure("nope")).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "nope");
        assert!(body.get("data").is_none());
    }

    #[test]
    fn test_pagination_rounds_up() {
        let p = Pagination::new(1, 10, 25);
        assert_eq!(p.total_pages, 3);
        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
