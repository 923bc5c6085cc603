//! Discount evaluation and application.
//!
//! Owns every business rule around coupon validity and applicability;
//! handlers stay thin over this module.

pub mod engine;

pub use engine::DiscountEngine;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Every way a code can fail to apply, each with its own user-facing
/// message. An unknown code is the only 404; the rest are client errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscountError {
    #[error("Invalid discount code")]
    InvalidCode,

    #[error("This discount code is currently inactive")]
    Inactive,

    #[error("This discount code is not yet active")]
    NotYetActive,

    #[error("This discount code has expired")]
    Expired,

    #[error("This discount code has reached its usage limit")]
    UsageLimitReached,

    #[error("Minimum order amount of ${0} required")]
    BelowMinimumAmount(f64),

    #[error("This discount is only applicable to specific products")]
    NotApplicableToProducts,

    #[error("This discount is only applicable to specific categories")]
    NotApplicableToCategories,
}

impl DiscountError {
    pub fn status(&self) -> StatusCode {
        match self {
            DiscountError::InvalidCode => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// What the engine knows about the order a code is being checked against.
#[derive(Debug, Clone, Default)]
pub struct OrderContext {
    pub order_amount: f64,
    pub user_id: Option<i64>,
    pub product_ids: Vec<i64>,
    pub category_ids: Vec<String>,
}

/// Computed amounts for a discount against an order amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub discount_amount: f64,
    pub final_amount: f64,
}
