use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    CardPaymentPending,
    PaymentPending,
    MobileMoneyPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderStatus {
    PaymentInProgress,
    OrderAccepted,
    OrderInProgress,
    OrderCompleted,
    OrderCancelled,
    Processed,
}

/// Order line items arrive from several storefront clients and are loosely
/// typed on purpose; unknown fields are preserved nowhere, amounts are
/// recomputed defensively from `price`/`total` and `quantity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

pub fn amount_from_items(items: &[OrderItem]) -> f64 {
    items
        .iter()
        .map(|item| {
            let price = item.price.or(item.total).unwrap_or(0.0);
            let quantity = item.quantity.unwrap_or(1) as f64;
            price * quantity
        })
        .sum()
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: String,
    pub items: Json<Vec<OrderItem>>,
    pub delivery_address: Json<serde_json::Value>,
    pub delivery_option: String,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub payment_reference_code: String,
    /// Snapshot of the coupon code at apply time, not a reference; editing
    /// or deleting the discount later leaves past orders untouched.
    pub discount_coupon: Option<String>,
    pub discount_amount: f64,
    pub original_amount: f64,
    pub final_amount: f64,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin list view: `is_new` marks orders created in the last 24 hours.
#[derive(Debug, Serialize)]
pub struct OrderWithNewFlag {
    #[serde(flatten)]
    pub order: Order,
    pub is_new: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderPayload {
    pub items: Vec<OrderItem>,
    pub delivery_address: serde_json::Value,
    pub delivery_option: String,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub discount_coupon: Option<String>,
    #[serde(default)]
    pub discount_amount: Option<f64>,
    #[serde(default)]
    pub original_amount: Option<f64>,
    #[serde(default)]
    pub final_amount: Option<f64>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusPayload {
    pub status: OrderStatus,
}

/// `POST /orders/apply-discount` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyDiscountToOrderPayload {
    pub order_id: String,
    pub discount_code: String,
    pub original_amount: f64,
}

/// Snapshot view returned by `GET /orders/:id/discount`.
#[derive(Debug, Serialize)]
pub struct DiscountAppliedView {
    pub coupon: String,
    pub amount: f64,
    /// Percentage saved relative to the original amount, 2 decimals.
    pub savings: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_from_items_uses_price_or_total() {
        let items = vec![
            OrderItem {
                product_id: Some(1),
                title: None,
                price: Some(10.0),
                total: None,
                quantity: Some(2),
                size: None,
                color: None,
            },
            OrderItem {
                product_id: None,
                title: None,
                price: None,
                total: Some(5.5),
                quantity: None,
                size: None,
                color: None,
            },
        ];
        assert_eq!(amount_from_items(&items), 25.5);
    }

    #[test]
    fn test_status_wire_format() {
        let s = serde_json::to_string(&OrderStatus::PaymentInProgress).unwrap();
        assert_eq!(s, "\"payment_in_progress\"");
        let p: PaymentStatus = serde_json::from_str("\"mobile_money_pending\"").unwrap();
        assert_eq!(p, PaymentStatus::MobileMoneyPending);
    }
}
