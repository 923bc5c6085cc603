use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use super::{DiscountError, OrderContext, Quote};
use crate::errors::AppError;
use crate::log_info;
use crate::models::discount::{Discount, DiscountType};
use crate::models::order::Order;
use crate::validation::normalize_code;

/// Stateless over requests; every operation is a lookup plus pure checks,
/// with usage mutation pushed down to a conditional update in the store.
#[derive(Clone)]
pub struct DiscountEngine {
    db: SqlitePool,
}

/// Successful `validate` outcome: the discount, the computed amounts, and
/// the validity block the storefront displays.
#[derive(Debug, Serialize)]
pub struct Validation {
    pub discount: Discount,
    pub calculation: Calculation,
    pub validity: Validity,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculation {
    pub original_amount: f64,
    pub discount_amount: f64,
    pub final_amount: f64,
    /// The nominal rate, only for percentage discounts.
    pub discount_percentage: Option<f64>,
    /// Actual savings relative to the order amount, 2 decimals.
    pub savings_percentage: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validity {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub used_count: i64,
    pub max_usage: Option<i64>,
}

/// Successful `apply` outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub discount_id: i64,
    pub discount_code: String,
    pub original_amount: f64,
    pub discount_amount: f64,
    pub final_amount: f64,
    pub applied_at: DateTime<Utc>,
}

impl DiscountEngine {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Case-insensitive lookup; codes are stored upper-cased.
    pub async fn find_by_code(&self, code: &str) -> Result<Discount, AppError> {
        let normalized = normalize_code(code);
        sqlx::query_as::<_, Discount>("SELECT * FROM discounts WHERE code = ?")
            .bind(&normalized)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::Discount(DiscountError::InvalidCode))
    }

    /// Full validation against an order context. Read-only: never touches
    /// `used_count`.
    pub async fn validate(&self, code: &str, ctx: &OrderContext) -> Result<Validation, AppError> {
        let discount = self.find_by_code(code).await?;
        check_full(&discount, ctx, Utc::now())?;

        let quote = compute(&discount, ctx.order_amount);
        Ok(build_validation(discount, ctx.order_amount, quote))
    }

    /// Validate and consume one usage. Re-runs the core checks (active,
    /// window, usage cap, minimum amount); product/category applicability
    /// is not re-checked on this path. The increment is a conditional
    /// update, so concurrent callers can never push `used_count` past
    /// `max_usage` — the race loser gets `UsageLimitReached`.
    pub async fn apply(&self, code: &str, order_amount: f64) -> Result<Application, AppError> {
        let discount = self.find_by_code(code).await?;
        check_core(&discount, order_amount, Utc::now())?;

        let quote = compute(&discount, order_amount);

        let updated = sqlx::query(
            "UPDATE discounts
             SET used_count = used_count + 1, updated_at = ?
             WHERE id = ? AND (max_usage IS NULL OR used_count < max_usage)",
        )
        .bind(Utc::now())
        .bind(discount.id)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Discount(DiscountError::UsageLimitReached));
        }

        log_info!(
            "DISCOUNT",
            "code applied",
            serde_json::json!({
                "code": discount.code,
                "order_amount": order_amount,
                "discount_amount": quote.discount_amount
            })
        );

        Ok(Application {
            discount_id: discount.id,
            discount_code: discount.code,
            original_amount: order_amount,
            discount_amount: quote.discount_amount,
            final_amount: quote.final_amount,
            applied_at: Utc::now(),
        })
    }

    /// Apply a code to an existing order: writes the denormalized snapshot
    /// onto the order and consumes one usage, both inside one transaction
    /// so a failed increment rolls the order write back. Uses the shorter
    /// order-path check set (active, window, usage cap).
    pub async fn apply_to_order(
        &self,
        order_id: &str,
        code: &str,
        original_amount: f64,
    ) -> Result<(Order, Discount, Quote), AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        let discount = self.find_by_code(code).await?;
        check_redeemable(&discount, Utc::now())?;

        let quote = compute(&discount, original_amount);
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE orders
             SET discount_coupon = ?, discount_amount = ?,
                 original_amount = ?, final_amount = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&discount.code)
        .bind(quote.discount_amount)
        .bind(original_amount)
        .bind(quote.final_amount)
        .bind(now)
        .bind(&order.id)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query(
            "UPDATE discounts
             SET used_count = used_count + 1, updated_at = ?
             WHERE id = ? AND (max_usage IS NULL OR used_count < max_usage)",
        )
        .bind(now)
        .bind(discount.id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::Discount(DiscountError::UsageLimitReached));
        }

        tx.commit().await?;

        let updated_order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_one(&self.db)
            .await?;

        Ok((updated_order, discount, quote))
    }
}

/// Checks shared by every path: manual switch, validity window, usage cap.
/// Order matters: the first failing check is the one reported.
pub fn check_redeemable(discount: &Discount, now: DateTime<Utc>) -> Result<(), DiscountError> {
    if !discount.is_active {
        return Err(DiscountError::Inactive);
    }
    if discount.start_date > now {
        return Err(DiscountError::NotYetActive);
    }
    if discount.end_date < now {
        return Err(DiscountError::Expired);
    }
    if let Some(max_usage) = discount.max_usage {
        if discount.used_count >= max_usage {
            return Err(DiscountError::UsageLimitReached);
        }
    }
    Ok(())
}

/// Redeemable plus the minimum-order-amount floor.
pub fn check_core(
    discount: &Discount,
    order_amount: f64,
    now: DateTime<Utc>,
) -> Result<(), DiscountError> {
    check_redeemable(discount, now)?;
    if discount.min_order_amount > 0.0 && order_amount < discount.min_order_amount {
        return Err(DiscountError::BelowMinimumAmount(discount.min_order_amount));
    }
    Ok(())
}

/// Core plus product/category applicability scoping. The
/// `is_first_time_only` flag is deliberately not checked here: there is no
/// order-history lookup behind it yet, and inventing one silently would
/// change redemption behavior for existing data.
pub fn check_full(
    discount: &Discount,
    ctx: &OrderContext,
    now: DateTime<Utc>,
) -> Result<(), DiscountError> {
    check_core(discount, ctx.order_amount, now)?;

    if !discount.applicable_products.is_empty()
        && !ctx
            .product_ids
            .iter()
            .any(|id| discount.applicable_products.contains(id))
    {
        return Err(DiscountError::NotApplicableToProducts);
    }

    if !discount.applicable_categories.is_empty()
        && !ctx
            .category_ids
            .iter()
            .any(|c| discount.applicable_categories.contains(c))
    {
        return Err(DiscountError::NotApplicableToCategories);
    }

    Ok(())
}

/// Percentage: `amount * value / 100`, clamped to `max_discount` when set.
/// Fixed: the value as-is — deliberately not clamped to the order amount,
/// so the final amount can go negative (preserved legacy behavior).
pub fn compute(discount: &Discount, order_amount: f64) -> Quote {
    let discount_amount = match discount.r#type {
        DiscountType::Percentage => {
            let raw = order_amount * discount.value / 100.0;
            match discount.max_discount {
                Some(cap) if raw > cap => cap,
                _ => raw,
            }
        }
        DiscountType::Fixed => discount.value,
    };

    Quote {
        discount_amount,
        final_amount: order_amount - discount_amount,
    }
}

/// Savings relative to the order amount, rounded to 2 decimals; 0 for a
/// zero order amount.
pub fn savings_percentage(discount_amount: f64, order_amount: f64) -> f64 {
    if order_amount <= 0.0 {
        return 0.0;
    }
    (discount_amount / order_amount * 100.0 * 100.0).round() / 100.0
}

fn build_validation(discount: Discount, order_amount: f64, quote: Quote) -> Validation {
    let calculation = Calculation {
        original_amount: order_amount,
        discount_amount: quote.discount_amount,
        final_amount: quote.final_amount,
        discount_percentage: match discount.r#type {
            DiscountType::Percentage => Some(discount.value),
            DiscountType::Fixed => None,
        },
        savings_percentage: savings_percentage(quote.discount_amount, order_amount),
    };
    let validity = Validity {
        start_date: discount.start_date,
        end_date: discount.end_date,
        is_active: discount.is_active,
        used_count: discount.used_count,
        max_usage: discount.max_usage,
    };
    Validation {
        discount,
        calculation,
        validity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sqlx::types::Json;

    fn sample_discount() -> Discount {
        let now = Utc::now();
        Discount {
            id: 1,
            code: "WELCOME20".to_string(),
            name: "Welcome".to_string(),
            description: None,
            r#type: DiscountType::Percentage,
            value: 20.0,
            max_discount: None,
            min_order_amount: 0.0,
            max_usage: None,
            used_count: 0,
            applicable_products: Json(vec![]),
            applicable_categories: Json(vec![]),
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            is_active: true,
            is_first_time_only: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_percentage_clamped_to_max_discount() {
        let mut d = sample_discount();
        d.max_discount = Some(10.0);
        let q = compute(&d, 100.0);
        assert_eq!(q.discount_amount, 10.0);
        assert_eq!(q.final_amount, 90.0);
    }

    #[test]
    fn test_fixed_is_not_clamped_to_order_amount() {
        let mut d = sample_discount();
        d.r#type = DiscountType::Fixed;
        d.value = 15.0;
        let q = compute(&d, 10.0);
        assert_eq!(q.discount_amount, 15.0);
        assert_eq!(q.final_amount, -5.0);
    }

    #[test]
    fn test_welcome20_on_200() {
        let mut d = sample_discount();
        d.min_order_amount = 50.0;
        d.max_usage = Some(100);
        assert!(check_core(&d, 200.0, Utc::now()).is_ok());
        let q = compute(&d, 200.0);
        assert_eq!(q.discount_amount, 40.0);
        assert_eq!(q.final_amount, 160.0);
    }

    #[test]
    fn test_savings_percentage_guards_zero_amount() {
        assert_eq!(savings_percentage(10.0, 0.0), 0.0);
        assert_eq!(savings_percentage(12.5, 200.0), 6.25);
        assert_eq!(savings_percentage(1.0, 3.0), 33.33);
    }

    #[test]
    fn test_window_errors_by_failing_bound() {
        let now = Utc::now();
        let mut d = sample_discount();
        d.start_date = now + Duration::days(1);
        d.end_date = now + Duration::days(2);
        assert_eq!(check_redeemable(&d, now), Err(DiscountError::NotYetActive));

        d.start_date = now - Duration::days(2);
        d.end_date = now - Duration::days(1);
        assert_eq!(check_redeemable(&d, now), Err(DiscountError::Expired));
    }

    #[test]
    fn test_window_takes_precedence_over_usage_cap() {
        let now = Utc::now();
        let mut d = sample_discount();
        d.max_usage = Some(1);
        d.used_count = 1;
        d.end_date = now - Duration::hours(1);
        assert_eq!(check_redeemable(&d, now), Err(DiscountError::Expired));
    }

    #[test]
    fn test_inactive_wins_over_everything() {
        let now = Utc::now();
        let mut d = sample_discount();
        d.is_active = false;
        d.start_date = now + Duration::days(1);
        assert_eq!(check_redeemable(&d, now), Err(DiscountError::Inactive));
    }

    #[test]
    fn test_usage_cap_gates_use() {
        let now = Utc::now();
        let mut d = sample_discount();
        d.max_usage = Some(3);
        d.used_count = 3;
        assert_eq!(
            check_redeemable(&d, now),
            Err(DiscountError::UsageLimitReached)
        );
        d.used_count = 2;
        assert!(check_redeemable(&d, now).is_ok());
    }

    #[test]
    fn test_minimum_amount_surfaces_threshold() {
        let now = Utc::now();
        let mut d = sample_discount();
        d.min_order_amount = 50.0;
        let err = check_core(&d, 49.99, now).unwrap_err();
        assert_eq!(err, DiscountError::BelowMinimumAmount(50.0));
        assert!(err.to_string().contains("50"));
        assert!(check_core(&d, 50.0, now).is_ok());
    }

    #[test]
    fn test_product_scoping() {
        let now = Utc::now();
        let mut d = sample_discount();
        d.applicable_products = Json(vec![7, 8]);

        let mut ctx = OrderContext {
            order_amount: 100.0,
            product_ids: vec![1, 2],
            ..Default::default()
        };
        assert_eq!(
            check_full(&d, &ctx, now),
            Err(DiscountError::NotApplicableToProducts)
        );

        ctx.product_ids.push(8);
        assert!(check_full(&d, &ctx, now).is_ok());
    }

    #[test]
    fn test_category_scoping() {
        let now = Utc::now();
        let mut d = sample_discount();
        d.applicable_categories = Json(vec!["shoes".to_string()]);

        let ctx = OrderContext {
            order_amount: 100.0,
            category_ids: vec!["hats".to_string()],
            ..Default::default()
        };
        assert_eq!(
            check_full(&d, &ctx, now),
            Err(DiscountError::NotApplicableToCategories)
        );

        let ctx = OrderContext {
            order_amount: 100.0,
            category_ids: vec!["shoes".to_string()],
            ..Default::default()
        };
        assert!(check_full(&d, &ctx, now).is_ok());
    }

    #[test]
    fn test_first_time_only_is_not_enforced() {
        let now = Utc::now();
        let mut d = sample_discount();
        d.is_first_time_only = true;
        let ctx = OrderContext {
            order_amount: 100.0,
            user_id: Some(42),
            ..Default::default()
        };
        assert!(check_full(&d, &ctx, now).is_ok());
    }
}
