//! Centralized input validation for admin payloads.
//!
//! Each validator returns the user-facing message on failure; handlers wrap
//! it into `AppError::Validation`.

use chrono::{DateTime, Utc};

use crate::models::discount::DiscountType;

pub type ValidationResult = Result<(), String>;

/// Discount codes: 2-30 characters, alphanumeric plus hyphen/underscore.
/// Codes are stored upper-cased; `normalize_code` is the single place that
/// does the normalization.
pub fn validate_discount_code(code: &str) -> ValidationResult {
    let trimmed = code.trim();

    if trimmed.is_empty() {
        return Err("Discount code is required".into());
    }
    if trimmed.len() < 2 || trimmed.len() > 30 {
        return Err("Discount code must be 2-30 characters".into());
    }
    if !trimmed.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err("Discount code may only contain letters, numbers, - and _".into());
    }

    Ok(())
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Value bounds depend on the discount type: percentage in (0, 100],
/// fixed strictly positive.
pub fn validate_discount_value(r#type: DiscountType, value: f64) -> ValidationResult {
    if value.is_nan() || value.is_infinite() {
        return Err("Discount value is not a valid number".into());
    }
    match r#type {
        DiscountType::Percentage => {
            if value <= 0.0 || value > 100.0 {
                return Err("Percentage value must be between 1 and 100".into());
            }
        }
        DiscountType::Fixed => {
            if value <= 0.0 {
                return Err("Fixed discount value must be greater than 0".into());
            }
        }
    }
    Ok(())
}

pub fn validate_date_window(start: DateTime<Utc>, end: DateTime<Utc>) -> ValidationResult {
    if start >= end {
        return Err("End date must be after start date".into());
    }
    Ok(())
}

pub fn validate_min_order_amount(amount: f64) -> ValidationResult {
    if amount.is_nan() || amount.is_infinite() || amount < 0.0 {
        return Err("Minimum order amount must not be negative".into());
    }
    Ok(())
}

pub fn validate_max_usage(max_usage: i64) -> ValidationResult {
    if max_usage <= 0 {
        return Err("Usage limit must be greater than 0".into());
    }
    Ok(())
}

pub fn validate_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required".into());
    }
    if trimmed.len() > 200 {
        return Err("Name must be at most 200 characters".into());
    }
    Ok(())
}

pub fn validate_price(price: f64) -> ValidationResult {
    if price.is_nan() || price.is_infinite() || price < 0.0 {
        return Err("Price must not be negative".into());
    }
    Ok(())
}

pub fn validate_stock(stock: i64) -> ValidationResult {
    if stock < 0 {
        return Err("Stock must not be negative".into());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> ValidationResult {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err("Email is required".into());
    }
    if trimmed.len() > 254 {
        return Err("Email is too long (max 254 characters)".into());
    }
    let parts: Vec<&str> = trimmed.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err("Email format is not valid".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_code_rules() {
        assert!(validate_discount_code("SAVE10").is_ok());
        assert!(validate_discount_code("welcome-20").is_ok());
        assert!(validate_discount_code("").is_err());
        assert!(validate_discount_code("A").is_err());
        assert!(validate_discount_code("HAS SPACE").is_err());
    }

    #[test]
    fn test_normalize_code_uppercases() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
    }

    #[test]
    fn test_value_bounds_per_type() {
        assert!(validate_discount_value(DiscountType::Percentage, 100.0).is_ok());
        assert!(validate_discount_value(DiscountType::Percentage, 100.5).is_err());
        assert!(validate_discount_value(DiscountType::Percentage, 0.0).is_err());
        assert!(validate_discount_value(DiscountType::Fixed, 0.01).is_ok());
        assert!(validate_discount_value(DiscountType::Fixed, 0.0).is_err());
        assert!(validate_discount_value(DiscountType::Fixed, f64::NAN).is_err());
    }

    #[test]
    fn test_date_window_must_be_ordered() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        assert!(validate_date_window(start, end).is_ok());
        assert!(validate_date_window(end, start).is_err());
        assert!(validate_date_window(start, start).is_err());
    }
}
