//! End-to-end discount behavior against a real SQLite database.

use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::types::Json;
use sqlx::SqlitePool;

use shop_backoffice::database::migrations::run_migrations;
use shop_backoffice::discount::{DiscountEngine, DiscountError, OrderContext};
use shop_backoffice::errors::AppError;
use shop_backoffice::models::discount::Discount;

// In-memory SQLite gives each pooled connection its own database, so
// tests run against a throwaway file instead.
async fn test_pool() -> SqlitePool {
    let path = std::env::temp_dir().join(format!("shop-test-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to open test database");
    run_migrations(&pool).await.expect("migrations failed");
    pool
}

struct SeedDiscount {
    code: &'static str,
    r#type: &'static str,
    value: f64,
    max_discount: Option<f64>,
    min_order_amount: f64,
    max_usage: Option<i64>,
    start_offset_days: i64,
    end_offset_days: i64,
    is_active: bool,
}

impl Default for SeedDiscount {
    fn default() -> Self {
        Self {
            code: "SAVE10",
            r#type: "percentage",
            value: 10.0,
            max_discount: None,
            min_order_amount: 0.0,
            max_usage: None,
            start_offset_days: -1,
            end_offset_days: 1,
            is_active: true,
        }
    }
}

async fn insert_discount(pool: &SqlitePool, seed: SeedDiscount) -> i64 {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO discounts
            (code, name, description, type, value, max_discount, min_order_amount,
             max_usage, used_count, applicable_products, applicable_categories,
             start_date, end_date, is_active, is_first_time_only, created_at, updated_at)
         VALUES (?, ?, NULL, ?, ?, ?, ?, ?, 0, '[]', '[]', ?, ?, ?, 0, ?, ?)",
    )
    .bind(seed.code)
    .bind(format!("{} promo", seed.code))
    .bind(seed.r#type)
    .bind(seed.value)
    .bind(seed.max_discount)
    .bind(seed.min_order_amount)
    .bind(seed.max_usage)
    .bind(now + Duration::days(seed.start_offset_days))
    .bind(now + Duration::days(seed.end_offset_days))
    .bind(seed.is_active)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .expect("insert discount");
    result.last_insert_rowid()
}

async fn used_count(pool: &SqlitePool, id: i64) -> i64 {
    sqlx::query_scalar("SELECT used_count FROM discounts WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("read used_count")
}

fn ctx(amount: f64) -> OrderContext {
    OrderContext {
        order_amount: amount,
        ..Default::default()
    }
}

#[tokio::test]
async fn lookup_is_case_insensitive() {
    let pool = test_pool().await;
    insert_discount(&pool, SeedDiscount::default()).await;
    let engine = DiscountEngine::new(pool);

    let upper = engine.find_by_code("SAVE10").await.expect("upper lookup");
    let lower = engine.find_by_code("save10").await.expect("lower lookup");
    assert_eq!(upper.id, lower.id);
    assert_eq!(lower.code, "SAVE10");
}

#[tokio::test]
async fn unknown_code_is_reported_as_invalid() {
    let pool = test_pool().await;
    let engine = DiscountEngine::new(pool);

    let err = engine.find_by_code("NOPE").await.unwrap_err();
    match err {
        AppError::Discount(DiscountError::InvalidCode) => {}
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn welcome20_on_200_yields_40_off() {
    let pool = test_pool().await;
    insert_discount(
        &pool,
        SeedDiscount {
            code: "WELCOME20",
            value: 20.0,
            min_order_amount: 50.0,
            max_usage: Some(100),
            ..Default::default()
        },
    )
    .await;
    let engine = DiscountEngine::new(pool);

    let validation = engine.validate("WELCOME20", &ctx(200.0)).await.expect("valid");
    assert_eq!(validation.calculation.discount_amount, 40.0);
    assert_eq!(validation.calculation.final_amount, 160.0);
    assert_eq!(validation.calculation.savings_percentage, 20.0);

    let err = engine.validate("WELCOME20", &ctx(49.0)).await.unwrap_err();
    match err {
        AppError::Discount(DiscountError::BelowMinimumAmount(min)) => assert_eq!(min, 50.0),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn validate_never_mutates_used_count() {
    let pool = test_pool().await;
    let id = insert_discount(&pool, SeedDiscount::default()).await;
    let engine = DiscountEngine::new(pool.clone());

    for _ in 0..3 {
        engine.validate("SAVE10", &ctx(100.0)).await.expect("valid");
    }
    assert_eq!(used_count(&pool, id).await, 0);
}

#[tokio::test]
async fn apply_increments_used_count() {
    let pool = test_pool().await;
    let id = insert_discount(&pool, SeedDiscount::default()).await;
    let engine = DiscountEngine::new(pool.clone());

    let application = engine.apply("save10", 100.0).await.expect("apply");
    assert_eq!(application.discount_amount, 10.0);
    assert_eq!(application.final_amount, 90.0);
    assert_eq!(used_count(&pool, id).await, 1);
}

#[tokio::test]
async fn concurrent_applies_never_exceed_max_usage() {
    let pool = test_pool().await;
    let id = insert_discount(
        &pool,
        SeedDiscount {
            code: "ONCE",
            max_usage: Some(1),
            ..Default::default()
        },
    )
    .await;
    let engine = DiscountEngine::new(pool.clone());

    let mut handles = Vec::new();
    for _ in 0..5 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move { engine.apply("ONCE", 100.0).await }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.expect("task panicked").is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(used_count(&pool, id).await, 1);
}

#[tokio::test]
async fn exhausted_code_reports_usage_limit() {
    let pool = test_pool().await;
    insert_discount(
        &pool,
        SeedDiscount {
            code: "ONCE",
            max_usage: Some(1),
            ..Default::default()
        },
    )
    .await;
    let engine = DiscountEngine::new(pool);

    engine.apply("ONCE", 100.0).await.expect("first apply");
    let err = engine.apply("ONCE", 100.0).await.unwrap_err();
    match err {
        AppError::Discount(DiscountError::UsageLimitReached) => {}
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn window_and_active_flags_gate_validation() {
    let pool = test_pool().await;
    insert_discount(
        &pool,
        SeedDiscount {
            code: "SOON",
            start_offset_days: 1,
            end_offset_days: 2,
            ..Default::default()
        },
    )
    .await;
    insert_discount(
        &pool,
        SeedDiscount {
            code: "GONE",
            start_offset_days: -2,
            end_offset_days: -1,
            ..Default::default()
        },
    )
    .await;
    insert_discount(
        &pool,
        SeedDiscount {
            code: "OFF",
            is_active: false,
            ..Default::default()
        },
    )
    .await;
    let engine = DiscountEngine::new(pool);

    match engine.validate("SOON", &ctx(100.0)).await.unwrap_err() {
        AppError::Discount(DiscountError::NotYetActive) => {}
        other => panic!("unexpected error: {:?}", other),
    }
    match engine.validate("GONE", &ctx(100.0)).await.unwrap_err() {
        AppError::Discount(DiscountError::Expired) => {}
        other => panic!("unexpected error: {:?}", other),
    }
    match engine.validate("OFF", &ctx(100.0)).await.unwrap_err() {
        AppError::Discount(DiscountError::Inactive) => {}
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn fixed_discount_can_exceed_order_amount() {
    let pool = test_pool().await;
    insert_discount(
        &pool,
        SeedDiscount {
            code: "FLAT15",
            r#type: "fixed",
            value: 15.0,
            ..Default::default()
        },
    )
    .await;
    let engine = DiscountEngine::new(pool);

    let validation = engine.validate("FLAT15", &ctx(10.0)).await.expect("valid");
    assert_eq!(validation.calculation.discount_amount, 15.0);
    assert_eq!(validation.calculation.final_amount, -5.0);
}

#[tokio::test]
async fn applicability_scoping_checks_order_contents() {
    let pool = test_pool().await;
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO discounts
            (code, name, type, value, min_order_amount, used_count,
             applicable_products, applicable_categories,
             start_date, end_date, is_active, is_first_time_only, created_at, updated_at)
         VALUES ('SHOES', 'Shoes only', 'percentage', 10.0, 0, 0, '[]', ?, ?, ?, 1, 0, ?, ?)",
    )
    .bind(Json(vec!["shoes".to_string()]))
    .bind(now - Duration::days(1))
    .bind(now + Duration::days(1))
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .expect("insert scoped discount");
    let engine = DiscountEngine::new(pool);

    let mismatch = OrderContext {
        order_amount: 100.0,
        category_ids: vec!["hats".to_string()],
        ..Default::default()
    };
    match engine.validate("SHOES", &mismatch).await.unwrap_err() {
        AppError::Discount(DiscountError::NotApplicableToCategories) => {}
        other => panic!("unexpected error: {:?}", other),
    }

    let matching = OrderContext {
        order_amount: 100.0,
        category_ids: vec!["shoes".to_string()],
        ..Default::default()
    };
    engine.validate("SHOES", &matching).await.expect("valid");
}

#[tokio::test]
async fn apply_to_order_writes_snapshot_and_increments() {
    let pool = test_pool().await;
    let discount_id = insert_discount(
        &pool,
        SeedDiscount {
            code: "WELCOME20",
            value: 20.0,
            ..Default::default()
        },
    )
    .await;

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO orders
            (id, items, delivery_address, delivery_option, payment_status, order_status,
             payment_reference_code, discount_amount, original_amount, final_amount,
             created_at, updated_at)
         VALUES ('order-1', '[]', '{}', 'standard', 'pending', 'order_accepted',
                 'ref-1', 0, 200.0, 200.0, ?, ?)",
    )
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .expect("insert order");

    let engine = DiscountEngine::new(pool.clone());
    let (order, discount, quote) = engine
        .apply_to_order("order-1", "welcome20", 200.0)
        .await
        .expect("apply to order");

    assert_eq!(discount.code, "WELCOME20");
    assert_eq!(quote.discount_amount, 40.0);
    assert_eq!(order.discount_coupon.as_deref(), Some("WELCOME20"));
    assert_eq!(order.discount_amount, 40.0);
    assert_eq!(order.original_amount, 200.0);
    assert_eq!(order.final_amount, 160.0);
    assert_eq!(used_count(&pool, discount_id).await, 1);
}

#[tokio::test]
async fn apply_to_order_rejects_missing_order() {
    let pool = test_pool().await;
    insert_discount(&pool, SeedDiscount::default()).await;
    let engine = DiscountEngine::new(pool);

    let err = engine
        .apply_to_order("missing", "SAVE10", 100.0)
        .await
        .unwrap_err();
    match err {
        AppError::NotFound(msg) => assert_eq!(msg, "Order not found"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn duplicate_code_rejected_by_schema() {
    let pool = test_pool().await;
    insert_discount(&pool, SeedDiscount::default()).await;

    let now = Utc::now();
    let err = sqlx::query(
        "INSERT INTO discounts
            (code, name, type, value, min_order_amount, used_count,
             applicable_products, applicable_categories,
             start_date, end_date, is_active, is_first_time_only, created_at, updated_at)
         VALUES ('SAVE10', 'dup', 'percentage', 5.0, 0, 0, '[]', '[]', ?, ?, 1, 0, ?, ?)",
    )
    .bind(now - Duration::days(1))
    .bind(now + Duration::days(1))
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap_err();

    match err {
        sqlx::Error::Database(db) => assert!(db.is_unique_violation()),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn stored_discount_round_trips_through_model() {
    let pool = test_pool().await;
    let id = insert_discount(
        &pool,
        SeedDiscount {
            code: "CAP",
            max_discount: Some(10.0),
            ..Default::default()
        },
    )
    .await;

    let discount = sqlx::query_as::<_, Discount>("SELECT * FROM discounts WHERE id = ?")
        .bind(id)
        .fetch_one(&pool)
        .await
        .expect("fetch discount");
    assert_eq!(discount.code, "CAP");
    assert_eq!(discount.max_discount, Some(10.0));
    assert!(discount.applicable_products.is_empty());
}
