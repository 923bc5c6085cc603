use sqlx::SqlitePool;

/// Run all migrations (CREATE TABLE IF NOT EXISTS + additive ALTERs).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // ═══════════════════════════════════════
    // TABLE: users
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id         INTEGER  PRIMARY KEY AUTOINCREMENT,
            name       TEXT     NOT NULL,
            email      TEXT     NOT NULL UNIQUE,
            is_active  INTEGER  NOT NULL DEFAULT 1,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: categories
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS categories (
            id         INTEGER  PRIMARY KEY AUTOINCREMENT,
            name       TEXT     NOT NULL UNIQUE,
            image      TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: products
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS products (
            id          INTEGER  PRIMARY KEY AUTOINCREMENT,
            name        TEXT     NOT NULL,
            category    TEXT     NOT NULL DEFAULT '[]',
            description TEXT     NOT NULL,
            price       REAL     NOT NULL CHECK(price >= 0),
            sale_price  REAL,
            stock       INTEGER  NOT NULL DEFAULT 0 CHECK(stock >= 0),
            images      TEXT     NOT NULL DEFAULT '[]',
            colors      TEXT     NOT NULL DEFAULT '[]',
            sizes       TEXT     NOT NULL DEFAULT '[]',
            created_at  DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at  DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_name ON products(name)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: discounts
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS discounts (
            id                    INTEGER  PRIMARY KEY AUTOINCREMENT,
            code                  TEXT     NOT NULL UNIQUE,
            name                  TEXT     NOT NULL,
            description           TEXT,
            type                  TEXT     NOT NULL CHECK(type IN ('percentage', 'fixed')),
            value                 REAL     NOT NULL CHECK(value > 0),
            max_discount          REAL,
            min_order_amount      REAL     NOT NULL DEFAULT 0,
            max_usage             INTEGER,
            used_count            INTEGER  NOT NULL DEFAULT 0,
            applicable_products   TEXT     NOT NULL DEFAULT '[]',
            applicable_categories TEXT     NOT NULL DEFAULT '[]',
            start_date            DATETIME NOT NULL,
            end_date              DATETIME NOT NULL,
            is_active             INTEGER  NOT NULL DEFAULT 1,
            created_at            DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at            DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_discounts_active ON discounts(is_active)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_discounts_window ON discounts(start_date, end_date)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: orders
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id               TEXT     PRIMARY KEY,
            items            TEXT     NOT NULL,
            delivery_address TEXT     NOT NULL,
            delivery_option  TEXT     NOT NULL,
            payment_status   TEXT     NOT NULL DEFAULT 'pending'
                             CHECK(payment_status IN (
                                 'pending', 'completed', 'failed',
                                 'card_payment_pending', 'payment_pending',
                                 'mobile_money_pending')),
            order_status     TEXT     NOT NULL DEFAULT 'payment_in_progress'
                             CHECK(order_status IN (
                                 'payment_in_progress', 'order_accepted',
                                 'order_in_progress', 'order_completed',
                                 'order_cancelled', 'processed')),
            discount_coupon  TEXT,
            discount_amount  REAL     NOT NULL DEFAULT 0,
            original_amount  REAL     NOT NULL,
            final_amount     REAL     NOT NULL,
            user_id          INTEGER  REFERENCES users(id) ON DELETE SET NULL,
            created_at       DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at       DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(order_status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_created ON orders(created_at)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: banners
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS banners (
            id         INTEGER  PRIMARY KEY AUTOINCREMENT,
            title      TEXT     NOT NULL,
            image      TEXT     NOT NULL,
            link       TEXT,
            is_active  INTEGER  NOT NULL DEFAULT 1,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // MIGRATIONS: later columns (ALTER TABLE — safe for existing data)
    // ═══════════════════════════════════════

    // First-purchase flag; stored and surfaced, not enforced yet.
    safe_add_column(
        pool,
        "discounts",
        "is_first_time_only",
        "INTEGER NOT NULL DEFAULT 0",
    )
    .await;

    // Payment gateway reference on orders.
    safe_add_column(
        pool,
        "orders",
        "payment_reference_code",
        "TEXT NOT NULL DEFAULT 'PAY_DEFAULT'",
    )
    .await;

    Ok(())
}

/// ALTER TABLE ADD COLUMN that ignores "duplicate column" on re-run.
async fn safe_add_column(pool: &SqlitePool, table: &str, column: &str, col_type: &str) {
    let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, col_type);
    match sqlx::query(&sql).execute(pool).await {
        Ok(_) => {}
        Err(e) => {
            let msg = e.to_string();
            if !msg.contains("duplicate column") {
                eprintln!("Migration warning: {}", msg);
            }
        }
    }
}
