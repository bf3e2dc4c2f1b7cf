use rusqlite::Connection;

/// Create tables and indexes if they don't exist.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS servers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            server_id TEXT NOT NULL REFERENCES servers(id),
            expires_at INTEGER NOT NULL,
            paid INTEGER NOT NULL DEFAULT 0,
            via_coupon INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            term_months INTEGER NOT NULL CHECK (term_months > 0)
        );
        CREATE INDEX IF NOT EXISTS idx_subscriptions_user_server
            ON subscriptions(user_id, server_id, expires_at);

        CREATE TABLE IF NOT EXISTS discount_codes (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            server_id TEXT NOT NULL REFERENCES servers(id),
            expires_at INTEGER NOT NULL,
            max_uses INTEGER CHECK (max_uses IS NULL OR max_uses > 0),
            current_uses INTEGER NOT NULL DEFAULT 0,
            created_by TEXT NOT NULL REFERENCES users(id),
            created_at INTEGER NOT NULL,
            CHECK (max_uses IS NULL OR current_uses <= max_uses)
        );

        CREATE TABLE IF NOT EXISTS discount_code_usage (
            id TEXT PRIMARY KEY,
            discount_code_id TEXT NOT NULL REFERENCES discount_codes(id),
            user_id TEXT NOT NULL REFERENCES users(id),
            subscription_id TEXT NOT NULL REFERENCES subscriptions(id),
            used_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_discount_code_usage_code
            ON discount_code_usage(discount_code_id);

        CREATE TABLE IF NOT EXISTS payment_receipts (
            id TEXT PRIMARY KEY,
            payment_method TEXT NOT NULL,
            reference TEXT NOT NULL,
            user_id TEXT NOT NULL REFERENCES users(id),
            subscription_id TEXT NOT NULL REFERENCES subscriptions(id),
            amount_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (payment_method, reference)
        );
        "#,
    )
}
