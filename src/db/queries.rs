use rusqlite::{Connection, params, types::Value};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::payments::PaymentMethod;
use crate::util::now;

use super::from_row::{
    DISCOUNT_CODE_COLS, DISCOUNT_USAGE_COLS, PAYMENT_RECEIPT_COLS, SERVER_COLS,
    SUBSCRIPTION_COLS, USER_COLS, aliased, query_all, query_one,
};

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Normalize an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Returns whether a row matched. With no fields set, only checks existence.
    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            let exists: bool = conn.query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", self.table),
                params![self.id],
                |row| row.get(0),
            )?;
            return Ok(exists);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Users ============

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let id = gen_id();
    let now = now();
    let email = normalize_email(&input.email);

    conn.execute(
        "INSERT INTO users (id, email, username, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &id,
            &email,
            &input.username,
            &input.password_hash,
            input.role.as_ref(),
            now
        ],
    )?;

    Ok(User {
        id,
        email,
        username: input.username.clone(),
        password_hash: input.password_hash.clone(),
        role: input.role,
        created_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        params![id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        params![normalize_email(email)],
    )
}

/// Set a user's role by email. Returns false if no such user exists.
pub fn set_user_role(conn: &Connection, email: &str, role: Role) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET role = ?1 WHERE email = ?2",
        params![role.as_ref(), normalize_email(email)],
    )?;
    Ok(affected > 0)
}

// ============ Servers ============

pub fn create_server(conn: &Connection, input: &CreateServer) -> Result<Server> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO servers (id, name, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, &input.name, &input.description, now, now],
    )?;

    Ok(Server {
        id,
        name: input.name.clone(),
        description: input.description.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_server_by_id(conn: &Connection, id: &str) -> Result<Option<Server>> {
    query_one(
        conn,
        &format!("SELECT {} FROM servers WHERE id = ?1", SERVER_COLS),
        params![id],
    )
}

pub fn list_servers(conn: &Connection) -> Result<Vec<Server>> {
    query_all(
        conn,
        &format!("SELECT {} FROM servers ORDER BY created_at, name", SERVER_COLS),
        [],
    )
}

/// Update name/description. Returns false if the server does not exist.
pub fn update_server(conn: &Connection, id: &str, input: &UpdateServer) -> Result<bool> {
    UpdateBuilder::new("servers", id)
        .with_updated_at()
        .set_opt("name", input.name.clone())
        .set_opt("description", input.description.clone())
        .execute(conn)
}

// ============ Subscriptions ============

pub fn get_subscription_by_id(conn: &Connection, id: &str) -> Result<Option<Subscription>> {
    query_one(
        conn,
        &format!("SELECT {} FROM subscriptions WHERE id = ?1", SUBSCRIPTION_COLS),
        params![id],
    )
}

/// The latest-expiring subscription for (user, server) that is still active at `now`.
pub fn find_active_subscription(
    conn: &Connection,
    user_id: &str,
    server_id: &str,
    now: i64,
) -> Result<Option<Subscription>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM subscriptions
             WHERE user_id = ?1 AND server_id = ?2 AND expires_at > ?3
             ORDER BY expires_at DESC LIMIT 1",
            SUBSCRIPTION_COLS
        ),
        params![user_id, server_id, now],
    )
}

pub fn list_subscriptions_for_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<SubscriptionWithServer>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, s.name
         FROM subscriptions sub
         JOIN servers s ON s.id = sub.server_id
         WHERE sub.user_id = ?1
         ORDER BY sub.expires_at DESC",
        aliased(SUBSCRIPTION_COLS, "sub")
    ))?;

    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(SubscriptionWithServer {
                subscription: Subscription {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    server_id: row.get(2)?,
                    expires_at: row.get(3)?,
                    paid: row.get::<_, i32>(4)? != 0,
                    via_coupon: row.get::<_, i32>(5)? != 0,
                    created_at: row.get(6)?,
                    updated_at: row.get(7)?,
                    term_months: row.get(8)?,
                },
                server_name: row.get(9)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn insert_subscription(
    conn: &Connection,
    user_id: &str,
    server_id: &str,
    expires_at: i64,
    term_months: u32,
    via_coupon: bool,
    now: i64,
) -> Result<Subscription> {
    let id = gen_id();

    conn.execute(
        "INSERT INTO subscriptions (id, user_id, server_id, expires_at, paid, via_coupon, created_at, updated_at, term_months)
         VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7, ?8)",
        params![&id, user_id, server_id, expires_at, via_coupon as i32, now, now, term_months],
    )?;

    Ok(Subscription {
        id,
        user_id: user_id.to_string(),
        server_id: server_id.to_string(),
        expires_at,
        paid: true,
        via_coupon,
        created_at: now,
        updated_at: now,
        term_months,
    })
}

/// Move a subscription's expiry and record its new total term.
/// `via_coupon` is OR-ed into the existing flag.
pub fn extend_subscription(
    conn: &Connection,
    id: &str,
    new_expires_at: i64,
    term_months: u32,
    via_coupon: bool,
    now: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE subscriptions
         SET expires_at = ?1, term_months = ?2, via_coupon = MAX(via_coupon, ?3), paid = 1,
             updated_at = ?4
         WHERE id = ?5",
        params![new_expires_at, term_months, via_coupon as i32, now, id],
    )?;
    Ok(())
}

// ============ Discount Codes ============

/// Insert a discount code. `input.code` must already be normalized.
/// A duplicate code fails with a constraint violation from the UNIQUE index.
pub fn create_discount_code(
    conn: &Connection,
    input: &CreateDiscountCode,
    created_by: &str,
    now: i64,
) -> Result<DiscountCode> {
    let id = gen_id();

    conn.execute(
        "INSERT INTO discount_codes (id, code, server_id, expires_at, max_uses, current_uses, created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
        params![
            &id,
            &input.code,
            &input.server_id,
            input.expires_at,
            input.max_uses,
            created_by,
            now
        ],
    )?;

    Ok(DiscountCode {
        id,
        code: input.code.clone(),
        server_id: input.server_id.clone(),
        expires_at: input.expires_at,
        max_uses: input.max_uses,
        current_uses: 0,
        created_by: created_by.to_string(),
        created_at: now,
    })
}

pub fn get_discount_code_by_id(conn: &Connection, id: &str) -> Result<Option<DiscountCode>> {
    query_one(
        conn,
        &format!("SELECT {} FROM discount_codes WHERE id = ?1", DISCOUNT_CODE_COLS),
        params![id],
    )
}

/// Exact match on an already-normalized code.
pub fn get_discount_code_by_code(conn: &Connection, code: &str) -> Result<Option<DiscountCode>> {
    query_one(
        conn,
        &format!("SELECT {} FROM discount_codes WHERE code = ?1", DISCOUNT_CODE_COLS),
        params![code],
    )
}

pub fn list_discount_codes(conn: &Connection) -> Result<Vec<DiscountCodeWithServer>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, s.name
         FROM discount_codes d
         JOIN servers s ON s.id = d.server_id
         ORDER BY d.created_at DESC",
        aliased(DISCOUNT_CODE_COLS, "d")
    ))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(DiscountCodeWithServer {
                discount_code: DiscountCode {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    server_id: row.get(2)?,
                    expires_at: row.get(3)?,
                    max_uses: row.get(4)?,
                    current_uses: row.get(5)?,
                    created_by: row.get(6)?,
                    created_at: row.get(7)?,
                },
                server_name: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Atomically consume one use of a discount code.
///
/// Single conditional UPDATE: increments only while the code is unexpired and
/// below its cap, so concurrent redemptions can never push `current_uses`
/// past `max_uses`.
///
/// Returns:
/// - `Ok(true)` if a use was consumed
/// - `Ok(false)` if the code is expired, exhausted, or missing
pub fn try_redeem_discount_code(conn: &Connection, id: &str, now: i64) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE discount_codes
         SET current_uses = current_uses + 1
         WHERE id = ?1
           AND expires_at > ?2
           AND (max_uses IS NULL OR current_uses < max_uses)",
        params![id, now],
    )?;
    Ok(affected > 0)
}

pub fn record_discount_usage(
    conn: &Connection,
    discount_code_id: &str,
    user_id: &str,
    subscription_id: &str,
    now: i64,
) -> Result<DiscountCodeUsage> {
    let id = gen_id();

    conn.execute(
        "INSERT INTO discount_code_usage (id, discount_code_id, user_id, subscription_id, used_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, discount_code_id, user_id, subscription_id, now],
    )?;

    Ok(DiscountCodeUsage {
        id,
        discount_code_id: discount_code_id.to_string(),
        user_id: user_id.to_string(),
        subscription_id: subscription_id.to_string(),
        used_at: now,
    })
}

pub fn list_discount_usage(
    conn: &Connection,
    discount_code_id: &str,
) -> Result<Vec<DiscountCodeUsageWithUser>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, usr.email, usr.username
         FROM discount_code_usage du
         JOIN users usr ON usr.id = du.user_id
         WHERE du.discount_code_id = ?1
         ORDER BY du.used_at DESC",
        aliased(DISCOUNT_USAGE_COLS, "du")
    ))?;

    let rows = stmt
        .query_map(params![discount_code_id], |row| {
            Ok(DiscountCodeUsageWithUser {
                usage: DiscountCodeUsage {
                    id: row.get(0)?,
                    discount_code_id: row.get(1)?,
                    user_id: row.get(2)?,
                    subscription_id: row.get(3)?,
                    used_at: row.get(4)?,
                },
                user_email: row.get(5)?,
                username: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn count_discount_usage(conn: &Connection, discount_code_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM discount_code_usage WHERE discount_code_id = ?1",
        params![discount_code_id],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

// ============ Payment Receipts ============

/// Atomically record that a provider payment was applied, returning None if
/// this (method, reference) pair was already recorded.
///
/// Uses INSERT OR IGNORE against the UNIQUE (payment_method, reference) index
/// so one confirmed payment can never fund two purchases.
#[allow(clippy::too_many_arguments)]
pub fn try_record_payment_receipt(
    conn: &Connection,
    payment_method: PaymentMethod,
    reference: &str,
    user_id: &str,
    subscription_id: &str,
    amount_cents: i64,
    currency: &str,
    now: i64,
) -> Result<Option<PaymentReceipt>> {
    let id = gen_id();
    let affected = conn.execute(
        "INSERT OR IGNORE INTO payment_receipts
         (id, payment_method, reference, user_id, subscription_id, amount_cents, currency, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            &id,
            payment_method.as_ref(),
            reference,
            user_id,
            subscription_id,
            amount_cents,
            currency,
            now
        ],
    )?;

    if affected == 0 {
        return Ok(None);
    }

    Ok(Some(PaymentReceipt {
        id,
        payment_method,
        reference: reference.to_string(),
        user_id: user_id.to_string(),
        subscription_id: subscription_id.to_string(),
        amount_cents,
        currency: currency.to_string(),
        created_at: now,
    }))
}

pub fn get_payment_receipt(
    conn: &Connection,
    payment_method: PaymentMethod,
    reference: &str,
) -> Result<Option<PaymentReceipt>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM payment_receipts WHERE payment_method = ?1 AND reference = ?2",
            PAYMENT_RECEIPT_COLS
        ),
        params![payment_method.as_ref(), reference],
    )
}
