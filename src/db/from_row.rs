//! Row mapping for the query layer.
//!
//! Each `*_COLS` constant lists columns in the exact order the matching
//! `FromRow` impl reads them.

use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, Params, Row, types::Type};

use crate::error::Result;
use crate::models::*;
use crate::payments::PaymentMethod;

pub const USER_COLS: &str = "id, email, username, password_hash, role, created_at";

pub const SERVER_COLS: &str = "id, name, description, created_at, updated_at";

pub const SUBSCRIPTION_COLS: &str =
    "id, user_id, server_id, expires_at, paid, via_coupon, created_at, updated_at, term_months";

pub const DISCOUNT_CODE_COLS: &str =
    "id, code, server_id, expires_at, max_uses, current_uses, created_by, created_at";

pub const DISCOUNT_USAGE_COLS: &str = "id, discount_code_id, user_id, subscription_id, used_at";

pub const PAYMENT_RECEIPT_COLS: &str =
    "id, payment_method, reference, user_id, subscription_id, amount_cents, currency, created_at";

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Parse a TEXT column into a strum-backed enum.
fn parse_enum<T: FromStr>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected enum value '{}'", raw).into(),
        )
    })
}

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            password_hash: row.get(3)?,
            role: parse_enum(row, 4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for Server {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Server {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl FromRow for Subscription {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Subscription {
            id: row.get(0)?,
            user_id: row.get(1)?,
            server_id: row.get(2)?,
            expires_at: row.get(3)?,
            paid: row.get::<_, i32>(4)? != 0,
            via_coupon: row.get::<_, i32>(5)? != 0,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            term_months: row.get(8)?,
        })
    }
}

impl FromRow for DiscountCode {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(DiscountCode {
            id: row.get(0)?,
            code: row.get(1)?,
            server_id: row.get(2)?,
            expires_at: row.get(3)?,
            max_uses: row.get(4)?,
            current_uses: row.get(5)?,
            created_by: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl FromRow for DiscountCodeUsage {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(DiscountCodeUsage {
            id: row.get(0)?,
            discount_code_id: row.get(1)?,
            user_id: row.get(2)?,
            subscription_id: row.get(3)?,
            used_at: row.get(4)?,
        })
    }
}

impl FromRow for PaymentReceipt {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(PaymentReceipt {
            id: row.get(0)?,
            payment_method: parse_enum::<PaymentMethod>(row, 1)?,
            reference: row.get(2)?,
            user_id: row.get(3)?,
            subscription_id: row.get(4)?,
            amount_cents: row.get(5)?,
            currency: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

pub fn query_one<T: FromRow>(conn: &Connection, sql: &str, params: impl Params) -> Result<Option<T>> {
    Ok(conn.query_row(sql, params, |row| T::from_row(row)).optional()?)
}

pub fn query_all<T: FromRow>(conn: &Connection, sql: &str, params: impl Params) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| T::from_row(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Prefix every column in a `*_COLS` list with a table alias ("id, code" -> "d.id, d.code").
pub fn aliased(cols: &str, alias: &str) -> String {
    cols.split(", ")
        .map(|c| format!("{}.{}", alias, c))
        .collect::<Vec<_>>()
        .join(", ")
}
