//! Discount code rules: normalization, read-only validation, and creation.
//!
//! Redemption itself happens inside the purchase transaction
//! (see [`crate::purchase`]) so that the usage counter and the subscription
//! commit or roll back together.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{
    CreateDiscountCode, DiscountCode, DiscountCodeUsageWithUser, DiscountCodeWithServer, Server,
};

/// A code that is currently redeemable, with the server it unlocks.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedDiscount {
    pub server: Server,
    pub discount_code: DiscountCode,
}

/// Trim and ASCII-uppercase. Non-ASCII characters are left untouched.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Look up a code and check it is redeemable at `now`. Never mutates anything.
pub fn validate(conn: &Connection, raw: &str, now: i64) -> Result<ValidatedDiscount> {
    let code = normalize_code(raw);
    if code.is_empty() {
        return Err(AppError::DiscountNotFound);
    }

    let discount_code =
        queries::get_discount_code_by_code(conn, &code)?.ok_or(AppError::DiscountNotFound)?;
    check_redeemable(&discount_code, now)?;

    let server = queries::get_server_by_id(conn, &discount_code.server_id)?
        .ok_or(AppError::ServerNotFound)?;

    Ok(ValidatedDiscount {
        server,
        discount_code,
    })
}

/// Expiry is checked before the usage cap.
pub fn check_redeemable(code: &DiscountCode, now: i64) -> Result<()> {
    if code.is_expired(now) {
        return Err(AppError::DiscountExpired);
    }
    if code.is_exhausted() {
        return Err(AppError::UsageExhausted);
    }
    Ok(())
}

pub fn create(
    conn: &Connection,
    input: &CreateDiscountCode,
    creator_id: &str,
    now: i64,
) -> Result<DiscountCode> {
    let raw = input.code.trim();
    if raw.is_empty() {
        return Err(AppError::InvalidFormat("Discount code is required".into()));
    }
    if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidFormat(
            "Discount code may only contain letters and numbers".into(),
        ));
    }
    let code = normalize_code(raw);
    if input.expires_at <= now {
        return Err(AppError::InvalidExpiry);
    }
    if matches!(input.max_uses, Some(max) if max <= 0) {
        return Err(AppError::InvalidMaxUses);
    }
    if queries::get_server_by_id(conn, &input.server_id)?.is_none() {
        return Err(AppError::ServerNotFound);
    }

    let normalized = CreateDiscountCode {
        code,
        server_id: input.server_id.clone(),
        expires_at: input.expires_at,
        max_uses: input.max_uses,
    };

    queries::create_discount_code(conn, &normalized, creator_id, now).map_err(|e| {
        if e.is_constraint_violation() {
            AppError::Conflict("Discount code already exists".into())
        } else {
            e
        }
    })
}

pub fn list_codes(conn: &Connection) -> Result<Vec<DiscountCodeWithServer>> {
    queries::list_discount_codes(conn)
}

pub fn list_usage(conn: &Connection, code_id: &str) -> Result<Vec<DiscountCodeUsageWithUser>> {
    if queries::get_discount_code_by_id(conn, code_id)?.is_none() {
        return Err(AppError::NotFound("Discount code not found".into()));
    }
    queries::list_discount_usage(conn, code_id)
}
