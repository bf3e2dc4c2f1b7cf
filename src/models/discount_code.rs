use serde::{Deserialize, Serialize};

use crate::util::deserialize_timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: String,
    /// Always uppercase alphanumeric
    pub code: String,
    pub server_id: String,
    pub expires_at: i64,
    /// None = unlimited
    pub max_uses: Option<i64>,
    pub current_uses: i64,
    pub created_by: String,
    pub created_at: i64,
}

impl DiscountCode {
    /// Strict comparison: a code whose expiry equals `now` is already expired.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.max_uses, Some(max) if self.current_uses >= max)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscountCodeWithServer {
    #[serde(flatten)]
    pub discount_code: DiscountCode,
    pub server_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDiscountCode {
    pub code: String,
    pub server_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub expires_at: i64,
    #[serde(default)]
    pub max_uses: Option<i64>,
}

/// One successful redemption. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCodeUsage {
    pub id: String,
    pub discount_code_id: String,
    pub user_id: String,
    pub subscription_id: String,
    pub used_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscountCodeUsageWithUser {
    #[serde(flatten)]
    pub usage: DiscountCodeUsage,
    pub user_email: String,
    pub username: String,
}
