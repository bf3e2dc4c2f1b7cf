//! Shared utility functions for the Legacy Radio backend.

use axum::http::HeaderMap;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, de};

pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Add calendar months to a Unix timestamp.
///
/// Month-end dates clamp to the last day of the target month
/// (Jan 31 + 1 month = Feb 28/29). Returns None on overflow.
pub fn add_months(timestamp: i64, months: u32) -> Option<i64> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)?
        .checked_add_months(Months::new(months))
        .map(|dt| dt.timestamp())
}

/// Extract a Bearer token from the Authorization header.
///
/// Returns None if the header is missing, not a Bearer credential, or
/// empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Deserialize a timestamp given as Unix seconds, an RFC 3339 string, or a
/// plain `YYYY-MM-DD` date (interpreted as midnight UTC).
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(ts) => Ok(ts),
        Raw::Text(s) => parse_timestamp(&s).ok_or_else(|| {
            de::Error::custom(format!(
                "invalid timestamp '{}': expected Unix seconds, RFC 3339, or YYYY-MM-DD",
                s
            ))
        }),
    }
}

fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(ts) = s.parse::<i64>() {
        return Some(ts);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}
