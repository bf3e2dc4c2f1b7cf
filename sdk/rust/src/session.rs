//! Client-side session state

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;

use crate::error::{LegacyRadioError, Result};
use crate::storage::{StorageAdapter, keys};
use crate::types::{Role, User};

/// A signed-in session: token plus the user it was issued to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    /// Role of the signed-in user
    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Whether the signed-in user is an admin
    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }

    /// Whether the token's `exp` is at or before `now` (Unix seconds).
    /// A token whose expiry cannot be read counts as expired.
    pub fn is_expired(&self, now: i64) -> bool {
        token_expiry(&self.token).is_none_or(|exp| exp <= now)
    }

    /// Load a stored session. Returns None if either half is missing or corrupt.
    pub(crate) fn load(storage: &dyn StorageAdapter) -> Option<Self> {
        let token = storage.get(keys::TOKEN)?;
        let user = serde_json::from_str(&storage.get(keys::USER)?).ok()?;
        Some(Self { token, user })
    }

    pub(crate) fn save(&self, storage: &dyn StorageAdapter) -> Result<()> {
        let user = serde_json::to_string(&self.user)
            .map_err(|e| LegacyRadioError::storage(format!("Failed to encode user: {}", e)))?;
        storage.set(keys::TOKEN, &self.token)?;
        storage.set(keys::USER, &user)
    }

    /// Remove both halves; the token is removed even if the user entry fails.
    pub(crate) fn clear(storage: &dyn StorageAdapter) -> Result<()> {
        let token = storage.remove(keys::TOKEN);
        let user = storage.remove(keys::USER);
        token.and(user)
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Read `exp` from a JWT payload without verifying the signature.
/// Only the server can verify; this just avoids a round trip for stale tokens.
pub fn token_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<ExpiryClaim>(&bytes).ok()?.exp
}

pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
