//! Session tokens: HS256 JWTs carrying the user id (`sub`) and role.

use std::time::Duration as StdDuration;

use jwt_simple::prelude::{Claims, Duration, HS256Key, MACLike, VerificationOptions};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Role, User};

/// Clock skew tolerated when checking `exp`/`nbf`.
const TIME_TOLERANCE_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub role: Role,
}

/// A token that passed signature and expiry checks.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub user_id: String,
    pub role: Role,
    pub expires_at: i64,
}

pub struct TokenIssuer {
    key: HS256Key,
    lifetime: StdDuration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], lifetime: StdDuration) -> Self {
        Self {
            key: HS256Key::from_bytes(secret),
            lifetime,
        }
    }

    pub fn from_days(secret: &str, days: u64) -> Self {
        Self::new(secret.as_bytes(), StdDuration::from_secs(days * 24 * 60 * 60))
    }

    pub fn lifetime(&self) -> StdDuration {
        self.lifetime
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let claims = Claims::with_custom_claims(
            SessionClaims { role: user.role },
            Duration::from_secs(self.lifetime.as_secs()),
        )
        .with_subject(&user.id);

        self.key
            .authenticate(claims)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Check signature and expiry. Any failure is reported as Unauthorized.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let options = VerificationOptions {
            time_tolerance: Some(Duration::from_secs(TIME_TOLERANCE_SECS)),
            ..Default::default()
        };

        let claims = self
            .key
            .verify_token::<SessionClaims>(token, Some(options))
            .map_err(|e| {
                tracing::debug!("Rejected session token: {}", e);
                AppError::Unauthorized("Invalid or expired token".into())
            })?;

        let user_id = claims
            .subject
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))?;
        let expires_at = claims
            .expires_at
            .map(|e| e.as_secs() as i64)
            .unwrap_or_default();

        Ok(VerifiedToken {
            user_id,
            role: claims.custom.role,
            expires_at,
        })
    }
}
