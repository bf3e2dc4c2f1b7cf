use std::env;
use std::time::Duration;

const DEV_JWT_SECRET: &str = "legacy-radio-dev-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayPalMode {
    Sandbox,
    Live,
}

impl PayPalMode {
    pub fn api_base(&self) -> &'static str {
        match self {
            PayPalMode::Sandbox => "https://api-m.sandbox.paypal.com",
            PayPalMode::Live => "https://api-m.paypal.com",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub dev_mode: bool,
    pub jwt_secret: Option<String>,
    /// Session token lifetime in days
    pub jwt_lifetime_days: u64,
    pub stripe_secret_key: Option<String>,
    pub paypal_client_id: Option<String>,
    pub paypal_client_secret: Option<String>,
    pub paypal_mode: PayPalMode,
    pub cors_origins: Vec<String>,
    /// Upper bound on a single payment-provider confirmation call
    pub payment_timeout_secs: u64,
    pub base_monthly_price_cents: i64,
    pub currency: String,
    /// Registering with this email grants the admin role
    pub bootstrap_admin_email: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("APP_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(4000);

        let paypal_mode = match env::var("PAYPAL_MODE").as_deref() {
            Ok("live") => PayPalMode::Live,
            _ => PayPalMode::Sandbox,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| vec!["http://localhost:5173".to_string()]);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "legacy_radio.db".to_string()),
            dev_mode,
            jwt_secret: non_empty_var("JWT_SECRET"),
            jwt_lifetime_days: env::var("JWT_LIFETIME_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
            stripe_secret_key: non_empty_var("STRIPE_SECRET_KEY"),
            paypal_client_id: non_empty_var("PAYPAL_CLIENT_ID"),
            paypal_client_secret: non_empty_var("PAYPAL_CLIENT_SECRET"),
            paypal_mode,
            cors_origins,
            payment_timeout_secs: env::var("PAYMENT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            base_monthly_price_cents: env::var("BASE_MONTHLY_PRICE_CENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1999),
            currency: env::var("CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|_| "usd".to_string()),
            bootstrap_admin_email: non_empty_var("BOOTSTRAP_ADMIN_EMAIL")
                .map(|e| e.trim().to_lowercase()),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }

    /// Token signing secret. Outside dev mode a secret must be configured.
    pub fn signing_secret(&self) -> anyhow::Result<String> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => Ok(secret.clone()),
            (None, true) => Ok(DEV_JWT_SECRET.to_string()),
            (None, false) => anyhow::bail!("JWT_SECRET must be set outside dev mode"),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.signing_secret()?;
        if self.base_monthly_price_cents <= 0 {
            anyhow::bail!("BASE_MONTHLY_PRICE_CENTS must be positive");
        }
        if self.jwt_lifetime_days == 0 {
            anyhow::bail!("JWT_LIFETIME_DAYS must be at least 1");
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
