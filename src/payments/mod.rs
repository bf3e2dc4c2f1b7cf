mod paypal;
mod sandbox;
mod stripe;

pub use paypal::*;
pub use sandbox::*;
pub use stripe::*;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::config::Config;
use crate::error::{AppError, Result};

/// How the customer pays. `stripe`/`paypal` are accepted as aliases on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentMethod {
    #[serde(alias = "stripe")]
    Card,
    #[serde(alias = "paypal")]
    Wallet,
}

/// What is being paid for. Amounts are in the currency's minor unit.
#[derive(Debug, Clone)]
pub struct PaymentOrder {
    pub user_id: String,
    pub server_id: String,
    pub duration_months: u32,
    pub amount_cents: i64,
    pub currency: String,
    pub description: String,
}

/// Handle the client uses to complete payment with the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Succeeded { reference: String },
    /// Provider has not settled yet; it may still complete asynchronously.
    Pending { reference: String },
    Failed { reason: String },
}

/// A payment provider as seen by the purchase flow.
///
/// `confirm_payment` returning `Err` means the provider could not be asked
/// (network, unexpected response); callers must not treat that as a failed
/// payment.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, order: &PaymentOrder) -> Result<PaymentIntent>;

    async fn confirm_payment(
        &self,
        order: &PaymentOrder,
        reference: Option<&str>,
    ) -> Result<PaymentStatus>;
}

/// Configured gateways, one per payment method.
#[derive(Clone, Default)]
pub struct Payments {
    card: Option<Arc<dyn PaymentGateway>>,
    wallet: Option<Arc<dyn PaymentGateway>>,
}

impl Payments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_card(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.card = Some(gateway);
        self
    }

    pub fn with_wallet(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.wallet = Some(gateway);
        self
    }

    /// Build gateways from provider credentials. In dev mode, methods without
    /// credentials fall back to the auto-approving sandbox.
    pub fn from_config(config: &Config) -> Self {
        let mut payments = Self::new();

        if let Some(ref key) = config.stripe_secret_key {
            payments = payments.with_card(Arc::new(StripeClient::new(key)));
        } else if config.dev_mode {
            payments = payments.with_card(Arc::new(SandboxGateway::new(PaymentMethod::Card)));
        }

        match (&config.paypal_client_id, &config.paypal_client_secret) {
            (Some(id), Some(secret)) => {
                payments = payments.with_wallet(Arc::new(PayPalClient::new(
                    id,
                    secret,
                    config.paypal_mode,
                )));
            }
            _ if config.dev_mode => {
                payments =
                    payments.with_wallet(Arc::new(SandboxGateway::new(PaymentMethod::Wallet)));
            }
            _ => {}
        }

        payments
    }

    pub fn gateway(&self, method: PaymentMethod) -> Result<Arc<dyn PaymentGateway>> {
        let gateway = match method {
            PaymentMethod::Card => self.card.clone(),
            PaymentMethod::Wallet => self.wallet.clone(),
        };
        gateway.ok_or_else(|| match method {
            PaymentMethod::Card => AppError::BadRequest("Card payments are not available".into()),
            PaymentMethod::Wallet => {
                AppError::BadRequest("PayPal payments are not available".into())
            }
        })
    }
}

/// Provider ids are `[A-Za-z0-9_-]+`; anything else never reaches a provider URL.
pub(crate) fn is_valid_reference(reference: &str) -> bool {
    !reference.is_empty()
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Format minor units as a decimal string ("1999" -> "19.99").
pub(crate) fn format_amount(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_accepts_provider_aliases() {
        let card: PaymentMethod = serde_json::from_str("\"stripe\"").unwrap();
        let wallet: PaymentMethod = serde_json::from_str("\"paypal\"").unwrap();
        assert_eq!(card, PaymentMethod::Card);
        assert_eq!(wallet, PaymentMethod::Wallet);
        assert_eq!(serde_json::to_string(&card).unwrap(), "\"card\"");
        assert_eq!(PaymentMethod::Wallet.as_ref(), "wallet");
    }

    #[test]
    fn formats_minor_units() {
        assert_eq!(format_amount(1999), "19.99");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(20388), "203.88");
    }

    #[test]
    fn references_are_restricted_to_id_characters() {
        assert!(is_valid_reference("pi_3PqXyz-01"));
        assert!(is_valid_reference("5O190127TN364715T"));
        assert!(!is_valid_reference(""));
        assert!(!is_valid_reference("pi_1/cancel"));
        assert!(!is_valid_reference("../refunds"));
        assert!(!is_valid_reference("pi_1?expand=x"));
    }

    #[test]
    fn missing_gateway_is_a_bad_request() {
        let payments = Payments::new();
        let err = payments.gateway(PaymentMethod::Wallet).err().unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
