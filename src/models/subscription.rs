use serde::{Deserialize, Serialize};

use crate::payments::PaymentMethod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub server_id: String,
    pub expires_at: i64,
    pub paid: bool,
    /// Whether a discount code was redeemed for this grant (or any extension of it)
    pub via_coupon: bool,
    pub created_at: i64,
    pub updated_at: i64,
    /// Months granted so far, counted from `created_at`
    pub term_months: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionWithServer {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub server_name: String,
}

/// Record of a confirmed provider payment that has been turned into a subscription.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub id: String,
    pub payment_method: PaymentMethod,
    pub reference: String,
    pub user_id: String,
    pub subscription_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub created_at: i64,
}
