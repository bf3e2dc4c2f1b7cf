//! API types for the Legacy Radio SDK

use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// How a subscription is paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Card payment (Stripe)
    Card,
    /// Wallet payment (PayPal)
    Wallet,
}

/// A signed-in account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub created_at: i64,
}

/// Response from register and login
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// A server that can be subscribed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Access to one server until `expires_at` (Unix seconds)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub server_id: String,
    pub expires_at: i64,
    pub paid: bool,
    pub via_coupon: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub term_months: u32,
}

/// Subscription joined with its server's name
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionWithServer {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub server_name: String,
}

/// A discount code
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscountCode {
    pub id: String,
    pub code: String,
    pub server_id: String,
    pub expires_at: i64,
    /// None = unlimited
    pub max_uses: Option<i64>,
    pub current_uses: i64,
    pub created_by: String,
    pub created_at: i64,
}

/// Discount code joined with its server's name
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountCodeWithServer {
    #[serde(flatten)]
    pub discount_code: DiscountCode,
    pub server_name: String,
}

/// One redemption of a discount code
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountCodeUsage {
    pub id: String,
    pub discount_code_id: String,
    pub user_id: String,
    pub subscription_id: String,
    pub used_at: i64,
    pub user_email: String,
    pub username: String,
}

/// Result of checking a discount code
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountValidation {
    pub valid: bool,
    pub server: Server,
    pub discount_code: DiscountCode,
}

/// Price breakdown for a plan
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Quote {
    pub months: u32,
    pub monthly_cents: i64,
    pub discount_percent: i64,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    pub currency: String,
}

/// Provider-side payment created for a plan
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentResponse {
    pub id: String,
    pub client_secret: String,
    pub amount_cents: i64,
    pub currency: String,
    pub quote: Quote,
}

/// Purchase request for `subscribe`
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest {
    pub server_id: String,
    /// Months: 1, 3, 6, or 12
    pub duration: u32,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    /// Provider id of the completed payment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

/// Request for a payment intent
#[derive(Debug, Clone, Serialize)]
pub struct CreateIntentRequest {
    pub server_id: String,
    pub duration: u32,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
}

/// Admin: new server
#[derive(Debug, Clone, Serialize)]
pub struct CreateServerRequest {
    pub name: String,
    pub description: String,
}

/// Admin: server edits; unset fields are left unchanged
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateServerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Admin: new discount code
#[derive(Debug, Clone, Serialize)]
pub struct CreateDiscountCodeRequest {
    pub code: String,
    pub server_id: String,
    /// Unix seconds
    pub expires_at: i64,
    pub max_uses: Option<i64>,
}

/// Error body returned by the API
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}
