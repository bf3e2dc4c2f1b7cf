use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{
    PaymentGateway, PaymentIntent, PaymentOrder, PaymentStatus, format_amount, is_valid_reference,
};
use crate::config::PayPalMode;
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    intent: &'static str,
    purchase_units: Vec<PurchaseUnitRequest>,
}

#[derive(Debug, Serialize)]
struct PurchaseUnitRequest {
    reference_id: String,
    custom_id: String,
    description: String,
    amount: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
struct Amount {
    currency_code: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct Order {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    reference_id: Option<String>,
    custom_id: Option<String>,
    amount: Option<Amount>,
}

/// Wallet payments through PayPal Orders v2.
#[derive(Debug, Clone)]
pub struct PayPalClient {
    client: Client,
    client_id: String,
    client_secret: String,
    api_base: String,
}

impl PayPalClient {
    pub fn new(client_id: &str, client_secret: &str, mode: PayPalMode) -> Self {
        Self {
            client: Client::new(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            api_base: mode.api_base().to_string(),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.api_base))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("PayPal API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!("PayPal auth error: {}", error_text)));
        }

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse PayPal response: {}", e)))?;
        Ok(token.access_token)
    }

    async fn parse_order(response: reqwest::Response) -> Result<Order> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %error_text, "PayPal API error");
            return Err(AppError::Internal(format!("PayPal API error: {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse PayPal response: {}", e)))
    }

    async fn capture(&self, token: &str, order_id: &str) -> Result<Order> {
        let response = self
            .client
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.api_base, order_id
            ))
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("PayPal API error: {}", e)))?;
        Self::parse_order(response).await
    }
}

#[async_trait]
impl PaymentGateway for PayPalClient {
    async fn create_intent(&self, order: &PaymentOrder) -> Result<PaymentIntent> {
        let token = self.access_token().await?;

        let request = CreateOrderRequest {
            intent: "CAPTURE",
            purchase_units: vec![PurchaseUnitRequest {
                reference_id: order.server_id.clone(),
                custom_id: order.user_id.clone(),
                description: order.description.clone(),
                amount: Amount {
                    currency_code: order.currency.to_uppercase(),
                    value: format_amount(order.amount_cents),
                },
            }],
        };

        let response = self
            .client
            .post(format!("{}/v2/checkout/orders", self.api_base))
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("PayPal API error: {}", e)))?;
        let created = Self::parse_order(response).await?;

        // The PayPal JS buttons approve by order id
        Ok(PaymentIntent {
            client_secret: created.id.clone(),
            id: created.id,
        })
    }

    async fn confirm_payment(
        &self,
        order: &PaymentOrder,
        reference: Option<&str>,
    ) -> Result<PaymentStatus> {
        let Some(order_id) = reference else {
            return Ok(PaymentStatus::Failed {
                reason: "Missing PayPal order".into(),
            });
        };
        if !is_valid_reference(order_id) {
            return Ok(PaymentStatus::Failed {
                reason: "Invalid PayPal order".into(),
            });
        }

        let token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{}/v2/checkout/orders/{}", self.api_base, order_id))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("PayPal API error: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(PaymentStatus::Failed {
                reason: "Unknown PayPal order".into(),
            });
        }

        let mut paypal_order = Self::parse_order(response).await?;
        if paypal_order.status == "APPROVED" && order_matches(&paypal_order, order) {
            paypal_order = self.capture(&token, order_id).await?;
        }

        Ok(order_status(&paypal_order, order))
    }
}

fn order_matches(paypal_order: &Order, order: &PaymentOrder) -> bool {
    let Some(unit) = paypal_order.purchase_units.first() else {
        return false;
    };
    let amount_matches = unit.amount.as_ref().is_some_and(|a| {
        a.value == format_amount(order.amount_cents)
            && a.currency_code.eq_ignore_ascii_case(&order.currency)
    });
    unit.reference_id.as_deref() == Some(order.server_id.as_str())
        && unit.custom_id.as_deref() == Some(order.user_id.as_str())
        && amount_matches
}

fn order_status(paypal_order: &Order, order: &PaymentOrder) -> PaymentStatus {
    if !order_matches(paypal_order, order) {
        return PaymentStatus::Failed {
            reason: "Payment does not match this purchase".into(),
        };
    }

    match paypal_order.status.as_str() {
        "COMPLETED" => PaymentStatus::Succeeded {
            reference: paypal_order.id.clone(),
        },
        "CREATED" | "SAVED" | "APPROVED" | "PAYER_ACTION_REQUIRED" => PaymentStatus::Pending {
            reference: paypal_order.id.clone(),
        },
        _ => PaymentStatus::Failed {
            reason: "PayPal order was voided".into(),
        },
    }
}
