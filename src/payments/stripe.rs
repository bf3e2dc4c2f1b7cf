use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;

use super::{PaymentGateway, PaymentIntent, PaymentOrder, PaymentStatus, is_valid_reference};
use crate::error::{AppError, Result};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    client_secret: Option<String>,
    status: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    metadata: StripeIntentMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct StripeIntentMetadata {
    user_id: Option<String>,
    server_id: Option<String>,
}

/// Card payments through Stripe PaymentIntents.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.to_string(),
            api_base: STRIPE_API_BASE.to_string(),
        }
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        form: Option<&[(&str, String)]>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.api_base, endpoint))
            .basic_auth(&self.secret_key, Option::<&str>::None);

        if let Some(form) = form {
            request = request.form(form);
        }

        request
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe API error: {}", e)))
    }

    async fn parse_intent(response: reqwest::Response) -> Result<StripePaymentIntent> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %error_text, "Stripe API error");
            return Err(AppError::Internal(format!("Stripe API error: {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Stripe response: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_intent(&self, order: &PaymentOrder) -> Result<PaymentIntent> {
        let form = [
            ("amount", order.amount_cents.to_string()),
            ("currency", order.currency.clone()),
            ("description", order.description.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[user_id]", order.user_id.clone()),
            ("metadata[server_id]", order.server_id.clone()),
            ("metadata[duration_months]", order.duration_months.to_string()),
        ];

        let response = self
            .request(Method::POST, "/payment_intents", Some(&form))
            .await?;
        let intent = Self::parse_intent(response).await?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| AppError::Internal("Stripe returned no client secret".into()))?;

        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }

    async fn confirm_payment(
        &self,
        order: &PaymentOrder,
        reference: Option<&str>,
    ) -> Result<PaymentStatus> {
        let Some(intent_id) = reference else {
            return Ok(PaymentStatus::Failed {
                reason: "Missing payment intent".into(),
            });
        };
        if !is_valid_reference(intent_id) {
            return Ok(PaymentStatus::Failed {
                reason: "Invalid payment intent".into(),
            });
        }

        let response = self
            .request(Method::GET, &format!("/payment_intents/{}", intent_id), None)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(PaymentStatus::Failed {
                reason: "Unknown payment intent".into(),
            });
        }

        let intent = Self::parse_intent(response).await?;
        Ok(intent_status(&intent, order))
    }
}

fn intent_status(intent: &StripePaymentIntent, order: &PaymentOrder) -> PaymentStatus {
    let belongs_to_order = intent.metadata.user_id.as_deref() == Some(order.user_id.as_str())
        && intent.metadata.server_id.as_deref() == Some(order.server_id.as_str());
    if !belongs_to_order {
        return PaymentStatus::Failed {
            reason: "Payment does not match this purchase".into(),
        };
    }

    match intent.status.as_str() {
        "succeeded" => {
            if intent.amount != order.amount_cents
                || !intent.currency.eq_ignore_ascii_case(&order.currency)
            {
                PaymentStatus::Failed {
                    reason: "Payment amount does not match the subscription price".into(),
                }
            } else {
                PaymentStatus::Succeeded {
                    reference: intent.id.clone(),
                }
            }
        }
        "processing" | "requires_capture" | "requires_action" | "requires_confirmation" => {
            PaymentStatus::Pending {
                reference: intent.id.clone(),
            }
        }
        "canceled" => PaymentStatus::Failed {
            reason: "Payment was canceled".into(),
        },
        _ => PaymentStatus::Failed {
            reason: "Payment was not completed".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> PaymentOrder {
        PaymentOrder {
            user_id: "u1".into(),
            server_id: "s1".into(),
            duration_months: 1,
            amount_cents: 1999,
            currency: "usd".into(),
            description: "Main Dispatch, 1 month".into(),
        }
    }

    fn intent(status: &str, amount: i64) -> StripePaymentIntent {
        StripePaymentIntent {
            id: "pi_1".into(),
            client_secret: None,
            status: status.into(),
            amount,
            currency: "usd".into(),
            metadata: StripeIntentMetadata {
                user_id: Some("u1".into()),
                server_id: Some("s1".into()),
            },
        }
    }

    #[test]
    fn succeeded_intent_with_matching_amount() {
        assert_eq!(
            intent_status(&intent("succeeded", 1999), &order()),
            PaymentStatus::Succeeded {
                reference: "pi_1".into()
            }
        );
    }

    #[test]
    fn amount_mismatch_fails() {
        assert!(matches!(
            intent_status(&intent("succeeded", 100), &order()),
            PaymentStatus::Failed { .. }
        ));
    }

    #[test]
    fn processing_is_pending() {
        assert!(matches!(
            intent_status(&intent("processing", 1999), &order()),
            PaymentStatus::Pending { .. }
        ));
    }

    #[tokio::test]
    async fn malformed_intent_id_is_rejected_before_any_request() {
        let client = StripeClient::new("sk_test_unused");
        let status = client
            .confirm_payment(&order(), Some("pi_1/cancel"))
            .await
            .unwrap();
        assert_eq!(
            status,
            PaymentStatus::Failed {
                reason: "Invalid payment intent".into()
            }
        );
    }

    #[test]
    fn intent_for_another_user_fails() {
        let mut other = intent("succeeded", 1999);
        other.metadata.user_id = Some("u2".into());
        assert!(matches!(
            intent_status(&other, &order()),
            PaymentStatus::Failed { .. }
        ));
    }
}
