use async_trait::async_trait;
use uuid::Uuid;

use super::{PaymentGateway, PaymentIntent, PaymentMethod, PaymentOrder, PaymentStatus};
use crate::error::Result;

/// Auto-approving gateway for local development (APP_ENV=dev only).
#[derive(Debug, Clone)]
pub struct SandboxGateway {
    method: PaymentMethod,
}

impl SandboxGateway {
    pub fn new(method: PaymentMethod) -> Self {
        Self { method }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_intent(&self, order: &PaymentOrder) -> Result<PaymentIntent> {
        let id = format!("sandbox_{}_{}", self.method.as_ref(), Uuid::new_v4().simple());
        tracing::info!(
            intent = %id,
            amount_cents = order.amount_cents,
            "DEV: Created sandbox payment intent"
        );
        Ok(PaymentIntent {
            client_secret: format!("{}_secret", id),
            id,
        })
    }

    async fn confirm_payment(
        &self,
        order: &PaymentOrder,
        reference: Option<&str>,
    ) -> Result<PaymentStatus> {
        let reference = reference.map(String::from).unwrap_or_else(|| {
            format!("sandbox_{}_{}", self.method.as_ref(), Uuid::new_v4().simple())
        });
        tracing::warn!(
            reference = %reference,
            amount_cents = order.amount_cents,
            "DEV: Sandbox payment auto-approved"
        );
        Ok(PaymentStatus::Succeeded { reference })
    }
}
