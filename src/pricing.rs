//! Subscription plans and price quotes.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Purchasable subscription lengths. Serialized as the month count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SubscriptionDuration {
    OneMonth,
    ThreeMonths,
    SixMonths,
    TwelveMonths,
}

impl SubscriptionDuration {
    pub const ALL: [SubscriptionDuration; 4] = [
        SubscriptionDuration::OneMonth,
        SubscriptionDuration::ThreeMonths,
        SubscriptionDuration::SixMonths,
        SubscriptionDuration::TwelveMonths,
    ];

    pub fn months(&self) -> u32 {
        match self {
            SubscriptionDuration::OneMonth => 1,
            SubscriptionDuration::ThreeMonths => 3,
            SubscriptionDuration::SixMonths => 6,
            SubscriptionDuration::TwelveMonths => 12,
        }
    }

    /// Percent off the undiscounted total for committing to a longer plan.
    pub fn discount_percent(&self) -> i64 {
        match self {
            SubscriptionDuration::OneMonth => 0,
            SubscriptionDuration::ThreeMonths => 5,
            SubscriptionDuration::SixMonths => 10,
            SubscriptionDuration::TwelveMonths => 15,
        }
    }
}

impl TryFrom<u32> for SubscriptionDuration {
    type Error = AppError;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        match months {
            1 => Ok(SubscriptionDuration::OneMonth),
            3 => Ok(SubscriptionDuration::ThreeMonths),
            6 => Ok(SubscriptionDuration::SixMonths),
            12 => Ok(SubscriptionDuration::TwelveMonths),
            other => Err(AppError::BadRequest(format!(
                "Invalid duration {}: must be 1, 3, 6, or 12 months",
                other
            ))),
        }
    }
}

impl From<SubscriptionDuration> for u32 {
    fn from(duration: SubscriptionDuration) -> Self {
        duration.months()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub months: u32,
    pub monthly_cents: i64,
    pub discount_percent: i64,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct PriceList {
    pub monthly_cents: i64,
    pub currency: String,
}

impl Default for PriceList {
    fn default() -> Self {
        Self {
            monthly_cents: 1999,
            currency: "usd".to_string(),
        }
    }
}

impl PriceList {
    pub fn new(monthly_cents: i64, currency: impl Into<String>) -> Self {
        Self {
            monthly_cents,
            currency: currency.into(),
        }
    }

    pub fn quote(&self, duration: SubscriptionDuration) -> Quote {
        let months = duration.months();
        let pct = duration.discount_percent();
        let subtotal = self.monthly_cents * months as i64;
        // Round half up in integer arithmetic
        let total = (subtotal * (100 - pct) + 50) / 100;

        Quote {
            months,
            monthly_cents: self.monthly_cents,
            discount_percent: pct,
            subtotal_cents: subtotal,
            total_cents: total,
            currency: self.currency.clone(),
        }
    }
}
