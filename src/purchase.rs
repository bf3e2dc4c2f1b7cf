//! The subscription purchase flow.
//!
//! Validation and payment happen first, outside any transaction. Only a
//! confirmed payment reaches [`commit_purchase`], which redeems the discount
//! code, grants or extends the subscription, and records the payment receipt
//! in one IMMEDIATE transaction.

use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::discounts;
use crate::error::{AppError, Result};
use crate::models::{DiscountCode, Server, Subscription};
use crate::payments::{PaymentMethod, PaymentOrder, PaymentStatus};
use crate::pricing::{Quote, SubscriptionDuration};
use crate::util::{add_months, now};

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    pub server_id: String,
    pub duration: SubscriptionDuration,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub discount_code: Option<String>,
    /// Provider id of the payment to apply (Stripe PaymentIntent / PayPal order)
    #[serde(default)]
    pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntentRequest {
    pub server_id: String,
    pub duration: SubscriptionDuration,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntentResponse {
    pub id: String,
    pub client_secret: String,
    pub amount_cents: i64,
    pub currency: String,
    pub quote: Quote,
}

/// Everything the transactional step needs once payment is confirmed.
#[derive(Debug, Clone)]
pub struct CommitPurchase {
    pub user_id: String,
    pub server_id: String,
    pub months: u32,
    pub discount_code_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
    pub amount_cents: i64,
    pub currency: String,
}

/// Resolve the server and, if given, a redeemable code that targets it.
fn resolve_target(
    conn: &Connection,
    server_id: &str,
    discount_code: Option<&str>,
    now: i64,
) -> Result<(Server, Option<DiscountCode>)> {
    let server = queries::get_server_by_id(conn, server_id)?.ok_or(AppError::ServerNotFound)?;

    let code = match discount_code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => {
            let validated = discounts::validate(conn, raw, now)?;
            if validated.discount_code.server_id != server.id {
                return Err(AppError::ServerMismatch);
            }
            Some(validated.discount_code)
        }
        None => None,
    };

    Ok((server, code))
}

fn order_for(user_id: &str, server: &Server, quote: &Quote) -> PaymentOrder {
    let plural = if quote.months == 1 { "" } else { "s" };
    PaymentOrder {
        user_id: user_id.to_string(),
        server_id: server.id.clone(),
        duration_months: quote.months,
        amount_cents: quote.total_cents,
        currency: quote.currency.clone(),
        description: format!("{}, {} month{}", server.name, quote.months, plural),
    }
}

/// Create a provider-side payment for the quoted price of a plan.
pub async fn create_intent(
    state: &AppState,
    user_id: &str,
    req: &CreateIntentRequest,
) -> Result<IntentResponse> {
    let server = {
        let conn = state.db.get()?;
        resolve_target(&conn, &req.server_id, req.discount_code.as_deref(), now())?.0
    };

    let quote = state.prices.quote(req.duration);
    let order = order_for(user_id, &server, &quote);
    let gateway = state.payments.gateway(req.payment_method)?;
    let intent = gateway.create_intent(&order).await?;

    tracing::info!(
        user_id = %user_id,
        server_id = %server.id,
        intent = %intent.id,
        amount_cents = quote.total_cents,
        "Created payment intent"
    );

    Ok(IntentResponse {
        id: intent.id,
        client_secret: intent.client_secret,
        amount_cents: quote.total_cents,
        currency: quote.currency.clone(),
        quote,
    })
}

/// Validate, confirm payment, then persist the subscription.
pub async fn purchase(
    state: &AppState,
    user_id: &str,
    req: &PurchaseRequest,
) -> Result<Subscription> {
    let (server, code) = {
        let conn = state.db.get()?;
        resolve_target(&conn, &req.server_id, req.discount_code.as_deref(), now())?
    };

    let quote = state.prices.quote(req.duration);
    let order = order_for(user_id, &server, &quote);
    let gateway = state.payments.gateway(req.payment_method)?;

    let confirmation = tokio::time::timeout(
        state.payment_timeout,
        gateway.confirm_payment(&order, req.payment_reference.as_deref()),
    )
    .await;

    let reference = match confirmation {
        Ok(Ok(PaymentStatus::Succeeded { reference })) => reference,
        Ok(Ok(PaymentStatus::Pending { reference })) => {
            tracing::info!(payment_reference = %reference, "Payment not settled yet");
            return Err(AppError::PaymentPending(format!(
                "Payment {} is still processing. Your subscription will be activated once it completes.",
                reference
            )));
        }
        Ok(Ok(PaymentStatus::Failed { reason })) => {
            tracing::info!(user_id = %user_id, reason = %reason, "Payment failed");
            return Err(AppError::PaymentFailed(reason));
        }
        Ok(Err(e)) => {
            tracing::warn!(user_id = %user_id, error = %e, "Could not confirm payment");
            return Err(AppError::PaymentPending(
                "Payment status could not be confirmed yet. Please check again shortly.".into(),
            ));
        }
        Err(_) => {
            tracing::warn!(
                user_id = %user_id,
                timeout_secs = state.payment_timeout.as_secs(),
                "Payment confirmation timed out"
            );
            return Err(AppError::PaymentPending(
                "Payment confirmation timed out. Please check again shortly.".into(),
            ));
        }
    };

    let commit = CommitPurchase {
        user_id: user_id.to_string(),
        server_id: server.id.clone(),
        months: quote.months,
        discount_code_id: code.as_ref().map(|c| c.id.clone()),
        payment_method: req.payment_method,
        payment_reference: reference.clone(),
        amount_cents: quote.total_cents,
        currency: quote.currency.clone(),
    };

    let pool = state.db.clone();
    let committed = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        commit_purchase(&mut conn, &commit, now())
    })
    .await
    .unwrap_or_else(|e| Err(AppError::Internal(format!("Purchase task failed: {}", e))));

    match committed {
        Ok(subscription) => {
            tracing::info!(
                user_id = %user_id,
                server_id = %server.id,
                subscription_id = %subscription.id,
                expires_at = subscription.expires_at,
                via_coupon = subscription.via_coupon,
                payment_reference = %reference,
                "Subscription purchased"
            );
            Ok(subscription)
        }
        Err(
            e @ (AppError::UsageExhausted
            | AppError::DiscountExpired
            | AppError::DiscountNotFound
            | AppError::PaymentAlreadyApplied),
        ) => {
            tracing::warn!(
                user_id = %user_id,
                payment_reference = %reference,
                error = %e,
                "Purchase rejected after payment"
            );
            Err(e)
        }
        Err(e) => {
            tracing::error!(
                reconciliation = true,
                user_id = %user_id,
                server_id = %server.id,
                payment_reference = %reference,
                amount_cents = quote.total_cents,
                error = %e,
                "Payment captured but subscription could not be recorded"
            );
            Err(AppError::PersistenceAfterPaymentFailed {
                payment_reference: reference,
                reason: e.to_string(),
            })
        }
    }
}

/// Redeem the code, grant or extend the subscription, and record the receipt.
/// Nothing is written unless every step succeeds.
pub fn commit_purchase(
    conn: &mut Connection,
    commit: &CommitPurchase,
    now: i64,
) -> Result<Subscription> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let via_coupon = commit.discount_code_id.is_some();

    if let Some(code_id) = &commit.discount_code_id {
        if !queries::try_redeem_discount_code(&tx, code_id, now)? {
            let code = queries::get_discount_code_by_id(&tx, code_id)?
                .ok_or(AppError::DiscountNotFound)?;
            return Err(if code.is_expired(now) {
                AppError::DiscountExpired
            } else {
                AppError::UsageExhausted
            });
        }
    }

    let subscription =
        match queries::find_active_subscription(&tx, &commit.user_id, &commit.server_id, now)? {
            Some(active) => {
                // Recomputed from the start date so month-end clamping never accumulates
                let term_months = active.term_months + commit.months;
                let expires_at = add_months(active.created_at, term_months)
                    .ok_or_else(|| AppError::Internal("Subscription expiry out of range".into()))?;
                queries::extend_subscription(
                    &tx,
                    &active.id,
                    expires_at,
                    term_months,
                    via_coupon,
                    now,
                )?;
                queries::get_subscription_by_id(&tx, &active.id)?.ok_or_else(|| {
                    AppError::Internal("Subscription vanished during extension".into())
                })?
            }
            None => {
                let expires_at = add_months(now, commit.months)
                    .ok_or_else(|| AppError::Internal("Subscription expiry out of range".into()))?;
                queries::insert_subscription(
                    &tx,
                    &commit.user_id,
                    &commit.server_id,
                    expires_at,
                    commit.months,
                    via_coupon,
                    now,
                )?
            }
        };

    if let Some(code_id) = &commit.discount_code_id {
        queries::record_discount_usage(&tx, code_id, &commit.user_id, &subscription.id, now)?;
    }

    let receipt = queries::try_record_payment_receipt(
        &tx,
        commit.payment_method,
        &commit.payment_reference,
        &commit.user_id,
        &subscription.id,
        commit.amount_cents,
        &commit.currency,
        now,
    )?;
    if receipt.is_none() {
        return Err(AppError::PaymentAlreadyApplied);
    }

    tx.commit()?;
    Ok(subscription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::{CreateDiscountCode, CreateServer, CreateUser, Role};

    const NOW: i64 = 1_700_000_000;

    struct Fixture {
        conn: Connection,
        user_id: String,
        server_id: String,
    }

    fn fixture() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        init_db(&conn).unwrap();
        let user = queries::create_user(
            &conn,
            &CreateUser {
                email: "listener@example.com".into(),
                username: "listener".into(),
                password_hash: "x".into(),
                role: Role::User,
            },
        )
        .unwrap();
        let server = queries::create_server(
            &conn,
            &CreateServer {
                name: "Alpha".into(),
                description: String::new(),
            },
        )
        .unwrap();
        Fixture {
            conn,
            user_id: user.id,
            server_id: server.id,
        }
    }

    fn commit(f: &Fixture, months: u32, code_id: Option<&str>, reference: &str) -> CommitPurchase {
        CommitPurchase {
            user_id: f.user_id.clone(),
            server_id: f.server_id.clone(),
            months,
            discount_code_id: code_id.map(String::from),
            payment_method: PaymentMethod::Card,
            payment_reference: reference.into(),
            amount_cents: 1999,
            currency: "usd".into(),
        }
    }

    #[test]
    fn second_purchase_extends_instead_of_duplicating() {
        let mut f = fixture();
        let first = { let c = commit(&f, 1, None, "pi_1"); commit_purchase(&mut f.conn, &c, NOW) }.unwrap();
        let second = { let c = commit(&f, 3, None, "pi_2"); commit_purchase(&mut f.conn, &c, NOW + 60) }.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.expires_at, add_months(NOW, 4).unwrap());
        assert_eq!(second.term_months, 4);
        assert_eq!(queries::list_subscriptions_for_user(&f.conn, &f.user_id).unwrap().len(), 1);
    }

    #[test]
    fn extension_from_month_end_keeps_calendar_day() {
        use chrono::{TimeZone, Utc};

        let mut f = fixture();
        let jan_31 = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap().timestamp();
        let first = { let c = commit(&f, 1, None, "pi_1"); commit_purchase(&mut f.conn, &c, jan_31) }.unwrap();
        let feb_29 = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap().timestamp();
        assert_eq!(first.expires_at, feb_29);

        let second =
            { let c = commit(&f, 3, None, "pi_2"); commit_purchase(&mut f.conn, &c, jan_31 + 86_400) }.unwrap();
        let may_31 = Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap().timestamp();
        assert_eq!(second.id, first.id);
        assert_eq!(second.expires_at, may_31);
    }

    #[test]
    fn lapsed_subscription_is_not_extended() {
        let mut f = fixture();
        let first = { let c = commit(&f, 1, None, "pi_1"); commit_purchase(&mut f.conn, &c, NOW) }.unwrap();
        let later = first.expires_at + 10;
        let second = { let c = commit(&f, 1, None, "pi_2"); commit_purchase(&mut f.conn, &c, later) }.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(second.expires_at, add_months(later, 1).unwrap());
    }

    #[test]
    fn replayed_receipt_rolls_back_everything() {
        let mut f = fixture();
        let code = queries::create_discount_code(
            &f.conn,
            &CreateDiscountCode {
                code: "SAVE10".into(),
                server_id: f.server_id.clone(),
                expires_at: NOW + 3600,
                max_uses: Some(5),
            },
            &f.user_id,
            NOW,
        )
        .unwrap();

        let original = { let c = commit(&f, 1, None, "pi_1"); commit_purchase(&mut f.conn, &c, NOW) }.unwrap();
        let err = { let c = commit(&f, 1, Some(&code.id), "pi_1"); commit_purchase(&mut f.conn, &c, NOW) }
            .unwrap_err();
        assert!(matches!(err, AppError::PaymentAlreadyApplied));

        let code = queries::get_discount_code_by_id(&f.conn, &code.id).unwrap().unwrap();
        assert_eq!(code.current_uses, 0);
        assert_eq!(queries::count_discount_usage(&f.conn, &code.id).unwrap(), 0);
        let sub = queries::get_subscription_by_id(&f.conn, &original.id).unwrap().unwrap();
        assert_eq!(sub.expires_at, original.expires_at);
        assert!(!sub.via_coupon);
    }

    #[test]
    fn code_redemption_sets_via_coupon_and_usage() {
        let mut f = fixture();
        let code = queries::create_discount_code(
            &f.conn,
            &CreateDiscountCode {
                code: "ONCE".into(),
                server_id: f.server_id.clone(),
                expires_at: NOW + 3600,
                max_uses: Some(1),
            },
            &f.user_id,
            NOW,
        )
        .unwrap();

        let sub = { let c = commit(&f, 1, Some(&code.id), "pi_1"); commit_purchase(&mut f.conn, &c, NOW) }.unwrap();
        assert!(sub.via_coupon);
        assert_eq!(queries::count_discount_usage(&f.conn, &code.id).unwrap(), 1);

        let err = { let c = commit(&f, 1, Some(&code.id), "pi_2"); commit_purchase(&mut f.conn, &c, NOW) }
            .unwrap_err();
        assert!(matches!(err, AppError::UsageExhausted));
    }
}
