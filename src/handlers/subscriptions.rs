use axum::extract::{Extension, State};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::discounts;
use crate::error::Result;
use crate::extractors::Json;
use crate::middleware::AuthContext;
use crate::models::{DiscountCode, Server, Subscription, SubscriptionWithServer};
use crate::purchase::{self, CreateIntentRequest, IntentResponse, PurchaseRequest};
use crate::util::now;

#[derive(Debug, Deserialize)]
pub struct ApplyDiscountRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ApplyDiscountResponse {
    pub valid: bool,
    pub server: Server,
    pub discount_code: DiscountCode,
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<SubscriptionWithServer>>> {
    let conn = state.db.get()?;
    let subscriptions = queries::list_subscriptions_for_user(&conn, &ctx.user.id)?;
    Ok(Json(subscriptions))
}

pub async fn subscribe(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<PurchaseRequest>,
) -> Result<Json<Subscription>> {
    let subscription = purchase::purchase(&state, &ctx.user.id, &input).await?;
    Ok(Json(subscription))
}

/// Check a code without redeeming it.
pub async fn apply_discount(
    State(state): State<AppState>,
    Json(input): Json<ApplyDiscountRequest>,
) -> Result<Json<ApplyDiscountResponse>> {
    let conn = state.db.get()?;
    let validated = discounts::validate(&conn, &input.code, now())?;
    Ok(Json(ApplyDiscountResponse {
        valid: true,
        server: validated.server,
        discount_code: validated.discount_code,
    }))
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateIntentRequest>,
) -> Result<Json<IntentResponse>> {
    let intent = purchase::create_intent(&state, &ctx.user.id, &input).await?;
    Ok(Json(intent))
}
