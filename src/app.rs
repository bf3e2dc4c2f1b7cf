//! Router assembly and application state construction.

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;
use crate::db::{AppState, DbPool};
use crate::handlers;
use crate::jwt::TokenIssuer;
use crate::payments::Payments;
use crate::pricing::PriceList;

pub fn build_state(config: &Config, db: DbPool) -> anyhow::Result<AppState> {
    let secret = config.signing_secret()?;
    Ok(AppState {
        db,
        tokens: Arc::new(TokenIssuer::from_days(&secret, config.jwt_lifetime_days)),
        payments: Payments::from_config(config),
        prices: PriceList::new(config.base_monthly_price_cents, config.currency.clone()),
        payment_timeout: config.payment_timeout(),
        bootstrap_admin_email: config.bootstrap_admin_email.clone(),
    })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// The full application: every route nested under `/api`.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .nest("/api", handlers::router(state.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(cors_origins))
        .with_state(state)
}
