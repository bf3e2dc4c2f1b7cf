mod admin;
mod auth;
mod servers;
mod subscriptions;

pub use admin::*;
pub use auth::*;
pub use servers::*;
pub use subscriptions::*;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use serde::Serialize;

use crate::db::AppState;
use crate::extractors::Json;
use crate::middleware::require_role;
use crate::models::Role;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// All API routes, relative to `/api`.
pub fn router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/servers", get(list_servers));

    // Any signed-in user (admins included)
    let user_routes = Router::new()
        .route("/auth/profile", get(profile))
        .route("/subscriptions", get(list_subscriptions))
        .route("/subscribe", post(subscribe))
        .route("/apply-discount", post(apply_discount))
        .route("/payments/create-intent", post(create_payment_intent))
        .layer(middleware::from_fn_with_state(
            (state.clone(), Role::User),
            require_role,
        ));

    let admin_routes = Router::new()
        .route("/admin/servers", post(create_server))
        .route("/admin/servers/{id}", put(update_server))
        .route(
            "/admin/discount-codes",
            get(list_discount_codes).post(create_discount_code),
        )
        .route("/admin/discount-usage/{code_id}", get(list_discount_usage))
        .layer(middleware::from_fn_with_state(
            (state, Role::Admin),
            require_role,
        ));

    public_routes.merge(user_routes).merge(admin_routes)
}
