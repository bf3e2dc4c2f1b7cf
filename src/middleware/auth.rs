use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::models::{Role, User};
use crate::util::extract_bearer_token;

/// The authenticated caller, inserted as a request extension by [`require_role`].
#[derive(Clone)]
pub struct AuthContext {
    pub user: User,
}

/// Authenticate the bearer token and reload the user it names.
/// A deleted user or a token for a since-demoted admin is handled by the reload.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;
    let verified = state.tokens.verify(&token)?;

    let conn = state.db.get()?;
    queries::get_user_by_id(&conn, &verified.user_id)?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))
}

/// Reject the request unless the caller holds `required` (admins satisfy `user`).
///
/// Mount with `middleware::from_fn_with_state((state, Role::Admin), require_role)`.
pub async fn require_role(
    State((state, required)): State<(AppState, Role)>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let user = authenticate(&state, request.headers())?;
    if !user.role.satisfies(required) {
        tracing::debug!(user_id = %user.id, required = required.as_ref(), "Role check failed");
        return Err(AppError::Forbidden("Insufficient permissions".into()));
    }
    request.extensions_mut().insert(AuthContext { user });
    Ok(next.run(request).await)
}
