use axum::extract::{Extension, State};

use crate::db::AppState;
use crate::discounts;
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::middleware::AuthContext;
use crate::models::{
    CreateDiscountCode, DiscountCode, DiscountCodeUsageWithUser, DiscountCodeWithServer,
};
use crate::util::now;

pub async fn list_discount_codes(
    State(state): State<AppState>,
) -> Result<Json<Vec<DiscountCodeWithServer>>> {
    let conn = state.db.get()?;
    let codes = discounts::list_codes(&conn)?;
    Ok(Json(codes))
}

pub async fn create_discount_code(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateDiscountCode>,
) -> Result<Json<DiscountCode>> {
    let conn = state.db.get()?;
    let code = discounts::create(&conn, &input, &ctx.user.id, now())?;

    tracing::info!(
        admin_id = %ctx.user.id,
        code = %code.code,
        server_id = %code.server_id,
        max_uses = ?code.max_uses,
        "Discount code created"
    );
    Ok(Json(code))
}

pub async fn list_discount_usage(
    State(state): State<AppState>,
    Path(code_id): Path<String>,
) -> Result<Json<Vec<DiscountCodeUsageWithUser>>> {
    let conn = state.db.get()?;
    let usage = discounts::list_usage(&conn, &code_id)?;
    Ok(Json(usage))
}
