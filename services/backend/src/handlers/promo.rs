use axum::{extract::State, Json};

use crate::{
    domain::{PromoGrant, RedeemRequest},
    errors::Result,
    extractors::ValidatedJson,
    state::AppState,
};

pub async fn redeem_promo(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RedeemRequest>,
) -> Result<Json<PromoGrant>> {
    let grant = state.engine.redeem(&req.code, &req.device_id).await?;
    Ok(Json(grant))
}
