use crate::AppState;
use crate::api::error::AppError;
use crate::models::ClientConfigResponse;
use crate::services::networks::network_catalog;
use crate::utils::auth::Claims;
use crate::utils::nonce::{GENERATE_ACTION, create_nonce};
use axum::{
    Json,
    extract::{Extension, State},
};
use chrono::Utc;

pub const SUBMIT_PATH: &str = "/generate";

/// Everything the generate form needs before its first submit.
#[utoipa::path(
    get,
    path = "/config",
    responses(
        (status = 200, description = "Client bootstrap config", body = ClientConfigResponse),
        (status = 403, description = "Invalid token")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "sip"
)]
pub async fn client_config(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ClientConfigResponse>, AppError> {
    let nonce = create_nonce(
        &state.config.nonce_secret,
        &claims.sub,
        GENERATE_ACTION,
        Utc::now(),
    )?;

    Ok(Json(ClientConfigResponse {
        submit_url: SUBMIT_PATH.to_string(),
        action: GENERATE_ACTION.to_string(),
        nonce,
        max_uploads: state.config.max_uploads,
        accepted_media_types: state.config.allowed_media_types.clone(),
        ad_networks: network_catalog(),
    }))
}
