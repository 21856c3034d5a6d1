use crate::AppState;
use crate::api::error::AppError;
use crate::services::error::BatchError;
use crate::utils::auth::validate_jwt;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

/// Bearer token from the header, else `?token=`.
fn extract_token(req: &Request) -> Option<String> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    if auth_header.is_some() {
        return auth_header;
    }

    let query = req.uri().query().unwrap_or_default();
    serde_urlencoded::from_str::<AuthQuery>(query)
        .ok()
        .and_then(|q| q.token)
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = extract_token(&req) else {
        return Err(BatchError::NotPermitted.into());
    };

    match validate_jwt(&token, &state.config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::debug!("Rejected token: {}", e);
            Err(AppError::Forbidden(
                "Your session is invalid or has expired.".to_string(),
            ))
        }
    }
}
