use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use std::path::Path;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub output_dir: String,
    pub template: String,
    pub version: String,
}

async fn output_dir_status(path: &Path) -> &'static str {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => "writable",
        Ok(meta) if meta.is_dir() => "read-only",
        Ok(_) => "not a directory",
        // Created on the first batch
        Err(_) => "missing",
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let output_status = output_dir_status(&state.config.output_dir).await;

    let template_status = if tokio::fs::try_exists(&state.config.template_path)
        .await
        .unwrap_or(false)
    {
        "present"
    } else {
        "missing"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        output_dir: output_status.to_string(),
        template: template_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
