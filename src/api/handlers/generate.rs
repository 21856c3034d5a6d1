use crate::AppState;
use crate::api::error::AppError;
use crate::models::GenerateResponse;
use crate::services::error::BatchError;
use crate::services::upload_resolver::{UploadMap, UploadedFile};
use crate::utils::auth::Claims;
use crate::utils::nonce::{GENERATE_ACTION, verify_nonce};
use axum::{
    Json,
    extract::{Extension, Multipart, State, multipart::MultipartError},
};
use chrono::Utc;

fn multipart_error(e: MultipartError) -> AppError {
    let err_msg = e.to_string();
    if err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}

#[utoipa::path(
    post,
    path = "/generate",
    request_body(
        content = Object,
        description = "Form fields `nonce` and `rows` (JSON array of RowDescriptor) plus one file part per field key",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 200, description = "Archive generated", body = GenerateResponse),
        (status = 400, description = "Malformed rows or missing uploads"),
        (status = 403, description = "Invalid token or nonce"),
        (status = 500, description = "Template or filesystem failure")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "sip"
)]
pub async fn generate_sips(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, AppError> {
    let mut nonce = String::new();
    let mut rows = String::new();
    let mut uploads = UploadMap::new();
    let mut file_parts = 0usize;

    // Errors still drain the rest of the body below
    let result: Result<Json<GenerateResponse>, AppError> = async {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "action" => {
                    field.text().await.map_err(multipart_error)?;
                }
                "nonce" => nonce = field.text().await.map_err(multipart_error)?,
                "rows" => rows = field.text().await.map_err(multipart_error)?,
                _ => {
                    let client_filename = field.file_name().map(|s| s.to_string());
                    let declared_type = field.content_type().map(|s| s.to_string());
                    let data = field.bytes().await.map_err(multipart_error)?;

                    if client_filename.is_some() {
                        file_parts += 1;
                        if file_parts > state.config.max_uploads {
                            return Err(AppError::BadRequest(format!(
                                "Too many uploads: at most {} files per request.",
                                state.config.max_uploads
                            )));
                        }
                    }

                    uploads.insert(
                        &name,
                        UploadedFile {
                            data,
                            declared_type,
                            client_filename,
                        },
                    );
                }
            }
        }

        let now = Utc::now();
        if !verify_nonce(
            &state.config.nonce_secret,
            &claims.sub,
            GENERATE_ACTION,
            &nonce,
            now,
        ) {
            tracing::warn!("Nonce check failed for user {}", claims.sub);
            return Err(BatchError::InvalidNonce.into());
        }

        let outcome = state.batch.run(&rows, &uploads, now).await?;

        Ok(Json(GenerateResponse {
            success: true,
            download_url: state.config.download_url(&outcome.archive.file_name),
            file_count: outcome.file_count(),
        }))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            tracing::warn!("Generate request failed: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}
