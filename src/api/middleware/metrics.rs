use crate::api::handlers::config::SUBMIT_PATH;
use axum::{extract::Request, http::header::CONTENT_LENGTH, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Coarse route label so batch submissions can be filtered from downloads.
fn route_label(path: &str) -> &'static str {
    match path {
        SUBMIT_PATH => "generate",
        "/config" => "config",
        "/health" => "health",
        p if p.ends_with(".zip") => "download",
        _ => "other",
    }
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let route = route_label(req.uri().path());
    let bytes_in = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let response = next.run(req).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if route == "generate" {
        if response.status().is_server_error() {
            warn!(target: "metrics", status, latency_ms, bytes_in, "batch_failed");
        } else {
            info!(
                target: "metrics",
                status,
                latency_ms,
                bytes_in,
                accepted = response.status().is_success(),
                "batch_completed"
            );
        }
        return response;
    }

    info!(
        target: "metrics",
        method = %method,
        route,
        status,
        latency_ms,
        "request_completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_label() {
        assert_eq!(route_label("/generate"), "generate");
        assert_eq!(route_label("/config"), "config");
        assert_eq!(route_label("/health"), "health");
        assert_eq!(route_label("/net-promo-20260101-abc123.zip"), "download");
        assert_eq!(route_label("/generate/extra"), "other");
    }
}
