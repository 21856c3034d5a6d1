use std::env;
use std::path::PathBuf;

/// Runtime configuration for the SIP generator
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root directory holding job directories and archives (default: "generated")
    pub output_dir: PathBuf,

    /// URL path the output root is served under (default: "/generated")
    pub public_base_path: String,

    /// HTML template with the portrait/landscape placeholders
    pub template_path: PathBuf,

    /// Archives older than this are swept (default: 60 minutes)
    pub retention_minutes: i64,

    /// Upload-count ceiling advertised to clients (default: 20)
    pub max_uploads: usize,

    /// Maximum multipart request body in bytes (default: 128 MB)
    pub max_request_size: usize,

    /// Accepted detected media types. Empty accepts anything.
    pub allowed_media_types: Vec<String>,

    /// Enforce per-network asset size limits (default: true)
    pub enforce_network_limits: bool,

    /// Background sweep interval in seconds, 0 disables (default: 900)
    pub sweep_interval_secs: u64,

    /// JWT Secret Key
    pub jwt_secret: String,

    /// Secret mixed into request nonces
    pub nonce_secret: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated"),
            public_base_path: "/generated".to_string(),
            template_path: PathBuf::from("templates/sip.html"),
            retention_minutes: 60,
            max_uploads: 20,
            max_request_size: 128 * 1024 * 1024, // 128 MB
            allowed_media_types: vec!["image/gif".to_string(), "video/mp4".to_string()],
            enforce_network_limits: true,
            sweep_interval_secs: 900,
            jwt_secret: "secret".to_string(),
            nonce_secret: "nonce-secret".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            output_dir: env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.output_dir),

            public_base_path: env::var("PUBLIC_BASE_PATH")
                .map(|v| normalize_base_path(&v))
                .unwrap_or(default.public_base_path),

            template_path: env::var("TEMPLATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.template_path),

            retention_minutes: env::var("RETENTION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v > 0)
                .unwrap_or(default.retention_minutes),

            max_uploads: env::var("MAX_UPLOADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_uploads),

            max_request_size: env::var("MAX_REQUEST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_request_size),

            allowed_media_types: env::var("ALLOWED_MEDIA_TYPES")
                .ok()
                .map(|v| parse_list(&v))
                .unwrap_or(default.allowed_media_types),

            enforce_network_limits: env::var("ENFORCE_NETWORK_LIMITS")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(default.enforce_network_limits),

            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.sweep_interval_secs),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),

            nonce_secret: env::var("NONCE_SECRET").unwrap_or(default.nonce_secret),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| parse_list(&v))
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Relaxed config for local work: no media or size policy
    pub fn development() -> Self {
        Self {
            allowed_media_types: Vec::new(),
            enforce_network_limits: false,
            sweep_interval_secs: 0,
            ..Self::default()
        }
    }

    /// Download URL for an archive file name under the output root
    pub fn download_url(&self, archive_name: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_path.trim_end_matches('/'),
            archive_name
        )
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn normalize_base_path(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') || trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.retention_minutes, 60);
        assert_eq!(config.max_uploads, 20);
        assert_eq!(config.public_base_path, "/generated");
        assert!(config.enforce_network_limits);
        assert!(config.allowed_media_types.contains(&"video/mp4".to_string()));
    }

    #[test]
    fn test_development_config() {
        let config = AppConfig::development();
        assert!(config.allowed_media_types.is_empty());
        assert!(!config.enforce_network_limits);
        assert_eq!(config.sweep_interval_secs, 0);
    }

    #[test]
    fn test_download_url() {
        let mut config = AppConfig::default();
        assert_eq!(config.download_url("a.zip"), "/generated/a.zip");
        config.public_base_path = "https://cdn.example.com/sips/".to_string();
        assert_eq!(
            config.download_url("a.zip"),
            "https://cdn.example.com/sips/a.zip"
        );
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path("downloads/"), "/downloads");
        assert_eq!(normalize_base_path("/downloads"), "/downloads");
        assert_eq!(normalize_base_path(""), "/");
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" image/GIF, ,video/mp4 "),
            vec!["image/gif".to_string(), "video/mp4".to_string()]
        );
    }
}
