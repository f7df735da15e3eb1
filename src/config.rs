use std::path::PathBuf;
use std::time::Duration;

/// Hard cap on an uploaded file accepted by the proxy.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub upstream_url: Option<String>,
    pub static_folder: PathBuf,
    pub upstream_timeout: Duration,
    pub max_upload_bytes: usize,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Defaults for everything except the upstream endpoint.
    pub fn new(upstream_url: Option<String>) -> Self {
        Self {
            upstream_url,
            static_folder: PathBuf::from("public"),
            upstream_timeout: Duration::from_secs(60),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }

    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();

        let upstream_url = match std::env::var("GAS_ENDPOINT") {
            Ok(url) if !url.trim().is_empty() => {
                let url = url.trim().to_string();
                reqwest::Url::parse(&url)
                    .map_err(|e| format!("GAS_ENDPOINT is not a valid URL: {}", e))?;
                Some(url)
            }
            _ => {
                tracing::warn!(
                    "GAS_ENDPOINT is not set; /api/kp will answer with a configuration error"
                );
                None
            }
        };

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let static_folder = base_dir.join(
            std::env::var("STATIC_FOLDER").unwrap_or_else(|_| "public".to_string()),
        );

        let upstream_timeout = Duration::from_secs(
            std::env::var("UPSTREAM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        );

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        Ok(Self {
            upstream_url,
            static_folder,
            upstream_timeout,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            host,
            port,
        })
    }
}
