use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("GAS_ENDPOINT не настроен на сервере")]
    NotConfigured,

    #[error("File too large")]
    FileTooLarge,

    #[error("Unexpected field: {0}")]
    UnexpectedFile(String),

    #[error("{message}")]
    Multipart { status: StatusCode, message: String },

    #[error("timeout of {}ms exceeded", .0.as_millis())]
    UpstreamTimeout(Duration),

    #[error("{message}")]
    Upstream {
        status: Option<StatusCode>,
        message: String,
    },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::UnexpectedFile(_) => StatusCode::BAD_REQUEST,
            ProxyError::Multipart { status, .. } => *status,
            ProxyError::UpstreamTimeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Upstream { status, .. } => {
                status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut message = self.to_string();
        if message.is_empty() {
            message = "Proxy error".to_string();
        }

        match self {
            ProxyError::UpstreamTimeout(_) | ProxyError::Upstream { .. } => {
                tracing::error!(status = %status, "Proxy error: {}", message);
            }
            _ => tracing::warn!(status = %status, "Rejected submission: {}", message),
        }

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
