use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::ProxyError;
use crate::proposal::{timestamp_now, Attachment, Field};
use crate::state::AppState;
use crate::upstream::ForwardedForm;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "ts": timestamp_now() }))
}

pub async fn api_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "success": false, "message": "Not found" })),
    )
}

fn multipart_error(e: MultipartError) -> ProxyError {
    ProxyError::Multipart {
        status: e.status(),
        message: e.body_text(),
    }
}

fn multipart_rejection(e: MultipartRejection) -> ProxyError {
    ProxyError::Multipart {
        status: e.status(),
        message: e.body_text(),
    }
}

/// Reads every text part and at most one `proposalFile` file part into memory.
async fn read_submission(
    mut multipart: Multipart,
    max_file_bytes: usize,
) -> Result<ForwardedForm, ProxyError> {
    let mut form = ForwardedForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let text = field.text().await.map_err(multipart_error)?;
            form.fields.push((name, text));
            continue;
        };

        if name != Field::ProposalFile.as_str() || form.file.is_some() {
            return Err(ProxyError::UnexpectedFile(name));
        }

        let content_type = field.content_type().map(str::to_string);
        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if data.len() + chunk.len() > max_file_bytes {
                return Err(ProxyError::FileTooLarge);
            }
            data.extend_from_slice(&chunk);
        }

        // Browsers send an empty nameless part for an untouched file input.
        if file_name.is_empty() && data.is_empty() {
            continue;
        }

        form.file = Some(Attachment {
            file_name,
            content_type,
            data,
        });
    }

    Ok(form)
}

pub async fn submit_proposal(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ProxyError> {
    let multipart = multipart.map_err(multipart_rejection)?;
    let form = read_submission(multipart, state.config.max_upload_bytes).await?;

    let url = state
        .config
        .upstream_url
        .as_deref()
        .ok_or(ProxyError::NotConfigured)?;

    let (status, reply) = state.upstream.forward(url, form).await?;
    let body = reply.into_relay_body(status.as_u16());

    Ok((status, Json(body)).into_response())
}
