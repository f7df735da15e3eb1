use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{info, warn};

use super::Reply;
use crate::deadline::{Deadline, Expired};
use crate::error::ProxyError;
use crate::proposal::{timestamp_now, Attachment, Field};

const DEFAULT_FILE_NAME: &str = "file";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Failure to obtain a complete response.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("request timed out")]
    Timeout,
    #[error("{source}")]
    Request {
        status: Option<StatusCode>,
        #[source]
        source: reqwest::Error,
    },
}

impl SendError {
    fn request(status: Option<StatusCode>, source: reqwest::Error) -> Self {
        SendError::Request { status, source }
    }

    pub fn is_connect(&self) -> bool {
        matches!(self, SendError::Request { source, .. } if source.is_connect())
    }
}

impl From<Expired> for SendError {
    fn from(_: Expired) -> Self {
        SendError::Timeout
    }
}

#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Builds a multipart body from text fields in order plus an optional file
/// under `proposalFile`.
pub fn multipart_form(
    fields: Vec<(String, String)>,
    file: Option<Attachment>,
) -> Result<Form, reqwest::Error> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name, value);
    }

    if let Some(file) = file {
        let content_type = file
            .content_type
            .filter(|ct| ct.parse::<mime_guess::mime::Mime>().is_ok())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let file_name = if file.file_name.is_empty() {
            DEFAULT_FILE_NAME.to_string()
        } else {
            file.file_name
        };
        let part = Part::bytes(file.data)
            .file_name(file_name)
            .mime_str(&content_type)?;
        form = form.part(Field::ProposalFile.as_str(), part);
    }

    Ok(form)
}

/// One POST, bounded by `deadline`. Any HTTP status counts as a response.
pub async fn post_multipart(
    client: &Client,
    url: &str,
    form: Form,
    deadline: Deadline,
) -> Result<RawResponse, SendError> {
    deadline
        .run(async {
            let response = client
                .post(url)
                .multipart(form)
                .send()
                .await
                .map_err(|e| SendError::request(e.status(), e))?;

            let status = response.status();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .bytes()
                .await
                .map_err(|e| SendError::request(Some(status), e))?
                .to_vec();

            Ok::<_, SendError>(RawResponse {
                status,
                content_type,
                body,
            })
        })
        .await?
}

/// Submission received by the proxy, ready to be re-sent upstream.
#[derive(Debug, Default)]
pub struct ForwardedForm {
    pub fields: Vec<(String, String)>,
    pub file: Option<Attachment>,
}

impl ForwardedForm {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    /// Adds the server time as `clientTimestamp` unless the sender supplied one.
    pub fn ensure_timestamp(&mut self) {
        let name = Field::ClientTimestamp.as_str();
        if !self.has_field(name) {
            self.fields.push((name.to_string(), timestamp_now()));
        }
    }
}

pub struct UpstreamClient {
    client: Client,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self { client, timeout })
    }

    /// Relays `form` to `url` and returns the upstream status with the
    /// classified body.
    pub async fn forward(
        &self,
        url: &str,
        mut form: ForwardedForm,
    ) -> Result<(StatusCode, Reply), ProxyError> {
        form.ensure_timestamp();
        let file_info = form
            .file
            .as_ref()
            .map(|f| format!("{} ({} bytes)", f.file_name, f.data.len()));
        info!(
            fields = form.fields.len(),
            file = file_info.as_deref().unwrap_or("none"),
            "Forwarding submission upstream"
        );

        let body = multipart_form(form.fields, form.file).map_err(|e| ProxyError::Upstream {
            status: None,
            message: e.to_string(),
        })?;

        let response = post_multipart(&self.client, url, body, Deadline::after(self.timeout))
            .await
            .map_err(|e| match e {
                SendError::Timeout => ProxyError::UpstreamTimeout(self.timeout),
                SendError::Request { status, source } => ProxyError::Upstream {
                    status,
                    message: source.to_string(),
                },
            })?;

        if !response.status.is_success() {
            warn!(status = %response.status, "Upstream answered with a failure status");
        }

        Ok((response.status, Reply::sniff(&response.body)))
    }
}
