use reqwest::Client;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{
    FormState, NetworkError, StatusLevel, MSG_INVALID_FORM, MSG_NOT_CONFIGURED, MSG_SENDING,
    MSG_SENT, MSG_SERVER_ERROR, MSG_UNEXPECTED,
};
use crate::deadline::Deadline;
use crate::upstream::{multipart_form, post_multipart, RawResponse, Reply};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Field checks failed; nothing was sent.
    Invalid,
    NotConfigured,
    Sent,
    /// Success status without the expected `success` flag.
    Unexpected,
    Failed(NetworkError),
}

pub struct Submitter {
    client: Client,
    endpoint: Option<String>,
    timeout: Duration,
}

impl Submitter {
    pub fn new(endpoint: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn submit(&self, form: &mut FormState) -> SubmitOutcome {
        self.submit_until(form, Deadline::after(self.timeout)).await
    }

    /// Validates, sends once under `deadline` and reflects the result in
    /// `form`.
    pub async fn submit_until(&self, form: &mut FormState, deadline: Deadline) -> SubmitOutcome {
        form.clear_errors();

        if !form.validate() {
            form.set_status(MSG_INVALID_FORM, StatusLevel::Error);
            return SubmitOutcome::Invalid;
        }
        let Some(endpoint) = self.endpoint.as_deref() else {
            form.set_status(MSG_NOT_CONFIGURED, StatusLevel::Error);
            return SubmitOutcome::NotConfigured;
        };

        form.set_loading(true);
        form.set_status(MSG_SENDING, StatusLevel::Info);

        let outcome = match self.send(endpoint, form, deadline).await {
            Ok(reply) => self.apply_reply(form, reply),
            Err(err) => {
                error!("Submission failed: {}", err);
                form.set_status(err.user_message(), StatusLevel::Error);
                SubmitOutcome::Failed(err)
            }
        };

        form.set_loading(false);
        outcome
    }

    async fn send(
        &self,
        endpoint: &str,
        form: &FormState,
        deadline: Deadline,
    ) -> Result<Reply, NetworkError> {
        let fields = form
            .proposal
            .text_fields()
            .into_iter()
            .map(|(field, value)| (field.as_str().to_string(), value))
            .collect();
        let file = form.proposal.proposal_file.clone().map(|mut file| {
            file.content_type = Some(file.effective_content_type());
            file
        });
        let body = multipart_form(fields, file).map_err(|e| NetworkError::Other(e.to_string()))?;

        info!(endpoint, "Submitting proposal");
        let response = post_multipart(&self.client, endpoint, body, deadline).await?;
        interpret(response)
    }

    fn apply_reply(&self, form: &mut FormState, reply: Reply) -> SubmitOutcome {
        match reply {
            Reply::StructuredSuccess(_) => {
                form.reset();
                form.set_status(MSG_SENT, StatusLevel::Info);
                SubmitOutcome::Sent
            }
            other => {
                warn!("Unexpected response: {}", other.payload_for_log());
                form.set_status(MSG_UNEXPECTED, StatusLevel::Info);
                SubmitOutcome::Unexpected
            }
        }
    }
}

/// Turns a failure status into an error carrying the server's own message.
fn interpret(response: RawResponse) -> Result<Reply, NetworkError> {
    let reply = Reply::from_content_type(response.content_type.as_deref(), &response.body)
        .map_err(|e| NetworkError::BadResponse(e.to_string()))?;

    if !(response.status.is_success() || response.status.is_redirection()) {
        let message = reply
            .failure_message()
            .unwrap_or_else(|| MSG_SERVER_ERROR.to_string());
        return Err(NetworkError::Server(message));
    }

    Ok(reply)
}
