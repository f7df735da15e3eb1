use thiserror::Error;

use crate::upstream::SendError;

pub const MSG_TIMEOUT: &str = "Превышено время ожидания ответа сервера.";
pub const MSG_CONNECT: &str = "Не удалось установить соединение. Повторите попытку позже.";
pub const MSG_UNKNOWN: &str = "Неизвестная ошибка сети.";
pub const MSG_BAD_RESPONSE: &str = "Сервер вернул некорректный ответ.";

/// Why a submission attempt failed after leaving the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("timeout")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    /// Failure reported by the server itself; its text is shown as is.
    #[error("{0}")]
    Server(String),
    /// A body that could not be read as the declared content type.
    #[error("malformed response: {0}")]
    BadResponse(String),
    #[error("{0}")]
    Other(String),
}

impl NetworkError {
    /// The text shown to the user. Only server-provided messages pass
    /// through; transport and parse details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            NetworkError::Timeout => MSG_TIMEOUT.to_string(),
            NetworkError::Connect(_) => MSG_CONNECT.to_string(),
            NetworkError::Server(msg) if !msg.is_empty() => msg.clone(),
            NetworkError::BadResponse(_) => MSG_BAD_RESPONSE.to_string(),
            NetworkError::Server(_) | NetworkError::Other(_) => MSG_UNKNOWN.to_string(),
        }
    }
}

impl From<SendError> for NetworkError {
    fn from(err: SendError) -> Self {
        if err.is_connect() {
            return NetworkError::Connect(err.to_string());
        }
        match err {
            SendError::Timeout => NetworkError::Timeout,
            SendError::Request { source, .. } if source.is_timeout() => NetworkError::Timeout,
            other => NetworkError::Other(other.to_string()),
        }
    }
}
