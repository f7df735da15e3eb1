//! Client side of the proposal form: field state, validation gate and the
//! submitter that talks to the proxy.

mod network;
mod submitter;

pub use network::*;
pub use submitter::*;

use crate::proposal::{validate, FieldErrors, Proposal};

pub const MSG_INVALID_FORM: &str = "Проверьте поля формы — найдены ошибки.";
pub const MSG_NOT_CONFIGURED: &str = "Не настроен адрес приёма данных (GAS_ENDPOINT).";
pub const MSG_SENDING: &str = "Отправка данных...";
pub const MSG_SENT: &str = "Готово! Данные успешно отправлены.";
pub const MSG_UNEXPECTED: &str = "Ответ сервера получен, но формат неожиданный.";
pub const MSG_SERVER_ERROR: &str = "Ошибка сервера";

pub const LABEL_SUBMIT: &str = "Отправить";
pub const LABEL_SENDING: &str = "Отправка...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub level: StatusLevel,
}

/// Everything the user sees: inputs, per-field errors, the status line and
/// the submit control.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub proposal: Proposal,
    pub errors: FieldErrors,
    pub status: Option<Status>,
    busy: bool,
}

impl FormState {
    pub fn new(proposal: Proposal) -> Self {
        Self {
            proposal,
            ..Default::default()
        }
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
        self.status = None;
    }

    /// Overwrites the error slots with a fresh check of every field.
    pub fn validate(&mut self) -> bool {
        self.errors = validate(&self.proposal);
        self.errors.is_empty()
    }

    pub fn set_status(&mut self, message: impl Into<String>, level: StatusLevel) {
        self.status = Some(Status {
            message: message.into(),
            level,
        });
    }

    pub fn status_message(&self) -> &str {
        self.status.as_ref().map(|s| s.message.as_str()).unwrap_or("")
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.busy = loading;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn submit_label(&self) -> &'static str {
        if self.busy {
            LABEL_SENDING
        } else {
            LABEL_SUBMIT
        }
    }

    pub fn reset(&mut self) {
        self.proposal = Proposal::default();
        self.clear_errors();
    }
}
