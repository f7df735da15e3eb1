use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::{Attachment, Field, Proposal};

pub const MAX_FILE_MB: f64 = 20.0;
pub const ACCEPTED_EXTENSIONS: &[&str] =
    &[".pdf", ".doc", ".docx", ".xls", ".xlsx", ".png", ".jpg", ".jpeg"];

pub const MSG_COMPANY_NAME: &str = "Укажите название компании";
pub const MSG_PROPOSAL_TITLE: &str = "Укажите тему КП";
pub const MSG_AMOUNT: &str = "Введите сумму (0 и выше)";
pub const MSG_CURRENCY: &str = "Выберите валюту";
pub const MSG_PROPOSAL_DATE: &str = "Укажите дату КП";
pub const MSG_EMAIL: &str = "Некорректный email";
pub const MSG_SOURCE_LINK: &str = "Ссылка должна начинаться с http(s)://";
pub const MSG_FILE_TYPE: &str = "Недопустимый тип файла";
pub const MSG_CONSENT: &str = "Требуется согласие";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static LINK_RE: OnceLock<Regex> = OnceLock::new();
static NUMBER_PREFIX_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

fn link_re() -> &'static Regex {
    LINK_RE.get_or_init(|| Regex::new(r"(?i)^https?://.+").unwrap())
}

fn number_prefix_re() -> &'static Regex {
    NUMBER_PREFIX_RE.get_or_init(|| {
        Regex::new(r"^[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap()
    })
}

pub fn file_size_message() -> String {
    format!("Файл превышает {} МБ", MAX_FILE_MB)
}

/// Error slots keyed by form field. A slot can carry more than one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(BTreeMap<Field, Vec<String>>);

impl FieldErrors {
    pub fn push(&mut self, field: Field, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn messages(&self, field: Field) -> &[String] {
        self.0.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Text shown in the field's error slot.
    pub fn slot(&self, field: Field) -> String {
        self.messages(field).join("; ")
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &[String])> {
        self.0.iter().map(|(f, m)| (*f, m.as_slice()))
    }
}

/// Leading-prefix number parse: `"12.5 руб"` reads as 12.5, `"abc"` as none.
pub fn parse_amount(input: &str) -> Option<f64> {
    let trimmed = input.trim_start();
    let m = number_prefix_re().find(trimmed)?;
    m.as_str().parse::<f64>().ok()
}

pub fn file_extension(file_name: &str) -> String {
    let last = file_name.rsplit('.').next().unwrap_or(file_name);
    format!(".{}", last.to_lowercase())
}

fn check_file(file: &Attachment, errors: &mut FieldErrors) {
    let ext = file_extension(&file.file_name);
    if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        errors.push(Field::ProposalFile, MSG_FILE_TYPE);
    }
    if file.size_mb() > MAX_FILE_MB {
        errors.push(Field::ProposalFile, file_size_message());
    }
}

/// Checks every field; nothing short-circuits.
pub fn validate(proposal: &Proposal) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if proposal.company_name.trim().is_empty() {
        errors.push(Field::CompanyName, MSG_COMPANY_NAME);
    }

    if proposal.proposal_title.trim().is_empty() {
        errors.push(Field::ProposalTitle, MSG_PROPOSAL_TITLE);
    }

    match parse_amount(&proposal.amount) {
        Some(amount) if amount >= 0.0 => {}
        _ => errors.push(Field::Amount, MSG_AMOUNT),
    }

    if proposal.currency.is_empty() {
        errors.push(Field::Currency, MSG_CURRENCY);
    }

    if proposal.proposal_date.is_empty() {
        errors.push(Field::ProposalDate, MSG_PROPOSAL_DATE);
    }

    let email = proposal.email.trim();
    if !email.is_empty() && !email_re().is_match(email) {
        errors.push(Field::Email, MSG_EMAIL);
    }

    let link = proposal.source_link.trim();
    if !link.is_empty() && !link_re().is_match(link) {
        errors.push(Field::SourceLink, MSG_SOURCE_LINK);
    }

    if let Some(file) = &proposal.proposal_file {
        check_file(file, &mut errors);
    }

    if !proposal.consent {
        errors.push(Field::Consent, MSG_CONSENT);
    }

    errors
}
