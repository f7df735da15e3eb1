mod validate;

pub use validate::*;

use chrono::{SecondsFormat, Utc};

/// Currencies offered by the form's dropdown.
pub const CURRENCIES: &[&str] = &["RUB", "USD", "EUR", "CNY"];

/// Multipart field names shared by the form, the proxy and the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    CompanyName,
    ProposalTitle,
    Amount,
    Currency,
    ProposalDate,
    Email,
    SourceLink,
    ProposalFile,
    Consent,
    ClientTimestamp,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::CompanyName => "companyName",
            Field::ProposalTitle => "proposalTitle",
            Field::Amount => "amount",
            Field::Currency => "currency",
            Field::ProposalDate => "proposalDate",
            Field::Email => "email",
            Field::SourceLink => "sourceLink",
            Field::ProposalFile => "proposalFile",
            Field::Consent => "consent",
            Field::ClientTimestamp => "clientTimestamp",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn size_mb(&self) -> f64 {
        self.data.len() as f64 / (1024.0 * 1024.0)
    }

    /// Content type to send: declared, else guessed from the name.
    pub fn effective_content_type(&self) -> String {
        self.content_type
            .clone()
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first_raw()
                    .unwrap_or("application/octet-stream")
                    .to_string()
            })
    }
}

/// Raw form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Proposal {
    pub company_name: String,
    pub proposal_title: String,
    pub amount: String,
    pub currency: String,
    pub proposal_date: String,
    pub email: String,
    pub source_link: String,
    pub proposal_file: Option<Attachment>,
    pub consent: bool,
    pub client_timestamp: Option<String>,
}

impl Proposal {
    /// Text parts of the outgoing multipart body. A missing `clientTimestamp`
    /// is filled with the current time on every call.
    pub fn text_fields(&self) -> Vec<(Field, String)> {
        let mut fields = vec![
            (Field::CompanyName, self.company_name.clone()),
            (Field::ProposalTitle, self.proposal_title.clone()),
            (Field::Amount, self.amount.clone()),
            (Field::Currency, self.currency.clone()),
            (Field::ProposalDate, self.proposal_date.clone()),
            (Field::Email, self.email.clone()),
            (Field::SourceLink, self.source_link.clone()),
        ];
        if self.consent {
            fields.push((Field::Consent, "on".to_string()));
        }
        let ts = self
            .client_timestamp
            .clone()
            .unwrap_or_else(timestamp_now);
        fields.push((Field::ClientTimestamp, ts));
        fields
    }
}

/// Current UTC time as ISO-8601 with millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp_of(fields: &[(Field, String)]) -> String {
        fields
            .iter()
            .find(|(f, _)| *f == Field::ClientTimestamp)
            .map(|(_, v)| v.clone())
            .unwrap()
    }

    #[test]
    fn test_fresh_timestamp_per_submission() {
        let proposal = Proposal::default();
        let first = timestamp_of(&proposal.text_fields());
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = timestamp_of(&proposal.text_fields());

        assert_ne!(first, second);
        assert!(proposal.client_timestamp.is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(&first).is_ok());
        assert!(first.ends_with('Z'));
    }

    #[test]
    fn test_explicit_timestamp_is_kept() {
        let proposal = Proposal {
            client_timestamp: Some("2024-01-01T00:00:00.000Z".to_string()),
            ..Default::default()
        };
        assert_eq!(
            timestamp_of(&proposal.text_fields()),
            "2024-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn test_consent_only_sent_when_checked() {
        let unchecked = Proposal::default().text_fields();
        assert!(!unchecked.iter().any(|(f, _)| *f == Field::Consent));

        let checked = Proposal {
            consent: true,
            ..Default::default()
        }
        .text_fields();
        assert!(checked.iter().any(|(f, v)| *f == Field::Consent && v == "on"));
    }

    #[test]
    fn test_content_type_fallbacks() {
        let mut file = Attachment {
            file_name: "offer.pdf".to_string(),
            content_type: None,
            data: vec![],
        };
        assert_eq!(file.effective_content_type(), "application/pdf");

        file.file_name = "offer.unknownext".to_string();
        assert_eq!(file.effective_content_type(), "application/octet-stream");

        file.content_type = Some("text/plain".to_string());
        assert_eq!(file.effective_content_type(), "text/plain");
    }
}
