use clap::Parser;
use kp_form::client::{FormState, StatusLevel, SubmitOutcome, Submitter};
use kp_form::proposal::{Attachment, Proposal, CURRENCIES};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "kp-submit")]
#[command(about = "Validate and submit a business proposal", long_about = None)]
struct Cli {
    /// Submission endpoint, usually the proxy's /api/kp
    #[arg(long, env = "GAS_ENDPOINT")]
    endpoint: Option<String>,

    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    #[arg(long, default_value = "")]
    company_name: String,

    #[arg(long, default_value = "")]
    proposal_title: String,

    #[arg(long, default_value = "")]
    amount: String,

    #[arg(long, value_parser = currency_parser())]
    currency: Option<String>,

    /// Proposal date, YYYY-MM-DD
    #[arg(long, default_value = "")]
    proposal_date: String,

    #[arg(long, default_value = "")]
    email: String,

    #[arg(long, default_value = "")]
    source_link: String,

    /// File to attach
    #[arg(long)]
    file: Option<PathBuf>,

    /// Agree to personal data processing
    #[arg(long)]
    consent: bool,
}

fn currency_parser() -> clap::builder::PossibleValuesParser {
    clap::builder::PossibleValuesParser::new(CURRENCIES.iter().copied())
}

fn read_attachment(path: &Path) -> std::io::Result<Attachment> {
    let data = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();
    Ok(Attachment {
        file_name,
        content_type: None,
        data,
    })
}

fn print_form(form: &FormState) {
    for (field, messages) in form.errors.iter() {
        eprintln!("  {}: {}", field, messages.join("; "));
    }
    match &form.status {
        Some(status) if status.level == StatusLevel::Error => eprintln!("{}", status.message),
        Some(status) => println!("{}", status.message),
        None => {}
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kp_form=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let proposal_file = match &cli.file {
        Some(path) => Some(
            read_attachment(path)
                .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?,
        ),
        None => None,
    };

    let mut form = FormState::new(Proposal {
        company_name: cli.company_name,
        proposal_title: cli.proposal_title,
        amount: cli.amount,
        currency: cli.currency.unwrap_or_default(),
        proposal_date: cli.proposal_date,
        email: cli.email,
        source_link: cli.source_link,
        proposal_file,
        consent: cli.consent,
        client_timestamp: None,
    });

    let submitter =
        Submitter::new(cli.endpoint)?.with_timeout(Duration::from_secs(cli.timeout_secs));
    let outcome = submitter.submit(&mut form).await;
    print_form(&form);

    Ok(match outcome {
        SubmitOutcome::Sent => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
