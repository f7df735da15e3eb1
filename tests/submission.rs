use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use kp_form::client::{
    FormState, NetworkError, StatusLevel, SubmitOutcome, Submitter, MSG_BAD_RESPONSE, MSG_CONNECT,
    MSG_SENT, MSG_SERVER_ERROR, MSG_TIMEOUT, MSG_UNEXPECTED,
};
use kp_form::config::Config;
use kp_form::deadline::Deadline;
use kp_form::proposal::{Attachment, Proposal};
use kp_form::routes::router;
use kp_form::state::AppState;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Received {
    fields: Vec<(String, String)>,
    file: Option<(String, Option<String>, usize)>,
}

impl Received {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

struct MockUpstream {
    status: StatusCode,
    content_type: &'static str,
    body: String,
    hang: bool,
    received: Mutex<Vec<Received>>,
}

impl MockUpstream {
    fn build(status: u16, content_type: &'static str, body: &str, hang: bool) -> Arc<Self> {
        Arc::new(Self {
            status: StatusCode::from_u16(status).unwrap(),
            content_type,
            body: body.to_string(),
            hang,
            received: Mutex::new(Vec::new()),
        })
    }

    fn new(status: u16, content_type: &'static str, body: &str) -> Arc<Self> {
        Self::build(status, content_type, body, false)
    }

    /// Records the request, then never answers.
    fn hanging() -> Arc<Self> {
        Self::build(200, "application/json", "{}", true)
    }

    fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

async fn upstream_handler(State(mock): State<Arc<MockUpstream>>, mut multipart: Multipart) -> Response {
    let mut received = Received {
        fields: Vec::new(),
        file: None,
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or("").to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let size = field.bytes().await.unwrap().len();
                received.file = Some((file_name, content_type, size));
            }
            None => received.fields.push((name, field.text().await.unwrap())),
        }
    }
    mock.received.lock().unwrap().push(received);

    if mock.hang {
        std::future::pending::<()>().await;
    }

    (
        mock.status,
        [(header::CONTENT_TYPE, mock.content_type)],
        mock.body.clone(),
    )
        .into_response()
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_upstream(mock: Arc<MockUpstream>) -> String {
    let app = Router::new()
        .route("/exec", post(upstream_handler))
        .layer(DefaultBodyLimit::disable())
        .with_state(mock);
    format!("{}/exec", serve(app).await)
}

async fn spawn_proxy(upstream_url: Option<String>) -> String {
    let state = AppState::new(Config::new(upstream_url)).unwrap();
    format!("{}/api/kp", serve(router(Arc::new(state))).await)
}

fn valid_proposal() -> Proposal {
    Proposal {
        company_name: "ООО Ромашка".to_string(),
        proposal_title: "Поставка серверов".to_string(),
        amount: "250000.50".to_string(),
        currency: "RUB".to_string(),
        proposal_date: "2024-06-01".to_string(),
        email: "sales@romashka.ru".to_string(),
        source_link: "https://romashka.ru/kp".to_string(),
        consent: true,
        ..Default::default()
    }
}

async fn submit_via_proxy(mock: Arc<MockUpstream>, proposal: Proposal) -> (SubmitOutcome, FormState) {
    let upstream = spawn_upstream(mock).await;
    let proxy = spawn_proxy(Some(upstream)).await;
    let submitter = Submitter::new(Some(proxy)).unwrap();

    let mut form = FormState::new(proposal);
    let outcome = submitter.submit(&mut form).await;
    (outcome, form)
}

/// An address with nothing listening on it.
async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/kp", addr)
}

#[tokio::test]
async fn test_successful_submission_clears_form() {
    let mock = MockUpstream::new(200, "application/json", r#"{"success":true,"row":12}"#);
    let (outcome, form) = submit_via_proxy(mock.clone(), valid_proposal()).await;

    assert_eq!(outcome, SubmitOutcome::Sent);
    assert_eq!(form.status_message(), MSG_SENT);
    assert_eq!(form.proposal, Proposal::default());
    assert!(form.errors.is_empty());
    assert!(!form.is_busy());

    let received = mock.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].field("companyName"), Some("ООО Ромашка"));
    assert_eq!(received[0].field("amount"), Some("250000.50"));
    assert_eq!(received[0].field("consent"), Some("on"));
    assert!(received[0].field("clientTimestamp").is_some());
    assert!(received[0].file.is_none());
}

#[tokio::test]
async fn test_file_is_relayed_and_text_reply_wrapped() {
    let mock = MockUpstream::new(200, "text/plain", "OK");
    let proposal = Proposal {
        proposal_file: Some(Attachment {
            file_name: "offer.pdf".to_string(),
            content_type: None,
            data: vec![1; 5 * 1024 * 1024],
        }),
        ..valid_proposal()
    };
    let (outcome, _) = submit_via_proxy(mock.clone(), proposal).await;

    // Proxy answers {"success": true, "data": "OK"} for a text upstream body.
    assert_eq!(outcome, SubmitOutcome::Sent);

    let (file_name, content_type, size) = mock.received()[0].file.clone().unwrap();
    assert_eq!(file_name, "offer.pdf");
    assert_eq!(content_type.as_deref(), Some("application/pdf"));
    assert_eq!(size, 5 * 1024 * 1024);
}

#[tokio::test]
async fn test_upstream_failure_message_reaches_user() {
    let mock = MockUpstream::new(
        422,
        "application/json",
        r#"{"success":false,"message":"Такое КП уже зарегистрировано"}"#,
    );
    let (outcome, form) = submit_via_proxy(mock, valid_proposal()).await;

    assert_eq!(
        outcome,
        SubmitOutcome::Failed(NetworkError::Server(
            "Такое КП уже зарегистрировано".to_string()
        ))
    );
    assert_eq!(form.status_message(), "Такое КП уже зарегистрировано");
    assert_eq!(form.proposal, valid_proposal());
}

#[tokio::test]
async fn test_upstream_text_failure_is_generic_server_error() {
    let mock = MockUpstream::new(503, "text/html", "<h1>Service Unavailable</h1>");
    let (outcome, form) = submit_via_proxy(mock, valid_proposal()).await;

    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_eq!(form.status_message(), MSG_SERVER_ERROR);
}

#[tokio::test]
async fn test_unexpected_shape_keeps_form() {
    let mock = MockUpstream::new(200, "application/json", r#"{"result":"stored"}"#);
    let (outcome, form) = submit_via_proxy(mock, valid_proposal()).await;

    assert_eq!(outcome, SubmitOutcome::Unexpected);
    assert_eq!(form.status_message(), MSG_UNEXPECTED);
    assert_eq!(form.status.as_ref().unwrap().level, StatusLevel::Info);
    assert_eq!(form.proposal, valid_proposal());
}

#[tokio::test]
async fn test_expired_deadline_reports_timeout() {
    let mock = MockUpstream::hanging();
    let upstream = spawn_upstream(mock).await;
    let proxy = spawn_proxy(Some(upstream)).await;
    let submitter = Submitter::new(Some(proxy)).unwrap();

    let mut form = FormState::new(valid_proposal());
    let outcome = submitter.submit_until(&mut form, Deadline::expired()).await;

    assert_eq!(outcome, SubmitOutcome::Failed(NetworkError::Timeout));
    assert_eq!(form.status_message(), MSG_TIMEOUT);
    assert!(!form.is_busy());
}

#[tokio::test]
async fn test_hanging_upstream_times_out_in_flight() {
    let mock = MockUpstream::hanging();
    let upstream = spawn_upstream(mock.clone()).await;
    let proxy = spawn_proxy(Some(upstream)).await;
    let submitter = Submitter::new(Some(proxy))
        .unwrap()
        .with_timeout(Duration::from_millis(500));

    let mut form = FormState::new(valid_proposal());
    let outcome = submitter.submit(&mut form).await;

    assert_eq!(outcome, SubmitOutcome::Failed(NetworkError::Timeout));
    assert_eq!(form.status_message(), MSG_TIMEOUT);
    assert_eq!(mock.received().len(), 1);
}

#[tokio::test]
async fn test_proxy_without_upstream_makes_no_call() {
    let mock = MockUpstream::new(200, "application/json", r#"{"success":true}"#);
    let _upstream = spawn_upstream(mock.clone()).await;
    let proxy = spawn_proxy(None).await;

    let form = reqwest::multipart::Form::new().text("companyName", "Acme");
    let response = reqwest::Client::new()
        .post(&proxy)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(!body["message"].as_str().unwrap().is_empty());
    assert!(mock.received().is_empty());
}

#[tokio::test]
async fn test_unreachable_upstream_is_proxy_error() {
    let proxy = spawn_proxy(Some(closed_address().await)).await;

    let form = reqwest::multipart::Form::new().text("companyName", "Acme");
    let response = reqwest::Client::new()
        .post(&proxy)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_proxy_is_connection_failure() {
    let submitter = Submitter::new(Some(closed_address().await)).unwrap();
    let mut form = FormState::new(valid_proposal());

    let outcome = submitter.submit(&mut form).await;
    assert!(matches!(outcome, SubmitOutcome::Failed(NetworkError::Connect(_))));
    assert_eq!(form.status_message(), MSG_CONNECT);
}

#[tokio::test]
async fn test_proxy_fills_timestamp_only_when_missing() {
    let mock = MockUpstream::new(200, "application/json", r#"{"success":true}"#);
    let upstream = spawn_upstream(mock.clone()).await;
    let proxy = spawn_proxy(Some(upstream)).await;
    let client = reqwest::Client::new();

    let without = reqwest::multipart::Form::new()
        .text("companyName", "Acme")
        .text("note", "free text");
    client.post(&proxy).multipart(without).send().await.unwrap();

    let with = reqwest::multipart::Form::new()
        .text("companyName", "Acme")
        .text("clientTimestamp", "2024-01-01T00:00:00.000Z");
    client.post(&proxy).multipart(with).send().await.unwrap();

    let received = mock.received();
    let names: Vec<&str> = received[0].fields.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(names, ["companyName", "note", "clientTimestamp"]);
    assert_eq!(
        received[1].field("clientTimestamp"),
        Some("2024-01-01T00:00:00.000Z")
    );
    assert_eq!(received[1].fields.len(), 2);
}

#[tokio::test]
async fn test_resubmission_gets_new_timestamp() {
    let mock = MockUpstream::new(200, "application/json", r#"{"success":false}"#);
    let upstream = spawn_upstream(mock.clone()).await;
    let proxy = spawn_proxy(Some(upstream)).await;
    let submitter = Submitter::new(Some(proxy)).unwrap();

    let mut form = FormState::new(valid_proposal());
    submitter.submit(&mut form).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    submitter.submit(&mut form).await;

    let received = mock.received();
    assert_eq!(received.len(), 2);
    assert_ne!(
        received[0].field("clientTimestamp"),
        received[1].field("clientTimestamp")
    );
}

#[tokio::test]
async fn test_upstream_status_is_mirrored() {
    let mock = MockUpstream::new(418, "text/plain", "teapot");
    let upstream = spawn_upstream(mock).await;
    let proxy = spawn_proxy(Some(upstream)).await;

    let form = reqwest::multipart::Form::new().text("companyName", "Acme");
    let response = reqwest::Client::new()
        .post(&proxy)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 418);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"success": false, "data": "teapot"}));
}

#[tokio::test]
async fn test_malformed_json_shows_localized_status() {
    let mock = MockUpstream::new(200, "application/json", "{broken");
    let endpoint = spawn_upstream(mock).await;
    let submitter = Submitter::new(Some(endpoint)).unwrap();

    let mut form = FormState::new(valid_proposal());
    let outcome = submitter.submit(&mut form).await;

    assert!(matches!(outcome, SubmitOutcome::Failed(NetworkError::BadResponse(_))));
    assert_eq!(form.status_message(), MSG_BAD_RESPONSE);
    assert_eq!(form.status.as_ref().unwrap().level, StatusLevel::Error);
    assert_eq!(form.proposal, valid_proposal());
}
