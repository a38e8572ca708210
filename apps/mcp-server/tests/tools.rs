//! End-to-end tool calls against fixture PDFs and a scripted provider

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use docsign_core::{
    Credential, NotifierConfig, ProviderClient, ProviderRegistry, ProvidersConfig,
    SignatureError,
};
use mcp_server::mcp::tools::call_tool;
use mcp_server::{ServerConfig, SigningMcpServer};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shared_pdf::fixtures;
use shared_types::{Document, EnvelopeState, ProviderKind, SignatureRequest, StatusReport};

/// DocuSign stand-in: envelope `env-42` walks through the scripted states
struct ScriptedProvider {
    states: Mutex<Vec<EnvelopeState>>,
    sent: Arc<Mutex<Vec<SignatureRequest>>>,
    send_delay: Duration,
}

impl ScriptedProvider {
    fn new(states: &[EnvelopeState]) -> Self {
        let mut states = states.to_vec();
        states.reverse();
        Self {
            states: Mutex::new(states),
            sent: Arc::new(Mutex::new(Vec::new())),
            send_delay: Duration::ZERO,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            send_delay: delay,
            ..Self::new(&[])
        }
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn provider(&self) -> ProviderKind {
        ProviderKind::DocuSign
    }

    async fn authenticate(&self) -> Result<Credential, SignatureError> {
        Ok(Credential::new("token", Some(3600)))
    }

    async fn send(
        &self,
        _credential: &Credential,
        request: &SignatureRequest,
    ) -> Result<String, SignatureError> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        self.sent.lock().unwrap().push(request.clone());
        Ok("env-42".to_string())
    }

    async fn get_status(
        &self,
        _credential: &Credential,
        envelope_id: &str,
    ) -> Result<StatusReport, SignatureError> {
        if envelope_id != "env-42" {
            return Err(SignatureError::NotFound(format!(
                "ENVELOPE_DOES_NOT_EXIST: {}",
                envelope_id
            )));
        }
        let state = self
            .states
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(EnvelopeState::Sent);
        Ok(StatusReport::new(state, state.as_str()))
    }

    async fn download(
        &self,
        _credential: &Credential,
        envelope_id: &str,
    ) -> Result<Document, SignatureError> {
        Ok(Document::pdf(
            b"%PDF-1.7\n% signed\n".to_vec(),
            format!("https://provider.test/{}/combined", envelope_id),
        ))
    }
}

fn output_dir() -> PathBuf {
    std::env::temp_dir().join(format!("docsign-tools-{}", uuid::Uuid::new_v4()))
}

fn config() -> ServerConfig {
    ServerConfig::default().with_output_dir(output_dir())
}

fn server_with(provider: ScriptedProvider, config: ServerConfig) -> SigningMcpServer {
    let registry = ProviderRegistry::from_config(&ProvidersConfig::default())
        .unwrap()
        .with(Box::new(provider));
    SigningMcpServer::with_registry(config, registry)
}

fn server(states: &[EnvelopeState]) -> SigningMcpServer {
    server_with(ScriptedProvider::new(states), config())
}

fn sample_base64() -> String {
    STANDARD.encode(fixtures::sample_form_pdf())
}

async fn call(server: &SigningMcpServer, name: &str, args: Value) -> (Value, bool) {
    call_tool(server, name, args).await
}

#[tokio::test]
async fn test_detect_fields_from_base64() {
    let (body, is_error) = call(
        &server(&[]),
        "detect_pdf_fields",
        json!({"pdf_base64": sample_base64()}),
    )
    .await;

    assert!(!is_error, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 6);
    assert_eq!(body["message"], "Found 6 form fields");
    let names: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["full_name", "agree_to_terms", "sign_date", "state", "plan", "address.city"]
    );
    assert_eq!(body["fields"][1]["type"], "checkbox");
}

#[tokio::test]
async fn test_detect_fields_from_file_path() {
    let dir = output_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("form.pdf");
    std::fs::write(&path, fixtures::sample_form_pdf()).unwrap();

    let (body, is_error) = call(
        &server(&[]),
        "detect_pdf_fields",
        json!({"file_url": path.to_string_lossy()}),
    )
    .await;
    assert!(!is_error, "{}", body);
    assert_eq!(body["count"], 6);
}

#[tokio::test]
async fn test_detect_fields_on_plain_pdf() {
    let (body, is_error) = call(
        &server(&[]),
        "detect_pdf_fields",
        json!({"pdf_base64": STANDARD.encode(fixtures::plain_pdf())}),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["success"], false);
    assert_eq!(body["error_kind"], "UnsupportedDocument");
    assert_eq!(body["message"], "Failed to detect PDF fields");
}

#[tokio::test]
async fn test_fill_writes_flattened_output() {
    let server = server(&[]);
    let (body, is_error) = call(
        &server,
        "fill_pdf_fields",
        json!({
            "pdf_base64": sample_base64(),
            "field_values": {"full_name": "Jane Doe", "agree_to_terms": true, "state": "NY"}
        }),
    )
    .await;

    assert!(!is_error, "{}", body);
    assert_eq!(body["fields_filled"], 3);
    let url = body["filled_pdf_url"].as_str().unwrap();
    assert!(url.starts_with("file:///") && url.contains("filled_") && url.ends_with(".pdf"));

    let path = PathBuf::from(body["filled_pdf_path"].as_str().unwrap());
    let on_disk = std::fs::read(&path).unwrap();
    let inline = STANDARD
        .decode(body["filled_pdf_base64"].as_str().unwrap())
        .unwrap();
    assert_eq!(on_disk, inline);

    // A flattened document has no fields left
    let (body, is_error) = call(
        &server,
        "detect_pdf_fields",
        json!({"file_url": url}),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "UnsupportedDocument");
}

#[tokio::test]
async fn test_fill_checkbox_with_string_is_invalid_value() {
    let (body, is_error) = call(
        &server(&[]),
        "fill_pdf_fields",
        json!({"pdf_base64": sample_base64(), "field_values": {"agree_to_terms": "yes"}}),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "InvalidValue");
    assert_eq!(body["field"], "agree_to_terms");
    assert_eq!(body["expected"], "checkbox");
}

#[tokio::test]
async fn test_fill_unknown_field() {
    let (body, is_error) = call(
        &server(&[]),
        "fill_pdf_fields",
        json!({"pdf_base64": sample_base64(), "field_values": {"nickname": "JD"}}),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "UnknownField");
    assert_eq!(body["field"], "nickname");
}

#[tokio::test]
async fn test_fill_requires_field_values() {
    let (body, is_error) = call(
        &server(&[]),
        "fill_pdf_fields",
        json!({"pdf_base64": sample_base64()}),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "InvalidRequest");
}

#[tokio::test]
async fn test_send_with_legacy_recipient() {
    let provider = ScriptedProvider::new(&[]);
    let server = server_with(provider, config());
    let (body, is_error) = call(
        &server,
        "send_for_signature",
        json!({
            "pdf_base64": sample_base64(),
            "recipient_email": "alice@example.com",
            "recipient_name": "Alice"
        }),
    )
    .await;

    assert!(!is_error, "{}", body);
    assert_eq!(body["envelope_id"], "env-42");
    assert_eq!(body["status"], "sent");
    assert_eq!(body["provider"], "docusign");
    assert_eq!(body["message"], "Document sent for signature via DocuSign");
    assert_eq!(body["envelope"]["recipients"][0]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_send_uses_default_subject_and_message() {
    let provider = ScriptedProvider::new(&[]);
    let sent = provider.sent.clone();
    let server = server_with(provider, config());
    let (_, is_error) = call(
        &server,
        "send_for_signature",
        json!({
            "pdf_base64": sample_base64(),
            "recipients": [
                {"email": "alice@example.com", "name": "Alice"},
                {"email": "bob@example.com", "name": "Bob"}
            ],
            "subject": "  "
        }),
    )
    .await;
    assert!(!is_error);

    let sent = sent.lock().unwrap();
    assert_eq!(sent[0].subject, SignatureRequest::DEFAULT_SUBJECT);
    assert_eq!(sent[0].message, SignatureRequest::DEFAULT_MESSAGE);
    assert_eq!(sent[0].recipients.len(), 2);
    assert_eq!(sent[0].recipients[1].email, "bob@example.com");
    assert!(sent[0].document.looks_like_pdf());
}

#[tokio::test]
async fn test_send_rejects_invalid_recipient() {
    let (body, is_error) = call(
        &server(&[]),
        "send_for_signature",
        json!({
            "pdf_base64": sample_base64(),
            "recipients": [{"email": "not-an-email", "name": "Alice"}]
        }),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "InvalidRequest");

    let (body, _) = call(
        &server(&[]),
        "send_for_signature",
        json!({"pdf_base64": sample_base64()}),
    )
    .await;
    assert_eq!(body["error_kind"], "InvalidRequest");
    assert_eq!(body["error"], "Invalid request: At least one recipient is required");
}

#[tokio::test]
async fn test_adobe_sign_is_not_implemented() {
    let server = server(&[]);
    let (body, is_error) = call(
        &server,
        "send_for_signature",
        json!({
            "pdf_base64": sample_base64(),
            "recipient_email": "alice@example.com",
            "recipient_name": "Alice",
            "provider": "adobe_sign"
        }),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "NotImplemented");

    let (body, _) = call(
        &server,
        "check_signature_status",
        json!({"envelope_id": "abc", "provider": "adobe"}),
    )
    .await;
    assert_eq!(body["error_kind"], "NotImplemented");
}

#[tokio::test]
async fn test_unconfigured_docusign_is_auth_error() {
    let server = SigningMcpServer::new(config()).unwrap();
    let (body, is_error) = call(
        &server,
        "check_signature_status",
        json!({"envelope_id": "env-42"}),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "AuthError");
    assert_eq!(body["error"], "Authentication failed: DocuSign is not configured");
}

#[tokio::test]
async fn test_status_progression_and_regression() {
    let server = server(&[
        EnvelopeState::Delivered,
        EnvelopeState::Completed,
        EnvelopeState::Sent,
    ]);

    let (body, _) = call(
        &server,
        "check_signature_status",
        json!({"envelope_id": "env-42", "last_status": "sent"}),
    )
    .await;
    assert_eq!(body["status"], "delivered");
    assert_eq!(body["is_terminal"], false);
    assert!(body["last_checked_at"].is_string());

    let (body, _) = call(
        &server,
        "check_signature_status",
        json!({"envelope_id": "env-42", "last_status": "delivered"}),
    )
    .await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["is_terminal"], true);

    let (body, is_error) = call(
        &server,
        "check_signature_status",
        json!({"envelope_id": "env-42", "last_status": "completed"}),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "StateRegression");
}

#[tokio::test]
async fn test_status_unknown_envelope() {
    let (body, is_error) = call(
        &server(&[]),
        "check_signature_status",
        json!({"envelope_id": "nope"}),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "NotFound");

    let (body, _) = call(
        &server(&[]),
        "check_signature_status",
        json!({"envelope_id": "env-42", "last_status": "pending"}),
    )
    .await;
    assert_eq!(body["error_kind"], "InvalidRequest");
}

#[tokio::test]
async fn test_download_waits_for_completion() {
    let server = server(&[EnvelopeState::Delivered, EnvelopeState::Completed]);

    let (body, is_error) = call(
        &server,
        "download_signed_pdf",
        json!({"envelope_id": "env-42"}),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "NotReady");

    let (body, is_error) = call(
        &server,
        "download_signed_pdf",
        json!({"envelope_id": "env-42"}),
    )
    .await;
    assert!(!is_error, "{}", body);
    assert!(body["signed_pdf_url"]
        .as_str()
        .unwrap()
        .ends_with("signed_env-42.pdf"));
    assert_eq!(body["size_bytes"], 18);
    let path = PathBuf::from(body["signed_pdf_path"].as_str().unwrap());
    assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.7\n% signed\n");
}

#[tokio::test]
async fn test_send_timeout_reports_unknown_outcome() {
    let server = server_with(
        ScriptedProvider::slow(Duration::from_secs(5)),
        config().with_timeout_ms(50),
    );
    let (body, is_error) = call(
        &server,
        "send_for_signature",
        json!({
            "pdf_base64": sample_base64(),
            "recipient_email": "alice@example.com",
            "recipient_name": "Alice"
        }),
    )
    .await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "Timeout");
    assert_eq!(body["outcome"], "unknown");
}

#[tokio::test]
async fn test_notify_poke_disabled_is_skipped() {
    let (body, is_error) = call(
        &server(&[]),
        "notify_poke",
        json!({"message": "Lease signed", "attachments": ["file:///tmp/a.pdf"]}),
    )
    .await;
    assert!(!is_error);
    assert_eq!(body["success"], true);
    assert_eq!(body["delivered"], false);
    assert_eq!(body["outcome"], "skipped");

    let (body, is_error) = call(&server(&[]), "notify_poke", json!({"message": " "})).await;
    assert!(is_error);
    assert_eq!(body["error_kind"], "InvalidRequest");
}

#[tokio::test]
async fn test_notifier_failure_never_fails_the_operation() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = format!("http://{}/hook", listener.local_addr().unwrap());
    drop(listener);

    let mut config = config();
    config.notifier = NotifierConfig::new(dead, Some("key".to_string()));
    let server = server_with(ScriptedProvider::new(&[]), config);

    let (body, is_error) = call(
        &server,
        "notify_poke",
        json!({"message": "hello", "thread_ref": "t-1"}),
    )
    .await;
    assert!(!is_error);
    assert_eq!(body["success"], true);
    assert_eq!(body["outcome"], "failed");

    let (body, is_error) = call(
        &server,
        "send_for_signature",
        json!({
            "pdf_base64": sample_base64(),
            "recipient_email": "alice@example.com",
            "recipient_name": "Alice",
            "thread_ref": "t-1"
        }),
    )
    .await;
    assert!(!is_error, "{}", body);
    assert_eq!(body["envelope_id"], "env-42");
}
