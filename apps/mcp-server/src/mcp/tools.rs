//! MCP tool definitions and handlers
//!
//! Every tool answers with a JSON object carrying `success`. Failures add
//! `error`, `error_kind` and a human readable `message`, and are returned
//! as `isError` tool results rather than JSON-RPC errors.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine};
use docsign_core::{Notification, NotifyOutcome};
use serde::Deserialize;
use serde_json::{json, Value};
use shared_pdf::FormError;
use shared_types::{Envelope, EnvelopeState, FieldValue, Recipient, SignatureRequest};

use super::protocol::Tool;
use super::server::SigningMcpServer;
use crate::error::ServerError;
use crate::loader::DocumentSource;
use crate::output;

pub const TOOL_NAMES: [&str; 6] = [
    "detect_pdf_fields",
    "fill_pdf_fields",
    "send_for_signature",
    "check_signature_status",
    "download_signed_pdf",
    "notify_poke",
];

const DEFAULT_PROVIDER: &str = "docusign";

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn document_properties() -> Value {
    json!({
        "file_url": {
            "type": "string",
            "description": "http(s):// URL, file:// URL or local path of the PDF"
        },
        "pdf_base64": {
            "type": "string",
            "description": "Base64-encoded PDF, used instead of file_url"
        }
    })
}

fn with_document(mut properties: Value) -> Value {
    if let (Some(target), Value::Object(document)) =
        (properties.as_object_mut(), document_properties())
    {
        target.extend(document);
    }
    properties
}

/// Get all tool definitions
pub fn get_tool_definitions() -> Vec<Tool> {
    let provider = json!({
        "type": "string",
        "enum": ["docusign", "adobe_sign"],
        "default": DEFAULT_PROVIDER,
        "description": "Signature provider"
    });
    let thread_ref = json!({
        "type": "string",
        "description": "Conversation reference attached to progress notifications"
    });
    let envelope_id = json!({
        "type": "string",
        "description": "Envelope ID returned by send_for_signature"
    });

    vec![
        Tool {
            name: "detect_pdf_fields".to_string(),
            description: Some("Detect the fillable form fields of a PDF document".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": document_properties()
            }),
        },
        Tool {
            name: "fill_pdf_fields".to_string(),
            description: Some(
                "Fill form fields of a PDF and flatten the result into static content"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": with_document(json!({
                    "field_values": {
                        "type": "object",
                        "description": "Field name to value; checkboxes take booleans, text fields strings or numbers",
                        "additionalProperties": {"type": ["string", "number", "boolean"]}
                    },
                    "thread_ref": thread_ref
                })),
                "required": ["field_values"]
            }),
        },
        Tool {
            name: "send_for_signature".to_string(),
            description: Some("Send a document for e-signature".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": with_document(json!({
                    "recipients": {
                        "type": "array",
                        "description": "Signers in routing order",
                        "items": {
                            "type": "object",
                            "properties": {
                                "email": {"type": "string"},
                                "name": {"type": "string"}
                            },
                            "required": ["email", "name"]
                        }
                    },
                    "recipient_email": {
                        "type": "string",
                        "description": "Single signer email, when recipients is not given"
                    },
                    "recipient_name": {
                        "type": "string",
                        "description": "Single signer name, when recipients is not given"
                    },
                    "subject": {
                        "type": "string",
                        "description": "Email subject",
                        "default": SignatureRequest::DEFAULT_SUBJECT
                    },
                    "message": {
                        "type": "string",
                        "description": "Email message body",
                        "default": SignatureRequest::DEFAULT_MESSAGE
                    },
                    "provider": provider,
                    "thread_ref": thread_ref
                }))
            }),
        },
        Tool {
            name: "check_signature_status".to_string(),
            description: Some("Check the status of a signature request".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "envelope_id": envelope_id,
                    "provider": provider,
                    "last_status": {
                        "type": "string",
                        "enum": ["sent", "delivered", "completed", "declined", "voided", "error"],
                        "description": "Status seen on the previous check; a regression is reported as an error"
                    },
                    "thread_ref": thread_ref
                },
                "required": ["envelope_id"]
            }),
        },
        Tool {
            name: "download_signed_pdf".to_string(),
            description: Some(
                "Download the signed PDF of a completed signature request".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "envelope_id": envelope_id,
                    "provider": provider,
                    "thread_ref": thread_ref
                },
                "required": ["envelope_id"]
            }),
        },
        Tool {
            name: "notify_poke".to_string(),
            description: Some("Send a progress notification to the Poke inbox".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string", "description": "Notification text"},
                    "attachments": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "URLs of related files"
                    },
                    "thread_ref": thread_ref
                },
                "required": ["message"]
            }),
        },
    ]
}

/// Run a tool under the server's timeout.
///
/// Returns the result body and whether it is an error.
pub async fn call_tool(server: &SigningMcpServer, name: &str, arguments: Value) -> (Value, bool) {
    let timeout_ms = server.timeout_ms();
    let started = Instant::now();
    let result = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        handle_tool_call(server, name, arguments),
    )
    .await;

    match result {
        Ok(Ok(body)) => {
            tracing::info!("Tool {} succeeded in {:?}", name, started.elapsed());
            (body, false)
        }
        Ok(Err(e)) => {
            tracing::warn!("Tool {} failed: {}", name, e);
            (failure_body(name, &e), true)
        }
        Err(_) => {
            tracing::warn!("Tool {} timed out after {}ms", name, timeout_ms);
            (timeout_body(name, timeout_ms), true)
        }
    }
}

/// Handle a tool call
pub async fn handle_tool_call(
    server: &SigningMcpServer,
    name: &str,
    arguments: Value,
) -> Result<Value, ServerError> {
    match name {
        "detect_pdf_fields" => handle_detect_pdf_fields(server, arguments).await,
        "fill_pdf_fields" => handle_fill_pdf_fields(server, arguments).await,
        "send_for_signature" => handle_send_for_signature(server, arguments).await,
        "check_signature_status" => handle_check_signature_status(server, arguments).await,
        "download_signed_pdf" => handle_download_signed_pdf(server, arguments).await,
        "notify_poke" => handle_notify_poke(server, arguments).await,
        _ => Err(ServerError::UnknownTool(name.to_string())),
    }
}

fn failure_message(tool: &str) -> &'static str {
    match tool {
        "detect_pdf_fields" => "Failed to detect PDF fields",
        "fill_pdf_fields" => "Failed to fill PDF fields",
        "send_for_signature" => "Failed to send document for signature",
        "check_signature_status" => "Failed to check signature status",
        "download_signed_pdf" => "Failed to download signed PDF",
        "notify_poke" => "Failed to send notification",
        _ => "Tool call failed",
    }
}

fn failure_body(tool: &str, err: &ServerError) -> Value {
    let mut body = json!({
        "success": false,
        "error": err.to_string(),
        "error_kind": err.error_kind(),
        "message": failure_message(tool),
    });
    match err {
        ServerError::Form(FormError::UnknownField(field)) => {
            body["field"] = json!(field);
        }
        ServerError::Form(FormError::InvalidValue(field, expected)) => {
            body["field"] = json!(field);
            body["expected"] = json!(expected);
        }
        _ => {}
    }
    body
}

fn timeout_body(tool: &str, timeout_ms: u64) -> Value {
    let err = ServerError::Timeout(timeout_ms);
    let mut body = failure_body(tool, &err);
    if tool == "send_for_signature" {
        // The provider may have accepted the envelope before the deadline
        body["outcome"] = json!("unknown");
        body["message"] = json!(
            "Timed out waiting for the provider; the envelope may have been created. \
             Do not resend blindly: reconcile via check_signature_status once the \
             envelope id is known."
        );
    }
    body
}

async fn blocking<T, F>(task: F) -> Result<T, ServerError>
where
    F: FnOnce() -> Result<T, FormError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ServerError::ProtocolError(format!("PDF task failed: {}", e)))?
        .map_err(ServerError::from)
}

async fn handle_detect_pdf_fields(
    server: &SigningMcpServer,
    args: Value,
) -> Result<Value, ServerError> {
    let source: DocumentSource = serde_json::from_value(args)?;
    let document = source.load(server.http()).await?;
    let fields = blocking(move || shared_pdf::detect_fields(&document)).await?;

    Ok(json!({
        "success": true,
        "fields": fields,
        "count": fields.len(),
        "message": format!("Found {} form fields", fields.len())
    }))
}

#[derive(Debug, Deserialize)]
struct FillArgs {
    #[serde(flatten)]
    source: DocumentSource,
    field_values: BTreeMap<String, FieldValue>,
    #[serde(default)]
    thread_ref: Option<String>,
}

async fn handle_fill_pdf_fields(
    server: &SigningMcpServer,
    args: Value,
) -> Result<Value, ServerError> {
    let args: FillArgs = serde_json::from_value(args)?;
    let document = args.source.load(server.http()).await?;
    let source_name = document.file_name().to_string();
    let count = args.field_values.len();

    let values = args.field_values;
    let filled = blocking(move || shared_pdf::fill_and_flatten(&document, &values)).await?;
    let stored = output::store_filled(server.output_dir(), &filled).await?;

    server.notifier().dispatch(
        Notification::new(format!("Filled {} field(s) in {}", count, source_name))
            .with_thread_ref(args.thread_ref)
            .with_attachments(vec![stored.url.clone()]),
    );

    Ok(json!({
        "success": true,
        "filled_pdf_url": stored.url,
        "filled_pdf_path": stored.path.display().to_string(),
        "filled_pdf_base64": STANDARD.encode(filled.bytes()),
        "fields_filled": count,
        "message": format!("Successfully filled {} fields", count)
    }))
}

#[derive(Debug, Deserialize)]
struct SendArgs {
    #[serde(flatten)]
    source: DocumentSource,
    #[serde(default)]
    recipients: Vec<Recipient>,
    #[serde(default)]
    recipient_email: Option<String>,
    #[serde(default)]
    recipient_name: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default = "default_provider")]
    provider: String,
    #[serde(default)]
    thread_ref: Option<String>,
}

impl SendArgs {
    /// `recipients` wins; otherwise the single legacy recipient, if any
    fn recipients(&self) -> Vec<Recipient> {
        if !self.recipients.is_empty() {
            return self.recipients.clone();
        }
        match &self.recipient_email {
            Some(email) => vec![Recipient::new(
                email.clone(),
                self.recipient_name.clone().unwrap_or_default(),
            )],
            None => Vec::new(),
        }
    }
}

async fn handle_send_for_signature(
    server: &SigningMcpServer,
    args: Value,
) -> Result<Value, ServerError> {
    let args: SendArgs = serde_json::from_value(args)?;
    let recipients = args.recipients();
    let document = args.source.load(server.http()).await?;
    let document_name = document.file_name().to_string();

    let mut request = SignatureRequest::new(recipients, document);
    if let Some(subject) = args.subject.as_deref().filter(|s| !s.trim().is_empty()) {
        request = request.with_subject(subject);
    }
    if let Some(message) = args.message.as_deref().filter(|m| !m.trim().is_empty()) {
        request = request.with_message(message);
    }

    let envelope = server
        .lifecycle()
        .request_signature(&args.provider, request)
        .await?;
    let provider_name = envelope.provider.display_name();

    let signers: Vec<&str> = envelope.recipients.iter().map(|r| r.email.as_str()).collect();
    server.notifier().dispatch(
        Notification::new(format!(
            "Sent {} for signature to {} via {} (envelope {})",
            document_name,
            signers.join(", "),
            provider_name,
            envelope.envelope_id
        ))
        .with_thread_ref(args.thread_ref.or_else(|| Some(envelope.envelope_id.clone()))),
    );

    Ok(json!({
        "success": true,
        "envelope_id": envelope.envelope_id,
        "provider": envelope.provider,
        "status": envelope.state,
        "envelope": envelope,
        "message": format!("Document sent for signature via {}", provider_name)
    }))
}

#[derive(Debug, Deserialize)]
struct EnvelopeArgs {
    envelope_id: String,
    #[serde(default = "default_provider")]
    provider: String,
    #[serde(default)]
    last_status: Option<String>,
    #[serde(default)]
    thread_ref: Option<String>,
}

impl EnvelopeArgs {
    fn thread_ref(&self) -> Option<String> {
        self.thread_ref
            .clone()
            .or_else(|| Some(self.envelope_id.clone()))
    }
}

fn status_body(envelope: &Envelope) -> Value {
    json!({
        "success": true,
        "envelope_id": envelope.envelope_id,
        "provider": envelope.provider,
        "status": envelope.state,
        "native_status": envelope.native_status,
        "is_terminal": envelope.is_terminal(),
        "recipients": envelope.recipients,
        "created_at": envelope.created_at,
        "completed_at": envelope.completed_at,
        "last_checked_at": envelope.last_checked_at,
        "message": format!("Signature status: {}", envelope.state)
    })
}

async fn handle_check_signature_status(
    server: &SigningMcpServer,
    args: Value,
) -> Result<Value, ServerError> {
    let args: EnvelopeArgs = serde_json::from_value(args)?;
    let last_status = args
        .last_status
        .as_deref()
        .map(|s| {
            s.parse::<EnvelopeState>()
                .map_err(|s| ServerError::InvalidArgument(format!("Unknown last_status: {}", s)))
        })
        .transpose()?;

    let envelope = match last_status {
        Some(last) => {
            server
                .lifecycle()
                .check_status_since(&args.provider, &args.envelope_id, last)
                .await?
        }
        None => {
            server
                .lifecycle()
                .check_status(&args.provider, &args.envelope_id)
                .await?
        }
    };

    if last_status.is_some_and(|last| last != envelope.state) {
        server.notifier().dispatch(
            Notification::new(format!(
                "Envelope {} is now {}",
                envelope.envelope_id, envelope.state
            ))
            .with_thread_ref(args.thread_ref()),
        );
    }

    Ok(status_body(&envelope))
}

async fn handle_download_signed_pdf(
    server: &SigningMcpServer,
    args: Value,
) -> Result<Value, ServerError> {
    let args: EnvelopeArgs = serde_json::from_value(args)?;
    let document = server
        .lifecycle()
        .retrieve_signed(&args.provider, &args.envelope_id)
        .await?;
    let stored = output::store_signed(server.output_dir(), &args.envelope_id, &document).await?;

    server.notifier().dispatch(
        Notification::new(format!(
            "Signed document for envelope {} is ready",
            args.envelope_id
        ))
        .with_thread_ref(args.thread_ref())
        .with_attachments(vec![stored.url.clone()]),
    );

    Ok(json!({
        "success": true,
        "envelope_id": args.envelope_id,
        "signed_pdf_url": stored.url,
        "signed_pdf_path": stored.path.display().to_string(),
        "signed_pdf_base64": STANDARD.encode(document.bytes()),
        "size_bytes": document.len(),
        "message": "Signed PDF downloaded successfully"
    }))
}

#[derive(Debug, Deserialize)]
struct NotifyArgs {
    message: String,
    #[serde(default)]
    attachments: Vec<String>,
    #[serde(default)]
    thread_ref: Option<String>,
}

async fn handle_notify_poke(server: &SigningMcpServer, args: Value) -> Result<Value, ServerError> {
    let args: NotifyArgs = serde_json::from_value(args)?;
    if args.message.trim().is_empty() {
        return Err(ServerError::InvalidArgument("message is required".to_string()));
    }

    let notification = Notification::new(args.message)
        .with_thread_ref(args.thread_ref)
        .with_attachments(args.attachments);
    let outcome = server.notifier().notify(&notification).await;

    // Delivery is best effort: the call itself succeeds either way
    let body = match outcome {
        NotifyOutcome::Delivered => json!({
            "success": true,
            "delivered": true,
            "outcome": "delivered",
            "message": "Notification sent to Poke successfully"
        }),
        NotifyOutcome::Skipped => json!({
            "success": true,
            "delivered": false,
            "outcome": "skipped",
            "message": "Notifications are disabled (POKE_API_KEY is not set)"
        }),
        NotifyOutcome::Swallowed(reason) => json!({
            "success": true,
            "delivered": false,
            "outcome": "failed",
            "reason": reason,
            "message": "Notification could not be delivered"
        }),
    };
    Ok(body)
}
