//! DocuSign eSignature REST API v2.1 client

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use shared_types::{
    Document, EnvelopeState, ProviderKind, RecipientStatus, SignatureRequest, StatusReport,
};

use super::{Credential, ProviderClient};
use crate::config::DocuSignConfig;
use crate::error::SignatureError;

/// DocuSign rejects documents above 25 MiB
pub const MAX_DOCUMENT_BYTES: usize = 25 * 1024 * 1024;

const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const JWT_SCOPE: &str = "signature impersonation";
const JWT_LIFETIME_SECS: i64 = 3600;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const AUTH_ERROR_CODES: &[&str] = &[
    "USER_AUTHENTICATION_FAILED",
    "AUTHORIZATION_INVALID_TOKEN",
    "PARTNER_AUTHENTICATION_FAILED",
];
const NOT_FOUND_CODES: &[&str] = &["ENVELOPE_DOES_NOT_EXIST", "INVALID_ENVELOPE_ID"];

/// Map a DocuSign envelope status onto the canonical state.
///
/// `signed` means every signer has signed but the envelope has not been
/// sealed yet, so it is still `delivered` from the caller's perspective.
pub fn map_docusign_status(native: &str) -> Result<EnvelopeState, SignatureError> {
    match native.to_ascii_lowercase().as_str() {
        "sent" => Ok(EnvelopeState::Sent),
        "delivered" | "signed" => Ok(EnvelopeState::Delivered),
        "completed" => Ok(EnvelopeState::Completed),
        "declined" => Ok(EnvelopeState::Declined),
        "voided" => Ok(EnvelopeState::Voided),
        _ => Err(SignatureError::UnmappedState(native.to_string())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    error_code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Translate a failed REST response into the error taxonomy
fn classify_api_error(status: StatusCode, body: &str) -> SignatureError {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|b| b.error_code.clone())
        .unwrap_or_default();
    let detail = match parsed.as_ref().and_then(|b| b.message.clone()) {
        Some(message) if !code.is_empty() => format!("{}: {}", code, message),
        Some(message) => message,
        None if !code.is_empty() => code.clone(),
        None => format!("HTTP {}", status.as_u16()),
    };

    if NOT_FOUND_CODES.contains(&code.as_str()) || status == StatusCode::NOT_FOUND {
        return SignatureError::NotFound(detail);
    }
    if AUTH_ERROR_CODES.contains(&code.as_str())
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return SignatureError::AuthError(detail);
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return SignatureError::ProviderUnavailable(detail);
    }
    SignatureError::InvalidRequest(detail)
}

fn classify_oauth_error(status: StatusCode, body: &str) -> SignatureError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return SignatureError::ProviderUnavailable(format!(
            "OAuth endpoint returned HTTP {}",
            status.as_u16()
        ));
    }
    let parsed: Option<OAuthErrorBody> = serde_json::from_str(body).ok();
    let error = parsed
        .as_ref()
        .and_then(|b| b.error.clone())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    match parsed.and_then(|b| b.error_description) {
        Some(description) => SignatureError::AuthError(format!("{}: {}", error, description)),
        None if error == "consent_required" => SignatureError::AuthError(
            "consent_required: grant consent for the integration key to impersonate the user"
                .to_string(),
        ),
        None => SignatureError::AuthError(error),
    }
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    scope: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeDefinition<'a> {
    email_subject: &'a str,
    email_blurb: &'a str,
    status: &'static str,
    documents: Vec<DocumentDefinition<'a>>,
    recipients: RecipientsDefinition<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentDefinition<'a> {
    document_base64: String,
    name: &'a str,
    file_extension: &'static str,
    document_id: &'static str,
}

#[derive(Debug, Serialize)]
struct RecipientsDefinition<'a> {
    signers: Vec<SignerDefinition<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignerDefinition<'a> {
    email: &'a str,
    name: &'a str,
    recipient_id: String,
    routing_order: String,
    tabs: TabsDefinition,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TabsDefinition {
    sign_here_tabs: Vec<SignHereTab>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignHereTab {
    document_id: &'static str,
    page_number: &'static str,
    recipient_id: String,
    tab_label: String,
    x_position: String,
    y_position: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeSummary {
    envelope_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeResponse {
    status: String,
    created_date_time: Option<String>,
    completed_date_time: Option<String>,
    #[serde(default)]
    recipients: Option<EnvelopeRecipients>,
}

#[derive(Debug, Default, Deserialize)]
struct EnvelopeRecipients {
    #[serde(default)]
    signers: Vec<SignerResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignerResponse {
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    status: Option<String>,
    signed_date_time: Option<String>,
}

impl EnvelopeResponse {
    fn into_report(self) -> Result<StatusReport, SignatureError> {
        let state = map_docusign_status(&self.status)?;
        let mut report = StatusReport::new(state, self.status);
        report.created_at = parse_timestamp(self.created_date_time.as_deref());
        report.completed_at = parse_timestamp(self.completed_date_time.as_deref());
        report.recipients = self
            .recipients
            .unwrap_or_default()
            .signers
            .into_iter()
            .map(|signer| RecipientStatus {
                signed_at: parse_timestamp(signer.signed_date_time.as_deref()),
                email: signer.email,
                name: signer.name,
                status: signer.status,
            })
            .collect();
        Ok(report)
    }
}

/// DocuSign client using the JWT-bearer grant
#[derive(Debug, Clone)]
pub struct DocuSignClient {
    config: DocuSignConfig,
    http: reqwest::Client,
}

impl DocuSignClient {
    pub fn new(config: DocuSignConfig) -> Result<Self, SignatureError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SignatureError::ProviderUnavailable(e.to_string()))?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: DocuSignConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// DocuSign envelope ids are GUIDs; anything else cannot exist there and
    /// is never interpolated into a request path.
    fn envelope_url(&self, envelope_id: &str) -> Result<String, SignatureError> {
        if envelope_id.trim().is_empty() {
            return Err(SignatureError::InvalidRequest(
                "Envelope id is required".to_string(),
            ));
        }
        if !envelope_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(SignatureError::NotFound(format!(
                "No envelope with id {:?}",
                envelope_id
            )));
        }
        Ok(format!("{}/{}", self.config.envelopes_url(), envelope_id))
    }

    fn assertion(&self) -> Result<String, SignatureError> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            iss: &self.config.integration_key,
            sub: &self.config.user_id,
            aud: self.config.oauth_audience(),
            iat: now,
            exp: now + JWT_LIFETIME_SECS,
            scope: JWT_SCOPE,
        };
        let key = EncodingKey::from_rsa_pem(self.config.private_key_pem().as_bytes())
            .map_err(|e| SignatureError::AuthError(format!("Invalid RSA private key: {}", e)))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SignatureError::AuthError(format!("Failed to sign JWT assertion: {}", e)))
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, SignatureError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = classify_api_error(status, &body);
        tracing::debug!("DocuSign returned HTTP {}: {}", status.as_u16(), err);
        Err(err)
    }
}

#[async_trait]
impl ProviderClient for DocuSignClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::DocuSign
    }

    async fn authenticate(&self) -> Result<Credential, SignatureError> {
        let assertion = self.assertion()?;
        let response = self
            .http
            .post(self.config.token_url())
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_oauth_error(status, &body));
        }
        let token: TokenResponse = response.json().await.map_err(|e| {
            SignatureError::AuthError(format!("Unexpected OAuth token response: {}", e))
        })?;
        tracing::debug!("Obtained DocuSign access token");
        Ok(Credential::new(token.access_token, token.expires_in))
    }

    async fn send(
        &self,
        credential: &Credential,
        request: &SignatureRequest,
    ) -> Result<String, SignatureError> {
        if request.document.len() > MAX_DOCUMENT_BYTES {
            return Err(SignatureError::InvalidRequest(format!(
                "Document is {} bytes; DocuSign accepts at most {} bytes",
                request.document.len(),
                MAX_DOCUMENT_BYTES
            )));
        }

        let signers = request
            .recipients
            .iter()
            .enumerate()
            .map(|(index, recipient)| {
                let recipient_id = (index + 1).to_string();
                SignerDefinition {
                    email: recipient.email.trim(),
                    name: recipient.name.trim(),
                    routing_order: recipient_id.clone(),
                    tabs: TabsDefinition {
                        sign_here_tabs: vec![SignHereTab {
                            document_id: "1",
                            page_number: "1",
                            recipient_id: recipient_id.clone(),
                            tab_label: format!("SignHere{}", recipient_id),
                            x_position: "100".to_string(),
                            y_position: (100 + 60 * index).to_string(),
                        }],
                    },
                    recipient_id,
                }
            })
            .collect();

        let definition = EnvelopeDefinition {
            email_subject: &request.subject,
            email_blurb: &request.message,
            status: "sent",
            documents: vec![DocumentDefinition {
                document_base64: STANDARD.encode(request.document.bytes()),
                name: request.document.file_name(),
                file_extension: "pdf",
                document_id: "1",
            }],
            recipients: RecipientsDefinition { signers },
        };

        let response = self
            .http
            .post(self.config.envelopes_url())
            .bearer_auth(credential.access_token())
            .json(&definition)
            .send()
            .await?;
        let summary: EnvelopeSummary = Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                SignatureError::ProviderUnavailable(format!("Malformed response: {}", e))
            })?;

        tracing::info!(
            "DocuSign envelope {} sent to {} recipient(s)",
            summary.envelope_id,
            request.recipients.len()
        );
        Ok(summary.envelope_id)
    }

    async fn get_status(
        &self,
        credential: &Credential,
        envelope_id: &str,
    ) -> Result<StatusReport, SignatureError> {
        let response = self
            .http
            .get(self.envelope_url(envelope_id)?)
            .query(&[("include", "recipients")])
            .bearer_auth(credential.access_token())
            .send()
            .await?;
        let envelope: EnvelopeResponse = Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                SignatureError::ProviderUnavailable(format!("Malformed response: {}", e))
            })?;

        envelope.into_report().inspect_err(|err| {
            tracing::warn!("Envelope {}: {}", envelope_id, err);
        })
    }

    async fn download(
        &self,
        credential: &Credential,
        envelope_id: &str,
    ) -> Result<Document, SignatureError> {
        let url = format!("{}/documents/combined", self.envelope_url(envelope_id)?);
        let response = self
            .http
            .get(&url)
            .bearer_auth(credential.access_token())
            .send()
            .await?;
        let bytes = Self::checked(response).await?.bytes().await?;
        let document = Document::pdf(bytes.to_vec(), url);
        if !document.looks_like_pdf() {
            return Err(SignatureError::ProviderUnavailable(
                "Combined document is not a PDF".to_string(),
            ));
        }
        Ok(document)
    }

    async fn cancel(
        &self,
        credential: &Credential,
        envelope_id: &str,
        reason: &str,
    ) -> Result<(), SignatureError> {
        let response = self
            .http
            .put(self.envelope_url(envelope_id)?)
            .bearer_auth(credential.access_token())
            .json(&serde_json::json!({
                "status": "voided",
                "voidedReason": reason,
            }))
            .send()
            .await?;
        Self::checked(response).await?;
        tracing::info!("DocuSign envelope {} voided", envelope_id);
        Ok(())
    }
}
