//! Signature provider clients
//!
//! Each client speaks one provider's API and maps its answers onto the
//! canonical envelope states and [`SignatureError`] taxonomy. No operation
//! retries internally.

mod docusign;
mod placeholder;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use shared_types::{Document, ProviderKind, SignatureRequest, StatusReport};

use crate::error::SignatureError;

pub use docusign::{map_docusign_status, DocuSignClient, MAX_DOCUMENT_BYTES};
pub use placeholder::{UnconfiguredProvider, UnimplementedProvider};

/// A short-lived access token
#[derive(Clone)]
pub struct Credential {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_in_secs: Option<i64>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// One e-signature provider
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Obtain a fresh credential. Callers must not assume a lifetime.
    async fn authenticate(&self) -> Result<Credential, SignatureError>;

    /// Create and send an envelope, returning the provider's envelope id
    async fn send(
        &self,
        credential: &Credential,
        request: &SignatureRequest,
    ) -> Result<String, SignatureError>;

    async fn get_status(
        &self,
        credential: &Credential,
        envelope_id: &str,
    ) -> Result<StatusReport, SignatureError>;

    /// Fetch the combined signed document. Only meaningful once the
    /// envelope is completed; the lifecycle checks that first.
    async fn download(
        &self,
        credential: &Credential,
        envelope_id: &str,
    ) -> Result<Document, SignatureError>;

    async fn cancel(
        &self,
        _credential: &Credential,
        _envelope_id: &str,
        _reason: &str,
    ) -> Result<(), SignatureError> {
        Err(SignatureError::NotImplemented(format!(
            "{} does not support cancellation",
            self.provider().display_name()
        )))
    }
}
