//! Signature request lifecycle
//!
//! ```text
//! request_signature ──► sent ──► delivered ──► completed ──► retrieve_signed
//!                        │           │
//!                        ├───────────┴──► declined
//!                        └──────────────► voided
//! ```
//!
//! State only moves on provider responses. Nothing is cached between
//! calls: every operation authenticates afresh and asks the provider.

use std::sync::Arc;

use chrono::Utc;
use shared_types::{Document, Envelope, EnvelopeState, SignatureRequest};

use crate::error::SignatureError;
use crate::provider::ProviderClient;
use crate::registry::ProviderRegistry;

#[derive(Clone)]
pub struct SignatureLifecycle {
    registry: Arc<ProviderRegistry>,
}

impl SignatureLifecycle {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    fn require_id(envelope_id: &str) -> Result<(), SignatureError> {
        if envelope_id.trim().is_empty() {
            return Err(SignatureError::InvalidRequest(
                "envelope_id is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate, authenticate and send. Returns an envelope in `sent`.
    pub async fn request_signature(
        &self,
        provider: &str,
        request: SignatureRequest,
    ) -> Result<Envelope, SignatureError> {
        request.validate()?;
        let client = self.registry.resolve(provider)?;
        let credential = client.authenticate().await?;
        let envelope_id = client.send(&credential, &request).await?;
        if envelope_id.trim().is_empty() {
            return Err(SignatureError::ProviderUnavailable(
                "provider returned an empty envelope id".to_string(),
            ));
        }

        tracing::info!(
            "Envelope {} sent via {} to {} recipient(s)",
            envelope_id,
            client.provider(),
            request.recipients.len()
        );
        Ok(Envelope::sent(
            client.provider(),
            envelope_id,
            &request.recipients,
            Utc::now(),
        ))
    }

    /// Poll the provider for the envelope's current state
    pub async fn check_status(
        &self,
        provider: &str,
        envelope_id: &str,
    ) -> Result<Envelope, SignatureError> {
        Self::require_id(envelope_id)?;
        let client = self.registry.resolve(provider)?;
        observe(client, envelope_id).await
    }

    /// Like [`check_status`](Self::check_status), but fails with
    /// `StateRegression` when the reported state cannot follow
    /// `last_observed`.
    pub async fn check_status_since(
        &self,
        provider: &str,
        envelope_id: &str,
        last_observed: EnvelopeState,
    ) -> Result<Envelope, SignatureError> {
        let envelope = self.check_status(provider, envelope_id).await?;
        if !last_observed.can_transition_to(envelope.state) {
            tracing::warn!(
                "Envelope {} regressed from {} to {}",
                envelope_id,
                last_observed,
                envelope.state
            );
            return Err(SignatureError::StateRegression {
                from: last_observed,
                to: envelope.state,
            });
        }
        if last_observed != envelope.state {
            tracing::info!(
                "Envelope {} moved {} -> {}",
                envelope_id,
                last_observed,
                envelope.state
            );
        }
        Ok(envelope)
    }

    /// Download the signed document, re-checking that the envelope is
    /// completed first.
    pub async fn retrieve_signed(
        &self,
        provider: &str,
        envelope_id: &str,
    ) -> Result<Document, SignatureError> {
        Self::require_id(envelope_id)?;
        let client = self.registry.resolve(provider)?;
        let credential = client.authenticate().await?;

        let report = client.get_status(&credential, envelope_id).await?;
        if report.state != EnvelopeState::Completed {
            return Err(SignatureError::NotReady {
                envelope_id: envelope_id.to_string(),
                state: report.state,
            });
        }

        let document = client.download(&credential, envelope_id).await?;
        tracing::info!(
            "Retrieved signed document for envelope {} ({} bytes)",
            envelope_id,
            document.len()
        );
        Ok(document)
    }

    pub async fn cancel_signature(
        &self,
        provider: &str,
        envelope_id: &str,
        reason: &str,
    ) -> Result<(), SignatureError> {
        Self::require_id(envelope_id)?;
        let client = self.registry.resolve(provider)?;
        let credential = client.authenticate().await?;
        client.cancel(&credential, envelope_id, reason).await?;
        tracing::info!("Envelope {} cancelled via {}", envelope_id, client.provider());
        Ok(())
    }
}

async fn observe(
    client: &dyn ProviderClient,
    envelope_id: &str,
) -> Result<Envelope, SignatureError> {
    let credential = client.authenticate().await?;
    let report = client.get_status(&credential, envelope_id).await?;
    tracing::debug!(
        "Envelope {} is {} ({})",
        envelope_id,
        report.state,
        report.native_status
    );
    Ok(Envelope::observed(
        client.provider(),
        envelope_id,
        report,
        Utc::now(),
    ))
}
