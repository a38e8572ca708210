use shared_types::{EnvelopeState, ErrorKind, RequestError};
use thiserror::Error;

/// Failures of provider calls and of the signature lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Envelope not found: {0}")]
    NotFound(String),

    #[error("Envelope {envelope_id} is not ready (state: {state})")]
    NotReady {
        envelope_id: String,
        state: EnvelopeState,
    },

    #[error("Unmapped provider status: {0}")]
    UnmappedState(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("State regressed from {from} to {to}")]
    StateRegression {
        from: EnvelopeState,
        to: EnvelopeState,
    },
}

impl SignatureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SignatureError::AuthError(_) => ErrorKind::AuthError,
            SignatureError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            SignatureError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            SignatureError::NotFound(_) => ErrorKind::NotFound,
            SignatureError::NotReady { .. } => ErrorKind::NotReady,
            SignatureError::UnmappedState(_) => ErrorKind::UnmappedState,
            SignatureError::NotImplemented(_) => ErrorKind::NotImplemented,
            SignatureError::StateRegression { .. } => ErrorKind::StateRegression,
        }
    }
}

impl From<RequestError> for SignatureError {
    fn from(e: RequestError) -> Self {
        SignatureError::InvalidRequest(e.to_string())
    }
}

impl From<reqwest::Error> for SignatureError {
    fn from(e: reqwest::Error) -> Self {
        SignatureError::ProviderUnavailable(e.to_string())
    }
}
