use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized failure taxonomy shared by the form adapter, the signature
/// lifecycle and the tool dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AuthError,
    ProviderUnavailable,
    InvalidRequest,
    NotFound,
    NotReady,
    UnmappedState,
    NotImplemented,
    UnsupportedDocument,
    Corrupt,
    UnknownField,
    InvalidValue,
    StateRegression,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthError => "AuthError",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::NotReady => "NotReady",
            ErrorKind::UnmappedState => "UnmappedState",
            ErrorKind::NotImplemented => "NotImplemented",
            ErrorKind::UnsupportedDocument => "UnsupportedDocument",
            ErrorKind::Corrupt => "Corrupt",
            ErrorKind::UnknownField => "UnknownField",
            ErrorKind::InvalidValue => "InvalidValue",
            ErrorKind::StateRegression => "StateRegression",
            ErrorKind::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
