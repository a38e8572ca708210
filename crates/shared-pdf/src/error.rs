use shared_types::{ErrorKind, FieldType};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Unsupported document: {0}")]
    UnsupportedDocument(String),

    #[error("Failed to parse PDF: {0}")]
    Corrupt(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value for field '{0}': expected {1}")]
    InvalidValue(String, FieldType),
}

impl FormError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormError::UnsupportedDocument(_) => ErrorKind::UnsupportedDocument,
            FormError::Corrupt(_) => ErrorKind::Corrupt,
            FormError::UnknownField(_) => ErrorKind::UnknownField,
            FormError::InvalidValue(..) => ErrorKind::InvalidValue,
        }
    }
}

impl From<lopdf::Error> for FormError {
    fn from(e: lopdf::Error) -> Self {
        FormError::Corrupt(e.to_string())
    }
}
