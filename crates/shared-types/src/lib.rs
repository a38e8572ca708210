pub mod document;
pub mod envelope;
pub mod error;
pub mod types;

pub use document::Document;
pub use envelope::{Envelope, EnvelopeState, ProviderKind, RecipientStatus, StatusReport};
pub use error::ErrorKind;
pub use types::{FieldSpec, FieldType, FieldValue, Recipient, RequestError, SignatureRequest};
