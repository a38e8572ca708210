use std::fmt;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Document;

/// Kind of an interactive form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Checkbox,
    Radio,
    Choice,
    Date,
    Signature,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Choice => "choice",
            FieldType::Date => "date",
            FieldType::Signature => "signature",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value supplied for (or read from) a form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Render the value the way it is drawn into a flattened page
    pub fn display_text(&self) -> String {
        match self {
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

/// A detected form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Fully qualified field name (dotted for nested fields)
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<FieldValue>,
    /// Allowed values for choice and radio fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    pub name: String,
}

impl Recipient {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("At least one recipient is required")]
    NoRecipients,

    #[error("Recipient {index} has an invalid email address: {email}")]
    InvalidEmail { index: usize, email: String },

    #[error("Recipient {index} has an empty name")]
    EmptyName { index: usize },

    #[error("Document is empty")]
    EmptyDocument,
}

/// Everything a provider needs to route a document for signature.
///
/// Recipient order is the signing order for providers that support
/// sequential routing.
#[derive(Debug, Clone)]
pub struct SignatureRequest {
    pub recipients: Vec<Recipient>,
    pub subject: String,
    pub message: String,
    pub document: Document,
}

impl SignatureRequest {
    pub const DEFAULT_SUBJECT: &'static str = "Please sign this document";
    pub const DEFAULT_MESSAGE: &'static str = "Please review and sign this document.";

    pub fn new(recipients: Vec<Recipient>, document: Document) -> Self {
        Self {
            recipients,
            subject: Self::DEFAULT_SUBJECT.to_string(),
            message: Self::DEFAULT_MESSAGE.to_string(),
            document,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Check the provider-independent request invariants
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.recipients.is_empty() {
            return Err(RequestError::NoRecipients);
        }
        for (index, recipient) in self.recipients.iter().enumerate() {
            if !EmailAddress::is_valid(recipient.email.trim()) {
                return Err(RequestError::InvalidEmail {
                    index,
                    email: recipient.email.clone(),
                });
            }
            if recipient.name.trim().is_empty() {
                return Err(RequestError::EmptyName { index });
            }
        }
        if self.document.is_empty() {
            return Err(RequestError::EmptyDocument);
        }
        Ok(())
    }
}
