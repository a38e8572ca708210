//! Immutable document payloads passed between the form adapter and providers

use serde::{Deserialize, Serialize};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// An opaque byte payload with its content type and where it came from.
///
/// Documents are never mutated in place: filling a form or downloading a
/// signed copy always produces a new `Document`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    bytes: Vec<u8>,
    content_type: String,
    locator: String,
}

impl Document {
    pub fn new(
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            locator: locator.into(),
        }
    }

    /// Wrap PDF bytes loaded from `locator` (URL, path, or a synthetic name)
    pub fn pdf(bytes: Vec<u8>, locator: impl Into<String>) -> Self {
        Self::new(bytes, PDF_CONTENT_TYPE, locator)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the payload carries the `%PDF` magic header
    pub fn looks_like_pdf(&self) -> bool {
        self.bytes.starts_with(b"%PDF")
    }

    /// Last path segment of the locator, used as the document name when
    /// handing the payload to a provider.
    pub fn file_name(&self) -> &str {
        let trimmed = self
            .locator
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        match trimmed.rsplit(['/', '\\']).next() {
            Some(name) if !name.is_empty() => name,
            _ => "document.pdf",
        }
    }
}

// Payloads can be megabytes; keep Debug output readable.
impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .field("locator", &self.locator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        let doc = Document::pdf(b"%PDF-1.7".to_vec(), "https://example.com/forms/nda.pdf?x=1");
        assert_eq!(doc.file_name(), "nda.pdf");
    }

    #[test]
    fn test_file_name_from_path() {
        let doc = Document::pdf(vec![], "/tmp/filled_1.pdf");
        assert_eq!(doc.file_name(), "filled_1.pdf");
    }

    #[test]
    fn test_file_name_fallback() {
        let doc = Document::pdf(vec![], "");
        assert_eq!(doc.file_name(), "document.pdf");
    }

    #[test]
    fn test_looks_like_pdf() {
        assert!(Document::pdf(b"%PDF-1.4\n".to_vec(), "a.pdf").looks_like_pdf());
        assert!(!Document::pdf(b"<html>".to_vec(), "a.pdf").looks_like_pdf());
    }

    #[test]
    fn test_debug_omits_payload() {
        let doc = Document::pdf(vec![0u8; 4096], "big.pdf");
        let debug = format!("{:?}", doc);
        assert!(debug.contains("len: 4096"));
        assert!(!debug.contains("0, 0, 0"));
    }
}
