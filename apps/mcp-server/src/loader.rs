//! Loading input documents for tool calls
//!
//! A document arrives either as `file_url` (`http(s)://`, `file://` or a
//! plain local path) or inline as `pdf_base64`. Whatever the source, the
//! payload must carry the `%PDF` header.

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use shared_pdf::FormError;
use shared_types::Document;
use url::Url;

use crate::error::ServerError;

/// Locator recorded for inline payloads
pub const INLINE_LOCATOR: &str = "document.pdf";

/// Where a tool's input document comes from
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentSource {
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub pdf_base64: Option<String>,
}

impl DocumentSource {
    pub fn url(file_url: impl Into<String>) -> Self {
        Self {
            file_url: Some(file_url.into()),
            pdf_base64: None,
        }
    }

    pub fn inline(pdf_base64: impl Into<String>) -> Self {
        Self {
            file_url: None,
            pdf_base64: Some(pdf_base64.into()),
        }
    }

    /// Fetch or decode the document. `pdf_base64` wins when both are given.
    pub async fn load(&self, http: &reqwest::Client) -> Result<Document, ServerError> {
        let document = match (non_empty(&self.pdf_base64), non_empty(&self.file_url)) {
            (Some(encoded), _) => {
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|e| ServerError::InvalidArgument(format!("Invalid base64: {}", e)))?;
                Document::pdf(bytes, INLINE_LOCATOR)
            }
            (None, Some(file_url)) => load_url(http, file_url).await?,
            (None, None) => {
                return Err(ServerError::InvalidArgument(
                    "file_url or pdf_base64 is required".to_string(),
                ))
            }
        };

        if !document.looks_like_pdf() {
            return Err(FormError::Corrupt(format!(
                "{} does not start with %PDF",
                document.locator()
            ))
            .into());
        }
        tracing::debug!("Loaded {} ({} bytes)", document.locator(), document.len());
        Ok(document)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn load_url(http: &reqwest::Client, file_url: &str) -> Result<Document, ServerError> {
    if file_url.starts_with("http://") || file_url.starts_with("https://") {
        let response = http
            .get(file_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServerError::DocumentLoad(format!("{}: {}", file_url, e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServerError::DocumentLoad(format!("{}: {}", file_url, e)))?;
        return Ok(Document::pdf(bytes.to_vec(), file_url));
    }

    let path = local_path(file_url)?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ServerError::DocumentLoad(format!("{}: {}", path.display(), e)))?;
    Ok(Document::pdf(bytes, path.to_string_lossy()))
}

fn local_path(file_url: &str) -> Result<PathBuf, ServerError> {
    if !file_url.starts_with("file:") {
        return Ok(PathBuf::from(file_url));
    }
    Url::parse(file_url)
        .ok()
        .and_then(|url| url.to_file_path().ok())
        .ok_or_else(|| ServerError::InvalidArgument(format!("Invalid file URL: {}", file_url)))
}
