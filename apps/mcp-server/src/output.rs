//! Output files for filled and signed documents

use std::path::{Path, PathBuf};

use serde::Serialize;
use shared_types::Document;
use url::Url;

use crate::error::ServerError;

/// A document written to the output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub path: PathBuf,
    /// `file://` URL of `path`
    pub url: String,
}

/// Write a filled form as `filled_<uuid>.pdf`
pub async fn store_filled(dir: &Path, document: &Document) -> Result<StoredFile, ServerError> {
    let name = format!("filled_{}.pdf", uuid::Uuid::new_v4());
    store(dir, &name, document).await
}

/// Write a signed document as `signed_<envelope_id>.pdf`
pub async fn store_signed(
    dir: &Path,
    envelope_id: &str,
    document: &Document,
) -> Result<StoredFile, ServerError> {
    let name = format!("signed_{}.pdf", sanitize(envelope_id));
    store(dir, &name, document).await
}

fn sanitize(envelope_id: &str) -> String {
    envelope_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn store(dir: &Path, name: &str, document: &Document) -> Result<StoredFile, ServerError> {
    tokio::fs::create_dir_all(dir).await?;
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };
    let path = dir.join(name);
    tokio::fs::write(&path, document.bytes()).await?;

    let url = Url::from_file_path(&path)
        .map_err(|_| {
            ServerError::ProtocolError(format!("Cannot build file URL for {}", path.display()))
        })?
        .to_string();
    tracing::info!("Wrote {} ({} bytes)", path.display(), document.len());
    Ok(StoredFile { path, url })
}
