//! Attachment collection.
//!
//! Merges direct uploads and `file_urls` downloads into one ordered list of
//! named parts. Uploads keep their caller-provided bytes in memory; remote
//! downloads own a temp file that is deleted when the part drops, so cleanup
//! is tied to scope rather than to explicit unlink calls.

use std::path::Path;

use {bytes::Bytes, serde_json::Value, tracing::warn};

use {
    crate::{
        Result,
        fetch::{self, FetchedFile, sanitize_mime, sniff_mime},
        message::RawPayload,
    },
    hookbridge_config::RelayConfig,
};

/// A file field from the inbound request, as extracted by the transport
/// layer. Entries whose body could not be read never make it here.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Backing storage for one attachment.
#[derive(Debug)]
enum AttachmentStorage {
    /// Caller-provided bytes; nothing to clean up.
    Upload(Bytes),
    /// System-created temp download, deleted on drop.
    Download(tempfile::NamedTempFile),
}

/// One named binary part of the outbound envelope.
#[derive(Debug)]
pub struct AttachmentPart {
    /// Multipart field name: `file0`, `file1`, ... in processing order.
    pub field_name: String,
    /// Human-readable filename forwarded to the destination.
    pub filename: String,
    /// Sanitized `type/subtype` MIME token.
    pub mime: String,
    storage: AttachmentStorage,
}

impl AttachmentPart {
    /// Wrap a direct upload. The declared content type wins when usable,
    /// otherwise the content is sniffed.
    #[must_use]
    pub fn from_upload(index: usize, upload: UploadedFile) -> Self {
        let mime = upload
            .content_type
            .as_deref()
            .and_then(sanitize_mime)
            .unwrap_or_else(|| sniff_mime(&upload.data).to_string());
        let filename = upload
            .filename
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("file_{index}"));
        Self {
            field_name: format!("file{index}"),
            filename,
            mime,
            storage: AttachmentStorage::Upload(upload.data),
        }
    }

    /// Wrap a completed remote download, taking over its temp file.
    #[must_use]
    pub fn from_download(index: usize, fetched: FetchedFile) -> Self {
        Self {
            field_name: format!("file{index}"),
            filename: fetched.filename,
            mime: fetched.mime,
            storage: AttachmentStorage::Download(fetched.file),
        }
    }

    /// Read the full attachment body.
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        match &self.storage {
            AttachmentStorage::Upload(data) => Ok(data.to_vec()),
            AttachmentStorage::Download(file) => Ok(tokio::fs::read(file.path()).await?),
        }
    }

    /// Path of the backing temp file, for system-owned downloads only.
    #[must_use]
    pub fn temp_path(&self) -> Option<&Path> {
        match &self.storage {
            AttachmentStorage::Upload(_) => None,
            AttachmentStorage::Download(file) => Some(file.path()),
        }
    }
}

/// Gather all attachments for one transaction: uploads first (in arrival
/// order), then `file_urls` entries fetched sequentially. A failed fetch
/// skips that one URL and keeps going; it never fails the transaction.
pub async fn collect(
    client: &reqwest::Client,
    uploads: Vec<UploadedFile>,
    raw: &RawPayload,
    cfg: &RelayConfig,
) -> Vec<AttachmentPart> {
    let mut parts = Vec::new();
    let mut index = 0;

    for upload in uploads {
        parts.push(AttachmentPart::from_upload(index, upload));
        index += 1;
    }

    if let Some(Value::Array(urls)) = raw.get("file_urls") {
        for entry in urls {
            let Some(url) = entry.as_str() else {
                warn!("skipping non-string file_urls entry");
                continue;
            };
            let url = url.trim();
            if url.is_empty() {
                continue;
            }
            match fetch::fetch(client, url, index, cfg).await {
                Ok(Some(fetched)) => {
                    parts.push(AttachmentPart::from_download(index, fetched));
                    index += 1;
                },
                Ok(None) => {},
                Err(e) => {
                    warn!(url, error = %e, "skipping remote attachment");
                },
            }
        }
    }

    parts
}
