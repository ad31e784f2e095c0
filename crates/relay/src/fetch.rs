//! Remote attachment fetcher.
//!
//! Downloads a URL into a named temp file, enforcing the configured byte cap
//! while streaming. The temp file is deleted when the handle drops, so an
//! aborted or oversized download leaves nothing behind.

use std::{io::Write, path::Path};

use {
    futures::StreamExt,
    reqwest::header::CONTENT_TYPE,
    tempfile::NamedTempFile,
    tracing::debug,
};

use {
    crate::{Error, Result},
    hookbridge_config::RelayConfig,
};

/// A completed remote download. Dropping this (or the temp file inside it)
/// removes the backing storage.
#[derive(Debug)]
pub struct FetchedFile {
    pub file: NamedTempFile,
    pub filename: String,
    pub mime: String,
    pub size: u64,
}

/// Download `url` into a temp file.
///
/// Returns `Ok(None)` for URLs with a scheme other than `http`/`https` — the
/// caller just moves on to the next attachment. Transport errors, timeouts,
/// and cap violations are `Err`; the collector downgrades those to a skip.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    index: usize,
    cfg: &RelayConfig,
) -> Result<Option<FetchedFile>> {
    fetch_into(client, url, index, cfg, &std::env::temp_dir()).await
}

/// [`fetch`] with an explicit temp directory for the download.
async fn fetch_into(
    client: &reqwest::Client,
    url: &str,
    index: usize,
    cfg: &RelayConfig,
    dir: &Path,
) -> Result<Option<FetchedFile>> {
    if !allowed_scheme(url) {
        debug!(url, "skipping non-http(s) attachment url");
        return Ok(None);
    }

    let response = client
        .get(url)
        .timeout(cfg.fetch_timeout)
        .send()
        .await
        .map_err(|e| Error::fetch(url, e))?;

    let header_mime = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(sanitize_mime);
    // Resolve the filename from the final URL so redirects are honoured.
    let filename = filename_from_url(response.url(), index);

    let mut file = tempfile::Builder::new()
        .prefix("hookbridge-dl-")
        .tempfile_in(dir)?;

    let mut head: Vec<u8> = Vec::with_capacity(16);
    let mut size: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::fetch(url, e))?;
        size += chunk.len() as u64;
        if size > cfg.max_remote_bytes {
            // Partial temp file is dropped (and deleted) on return.
            return Err(Error::OversizeDownload {
                limit: cfg.max_remote_bytes,
            });
        }
        if head.len() < 16 {
            head.extend_from_slice(&chunk[..chunk.len().min(16 - head.len())]);
        }
        file.write_all(&chunk)?;
    }
    file.flush()?;

    let mime = header_mime.unwrap_or_else(|| sniff_mime(&head).to_string());
    debug!(url, filename = %filename, mime = %mime, size, "fetched remote attachment");

    Ok(Some(FetchedFile {
        file,
        filename,
        mime,
        size,
    }))
}

/// Only plain web URLs are fetched; anything else is skipped, not an error.
fn allowed_scheme(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Basename of the URL path, or `file_<index>` when the path has none.
fn filename_from_url(url: &reqwest::Url, index: usize) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("file_{index}"))
}

/// Reduce a declared content type to a bare `type/subtype` token, or reject
/// it. Keeps multipart part construction from choking on junk headers.
pub(crate) fn sanitize_mime(raw: &str) -> Option<String> {
    let base = raw.split(';').next().unwrap_or(raw).trim();
    let (ty, sub) = base.split_once('/')?;
    let token_ok = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '+' | '_'))
    };
    (token_ok(ty) && token_ok(sub)).then(|| base.to_ascii_lowercase())
}

/// Guess a MIME type from leading magic bytes.
pub(crate) fn sniff_mime(head: &[u8]) -> &'static str {
    if head.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if head.starts_with(b"\xff\xd8\xff") {
        "image/jpeg"
    } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        "image/gif"
    } else if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        "image/webp"
    } else if head.starts_with(b"%PDF") {
        "application/pdf"
    } else if head.starts_with(b"PK\x03\x04") {
        "application/zip"
    } else if head.starts_with(b"\x1f\x8b") {
        "application/gzip"
    } else if head.starts_with(b"OggS") {
        "audio/ogg"
    } else {
        "application/octet-stream"
    }
}
