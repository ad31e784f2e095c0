//! Relay pipeline errors.
//!
//! Each variant names the stage that failed; the gateway only ever renders
//! them as text, so the display strings are the contract.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A body that declared itself JSON did not parse.
    #[error("invalid JSON body: {source}")]
    MalformedBody {
        #[source]
        source: serde_json::Error,
    },

    /// A remote attachment could not be retrieved.
    #[error("fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A remote attachment grew past the configured download cap.
    #[error("download exceeds the {limit} byte cap")]
    OversizeDownload { limit: u64 },

    /// Temp storage for a download could not be written or read back.
    #[error("attachment storage: {source}")]
    Storage {
        #[from]
        source: std::io::Error,
    },

    /// The composed `payload_json` field could not be serialized.
    #[error("encode payload_json: {source}")]
    EncodePayload {
        #[source]
        source: serde_json::Error,
    },

    /// The multipart builder refused an attachment's MIME token.
    #[error("attachment {field}: unusable mime type {mime:?}")]
    AttachmentMime { field: String, mime: String },
}

impl Error {
    #[must_use]
    pub fn fetch(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Fetch {
            url: url.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
