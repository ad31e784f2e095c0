//! Outbound webhook dispatch.
//!
//! Assembles the canonical message and attachment parts into one multipart
//! POST, sends it to the destination, and reports the outcome without
//! interpreting it — the gateway decides what the caller sees.

use {
    reqwest::multipart::{Form, Part},
    serde_json::Value,
    tracing::{info, warn},
};

use {
    crate::{
        Error, Result,
        attachment::AttachmentPart,
        message::CanonicalMessage,
    },
    hookbridge_config::RelayConfig,
};

/// Identifying header sent with every outbound request.
const USER_AGENT_VALUE: &str = concat!("hookbridge/", env!("CARGO_PKG_VERSION"));

/// Outcome of one dispatch attempt.
///
/// `transport_error` is set only when no response was obtained at all; any
/// received response, success or not, carries its status and body through
/// unmodified.
#[derive(Debug)]
pub struct RelayResult {
    pub status: Option<u16>,
    /// Destination body: decoded JSON when parseable, raw text otherwise.
    pub body: Value,
    pub transport_error: Option<String>,
}

impl RelayResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

/// Send the composed message to the webhook.
///
/// Takes the attachment parts by value: when this function returns — on any
/// path — the parts drop and every system-owned temp download is deleted.
pub async fn dispatch(
    client: &reqwest::Client,
    webhook_url: &str,
    message: &CanonicalMessage,
    parts: Vec<AttachmentPart>,
    cfg: &RelayConfig,
) -> Result<RelayResult> {
    let payload_json =
        serde_json::to_string(message).map_err(|e| Error::EncodePayload { source: e })?;

    let mut form = Form::new().text("payload_json", payload_json);
    for part in &parts {
        let data = match part.read_bytes().await {
            Ok(data) => data,
            Err(e) => {
                warn!(field = %part.field_name, error = %e, "dropping unreadable attachment");
                continue;
            },
        };
        let file_part = Part::bytes(data)
            .file_name(part.filename.clone())
            .mime_str(&part.mime)
            .map_err(|_| Error::AttachmentMime {
                field: part.field_name.clone(),
                mime: part.mime.clone(),
            })?;
        form = form.part(part.field_name.clone(), file_part);
    }

    info!(attachments = parts.len(), "dispatching to webhook");
    let response = client
        .post(webhook_url)
        .header(reqwest::header::USER_AGENT, USER_AGENT_VALUE)
        .multipart(form)
        .timeout(cfg.dispatch_timeout)
        .send()
        .await;

    match response {
        Err(e) => {
            warn!(error = %e, "webhook dispatch failed at transport level");
            Ok(RelayResult {
                status: None,
                body: Value::Null,
                transport_error: Some(e.to_string()),
            })
        },
        Ok(response) => {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let body =
                serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
            Ok(RelayResult {
                status: Some(status),
                body,
                transport_error: None,
            })
        },
    }
}
