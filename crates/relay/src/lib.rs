//! Relay pipeline: normalize inbound payloads, gather attachments (direct
//! uploads and fetched URLs), and dispatch one multipart request to the
//! configured webhook.

pub mod attachment;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod message;

pub use error::{Error, Result};
