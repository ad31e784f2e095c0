//! Shared error definitions used across the hookbridge crates.

pub mod error;

pub use error::{Error, FromMessage, Result};
