//! HTTP surface of the relay: one endpoint that accepts JSON or form
//! submissions and forwards them to the configured webhook.

pub mod relay_routes;
pub mod server;
