//! Cross-component flows over the in-memory transport.

pub mod middleware_flow;
pub mod registration_flow;
