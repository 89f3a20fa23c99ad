//! Discord adapter
//!
//! Implements the chat port against the Discord v10 API: [`RestClient`]
//! for outbound calls (messages, user lookup, permission checks) and
//! [`gateway`] for the inbound event stream.

mod gateway;
mod rest;

pub use gateway::Gateway;
pub use rest::RestClient;
