//! Fireside Relay — the named-channel broadcast transport.
//!
//! A thin fan-out with the exact semantics the protocol is designed
//! around: fire-and-forget publishing, at-most-once delivery to current
//! subscribers, no persistence, no replay, no ordering across channels.
//! In-process clients use [`hub::HubTransport`] directly; remote clients
//! connect to the WebSocket surface in [`ws`].

pub mod error;
pub mod hub;
pub mod ws;
