//! Broadcast transport abstraction.
//!
//! A named-channel publish/subscribe primitive. Publishing is
//! fire-and-forget; subscribers on the same channel receive at-most-once
//! delivery with no ordering guarantee relative to other channels, no
//! persistence, and no replay. Durable state survives through the record
//! store, never through the transport.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::EngineError;

/// A transport channel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName(String);

impl ChannelName {
    /// Wraps a raw channel name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Abstraction over the best-effort broadcast transport.
///
/// Payloads are opaque JSON at this layer; the envelope protocol sits on
/// top of it.
#[async_trait]
pub trait BroadcastTransport: Send + Sync {
    /// Publish a payload to every current subscriber of `channel`.
    ///
    /// A returned `Ok` means the payload was handed to the transport, not
    /// that any peer received it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Transport` if the transport itself rejected
    /// the publish (message loss in transit is silent, not an error).
    async fn publish(
        &self,
        channel: &ChannelName,
        payload: serde_json::Value,
    ) -> Result<(), EngineError>;

    /// Subscribe to a channel, receiving payloads published after this
    /// call. There is no replay of earlier traffic.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Transport` if the subscription could not be
    /// established.
    async fn subscribe(
        &self,
        channel: &ChannelName,
    ) -> Result<mpsc::Receiver<serde_json::Value>, EngineError>;
}
