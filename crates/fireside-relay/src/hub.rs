//! In-process channel hub and its transport adapter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};

use fireside_core::error::EngineError;
use fireside_core::transport::{BroadcastTransport, ChannelName};

/// Per-channel buffer. A subscriber that lags past this simply misses
/// messages, which is within the transport contract.
const CHANNEL_CAPACITY: usize = 256;

/// A named-channel fan-out hub.
///
/// Channels are created on first use and never torn down explicitly; an
/// unused channel is just a sender with no receivers.
#[derive(Debug, Default)]
pub struct ChannelHub {
    channels: Mutex<HashMap<String, broadcast::Sender<Value>>>,
}

impl ChannelHub {
    /// Fresh hub with no channels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes to every current subscriber of `channel`. Fire-and-forget:
    /// a channel with no subscribers swallows the payload.
    pub fn publish(&self, channel: &str, payload: Value) {
        let sender = self.sender(channel);
        // An Err only means nobody is listening right now.
        let _ = sender.send(payload);
    }

    /// Subscribes to `channel`, receiving payloads published after this
    /// call.
    #[must_use]
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Value> {
        self.sender(channel).subscribe()
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<Value> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(channel.to_owned())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

/// [`BroadcastTransport`] adapter over a shared [`ChannelHub`], for
/// clients living in the same process as the hub.
#[derive(Debug, Clone)]
pub struct HubTransport {
    hub: Arc<ChannelHub>,
}

impl HubTransport {
    /// Wraps a hub.
    #[must_use]
    pub fn new(hub: Arc<ChannelHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl BroadcastTransport for HubTransport {
    async fn publish(&self, channel: &ChannelName, payload: Value) -> Result<(), EngineError> {
        self.hub.publish(channel.as_str(), payload);
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &ChannelName,
    ) -> Result<mpsc::Receiver<Value>, EngineError> {
        let mut feed = self.hub.subscribe(channel.as_str());
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "subscriber lagged; messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(rx)
    }
}
