//! Transport doubles.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use fireside_core::error::EngineError;
use fireside_core::transport::{BroadcastTransport, ChannelName};
use serde_json::Value;
use tokio::sync::mpsc;

/// A transport that records every publish and delivers nothing. Used to
/// assert what a client broadcast without wiring up peers.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    published: Mutex<Vec<(ChannelName, Value)>>,
}

impl RecordingTransport {
    /// Fresh recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published(&self) -> Vec<(ChannelName, Value)> {
        self.published.lock().unwrap().clone()
    }

    /// Payloads published on one channel.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published_on(&self, channel: &ChannelName) -> Vec<Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

#[async_trait]
impl BroadcastTransport for RecordingTransport {
    async fn publish(&self, channel: &ChannelName, payload: Value) -> Result<(), EngineError> {
        self.published.lock().unwrap().push((channel.clone(), payload));
        Ok(())
    }

    async fn subscribe(
        &self,
        _channel: &ChannelName,
    ) -> Result<mpsc::Receiver<Value>, EngineError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }
}

/// An in-memory hub delivering each publish to every subscriber of the
/// channel — including the publisher, exactly like a real broadcast
/// transport. Exists so tests can exercise self-echo suppression and
/// multi-client convergence in one process.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<Value>>>>,
}

impl LoopbackTransport {
    /// Fresh hub with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BroadcastTransport for LoopbackTransport {
    async fn publish(&self, channel: &ChannelName, payload: Value) -> Result<(), EngineError> {
        let senders = {
            let subscribers = self.subscribers.lock().unwrap();
            subscribers.get(channel.as_str()).cloned().unwrap_or_default()
        };
        for sender in senders {
            // At-most-once: a full or closed subscriber just misses it.
            let _ = sender.try_send(payload.clone());
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &ChannelName,
    ) -> Result<mpsc::Receiver<Value>, EngineError> {
        let (tx, rx) = mpsc::channel(64);
        self.subscribers
            .lock()
            .unwrap()
            .entry(channel.as_str().to_owned())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
