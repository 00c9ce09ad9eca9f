//! Fireside Client — the per-client session engine.
//!
//! One [`engine::GameClient`] per participant process. It owns the local
//! `SessionState`, applies every mutation through the same reducers the
//! remote path uses, and wires the three independent steps of a durable
//! mutation in their fixed order: apply locally, broadcast, write behind.
//! All inputs — local intent, accepted remote envelopes, narration
//! resolutions, timer ticks — are processed to completion one at a time,
//! so there is no data race within a client; concurrency exists only
//! across clients, reconciled through the envelope protocol.

pub mod engine;

pub use engine::{GameClient, Notice};
