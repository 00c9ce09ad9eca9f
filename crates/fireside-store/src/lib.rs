//! Fireside Store — durable persistence for the session engine.
//!
//! The broadcast stream is ephemeral; this crate makes the parts that
//! matter survive reload and late join. Writes happen behind the live
//! protocol (apply locally, broadcast, then write — three independent
//! steps), reads happen only at bootstrap, and conflicts resolve
//! last-write-wins at the row level.

pub mod memory;
pub mod pg;
pub mod reconciler;
pub mod records;
pub mod schema;
