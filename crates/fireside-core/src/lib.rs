//! Fireside Core — shared abstractions for the session engine.
//!
//! This crate defines the capability traits and common types every other
//! crate depends on: the error taxonomy, injectable time and randomness,
//! the broadcast transport and durable record store seams, and the
//! narration/illustration capabilities. It contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod illustrate;
pub mod narration;
pub mod origin;
pub mod rng;
pub mod store;
pub mod transport;
