//! Fireside Session — the per-client session state machine.
//!
//! One mutable [`state::SessionState`] per client, mutated exclusively by
//! synchronous, I/O-free reducers. Two paths feed it: local user intent
//! (applied immediately, then broadcast) and remote envelopes (applied only
//! after the dispatcher's self-echo check). Reducers never throw on a bad
//! precondition — they no-op and leave unrelated state untouched — and
//! there is no rollback: corrections are forward compensating mutations.

pub mod board;
pub mod chat;
pub mod dice;
pub mod roster;
pub mod state;
pub mod turn;
pub mod vote;
