//! Inbound envelope dispatch.
//!
//! The single place the protocol's de-duplication rule lives. Every raw
//! payload from the transport passes through [`Dispatcher::accept`] before
//! any reducer sees it; self-echoes, foreign rooms, and unknown payloads
//! are dropped here, once, instead of being re-checked per handler.

use serde::de::DeserializeOwned;
use uuid::Uuid;

use fireside_core::origin::OriginTag;

use crate::envelope::Envelope;

/// Filters raw transport payloads into envelopes this client should apply.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    local: OriginTag,
}

impl Dispatcher {
    /// Creates a dispatcher for a client identified by `local`.
    #[must_use]
    pub const fn new(local: OriginTag) -> Self {
        Self { local }
    }

    /// The local origin tag, stamped onto outbound envelopes.
    #[must_use]
    pub const fn origin(&self) -> OriginTag {
        self.local
    }

    /// Decides whether a raw payload should be applied locally.
    ///
    /// Returns `None` when the payload is a self-echo (the optimistic local
    /// apply already happened), addressed to another room, or not decodable
    /// as a known action. There is no other de-duplication mechanism: a
    /// message lost in transit is simply never observed, and a message that
    /// passes this check is applied exactly once.
    #[must_use]
    pub fn accept<A: DeserializeOwned>(
        &self,
        room_id: Uuid,
        raw: &serde_json::Value,
    ) -> Option<Envelope<A>> {
        let Some(envelope) = Envelope::<A>::from_wire(raw) else {
            tracing::debug!("dropping undecodable or unknown payload");
            return None;
        };
        if envelope.sender == self.local {
            tracing::debug!("dropping self-echo");
            return None;
        }
        if envelope.room_id != room_id {
            tracing::debug!(
                expected = %room_id,
                got = %envelope.room_id,
                "dropping envelope addressed to another room"
            );
            return None;
        }
        Some(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::GameAction;

    fn fx_envelope(room_id: Uuid, sender: OriginTag) -> serde_json::Value {
        Envelope {
            room_id,
            sender,
            action: GameAction::EnvFx {
                effect: "fog".to_owned(),
            },
        }
        .to_wire()
    }

    #[test]
    fn test_accepts_remote_envelope() {
        let room = Uuid::new_v4();
        let dispatcher = Dispatcher::new(OriginTag::mint());
        let remote = OriginTag::mint();

        let accepted = dispatcher.accept::<GameAction>(room, &fx_envelope(room, remote));

        assert!(accepted.is_some());
    }

    #[test]
    fn test_drops_self_echo() {
        let room = Uuid::new_v4();
        let local = OriginTag::mint();
        let dispatcher = Dispatcher::new(local);

        let accepted = dispatcher.accept::<GameAction>(room, &fx_envelope(room, local));

        assert!(accepted.is_none());
    }

    #[test]
    fn test_drops_foreign_room() {
        let dispatcher = Dispatcher::new(OriginTag::mint());
        let raw = fx_envelope(Uuid::new_v4(), OriginTag::mint());

        let accepted = dispatcher.accept::<GameAction>(Uuid::new_v4(), &raw);

        assert!(accepted.is_none());
    }

    #[test]
    fn test_drops_unknown_action_tag() {
        let room = Uuid::new_v4();
        let dispatcher = Dispatcher::new(OriginTag::mint());
        let raw = serde_json::json!({
            "room_id": room,
            "sender": Uuid::new_v4(),
            "action": "FUTURE_ACTION",
            "data": {}
        });

        let accepted = dispatcher.accept::<GameAction>(room, &raw);

        assert!(accepted.is_none());
    }
}
