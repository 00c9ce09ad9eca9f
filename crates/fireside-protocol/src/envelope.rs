//! The broadcast envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fireside_core::origin::OriginTag;

/// The wire message broadcast to all subscribers of a channel.
///
/// `sender` is the authoring client's origin tag; it exists purely so the
/// sender can ignore its own echo and is checked exactly once, in the
/// dispatch layer. The action is flattened into the envelope, giving the
/// wire shape `{"room_id", "sender", "action", "data"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<A> {
    /// The session (or lobby) this envelope belongs to.
    pub room_id: Uuid,
    /// Origin tag of the authoring client.
    pub sender: OriginTag,
    /// The carried action.
    #[serde(flatten)]
    pub action: A,
}

impl<A: Serialize> Envelope<A> {
    /// Encodes the envelope to its JSON wire form.
    ///
    /// Serialization of these derived types cannot fail.
    #[must_use]
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("envelope serialization is infallible")
    }
}

impl<A: DeserializeOwned> Envelope<A> {
    /// Decodes an envelope from its JSON wire form.
    ///
    /// Returns `None` for payloads this client does not understand —
    /// unknown action tags from newer peers and malformed frames alike.
    /// Forward compatibility: unknown kinds are dropped, never an error.
    #[must_use]
    pub fn from_wire(raw: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(raw.clone()).ok()
    }
}
