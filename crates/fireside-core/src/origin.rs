//! Origin tagging for self-echo suppression.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A random identifier minted once per client process.
///
/// Every broadcast envelope carries the sender's tag so the sender can
/// ignore its own echoed broadcast. The tag is not a participant identity:
/// it is never persisted and carries no trust semantics. It is the only
/// de-duplication mechanism in the protocol — there are no sequence numbers
/// and no vector clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginTag(Uuid);

impl OriginTag {
    /// Mints a fresh tag. Called exactly once per client construction.
    #[must_use]
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Builds a tag from a known UUID. Intended for tests that need two
    /// distinguishable, stable origins.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for OriginTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_tags_are_distinct() {
        assert_ne!(OriginTag::mint(), OriginTag::mint());
    }

    #[test]
    fn test_serializes_as_bare_uuid() {
        let id = Uuid::new_v4();
        let tag = OriginTag::from_uuid(id);
        let json = serde_json::to_value(tag).unwrap();
        assert_eq!(json, serde_json::json!(id.to_string()));
    }
}
