//! Participant roster.

use uuid::Uuid;

use fireside_protocol::model::{GmKind, Participant, Role, SessionMeta};

/// The participants attached to a session, in join order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    participants: Vec<Participant>,
}

impl Roster {
    /// An empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a participant. No-op (returning `false`) when the id is
    /// already present or the roster is at capacity.
    pub fn join(&mut self, participant: Participant, max_participants: usize) -> bool {
        if self.participants.len() >= max_participants {
            tracing::debug!(id = %participant.id, "join ignored: session full");
            return false;
        }
        if self.get(participant.id).is_some() {
            tracing::debug!(id = %participant.id, "join ignored: already present");
            return false;
        }
        self.participants.push(participant);
        true
    }

    /// Removes a participant. Unknown ids are a no-op.
    pub fn leave(&mut self, participant_id: Uuid) {
        self.participants.retain(|p| p.id != participant_id);
    }

    /// Sets a participant's ready flag. Unknown ids are a no-op.
    pub fn set_ready(&mut self, participant_id: Uuid, ready: bool) {
        if let Some(p) = self.participants.iter_mut().find(|p| p.id == participant_id) {
            p.ready = ready;
        } else {
            tracing::debug!(id = %participant_id, "ready flag for unknown participant ignored");
        }
    }

    /// Looks up a participant by id.
    #[must_use]
    pub fn get(&self, participant_id: Uuid) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    /// Looks up a participant by display name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.display_name == name)
    }

    /// All participants in join order.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Participant> {
        self.participants.iter()
    }

    /// Number of participants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Whether every non-host participant is ready (host is implicitly
    /// ready). An empty roster is not startable.
    #[must_use]
    pub fn all_ready(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(Participant::is_ready)
    }

    /// Display names of the participants owed an action each round:
    /// everyone except spectators and the GM. With a human GM, the host
    /// narrates and is excluded; with an AI GM, no participant is the GM.
    #[must_use]
    pub fn turn_eligible_names(&self, meta: &SessionMeta) -> Vec<String> {
        self.participants
            .iter()
            .filter(|p| !matches!(p.role, Role::Spectator))
            .filter(|p| !(matches!(meta.gm_kind, GmKind::Human) && p.id == meta.host_id))
            .map(|p| p.display_name.clone())
            .collect()
    }

    /// Seat view: one entry per seat up to `max_participants`, occupied
    /// seats first in join order, then empty seats.
    #[must_use]
    pub fn slots(&self, max_participants: usize) -> Vec<Option<&Participant>> {
        let mut seats: Vec<Option<&Participant>> = self
            .participants
            .iter()
            .take(max_participants)
            .map(Some)
            .collect();
        seats.resize_with(max_participants, || None);
        seats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fireside_protocol::model::SessionStatus;

    fn player(name: &str) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            display_name: name.to_owned(),
            ready: false,
            role: Role::Player,
        }
    }

    fn meta(host_id: Uuid, gm_kind: GmKind) -> SessionMeta {
        SessionMeta {
            id: Uuid::new_v4(),
            host_id,
            status: SessionStatus::Waiting,
            gm_kind,
            max_participants: 4,
        }
    }

    #[test]
    fn test_join_rejects_duplicates_and_overflow() {
        let mut roster = Roster::new();
        let p = player("Ash");

        assert!(roster.join(p.clone(), 2));
        assert!(!roster.join(p, 2));
        assert!(roster.join(player("Brin"), 2));
        assert!(!roster.join(player("Cole"), 2));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_slots_renders_occupied_then_empty() {
        let mut roster = Roster::new();
        roster.join(player("Ash"), 4);
        roster.join(player("Brin"), 4);

        let slots = roster.slots(4);

        assert_eq!(slots.len(), 4);
        assert_eq!(slots.iter().filter(|s| s.is_some()).count(), 2);
        assert!(slots[0].is_some() && slots[1].is_some());
        assert!(slots[2].is_none() && slots[3].is_none());
    }

    #[test]
    fn test_turn_eligible_excludes_spectators_and_human_gm() {
        let mut roster = Roster::new();
        let host = Participant {
            id: Uuid::new_v4(),
            display_name: "Quinn".to_owned(),
            ready: false,
            role: Role::Host,
        };
        let host_id = host.id;
        roster.join(host, 8);
        roster.join(player("Ash"), 8);
        let mut watcher = player("Drift");
        watcher.role = Role::Spectator;
        roster.join(watcher, 8);

        let with_ai_gm = roster.turn_eligible_names(&meta(host_id, GmKind::Ai));
        assert_eq!(with_ai_gm, vec!["Quinn".to_owned(), "Ash".to_owned()]);

        let with_human_gm = roster.turn_eligible_names(&meta(host_id, GmKind::Human));
        assert_eq!(with_human_gm, vec!["Ash".to_owned()]);
    }

    #[test]
    fn test_all_ready_treats_host_as_ready() {
        let mut roster = Roster::new();
        let host = Participant {
            id: Uuid::new_v4(),
            display_name: "Quinn".to_owned(),
            ready: false,
            role: Role::Host,
        };
        roster.join(host, 4);
        let p = player("Ash");
        let p_id = p.id;
        roster.join(p, 4);

        assert!(!roster.all_ready());
        roster.set_ready(p_id, true);
        assert!(roster.all_ready());
    }
}
