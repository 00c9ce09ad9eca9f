//! Dice state: active rolls, required-roll gates, and the arena lifecycle.
//!
//! The initiating client is the sole authority for a roll's numeric
//! result; everyone else replays a rolling→settled animation that
//! terminates at exactly the given number. The arena is the transient
//! context for one round of rolls: it stays active while any roll is
//! outstanding, closes a grace period after the last targeted participant
//! settles, and has an unconditional safety timeout so one absent player
//! cannot wedge the table.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use fireside_protocol::model::DiceKind;

/// Presentation delay between a roll starting and it settling on screen.
#[must_use]
pub fn settle_delay() -> TimeDelta {
    TimeDelta::milliseconds(1500)
}

/// Grace period the arena stays open after every targeted roll settles.
#[must_use]
pub fn arena_grace() -> TimeDelta {
    TimeDelta::seconds(3)
}

/// When the stuck-arena warning is surfaced.
#[must_use]
pub fn arena_warning_after() -> TimeDelta {
    TimeDelta::seconds(15)
}

/// Unconditional arena close, warning or not.
#[must_use]
pub fn arena_timeout() -> TimeDelta {
    TimeDelta::seconds(18)
}

/// One roll instance, addressable by id across every client.
#[derive(Debug, Clone, PartialEq)]
pub struct DiceRoll {
    /// Roll instance id, minted by the initiating client.
    pub id: Uuid,
    /// The rolling participant.
    pub owner_id: Uuid,
    /// Die kind.
    pub kind: DiceKind,
    /// The committed result, fixed at creation on the resolving client.
    pub result: u32,
    /// True while the roll animates; false once settled.
    pub rolling: bool,
}

/// Timer signals produced by [`DiceState::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaSignal {
    /// The arena has been open suspiciously long; surface a warning.
    Warning,
    /// The arena closed; active rolls were cleared.
    Closed,
}

/// The transient context for one round of rolls.
#[derive(Debug, Clone, PartialEq)]
pub struct Arena {
    /// When the arena opened.
    pub opened_at: DateTime<Utc>,
    /// Whether the stuck warning has already fired.
    pub warned: bool,
    /// Scheduled close time once all targeted rolls have settled.
    pub close_at: Option<DateTime<Utc>>,
}

/// Dice-related session state.
#[derive(Debug, Clone, Default)]
pub struct DiceState {
    rolls: Vec<DiceRoll>,
    gates: HashMap<Uuid, DiceKind>,
    /// The active arena, if any roll context is open.
    pub arena: Option<Arena>,
}

impl DiceState {
    /// Empty dice state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active rolls in start order.
    #[must_use]
    pub fn rolls(&self) -> &[DiceRoll] {
        &self.rolls
    }

    /// Looks up a roll by id.
    #[must_use]
    pub fn roll(&self, roll_id: Uuid) -> Option<&DiceRoll> {
        self.rolls.iter().find(|r| r.id == roll_id)
    }

    /// The die a participant is required to roll, if gated.
    #[must_use]
    pub fn gate(&self, participant_id: Uuid) -> Option<DiceKind> {
        self.gates.get(&participant_id).copied()
    }

    /// Whether any arena is open.
    #[must_use]
    pub fn arena_active(&self) -> bool {
        self.arena.is_some()
    }

    /// Starts a roll in its rolling phase, opening the arena if needed.
    /// The result is already committed; it is only revealed at settle.
    /// Duplicate roll ids are a no-op.
    pub fn begin_roll(&mut self, roll: DiceRoll, now: DateTime<Utc>) -> bool {
        if self.roll(roll.id).is_some() {
            tracing::debug!(id = %roll.id, "duplicate roll ignored");
            return false;
        }
        self.rolls.push(roll);
        let arena = self.arena.get_or_insert(Arena {
            opened_at: now,
            warned: false,
            close_at: None,
        });
        // A new outstanding roll cancels any pending close.
        arena.close_at = None;
        true
    }

    /// Settles a roll. Clears the owner's required-roll gate when the
    /// settled kind matches it; a roll completed while not required leaves
    /// every other gate untouched. Unknown ids are a no-op.
    pub fn settle_roll(&mut self, roll_id: Uuid, now: DateTime<Utc>) -> bool {
        let Some(roll) = self.rolls.iter_mut().find(|r| r.id == roll_id && r.rolling) else {
            tracing::debug!(id = %roll_id, "settle for unknown or settled roll ignored");
            return false;
        };
        roll.rolling = false;
        let owner = roll.owner_id;
        let kind = roll.kind;
        if self.gates.get(&owner) == Some(&kind) {
            self.gates.remove(&owner);
        }
        self.maybe_schedule_close(now);
        true
    }

    /// Installs required-roll gates for the targeted participants and
    /// opens the arena around them.
    pub fn force_rolls(&mut self, kind: DiceKind, targets: &[Uuid], now: DateTime<Utc>) {
        for target in targets {
            self.gates.insert(*target, kind);
        }
        let arena = self.arena.get_or_insert(Arena {
            opened_at: now,
            warned: false,
            close_at: None,
        });
        arena.close_at = None;
    }

    /// Advances arena timers. Call on every timer tick with the current
    /// time; returns any signals the UI must surface.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<ArenaSignal> {
        let Some(arena) = &mut self.arena else {
            return Vec::new();
        };

        let mut signals = Vec::new();
        if !arena.warned && now - arena.opened_at >= arena_warning_after() {
            arena.warned = true;
            signals.push(ArenaSignal::Warning);
        }

        let timed_out = now - arena.opened_at >= arena_timeout();
        let grace_elapsed = arena.close_at.is_some_and(|at| now >= at);
        if timed_out || grace_elapsed {
            if timed_out && !self.gates.is_empty() {
                tracing::warn!(
                    outstanding = self.gates.len(),
                    "arena safety timeout with required rolls outstanding"
                );
            }
            self.rolls.clear();
            self.gates.clear();
            self.arena = None;
            signals.push(ArenaSignal::Closed);
        }
        signals
    }

    fn maybe_schedule_close(&mut self, now: DateTime<Utc>) {
        let all_settled = self.rolls.iter().all(|r| !r.rolling);
        if all_settled && self.gates.is_empty() {
            if let Some(arena) = &mut self.arena {
                if arena.close_at.is_none() {
                    arena.close_at = Some(now + arena_grace());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn roll(owner: Uuid, kind: DiceKind, result: u32) -> DiceRoll {
        DiceRoll {
            id: Uuid::new_v4(),
            owner_id: owner,
            kind,
            result,
            rolling: true,
        }
    }

    #[test]
    fn test_settle_clears_matching_gate_only() {
        let mut dice = DiceState::new();
        let gated = Uuid::new_v4();
        let other = Uuid::new_v4();
        dice.force_rolls(DiceKind::D20, &[gated, other], at(0));

        let r = roll(gated, DiceKind::D20, 11);
        let roll_id = r.id;
        dice.begin_roll(r, at(1));
        dice.settle_roll(roll_id, at(2));

        assert_eq!(dice.gate(gated), None);
        assert_eq!(dice.gate(other), Some(DiceKind::D20));
    }

    #[test]
    fn test_mismatched_kind_does_not_clear_gate() {
        let mut dice = DiceState::new();
        let gated = Uuid::new_v4();
        dice.force_rolls(DiceKind::D20, &[gated], at(0));

        let r = roll(gated, DiceKind::D6, 4);
        let roll_id = r.id;
        dice.begin_roll(r, at(1));
        dice.settle_roll(roll_id, at(2));

        assert_eq!(dice.gate(gated), Some(DiceKind::D20));
    }

    #[test]
    fn test_arena_closes_after_grace_once_all_settle() {
        let mut dice = DiceState::new();
        let owner = Uuid::new_v4();
        let r = roll(owner, DiceKind::D8, 5);
        let roll_id = r.id;
        dice.begin_roll(r, at(0));
        dice.settle_roll(roll_id, at(2));

        assert!(dice.tick(at(3)).is_empty());
        let signals = dice.tick(at(5));

        assert_eq!(signals, vec![ArenaSignal::Closed]);
        assert!(!dice.arena_active());
        assert!(dice.rolls().is_empty());
    }

    #[test]
    fn test_safety_timeout_warns_then_closes() {
        let mut dice = DiceState::new();
        dice.force_rolls(DiceKind::D12, &[Uuid::new_v4()], at(0));

        assert!(dice.tick(at(10)).is_empty());
        assert_eq!(dice.tick(at(15)), vec![ArenaSignal::Warning]);
        assert!(dice.tick(at(16)).is_empty());
        assert_eq!(dice.tick(at(18)), vec![ArenaSignal::Closed]);
        assert!(!dice.arena_active());
    }

    #[test]
    fn test_new_roll_cancels_pending_close() {
        let mut dice = DiceState::new();
        let first = roll(Uuid::new_v4(), DiceKind::D6, 2);
        let first_id = first.id;
        dice.begin_roll(first, at(0));
        dice.settle_roll(first_id, at(1));

        let second = roll(Uuid::new_v4(), DiceKind::D6, 6);
        dice.begin_roll(second, at(2));

        // Close was scheduled for t=4; the new outstanding roll cancels it.
        assert!(dice.tick(at(4)).is_empty());
        assert!(dice.arena_active());
    }
}
