//! The session state container and its reducers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use fireside_core::error::EngineError;
use fireside_protocol::action::{GameAction, LobbyAction};
use fireside_protocol::model::{RollTargets, SessionMeta, SessionStatus, VoteSignal};

use crate::board::{Board, CameraView, TokenState};
use crate::chat::ChatLog;
use crate::dice::{DiceRoll, DiceState};
use crate::roster::Roster;
use crate::turn::{TurnPhase, TurnState};
use crate::vote::{VoteOutcome, VoteState};

/// What a reducer did, for the event loop to interpret.
///
/// Reducers stay synchronous and I/O-free; anything that needs a timer or
/// a network call is reported here and performed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduced {
    /// The mutation was applied.
    Applied,
    /// A precondition failed; nothing changed.
    Ignored,
    /// A remote roll entered its rolling phase; the engine schedules its
    /// settle timer.
    RollStarted {
        /// The roll to settle after the presentation delay.
        roll_id: Uuid,
    },
    /// The last awaited action arrived; the round is ready to combine.
    TurnComplete {
        /// The completed round.
        round_id: Uuid,
    },
    /// A vote reached a terminal outcome.
    VoteResolved(VoteOutcome),
}

/// The authoritative local view of one session.
///
/// Owned and mutated by exactly one client; peers converge on the same
/// logical state through the envelope protocol, never through shared
/// memory. Constructed explicitly and passed to the components that need
/// it — there is no ambient global.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Session metadata.
    pub meta: SessionMeta,
    /// Participants.
    pub roster: Roster,
    /// Tokens, stats, effect cues, cursors.
    pub board: Board,
    /// Chat history.
    pub chat: ChatLog,
    /// Dice rolls, gates, arena.
    pub dice: DiceState,
    /// Turn aggregation for the open round.
    pub turn: TurnState,
    /// Exit-vote machine.
    pub vote: VoteState,
    /// Local camera framing. Never synchronized.
    pub view: CameraView,
    /// True while a narration call is outstanding.
    pub ai_busy: bool,
}

impl SessionState {
    /// Fresh state for a session.
    #[must_use]
    pub fn new(meta: SessionMeta) -> Self {
        Self {
            meta,
            roster: Roster::new(),
            board: Board::new(),
            chat: ChatLog::new(),
            dice: DiceState::new(),
            turn: TurnState::new(),
            vote: VoteState::new(),
            view: CameraView::default(),
            ai_busy: false,
        }
    }

    /// Applies one gameplay action. Safe no-op on violated preconditions:
    /// the reducer logs at debug, reports [`Reduced::Ignored`], and leaves
    /// unrelated state untouched. Never panics, never rolls back.
    pub fn reduce(&mut self, action: &GameAction, now: DateTime<Utc>) -> Reduced {
        match action {
            GameAction::MoveToken { token_id, x, y } => {
                if self.board.move_token(*token_id, *x, *y) {
                    Reduced::Applied
                } else {
                    Reduced::Ignored
                }
            }
            GameAction::SpawnToken { token_id, label, x, y } => {
                let spawned = self.board.spawn_token(TokenState {
                    id: *token_id,
                    label: label.clone(),
                    x: *x,
                    y: *y,
                });
                if spawned { Reduced::Applied } else { Reduced::Ignored }
            }
            GameAction::ClearTokens => {
                self.board.clear_tokens();
                Reduced::Applied
            }
            GameAction::StatChange { participant_id, stat, delta } => {
                if self.roster.get(*participant_id).is_none() {
                    tracing::debug!(id = %participant_id, "stat change for unknown target ignored");
                    return Reduced::Ignored;
                }
                self.board.apply_stat_delta(*participant_id, stat, *delta);
                Reduced::Applied
            }
            GameAction::DiceRoll { roll_id, owner_id, kind, result } => {
                let started = self.dice.begin_roll(
                    DiceRoll {
                        id: *roll_id,
                        owner_id: *owner_id,
                        kind: *kind,
                        // The committed result; this client only replays the
                        // rolling animation toward it.
                        result: *result,
                        rolling: true,
                    },
                    now,
                );
                if started {
                    Reduced::RollStarted { roll_id: *roll_id }
                } else {
                    Reduced::Ignored
                }
            }
            GameAction::ForceDice { kind, targets } => {
                let resolved = self.resolve_targets(targets);
                if resolved.is_empty() {
                    tracing::debug!("forced roll with no resolvable targets ignored");
                    return Reduced::Ignored;
                }
                self.dice.force_rolls(*kind, &resolved, now);
                Reduced::Applied
            }
            GameAction::EnvFx { effect } => {
                self.board.env_fx = Some(effect.clone());
                Reduced::Applied
            }
            GameAction::AudioFx { cue } => {
                self.board.audio_cue = Some(cue.clone());
                Reduced::Applied
            }
            GameAction::PartyChat { message } => {
                if self.chat.push(message.clone()) {
                    Reduced::Applied
                } else {
                    Reduced::Ignored
                }
            }
            GameAction::GmNarration { message } => {
                if !self.chat.push(message.clone()) {
                    return Reduced::Ignored;
                }
                // A landed narration ends the open round on every client.
                if let Some(round_id) = self.turn.round_id {
                    self.turn.complete(round_id);
                }
                self.ai_busy = false;
                Reduced::Applied
            }
            GameAction::RoundOpened { round_id, waiting_for } => {
                self.turn.open_round(*round_id, waiting_for);
                // Any narration still in flight belongs to a dead round.
                self.ai_busy = false;
                Reduced::Applied
            }
            GameAction::ActionSubmitted { round_id, name, text, .. } => {
                if self.turn.round_id != Some(*round_id) {
                    tracing::debug!(%round_id, "submission for another round ignored");
                    return Reduced::Ignored;
                }
                if self.turn.submit(name, text) {
                    Reduced::TurnComplete { round_id: *round_id }
                } else {
                    Reduced::Applied
                }
            }
            GameAction::Vote { signal } => self.reduce_vote(*signal),
            GameAction::CursorMove { participant_id, x, y } => {
                self.board.set_cursor(*participant_id, *x, *y);
                Reduced::Applied
            }
        }
    }

    /// Applies one pre-game lobby action.
    pub fn reduce_lobby(&mut self, action: &LobbyAction) -> Reduced {
        match action {
            LobbyAction::Joined { participant } => {
                if self.roster.join(participant.clone(), self.meta.max_participants) {
                    Reduced::Applied
                } else {
                    Reduced::Ignored
                }
            }
            LobbyAction::Left { participant_id } => {
                self.roster.leave(*participant_id);
                self.board.forget_participant(*participant_id);
                Reduced::Applied
            }
            LobbyAction::ReadySet { participant_id, ready } => {
                self.roster.set_ready(*participant_id, *ready);
                Reduced::Applied
            }
            LobbyAction::LobbyChat { message } => {
                if self.chat.push(message.clone()) {
                    Reduced::Applied
                } else {
                    Reduced::Ignored
                }
            }
            LobbyAction::SessionStarted { session_id } => {
                if *session_id != self.meta.id || self.meta.status != SessionStatus::Waiting {
                    tracing::debug!(%session_id, "start for wrong or already-started session ignored");
                    return Reduced::Ignored;
                }
                self.meta.status = SessionStatus::Playing;
                Reduced::Applied
            }
        }
    }

    /// Whether a participant may submit a free-form turn action right now.
    /// This is the single seam both the required-roll gate and the
    /// `waiting_for` gate are consulted through.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Precondition` naming the violated gate.
    pub fn can_submit(&self, participant_id: Uuid) -> Result<(), EngineError> {
        if self.meta.status != SessionStatus::Playing {
            return Err(EngineError::Precondition("session is not live".to_owned()));
        }
        let Some(participant) = self.roster.get(participant_id) else {
            return Err(EngineError::Precondition("unknown participant".to_owned()));
        };
        if let Some(kind) = self.dice.gate(participant_id) {
            return Err(EngineError::Precondition(format!(
                "a {} roll is required before acting",
                kind.as_str()
            )));
        }
        if self.turn.phase != TurnPhase::AwaitingPlayers {
            return Err(EngineError::Precondition("no round is collecting actions".to_owned()));
        }
        if !self.turn.waiting_for.contains(&participant.display_name) {
            return Err(EngineError::Precondition(
                "already submitted this round".to_owned(),
            ));
        }
        Ok(())
    }

    /// Seat view for rendering: occupied seats then empty seats.
    #[must_use]
    pub fn slots(&self) -> Vec<Option<&fireside_protocol::model::Participant>> {
        self.roster.slots(self.meta.max_participants)
    }

    fn reduce_vote(&mut self, signal: VoteSignal) -> Reduced {
        match signal {
            VoteSignal::Start { initiator } => {
                if self.roster.get(initiator).is_none() {
                    tracing::debug!(%initiator, "vote start from unknown participant ignored");
                    return Reduced::Ignored;
                }
                if self.vote.start(initiator, self.roster.len()) {
                    Reduced::Applied
                } else {
                    Reduced::Ignored
                }
            }
            VoteSignal::Cast { voter, approve } => match self.vote.cast(voter, approve) {
                Some(outcome) => {
                    if outcome == VoteOutcome::Passed {
                        // Quorum chose to save and exit.
                        self.meta.status = SessionStatus::Saved;
                    }
                    Reduced::VoteResolved(outcome)
                }
                None => Reduced::Applied,
            },
            VoteSignal::Cancel { by } => match self.vote.cancel(by) {
                Some(outcome) => Reduced::VoteResolved(outcome),
                None => Reduced::Ignored,
            },
        }
    }

    fn resolve_targets(&self, targets: &RollTargets) -> Vec<Uuid> {
        match targets {
            RollTargets::All => self
                .roster
                .turn_eligible_names(&self.meta)
                .iter()
                .filter_map(|name| self.roster.by_name(name))
                .map(|p| p.id)
                .collect(),
            RollTargets::Named(names) => names
                .iter()
                .filter_map(|name| {
                    let found = self.roster.by_name(name);
                    if found.is_none() {
                        tracing::debug!(%name, "forced roll target not found");
                    }
                    found
                })
                .map(|p| p.id)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fireside_protocol::model::{
        ChatChannel, ChatKind, ChatMessage, DiceKind, GmKind, Participant, Role,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 19, 0, 0).unwrap()
    }

    fn playing_state() -> (SessionState, Uuid, Uuid) {
        let host_id = Uuid::new_v4();
        let meta = SessionMeta {
            id: Uuid::new_v4(),
            host_id,
            status: SessionStatus::Playing,
            gm_kind: GmKind::Ai,
            max_participants: 4,
        };
        let mut state = SessionState::new(meta);
        state.roster.join(
            Participant {
                id: host_id,
                display_name: "Quinn".to_owned(),
                ready: true,
                role: Role::Host,
            },
            4,
        );
        let player_id = Uuid::new_v4();
        state.roster.join(
            Participant {
                id: player_id,
                display_name: "Ash".to_owned(),
                ready: true,
                role: Role::Player,
            },
            4,
        );
        (state, host_id, player_id)
    }

    #[test]
    fn test_stat_change_for_unknown_target_is_noop() {
        let (mut state, _, player_id) = playing_state();

        let reduced = state.reduce(
            &GameAction::StatChange {
                participant_id: Uuid::new_v4(),
                stat: "hp".to_owned(),
                delta: -2,
            },
            now(),
        );

        assert_eq!(reduced, Reduced::Ignored);
        assert_eq!(state.board.stat(player_id, "hp"), 0);
    }

    #[test]
    fn test_remote_dice_roll_starts_rolling() {
        let (mut state, _, player_id) = playing_state();
        let roll_id = Uuid::new_v4();

        let reduced = state.reduce(
            &GameAction::DiceRoll {
                roll_id,
                owner_id: player_id,
                kind: DiceKind::D20,
                result: 17,
            },
            now(),
        );

        assert_eq!(reduced, Reduced::RollStarted { roll_id });
        let roll = state.dice.roll(roll_id).unwrap();
        assert!(roll.rolling);
        assert_eq!(roll.result, 17);
    }

    #[test]
    fn test_forced_roll_blocks_submission_until_settled() {
        let (mut state, _, player_id) = playing_state();
        let round_id = Uuid::new_v4();
        state.reduce(
            &GameAction::RoundOpened {
                round_id,
                waiting_for: vec!["Quinn".to_owned(), "Ash".to_owned()],
            },
            now(),
        );
        state.reduce(
            &GameAction::ForceDice {
                kind: DiceKind::D20,
                targets: RollTargets::Named(vec!["Ash".to_owned()]),
            },
            now(),
        );

        assert!(state.can_submit(player_id).is_err());

        let roll_id = Uuid::new_v4();
        state.reduce(
            &GameAction::DiceRoll {
                roll_id,
                owner_id: player_id,
                kind: DiceKind::D20,
                result: 9,
            },
            now(),
        );
        state.dice.settle_roll(roll_id, now());

        assert!(state.can_submit(player_id).is_ok());
    }

    #[test]
    fn test_passed_vote_saves_session() {
        let (mut state, host_id, player_id) = playing_state();
        state.reduce(
            &GameAction::Vote {
                signal: VoteSignal::Start { initiator: host_id },
            },
            now(),
        );

        state.reduce(
            &GameAction::Vote {
                signal: VoteSignal::Cast { voter: host_id, approve: true },
            },
            now(),
        );
        let reduced = state.reduce(
            &GameAction::Vote {
                signal: VoteSignal::Cast { voter: player_id, approve: true },
            },
            now(),
        );

        assert_eq!(reduced, Reduced::VoteResolved(VoteOutcome::Passed));
        assert_eq!(state.meta.status, SessionStatus::Saved);
    }

    #[test]
    fn test_narration_completes_round_and_clears_busy() {
        let (mut state, host_id, _) = playing_state();
        let round_id = Uuid::new_v4();
        state.reduce(
            &GameAction::RoundOpened {
                round_id,
                waiting_for: vec!["Ash".to_owned()],
            },
            now(),
        );
        state.ai_busy = true;

        state.reduce(
            &GameAction::GmNarration {
                message: ChatMessage {
                    id: Uuid::new_v4(),
                    sender_id: host_id,
                    channel: ChatChannel::Gm,
                    kind: ChatKind::Narrator,
                    text: "The door creaks open.".to_owned(),
                    sent_at: now(),
                },
            },
            now(),
        );

        assert_eq!(state.turn.phase, TurnPhase::Idle);
        assert!(!state.ai_busy);
    }

    #[test]
    fn test_lobby_start_transitions_to_playing() {
        let (mut state, _, _) = playing_state();
        state.meta.status = SessionStatus::Waiting;
        let session_id = state.meta.id;

        let reduced = state.reduce_lobby(&LobbyAction::SessionStarted { session_id });

        assert_eq!(reduced, Reduced::Applied);
        assert_eq!(state.meta.status, SessionStatus::Playing);

        // A second start is a no-op.
        let again = state.reduce_lobby(&LobbyAction::SessionStarted { session_id });
        assert_eq!(again, Reduced::Ignored);
    }
}
