//! Tagged action sum types.
//!
//! Every broadcast is one of these variants. The serde representation is
//! adjacently tagged (`action` / `data`), so the wire shape stays readable
//! and receivers can switch on the tag. New kinds are a compile-time
//! checked addition; unknown tags from newer peers are dropped by the
//! dispatcher, never an error.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{ChatMessage, DiceKind, Participant, RollTargets, VoteSignal};

/// A gameplay mutation broadcast on the per-session channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameAction {
    /// A token moved on the board.
    MoveToken {
        /// The token.
        token_id: Uuid,
        /// New board x.
        x: f32,
        /// New board y.
        y: f32,
    },
    /// A token appeared on the board.
    SpawnToken {
        /// The token.
        token_id: Uuid,
        /// Label rendered under the token.
        label: String,
        /// Board x.
        x: f32,
        /// Board y.
        y: f32,
    },
    /// All tokens removed.
    ClearTokens,
    /// A commutative delta applied to a participant stat.
    StatChange {
        /// Whose stat.
        participant_id: Uuid,
        /// Stat name (e.g. `"hp"`).
        stat: String,
        /// Signed delta; deltas commute across clients.
        delta: i32,
    },
    /// A settled dice roll, broadcast once by the resolving client.
    DiceRoll {
        /// Roll instance id.
        roll_id: Uuid,
        /// Rolling participant.
        owner_id: Uuid,
        /// Die kind.
        kind: DiceKind,
        /// The committed result. Receivers display it, never recompute.
        result: u32,
    },
    /// The GM requires rolls from the targeted participants.
    ForceDice {
        /// Die kind required.
        kind: DiceKind,
        /// Who must roll.
        targets: RollTargets,
    },
    /// Environment effect cue (weather, lighting). Latest wins.
    EnvFx {
        /// Effect name.
        effect: String,
    },
    /// Audio cue.
    AudioFx {
        /// Cue name.
        cue: String,
    },
    /// Party-channel chatter; does not consume a turn.
    PartyChat {
        /// The message.
        message: ChatMessage,
    },
    /// A completed narration turn, broadcast once when the authoring
    /// client's typing reveal finishes.
    GmNarration {
        /// The narrator message.
        message: ChatMessage,
    },
    /// A new round opened; every client resets its turn state.
    RoundOpened {
        /// Round identity, guarding against stale narration results.
        round_id: Uuid,
        /// Display names still owed an action.
        waiting_for: Vec<String>,
    },
    /// A participant submitted their one action for the round.
    ActionSubmitted {
        /// The round this action belongs to.
        round_id: Uuid,
        /// Submitting participant.
        participant_id: Uuid,
        /// Display name, as used in `waiting_for` and the prompt.
        name: String,
        /// The action text.
        text: String,
    },
    /// An exit-vote signal.
    Vote {
        /// The signal.
        signal: VoteSignal,
    },
    /// Transient cursor presence. Never persisted.
    CursorMove {
        /// Whose cursor.
        participant_id: Uuid,
        /// Screen-space x.
        x: f32,
        /// Screen-space y.
        y: f32,
    },
}

/// A pre-game event broadcast on the per-lobby channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyAction {
    /// A participant joined the lobby.
    Joined {
        /// The participant, including role and display name.
        participant: Participant,
    },
    /// A participant left.
    Left {
        /// Who left.
        participant_id: Uuid,
    },
    /// A participant toggled readiness.
    ReadySet {
        /// Whose flag.
        participant_id: Uuid,
        /// The new value.
        ready: bool,
    },
    /// Lobby chat.
    LobbyChat {
        /// The message.
        message: ChatMessage,
    },
    /// The host started the session; clients transition to live play.
    SessionStarted {
        /// The session being started.
        session_id: Uuid,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tag_is_screaming_snake_case() {
        let action = GameAction::ClearTokens;
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "CLEAR_TOKENS");
    }

    #[test]
    fn test_dice_roll_round_trips() {
        let action = GameAction::DiceRoll {
            roll_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            kind: DiceKind::D20,
            result: 17,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "DICE_ROLL");
        assert_eq!(json["data"]["result"], 17);
        let back: GameAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }
}
