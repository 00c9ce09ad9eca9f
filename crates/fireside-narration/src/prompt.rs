//! Prompt assembly for narration turns.

use fireside_core::narration::{HistoryEntry, NarrationRequest, SpeakerRole};
use fireside_protocol::model::ChatKind;
use fireside_session::chat::ChatLog;
use fireside_session::turn::SubmittedAction;

/// Fixed system instruction sent with every narration request. Describes
/// the narration register and the inline dice-directive micro-syntax the
/// model must emit when a situation calls for a roll.
pub const SYSTEM_INSTRUCTION: &str = "\
You are the Game Master of a shared-table fantasy roleplaying session. \
Narrate the consequences of the party's actions in second person, two to \
four paragraphs, vivid but concise, always ending at a point where the \
players can act. Never speak for the players and never resolve chance \
yourself. When an action's outcome should hinge on a roll, emit an inline \
directive of the form [ROLL D20 PlayerName] — or [ROLL D6 ALL] to have \
every player roll — using only dice kinds D4, D6, D8, D10, D12, D20, D100. \
The table handles the roll; do not invent its result.";

/// Prompt used for the automatic opening turn of a session that has no
/// prior narration.
pub const PRIMING_PROMPT: &str = "\
Begin the adventure. Set the opening scene for the party, introduce where \
they are and why, and end with a hook that invites each player to act.";

/// Serializes the collected actions into the turn prompt: one
/// `Name: action` line per entry, in submission order, verbatim.
#[must_use]
pub fn combine_actions(actions: &[SubmittedAction]) -> String {
    let mut lines = Vec::with_capacity(actions.len());
    for action in actions {
        lines.push(format!("{}: {}", action.name, action.text));
    }
    lines.join("\n")
}

/// Builds the full request for one turn.
#[must_use]
pub fn build_request(prompt: String, history: Vec<HistoryEntry>) -> NarrationRequest {
    NarrationRequest {
        system: SYSTEM_INSTRUCTION.to_owned(),
        prompt,
        history,
    }
}

/// Rebuilds narration history from a persisted chat log, for a client
/// resuming a session. Narrator messages become model entries; GM-channel
/// player messages become user entries; party chatter and system lines are
/// not part of the narration conversation.
#[must_use]
pub fn history_from_chat(chat: &ChatLog) -> Vec<HistoryEntry> {
    chat.messages()
        .iter()
        .filter_map(|message| match message.kind {
            ChatKind::Narrator => Some(HistoryEntry {
                role: SpeakerRole::Model,
                text: message.text.clone(),
            }),
            ChatKind::Player
                if message.channel == fireside_protocol::model::ChatChannel::Gm =>
            {
                Some(HistoryEntry {
                    role: SpeakerRole::User,
                    text: message.text.clone(),
                })
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_attributes_each_line() {
        let actions = vec![
            SubmittedAction {
                name: "P1".to_owned(),
                text: "open the door".to_owned(),
            },
            SubmittedAction {
                name: "P2".to_owned(),
                text: "light a torch".to_owned(),
            },
        ];

        let prompt = combine_actions(&actions);

        assert_eq!(prompt, "P1: open the door\nP2: light a torch");
    }

    #[test]
    fn test_system_instruction_teaches_directive_syntax() {
        assert!(SYSTEM_INSTRUCTION.contains("[ROLL D20 PlayerName]"));
        assert!(SYSTEM_INSTRUCTION.contains("ALL"));
    }
}
