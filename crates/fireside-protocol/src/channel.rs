//! Channel naming.
//!
//! One gameplay channel per session and one pre-game channel per lobby.
//! All gameplay mutations ride the session channel; only join/leave/ready/
//! chat/start traffic uses the lobby channel.

use uuid::Uuid;

use fireside_core::transport::ChannelName;

/// The gameplay channel for a session.
#[must_use]
pub fn session_channel(session_id: Uuid) -> ChannelName {
    ChannelName::new(format!("session:{session_id}"))
}

/// The pre-game lobby channel.
#[must_use]
pub fn lobby_channel(session_id: Uuid) -> ChannelName {
    ChannelName::new(format!("lobby:{session_id}"))
}
