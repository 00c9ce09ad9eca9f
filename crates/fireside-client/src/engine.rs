//! The per-client game engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use uuid::Uuid;

use fireside_core::clock::Clock;
use fireside_core::error::EngineError;
use fireside_core::illustrate::SceneIllustrator;
use fireside_core::rng::DiceRng;
use fireside_core::store::RecordStore;
use fireside_core::transport::{BroadcastTransport, ChannelName};
use fireside_protocol::action::{GameAction, LobbyAction};
use fireside_protocol::channel::{lobby_channel, session_channel};
use fireside_protocol::dispatch::Dispatcher;
use fireside_protocol::envelope::Envelope;
use fireside_protocol::model::{
    ChatChannel, ChatKind, ChatMessage, DiceKind, GmKind, Participant, Role, RollTargets,
    SessionMeta, SessionStatus, VoteSignal,
};
use fireside_session::dice::{ArenaSignal, DiceRoll, settle_delay};
use fireside_session::state::{Reduced, SessionState};
use fireside_session::turn::TurnPhase;
use fireside_session::vote::VoteOutcome;
use fireside_narration::ladder::FallbackLadder;
use fireside_narration::orchestrator::{NarrationTurn, TurnOrchestrator};
use fireside_narration::prompt::history_from_chat;
use fireside_narration::reveal::{RevealStep, TypingReveal, reveal_interval};
use fireside_store::reconciler::Reconciler;

/// Events the engine surfaces to its UI between pumps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The dice arena has been open suspiciously long.
    ArenaWarning,
    /// The dice arena closed and its rolls were cleared.
    ArenaClosed,
    /// A narration turn was produced and its reveal started.
    NarrationStarted {
        /// The round being narrated.
        round_id: Uuid,
        /// Which ladder tier produced the text.
        used_tier: String,
    },
    /// The typing reveal finished; the narration was broadcast and
    /// persisted.
    NarrationRevealed {
        /// The narrator message id.
        message_id: Uuid,
    },
    /// Every narration tier failed. The round stays open; the same
    /// actions can be retried.
    NarrationFailed {
        /// The round left open.
        round_id: Uuid,
        /// The last tier's error.
        error: String,
    },
    /// An exit vote reached a terminal outcome.
    VoteResolved(VoteOutcome),
    /// A passed exit vote saved the session; local play is over.
    SessionSaved,
}

/// A roll waiting out its presentation delay.
#[derive(Debug, Clone, Copy)]
struct PendingSettle {
    roll_id: Uuid,
    due: DateTime<Utc>,
    /// Locally-initiated rolls are broadcast once, after local settle.
    broadcast: bool,
}

/// Result of one spawned narration call.
struct NarrationResolution {
    round_id: Uuid,
    result: Result<NarrationTurn, EngineError>,
}

/// The per-client session engine.
///
/// All mutation happens on the caller's task: intents mutate state, then
/// broadcast, then write behind; [`GameClient::pump`] drains remote
/// envelopes, narration resolutions, and timers. Nothing here blocks on
/// the store or on peers.
pub struct GameClient {
    state: SessionState,
    me: Participant,
    dispatcher: Dispatcher,
    transport: Arc<dyn BroadcastTransport>,
    reconciler: Reconciler,
    clock: Arc<dyn Clock>,
    rng: Box<dyn DiceRng>,
    orchestrator: Arc<AsyncMutex<TurnOrchestrator>>,
    illustrator: Arc<dyn SceneIllustrator>,
    session_channel: ChannelName,
    lobby_channel: ChannelName,
    session_rx: mpsc::Receiver<Value>,
    lobby_rx: mpsc::Receiver<Value>,
    narration_tx: mpsc::Sender<NarrationResolution>,
    narration_rx: mpsc::Receiver<NarrationResolution>,
    pending_settles: Vec<PendingSettle>,
    reveal: Option<TypingReveal>,
    next_reveal_due: Option<DateTime<Utc>>,
}

impl GameClient {
    /// Creates a session and its hosting client.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Transport` if the channel subscriptions fail.
    #[allow(clippy::too_many_arguments)]
    pub async fn host(
        transport: Arc<dyn BroadcastTransport>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DiceRng>,
        ladder: FallbackLadder,
        illustrator: Arc<dyn SceneIllustrator>,
        host_name: String,
        gm_kind: GmKind,
        max_participants: usize,
    ) -> Result<Self, EngineError> {
        let me = Participant {
            id: Uuid::new_v4(),
            display_name: host_name,
            ready: false,
            role: Role::Host,
        };
        let meta = SessionMeta {
            id: Uuid::new_v4(),
            host_id: me.id,
            status: SessionStatus::Waiting,
            gm_kind,
            max_participants,
        };
        let mut state = SessionState::new(meta);
        state.roster.join(me.clone(), max_participants);

        let client = Self::wire(transport, store, clock, rng, ladder, illustrator, state, me)
            .await?;
        client
            .publish_lobby(LobbyAction::Joined {
                participant: client.me.clone(),
            })
            .await;
        client.reconciler.persist_session(&client.state.meta);
        client
            .reconciler
            .persist_participant(client.state.meta.id, &client.me);
        Ok(client)
    }

    /// Joins an existing session, bootstrapping entirely from the durable
    /// store and only then switching to live broadcasts.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` when the session is unknown,
    /// `EngineError::Precondition` when it is full, and
    /// `EngineError::Transport` if subscriptions fail.
    #[allow(clippy::too_many_arguments)]
    pub async fn join(
        transport: Arc<dyn BroadcastTransport>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DiceRng>,
        ladder: FallbackLadder,
        illustrator: Arc<dyn SceneIllustrator>,
        session_id: Uuid,
        display_name: String,
        role: Role,
    ) -> Result<Self, EngineError> {
        let reconciler = Reconciler::new(Arc::clone(&store), Arc::clone(&clock));
        let mut state = reconciler.bootstrap(session_id).await?;
        if state.roster.len() >= state.meta.max_participants {
            return Err(EngineError::Precondition("session is full".to_owned()));
        }

        let me = Participant {
            id: Uuid::new_v4(),
            display_name,
            ready: false,
            role,
        };
        state.roster.join(me.clone(), state.meta.max_participants);

        let client = Self::wire(transport, store, clock, rng, ladder, illustrator, state, me)
            .await?;
        client
            .publish_lobby(LobbyAction::Joined {
                participant: client.me.clone(),
            })
            .await;
        client
            .reconciler
            .persist_participant(client.state.meta.id, &client.me);
        Ok(client)
    }

    #[allow(clippy::too_many_arguments)]
    async fn wire(
        transport: Arc<dyn BroadcastTransport>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DiceRng>,
        ladder: FallbackLadder,
        illustrator: Arc<dyn SceneIllustrator>,
        state: SessionState,
        me: Participant,
    ) -> Result<Self, EngineError> {
        let session_channel = session_channel(state.meta.id);
        let lobby_channel = lobby_channel(state.meta.id);
        let session_rx = transport.subscribe(&session_channel).await?;
        let lobby_rx = transport.subscribe(&lobby_channel).await?;
        let (narration_tx, narration_rx) = mpsc::channel(4);

        let mut orchestrator = TurnOrchestrator::new(ladder);
        orchestrator.seed_history(history_from_chat(&state.chat));

        Ok(Self {
            state,
            me,
            dispatcher: Dispatcher::new(fireside_core::origin::OriginTag::mint()),
            transport,
            reconciler: Reconciler::new(store, Arc::clone(&clock)),
            clock,
            rng,
            orchestrator: Arc::new(AsyncMutex::new(orchestrator)),
            illustrator,
            session_channel,
            lobby_channel,
            session_rx,
            lobby_rx,
            narration_tx,
            narration_rx,
            pending_settles: Vec::new(),
            reveal: None,
            next_reveal_due: None,
        })
    }

    /// The local session view.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The local participant.
    #[must_use]
    pub fn me(&self) -> &Participant {
        &self.me
    }

    /// The currently visible prefix of an in-flight narration reveal.
    #[must_use]
    pub fn reveal_progress(&self) -> Option<&str> {
        self.reveal.as_ref().map(TypingReveal::visible)
    }

    /// Whether this client runs the AI narration pipeline: the hosting
    /// client of an AI-GM session.
    #[must_use]
    pub fn is_narrating_authority(&self) -> bool {
        self.state.meta.gm_kind == GmKind::Ai && self.me.id == self.state.meta.host_id
    }

    /// Drains pending inputs — remote envelopes, narration resolutions,
    /// due timers — and returns the notices the UI should surface. Call
    /// this from the client's event loop; each input is processed to
    /// completion before the next.
    pub async fn pump(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();

        while let Ok(raw) = self.session_rx.try_recv() {
            self.apply_remote_game(&raw, &mut notices);
        }
        while let Ok(raw) = self.lobby_rx.try_recv() {
            self.apply_remote_lobby(&raw);
        }
        while let Ok(resolution) = self.narration_rx.try_recv() {
            self.apply_narration(resolution, &mut notices).await;
        }
        self.tick(&mut notices).await;

        notices
    }

    // --- lobby intents ---

    /// Sets the local ready flag.
    pub async fn set_ready(&mut self, ready: bool) {
        self.me.ready = ready;
        self.state.roster.set_ready(self.me.id, ready);
        self.publish_lobby(LobbyAction::ReadySet {
            participant_id: self.me.id,
            ready,
        })
        .await;
        self.reconciler
            .persist_participant(self.state.meta.id, &self.me);
    }

    /// Sends a lobby chat message.
    pub async fn send_lobby_chat(&mut self, text: impl Into<String>) {
        let message = self.make_message(ChatChannel::Party, ChatKind::Player, text.into());
        self.state.chat.push(message.clone());
        self.publish_lobby(LobbyAction::LobbyChat {
            message: message.clone(),
        })
        .await;
        self.reconciler.persist_chat(self.state.meta.id, &message);
    }

    /// Leaves the session.
    pub async fn leave(&mut self) {
        self.publish_lobby(LobbyAction::Left {
            participant_id: self.me.id,
        })
        .await;
        self.state.roster.leave(self.me.id);
        self.reconciler
            .remove_behind(fireside_core::store::Table::Participants, self.me.id);
    }

    /// Starts the session. Host only, and only once every participant is
    /// ready. On an AI-GM session with no prior narration this also fires
    /// the automatic priming turn.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Precondition` when the caller is not the
    /// host, the session already started, or someone is not ready.
    pub async fn start_session(&mut self) -> Result<(), EngineError> {
        if self.me.id != self.state.meta.host_id {
            return Err(EngineError::Precondition("only the host starts".to_owned()));
        }
        if self.state.meta.status != SessionStatus::Waiting {
            return Err(EngineError::Precondition("session already started".to_owned()));
        }
        if !self.state.roster.all_ready() {
            return Err(EngineError::Precondition("not everyone is ready".to_owned()));
        }

        let session_id = self.state.meta.id;
        self.state
            .reduce_lobby(&LobbyAction::SessionStarted { session_id });
        self.publish_lobby(LobbyAction::SessionStarted { session_id })
            .await;
        self.reconciler.persist_session(&self.state.meta);

        if self.is_narrating_authority() && !self.state.chat.has_narration() {
            self.begin_prime();
        }
        Ok(())
    }

    // --- gameplay intents ---

    /// Sends a party chat message. Party chatter never consumes a turn.
    pub async fn send_party_chat(&mut self, text: impl Into<String>) {
        let message = self.make_message(ChatChannel::Party, ChatKind::Player, text.into());
        self.state.chat.push(message.clone());
        self.publish_game(GameAction::PartyChat {
            message: message.clone(),
        })
        .await;
        self.reconciler.persist_chat(self.state.meta.id, &message);
    }

    /// Hands narration to a human GM: broadcast and persist a narrator
    /// message without the AI pipeline.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Precondition` unless this client is the host
    /// of a human-GM session.
    pub async fn send_gm_narration(&mut self, text: impl Into<String>) -> Result<(), EngineError> {
        if self.state.meta.gm_kind != GmKind::Human || self.me.id != self.state.meta.host_id {
            return Err(EngineError::Precondition(
                "only the human GM narrates directly".to_owned(),
            ));
        }
        let message = self.make_message(ChatChannel::Gm, ChatKind::Narrator, text.into());
        let action = GameAction::GmNarration {
            message: message.clone(),
        };
        self.state.reduce(&action, self.clock.now());
        self.publish_game(action).await;
        self.reconciler.persist_chat(self.state.meta.id, &message);
        Ok(())
    }

    /// Spawns a token on the board.
    pub async fn spawn_token(&mut self, label: impl Into<String>, x: f32, y: f32) -> Uuid {
        let token_id = Uuid::new_v4();
        let action = GameAction::SpawnToken {
            token_id,
            label: label.into(),
            x,
            y,
        };
        self.apply_publish_persist_token(action, token_id).await;
        token_id
    }

    /// Moves a token.
    pub async fn move_token(&mut self, token_id: Uuid, x: f32, y: f32) {
        let action = GameAction::MoveToken { token_id, x, y };
        self.apply_publish_persist_token(action, token_id).await;
    }

    /// Clears the board.
    pub async fn clear_tokens(&mut self) {
        let cleared: Vec<Uuid> = self.state.board.tokens().map(|t| t.id).collect();
        let action = GameAction::ClearTokens;
        self.state.reduce(&action, self.clock.now());
        self.publish_game(action).await;
        for token_id in cleared {
            self.reconciler
                .remove_behind(fireside_core::store::Table::Tokens, token_id);
        }
    }

    /// Applies a stat delta to a participant.
    pub async fn change_stat(&mut self, participant_id: Uuid, stat: impl Into<String>, delta: i32) {
        let action = GameAction::StatChange {
            participant_id,
            stat: stat.into(),
            delta,
        };
        if self.state.reduce(&action, self.clock.now()) == Reduced::Ignored {
            return;
        }
        self.publish_game(action).await;
    }

    /// Sets the environment effect cue.
    pub async fn set_env_fx(&mut self, effect: impl Into<String>) {
        let action = GameAction::EnvFx {
            effect: effect.into(),
        };
        self.state.reduce(&action, self.clock.now());
        self.publish_game(action).await;
    }

    /// Plays an audio cue.
    pub async fn play_audio(&mut self, cue: impl Into<String>) {
        let action = GameAction::AudioFx { cue: cue.into() };
        self.state.reduce(&action, self.clock.now());
        self.publish_game(action).await;
    }

    /// Reframes the local camera. Purely local state.
    pub fn set_camera(&mut self, x: f32, y: f32, zoom: f32) {
        self.state.view = fireside_session::board::CameraView { x, y, zoom };
    }

    /// Shares the local cursor position. Transient, never persisted.
    pub async fn move_cursor(&mut self, x: f32, y: f32) {
        let action = GameAction::CursorMove {
            participant_id: self.me.id,
            x,
            y,
        };
        self.state.reduce(&action, self.clock.now());
        self.publish_game(action).await;
    }

    /// Rolls a die. The local draw is the authoritative result; the roll
    /// is broadcast once, after it settles locally.
    pub fn roll_dice(&mut self, kind: DiceKind) -> Uuid {
        let result = self.rng.next_u32_range(1, kind.faces());
        let roll_id = Uuid::new_v4();
        let now = self.clock.now();
        self.state.dice.begin_roll(
            DiceRoll {
                id: roll_id,
                owner_id: self.me.id,
                kind,
                result,
                rolling: true,
            },
            now,
        );
        self.pending_settles.push(PendingSettle {
            roll_id,
            due: now + settle_delay(),
            broadcast: true,
        });
        roll_id
    }

    /// Requires rolls from the targeted participants. GM-side intent.
    pub async fn force_dice(&mut self, kind: DiceKind, targets: RollTargets) {
        let action = GameAction::ForceDice { kind, targets };
        if self.state.reduce(&action, self.clock.now()) == Reduced::Ignored {
            return;
        }
        self.publish_game(action).await;
    }

    /// Opens a new round: every eligible participant owes one action.
    /// Triggered on a new scene, not on every message.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Precondition` when the session is not live or
    /// the caller is not the host.
    pub async fn open_round(&mut self) -> Result<Uuid, EngineError> {
        if self.state.meta.status != SessionStatus::Playing {
            return Err(EngineError::Precondition("session is not live".to_owned()));
        }
        if self.me.id != self.state.meta.host_id {
            return Err(EngineError::Precondition("only the host opens rounds".to_owned()));
        }
        let round_id = Uuid::new_v4();
        let waiting_for = self.state.roster.turn_eligible_names(&self.state.meta);
        let action = GameAction::RoundOpened {
            round_id,
            waiting_for,
        };
        self.state.reduce(&action, self.clock.now());
        self.publish_game(action).await;

        if self.state.turn.phase == TurnPhase::AllCollected && self.is_narrating_authority() {
            self.begin_combine(round_id);
        }
        Ok(round_id)
    }

    /// Submits this participant's one action for the open round.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Precondition` when no round is collecting,
    /// the participant already submitted, or a required roll gates them.
    pub async fn submit_action(&mut self, text: impl Into<String>) -> Result<(), EngineError> {
        self.state.can_submit(self.me.id)?;
        let Some(round_id) = self.state.turn.round_id else {
            return Err(EngineError::Precondition("no round open".to_owned()));
        };
        let action = GameAction::ActionSubmitted {
            round_id,
            participant_id: self.me.id,
            name: self.me.display_name.clone(),
            text: text.into(),
        };
        let reduced = self.state.reduce(&action, self.clock.now());
        self.publish_game(action).await;

        let mut notices = Vec::new();
        self.interpret(reduced, &mut notices);
        Ok(())
    }

    /// Retries the combine step after a narration failure, reusing the
    /// already-submitted actions.
    pub fn retry_narration(&mut self) {
        if let Some(round_id) = self.state.turn.round_id {
            if self.state.turn.phase == TurnPhase::AllCollected && self.is_narrating_authority() {
                self.begin_combine(round_id);
            }
        }
    }

    /// Opens an exit vote.
    pub async fn start_exit_vote(&mut self) {
        self.send_vote(VoteSignal::Start {
            initiator: self.me.id,
        })
        .await;
    }

    /// Casts the local ballot.
    pub async fn cast_exit_vote(&mut self, approve: bool) -> Vec<Notice> {
        self.send_vote(VoteSignal::Cast {
            voter: self.me.id,
            approve,
        })
        .await
    }

    /// Withdraws the vote (initiator only).
    pub async fn cancel_exit_vote(&mut self) -> Vec<Notice> {
        self.send_vote(VoteSignal::Cancel { by: self.me.id }).await
    }

    // --- internals ---

    async fn send_vote(&mut self, signal: VoteSignal) -> Vec<Notice> {
        let action = GameAction::Vote { signal };
        let reduced = self.state.reduce(&action, self.clock.now());
        if reduced == Reduced::Ignored {
            return Vec::new();
        }
        self.publish_game(action).await;
        let mut notices = Vec::new();
        self.interpret(reduced, &mut notices);
        notices
    }

    async fn apply_publish_persist_token(&mut self, action: GameAction, token_id: Uuid) {
        if self.state.reduce(&action, self.clock.now()) == Reduced::Ignored {
            return;
        }
        self.publish_game(action).await;
        if let Some(token) = self
            .state
            .board
            .tokens()
            .find(|t| t.id == token_id)
            .cloned()
        {
            self.reconciler.persist_token(self.state.meta.id, &token);
        }
    }

    fn apply_remote_game(&mut self, raw: &Value, notices: &mut Vec<Notice>) {
        let Some(envelope) = self
            .dispatcher
            .accept::<GameAction>(self.state.meta.id, raw)
        else {
            return;
        };
        let reduced = self.state.reduce(&envelope.action, self.clock.now());
        self.interpret(reduced, notices);
    }

    fn apply_remote_lobby(&mut self, raw: &Value) {
        let Some(envelope) = self
            .dispatcher
            .accept::<LobbyAction>(self.state.meta.id, raw)
        else {
            return;
        };
        self.state.reduce_lobby(&envelope.action);
    }

    fn interpret(&mut self, reduced: Reduced, notices: &mut Vec<Notice>) {
        match reduced {
            Reduced::RollStarted { roll_id } => {
                // Replay the rolling animation locally; the committed
                // result is revealed when the settle timer fires.
                self.pending_settles.push(PendingSettle {
                    roll_id,
                    due: self.clock.now() + settle_delay(),
                    broadcast: false,
                });
            }
            Reduced::TurnComplete { round_id } => {
                if self.is_narrating_authority() {
                    self.begin_combine(round_id);
                }
            }
            Reduced::VoteResolved(outcome) => {
                notices.push(Notice::VoteResolved(outcome));
                if outcome == VoteOutcome::Passed {
                    self.reconciler.persist_session(&self.state.meta);
                    notices.push(Notice::SessionSaved);
                }
            }
            Reduced::Applied | Reduced::Ignored => {}
        }
    }

    fn begin_combine(&mut self, round_id: Uuid) {
        if !self.state.turn.begin_narration(round_id) {
            return;
        }
        self.state.ai_busy = true;
        let actions = self.state.turn.collected.clone();
        let orchestrator = Arc::clone(&self.orchestrator);
        let tx = self.narration_tx.clone();
        tokio::spawn(async move {
            let result = orchestrator
                .lock()
                .await
                .combine_and_narrate(round_id, &actions)
                .await;
            let _ = tx.send(NarrationResolution { round_id, result }).await;
        });
    }

    fn begin_prime(&mut self) {
        let round_id = Uuid::new_v4();
        self.state.turn.open_round(round_id, &[]);
        if !self.state.turn.begin_narration(round_id) {
            return;
        }
        self.state.ai_busy = true;
        let orchestrator = Arc::clone(&self.orchestrator);
        let tx = self.narration_tx.clone();
        tokio::spawn(async move {
            let result = orchestrator.lock().await.prime(round_id).await;
            let _ = tx.send(NarrationResolution { round_id, result }).await;
        });
    }

    async fn apply_narration(
        &mut self,
        resolution: NarrationResolution,
        notices: &mut Vec<Notice>,
    ) {
        let current = self.state.turn.round_id == Some(resolution.round_id)
            && self.state.turn.phase == TurnPhase::Narrating;
        if !current {
            tracing::debug!(
                round_id = %resolution.round_id,
                "stale narration resolution discarded"
            );
            return;
        }

        match resolution.result {
            Ok(turn) => {
                // Directives become forced-roll gates on every client.
                for demand in &turn.demands {
                    let action = GameAction::ForceDice {
                        kind: demand.kind,
                        targets: demand.targets.clone(),
                    };
                    if self.state.reduce(&action, self.clock.now()) != Reduced::Ignored {
                        self.publish_game(action).await;
                    }
                }

                let message_id = Uuid::new_v4();
                self.state.chat.begin_narration(message_id, true);
                self.next_reveal_due = Some(self.clock.now() + reveal_interval());
                notices.push(Notice::NarrationStarted {
                    round_id: turn.round_id,
                    used_tier: turn.used_tier.clone(),
                });

                let illustrator = Arc::clone(&self.illustrator);
                let text = turn.text.clone();
                tokio::spawn(async move {
                    if let Err(err) = illustrator.illustrate(&text).await {
                        tracing::warn!(error = %err, "scene illustration failed");
                    }
                });

                self.reveal = Some(TypingReveal::new(message_id, turn.round_id, turn.text));
            }
            Err(err) => {
                self.state.turn.narration_failed(resolution.round_id);
                self.state.ai_busy = false;
                notices.push(Notice::NarrationFailed {
                    round_id: resolution.round_id,
                    error: err.to_string(),
                });
            }
        }
    }

    async fn tick(&mut self, notices: &mut Vec<Notice>) {
        let now = self.clock.now();

        let (due, waiting): (Vec<PendingSettle>, Vec<PendingSettle>) = self
            .pending_settles
            .drain(..)
            .partition(|pending| pending.due <= now);
        self.pending_settles = waiting;
        for pending in due {
            if self.state.dice.settle_roll(pending.roll_id, now) && pending.broadcast {
                if let Some(roll) = self.state.dice.roll(pending.roll_id).cloned() {
                    self.publish_game(GameAction::DiceRoll {
                        roll_id: roll.id,
                        owner_id: roll.owner_id,
                        kind: roll.kind,
                        result: roll.result,
                    })
                    .await;
                }
            }
        }

        for signal in self.state.dice.tick(now) {
            notices.push(match signal {
                ArenaSignal::Warning => Notice::ArenaWarning,
                ArenaSignal::Closed => Notice::ArenaClosed,
            });
        }

        loop {
            let Some(due_at) = self.next_reveal_due else { break };
            if now < due_at {
                break;
            }
            let Some(reveal) = self.reveal.as_mut() else {
                self.next_reveal_due = None;
                break;
            };
            match reveal.tick() {
                RevealStep::Revealing => {
                    self.next_reveal_due = Some(due_at + reveal_interval());
                }
                RevealStep::Complete => {
                    self.next_reveal_due = None;
                    self.finalize_reveal(notices).await;
                }
            }
        }
    }

    async fn finalize_reveal(&mut self, notices: &mut Vec<Notice>) {
        let Some(reveal) = self.reveal.take() else {
            return;
        };
        let message = ChatMessage {
            id: reveal.message_id,
            sender_id: self.me.id,
            channel: ChatChannel::Gm,
            kind: ChatKind::Narrator,
            text: reveal.full_text().to_owned(),
            sent_at: self.clock.now(),
        };
        self.state.chat.push(message.clone());
        self.state.chat.finish_narration(message.id);
        self.state.turn.complete(reveal.round_id);
        self.state.ai_busy = false;

        self.publish_game(GameAction::GmNarration {
            message: message.clone(),
        })
        .await;
        self.reconciler.persist_chat(self.state.meta.id, &message);
        notices.push(Notice::NarrationRevealed {
            message_id: message.id,
        });
    }

    fn make_message(&self, channel: ChatChannel, kind: ChatKind, text: String) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            sender_id: self.me.id,
            channel,
            kind,
            text,
            sent_at: self.clock.now(),
        }
    }

    async fn publish_game(&self, action: GameAction) {
        let envelope = Envelope {
            room_id: self.state.meta.id,
            sender: self.dispatcher.origin(),
            action,
        };
        if let Err(err) = self
            .transport
            .publish(&self.session_channel, envelope.to_wire())
            .await
        {
            // Transport loss is tolerated; the store reconciles on reload.
            tracing::warn!(error = %err, "gameplay broadcast failed");
        }
    }

    async fn publish_lobby(&self, action: LobbyAction) {
        let envelope = Envelope {
            room_id: self.state.meta.id,
            sender: self.dispatcher.origin(),
            action,
        };
        if let Err(err) = self
            .transport
            .publish(&self.lobby_channel, envelope.to_wire())
            .await
        {
            tracing::warn!(error = %err, "lobby broadcast failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fireside_core::illustrate::NoopIllustrator;
    use fireside_core::store::{Filter, Table};
    use fireside_store::memory::MemoryRecordStore;
    use fireside_test_support::{FixedClock, MockRng, RecordingTransport};

    async fn recording_host() -> (GameClient, Arc<RecordingTransport>, Arc<MemoryRecordStore>) {
        let transport = Arc::new(RecordingTransport::new());
        let store = Arc::new(MemoryRecordStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 19, 0, 0).unwrap(),
        ));
        let client = GameClient::host(
            Arc::clone(&transport) as Arc<dyn BroadcastTransport>,
            Arc::clone(&store) as Arc<dyn RecordStore>,
            clock as Arc<dyn Clock>,
            Box::new(MockRng),
            FallbackLadder::new(vec![]),
            Arc::new(NoopIllustrator),
            "Quinn".to_owned(),
            GmKind::Ai,
            4,
        )
        .await
        .unwrap();
        (client, transport, store)
    }

    #[tokio::test]
    async fn test_local_apply_precedes_broadcast_and_persistence() {
        let (mut client, transport, store) = recording_host().await;
        let channel = session_channel(client.state().meta.id);

        client.send_party_chat("hail").await;

        // Applied locally and broadcast exactly once, complete.
        assert_eq!(client.state().chat.messages().len(), 1);
        let published = transport.published_on(&channel);
        assert_eq!(published.len(), 1);
        assert_eq!(published[0]["action"], "PARTY_CHAT");
        assert_eq!(published[0]["data"]["message"]["text"], "hail");

        // Write-behind lands after the fact, independently.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        let rows = store.select(Table::ChatEvents, &Filter::all()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_local_roll_broadcasts_only_after_settle() {
        let (mut client, transport, _store) = recording_host().await;
        let channel = session_channel(client.state().meta.id);
        let before = transport.published_on(&channel).len();

        let roll_id = client.roll_dice(DiceKind::D6);
        client.pump().await;

        // Still rolling: nothing on the wire yet.
        assert!(client.state().dice.roll(roll_id).unwrap().rolling);
        assert_eq!(transport.published_on(&channel).len(), before);
    }

    #[tokio::test]
    async fn test_submit_without_open_round_is_rejected() {
        let (mut client, _transport, _store) = recording_host().await;

        let result = client.submit_action("act").await;

        assert!(matches!(result, Err(EngineError::Precondition(_))));
    }
}
