use crate::events::{GameEvent, GameFinished, MoveBody, Outcome, RoundFinished, StartGame};
use crate::notify::{Notifier, PushChannel, Route};
use crate::player::{score_line, Player, PlayerId, PlayerNamer};
use crate::settings::LifecycleSettings;
use botserver_engine::errors::GameError;
use botserver_engine::moves::Move;
use botserver_engine::registry::RuleRegistry;
use botserver_engine::round::{RoundResult, Status};
use botserver_engine::rules::GameRule;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use thiserror::Error;
use uuid::Uuid;

pub type SessionId = String;

/// Parsed join request handed over by the web layer.
#[derive(Debug, Clone, Default)]
pub struct ConnectRequest {
    pub game_name: String,
    pub token: String,
    /// Requested capacity; `0` selects the rule's default
    pub player_count: usize,
    /// Display name; blank names are generated
    pub player_name: String,
    pub callback: Option<String>,
    /// Requested round target; `0` selects the rule's default
    pub total_rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectResponse {
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub player_name: String,
    pub total_rounds: u32,
}

#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub round: u32,
    pub mv: Move,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayResponse {
    pub round: u32,
    /// Names of the players who still owe a move this round
    pub players_to_move: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Fewer players than the capacity have joined
    Joining,
    /// Full; waiting for every player to become reachable
    CheckingReadiness,
    AwaitingMoves,
    /// All moves are in and a resolution pass is scheduled
    Resolving,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub has_moved: bool,
    pub reachable: bool,
}

/// Read-only view of a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub game: String,
    pub capacity: usize,
    pub total_rounds: u32,
    pub current_round: u32,
    pub phase: Phase,
    pub players: Vec<PlayerSnapshot>,
}

/// Owns every live session and drives their lifecycle.
///
/// Cloning is cheap; clones share the same registry. Both lookups
/// (join token and session id) sit behind one registry lock, and each session
/// guards its own state with a separate mutex. The registry lock is always
/// taken before a session lock, and neither is held across an `.await`.
#[derive(Debug, Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

#[derive(Debug)]
struct ManagerInner {
    rules: RuleRegistry,
    registry: RwLock<Registry>,
    notifier: Notifier,
    settings: LifecycleSettings,
    namer: PlayerNamer,
}

#[derive(Debug, Default)]
struct Registry {
    tokens: HashMap<String, SessionId>,
    sessions: HashMap<SessionId, Arc<GameSession>>,
}

impl SessionManager {
    pub fn new(rules: RuleRegistry, settings: LifecycleSettings) -> Self {
        let notifier = Notifier::new(settings.delivery_delay());
        Self {
            inner: Arc::new(ManagerInner {
                rules,
                registry: RwLock::new(Registry::default()),
                notifier,
                settings,
                namer: PlayerNamer::new(),
            }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RuleRegistry::with_defaults(), LifecycleSettings::default())
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.inner.settings
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.inner.rules
    }

    /// Joins the session behind `request.token`, creating it first if needed.
    ///
    /// When this player fills the session, the readiness check is scheduled
    /// in the background and the call returns without waiting for it.
    pub fn connect(&self, request: ConnectRequest) -> Result<ConnectResponse, SessionError> {
        if request.token.is_empty() {
            return Err(SessionError::EmptyToken);
        }

        let mut registry = self
            .inner
            .registry
            .write()
            .map_err(|_| SessionError::StoragePoisoned)?;

        let existing = registry
            .tokens
            .get(&request.token)
            .and_then(|id| registry.sessions.get(id))
            .cloned();
        let session = match existing {
            Some(session) => session,
            None => {
                let session = Arc::new(self.create_session(&request)?);
                registry
                    .tokens
                    .insert(request.token.clone(), session.id.clone());
                registry
                    .sessions
                    .insert(session.id.clone(), Arc::clone(&session));
                tracing::info!(
                    session_id = %session.id,
                    game = session.rule.name(),
                    capacity = session.capacity,
                    total_rounds = session.total_rounds,
                    "game session created"
                );
                session
            }
        };

        let (response, filled) = {
            let mut state = session.lock()?;
            if state.players.len() >= session.capacity {
                return Err(SessionError::SessionFull(session.id.clone()));
            }

            let name = self.inner.namer.name_or_next(&request.player_name);
            let player = Player::new(name, request.callback);
            let response = ConnectResponse {
                session_id: session.id.clone(),
                player_id: player.id().to_string(),
                player_name: player.name().to_string(),
                total_rounds: session.total_rounds,
            };
            state.players.push(player);

            let filled = state.players.len() == session.capacity;
            if filled {
                state.phase = Phase::CheckingReadiness;
            }
            (response, filled)
        };
        drop(registry);

        tracing::info!(
            session_id = %response.session_id,
            player_id = %response.player_id,
            player_name = %response.player_name,
            "player joined the game"
        );

        if filled {
            let manager = self.clone();
            tokio::spawn(async move {
                manager.run_readiness_check(session).await;
            });
        }

        Ok(response)
    }

    /// Upgrades a player's notification handle to `channel`.
    pub fn register_channel(
        &self,
        session_id: &str,
        player_id: &str,
        channel: PushChannel,
    ) -> Result<(), SessionError> {
        let session = self.get_session(session_id)?;
        let mut state = session.lock()?;
        let player = state
            .players
            .iter_mut()
            .find(|player| player.id() == player_id)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))?;
        player.attach_channel(channel);

        tracing::info!(
            session_id = %session_id,
            player_id = %player_id,
            "push channel registered"
        );
        Ok(())
    }

    /// Records a move for the current round.
    ///
    /// The call that records the last missing move schedules the resolution
    /// pass; until it has run, further moves for the session are refused with
    /// [`SessionError::RoundResolving`].
    pub fn play(&self, request: PlayRequest) -> Result<PlayResponse, SessionError> {
        let session = self.get_session(&request.session_id)?;

        let (response, resolve) = {
            let mut state = session.lock()?;
            // Aborted or finished sessions stay reachable until removal.
            if state.phase == Phase::Finished {
                return Err(SessionError::UnknownSession(session.id.clone()));
            }
            if state.current_round == 0 {
                return Err(SessionError::GameNotStarted(session.id.clone()));
            }
            if request.round != state.current_round {
                return Err(SessionError::StaleRound {
                    submitted: request.round,
                    current: state.current_round,
                });
            }
            session.rule.validate_move(&request.mv)?;

            let round = state.current_round;
            let resolving = state.phase == Phase::Resolving;
            let player = state
                .players
                .iter_mut()
                .find(|player| player.id() == request.player_id)
                .ok_or_else(|| SessionError::UnknownPlayer(request.player_id.clone()))?;
            if resolving {
                return Err(SessionError::RoundResolving { round });
            }

            tracing::info!(
                session_id = %session.id,
                round,
                player = %player.name(),
                "play received"
            );
            player.record_move(request.mv);

            let players_to_move: Vec<String> = state
                .players
                .iter()
                .filter(|player| !player.has_moved())
                .map(|player| player.name().to_string())
                .collect();
            let resolve = players_to_move.is_empty();
            if resolve {
                state.phase = Phase::Resolving;
            }
            (
                PlayResponse {
                    round,
                    players_to_move,
                },
                resolve,
            )
        };

        if resolve {
            let manager = self.clone();
            tokio::spawn(async move {
                manager.resolve_round(&session);
            });
        }

        Ok(response)
    }

    pub fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, SessionError> {
        let session = self.get_session(session_id)?;
        let state = session.lock()?;
        Ok(SessionSnapshot {
            session_id: session.id.clone(),
            game: session.rule.name().to_string(),
            capacity: session.capacity,
            total_rounds: session.total_rounds,
            current_round: state.current_round,
            phase: state.phase,
            players: state
                .players
                .iter()
                .map(|player| PlayerSnapshot {
                    id: player.id().to_string(),
                    name: player.name().to_string(),
                    score: player.score(),
                    has_moved: player.has_moved(),
                    reachable: player.is_reachable(),
                })
                .collect(),
        })
    }

    pub fn session_count(&self) -> usize {
        match self.inner.registry.read() {
            Ok(guard) => guard.sessions.len(),
            Err(_) => 0,
        }
    }

    pub fn session_for_token(&self, token: &str) -> Option<SessionId> {
        self.inner
            .registry
            .read()
            .ok()
            .and_then(|guard| guard.tokens.get(token).cloned())
    }

    fn get_session(&self, session_id: &str) -> Result<Arc<GameSession>, SessionError> {
        let guard = self
            .inner
            .registry
            .read()
            .map_err(|_| SessionError::StoragePoisoned)?;
        guard
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))
    }

    fn create_session(&self, request: &ConnectRequest) -> Result<GameSession, SessionError> {
        let rule = self.inner.rules.resolve(&request.game_name)?;

        let capacity = match request.player_count {
            0 => rule.default_player_count(),
            requested if rule.is_valid_player_count(requested) => requested,
            requested => {
                return Err(SessionError::InvalidPlayerCount {
                    game: rule.name().to_string(),
                    requested,
                })
            }
        };
        let total_rounds = match request.total_rounds {
            0 => rule.default_round_count(),
            rounds => rounds,
        };

        Ok(GameSession {
            id: Uuid::new_v4().to_string(),
            token: request.token.clone(),
            rule,
            capacity,
            total_rounds,
            state: Mutex::new(SessionState {
                players: Vec::with_capacity(capacity),
                current_round: 0,
                phase: Phase::Joining,
            }),
        })
    }

    fn remove_session(&self, session: &GameSession) {
        let mut guard = match self.inner.registry.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.sessions.remove(&session.id);
        if guard.tokens.get(&session.token) == Some(&session.id) {
            guard.tokens.remove(&session.token);
        }
        tracing::debug!(session_id = %session.id, "game session removed");
    }

    async fn run_readiness_check(self, session: Arc<GameSession>) {
        let attempts = self.inner.settings.readiness_attempts;
        let interval = self.inner.settings.readiness_interval();

        let mut poll = 0;
        let (reachable, unreachable) = loop {
            let (reachable, unreachable) = match session.partition_by_reachability() {
                Ok(split) => split,
                Err(err) => {
                    tracing::error!(session_id = %session.id, error = %err, "readiness check failed");
                    return;
                }
            };
            if unreachable.is_empty() || poll >= attempts {
                break (reachable, unreachable);
            }

            poll += 1;
            tracing::debug!(
                session_id = %session.id,
                poll,
                unreachable = %unreachable.join(", "),
                "waiting for players to become reachable"
            );
            tokio::time::sleep(interval).await;
        };

        if unreachable.is_empty() {
            self.start_game(&session);
        } else {
            self.abort_game(&session, reachable, &unreachable);
        }
    }

    fn start_game(&self, session: &GameSession) {
        let deliveries = match session.begin() {
            Ok(deliveries) => deliveries,
            Err(err) => {
                tracing::error!(session_id = %session.id, error = %err, "could not start game");
                return;
            }
        };

        tracing::info!(session_id = %session.id, "game started");
        self.dispatch_all(deliveries);
    }

    fn abort_game(&self, session: &GameSession, reachable: Vec<Route>, unreachable: &[String]) {
        let names = unreachable.join(", ");
        tracing::warn!(
            session_id = %session.id,
            unreachable = %names,
            "game will not start, players are unreachable"
        );

        if let Ok(mut state) = session.lock() {
            state.phase = Phase::Finished;
        }
        self.remove_session(session);

        let message = format!(
            "Game will not start and you will need to reconnect, unreachable players are: {names}"
        );
        self.dispatch_all(
            reachable
                .into_iter()
                .map(|route| (route, GameEvent::error(message.clone())))
                .collect(),
        );
    }

    fn resolve_round(&self, session: &GameSession) {
        let settlement = match session.settle() {
            Ok(settlement) => settlement,
            Err(err) => {
                tracing::error!(session_id = %session.id, error = %err, "round resolution failed");
                return;
            }
        };

        if settlement.finished {
            self.remove_session(session);
        }
        self.dispatch_all(settlement.deliveries);
    }

    fn dispatch_all(&self, deliveries: Vec<(Route, GameEvent)>) {
        for (route, event) in deliveries {
            self.inner.notifier.dispatch(route, event);
        }
    }
}

/// One game instance played by a fixed set of players.
pub struct GameSession {
    id: SessionId,
    token: String,
    rule: Arc<dyn GameRule>,
    capacity: usize,
    total_rounds: u32,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("game", &self.rule.name())
            .field("capacity", &self.capacity)
            .field("total_rounds", &self.total_rounds)
            .finish()
    }
}

#[derive(Debug)]
struct SessionState {
    players: Vec<Player>,
    current_round: u32,
    phase: Phase,
}

struct Settlement {
    finished: bool,
    deliveries: Vec<(Route, GameEvent)>,
}

impl GameSession {
    fn lock(&self) -> Result<MutexGuard<'_, SessionState>, SessionError> {
        self.state.lock().map_err(|_| SessionError::StoragePoisoned)
    }

    fn partition_by_reachability(&self) -> Result<(Vec<Route>, Vec<String>), SessionError> {
        let state = self.lock()?;
        let mut reachable = Vec::new();
        let mut unreachable = Vec::new();
        for player in &state.players {
            match player.route() {
                Some(route) => reachable.push(route),
                None => unreachable.push(player.name().to_string()),
            }
        }
        Ok((reachable, unreachable))
    }

    /// Opens round one and prepares the start notifications.
    fn begin(&self) -> Result<Vec<(Route, GameEvent)>, SessionError> {
        let mut state = self.lock()?;
        state.current_round = 1;
        state.phase = Phase::AwaitingMoves;

        let event = GameEvent::StartGame(StartGame {
            game_id: self.id.clone(),
            players: state
                .players
                .iter()
                .map(|player| player.name().to_string())
                .collect(),
            next_round: state.current_round,
        });
        Ok(routed(&self.id, &state.players, |_| event.clone()))
    }

    /// Evaluates the completed round, updates scores and the round counter,
    /// and prepares the notifications for every player.
    fn settle(&self) -> Result<Settlement, SessionError> {
        let mut state = self.lock()?;
        let round = state.current_round;

        if state.players.iter().any(|player| !player.has_moved()) {
            state.phase = Phase::AwaitingMoves;
            return Err(SessionError::IncompleteRound { round });
        }
        let moves: Vec<Move> = state
            .players
            .iter_mut()
            .filter_map(Player::take_move)
            .collect();
        let result = self.rule.evaluate_round(&moves);
        let move_bodies: BTreeMap<String, MoveBody> = state
            .players
            .iter()
            .zip(moves)
            .map(|(player, value)| (player.name().to_string(), MoveBody { value }))
            .collect();

        if result.is_draw() {
            state.phase = Phase::AwaitingMoves;
            tracing::info!(session_id = %self.id, round, "round ended in a draw");
            let deliveries = routed(&self.id, &state.players, |seat| {
                round_finished(&self.id, round, round, &state.players, seat, &result, &move_bodies)
            });
            return Ok(Settlement {
                finished: false,
                deliveries,
            });
        }

        state.current_round += 1;
        for outcome in &result.outcomes {
            if outcome.status == Status::Win {
                if let Some(player) = state.players.get_mut(outcome.seat) {
                    player.award_win();
                }
            }
        }

        let winner = result
            .winner
            .and_then(|seat| state.players.get(seat))
            .map(|player| player.name().to_string());
        let finished = self.is_game_over(&state);
        let score = score_line(&state.players, 0);

        if finished {
            state.phase = Phase::Finished;
            tracing::info!(
                session_id = %self.id,
                winner = winner.as_deref().unwrap_or_default(),
                score = %score,
                "game is over"
            );
            let deliveries = routed(&self.id, &state.players, |seat| {
                GameEvent::GameFinished(GameFinished {
                    game_id: self.id.clone(),
                    score: score_line(&state.players, seat),
                    game_result: Outcome {
                        status: result.status_of(seat).unwrap_or(Status::Lose),
                        winner: winner.clone(),
                        moves: BTreeMap::new(),
                    },
                })
            });
            return Ok(Settlement {
                finished: true,
                deliveries,
            });
        }

        state.phase = Phase::AwaitingMoves;
        tracing::info!(
            session_id = %self.id,
            round,
            winner = winner.as_deref().unwrap_or_default(),
            score = %score,
            "round won"
        );
        let next_round = state.current_round;
        let deliveries = routed(&self.id, &state.players, |seat| {
            round_finished(&self.id, round, next_round, &state.players, seat, &result, &move_bodies)
        });
        Ok(Settlement {
            finished: false,
            deliveries,
        })
    }

    /// Over once the round target is exceeded or a player holds a majority
    /// of the rounds.
    fn is_game_over(&self, state: &SessionState) -> bool {
        if state.current_round > self.total_rounds {
            return true;
        }
        let majority = self.total_rounds.saturating_sub(1) / 2;
        state.players.iter().any(|player| player.score() > majority)
    }
}

fn round_finished(
    session_id: &SessionId,
    round: u32,
    next_round: u32,
    players: &[Player],
    seat: usize,
    result: &RoundResult,
    moves: &BTreeMap<String, MoveBody>,
) -> GameEvent {
    GameEvent::RoundFinished(RoundFinished {
        game_id: session_id.clone(),
        current_round: round,
        round_result: Outcome {
            status: result.status_of(seat).unwrap_or(Status::Draw),
            winner: result
                .winner
                .and_then(|winner| players.get(winner))
                .map(|player| player.name().to_string()),
            moves: moves.clone(),
        },
        next_round,
        score: score_line(players, seat),
    })
}

/// Pairs each reachable player with the event built for their seat.
fn routed<F>(session_id: &SessionId, players: &[Player], mut event_for: F) -> Vec<(Route, GameEvent)>
where
    F: FnMut(usize) -> GameEvent,
{
    players
        .iter()
        .enumerate()
        .filter_map(|(seat, player)| match player.route() {
            Some(route) => Some((route, event_for(seat))),
            None => {
                tracing::warn!(
                    session_id = %session_id,
                    player = %player.name(),
                    "player has no route, skipping notification"
                );
                None
            }
        })
        .collect()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("token is empty")]
    EmptyToken,
    #[error("game name was not provided or does not exist: `{0}`")]
    UnknownGameType(String),
    #[error("number of players {requested} is invalid for game `{game}`")]
    InvalidPlayerCount { game: String, requested: usize },
    #[error("all players are already connected to game {0}")]
    SessionFull(SessionId),
    #[error("game id is not correct: {0}")]
    UnknownSession(SessionId),
    #[error("player id is not correct: {0}")]
    UnknownPlayer(PlayerId),
    #[error("game {0} has not started yet")]
    GameNotStarted(SessionId),
    #[error("{submitted} is not the current round ({current})")]
    StaleRound { submitted: u32, current: u32 },
    #[error("invalid move {value}: expected one of {expected}")]
    InvalidMove { value: String, expected: String },
    /// Every player has moved and the round is being evaluated. Moves are
    /// refused until the result is out; retry against the next round.
    #[error("round {round} is already being resolved")]
    RoundResolving { round: u32 },
    #[error("round {round} was resolved with moves missing")]
    IncompleteRound { round: u32 },
    #[error("Session storage poisoned")]
    StoragePoisoned,
}

impl From<GameError> for SessionError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::UnknownGameType(name) => SessionError::UnknownGameType(name),
            GameError::InvalidMove { value, expected } => {
                SessionError::InvalidMove { value, expected }
            }
        }
    }
}

impl crate::errors::IntoErrorResponse for SessionError {
    fn status_code(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;
        match self {
            SessionError::EmptyToken
            | SessionError::UnknownGameType(_)
            | SessionError::InvalidPlayerCount { .. }
            | SessionError::GameNotStarted(_)
            | SessionError::InvalidMove { .. } => StatusCode::BAD_REQUEST,
            SessionError::UnknownSession(_) | SessionError::UnknownPlayer(_) => {
                StatusCode::NOT_FOUND
            }
            SessionError::SessionFull(_)
            | SessionError::StaleRound { .. }
            | SessionError::RoundResolving { .. } => StatusCode::CONFLICT,
            SessionError::IncompleteRound { .. } | SessionError::StoragePoisoned => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SessionError::EmptyToken => "empty_token",
            SessionError::UnknownGameType(_) => "unknown_game_type",
            SessionError::InvalidPlayerCount { .. } => "invalid_player_count",
            SessionError::SessionFull(_) => "session_full",
            SessionError::UnknownSession(_) => "unknown_session",
            SessionError::UnknownPlayer(_) => "unknown_player",
            SessionError::GameNotStarted(_) => "game_not_started",
            SessionError::StaleRound { .. } => "stale_round",
            SessionError::InvalidMove { .. } => "invalid_move",
            SessionError::RoundResolving { .. } => "round_resolving",
            SessionError::IncompleteRound { .. } => "incomplete_round",
            SessionError::StoragePoisoned => "session_storage_error",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            SessionError::UnknownSession(id) | SessionError::SessionFull(id) => {
                Some(serde_json::json!({ "game_id": id }))
            }
            SessionError::StaleRound { submitted, current } => Some(serde_json::json!({
                "submitted": submitted,
                "current": current
            })),
            SessionError::InvalidMove { expected, .. } => Some(serde_json::json!({
                "expected": expected
            })),
            _ => None,
        }
    }

    fn severity(&self) -> crate::errors::ErrorSeverity {
        use crate::errors::ErrorSeverity;
        match self {
            SessionError::StoragePoisoned => ErrorSeverity::Critical,
            SessionError::IncompleteRound { .. } => ErrorSeverity::Server,
            _ => ErrorSeverity::Client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::PushReceiver;
    use std::time::Duration;

    fn manager() -> SessionManager {
        SessionManager::new(RuleRegistry::with_defaults(), LifecycleSettings::for_tests())
    }

    fn join(manager: &SessionManager, token: &str, name: &str) -> (ConnectResponse, PushReceiver) {
        let response = manager
            .connect(ConnectRequest {
                game_name: "rps".into(),
                token: token.into(),
                player_name: name.into(),
                ..Default::default()
            })
            .expect("connect");
        let (channel, receiver) = PushChannel::new();
        manager
            .register_channel(&response.session_id, &response.player_id, channel)
            .expect("register channel");
        (response, receiver)
    }

    async fn next_event(receiver: &mut PushReceiver) -> GameEvent {
        tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("event before timeout")
            .expect("channel open")
    }

    fn play(manager: &SessionManager, who: &ConnectResponse, round: u32, mv: &str) -> Result<PlayResponse, SessionError> {
        manager.play(PlayRequest {
            session_id: who.session_id.clone(),
            player_id: who.player_id.clone(),
            round,
            mv: Move::token(mv),
        })
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let err = manager().connect(ConnectRequest::default()).unwrap_err();
        assert_eq!(err, SessionError::EmptyToken);
    }

    #[tokio::test]
    async fn declared_player_count_is_validated_by_the_rule() {
        let err = manager()
            .connect(ConnectRequest {
                game_name: "rps".into(),
                token: "t".into(),
                player_count: 3,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidPlayerCount { requested: 3, .. }));
    }

    #[tokio::test]
    async fn failed_creation_leaves_no_token_behind() {
        let manager = manager();
        let err = manager
            .connect(ConnectRequest {
                game_name: "go".into(),
                token: "t".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownGameType("go".into()));
        assert_eq!(manager.session_for_token("t"), None);
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn explicit_round_target_is_kept() {
        let manager = manager();
        let response = manager
            .connect(ConnectRequest {
                game_name: "rps".into(),
                token: "t".into(),
                total_rounds: 5,
                ..Default::default()
            })
            .expect("connect");
        assert_eq!(response.total_rounds, 5);
        let snapshot = manager.snapshot(&response.session_id).expect("snapshot");
        assert_eq!(snapshot.phase, Phase::Joining);
        assert_eq!(snapshot.capacity, 2);
    }

    #[tokio::test]
    async fn moves_are_refused_while_the_round_resolves() {
        let manager = manager();
        let (alice, mut alice_rx) = join(&manager, "t", "alice");
        let (bob, _bob_rx) = join(&manager, "t", "bob");
        assert!(matches!(next_event(&mut alice_rx).await, GameEvent::StartGame(_)));

        let first = play(&manager, &alice, 1, "rock").expect("alice plays");
        assert_eq!(first.players_to_move, vec!["bob".to_string()]);

        // Resubmission before the round is complete just overwrites.
        play(&manager, &alice, 1, "paper").expect("alice changes her mind");

        let last = play(&manager, &bob, 1, "rock").expect("bob plays");
        assert!(last.players_to_move.is_empty());

        // The resolution task has not run yet on this single-threaded runtime.
        let err = play(&manager, &alice, 1, "scissors").unwrap_err();
        assert_eq!(err, SessionError::RoundResolving { round: 1 });
        assert_eq!(
            manager.snapshot(&alice.session_id).expect("snapshot").phase,
            Phase::Resolving
        );

        match next_event(&mut alice_rx).await {
            GameEvent::RoundFinished(body) => {
                assert_eq!(body.round_result.winner.as_deref(), Some("alice"));
                assert_eq!(body.round_result.status, Status::Win);
                assert_eq!(body.score, "1-0");
                assert_eq!(body.next_round, 2);
            }
            other => panic!("unexpected event {other:?}"),
        }
        let snapshot = manager.snapshot(&alice.session_id).expect("snapshot");
        assert_eq!(snapshot.phase, Phase::AwaitingMoves);
        assert_eq!(snapshot.current_round, 2);
    }

    #[tokio::test]
    async fn unknown_player_is_reported_after_round_checks() {
        let manager = manager();
        let (alice, mut alice_rx) = join(&manager, "t", "alice");
        let _bob = join(&manager, "t", "bob");
        next_event(&mut alice_rx).await;

        let err = manager
            .play(PlayRequest {
                session_id: alice.session_id.clone(),
                player_id: "nobody".into(),
                round: 1,
                mv: Move::token("rock"),
            })
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownPlayer("nobody".into()));
    }

    #[tokio::test]
    async fn finished_session_refuses_moves_before_removal() {
        let manager = manager();
        let (alice, mut alice_rx) = join(&manager, "t", "alice");
        let (bob, _bob_rx) = join(&manager, "t", "bob");
        assert!(matches!(next_event(&mut alice_rx).await, GameEvent::StartGame(_)));

        let session = manager.get_session(&alice.session_id).expect("session");
        {
            let mut state = session.lock().expect("lock");
            state.players[0].award_win();
            state.players[0].record_move(Move::token("paper"));
            state.players[1].record_move(Move::token("rock"));
        }
        let settlement = session.settle().expect("settle");
        assert!(settlement.finished);

        // The registry still holds the session at this point.
        assert_eq!(manager.session_count(), 1);
        for who in [&alice, &bob] {
            let err = play(&manager, who, 2, "rock").unwrap_err();
            assert_eq!(err, SessionError::UnknownSession(alice.session_id.clone()));
        }
        let state = session.lock().expect("lock");
        assert_eq!(state.phase, Phase::Finished);
        assert_eq!(state.players[0].score(), 2);
        assert!(state.players.iter().all(|player| !player.has_moved()));
    }

    #[test]
    fn game_over_uses_majority_of_round_target() {
        let session = GameSession {
            id: "s".into(),
            token: "t".into(),
            rule: RuleRegistry::with_defaults().resolve("rps").expect("rps"),
            capacity: 2,
            total_rounds: 3,
            state: Mutex::new(SessionState {
                players: vec![Player::new("a".into(), None), Player::new("b".into(), None)],
                current_round: 2,
                phase: Phase::AwaitingMoves,
            }),
        };
        let mut state = session.state.lock().expect("lock");
        state.players[0].award_win();
        assert!(!session.is_game_over(&state));
        state.players[0].award_win();
        assert!(session.is_game_over(&state));

        state.players[0] = Player::new("a".into(), None);
        state.current_round = 4;
        assert!(session.is_game_over(&state));
    }
}
