use crate::notify::{PushChannel, Route};
use botserver_engine::moves::Move;
use reqwest::Url;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub type PlayerId = String;

/// A participant of one session.
#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    name: String,
    callback: Option<String>,
    channel: Option<PushChannel>,
    pending_move: Option<Move>,
    score: u32,
}

impl Player {
    pub fn new(name: String, callback: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            callback,
            channel: None,
            pending_move: None,
            score: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn has_moved(&self) -> bool {
        self.pending_move.is_some()
    }

    pub(crate) fn record_move(&mut self, mv: Move) {
        self.pending_move = Some(mv);
    }

    pub(crate) fn take_move(&mut self) -> Option<Move> {
        self.pending_move.take()
    }

    pub(crate) fn award_win(&mut self) {
        self.score += 1;
    }

    pub(crate) fn attach_channel(&mut self, channel: PushChannel) {
        self.channel = Some(channel);
    }

    /// How to reach this player right now, if at all.
    ///
    /// A registered push channel supersedes the callback address. A callback
    /// only counts when it is an absolute URL.
    pub fn route(&self) -> Option<Route> {
        if let Some(channel) = &self.channel {
            return Some(Route::Channel(channel.clone()));
        }
        self.callback
            .as_deref()
            .and_then(|raw| Url::parse(raw).ok())
            .filter(|url| !url.cannot_be_a_base())
            .map(Route::Callback)
    }

    pub fn is_reachable(&self) -> bool {
        self.route().is_some()
    }
}

/// Hands out `Player0`, `Player1`, ... for players who join without a name.
///
/// The counter is shared by every session of the process.
#[derive(Debug, Default)]
pub struct PlayerNamer {
    next: AtomicU64,
}

impl PlayerNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_or_next(&self, requested: &str) -> String {
        if requested.trim().is_empty() {
            let nr = self.next.fetch_add(1, Ordering::AcqRel);
            format!("Player{nr}")
        } else {
            requested.to_string()
        }
    }
}

/// Renders the scores of `players` as seen by the player at `own`: their
/// score first, the rest in join order, joined by `-`.
pub fn score_line(players: &[Player], own: usize) -> String {
    let mut scores = Vec::with_capacity(players.len());
    if let Some(player) = players.get(own) {
        scores.push(player.score.to_string());
    }
    scores.extend(
        players
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != own)
            .map(|(_, player)| player.score.to_string()),
    );
    scores.join("-")
}
