use serde::{Deserialize, Serialize};

/// Outcome of a round, either overall or for a single seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Win,
    Lose,
    Draw,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Win => "win",
            Status::Lose => "lose",
            Status::Draw => "draw",
        }
    }
}

/// Result of one seat in a round. Seats index the move list passed to
/// [`GameRule::evaluate_round`](crate::rules::GameRule::evaluate_round).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatOutcome {
    pub seat: usize,
    pub status: Status,
}

/// Evaluation of a single round.
///
/// `status` is [`Status::Win`] whenever a winner exists and [`Status::Draw`]
/// otherwise; it is never [`Status::Lose`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub status: Status,
    pub outcomes: Vec<SeatOutcome>,
    pub winner: Option<usize>,
}

impl RoundResult {
    /// Every seat draws.
    pub fn draw(seats: usize) -> Self {
        Self {
            status: Status::Draw,
            outcomes: (0..seats)
                .map(|seat| SeatOutcome {
                    seat,
                    status: Status::Draw,
                })
                .collect(),
            winner: None,
        }
    }

    /// `winner` wins, every other seat loses.
    pub fn won_by(winner: usize, seats: usize) -> Self {
        Self {
            status: Status::Win,
            outcomes: (0..seats)
                .map(|seat| SeatOutcome {
                    seat,
                    status: if seat == winner {
                        Status::Win
                    } else {
                        Status::Lose
                    },
                })
                .collect(),
            winner: Some(winner),
        }
    }

    pub fn is_draw(&self) -> bool {
        self.status == Status::Draw
    }

    pub fn status_of(&self, seat: usize) -> Option<Status> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.seat == seat)
            .map(|outcome| outcome.status)
    }
}
