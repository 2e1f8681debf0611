use crate::errors::GameError;
use crate::moves::Move;
use crate::round::RoundResult;
use crate::rules::GameRule;
use std::str::FromStr;

const PLAYERS: usize = 2;
const ROUNDS: u32 = 3;

/// The three rock/paper/scissors hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Rock,
    Paper,
    Scissors,
}

impl Hand {
    pub const ALL: [Hand; 3] = [Hand::Rock, Hand::Paper, Hand::Scissors];

    pub fn as_str(&self) -> &'static str {
        match self {
            Hand::Rock => "rock",
            Hand::Paper => "paper",
            Hand::Scissors => "scissors",
        }
    }

    /// Cyclic dominance: rock > scissors > paper > rock.
    pub fn beats(&self, other: Hand) -> bool {
        matches!(
            (self, other),
            (Hand::Rock, Hand::Scissors) | (Hand::Scissors, Hand::Paper) | (Hand::Paper, Hand::Rock)
        )
    }
}

impl FromStr for Hand {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hand::ALL
            .into_iter()
            .find(|hand| hand.as_str() == s)
            .ok_or_else(|| invalid_move(&Move::token(s)))
    }
}

/// Two-player rock/paper/scissors, best of three by default.
#[derive(Debug, Default, Clone, Copy)]
pub struct RockPaperScissors;

impl RockPaperScissors {
    pub const NAME: &'static str = "rps";

    pub fn new() -> Self {
        Self
    }

    fn hand(mv: &Move) -> Result<Hand, GameError> {
        mv.as_token()
            .ok_or_else(|| invalid_move(mv))?
            .parse()
    }
}

impl GameRule for RockPaperScissors {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_valid_player_count(&self, players: usize) -> bool {
        players == PLAYERS
    }

    fn default_player_count(&self) -> usize {
        PLAYERS
    }

    fn default_round_count(&self) -> u32 {
        ROUNDS
    }

    fn validate_move(&self, mv: &Move) -> Result<(), GameError> {
        Self::hand(mv).map(|_| ())
    }

    fn evaluate_round(&self, moves: &[Move]) -> RoundResult {
        let hands: Vec<Option<Hand>> = moves.iter().map(|mv| Self::hand(mv).ok()).collect();
        match hands.as_slice() {
            [Some(first), Some(second)] if first.beats(*second) => RoundResult::won_by(0, PLAYERS),
            [Some(first), Some(second)] if second.beats(*first) => RoundResult::won_by(1, PLAYERS),
            _ => RoundResult::draw(moves.len()),
        }
    }
}

fn invalid_move(mv: &Move) -> GameError {
    let expected = Hand::ALL
        .iter()
        .map(Hand::as_str)
        .collect::<Vec<_>>()
        .join(",");
    GameError::InvalidMove {
        value: mv.to_string(),
        expected,
    }
}
