use crate::errors::GameError;
use crate::moves::Move;
use crate::round::RoundResult;

/// Policy object describing one named game.
///
/// Implementations are stateless and shared between every session that plays
/// the game, so they must be `Send + Sync`. A session holds exactly one rule
/// for its whole lifetime and consults it for player counts, defaults, move
/// validation and round evaluation.
///
/// # Example Implementation
///
/// ```rust
/// use botserver_engine::errors::GameError;
/// use botserver_engine::moves::Move;
/// use botserver_engine::round::RoundResult;
/// use botserver_engine::rules::GameRule;
///
/// /// Highest number wins, equal numbers draw.
/// struct HighCard;
///
/// impl GameRule for HighCard {
///     fn name(&self) -> &str {
///         "high-card"
///     }
///
///     fn is_valid_player_count(&self, players: usize) -> bool {
///         players == 2
///     }
///
///     fn default_player_count(&self) -> usize {
///         2
///     }
///
///     fn default_round_count(&self) -> u32 {
///         5
///     }
///
///     fn validate_move(&self, mv: &Move) -> Result<(), GameError> {
///         match mv {
///             Move::Number(n) if (1..=13).contains(n) => Ok(()),
///             other => Err(GameError::InvalidMove {
///                 value: other.to_string(),
///                 expected: "a number between 1 and 13".into(),
///             }),
///         }
///     }
///
///     fn evaluate_round(&self, moves: &[Move]) -> RoundResult {
///         match (&moves[0], &moves[1]) {
///             (Move::Number(a), Move::Number(b)) if a > b => RoundResult::won_by(0, 2),
///             (Move::Number(a), Move::Number(b)) if b > a => RoundResult::won_by(1, 2),
///             _ => RoundResult::draw(2),
///         }
///     }
/// }
///
/// let rule = HighCard;
/// assert!(rule.validate_move(&Move::Number(3)).is_ok());
/// assert_eq!(
///     rule.evaluate_round(&[Move::Number(9), Move::Number(4)]).winner,
///     Some(0)
/// );
/// ```
pub trait GameRule: Send + Sync {
    /// Registry key of the game, e.g. `"rps"`.
    fn name(&self) -> &str;

    /// Whether a session may be created for `players` participants.
    fn is_valid_player_count(&self, players: usize) -> bool;

    /// Player count used when the creator leaves it unspecified.
    fn default_player_count(&self) -> usize;

    /// Round target used when the creator leaves it unspecified.
    fn default_round_count(&self) -> u32;

    /// Checks that `mv` is a recognized move for this game.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidMove`] when the value is not accepted.
    fn validate_move(&self, mv: &Move) -> Result<(), GameError>;

    /// Evaluates one round. `moves[i]` is the move of seat `i`; every move has
    /// already passed [`validate_move`](GameRule::validate_move).
    fn evaluate_round(&self, moves: &[Move]) -> RoundResult;
}
