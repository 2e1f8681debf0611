//! # botserver-engine: Game Rules for the Bot Server
//!
//! Pure, synchronous game policy used by the bot server's session manager.
//! A rule decides how many players a game takes, which moves are legal and
//! who wins a round. It never sees sessions, players or transports.
//!
//! ## Core Modules
//!
//! - [`rules`] - The [`GameRule`](rules::GameRule) strategy trait
//! - [`rps`] - Reference rule: two-player rock/paper/scissors
//! - [`registry`] - Name to rule lookup populated at startup
//! - [`moves`] - The untyped [`Move`](moves::Move) value submitted by players
//! - [`round`] - [`RoundResult`](round::RoundResult) and per-seat outcomes
//! - [`errors`] - Error types for rule resolution and move validation
//!
//! ## Quick Start
//!
//! ```rust
//! use botserver_engine::moves::Move;
//! use botserver_engine::registry::RuleRegistry;
//! use botserver_engine::round::Status;
//!
//! let registry = RuleRegistry::with_defaults();
//! let rule = registry.resolve("rps").expect("rps is built in");
//!
//! rule.validate_move(&Move::token("rock")).expect("rock is legal");
//! let result = rule.evaluate_round(&[Move::token("rock"), Move::token("scissors")]);
//! assert_eq!(result.status, Status::Win);
//! assert_eq!(result.winner, Some(0));
//! ```

pub mod errors;
pub mod moves;
pub mod registry;
pub mod round;
pub mod rps;
pub mod rules;
