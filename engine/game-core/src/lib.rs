//! Core traits and types for turn-based game adapters
//!
//! This crate provides the narrow boundary between a search engine and the
//! rules of a concrete game:
//! - `GameState`: the adapter trait a game implements (legal actions,
//!   apply/undo of moves, terminal detection, outcome)
//! - `Seat`: who acts and which team they score for
//! - `Score`: the outcome value of a finished game, either a single scalar
//!   or a per-team total
//! - `GameError`: the shared error taxonomy for adapter misuse
//!
//! The search engines never see a board, a card or a rule; they drive a
//! `GameState` through symmetric `apply`/`undo` pairs and read the outcome
//! when the game is over.

pub mod score;
pub mod seat;
pub mod state;

pub use score::{ScalarScore, Score, TeamScore};
pub use seat::Seat;
pub use state::{GameError, GameState};
