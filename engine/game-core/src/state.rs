//! The game adapter trait.

use std::fmt;
use std::hash::Hash;

use thiserror::Error;

use crate::score::Score;
use crate::seat::Seat;

/// Errors raised by a game adapter when it is driven incorrectly.
///
/// All of these signal a bug in the caller (the engine or the surrounding
/// history tracking), not a recoverable condition: callers must not retry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("illegal action: {0}")]
    IllegalAction(String),

    #[error("no action to undo")]
    NothingToUndo,

    #[error("outcome requested before the game is over")]
    NotTerminal,
}

/// A turn-based game position driven through reversible moves.
///
/// The engine mutates one live position in place: every `apply` during tree
/// descent is paired with exactly one `undo` on the way back up, so the
/// position a caller hands in is restored bit-for-bit before any search
/// function returns. Implementations keep an explicit history of applied
/// actions to make the reversal exact.
///
/// `Clone` is required because rollouts play random moves to the end of
/// the game on an independent copy, leaving the live position untouched.
pub trait GameState: Clone {
    /// A move in this game. Small and copyable.
    type Action: Copy + Eq + Hash + fmt::Debug;

    /// The outcome shape of this game (scalar or per-team).
    type Score: Score;

    /// Actions legal at the current position. Must be stable: calling this
    /// repeatedly without an intervening `apply`/`undo` returns the same set.
    fn legal_actions(&self) -> Vec<Self::Action>;

    /// The seat that acts at the current position.
    fn current_seat(&self) -> Seat;

    /// Apply a legal action and return the seat that acts next.
    ///
    /// Fails with [`GameError::IllegalAction`] if the action is not
    /// currently legal; the position is unchanged in that case.
    fn apply(&mut self, action: Self::Action) -> Result<Seat, GameError>;

    /// Reverse exactly the most recent `apply`, restoring both the board
    /// and the actor. Fails with [`GameError::NothingToUndo`] when no
    /// history remains.
    fn undo(&mut self) -> Result<(), GameError>;

    /// Whether the game is over.
    fn is_terminal(&self) -> bool;

    /// The final outcome. Only valid once `is_terminal()` is true; fails
    /// with [`GameError::NotTerminal`] before that.
    fn outcome(&self) -> Result<Self::Score, GameError>;
}
