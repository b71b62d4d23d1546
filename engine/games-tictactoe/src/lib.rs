//! TicTacToe reference game for the ismcts engine.
//!
//! A complete [`GameState`] implementation demonstrating the reversible
//! move protocol: every applied move is pushed onto a history stack and
//! [`GameState::undo`] pops it back off, restoring the position exactly.
//! Seat 0 plays X and maximizes; seat 1 plays O and minimizes. An X win
//! scores +1.0, an O win -1.0, a draw 0.0.

use game_core::{GameError, GameState, ScalarScore, Seat};

const EMPTY: u8 = 0;
const X: u8 = 1;
const O: u8 = 2;

const ONGOING: u8 = 0;
const DRAW: u8 = 3;

/// Winning positions (rows, columns, diagonals).
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// TicTacToe position with full move history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicTacToe {
    /// Board cells: 0=empty, 1=X, 2=O.
    board: [u8; 9],
    /// Piece the seat to move plays: 1=X, 2=O.
    current: u8,
    /// 0=ongoing, 1=X won, 2=O won, 3=draw.
    winner: u8,
    /// Positions played, in order.
    history: Vec<u8>,
}

impl TicTacToe {
    pub fn new() -> Self {
        Self {
            board: [EMPTY; 9],
            current: X,
            winner: ONGOING,
            history: Vec::with_capacity(9),
        }
    }

    /// Replay a sequence of moves from the empty board.
    pub fn from_moves(moves: &[u8]) -> Result<Self, GameError> {
        let mut game = Self::new();
        for &m in moves {
            game.apply(m)?;
        }
        Ok(game)
    }

    pub fn board(&self) -> &[u8; 9] {
        &self.board
    }

    fn winner_of(board: &[u8; 9]) -> u8 {
        for line in &LINES {
            let [a, b, c] = *line;
            if board[a] != EMPTY && board[a] == board[b] && board[b] == board[c] {
                return board[a];
            }
        }
        if board.iter().all(|&cell| cell != EMPTY) {
            return DRAW;
        }
        ONGOING
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState for TicTacToe {
    type Action = u8;
    type Score = ScalarScore;

    fn legal_actions(&self) -> Vec<u8> {
        if self.winner != ONGOING {
            return Vec::new();
        }
        (0..9u8).filter(|&p| self.board[p as usize] == EMPTY).collect()
    }

    fn current_seat(&self) -> Seat {
        Seat(self.current - 1)
    }

    fn apply(&mut self, action: u8) -> Result<Seat, GameError> {
        if self.winner != ONGOING {
            return Err(GameError::IllegalAction(format!(
                "move {action} in a finished game"
            )));
        }
        if action >= 9 || self.board[action as usize] != EMPTY {
            return Err(GameError::IllegalAction(format!(
                "position {action} is not open"
            )));
        }
        self.board[action as usize] = self.current;
        self.history.push(action);
        self.winner = Self::winner_of(&self.board);
        self.current = if self.current == X { O } else { X };
        Ok(self.current_seat())
    }

    fn undo(&mut self) -> Result<(), GameError> {
        let last = self.history.pop().ok_or(GameError::NothingToUndo)?;
        self.board[last as usize] = EMPTY;
        self.winner = ONGOING;
        self.current = if self.current == X { O } else { X };
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        self.winner != ONGOING
    }

    fn outcome(&self) -> Result<ScalarScore, GameError> {
        match self.winner {
            ONGOING => Err(GameError::NotTerminal),
            x if x == X => Ok(ScalarScore(1.0)),
            o if o == O => Ok(ScalarScore(-1.0)),
            _ => Ok(ScalarScore(0.0)),
        }
    }
}
