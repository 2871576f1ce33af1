//! Core domain types for tic-tac-toe.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::instrument;

/// Number of rows and of columns on the board.
pub const BOARD_SIZE: usize = 3;

/// Most marks the first mover can place on a full board.
pub const MAX_FIRST_MARKS: usize = BOARD_SIZE * BOARD_SIZE / 2 + 1;

/// Mark a player puts on the board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Mark {
    /// Mark X (moves first).
    X,
    /// Mark O (moves second).
    O,
}

impl Mark {
    /// Returns the other mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

/// A square on the tic-tac-toe board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Square {
    /// Empty square.
    #[default]
    Empty,
    /// Square occupied by a mark.
    Occupied(Mark),
}

/// Error returned when a coordinate falls outside the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Cell ({}, {}) is outside the 3x3 board", row, column)]
pub struct OutOfBounds {
    /// Requested row.
    pub row: usize,
    /// Requested column.
    pub column: usize,
}

/// 3x3 tic-tac-toe board, stored by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Board {
    /// Squares in row-major order (0-8).
    squares: [Square; 9],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from squares in row-major order.
    pub fn from_squares(squares: [Square; 9]) -> Self {
        Self { squares }
    }

    /// Returns true when both coordinates are inside the board.
    pub fn in_bounds(row: usize, column: usize) -> bool {
        row < BOARD_SIZE && column < BOARD_SIZE
    }

    /// Gets the square at `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> Option<Square> {
        if !Self::in_bounds(row, column) {
            return None;
        }
        self.squares.get(row * BOARD_SIZE + column).copied()
    }

    /// Sets the square at `(row, column)`.
    pub fn set(&mut self, row: usize, column: usize, square: Square) -> Result<(), OutOfBounds> {
        if !Self::in_bounds(row, column) {
            return Err(OutOfBounds { row, column });
        }
        self.squares[row * BOARD_SIZE + column] = square;
        Ok(())
    }

    /// Checks if the square at `(row, column)` is empty.
    pub fn is_empty_at(&self, row: usize, column: usize) -> bool {
        matches!(self.get(row, column), Some(Square::Empty))
    }

    /// Counts the squares holding `mark`.
    pub fn count_of(&self, mark: Mark) -> usize {
        self.squares
            .iter()
            .filter(|s| **s == Square::Occupied(mark))
            .count()
    }

    /// Returns all squares in row-major order.
    pub fn squares(&self) -> &[Square; 9] {
        &self.squares
    }

    /// Iterates `(row, column, square)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Square)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .map(|(i, s)| (i / BOARD_SIZE, i % BOARD_SIZE, *s))
    }

    /// Formats the board as a human-readable string.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                let symbol = match self.squares[row * BOARD_SIZE + col] {
                    Square::Empty => format!("{}{}", row, col),
                    Square::Occupied(Mark::X) => " X".to_string(),
                    Square::Occupied(Mark::O) => " O".to_string(),
                };
                result.push_str(&symbol);
                if col < BOARD_SIZE - 1 {
                    result.push('|');
                }
            }
            if row < BOARD_SIZE - 1 {
                result.push_str("\n--+--+--\n");
            }
        }
        result
    }
}

/// Who controls each side of the board.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum GameMode {
    /// Not chosen yet.
    #[default]
    None,
    /// Two local humans.
    #[strum(to_string = "HumanVsHuman", serialize = "ManvsMan")]
    HumanVsHuman,
    /// A local human against the remote agent.
    #[strum(to_string = "HumanVsAgent", serialize = "ManvsAI")]
    HumanVsAgent,
    /// The remote agent plays both sides.
    #[strum(to_string = "AgentVsAgent", serialize = "AIvsAI")]
    AgentVsAgent,
}

/// Current status of the game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum GameStatus {
    /// Game is ongoing.
    #[default]
    Ongoing,
    /// Game ended in a draw.
    Draw,
    /// X completed a line.
    #[strum(to_string = "WonByX", serialize = "WonPlayerX")]
    WonByX,
    /// O completed a line.
    #[strum(to_string = "WonByO", serialize = "WonPlayerO")]
    WonByO,
}

impl GameStatus {
    /// Status reached when `mark` wins.
    pub fn won_by(mark: Mark) -> Self {
        match mark {
            Mark::X => GameStatus::WonByX,
            Mark::O => GameStatus::WonByO,
        }
    }

    /// Returns true for `Draw`, `WonByX` and `WonByO`.
    pub fn is_terminal(self) -> bool {
        self != GameStatus::Ongoing
    }
}

/// One session: board, mode, status and the human's side.
///
/// Equality is structural, so a freshly constructed state compares equal to
/// `GameState::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GameState {
    /// The board.
    pub board: Board,
    /// Who controls each side.
    pub mode: GameMode,
    /// Game status.
    pub status: GameStatus,
    /// Mark held by the human in `HumanVsAgent`.
    pub human_side: Option<Mark>,
}

impl GameState {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty session for `mode`.
    pub fn with_mode(mode: GameMode, human_side: Option<Mark>) -> Self {
        Self {
            mode,
            human_side,
            ..Self::default()
        }
    }

    /// Mark that plays next, derived from the counts on the board.
    #[instrument(skip(self))]
    pub fn next_mark(&self) -> Mark {
        if self.board.count_of(Mark::X) == self.board.count_of(Mark::O) {
            Mark::X
        } else {
            Mark::O
        }
    }

    /// Returns true once the game is decided.
    pub fn is_over(&self) -> bool {
        self.status.is_terminal()
    }
}
