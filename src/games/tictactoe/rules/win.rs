//! Win detection logic for tic-tac-toe.

use super::super::{Board, Mark, Square};
use tracing::instrument;

/// Winning lines as `(row, column)` triples, in evaluation order.
///
/// Rows come first, then columns, then the two diagonals. When more than
/// one line is complete the earliest entry wins.
pub const LINES: [[(usize, usize); 3]; 8] = [
    // Rows
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    // Columns
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    // Diagonals
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// Checks if there is a winner on the board.
///
/// Returns `Some(mark)` for the first complete line of identical marks,
/// `None` otherwise.
#[instrument(skip(board))]
pub fn check_winner(board: &Board) -> Option<Mark> {
    for [a, b, c] in LINES {
        let sq = board.get(a.0, a.1);
        if sq != Some(Square::Empty) && sq == board.get(b.0, b.1) && sq == board.get(c.0, c.1) {
            if let Some(Square::Occupied(mark)) = sq {
                return Some(mark);
            }
        }
    }

    None
}
