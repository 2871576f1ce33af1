//! Draw detection logic for tic-tac-toe.

use super::super::{Board, Square};
use super::win::check_winner;
use tracing::instrument;

/// Checks if the board is full (all squares occupied).
#[instrument(skip(board))]
pub fn is_full(board: &Board) -> bool {
    board.squares().iter().all(|s| *s != Square::Empty)
}

/// A board with no winner and no free square is a draw.
///
/// With X moving first and strict alternation the board fills exactly when
/// X has placed [`MAX_FIRST_MARKS`](super::super::MAX_FIRST_MARKS) marks.
#[instrument(skip(board))]
pub fn is_draw(board: &Board) -> bool {
    is_full(board) && check_winner(board).is_none()
}

#[cfg(test)]
mod tests {
    use super::super::super::{MAX_FIRST_MARKS, Mark};
    use super::*;

    fn fill(board: &mut Board, cells: &[(usize, usize, Mark)]) {
        for &(r, c, m) in cells {
            board.set(r, c, Square::Occupied(m)).unwrap();
        }
    }

    #[test]
    fn test_empty_board_not_full() {
        assert!(!is_full(&Board::new()));
        assert!(!is_draw(&Board::new()));
    }

    #[test]
    fn test_partial_board_not_full() {
        let mut board = Board::new();
        fill(&mut board, &[(1, 1, Mark::X)]);
        assert!(!is_full(&board));
    }

    #[test]
    fn test_draw_detection() {
        let mut board = Board::new();
        // X O X / O X X / O X O
        fill(
            &mut board,
            &[
                (0, 0, Mark::X),
                (0, 1, Mark::O),
                (0, 2, Mark::X),
                (1, 0, Mark::O),
                (1, 1, Mark::X),
                (1, 2, Mark::X),
                (2, 0, Mark::O),
                (2, 1, Mark::X),
                (2, 2, Mark::O),
            ],
        );

        assert!(is_draw(&board));
        assert_eq!(board.count_of(Mark::X), MAX_FIRST_MARKS);
    }

    #[test]
    fn test_not_draw_if_winner() {
        let mut board = Board::new();
        // X X X / O O X / O X O
        fill(
            &mut board,
            &[
                (0, 0, Mark::X),
                (0, 1, Mark::X),
                (0, 2, Mark::X),
                (1, 0, Mark::O),
                (1, 1, Mark::O),
                (1, 2, Mark::X),
                (2, 0, Mark::O),
                (2, 1, Mark::X),
                (2, 2, Mark::O),
            ],
        );

        assert!(is_full(&board));
        assert!(!is_draw(&board));
    }
}
