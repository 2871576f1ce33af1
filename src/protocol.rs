//! Wire format exchanged with the remote peer.
//!
//! Outbound, the whole board travels as nine `row column value` triples:
//! `"00x01 02 10 11o12 20 21 22 "`. Inbound, the peer answers with the two
//! digits of the cell it played, e.g. `"12"`.

use crate::error::ProtocolError;
use crate::games::tictactoe::{BOARD_SIZE, Board, Mark, Square};
use tracing::instrument;

/// Wire character for an X cell.
pub const CHAR_X: char = 'x';

/// Wire character for an O cell.
pub const CHAR_O: char = 'o';

/// Wire character for an empty cell.
pub const CHAR_EMPTY: char = ' ';

/// Length of an encoded board.
pub const BOARD_MESSAGE_LEN: usize = BOARD_SIZE * BOARD_SIZE * 3;

/// Encodes the board as 27 characters, three per cell in row-major order.
#[instrument(skip(board))]
pub fn encode_board(board: &Board) -> String {
    let mut out = String::with_capacity(BOARD_MESSAGE_LEN);
    for (row, column, square) in board.cells() {
        out.push(digit(row));
        out.push(digit(column));
        out.push(match square {
            Square::Occupied(Mark::X) => CHAR_X,
            Square::Occupied(Mark::O) => CHAR_O,
            Square::Empty => CHAR_EMPTY,
        });
    }
    out
}

/// Decodes a board produced by [`encode_board`].
///
/// A trailing line terminator is ignored. Every triple must name the cell
/// at its own position.
#[instrument]
pub fn decode_board(message: &str) -> Result<Board, ProtocolError> {
    let chars: Vec<char> = strip_line_end(message).chars().collect();
    if chars.len() != BOARD_MESSAGE_LEN {
        return Err(ProtocolError::BadLength {
            expected: BOARD_MESSAGE_LEN,
            actual: chars.len(),
        });
    }

    let mut board = Board::new();
    for (index, triple) in chars.chunks(3).enumerate() {
        let (row, column) = (parse_digit(triple[0])?, parse_digit(triple[1])?);
        if row != index / BOARD_SIZE || column != index % BOARD_SIZE {
            return Err(ProtocolError::PositionMismatch {
                index,
                row: triple[0],
                column: triple[1],
            });
        }

        let square = match triple[2].to_ascii_lowercase() {
            CHAR_X => Square::Occupied(Mark::X),
            CHAR_O => Square::Occupied(Mark::O),
            CHAR_EMPTY => Square::Empty,
            found => return Err(ProtocolError::BadCell { found }),
        };
        // Coordinates were just checked against the index.
        board
            .set(row, column, square)
            .map_err(|_| ProtocolError::PositionMismatch {
                index,
                row: triple[0],
                column: triple[1],
            })?;
    }

    Ok(board)
}

/// Decodes the peer's reply into `(row, column)`.
///
/// Only the first two characters are read. Digits outside the board decode
/// successfully; range checking belongs to the move itself.
#[instrument]
pub fn decode_move(line: &str) -> Result<(usize, usize), ProtocolError> {
    let mut chars = strip_line_end(line).chars();
    match (chars.next(), chars.next()) {
        (Some(r), Some(c)) => Ok((parse_digit(r)?, parse_digit(c)?)),
        (first, _) => Err(ProtocolError::BadLength {
            expected: 2,
            actual: usize::from(first.is_some()),
        }),
    }
}

/// Encodes a move reply, newline terminated.
#[instrument]
pub fn encode_move(row: usize, column: usize) -> String {
    format!("{}{}\n", digit(row), digit(column))
}

fn digit(n: usize) -> char {
    char::from_digit(n as u32 % 10, 10).unwrap_or('0')
}

fn parse_digit(c: char) -> Result<usize, ProtocolError> {
    c.to_digit(10)
        .map(|d| d as usize)
        .ok_or(ProtocolError::BadCoordinate { found: c })
}

fn strip_line_end(s: &str) -> &str {
    s.trim_end_matches(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::{GameState, check_winner};
    use std::collections::HashSet;

    fn sample_board() -> Board {
        // X X X / O O _ / _ _ _
        let mut board = Board::new();
        for c in 0..3 {
            board.set(0, c, Square::Occupied(Mark::X)).unwrap();
        }
        board.set(1, 0, Square::Occupied(Mark::O)).unwrap();
        board.set(1, 1, Square::Occupied(Mark::O)).unwrap();
        board
    }

    #[test]
    fn test_encode_empty_board() {
        assert_eq!(encode_board(&Board::new()), "00 01 02 10 11 12 20 21 22 ");
    }

    #[test]
    fn test_encode_sample_board() {
        let encoded = encode_board(&sample_board());
        assert_eq!(encoded, "00x01x02x10o11o12 20 21 22 ");
        assert_eq!(encoded.len(), BOARD_MESSAGE_LEN);
    }

    #[test]
    fn test_decode_board_inverts_encode() {
        let board = sample_board();
        assert_eq!(decode_board(&encode_board(&board)).unwrap(), board);
        assert_eq!(decode_board("00 01 02 10 11 12 20 21 22 \n").unwrap(), Board::new());
    }

    /// Every board reachable from the empty board by legal play.
    fn reachable_boards() -> HashSet<Board> {
        let mut seen = HashSet::new();
        let mut stack = vec![Board::new()];
        while let Some(board) = stack.pop() {
            if !seen.insert(board) || check_winner(&board).is_some() {
                continue;
            }
            let mark = GameState {
                board,
                ..GameState::default()
            }
            .next_mark();
            for (r, c, square) in board.cells() {
                if square == Square::Empty {
                    let mut next = board;
                    next.set(r, c, Square::Occupied(mark)).unwrap();
                    stack.push(next);
                }
            }
        }
        seen
    }

    #[test]
    fn test_every_reachable_board_round_trips() {
        let boards = reachable_boards();
        assert_eq!(boards.len(), 5478);
        for board in boards {
            let encoded = encode_board(&board);
            assert_eq!(encoded.len(), BOARD_MESSAGE_LEN);
            assert_eq!(decode_board(&encoded), Ok(board), "{}", encoded);
        }
    }

    #[test]
    fn test_decode_board_rejects_bad_input() {
        assert_eq!(
            decode_board("00 01 "),
            Err(ProtocolError::BadLength { expected: 27, actual: 6 })
        );
        assert!(matches!(
            decode_board("01 00 02 10 11 12 20 21 22 "),
            Err(ProtocolError::PositionMismatch { index: 0, .. })
        ));
        assert_eq!(
            decode_board("00?01 02 10 11 12 20 21 22 "),
            Err(ProtocolError::BadCell { found: '?' })
        );
    }

    #[test]
    fn test_decode_move() {
        assert_eq!(decode_move("12"), Ok((1, 2)));
        assert_eq!(decode_move("02\r\n"), Ok((0, 2)));
        assert_eq!(decode_move("39"), Ok((3, 9)));
    }

    #[test]
    fn test_decode_move_rejects_garbage() {
        assert_eq!(decode_move("a1"), Err(ProtocolError::BadCoordinate { found: 'a' }));
        assert_eq!(
            decode_move("1\n"),
            Err(ProtocolError::BadLength { expected: 2, actual: 1 })
        );
        assert_eq!(
            decode_move(""),
            Err(ProtocolError::BadLength { expected: 2, actual: 0 })
        );
    }

    #[test]
    fn test_encode_move() {
        assert_eq!(encode_move(2, 1), "21\n");
        assert_eq!(decode_move(&encode_move(0, 2)), Ok((0, 2)));
    }
}
