mod types;
pub mod rules;

pub use rules::{check_winner, is_draw, is_full};
pub use types::{
    BOARD_SIZE, Board, GameMode, GameState, GameStatus, MAX_FIRST_MARKS, Mark, OutOfBounds,
    Square,
};
