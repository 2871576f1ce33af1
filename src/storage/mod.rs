//! Persistence of game sessions.

mod ini;

pub use ini::IniStorage;

use crate::error::StorageError;
use crate::games::tictactoe::GameState;

/// Loads and saves whole sessions.
pub trait GameStorage: Send + Sync {
    /// Reads the saved session.
    ///
    /// `Ok(None)` means the target exists but holds no game.
    fn load_game(&self) -> Result<Option<GameState>, StorageError>;

    /// Writes `state` verbatim.
    fn save_game(&self, state: &GameState) -> Result<(), StorageError>;
}
