//! Error types for the session engine and its collaborators.

use derive_more::{Display, Error};
use tracing::instrument;

/// Classification of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StorageErrorKind {
    /// No saved game exists at the target.
    #[display("not found")]
    NotFound,
    /// Reading or writing the target failed.
    #[display("i/o")]
    Io,
    /// The saved data could not be understood.
    #[display("format")]
    Format,
}

/// Storage error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Storage error ({}): {} at {}:{}", kind, message, file, line)]
pub struct StorageError {
    /// What went wrong.
    pub kind: StorageErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StorageError {
    /// Creates a new storage error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for a [`StorageErrorKind::Format`] error.
    #[track_caller]
    pub fn format(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Format, message)
    }
}

impl From<std::io::Error> for StorageError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            _ => StorageErrorKind::Io,
        };
        Self::new(kind, format!("I/O error: {}", err))
    }
}

/// Classification of a [`TransportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TransportErrorKind {
    /// The port could not be opened, read or written.
    #[display("i/o")]
    Io,
    /// The peer closed the link.
    #[display("closed")]
    Closed,
    /// The peer did not answer in time.
    #[display("timeout")]
    Timeout,
}

/// Transport error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Transport error ({}): {} at {}:{}", kind, message, file, line)]
pub struct TransportError {
    /// What went wrong.
    pub kind: TransportErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl TransportError {
    /// Creates a new transport error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<std::io::Error> for TransportError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::UnexpectedEof => TransportErrorKind::Closed,
            _ => TransportErrorKind::Io,
        };
        Self::new(kind, format!("I/O error: {}", err))
    }
}

/// Malformed data on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ProtocolError {
    /// The message has the wrong number of characters.
    #[display("Expected {} characters, got {}", expected, actual)]
    BadLength {
        /// Characters required.
        expected: usize,
        /// Characters received.
        actual: usize,
    },
    /// A coordinate is not an ASCII digit.
    #[display("Invalid coordinate character {:?}", found)]
    BadCoordinate {
        /// Offending character.
        found: char,
    },
    /// A cell value is not `x`, `o` or a space.
    #[display("Invalid cell value {:?}", found)]
    BadCell {
        /// Offending character.
        found: char,
    },
    /// A board triple names a different cell than its position.
    #[display("Cell {} carries coordinates {}{}", index, row, column)]
    PositionMismatch {
        /// Row-major index of the triple.
        index: usize,
        /// Row digit found.
        row: char,
        /// Column digit found.
        column: char,
    },
}

impl std::error::Error for ProtocolError {}

/// Invalid settings value rejected at the boundary.
#[derive(Debug, Clone, Display, Error)]
#[display("Settings error: {} at {}:{}", message, file, line)]
pub struct SettingsError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SettingsError {
    /// Creates a new settings error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Errors surfaced by the game engine.
#[derive(Debug, Clone, Display)]
pub enum GameError {
    /// An argument was rejected before any state changed.
    #[display("Invalid argument: {}", _0)]
    InvalidArgument(SettingsError),

    /// A move addressed a cell outside the board.
    #[display("Move ({}, {}) is outside the board", row, column)]
    OutOfRange {
        /// Requested row.
        row: usize,
        /// Requested column.
        column: usize,
    },

    /// Saving (or loading outside the engine) failed.
    #[display("{}", _0)]
    Storage(StorageError),

    /// The serial link failed.
    #[display("{}", _0)]
    Transport(TransportError),

    /// The peer sent something that is not a move.
    #[display("Protocol error: {}", _0)]
    Protocol(ProtocolError),
}

impl std::error::Error for GameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GameError::InvalidArgument(e) => Some(e),
            GameError::OutOfRange { .. } => None,
            GameError::Storage(e) => Some(e),
            GameError::Transport(e) => Some(e),
            GameError::Protocol(e) => Some(e),
        }
    }
}

impl From<SettingsError> for GameError {
    fn from(err: SettingsError) -> Self {
        GameError::InvalidArgument(err)
    }
}

impl From<StorageError> for GameError {
    fn from(err: StorageError) -> Self {
        GameError::Storage(err)
    }
}

impl From<TransportError> for GameError {
    fn from(err: TransportError) -> Self {
        GameError::Transport(err)
    }
}

impl From<ProtocolError> for GameError {
    fn from(err: ProtocolError) -> Self {
        GameError::Protocol(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = StorageError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(err.kind, StorageErrorKind::NotFound);
        assert_eq!(err.file, file!());
    }

    #[test]
    fn test_broken_pipe_maps_to_closed() {
        let err = TransportError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(err.kind, TransportErrorKind::Closed);
    }

    #[test]
    fn test_game_error_keeps_source() {
        let err = GameError::from(ProtocolError::BadCoordinate { found: 'z' });
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "Protocol error: Invalid coordinate character 'z'");
    }
}
