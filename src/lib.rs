//! Serial Tic-Tac-Toe - a tic-tac-toe session engine for serial-link play
//!
//! The engine keeps one authoritative session and plays it against a remote
//! agent reached over a byte-oriented serial link.
//!
//! # Architecture
//!
//! - **Games**: board model and rules (win and draw detection)
//! - **Protocol**: the 27-character board format and two-digit move replies
//! - **Engine**: new/load/save commands, move application, turn policy
//! - **Storage**, **Transport**, **Settings**: the collaborators the engine
//!   is built from
//!
//! # Example
//!
//! ```no_run
//! use serial_tictactoe::{
//!     GameCommand, GameMode, GameService, IniStorage, InMemoryGameSettings, LineTransport, Mark,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let (link, _peer_end) = tokio::io::duplex(256);
//! let service = Arc::new(GameService::new(
//!     Arc::new(IniStorage::new("games/last.ini")),
//!     Arc::new(InMemoryGameSettings::with(GameMode::HumanVsAgent, Some(Mark::X))),
//!     Arc::new(LineTransport::from_stream(link)),
//! ));
//! let _listener = service.spawn_listener();
//!
//! service.run_command(GameCommand::NewGame).await?;
//! service.local_move(1, 1).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
mod games;
pub mod peer;
pub mod protocol;
pub mod settings;
pub mod storage;
pub mod transport;

// Crate-level exports - Engine
pub use engine::{GameCommand, GameService, ReplyPolicy};

// Crate-level exports - Errors
pub use error::{
    GameError, ProtocolError, SettingsError, StorageError, StorageErrorKind, TransportError,
    TransportErrorKind,
};

// Crate-level exports - Collaborators
pub use config::{AppConfig, ConfigError};
pub use peer::SimplePeer;
pub use settings::{GameSettings, InMemoryGameSettings, PortSettings};
pub use storage::{GameStorage, IniStorage};
pub use transport::{LineTransport, SerialTransport, Transport};

// Crate-level exports - Game types (tic-tac-toe)
pub use games::tictactoe::{
    BOARD_SIZE, Board, GameMode, GameState, GameStatus, MAX_FIRST_MARKS, Mark, OutOfBounds,
    Square, check_winner, is_draw, is_full,
};
