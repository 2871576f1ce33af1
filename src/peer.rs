//! Reference remote agent.
//!
//! Answers every board it receives with the coordinates of its move, the
//! same way the hardware peer on the other end of the serial link does.

use crate::error::TransportError;
use crate::games::tictactoe::{BOARD_SIZE, Board, GameState, Mark, Square, check_winner, is_full};
use crate::protocol::{self, BOARD_MESSAGE_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

/// Agent that wins when it can, blocks when it must, and otherwise prefers
/// the centre and then the first free cell.
#[derive(Debug, Clone)]
pub struct SimplePeer {
    name: String,
}

impl SimplePeer {
    /// Creates a new peer.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the peer's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Picks the cell to play on `board`, `None` when the board is full or decided.
    #[instrument(skip(self, board), fields(peer = %self.name))]
    pub fn choose_move(&self, board: &Board) -> Option<(usize, usize)> {
        if is_full(board) || check_winner(board).is_some() {
            return None;
        }

        let me = GameState {
            board: *board,
            ..GameState::default()
        }
        .next_mark();

        let choice = completing_cell(board, me)
            .or_else(|| completing_cell(board, me.opponent()))
            .or_else(|| board.is_empty_at(1, 1).then_some((1, 1)))
            .or_else(|| {
                board
                    .cells()
                    .find(|(_, _, s)| *s == Square::Empty)
                    .map(|(r, c, _)| (r, c))
            });
        debug!(?me, ?choice, "Peer chose move");
        choice
    }

    /// Answers board requests arriving on `stream` until it closes.
    ///
    /// Requests are fixed frames of [`BOARD_MESSAGE_LEN`] bytes with no
    /// terminator. Frames that are not boards are logged and skipped; a
    /// partial frame at end of stream is discarded.
    #[instrument(skip(self, stream), fields(peer = %self.name))]
    pub async fn serve<S>(&self, stream: S) -> Result<(), TransportError>
    where
        S: AsyncRead + AsyncWrite,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut frame = [0u8; BOARD_MESSAGE_LEN];
        info!("Peer ready");

        loop {
            match reader.read_exact(&mut frame).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let text = String::from_utf8_lossy(&frame);
            let board = match protocol::decode_board(&text) {
                Ok(board) => board,
                Err(e) => {
                    warn!(frame = %text, error = %e, "Ignoring malformed board");
                    continue;
                }
            };

            match self.choose_move(&board) {
                Some((row, column)) => {
                    writer
                        .write_all(protocol::encode_move(row, column).as_bytes())
                        .await?;
                    writer.flush().await?;
                }
                None => debug!("No move left to play"),
            }
        }

        info!("Link closed; peer stopping");
        Ok(())
    }
}

/// First empty cell that would complete a line for `mark`.
fn completing_cell(board: &Board, mark: Mark) -> Option<(usize, usize)> {
    (0..BOARD_SIZE * BOARD_SIZE)
        .map(|i| (i / BOARD_SIZE, i % BOARD_SIZE))
        .filter(|&(r, c)| board.is_empty_at(r, c))
        .find(|&(r, c)| {
            let mut trial = *board;
            trial.set(r, c, Square::Occupied(mark)).is_ok() && check_winner(&trial) == Some(mark)
        })
}
