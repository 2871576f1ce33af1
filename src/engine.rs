//! Game session engine.
//!
//! [`GameService`] owns the one live [`GameState`]. Local moves and moves
//! arriving from the peer are checked against the turn and applied under
//! the same lock, so the two can never interleave.

use crate::error::{GameError, TransportError, TransportErrorKind};
use crate::games::tictactoe::{
    Board, GameMode, GameState, GameStatus, Mark, Square, check_winner, is_draw,
};
use crate::protocol;
use crate::settings::GameSettings;
use crate::storage::GameStorage;
use crate::transport::Transport;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Session lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameCommand {
    /// Start a fresh session from the current settings.
    NewGame,
    /// Replace the session with the saved one, if any.
    LoadGame,
    /// Persist the current session.
    SaveGame,
}

/// How long to wait for the peer before asking again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplyPolicy {
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    /// Re-sends of the board before the listener gives up.
    pub max_retries: u32,
}

impl ReplyPolicy {
    /// Waits at least `timeout` for each reply, re-sending up to `max_retries` times.
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout: Some(timeout),
            max_retries,
        }
    }
}

/// The live session and whether a board request is outstanding.
#[derive(Debug, Clone, Copy, Default)]
struct Session {
    game: GameState,
    awaiting_reply: bool,
}

/// Tic-tac-toe session engine.
pub struct GameService {
    session: Mutex<Session>,
    updates: watch::Sender<GameState>,
    reply_policy: ReplyPolicy,
    settings: Arc<dyn GameSettings>,
    storage: Arc<dyn GameStorage>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for GameService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameService")
            .field("session", &*self.lock())
            .field("reply_policy", &self.reply_policy)
            .finish_non_exhaustive()
    }
}

impl GameService {
    /// Creates an engine holding an empty session.
    #[instrument(skip_all)]
    pub fn new(
        storage: Arc<dyn GameStorage>,
        settings: Arc<dyn GameSettings>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (updates, _) = watch::channel(GameState::new());
        Self {
            session: Mutex::new(Session::default()),
            updates,
            reply_policy: ReplyPolicy::default(),
            settings,
            storage,
            transport,
        }
    }

    /// Sets the reply timeout used by [`listen`](Self::listen).
    pub fn with_reply_policy(mut self, policy: ReplyPolicy) -> Self {
        self.reply_policy = policy;
        self
    }

    /// Copy of the current session.
    pub fn state(&self) -> GameState {
        self.lock().game
    }

    /// Replaces the current session.
    #[instrument(skip(self))]
    pub fn set_state(&self, state: GameState) {
        let mut session = self.lock();
        *session = Session {
            game: state,
            awaiting_reply: false,
        };
        self.publish(state);
    }

    /// Receives a copy of the session after every change.
    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.updates.subscribe()
    }

    /// Runs a lifecycle command.
    ///
    /// Load faults are logged and swallowed, leaving the session untouched.
    /// Save faults propagate.
    #[instrument(skip(self))]
    pub fn invoke(&self, command: GameCommand) -> Result<(), GameError> {
        match command {
            GameCommand::NewGame => {
                self.start_new_game();
                Ok(())
            }
            GameCommand::LoadGame => {
                self.load_game();
                Ok(())
            }
            GameCommand::SaveGame => self.save_game(),
        }
    }

    /// Runs a command, then asks the peer to move if it is its turn.
    #[instrument(skip(self))]
    pub async fn run_command(&self, command: GameCommand) -> Result<GameState, GameError> {
        self.invoke(command)?;
        if command != GameCommand::SaveGame && self.is_remote_turn() {
            self.request_remote_move().await?;
        }
        Ok(self.state())
    }

    fn start_new_game(&self) {
        let mode = self.settings.game_mode();
        let human_side = match mode {
            GameMode::HumanVsAgent => self.settings.human_side(),
            _ => None,
        };
        let state = GameState::with_mode(mode, human_side);
        self.set_state(state);
        info!(?mode, ?human_side, "New game started");
    }

    fn load_game(&self) {
        let loaded = match self.storage.load_game() {
            Ok(Some(state)) if state != GameState::default() => state,
            Ok(_) => {
                info!("Nothing to load; keeping current game");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Load failed; keeping current game");
                return;
            }
        };

        self.set_state(loaded);
        self.settings.set_human_side(loaded.human_side);
        self.settings.change_game_mode(loaded.mode);
        info!(mode = ?loaded.mode, status = ?loaded.status, "Game loaded");
    }

    fn save_game(&self) -> Result<(), GameError> {
        let state = self.state();
        self.storage.save_game(&state)?;
        info!(status = ?state.status, "Game saved");
        Ok(())
    }

    /// Places the next mark at `(row, column)`.
    ///
    /// A decided game is returned unchanged whatever the coordinates.
    /// Otherwise coordinates outside the board fail with
    /// [`GameError::OutOfRange`]. An occupied cell is left as it is.
    #[instrument(skip(self))]
    pub fn make_move(&self, row: usize, column: usize) -> Result<GameState, GameError> {
        self.make_move_when(row, column, |_| true)
    }

    /// Checks `allowed` and places the mark under one lock.
    ///
    /// `allowed` runs only once the cell is known to be free, so returning
    /// true always places the mark. A refused move returns the session
    /// unchanged.
    fn make_move_when(
        &self,
        row: usize,
        column: usize,
        allowed: impl FnOnce(&mut Session) -> bool,
    ) -> Result<GameState, GameError> {
        let state = {
            let mut session = self.lock();
            if session.game.is_over() {
                debug!(status = ?session.game.status, "Move ignored; game is over");
                return Ok(session.game);
            }
            if !Board::in_bounds(row, column) {
                warn!(row, column, "Move outside the board");
                return Err(GameError::OutOfRange { row, column });
            }
            if !session.game.board.is_empty_at(row, column) {
                debug!(row, column, "Cell already taken");
                return Ok(session.game);
            }
            if !allowed(&mut *session) {
                return Ok(session.game);
            }

            let game = &mut session.game;
            let mark = game.next_mark();
            game.board
                .set(row, column, Square::Occupied(mark))
                .map_err(|_| GameError::OutOfRange { row, column })?;
            game.status = evaluate(&game.board);
            debug!(row, column, ?mark, status = ?game.status, "Mark placed");
            // Published under the lock so subscribers see moves in order.
            self.publish(*game);
            *game
        };

        if state.is_over() {
            info!(status = ?state.status, "Game over");
        }
        Ok(state)
    }

    /// Winner on the current board, if any.
    pub fn winner(&self) -> Option<Mark> {
        check_winner(&self.lock().game.board)
    }

    /// Returns true when the remote peer should supply the next move.
    #[instrument(skip(self))]
    pub fn is_remote_turn(&self) -> bool {
        remote_to_move(&self.lock().game)
    }

    /// Returns true when a local player may click a cell.
    #[instrument(skip(self))]
    pub fn is_human_turn(&self) -> bool {
        human_to_move(&self.lock().game)
    }

    /// Applies a local player's move, then asks the peer to answer if due.
    ///
    /// Clicks are ignored while it is not a local player's turn.
    #[instrument(skip(self))]
    pub async fn local_move(&self, row: usize, column: usize) -> Result<GameState, GameError> {
        let state = self.make_move_when(row, column, |session| {
            let turn = human_to_move(&session.game);
            if !turn {
                debug!("Not a local player's turn");
            }
            turn
        })?;
        if remote_to_move(&state) {
            self.request_remote_move().await?;
        }
        Ok(state)
    }

    /// Sends the encoded board to the peer. The session is not changed.
    ///
    /// The request counts as outstanding from just before the write, so a
    /// reply racing the write is still accepted. A failed write withdraws it.
    #[instrument(skip(self))]
    pub async fn request_remote_move(&self) -> Result<(), GameError> {
        let message = {
            let mut session = self.lock();
            session.awaiting_reply = true;
            protocol::encode_board(&session.game.board)
        };
        if let Err(e) = self.transport.send(message.as_bytes()).await {
            self.lock().awaiting_reply = false;
            return Err(e.into());
        }
        debug!("Requested move from peer");
        Ok(())
    }

    /// Applies one line received from the peer as a move.
    ///
    /// Lines arriving with no request outstanding, or while it is not the
    /// peer's turn, are dropped. When the peer is due to move again (agent
    /// against agent) the next request goes out straight away.
    #[instrument(skip(self))]
    pub async fn handle_inbound(&self, line: &str) -> Result<GameState, GameError> {
        let (row, column) = protocol::decode_move(line)?;
        let mut placed = false;
        let state = self.make_move_when(row, column, |session| {
            if !session.awaiting_reply {
                warn!(%line, "Unrequested move from peer; ignoring");
                return false;
            }
            if !remote_to_move(&session.game) {
                warn!(%line, "Peer moved out of turn; ignoring");
                return false;
            }
            session.awaiting_reply = false;
            placed = true;
            true
        })?;

        if placed && remote_to_move(&state) {
            self.request_remote_move().await?;
        }
        Ok(state)
    }

    /// Consumes lines from the transport until the peer closes the link.
    ///
    /// Malformed or out-of-range replies are logged and skipped. Transport
    /// failures end the loop. With a reply timeout configured, a request
    /// left unanswered is re-sent up to `max_retries` times.
    #[instrument(skip(self))]
    pub async fn listen(&self) -> Result<(), GameError> {
        let mut retries = 0;
        loop {
            let next = match self.reply_policy.timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.transport.read_line()).await {
                        Ok(next) => next?,
                        Err(_) if self.awaiting_reply() => {
                            if retries >= self.reply_policy.max_retries {
                                warn!(retries, "Peer did not answer");
                                return Err(TransportError::new(
                                    TransportErrorKind::Timeout,
                                    format!("No reply after {} retries", retries),
                                )
                                .into());
                            }
                            retries += 1;
                            warn!(retries, "Peer reply timed out; asking again");
                            self.request_remote_move().await?;
                            continue;
                        }
                        Err(_) => continue,
                    }
                }
                None => self.transport.read_line().await?,
            };

            let Some(line) = next else {
                info!("Peer closed the link");
                return Ok(());
            };
            retries = 0;

            match self.handle_inbound(&line).await {
                Ok(_) => {}
                Err(e @ (GameError::Protocol(_) | GameError::OutOfRange { .. })) => {
                    warn!(%line, error = %e, "Ignoring bad reply from peer");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Spawns [`listen`](Self::listen) on the tokio runtime.
    pub fn spawn_listener(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<(), GameError>> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.listen().await })
    }

    fn awaiting_reply(&self) -> bool {
        self.lock().awaiting_reply
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        // The session is replaced wholesale under the lock, never left half-written.
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: GameState) {
        self.updates.send_replace(state);
    }
}

/// Status after a mark has been placed.
fn evaluate(board: &Board) -> GameStatus {
    match check_winner(board) {
        Some(mark) => GameStatus::won_by(mark),
        None if is_draw(board) => GameStatus::Draw,
        None => GameStatus::Ongoing,
    }
}

fn human_to_move(state: &GameState) -> bool {
    state.status == GameStatus::Ongoing
        && state.mode != GameMode::AgentVsAgent
        && !(state.mode == GameMode::HumanVsAgent && remote_to_move(state))
}

fn remote_to_move(state: &GameState) -> bool {
    let human_just_moved = match state.human_side {
        Some(Mark::X) => state.board.count_of(Mark::X) > state.board.count_of(Mark::O),
        Some(Mark::O) => state.board.count_of(Mark::X) == state.board.count_of(Mark::O),
        None => false,
    };

    state.status == GameStatus::Ongoing
        && state.mode != GameMode::HumanVsHuman
        && (state.mode == GameMode::AgentVsAgent
            || (state.mode == GameMode::HumanVsAgent && human_just_moved))
}
