//! End-to-end games against the reference peer over an in-memory link.

use serial_tictactoe::protocol::BOARD_MESSAGE_LEN;
use serial_tictactoe::{
    GameCommand, GameMode, GameService, GameState, GameStatus, GameStorage, InMemoryGameSettings,
    LineTransport, Mark, SimplePeer, Square, StorageError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;

struct NoStorage;

impl GameStorage for NoStorage {
    fn load_game(&self) -> Result<Option<GameState>, StorageError> {
        Ok(None)
    }

    fn save_game(&self, _state: &GameState) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Engine wired to a `SimplePeer` running on the far end of a duplex stream.
fn linked_service(mode: GameMode, side: Option<Mark>) -> Arc<GameService> {
    let (near, far) = tokio::io::duplex(1024);

    tokio::spawn(async move { SimplePeer::new("far-end").serve(far).await });

    Arc::new(GameService::new(
        Arc::new(NoStorage),
        Arc::new(InMemoryGameSettings::with(mode, side)),
        Arc::new(LineTransport::from_stream(near)),
    ))
}

async fn wait_for(
    updates: &mut watch::Receiver<GameState>,
    done: impl Fn(&GameState) -> bool,
) -> GameState {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = *updates.borrow_and_update();
            if done(&state) {
                return state;
            }
            updates.changed().await.unwrap();
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_agent_vs_agent_plays_to_the_end() {
    let service = linked_service(GameMode::AgentVsAgent, None);
    let mut updates = service.subscribe();
    let listener = service.spawn_listener();

    service.run_command(GameCommand::NewGame).await.unwrap();
    let end = wait_for(&mut updates, |s| s.is_over()).await;

    let xs = end.board.count_of(Mark::X);
    let os = end.board.count_of(Mark::O);
    assert!(xs == os || xs == os + 1);
    assert_ne!(end.status, GameStatus::Ongoing);
    assert_eq!(service.state(), end);
    assert!(!service.is_remote_turn());

    listener.abort();
}

#[tokio::test]
async fn test_agent_answers_human_move() {
    let service = linked_service(GameMode::HumanVsAgent, Some(Mark::X));
    let mut updates = service.subscribe();
    let listener = service.spawn_listener();

    service.run_command(GameCommand::NewGame).await.unwrap();
    service.local_move(0, 0).await.unwrap();

    let state = wait_for(&mut updates, |s| s.board.count_of(Mark::O) == 1).await;
    // The peer takes the free centre.
    assert_eq!(state.board.get(1, 1), Some(Square::Occupied(Mark::O)));
    assert!(service.is_human_turn());

    listener.abort();
}

#[tokio::test]
async fn test_agent_opens_when_human_is_o() {
    let service = linked_service(GameMode::HumanVsAgent, Some(Mark::O));
    let mut updates = service.subscribe();
    let listener = service.spawn_listener();

    service.run_command(GameCommand::NewGame).await.unwrap();
    let state = wait_for(&mut updates, |s| s.board.count_of(Mark::X) == 1).await;

    assert_eq!(state.board.get(1, 1), Some(Square::Occupied(Mark::X)));
    assert!(service.is_human_turn());

    listener.abort();
}

#[tokio::test]
async fn test_peer_ignores_malformed_boards() {
    let (near, far) = tokio::io::duplex(256);
    let peer = tokio::spawn(async move { SimplePeer::new("far-end").serve(far).await });

    let (reader, mut writer) = tokio::io::split(near);
    writer.write_all(&[b'?'; BOARD_MESSAGE_LEN]).await.unwrap();
    writer.write_all(b"00x01 02 10 11 12 20 21 22 ").await.unwrap();

    let mut replies = BufReader::new(reader).lines();
    assert_eq!(replies.next_line().await.unwrap().as_deref(), Some("11"));

    drop(writer);
    drop(replies);
    peer.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_board_requests_are_unterminated_frames() {
    let (near, mut far) = tokio::io::duplex(256);
    let service = GameService::new(
        Arc::new(NoStorage),
        Arc::new(InMemoryGameSettings::with(GameMode::AgentVsAgent, None)),
        Arc::new(LineTransport::from_stream(near)),
    );
    service.invoke(GameCommand::NewGame).unwrap();

    service.request_remote_move().await.unwrap();
    service.request_remote_move().await.unwrap();

    let mut frames = [0u8; 2 * BOARD_MESSAGE_LEN];
    far.read_exact(&mut frames).await.unwrap();
    let (first, second) = frames.split_at(BOARD_MESSAGE_LEN);
    assert_eq!(first, b"00 01 02 10 11 12 20 21 22 ");
    assert_eq!(second, b"00 01 02 10 11 12 20 21 22 ");
}
