//! INI file storage.
//!
//! ```ini
//! [Game]
//! Mode=HumanVsAgent
//! Status=Ongoing
//! HumanSide=true
//! Board=true,null,null;null,false,null;null,null,null
//! ```
//!
//! `true` is X, `false` is O and `null` is an empty cell (or no side).

use super::GameStorage;
use crate::error::StorageError;
use crate::games::tictactoe::{BOARD_SIZE, Board, GameMode, GameState, GameStatus, Mark, Square};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, instrument};

const SECTION: &str = "Game";
const KEY_MODE: &str = "Mode";
const KEY_STATUS: &str = "Status";
const KEY_HUMAN_SIDE: &str = "HumanSide";
const KEY_LEGACY_HUMAN_SIDE: &str = "ManPlayer";
const KEY_BOARD: &str = "Board";

/// Stores one session in an INI file.
#[derive(Debug, Clone)]
pub struct IniStorage {
    path: PathBuf,
}

impl IniStorage {
    /// Creates storage backed by the file at `path`.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GameStorage for IniStorage {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load_game(&self) -> Result<Option<GameState>, StorageError> {
        let content = std::fs::read_to_string(&self.path)?;
        let state = parse_game(&content)?;
        info!(found = state.is_some(), "Game loaded");
        Ok(state)
    }

    #[instrument(skip(self, state), fields(path = %self.path.display()))]
    fn save_game(&self, state: &GameState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, render_game(state))?;
        info!(status = %state.status, "Game saved");
        Ok(())
    }
}

/// Renders `state` as the `[Game]` section.
pub(crate) fn render_game(state: &GameState) -> String {
    format!(
        "[{SECTION}]\n{KEY_MODE}={}\n{KEY_STATUS}={}\n{KEY_HUMAN_SIDE}={}\n{KEY_BOARD}={}\n",
        state.mode,
        state.status,
        side_to_str(state.human_side),
        board_to_str(&state.board),
    )
}

/// Parses the `[Game]` section, `None` when the section is absent.
#[instrument(skip(content))]
pub(crate) fn parse_game(content: &str) -> Result<Option<GameState>, StorageError> {
    let Some(fields) = read_section(content, SECTION)? else {
        debug!("No game section present");
        return Ok(None);
    };

    let field = |key: &str| {
        fields
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| StorageError::format(format!("Missing key {}", key)))
    };

    let mode = GameMode::from_str(field(KEY_MODE)?)
        .map_err(|e| StorageError::format(format!("Bad {}: {}", KEY_MODE, e)))?;
    let status = GameStatus::from_str(field(KEY_STATUS)?)
        .map_err(|e| StorageError::format(format!("Bad {}: {}", KEY_STATUS, e)))?;
    let human_side = match fields
        .get(KEY_HUMAN_SIDE)
        .or_else(|| fields.get(KEY_LEGACY_HUMAN_SIDE))
    {
        Some(value) => side_from_str(value)?,
        None => None,
    };
    let board = board_from_str(field(KEY_BOARD)?)?;

    Ok(Some(GameState {
        board,
        mode,
        status,
        human_side,
    }))
}

fn read_section(
    content: &str,
    section: &str,
) -> Result<Option<HashMap<String, String>>, StorageError> {
    let mut current: Option<String> = None;
    let mut fields: Option<HashMap<String, String>> = None;

    for (number, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            if name.eq_ignore_ascii_case(section) {
                fields.get_or_insert_with(HashMap::new);
            }
            current = Some(name);
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            StorageError::format(format!("Line {} is not key=value", number + 1))
        })?;

        let in_section = current
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(section));
        if let (true, Some(fields)) = (in_section, fields.as_mut()) {
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    Ok(fields)
}

fn side_to_str(side: Option<Mark>) -> &'static str {
    match side {
        Some(Mark::X) => "true",
        Some(Mark::O) => "false",
        None => "null",
    }
}

fn side_from_str(value: &str) -> Result<Option<Mark>, StorageError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(Some(Mark::X)),
        "false" => Ok(Some(Mark::O)),
        "null" | "" => Ok(None),
        other => Err(StorageError::format(format!("Bad cell value {:?}", other))),
    }
}

fn board_to_str(board: &Board) -> String {
    (0..BOARD_SIZE)
        .map(|row| {
            (0..BOARD_SIZE)
                .map(|column| match board.get(row, column) {
                    Some(Square::Occupied(mark)) => side_to_str(Some(mark)),
                    _ => side_to_str(None),
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn board_from_str(value: &str) -> Result<Board, StorageError> {
    let rows: Vec<&str> = value.split(';').collect();
    if rows.len() != BOARD_SIZE {
        return Err(StorageError::format(format!(
            "Board has {} rows, expected {}",
            rows.len(),
            BOARD_SIZE
        )));
    }

    let mut board = Board::new();
    for (row, cells) in rows.iter().enumerate() {
        let cells: Vec<&str> = cells.split(',').collect();
        if cells.len() != BOARD_SIZE {
            return Err(StorageError::format(format!(
                "Board row {} has {} cells, expected {}",
                row,
                cells.len(),
                BOARD_SIZE
            )));
        }
        for (column, cell) in cells.iter().enumerate() {
            let square = match side_from_str(cell)? {
                Some(mark) => Square::Occupied(mark),
                None => Square::Empty,
            };
            board
                .set(row, column, square)
                .map_err(|e| StorageError::format(e.to_string()))?;
        }
    }

    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageErrorKind;

    fn sample_state() -> GameState {
        let mut state = GameState::with_mode(GameMode::HumanVsAgent, Some(Mark::X));
        state.board.set(0, 0, Square::Occupied(Mark::X)).unwrap();
        state.board.set(1, 1, Square::Occupied(Mark::O)).unwrap();
        state
    }

    #[test]
    fn test_render_layout() {
        let text = render_game(&sample_state());
        assert_eq!(
            text,
            "[Game]\nMode=HumanVsAgent\nStatus=Ongoing\nHumanSide=true\n\
             Board=true,null,null;null,false,null;null,null,null\n"
        );
    }

    #[test]
    fn test_parse_rendered_state() {
        let state = sample_state();
        assert_eq!(parse_game(&render_game(&state)).unwrap(), Some(state));
    }

    #[test]
    fn test_parse_legacy_file() {
        let text = "; saved by the desktop client\n\
                    [Game]\n\
                    Mode = ManvsAI\n\
                    Status = WonPlayerO\n\
                    ManPlayer = False\n\
                    Board = False,False,False;True,True,null;True,null,null\n";
        let state = parse_game(text).unwrap().unwrap();
        assert_eq!(state.mode, GameMode::HumanVsAgent);
        assert_eq!(state.status, GameStatus::WonByO);
        assert_eq!(state.human_side, Some(Mark::O));
        assert_eq!(state.board.count_of(Mark::O), 3);
        assert_eq!(state.board.count_of(Mark::X), 3);
    }

    #[test]
    fn test_parse_empty_content_is_none() {
        assert_eq!(parse_game("").unwrap(), None);
        assert_eq!(parse_game("[Other]\nKey=1\n").unwrap(), None);
    }

    #[test]
    fn test_parse_null_human_side() {
        let text = "[Game]\nMode=HumanVsHuman\nStatus=Draw\nHumanSide=null\n\
                    Board=null,null,null;null,null,null;null,null,null\n";
        let state = parse_game(text).unwrap().unwrap();
        assert_eq!(state.human_side, None);
        assert_eq!(state.status, GameStatus::Draw);
    }

    #[test]
    fn test_parse_rejects_bad_board() {
        let text = "[Game]\nMode=HumanVsHuman\nStatus=Ongoing\nBoard=null,null;null\n";
        let err = parse_game(text).unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::Format);
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        let text = "[Game]\nMode=Solo\nStatus=Ongoing\n\
                    Board=null,null,null;null,null,null;null,null,null\n";
        assert_eq!(parse_game(text).unwrap_err().kind, StorageErrorKind::Format);
    }

    #[test]
    fn test_parse_rejects_missing_key() {
        let text = "[Game]\nMode=HumanVsHuman\n";
        assert_eq!(parse_game(text).unwrap_err().kind, StorageErrorKind::Format);
    }
}
