//! Game and port settings consumed by the engine.

use crate::error::{SettingsError, TransportError};
use crate::games::tictactoe::{GameMode, Mark};
use crate::transport;
use std::sync::Mutex;
use strum::IntoEnumIterator;
use tracing::{debug, instrument};

/// Baud rates offered for the serial link.
pub const AVAILABLE_BAUD_RATES: [u32; 5] = [4800, 9600, 19200, 38400, 57600];

/// Settings the engine reads on new/load and writes back on load.
pub trait GameSettings: Send + Sync {
    /// Currently selected mode.
    fn game_mode(&self) -> GameMode;

    /// Selects a mode.
    fn change_game_mode(&self, mode: GameMode);

    /// Mark the human plays in `HumanVsAgent`.
    fn human_side(&self) -> Option<Mark>;

    /// Sets the human's mark.
    fn set_human_side(&self, side: Option<Mark>);

    /// Returns true when a game can be started with these settings.
    fn is_all_set(&self) -> bool {
        match self.game_mode() {
            GameMode::None => false,
            GameMode::HumanVsAgent => self.human_side().is_some(),
            GameMode::HumanVsHuman | GameMode::AgentVsAgent => true,
        }
    }

    /// All selectable modes.
    fn available_modes(&self) -> Vec<GameMode> {
        GameMode::iter().collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct GameSettingsValues {
    mode: GameMode,
    human_side: Option<Mark>,
}

/// [`GameSettings`] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryGameSettings {
    values: Mutex<GameSettingsValues>,
}

impl InMemoryGameSettings {
    /// Creates settings with no mode and no side.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates settings preselecting `mode` and `human_side`.
    #[instrument]
    pub fn with(mode: GameMode, human_side: Option<Mark>) -> Self {
        Self {
            values: Mutex::new(GameSettingsValues { mode, human_side }),
        }
    }

    fn values(&self) -> std::sync::MutexGuard<'_, GameSettingsValues> {
        // Plain values cannot be left half-written, so a poisoned lock is still usable.
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl GameSettings for InMemoryGameSettings {
    fn game_mode(&self) -> GameMode {
        self.values().mode
    }

    #[instrument(skip(self))]
    fn change_game_mode(&self, mode: GameMode) {
        debug!(?mode, "Game mode changed");
        self.values().mode = mode;
    }

    fn human_side(&self) -> Option<Mark> {
        self.values().human_side
    }

    #[instrument(skip(self))]
    fn set_human_side(&self, side: Option<Mark>) {
        debug!(?side, "Human side changed");
        self.values().human_side = side;
    }
}

/// Serial port name and speed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortSettings {
    port_name: Option<String>,
    baud_rate: u32,
}

impl PortSettings {
    /// Creates unset port settings.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates validated port settings.
    #[instrument]
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, SettingsError> {
        let mut settings = Self::new();
        settings.change_port(port_name)?;
        settings.change_baud_rate(baud_rate)?;
        Ok(settings)
    }

    /// Selects the port by name (device path on unix).
    #[instrument(skip(self))]
    pub fn change_port(&mut self, port_name: &str) -> Result<(), SettingsError> {
        if port_name.trim().is_empty() {
            return Err(SettingsError::new("Port name must not be empty"));
        }
        self.port_name = Some(port_name.to_string());
        Ok(())
    }

    /// Sets the baud rate.
    #[instrument(skip(self))]
    pub fn change_baud_rate(&mut self, baud_rate: u32) -> Result<(), SettingsError> {
        if baud_rate == 0 {
            return Err(SettingsError::new("Baud rate must be positive"));
        }
        self.baud_rate = baud_rate;
        Ok(())
    }

    /// Selected port, if any.
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Selected baud rate, 0 when unset.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Baud rates offered to the user.
    pub fn available_baud_rates(&self) -> &'static [u32] {
        &AVAILABLE_BAUD_RATES
    }

    /// Serial ports the user can choose from.
    #[instrument(skip(self))]
    pub fn available_ports(&self) -> Result<Vec<String>, TransportError> {
        let ports = transport::available_ports()?;
        debug!(count = ports.len(), "Listed serial ports");
        Ok(ports)
    }

    /// Returns true once both the port and the speed are chosen.
    pub fn is_all_set(&self) -> bool {
        self.port_name.is_some() && self.baud_rate > 0
    }
}
