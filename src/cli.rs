//! Command-line interface for serial_tictactoe.

use crate::games::tictactoe::{GameMode, Mark};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Serial Tic-Tac-Toe - play against a remote agent over a serial link
#[derive(Parser, Debug)]
#[command(name = "serial_tictactoe")]
#[command(about = "Tic-tac-toe against a remote agent over a serial link", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "serial_tictactoe.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a game from the terminal
    Play {
        /// Serial device (overrides the config file)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate (overrides the config file)
        #[arg(short, long)]
        baud: Option<u32>,

        /// Game mode: HumanVsHuman, HumanVsAgent or AgentVsAgent
        #[arg(short, long)]
        mode: Option<GameMode>,

        /// Mark the human plays in HumanVsAgent: X or O
        #[arg(short, long)]
        side: Option<Mark>,

        /// File used by the save and load commands
        #[arg(long)]
        save_path: Option<PathBuf>,
    },

    /// Run the reference agent on a serial device
    Peer {
        /// Serial device (overrides the config file)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate (overrides the config file)
        #[arg(short, long)]
        baud: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play_overrides() {
        let cli = Cli::parse_from([
            "serial_tictactoe",
            "play",
            "--port",
            "/dev/ttyS0",
            "--mode",
            "HumanVsAgent",
            "--side",
            "o",
        ]);
        match cli.command {
            Command::Play { port, mode, side, .. } => {
                assert_eq!(port.as_deref(), Some("/dev/ttyS0"));
                assert_eq!(mode, Some(GameMode::HumanVsAgent));
                assert_eq!(side, Some(Mark::O));
            }
            Command::Peer { .. } => panic!("expected play"),
        }
    }

    #[test]
    fn test_parse_peer() {
        let cli = Cli::parse_from(["serial_tictactoe", "--config", "x.toml", "peer", "-b", "4800"]);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(cli.command, Command::Peer { baud: Some(4800), .. }));
    }
}
