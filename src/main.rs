//! Serial Tic-Tac-Toe - terminal driver
//!
//! `play` runs a session from stdin; `peer` runs the reference agent.

use anyhow::{Context, Result};
use clap::Parser;
use serial_tictactoe::cli::{Cli, Command};
use serial_tictactoe::transport::open_serial;
use serial_tictactoe::{
    AppConfig, GameCommand, GameError, GameService, GameSettings, GameState, GameStatus,
    InMemoryGameSettings, IniStorage, PortSettings, SerialTransport, SimplePeer, protocol,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load_or_default(&cli.config)?;

    match cli.command {
        Command::Play {
            port,
            baud,
            mode,
            side,
            save_path,
        } => run_play(config.apply_overrides(port, baud, mode, side, save_path)).await,
        Command::Peer { port, baud } => {
            run_peer(config.apply_overrides(port, baud, None, None, None)).await
        }
    }
}

/// Port settings named in `config`.
fn port_settings(config: &AppConfig) -> Result<PortSettings> {
    Ok(PortSettings::open(config.port(), *config.baud_rate())?)
}

/// Play a game from the terminal
#[instrument(skip_all, fields(port = %config.port(), mode = %config.mode()))]
async fn run_play(config: AppConfig) -> Result<()> {
    let settings = Arc::new(InMemoryGameSettings::with(*config.mode(), *config.human_side()));
    if !settings.is_all_set() {
        warn!("Game settings incomplete; choose a mode (and a side for HumanVsAgent)");
    }

    let transport = SerialTransport::open(&port_settings(&config)?)
        .with_context(|| format!("Failed to open {}", config.port()))?;
    let service = Arc::new(
        GameService::new(
            Arc::new(IniStorage::new(config.save_path())),
            settings,
            Arc::new(transport),
        )
        .with_reply_policy(config.reply_policy()),
    );

    let mut listener = service.spawn_listener();
    let mut listening = true;
    let mut updates = service.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = *updates.borrow_and_update();
            print_state(&state);
        }
    });

    print_help();
    service.run_command(GameCommand::NewGame).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let outcome = loop {
        tokio::select! {
            finished = &mut listener, if listening => {
                listening = false;
                match finished {
                    Ok(Ok(())) => println!("The peer closed the link."),
                    Ok(Err(e)) => {
                        error!(error = %e, "Lost the peer");
                        break Err(anyhow::Error::new(e).context("Peer link failed"));
                    }
                    Err(e) => break Err(anyhow::Error::new(e).context("Listener task failed")),
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break Ok(());
                };
                match handle_input(&service, line.trim()).await {
                    Ok(ControlFlow::Continue(())) => {}
                    Ok(ControlFlow::Break(())) => break Ok(()),
                    Err(e) => println!("{}", e),
                }
            }
        }
    };

    info!("Leaving game");
    listener.abort();
    printer.abort();
    outcome
}

/// Runs one line of terminal input against the session.
async fn handle_input(service: &GameService, input: &str) -> Result<ControlFlow<()>, GameError> {
    match input {
        "" => {}
        "q" | "quit" => return Ok(ControlFlow::Break(())),
        "h" | "help" => print_help(),
        "n" | "new" => {
            service.run_command(GameCommand::NewGame).await?;
        }
        "l" | "load" => {
            service.run_command(GameCommand::LoadGame).await?;
        }
        "s" | "save" => {
            service.run_command(GameCommand::SaveGame).await?;
        }
        cell => match protocol::decode_move(cell) {
            Ok((row, column)) => {
                service.local_move(row, column).await?;
            }
            Err(e) => println!("Not a cell: {}", e),
        },
    }
    Ok(ControlFlow::Continue(()))
}

/// Run the reference agent
#[instrument(skip_all, fields(port = %config.port()))]
async fn run_peer(config: AppConfig) -> Result<()> {
    let stream = open_serial(&port_settings(&config)?)
        .with_context(|| format!("Failed to open {}", config.port()))?;
    SimplePeer::new("peer").serve(stream).await?;
    Ok(())
}

fn print_state(state: &GameState) {
    println!("\n{}\n", state.board.display());
    match state.status {
        GameStatus::Ongoing => println!("{} to move", state.next_mark()),
        GameStatus::Draw => println!("Draw!"),
        GameStatus::WonByX => println!("Player X won!"),
        GameStatus::WonByO => println!("Player O won!"),
    }
}

fn print_help() {
    println!("Enter a cell as two digits (row, column), e.g. 11 for the centre.");
    println!("Commands: new, load, save, help, quit");
}
