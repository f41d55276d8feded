//! YeePlayer Peer - terminal client for a YeePlayer board.
//!
//! Reads commands from stdin, applies them to the local board, sends them to
//! the relay and prints every board event as a JSON line on stdout (or logs
//! it with `--no-json`).

mod commands;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use yeeplayer_core::protocol_constants::{DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};
use yeeplayer_core::{
    BoardConfig, BoardSession, BroadcastEventBridge, ConnectOptions, LoggingEventEmitter,
    TokioSpawner, Viewport,
};

use crate::commands::{parse_line, Input, HELP};

/// YeePlayer Peer - send reactions and widget changes from a terminal.
#[derive(Parser, Debug)]
#[command(name = "yeeplayer-peer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay WebSocket URL.
    #[arg(
        short,
        long,
        default_value = "ws://127.0.0.1:8000/ws",
        env = "YEEPLAYER_RELAY_URL"
    )]
    url: String,

    /// Viewport width used for spawn positions.
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_WIDTH)]
    width: f32,

    /// Viewport height used for spawn positions.
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_HEIGHT)]
    height: f32,

    /// Do not reconnect after losing the relay.
    #[arg(long)]
    no_reconnect: bool,

    /// Log board events at debug level instead of printing JSON lines.
    #[arg(long)]
    no_json: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "warn", env = "YEEPLAYER_LOG_LEVEL")]
    log_level: log::LevelFilter,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    let config = BoardConfig {
        viewport: Viewport::new(args.width, args.height),
        ..BoardConfig::default()
    };
    let spawner = TokioSpawner::current();

    let bridge = Arc::new(BroadcastEventBridge::new(config.event_channel_capacity));
    if args.no_json {
        bridge.set_external_emitter(Arc::new(LoggingEventEmitter));
    } else {
        let mut events = bridge.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => log::warn!("Failed to serialize event: {}", e),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Skipped {} board event(s)", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    let options = ConnectOptions::default().with_reconnect(!args.no_reconnect);
    let handle = BoardSession::connect_relay(&config, bridge, &args.url, options, &spawner)
        .inspect_err(|e| log::error!("Session setup failed [{}]", e.code()))
        .context("Failed to start board session")?;

    log::info!("Connecting to {}", args.url);
    eprintln!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(line) = line else { break };

        match parse_line(&line) {
            Ok(Some(Input::Action(command))) => {
                if !handle.dispatch(command) {
                    eprintln!("board is busy, action dropped");
                }
            }
            Ok(Some(Input::Show)) => {
                println!("{}", serde_json::to_string_pretty(&handle.snapshot())?);
            }
            Ok(Some(Input::Help)) => eprintln!("{HELP}"),
            Ok(Some(Input::Quit)) => break,
            Ok(None) => {}
            Err(message) => eprintln!("{message}"),
        }
    }

    handle.shutdown();
    Ok(())
}
