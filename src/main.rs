//! Networked competitive Tetris runner (default binary).
//!
//! `versus-tetris host` listens for guests, `versus-tetris join <addr>` dials a host.
//! The tick loop owns the match controller; the network runtime only moves bytes.

use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event};
use tracing::{info, warn, Level};
use tracing_subscriber::prelude::*;

use versus_tetris::input::handle_key_event;
use versus_tetris::net::{build_runtime, NetConfig, Rendezvous};
use versus_tetris::session::{MatchConfig, MatchController};
use versus_tetris::term::{FrameBuffer, MatchScreen, TerminalRenderer, Viewport};
use versus_tetris::types::{GRAVITY_MS, TICK_MS};

#[derive(Debug, Subcommand)]
enum Command {
    /// Listen for guests and play as the host
    Host,
    /// Connect to a host
    Join {
        /// Host address (port from --port)
        addr: String,
    },
}

#[derive(Debug, Parser)]
#[command(name = "versus-tetris", about = "Networked competitive Tetris for two or three players")]
struct Cli {
    /// Total players including the host (2 or 3)
    #[arg(long, global = true)]
    players: Option<u8>,

    /// TCP port to listen on or dial
    #[arg(long, global = true)]
    port: Option<u16>,

    /// RNG seed for pieces and garbage holes (defaults to the clock)
    #[arg(long, global = true)]
    seed: Option<u32>,

    /// Gravity interval in milliseconds
    #[arg(long, global = true, default_value_t = GRAVITY_MS)]
    gravity_ms: u32,

    /// Write logs to this file
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = NetConfig::from_env();
    if let Some(players) = cli.players {
        config = config.with_players(players);
    }
    if let Some(port) = cli.port {
        config = config.with_port(port);
    }
    if let Command::Join { addr } = &cli.command {
        config = config.with_host(addr.clone());
    }
    if let Some(path) = cli.log.clone() {
        config.log_path = Some(path);
    }

    init_logging(config.log_path.as_deref())?;

    let match_config = MatchConfig {
        players: config.players,
        gravity_ms: cli.gravity_ms,
        seed: cli.seed.unwrap_or_else(clock_seed),
    };

    let rt = build_runtime().context("failed to start network runtime")?;
    let rendezvous = match cli.command {
        Command::Host => Rendezvous::listen(rt.clone(), config.clone())
            .with_context(|| format!("failed to listen on {}", config.bind_addr()))?,
        Command::Join { .. } => Rendezvous::connect(rt.clone(), config.clone()),
    };
    if let Some(addr) = rendezvous.local_addr() {
        info!("waiting for {} guest(s) on {}", config.guests(), addr);
    }

    let mut controller = MatchController::new(match_config, rendezvous.role());

    let mut term = TerminalRenderer::new();
    term.enter()?;
    let result = run(&mut term, &mut controller, rendezvous);

    // Always try to restore terminal state.
    let _ = term.exit();
    controller.shutdown();
    result
}

/// Log to a file only; the terminal is in raw mode on the alternate screen.
fn init_logging(path: Option<&str>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {path}"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(Level::DEBUG))
        .init();
    info!("logging to {}", path);
    Ok(())
}

fn clock_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
        .unwrap_or(1)
}

fn run(
    term: &mut TerminalRenderer,
    controller: &mut MatchController,
    mut rendezvous: Rendezvous,
) -> Result<()> {
    let screen = MatchScreen::default().with_host_addr(rendezvous.local_addr());
    let mut fb = FrameBuffer::new(0, 0);
    let tick_duration = Duration::from_millis(TICK_MS as u64);
    let mut last_tick = Instant::now();

    loop {
        // Attach peers as they finish connecting.
        if !rendezvous.is_complete() {
            match rendezvous.poll() {
                Ok(peers) => {
                    for peer in peers {
                        controller.attach(peer);
                    }
                }
                Err(e) => {
                    warn!("rendezvous failed: {}", e);
                    controller.connection_failed();
                }
            }
        }

        // Render.
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        screen.render_into(&controller.view(), Viewport::new(w, h), &mut fb);
        term.present(&mut fb)?;

        // Input with timeout until next tick.
        let timeout = tick_duration.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    if let Some(action) = handle_key_event(key) {
                        controller.handle_command(action);
                    }
                }
                Event::Resize(_, _) => term.invalidate(),
                _ => {}
            }
        }
        if controller.quit_requested() {
            return Ok(());
        }

        // Tick.
        let elapsed = last_tick.elapsed();
        if elapsed >= tick_duration {
            last_tick = Instant::now();
            if let Some(event) = controller.tick(elapsed.as_millis() as u32) {
                info!("session event: {:?}", event);
            }
        }
    }
}
