mod constants;
mod entities;
mod game;
mod rendering;
mod terminal_io;
mod types;

use std::env;
use std::io;
use crossterm::event::KeyCode;
use crossterm::terminal::size;
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use constants::*;
use game::{Game, RunSummary};
use rendering::{OutputTarget, ScreenBuffer};
use terminal_io::{InputSource, RawModeGuard, SimulatedInput};

#[derive(Debug, PartialEq)]
enum RunMode {
    Interactive { max_frames: Option<u64> },
    Debug { rows: u16, max_frames: u64, seed: u64 },
}

fn parse_args(args: &[String]) -> RunMode {
    if args.get(1).map(String::as_str) == Some("--debug") {
        RunMode::Debug {
            rows: args.get(2).and_then(|s| s.parse().ok()).unwrap_or(DEBUG_ROWS),
            max_frames: args.get(3).and_then(|s| s.parse().ok()).unwrap_or(DEBUG_MAX_FRAMES),
            seed: args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0),
        }
    } else {
        RunMode::Interactive { max_frames: args.get(1).and_then(|s| s.parse().ok()) }
    }
}

// Sweeps the ship across the lane so a debug run exercises both walls.
fn debug_script() -> SimulatedInput {
    let mut keys = Vec::new();
    for sweep in 0..20u64 {
        let code = if sweep % 2 == 0 { KeyCode::Char('4') } else { KeyCode::Char('5') };
        for step in 0..12u64 {
            keys.push((sweep * 100 + step * 7, code));
        }
    }
    SimulatedInput::from_keys(&keys)
}

fn play_interactive(max_frames: Option<u64>) -> io::Result<RunSummary> {
    // Dropped before returning, so the terminal is restored on every path out.
    let _guard = RawModeGuard::acquire()?;
    let (width, height) = size().map_err(|e| { error!("Failed to get terminal size: {}", e); e })?;
    info!("Terminal size: {}x{}", width, height);

    let mut game = Game::new(
        width,
        height,
        OutputTarget::Stdout(io::stdout()),
        InputSource::Terminal,
        false,
        max_frames,
    );
    game.run(&mut rand::thread_rng())
}

fn play_debug(rows: u16, max_frames: u64, seed: u64) -> io::Result<RunSummary> {
    info!("Debug mode enabled: {}x{}, {} frames, seed {}", DEBUG_COLUMNS, rows, max_frames, seed);
    let mut game = Game::new(
        DEBUG_COLUMNS,
        rows,
        OutputTarget::ScreenBuffer(ScreenBuffer::new(DEBUG_COLUMNS, rows)),
        InputSource::Simulated(debug_script()),
        true,
        Some(max_frames),
    );
    game.run(&mut StdRng::seed_from_u64(seed))
}

fn main() -> io::Result<()> {
    simple_logging::log_to_file("lane-dodger.log", log::LevelFilter::Info)?;
    info!("Starting lane-dodger.");

    let args: Vec<String> = env::args().collect();
    let summary = match parse_args(&args) {
        RunMode::Interactive { max_frames } => play_interactive(max_frames),
        RunMode::Debug { rows, max_frames, seed } => play_debug(rows, max_frames, seed),
    }
    .map_err(|e| { error!("Game aborted: {}", e); e })?;

    println!("SCORE:{:5}", summary.score);
    info!("Exiting after {} frames with score {}.", summary.frames, summary.score);
    Ok(())
}
