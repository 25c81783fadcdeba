use std::collections::HashMap;
use std::io::{self, stdout};
use std::time::Duration;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};

// --- RawModeGuard: raw mode for exactly as long as the guard lives ---
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn acquire() -> io::Result<Self> {
        info!("Attempting to enable raw mode.");
        enable_raw_mode().map_err(|e| { error!("Failed to enable raw mode: {}", e); e })?;
        // From here on, Drop restores the terminal even if entering the alternate screen fails.
        let guard = RawModeGuard;
        execute!(stdout(), EnterAlternateScreen).map_err(|e| { error!("Failed to enter alternate screen: {}", e); e })?;
        info!("Raw mode enabled.");
        Ok(guard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = execute!(stdout(), LeaveAlternateScreen) {
            error!("Failed to leave alternate screen on exit: {}", e);
        }
        if let Err(e) = disable_raw_mode() {
            error!("Failed to disable raw mode on exit: {}", e);
        }
        info!("Raw mode disabled.");
    }
}

// --- SimulatedInput: a frame-indexed script of events for debug runs ---
pub struct SimulatedInput {
    script: HashMap<u64, Event>,
}

impl SimulatedInput {
    pub fn new(script: HashMap<u64, Event>) -> Self {
        SimulatedInput { script }
    }

    /// Presses `code` on each listed frame.
    pub fn from_keys(keys: &[(u64, KeyCode)]) -> Self {
        SimulatedInput::new(keys.iter().map(|&(frame, code)| (frame, Event::Key(code.into()))).collect())
    }

    /// The event scripted for `frame`, handed out at most once.
    pub fn take(&mut self, frame: u64) -> Option<Event> {
        self.script.remove(&frame)
    }
}

// --- InputSource: where each frame's (at most one) event comes from ---
pub enum InputSource {
    Terminal,
    Simulated(SimulatedInput),
}

impl InputSource {
    /// Waits up to `timeout` for one event. Simulated input never waits.
    pub fn poll_event(&mut self, timeout: Duration, frame_count: u64) -> io::Result<Option<Event>> {
        match self {
            InputSource::Terminal => {
                if event::poll(timeout).map_err(|e| { error!("Failed to poll event: {}", e); e })? {
                    Ok(Some(event::read().map_err(|e| { error!("Failed to read event: {}", e); e })?))
                } else {
                    Ok(None)
                }
            }
            InputSource::Simulated(script) => Ok(script.take(frame_count)),
        }
    }
}
