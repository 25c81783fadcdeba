use std::io;
use std::time::Duration;
use crossterm::event::Event;
use rand::Rng;
use log::{error, info, warn};

use crate::constants::*;
use crate::entities::{EnemyRegistry, Ship};
use crate::rendering::{GameGrid, OutputTarget};
use crate::terminal_io::InputSource;
use crate::types::{Key, Point};

// --- TickScheduler: spawn and move countdowns ---
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickEvents {
    pub spawn: bool,
    pub advance: bool,
}

#[derive(Clone, Debug)]
pub struct TickScheduler {
    spawn_counter: u32,
    move_counter: u32,
}

impl Default for TickScheduler {
    fn default() -> Self {
        TickScheduler { spawn_counter: ENEMY_INTERVAL, move_counter: ENEMY_SPEED }
    }
}

impl TickScheduler {
    pub fn new() -> Self {
        TickScheduler::default()
    }

    /// Spawn interval after a spawn at `score`. Never drops below `MIN_SPAWN_INTERVAL`.
    pub fn spawn_interval(score: u32) -> u32 {
        ENEMY_INTERVAL
            .saturating_sub(score.saturating_mul(SCORE_SPEEDUP))
            .max(MIN_SPAWN_INTERVAL)
    }

    pub fn tick(&mut self, score: u32) -> TickEvents {
        let mut events = TickEvents::default();

        self.spawn_counter -= 1;
        if self.spawn_counter == 0 {
            events.spawn = true;
            self.spawn_counter = TickScheduler::spawn_interval(score);
        }

        self.move_counter -= 1;
        if self.move_counter == 0 {
            events.advance = true;
            self.move_counter = ENEMY_SPEED;
        }

        events
    }
}

// --- GameState ---
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Playing,
    GameOver,
}

pub struct GameState {
    pub ship: Ship,
    pub enemies: EnemyRegistry,
    pub scheduler: TickScheduler,
    score: u32,
    phase: Phase,
}

impl GameState {
    pub fn new(bottom_row: i32) -> io::Result<Self> {
        Ok(GameState {
            ship: Ship::new(bottom_row),
            enemies: EnemyRegistry::new()?,
            scheduler: TickScheduler::new(),
            score: 0,
            phase: Phase::Playing,
        })
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// One-way: nothing moves the game back to `Playing`.
    pub fn end(&mut self) {
        self.phase = Phase::GameOver;
    }

    pub fn handle_key(&mut self, key: Key) {
        match key {
            Key::Quit => {
                info!("Quit key 'q' pressed. Exiting game loop.");
                self.end();
            }
            Key::Left => self.ship.move_left(),
            Key::Right => self.ship.move_right(),
            Key::Other => {}
        }
    }

    /// Runs the scheduler for one frame, spawning and advancing when due.
    pub fn tick(&mut self, rng: &mut impl Rng) -> io::Result<TickEvents> {
        let events = self.scheduler.tick(self.score);
        if events.spawn {
            self.enemies.spawn(rng)?;
        }
        if events.advance {
            self.advance_enemies();
        }
        Ok(events)
    }

    /// Drops every enemy one row. Enemies landing on the ship are caught and
    /// scored; any enemy below the ship row ends the game. Returns the catch count.
    pub fn advance_enemies(&mut self) -> u32 {
        let ship = self.ship.position;
        let mut caught = 0;
        let mut escaped = false;

        self.enemies.retain_mut(|enemy| {
            enemy.fall();
            if enemy.position == ship {
                caught += 1;
                false
            } else {
                if enemy.position.y > ship.y {
                    escaped = true;
                }
                true
            }
        });

        if caught > 0 {
            self.score += caught;
            info!("Caught {} enemy(s). Score: {}, {} still falling.", caught, self.score, self.enemies.len());
        }
        if escaped && !self.is_over() {
            info!("An enemy passed the ship row. Game over.");
            self.end();
        }
        caught
    }

    /// Moves the ship to the new bottom row. Enemies already below it are off
    /// the lane and are dropped rather than counted as having passed the ship.
    pub fn resize(&mut self, bottom_row: i32) {
        self.ship.set_row(bottom_row);
        let before = self.enemies.len();
        self.enemies.retain_mut(|enemy| enemy.position.y <= bottom_row);
        let dropped = before - self.enemies.len();
        if dropped > 0 {
            info!("Dropped {} enemy(s) below the new bottom row {}.", dropped, bottom_row);
        }
    }

    pub fn draw(&self, game_grid: &mut GameGrid) {
        for y in 0..i32::from(game_grid.height) {
            game_grid.put(Point::new(X_MIN - 1, y), WALL_GLYPH);
            game_grid.put(Point::new(X_MAX + 1, y), WALL_GLYPH);
        }
        game_grid.put_str(Point::new(SCORE_COLUMN, 0), &format!("SCORE:{:5}", self.score));
        for (_, enemy) in self.enemies.iter() {
            enemy.draw(game_grid);
        }
        self.ship.draw(game_grid);
    }
}

fn bottom_row(terminal_height: u16) -> i32 {
    i32::from(terminal_height.max(1)) - 1
}

/// How a finished run went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub score: u32,
    pub frames: u64,
    pub hit_frame_limit: bool,
}

// --- Game: the frame loop around a GameState ---
pub struct Game {
    pub terminal_width: u16,
    pub terminal_height: u16,
    pub stdout_target: OutputTarget,
    input: InputSource,
    debug_mode_active: bool,
    max_frames: Option<u64>,
}

impl Game {
    pub fn new(
        terminal_width: u16,
        terminal_height: u16,
        stdout_target: OutputTarget,
        input: InputSource,
        debug_mode_active: bool,
        max_frames: Option<u64>,
    ) -> Self {
        Game {
            terminal_width,
            terminal_height,
            stdout_target,
            input,
            debug_mode_active,
            max_frames,
        }
    }

    /// Plays until game over or the frame limit.
    pub fn run(&mut self, rng: &mut impl Rng) -> io::Result<RunSummary> {
        let needed_width = SCORE_COLUMN + "SCORE:00000".len() as i32;
        if i32::from(self.terminal_width) < needed_width {
            warn!("Terminal is {} columns wide; the score needs {}.", self.terminal_width, needed_width);
        }

        let mut state = GameState::new(bottom_row(self.terminal_height))
            .map_err(|e| { error!("Failed to set up enemy registry: {}", e); e })?;
        let mut game_grid = GameGrid::new(self.terminal_width, self.terminal_height);
        let mut frame_count = 0;
        let mut hit_frame_limit = false;

        self.stdout_target.clear_screen()?;
        info!("Game loop started. Ship at {:?}.", state.ship.position);

        while !state.is_over() {
            if self.max_frames.is_some_and(|max| frame_count >= max) {
                info!("Frame limit of {} reached.", frame_count);
                hit_frame_limit = true;
                state.end();
                break;
            }

            self.handle_input(&mut state, &mut game_grid, frame_count)?;
            state.tick(rng).map_err(|e| { error!("Failed to spawn enemy: {}", e); e })?;
            self.render(&state, &mut game_grid)?;

            frame_count += 1;
        }

        let swept = state.enemies.teardown();
        info!("{:?} after {} frames. Score: {}, enemies left: {}", state.phase(), frame_count, state.score(), swept);
        Ok(RunSummary { score: state.score(), frames: frame_count, hit_frame_limit })
    }

    fn handle_input(&mut self, state: &mut GameState, game_grid: &mut GameGrid, frame_count: u64) -> io::Result<()> {
        let timeout = Duration::from_millis(INPUT_TIMEOUT_MS);
        match self.input.poll_event(timeout, frame_count)? {
            Some(Event::Resize(new_width, new_height)) => {
                self.terminal_width = new_width;
                self.terminal_height = new_height;
                game_grid.resize(new_width, new_height);
                state.resize(bottom_row(new_height));
                self.stdout_target.clear_screen()?;
                info!("Terminal resized to {}x{}", new_width, new_height);
            }
            Some(event) => {
                if let Some(key) = Key::from_event(&event) {
                    state.handle_key(key);
                }
            }
            None => {}
        }
        Ok(())
    }

    fn render(&mut self, state: &GameState, game_grid: &mut GameGrid) -> io::Result<()> {
        game_grid.clear();
        state.draw(game_grid);
        game_grid.render(&mut self.stdout_target).map_err(|e| { error!("Failed to render game grid: {}", e); e })?;

        let ship = state.ship.position;
        if let (Ok(x), Ok(y)) = (u16::try_from(ship.x), u16::try_from(ship.y)) {
            self.stdout_target.place_cursor(x, y)?;
        }
        self.stdout_target.refresh().map_err(|e| { error!("Failed to flush stdout after rendering: {}", e); e })?;

        if self.debug_mode_active {
            if let OutputTarget::ScreenBuffer(ref sb) = self.stdout_target {
                sb.print_to_log();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Enemy;
    use crate::rendering::ScreenBuffer;
    use crate::terminal_io::SimulatedInput;
    use crossterm::event::KeyCode;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const ROWS: u16 = 24;

    fn headless_game(input: SimulatedInput, max_frames: Option<u64>) -> Game {
        Game::new(
            DEBUG_COLUMNS,
            ROWS,
            OutputTarget::ScreenBuffer(ScreenBuffer::new(DEBUG_COLUMNS, ROWS)),
            InputSource::Simulated(input),
            false,
            max_frames,
        )
    }

    fn screen(game: &Game) -> &ScreenBuffer {
        match &game.stdout_target {
            OutputTarget::ScreenBuffer(sb) => sb,
            OutputTarget::Stdout(_) => panic!("expected a screen buffer"),
        }
    }

    #[test]
    fn first_spawn_fires_on_tick_200() {
        let mut scheduler = TickScheduler::new();
        for _ in 0..199 {
            assert!(!scheduler.tick(0).spawn);
        }
        assert!(scheduler.tick(0).spawn);
    }

    #[test]
    fn two_hundred_ticks_without_movement_leave_one_enemy_on_top_row() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut scheduler = TickScheduler::new();
        let mut enemies = EnemyRegistry::new().unwrap();
        for _ in 0..200 {
            if scheduler.tick(0).spawn {
                enemies.spawn(&mut rng).unwrap();
            }
        }
        let live: Vec<_> = enemies.iter().map(|(_, enemy)| enemy.position).collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].y, 0);
        assert!((X_MIN..=X_MAX).contains(&live[0].x));
    }

    #[test]
    fn move_pass_fires_every_ten_ticks() {
        let mut scheduler = TickScheduler::new();
        let advances: Vec<u32> = (1..=50).filter(|_| scheduler.tick(0).advance).collect();
        assert_eq!(advances.len(), 5);

        let mut scheduler = TickScheduler::new();
        for tick in 1..=30 {
            assert_eq!(scheduler.tick(0).advance, tick % 10 == 0);
        }
    }

    #[test]
    fn spawn_interval_shrinks_with_score_and_is_clamped() {
        assert_eq!(TickScheduler::spawn_interval(0), 200);
        assert_eq!(TickScheduler::spawn_interval(10), 150);
        assert_eq!(TickScheduler::spawn_interval(38), 10);
        assert_eq!(TickScheduler::spawn_interval(40), MIN_SPAWN_INTERVAL);
        assert_eq!(TickScheduler::spawn_interval(u32::MAX), MIN_SPAWN_INTERVAL);
    }

    #[test]
    fn spawn_counter_resets_from_current_score() {
        let mut scheduler = TickScheduler::new();
        for _ in 0..199 {
            scheduler.tick(0);
        }
        assert!(scheduler.tick(10).spawn);
        for _ in 0..149 {
            assert!(!scheduler.tick(10).spawn);
        }
        assert!(scheduler.tick(10).spawn);
    }

    #[test]
    fn enemy_landing_on_ship_is_caught_and_scored() {
        let mut state = GameState::new(5).unwrap();
        state.enemies.insert(Enemy::new(15, 4)).unwrap();

        assert_eq!(state.advance_enemies(), 1);
        assert_eq!(state.score(), 1);
        assert!(state.enemies.is_empty());
        assert_eq!(state.phase(), Phase::Playing);
    }

    #[test]
    fn enemy_sitting_on_ship_moves_past_it_and_ends_game() {
        let mut state = GameState::new(5).unwrap();
        state.enemies.insert(Enemy::new(15, 5)).unwrap();

        assert_eq!(state.advance_enemies(), 0);
        assert_eq!(state.score(), 0);
        assert_eq!(state.phase(), Phase::GameOver);
        let (_, enemy) = state.enemies.iter().next().unwrap();
        assert_eq!(enemy.position, Point::new(15, 6));
    }

    #[test]
    fn enemy_past_ship_row_ends_game_without_scoring() {
        let mut state = GameState::new(5).unwrap();
        state.enemies.insert(Enemy::new(15, 6)).unwrap();

        assert_eq!(state.advance_enemies(), 0);
        assert_eq!(state.score(), 0);
        assert!(state.is_over());
        assert_eq!(state.enemies.len(), 1);
    }

    #[test]
    fn enemy_reaching_ship_row_in_another_column_survives_one_more_pass() {
        let mut state = GameState::new(5).unwrap();
        state.enemies.insert(Enemy::new(12, 4)).unwrap();

        state.advance_enemies();
        assert_eq!(state.phase(), Phase::Playing);
        state.advance_enemies();
        assert!(state.is_over());
    }

    #[test]
    fn catch_and_escape_in_the_same_pass() {
        let mut state = GameState::new(5).unwrap();
        state.enemies.insert(Enemy::new(15, 4)).unwrap();
        state.enemies.insert(Enemy::new(11, 5)).unwrap();
        state.enemies.insert(Enemy::new(18, 0)).unwrap();

        assert_eq!(state.advance_enemies(), 1);
        assert_eq!(state.score(), 1);
        assert!(state.is_over());
        assert_eq!(state.enemies.len(), 2);
    }

    #[test]
    fn keys_move_ship_and_quit_ends_game() {
        let mut state = GameState::new(10).unwrap();
        state.handle_key(Key::Left);
        assert_eq!(state.ship.position.x, 14);
        state.handle_key(Key::Right);
        state.handle_key(Key::Right);
        assert_eq!(state.ship.position.x, 16);
        state.handle_key(Key::Other);
        assert_eq!(state.ship.position.x, 16);
        assert_eq!(state.phase(), Phase::Playing);
        state.handle_key(Key::Quit);
        assert!(state.is_over());
    }

    #[test]
    fn score_is_monotonic_and_game_over_is_sticky() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut state = GameState::new(8).unwrap();
        let keys = [Key::Left, Key::Right, Key::Other];
        let mut last_score = 0;
        let mut was_over = false;

        for _ in 0..20_000 {
            state.handle_key(keys[rng.gen_range(0..keys.len())]);
            state.tick(&mut rng).unwrap();
            assert!(state.score() >= last_score);
            assert!((X_MIN..=X_MAX).contains(&state.ship.position.x));
            if was_over {
                assert!(state.is_over());
            }
            last_score = state.score();
            was_over = state.is_over();
        }
        assert!(was_over);
    }

    #[test]
    fn draw_projects_walls_score_enemies_and_ship() {
        let mut state = GameState::new(i32::from(ROWS) - 1).unwrap();
        state.enemies.insert(Enemy::new(12, 3)).unwrap();
        state.enemies.insert(Enemy::new(15, 4)).unwrap();
        state.advance_enemies();
        state.enemies.insert(Enemy::new(20, 0)).unwrap();

        let mut grid = GameGrid::new(DEBUG_COLUMNS, ROWS);
        state.draw(&mut grid);
        let row = |y: usize| grid.grid[y].iter().collect::<String>();

        for y in 0..ROWS as usize {
            assert_eq!(grid.grid[y][(X_MIN - 1) as usize], WALL_GLYPH);
            assert_eq!(grid.grid[y][(X_MAX + 1) as usize], WALL_GLYPH);
        }
        assert_eq!(&row(0)[SCORE_COLUMN as usize..SCORE_COLUMN as usize + 11], "SCORE:    0");
        assert_eq!(grid.grid[0][20], ENEMY_GLYPH);
        assert_eq!(grid.grid[4][12], ENEMY_GLYPH);
        assert_eq!(grid.grid[5][15], ENEMY_GLYPH);
        assert_eq!(grid.grid[23][15], SHIP_GLYPH);
    }

    #[test]
    fn quit_on_first_frame_ends_run_with_zero_score() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut game = headless_game(SimulatedInput::from_keys(&[(0, KeyCode::Char('q'))]), None);
        let summary = game.run(&mut rng).unwrap();
        assert_eq!(summary, RunSummary { score: 0, frames: 1, hit_frame_limit: false });

        let sb = screen(&game);
        assert_eq!(sb.char_at(15, 23), Some(SHIP_GLYPH));
        assert_eq!((sb.cursor_x, sb.cursor_y), (15, 23));
        assert!(sb.row(0).contains("SCORE:    0"));
    }

    #[test]
    fn frame_limit_stops_an_idle_run() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut game = headless_game(SimulatedInput::new(Default::default()), Some(150));
        let summary = game.run(&mut rng).unwrap();
        assert_eq!(summary, RunSummary { score: 0, frames: 150, hit_frame_limit: true });
        assert_eq!(screen(&game).row(0).matches(ENEMY_GLYPH).count(), 0);
    }

    #[test]
    fn idle_run_ends_when_an_enemy_gets_past() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut game = headless_game(SimulatedInput::new(Default::default()), Some(1_000_000));
        let summary = game.run(&mut rng).unwrap();

        // The ship never moves, so every enemy either lands on column 15 or ends the game.
        assert!(!summary.hit_frame_limit);
        assert!(summary.frames < 100_000, "ran {} frames", summary.frames);
        // The first enemy needs 200 frames to spawn and 230 more to fall past row 23.
        assert!(summary.frames >= 430);
        assert_eq!(screen(&game).char_at(15, ROWS - 1), Some(SHIP_GLYPH));
    }

    #[test]
    fn resize_drops_enemies_below_new_bottom_row() {
        let mut state = GameState::new(23).unwrap();
        state.enemies.insert(Enemy::new(12, 11)).unwrap();
        state.enemies.insert(Enemy::new(18, 7)).unwrap();
        state.enemies.insert(Enemy::new(15, 2)).unwrap();

        state.resize(7);
        assert_eq!(state.ship.position, Point::new(15, 7));
        let rows: Vec<i32> = state.enemies.iter().map(|(_, enemy)| enemy.position.y).collect();
        assert_eq!(rows, vec![2, 7]);

        state.advance_enemies();
        assert!(state.is_over(), "the enemy that was on the bottom row has now passed it");
    }

    #[test]
    fn shrinking_terminal_mid_run_does_not_end_game() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut events = std::collections::HashMap::new();
        events.insert(300, Event::Resize(DEBUG_COLUMNS, 8));
        let mut game = headless_game(SimulatedInput::new(events), Some(320));

        // By frame 300 the first enemy is on row 11, below the new bottom row 7.
        let summary = game.run(&mut rng).unwrap();
        assert_eq!(summary, RunSummary { score: 0, frames: 320, hit_frame_limit: true });
        assert_eq!(game.terminal_height, 8);
        assert_eq!(screen(&game).char_at(15, 7), Some(SHIP_GLYPH));
    }

    #[test]
    fn left_keys_move_ship_on_screen() {
        let mut rng = StdRng::seed_from_u64(1);
        let keys = [(0, KeyCode::Char('4')), (1, KeyCode::Left), (2, KeyCode::Char('q'))];
        let mut game = headless_game(SimulatedInput::from_keys(&keys), None);
        assert_eq!(game.run(&mut rng).unwrap().frames, 3);
        assert_eq!(screen(&game).char_at(13, ROWS - 1), Some(SHIP_GLYPH));
    }
}
