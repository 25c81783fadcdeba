// --- Lane ---
pub const X_MIN: i32 = 10; // Leftmost column the ship and enemies may occupy
pub const X_MAX: i32 = 20; // Rightmost column the ship and enemies may occupy
pub const SCORE_COLUMN: i32 = X_MAX + 3;

// --- Timing (in frames) ---
pub const ENEMY_INTERVAL: u32 = 200; // Frames between spawns at score 0
pub const ENEMY_SPEED: u32 = 10; // Frames between each one-row fall
pub const SCORE_SPEEDUP: u32 = 5; // Spawn interval shrinks by this much per point
pub const MIN_SPAWN_INTERVAL: u32 = ENEMY_SPEED;
pub const INPUT_TIMEOUT_MS: u64 = 10;

// --- Glyphs ---
pub const ENEMY_GLYPH: char = '@';
pub const SHIP_GLYPH: char = 'A';
pub const WALL_GLYPH: char = '+';

// --- Debug runs ---
pub const DEBUG_ROWS: u16 = 24;
pub const DEBUG_COLUMNS: u16 = 40;
pub const DEBUG_MAX_FRAMES: u64 = 2000;
