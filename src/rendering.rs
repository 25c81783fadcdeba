use std::io::{self, Write};
use log::info;
use crossterm::{
    cursor::MoveTo,
    queue,
    terminal::{Clear, ClearType},
};

use crate::types::Point;

// --- ScreenBuffer: an in-memory terminal for debug runs and tests ---
pub struct ScreenBuffer {
    pub buffer: Vec<Vec<char>>,
    pub cursor_x: u16,
    pub cursor_y: u16,
}

impl ScreenBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        ScreenBuffer {
            buffer: vec![vec![' '; width as usize]; height as usize],
            cursor_x: 0,
            cursor_y: 0,
        }
    }

    pub fn move_to(&mut self, x: u16, y: u16) {
        self.cursor_x = x;
        self.cursor_y = y;
    }

    /// Writes at the cursor and advances it; anything past the right edge is dropped.
    pub fn write_str(&mut self, s: &str) {
        for c in s.chars() {
            let (x, y) = (self.cursor_x as usize, self.cursor_y as usize);
            if let Some(cell) = self.buffer.get_mut(y).and_then(|row| row.get_mut(x)) {
                *cell = c;
            }
            self.cursor_x = self.cursor_x.saturating_add(1);
        }
    }

    pub fn clear(&mut self) {
        for row in &mut self.buffer {
            row.fill(' ');
        }
        self.move_to(0, 0);
    }

    #[cfg(test)]
    pub fn row(&self, y: u16) -> String {
        self.buffer.get(y as usize).map(|row| row.iter().collect()).unwrap_or_default()
    }

    #[cfg(test)]
    pub fn char_at(&self, x: u16, y: u16) -> Option<char> {
        self.buffer.get(y as usize).and_then(|row| row.get(x as usize)).copied()
    }

    pub fn print_to_log(&self) {
        info!("--- Screen Buffer ---");
        for row in &self.buffer {
            info!("{}", row.iter().collect::<String>());
        }
        info!("---------------------");
    }
}

// --- OutputTarget: the real terminal or an in-memory ScreenBuffer ---
pub enum OutputTarget {
    Stdout(io::Stdout),
    ScreenBuffer(ScreenBuffer),
}

impl OutputTarget {
    pub fn clear_screen(&mut self) -> io::Result<()> {
        match self {
            OutputTarget::Stdout(s) => queue!(s, Clear(ClearType::All), MoveTo(0, 0)),
            OutputTarget::ScreenBuffer(sb) => {
                sb.clear();
                Ok(())
            }
        }
    }

    pub fn place_cursor(&mut self, x: u16, y: u16) -> io::Result<()> {
        match self {
            OutputTarget::Stdout(s) => queue!(s, MoveTo(x, y)),
            OutputTarget::ScreenBuffer(sb) => {
                sb.move_to(x, y);
                Ok(())
            }
        }
    }

    pub fn draw_text(&mut self, x: u16, y: u16, text: &str) -> io::Result<()> {
        self.place_cursor(x, y)?;
        write!(self, "{}", text)
    }

    pub fn refresh(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputTarget::Stdout(s) => s.write(buf),
            OutputTarget::ScreenBuffer(sb) => {
                let s = String::from_utf8_lossy(buf);
                sb.write_str(&s);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputTarget::Stdout(s) => s.flush(),
            OutputTarget::ScreenBuffer(_) => Ok(()),
        }
    }
}

// --- GameGrid: one frame composed off-screen, then pushed in a single pass ---
pub struct GameGrid {
    pub grid: Vec<Vec<char>>,
    pub width: u16,
    pub height: u16,
}

impl GameGrid {
    pub fn new(width: u16, height: u16) -> Self {
        GameGrid {
            grid: vec![vec![' '; width as usize]; height as usize],
            width,
            height,
        }
    }

    pub fn set_char(&mut self, x: u16, y: u16, c: char) {
        if y < self.height && x < self.width {
            self.grid[y as usize][x as usize] = c;
        }
    }

    /// Like `set_char`, but takes signed lane coordinates and clips anything off-grid.
    pub fn put(&mut self, point: Point, c: char) {
        if let (Ok(x), Ok(y)) = (u16::try_from(point.x), u16::try_from(point.y)) {
            self.set_char(x, y, c);
        }
    }

    pub fn put_str(&mut self, point: Point, text: &str) {
        for (offset, c) in text.chars().enumerate() {
            self.put(Point::new(point.x + offset as i32, point.y), c);
        }
    }

    pub fn clear(&mut self) {
        for row in &mut self.grid {
            row.fill(' ');
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        *self = GameGrid::new(width, height);
    }

    pub fn render(&self, target: &mut OutputTarget) -> io::Result<()> {
        for y in 0..self.height {
            target.draw_text(0, y, &self.grid[y as usize].iter().collect::<String>())?;
        }
        Ok(())
    }
}
