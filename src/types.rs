use crossterm::event::{Event, KeyCode, KeyEventKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    pub fn below(&self) -> Self {
        Point::new(self.x, self.y + 1)
    }
}

/// A decoded key press. Everything the game does not react to is `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Quit,
    Left,
    Right,
    Other,
}

impl Key {
    pub fn from_event(event: &Event) -> Option<Key> {
        match event {
            Event::Key(key_event) if key_event.kind != KeyEventKind::Release => {
                Some(match key_event.code {
                    KeyCode::Char('q') => Key::Quit,
                    KeyCode::Char('4') | KeyCode::Left => Key::Left,
                    KeyCode::Char('5') | KeyCode::Right => Key::Right,
                    _ => Key::Other,
                })
            }
            _ => None,
        }
    }
}
