use std::collections::TryReserveError;
use std::io;
use rand::Rng;
use log::{debug, info};

use crate::constants::*;
use crate::rendering::GameGrid;
use crate::types::Point;

// --- Enemy ---
#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    pub position: Point,
    pub glyph: char,
}

impl Enemy {
    pub fn new(x: i32, y: i32) -> Self {
        Enemy { position: Point::new(x, y), glyph: ENEMY_GLYPH }
    }

    pub fn fall(&mut self) {
        self.position = self.position.below();
    }

    pub fn draw(&self, game_grid: &mut GameGrid) {
        game_grid.put(self.position, self.glyph);
    }
}

// --- Ship ---
#[derive(Clone, Debug, PartialEq)]
pub struct Ship {
    pub position: Point,
    pub glyph: char,
}

impl Ship {
    /// Centered in the lane, on `bottom_row`.
    pub fn new(bottom_row: i32) -> Self {
        Ship {
            position: Point::new((X_MIN + X_MAX) / 2, bottom_row),
            glyph: SHIP_GLYPH,
        }
    }

    pub fn move_left(&mut self) {
        if self.position.x > X_MIN {
            self.position.x -= 1;
        }
    }

    pub fn move_right(&mut self) {
        if self.position.x < X_MAX {
            self.position.x += 1;
        }
    }

    pub fn set_row(&mut self, bottom_row: i32) {
        self.position.y = bottom_row;
    }

    pub fn draw(&self, game_grid: &mut GameGrid) {
        game_grid.put(self.position, self.glyph);
    }
}

// --- EnemyRegistry ---
//
// Slot 0 is the sentinel. Live slots form a cycle through it via `prev`/`next`,
// head first. Free slots are chained through `next` starting at `free_head`.

const SENTINEL: usize = 0;
const NIL: usize = usize::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnemyId {
    index: usize,
    generation: u32,
}

struct Slot {
    enemy: Option<Enemy>,
    generation: u32,
    prev: usize,
    next: usize,
}

pub struct EnemyRegistry {
    slots: Vec<Slot>,
    free_head: usize,
    len: usize,
}

fn out_of_memory(err: TryReserveError) -> io::Error {
    io::Error::new(io::ErrorKind::OutOfMemory, err)
}

impl EnemyRegistry {
    pub fn new() -> io::Result<Self> {
        let mut slots = Vec::new();
        slots.try_reserve(1).map_err(out_of_memory)?;
        slots.push(Slot { enemy: None, generation: 0, prev: SENTINEL, next: SENTINEL });
        Ok(EnemyRegistry { slots, free_head: NIL, len: 0 })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once `teardown` has dropped the sentinel.
    pub fn is_released(&self) -> bool {
        self.slots.is_empty()
    }

    /// Spawns an enemy on a random lane column at row 0.
    pub fn spawn(&mut self, rng: &mut impl Rng) -> io::Result<EnemyId> {
        let x = rng.gen_range(X_MIN..=X_MAX);
        let id = self.insert(Enemy::new(x, 0))?;
        debug!("Enemy spawned at column {} ({} live)", x, self.len);
        Ok(id)
    }

    /// Inserts at the head of the list.
    pub fn insert(&mut self, enemy: Enemy) -> io::Result<EnemyId> {
        if self.is_released() {
            return Err(io::Error::new(io::ErrorKind::Other, "enemy registry has been torn down"));
        }

        let index = if self.free_head != NIL {
            let index = self.free_head;
            self.free_head = self.slots[index].next;
            self.slots[index].enemy = Some(enemy);
            index
        } else {
            self.slots.try_reserve(1).map_err(out_of_memory)?;
            self.slots.push(Slot { enemy: Some(enemy), generation: 0, prev: NIL, next: NIL });
            self.slots.len() - 1
        };

        let head = self.slots[SENTINEL].next;
        self.slots[index].prev = SENTINEL;
        self.slots[index].next = head;
        self.slots[head].prev = index;
        self.slots[SENTINEL].next = index;
        self.len += 1;

        Ok(EnemyId { index, generation: self.slots[index].generation })
    }

    pub fn get(&self, id: EnemyId) -> Option<&Enemy> {
        if id.index == SENTINEL {
            return None;
        }
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.enemy.as_ref())
    }

    pub fn remove(&mut self, id: EnemyId) -> Option<Enemy> {
        self.get(id)?;
        self.unlink(id.index)
    }

    fn unlink(&mut self, index: usize) -> Option<Enemy> {
        let enemy = self.slots[index].enemy.take()?;
        let (prev, next) = (self.slots[index].prev, self.slots[index].next);
        self.slots[prev].next = next;
        self.slots[next].prev = prev;

        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.prev = NIL;
        slot.next = self.free_head;
        self.free_head = index;
        self.len -= 1;
        Some(enemy)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: &self.slots,
            cursor: self.slots.first().map_or(SENTINEL, |sentinel| sentinel.next),
        }
    }

    /// Walks head to tail, dropping every enemy for which `keep` returns false.
    pub fn retain_mut<F>(&mut self, mut keep: F)
    where
        F: FnMut(&mut Enemy) -> bool,
    {
        let mut cursor = self.slots.first().map_or(SENTINEL, |sentinel| sentinel.next);
        while cursor != SENTINEL {
            let next = self.slots[cursor].next;
            let retained = match self.slots[cursor].enemy.as_mut() {
                Some(enemy) => keep(enemy),
                None => true,
            };
            if !retained {
                self.unlink(cursor);
            }
            cursor = next;
        }
    }

    /// Removes every enemy, then releases the sentinel and the arena itself.
    pub fn teardown(&mut self) -> usize {
        let mut swept = 0;
        loop {
            let head = self.iter().next().map(|(id, _)| id);
            let Some(id) = head else { break };
            self.remove(id);
            swept += 1;
        }
        debug_assert!(self.is_empty());
        self.slots = Vec::new();
        self.free_head = NIL;
        self.len = 0;
        info!("Enemy registry torn down, {} enemies swept.", swept);
        swept
    }
}

pub struct Iter<'a> {
    slots: &'a [Slot],
    cursor: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (EnemyId, &'a Enemy);

    fn next(&mut self) -> Option<Self::Item> {
        let slots = self.slots;
        while self.cursor != SENTINEL {
            let index = self.cursor;
            let slot = &slots[index];
            self.cursor = slot.next;
            if let Some(enemy) = slot.enemy.as_ref() {
                return Some((EnemyId { index, generation: slot.generation }, enemy));
            }
        }
        None
    }
}
