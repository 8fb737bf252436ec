//! Board engine: move resolution, merging, spawning and game-over detection.
//!
//! A move is resolved synchronously. Its terminal effects are not: every merge
//! registers a continuation that doubles the target tile after the merge
//! delay, and the move itself registers one that unlocks the tiles, spawns a
//! new tile and checks for game over after the move delay. Until that last
//! continuation has run the board is *moving* and rejects further moves.
//!
//! The board never talks to presentation code directly. Everything observable
//! is pushed as a [`BoardEvent`] which the owner drains with
//! [`Board::take_events`].

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::grid::{Coord2, Direction, Grid, ScanOrder};
use crate::tile::{Tile, TileId, TileValue, EMPTY, MAX_TILE_VALUE};
use crate::timeline::Timeline;
use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Value of every randomly spawned tile.
pub const SPAWN_VALUE: u32 = 2;

/// Result of asking the board to move.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// A previous move is still settling; the input was ignored.
    Rejected,
    /// Nothing could move or merge in that direction.
    NoChange,
    /// At least one tile moved or merged.
    Moved,
}

impl MoveOutcome {
    pub const fn has_update(self) -> bool {
        matches!(self, MoveOutcome::Moved)
    }
}

/// Something presentation code may want to react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    Spawned {
        tile: TileId,
        at: Coord2,
        value: TileValue,
        tier: usize,
    },
    Moved {
        tile: TileId,
        from: Coord2,
        to: Coord2,
    },
    /// `source` left the board and slides into `target`.
    Merging {
        source: TileId,
        target: TileId,
        at: Coord2,
    },
    /// The merge into `tile` settled; `value` is its new value and the score gain.
    Merged {
        tile: TileId,
        value: u32,
        tier: usize,
    },
    ObstacleRelocated {
        tile: TileId,
        from: Coord2,
        to: Coord2,
    },
    Cleared,
    /// The move settled and the board accepts input again.
    Settled,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Settle {
    Merge(TileId),
    Move,
}

/// The live set of tiles on a grid.
#[derive(Clone, Debug)]
pub struct Board {
    grid: Grid,
    tiles: BTreeMap<TileId, Tile>,
    next_id: u32,
    moving: bool,
    timeline: Timeline<Settle>,
    events: Vec<BoardEvent>,
    rng: SmallRng,
    max_tier: usize,
    move_delay: Duration,
    merge_delay: Duration,
    obstacle_relocation_chance: f64,
}

impl Board {
    /// Creates an empty board sized and timed after `config`.
    pub fn new(config: &GameConfig, seed: u64) -> Self {
        let chance = if config.obstacle_relocation_chance.is_finite() {
            config.obstacle_relocation_chance.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Board {
            grid: Grid::new(config.width, config.height),
            tiles: BTreeMap::new(),
            next_id: 0,
            moving: false,
            timeline: Timeline::new(),
            events: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
            max_tier: config.max_tier(),
            move_delay: config.move_delay(),
            merge_delay: config.merge_delay(),
            obstacle_relocation_chance: chance,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    /// Whether a move is still settling.
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Live tiles in creation order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    pub fn tile_at(&self, coords: Coord2) -> Option<&Tile> {
        self.grid
            .get_cell(coords)
            .and_then(|cell| cell.tile())
            .and_then(|id| self.tiles.get(&id))
    }

    pub fn value_at(&self, coords: Coord2) -> Option<TileValue> {
        self.tile_at(coords).map(Tile::value)
    }

    pub fn obstacle(&self) -> Option<&Tile> {
        self.tiles.values().find(|tile| tile.is_obstacle())
    }

    /// Sum of all numbered tiles on the board.
    pub fn total_value(&self) -> u64 {
        self.tiles
            .values()
            .filter_map(|tile| match tile.value() {
                TileValue::Number(n) => Some(u64::from(n)),
                TileValue::Obstacle => None,
            })
            .sum()
    }

    /// Drains the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    /// Moves every movable tile as far as possible in `direction`.
    ///
    /// Tiles are visited line by line starting next to the edge they move
    /// towards, so each tile sees its final neighbours:
    /// 1. A tile slides over empty cells until it hits the edge or another tile.
    /// 2. If that tile has the same value and has not merged this turn, the
    ///    moving tile leaves the board and the other one is locked until the
    ///    merge settles.
    /// 3. The obstacle never moves, and nothing merges into it.
    ///
    /// A successful move schedules one continuation per merge (after the merge
    /// delay) and one for the whole move (after the move delay). Until that last
    /// one runs, further moves are rejected.
    ///
    /// # Arguments
    /// * `direction`: Where tiles slide to.
    ///
    /// # Returns
    /// * `MoveOutcome::Moved` if at least one tile moved or merged.
    /// * `MoveOutcome::NoChange` if every tile was already blocked.
    /// * `MoveOutcome::Rejected` if the previous move has not settled yet.
    ///
    /// # Examples
    /// ```
    /// use merge_puzzle::board::MoveOutcome;
    /// use merge_puzzle::grid::Direction;
    /// use merge_puzzle::tile::TileValue;
    /// use merge_puzzle::utils::board_from_str_array;
    ///
    /// let mut board = board_from_str_array(&[". 2 . 2"], 1).unwrap();
    /// assert_eq!(board.move_tiles(Direction::Left), MoveOutcome::Moved);
    /// assert_eq!(board.move_tiles(Direction::Right), MoveOutcome::Rejected);
    ///
    /// board.settle();
    /// assert_eq!(board.value_at((0, 0)), Some(TileValue::Number(4)));
    /// ```
    pub fn move_tiles(&mut self, direction: Direction) -> MoveOutcome {
        if self.moving {
            log::debug!("Move {:?} rejected, previous move still settling", direction);
            return MoveOutcome::Rejected;
        }

        let order = ScanOrder::for_direction(direction, self.width(), self.height());
        let mut moved = false;
        // Cells are re-read on every step; earlier tiles may have vacated them.
        for coords in order.coords(self.width(), self.height()) {
            if let Some(id) = self.grid.get_cell(coords).and_then(|cell| cell.tile()) {
                moved |= self.move_tile(id, direction);
            }
        }

        if moved {
            // Scheduled after every merge so it runs last on equal delays.
            self.moving = true;
            self.timeline.schedule(self.move_delay, Settle::Move);
            log::debug!("Move {:?} resolved, {} tiles left", direction, self.tiles.len());
            MoveOutcome::Moved
        } else {
            log::debug!("Move {:?} changed nothing", direction);
            MoveOutcome::NoChange
        }
    }

    fn move_tile(&mut self, id: TileId, direction: Direction) -> bool {
        let Some(tile) = self.tiles.get(&id).copied() else {
            return false;
        };
        let Some(from) = tile.cell() else {
            return false;
        };
        if tile.is_obstacle() {
            return false;
        }

        let mut new_cell = None;
        let mut adjacent = self.grid.adjacent(from, direction);

        // Walk until the edge or the first occupied cell.

        while let Some(next) = adjacent {
            let occupant = self
                .grid
                .get_cell(next)
                .and_then(|cell| cell.tile())
                .and_then(|other| self.tiles.get(&other));
            if let Some(other) = occupant {
                if tile.can_merge_into(other) {
                    let target = other.id();
                    self.merge(id, target, next);
                    return true;
                }
                break; // Blocked
            }
            new_cell = Some(next);
            adjacent = self.grid.adjacent(next, direction);
        }

        match new_cell {
            Some(to) => {
                self.place(id, Some(from), to);
                self.events.push(BoardEvent::Moved { tile: id, from, to });
                true
            }
            None => false,
        }
    }

    fn merge(&mut self, source: TileId, target: TileId, at: Coord2) {
        if let Some(tile) = self.tiles.remove(&source) {
            if let Some(from) = tile.cell() {
                self.grid.set_tile(from, None);
            }
        }
        if let Some(tile) = self.tiles.get_mut(&target) {
            tile.set_locked(true);
        }
        log::trace!("Tile {} merging into {} at {:?}", source, target, at);
        self.events.push(BoardEvent::Merging { source, target, at });
        self.timeline.schedule(self.merge_delay, Settle::Merge(target));
    }

    fn place(&mut self, id: TileId, from: Option<Coord2>, to: Coord2) {
        if let Some(from) = from {
            self.grid.set_tile(from, None);
        }
        self.grid.set_tile(to, Some(id));
        if let Some(tile) = self.tiles.get_mut(&id) {
            tile.set_cell(Some(to));
        }
    }

    /// Advances the settle clock by `elapsed`, running every continuation that
    /// comes due.
    pub fn advance(&mut self, elapsed: Duration) {
        for settle in self.timeline.advance(elapsed) {
            self.run_settle(settle);
        }
    }

    /// Runs all pending continuations immediately.
    pub fn settle(&mut self) {
        for settle in self.timeline.drain() {
            self.run_settle(settle);
        }
    }

    fn run_settle(&mut self, settle: Settle) {
        match settle {
            Settle::Merge(id) => {
                let max_tier = self.max_tier;
                let Some(tile) = self.tiles.get_mut(&id) else {
                    return;
                };
                match tile.promote(max_tier) {
                    Some(value) => {
                        let tier = tile.tier();
                        log::trace!("Merge into {} settled at {}", id, value);
                        self.events.push(BoardEvent::Merged { tile: id, value, tier });
                    }
                    // can_merge_into keeps the largest tiles apart
                    None => log::error!("Tile {} cannot grow past {}", id, tile.value()),
                }
            }
            Settle::Move => self.finish_move(),
        }
    }

    fn finish_move(&mut self) {
        self.moving = false;

        for tile in self.tiles.values_mut() {
            tile.set_locked(false);
        }

        if self.tiles.len() < self.grid.size() {
            if let Err(err) = self.spawn_random_tile() {
                log::error!("Spawn after move failed: {}", err);
            }
        }

        self.events.push(BoardEvent::Settled);

        if self.tiles.len() >= self.grid.size() && self.is_game_over() {
            log::info!("No merges left on a full board");
            self.events.push(BoardEvent::GameOver);
        }
    }

    /// Places a tile of `value` at `coords`.
    pub fn spawn_tile(&mut self, coords: Coord2, value: TileValue) -> Result<TileId> {
        let cell = self
            .grid
            .get_cell(coords)
            .ok_or(GameError::InvalidCoords(coords))?;
        if cell.is_occupied() {
            return Err(GameError::CellOccupied(coords));
        }

        let id = TileId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let tile = Tile::new(id, value, self.max_tier);
        let tier = tile.tier();
        self.tiles.insert(id, tile);
        self.place(id, None, coords);

        log::trace!("Spawned {} ({}) at {:?}", id, value, coords);
        self.events.push(BoardEvent::Spawned {
            tile: id,
            at: coords,
            value,
            tier,
        });
        Ok(id)
    }

    /// Spawns a `2` on a random empty cell and keeps exactly one obstacle on the
    /// board.
    ///
    /// After the `2` is placed:
    /// 1. If there is no obstacle yet, one is created on another random empty
    ///    cell, when any is left.
    /// 2. Otherwise the obstacle jumps to a random empty cell with the
    ///    configured relocation chance.
    ///
    /// # Returns
    /// * `Ok(())` once the `2` is on the board, even if no cell was left for
    ///   the obstacle.
    /// * `Err(GameError::BoardFull)` if there was no empty cell for the `2`.
    ///   Nothing changes in that case.
    pub fn spawn_random_tile(&mut self) -> Result<()> {
        let coords = self
            .grid
            .random_empty_cell(&mut self.rng)
            .ok_or(GameError::BoardFull)?;
        self.spawn_tile(coords, TileValue::Number(SPAWN_VALUE))?;

        match self.obstacle().map(|tile| (tile.id(), tile.cell())) {
            // Draws from the RNG only when an obstacle exists.
            Some((id, Some(from))) => {
                if self.rng.gen_bool(self.obstacle_relocation_chance) {
                    if let Some(to) = self.grid.random_empty_cell(&mut self.rng) {
                        self.place(id, Some(from), to);
                        log::trace!("Obstacle relocated from {:?} to {:?}", from, to);
                        self.events
                            .push(BoardEvent::ObstacleRelocated { tile: id, from, to });
                    }
                }
            }
            Some((_, None)) => {}
            None => match self.grid.random_empty_cell(&mut self.rng) {
                Some(at) => {
                    self.spawn_tile(at, TileValue::Obstacle)?;
                }
                None => log::debug!("No room left for an obstacle"),
            },
        }
        Ok(())
    }

    /// Whether any tile could still merge with a neighbour.
    pub fn has_merge(&self) -> bool {
        self.tiles.values().any(|tile| {
            let Some(at) = tile.cell() else {
                return false;
            };
            Direction::ALL.iter().any(|&direction| {
                self.grid
                    .adjacent(at, direction)
                    .and_then(|next| self.tile_at(next))
                    .is_some_and(|other| tile.can_merge_into(other))
            })
        })
    }

    /// The game is over once the grid is full and nothing can merge.
    pub fn is_game_over(&self) -> bool {
        self.grid.is_full() && !self.has_merge()
    }

    /// Whether moving in `direction` would change the board.
    pub fn can_move_in(&self, direction: Direction) -> bool {
        self.tiles.values().filter(|tile| !tile.is_obstacle()).any(|tile| {
            tile.cell()
                .and_then(|at| self.grid.adjacent(at, direction))
                .is_some_and(|next| match self.tile_at(next) {
                    None => true,
                    Some(other) => tile.can_merge_into(other),
                })
        })
    }

    pub fn can_move(&self) -> bool {
        Direction::ALL.iter().any(|&d| self.can_move_in(d))
    }

    /// Removes every tile and cancels any pending continuation.
    pub fn clear(&mut self) {
        self.grid.clear();
        self.tiles.clear();
        self.timeline.clear();
        self.moving = false;
        self.events.push(BoardEvent::Cleared);
    }

    /// Raw value of every cell: `EMPTY` for none, `OBSTACLE` for the obstacle.
    pub fn values(&self) -> Array2<u32> {
        Array2::from_shape_fn((self.width(), self.height()), |coords| {
            self.value_at(coords).map_or(EMPTY, TileValue::to_raw)
        })
    }

    /// Replaces every tile with the contents of `values`.
    ///
    /// The input is checked in full before anything on the board changes.
    pub fn load_values(&mut self, values: &Array2<u32>) -> Result<()> {
        if values.dim() != (self.width(), self.height()) {
            return Err(GameError::InvalidBoard(format!(
                "expected {}x{} values, got {}x{}",
                self.width(),
                self.height(),
                values.dim().0,
                values.dim().1
            )));
        }
        for (coords, &raw) in values.indexed_iter() {
            if !TileValue::is_valid_raw(raw) {
                return Err(GameError::InvalidBoard(format!(
                    "value {} at {:?} is not a power of two between 2 and {}",
                    raw, coords, MAX_TILE_VALUE
                )));
            }
        }

        self.clear();
        for (coords, &raw) in values.indexed_iter() {
            if let Some(value) = TileValue::from_raw(raw) {
                self.spawn_tile(coords, value)?;
            }
        }
        Ok(())
    }

    pub(crate) fn rng(&self) -> &SmallRng {
        &self.rng
    }

    pub(crate) fn set_rng(&mut self, rng: SmallRng) {
        self.rng = rng;
    }

    /// Cross-checks the grid against the tile set and returns every problem
    /// found. Empty when the board is consistent.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for cell in self.grid.iter() {
            if let Some(id) = cell.tile() {
                match self.tiles.get(&id) {
                    None => violations.push(format!(
                        "Cell {:?} references missing tile {}",
                        cell.coords(),
                        id
                    )),
                    Some(tile) if tile.cell() != Some(cell.coords()) => {
                        violations.push(format!(
                            "Cell {:?} holds tile {} which points at {:?}",
                            cell.coords(),
                            id,
                            tile.cell()
                        ))
                    }
                    Some(_) => {}
                }
            }
        }

        for tile in self.tiles.values() {
            let back = tile
                .cell()
                .and_then(|at| self.grid.get_cell(at))
                .and_then(|cell| cell.tile());
            if back != Some(tile.id()) {
                violations.push(format!(
                    "Tile {} at {:?} is not referenced by its cell",
                    tile.id(),
                    tile.cell()
                ));
            }
            if tile.is_locked() && !self.moving {
                violations.push(format!("Tile {} is locked between turns", tile.id()));
            }
        }

        let obstacles = self.tiles.values().filter(|t| t.is_obstacle()).count();
        if obstacles > 1 {
            violations.push(format!("{} obstacles on the board", obstacles));
        }

        violations
    }
}

impl fmt::Display for Board {
    /// One line per row, top row first. `.` is empty and `#` the obstacle.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height() {
            if y > 0 {
                writeln!(f)?;
            }
            for x in 0..self.width() {
                if x > 0 {
                    write!(f, " ")?;
                }
                match self.value_at((x, y)) {
                    Some(value) => write!(f, "{:>4}", value.to_string())?,
                    None => write!(f, "{:>4}", ".")?,
                }
            }
        }
        Ok(())
    }
}
