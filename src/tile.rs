//! Tile model: values, tiers and the per-turn merge lock.

use crate::grid::Coord2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw snapshot value of an empty cell.
pub const EMPTY: u32 = 0;

/// Raw snapshot value of an obstacle.
pub const OBSTACLE: u32 = u32::MAX;

/// Largest numbered tile a board can hold.
///
/// Tiles of this value no longer merge, so doubling can never collide with
/// the `OBSTACLE` encoding.
pub const MAX_TILE_VALUE: u32 = 1 << 30;

/// Stable identity of a tile for the lifetime of the tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub(crate) u32);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a tile carries: a power of two, or the obstacle sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileValue {
    Number(u32),
    Obstacle,
}

impl TileValue {
    pub const fn is_obstacle(self) -> bool {
        matches!(self, TileValue::Obstacle)
    }

    /// Whether `raw` may appear in a snapshot: `EMPTY`, `OBSTACLE`, or a power
    /// of two from `2` to `MAX_TILE_VALUE`.
    pub const fn is_valid_raw(raw: u32) -> bool {
        match raw {
            EMPTY | OBSTACLE => true,
            n => n >= 2 && n <= MAX_TILE_VALUE && n.is_power_of_two(),
        }
    }

    /// Encodes the value the way snapshots store it.
    pub const fn to_raw(self) -> u32 {
        match self {
            TileValue::Number(n) => n,
            TileValue::Obstacle => OBSTACLE,
        }
    }

    /// Decodes a snapshot value. `EMPTY` decodes to `None`.
    pub const fn from_raw(raw: u32) -> Option<TileValue> {
        match raw {
            EMPTY => None,
            OBSTACLE => Some(TileValue::Obstacle),
            n => Some(TileValue::Number(n)),
        }
    }

    /// Tier index for this value, `None` for obstacles.
    ///
    /// The tier is `round(log2(value)) - 1` clamped to `[0, max_tier]`, so `2`
    /// maps to tier 0, `4` to tier 1, and so on.
    ///
    /// # Examples
    /// ```
    /// use merge_puzzle::tile::TileValue;
    /// assert_eq!(TileValue::Number(2).tier(10), Some(0));
    /// assert_eq!(TileValue::Number(2048).tier(10), Some(10));
    /// assert_eq!(TileValue::Number(4096).tier(10), Some(10));
    /// assert_eq!(TileValue::Obstacle.tier(10), None);
    /// ```
    pub fn tier(self, max_tier: usize) -> Option<usize> {
        match self {
            TileValue::Number(n) => {
                let exponent = f64::from(n.max(1)).log2().round() as usize;
                Some(exponent.saturating_sub(1).min(max_tier))
            }
            TileValue::Obstacle => None,
        }
    }
}

impl fmt::Display for TileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileValue::Number(n) => write!(f, "{}", n),
            TileValue::Obstacle => write!(f, "#"),
        }
    }
}

/// An occupant of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    id: TileId,
    value: TileValue,
    tier: usize,
    locked: bool,
    cell: Option<Coord2>,
}

impl Tile {
    pub(crate) fn new(id: TileId, value: TileValue, max_tier: usize) -> Self {
        Tile {
            id,
            value,
            tier: value.tier(max_tier).unwrap_or(0),
            locked: false,
            cell: None,
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn value(&self) -> TileValue {
        self.value
    }

    /// Presentation tier. Always 0 for obstacles.
    pub fn tier(&self) -> usize {
        self.tier
    }

    /// Whether the tile already merged this turn.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The cell the tile sits in, `None` once it merged away.
    pub fn cell(&self) -> Option<Coord2> {
        self.cell
    }

    pub fn is_obstacle(&self) -> bool {
        self.value.is_obstacle()
    }

    /// Whether `self` may slide into `target` and merge with it.
    ///
    /// Requires equal values below `MAX_TILE_VALUE`, an unlocked target, and
    /// no obstacle on either side.
    pub fn can_merge_into(&self, target: &Tile) -> bool {
        match (self.value, target.value) {
            (TileValue::Number(a), TileValue::Number(b)) => {
                a == b && a < MAX_TILE_VALUE && !target.locked
            }
            _ => false,
        }
    }

    pub(crate) fn set_cell(&mut self, cell: Option<Coord2>) {
        self.cell = cell;
    }

    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Doubles the value and advances one tier. Returns the new value, or
    /// `None` when doubling would pass `MAX_TILE_VALUE`, in which case the tile
    /// is left as it was.
    pub(crate) fn promote(&mut self, max_tier: usize) -> Option<u32> {
        let TileValue::Number(n) = self.value else {
            return None;
        };
        let doubled = n.checked_mul(2).filter(|&d| d <= MAX_TILE_VALUE)?;
        self.value = TileValue::Number(doubled);
        self.tier = (self.tier + 1).min(max_tier);
        Some(doubled)
    }
}
