//! Fixed-size cell matrix, addressing and neighbour lookup.
//!
//! Coordinates are `(x, y)` with `x` the column and `y` the row. Row 0 is the
//! top of the board, so moving [`Direction::Up`] decreases `y` even though its
//! direction vector points towards positive `y`.

use crate::tile::TileId;
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Single coordinate axis.
pub type Coord = usize;

/// Two-dimensional coordinates `(x, y)`.
pub type Coord2 = (Coord, Coord);

/// One of the four directions a move can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector `(dx, dy)` with up pointing towards positive `dy`.
    pub const fn vector(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, 1),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// Order in which cells are visited when resolving a move.
///
/// The scan begins on the line adjacent to the edge the tiles move towards and
/// proceeds away from it, so every tile is resolved after the tiles in front of
/// it. The line lying on the edge itself is skipped since nothing there can move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanOrder {
    pub start_x: isize,
    pub step_x: isize,
    pub start_y: isize,
    pub step_y: isize,
}

impl ScanOrder {
    pub fn for_direction(direction: Direction, width: usize, height: usize) -> Self {
        let (w, h) = (width as isize, height as isize);
        let (start_x, step_x, start_y, step_y) = match direction {
            Direction::Up => (0, 1, 1, 1),
            Direction::Down => (0, 1, h - 2, -1),
            Direction::Left => (1, 1, 0, 1),
            Direction::Right => (w - 2, -1, 0, 1),
        };
        ScanOrder {
            start_x,
            step_x,
            start_y,
            step_y,
        }
    }

    /// Coordinates in scan order, columns in the outer loop.
    pub fn coords(self, width: usize, height: usize) -> Vec<Coord2> {
        let (w, h) = (width as isize, height as isize);
        let mut coords = Vec::with_capacity(width * height);
        let mut x = self.start_x;
        while x >= 0 && x < w {
            let mut y = self.start_y;
            while y >= 0 && y < h {
                coords.push((x as usize, y as usize));
                y += self.step_y;
            }
            x += self.step_x;
        }
        coords
    }
}

/// A single addressable grid position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    coords: Coord2,
    tile: Option<TileId>,
}

impl Cell {
    fn new(coords: Coord2) -> Self {
        Cell { coords, tile: None }
    }

    pub fn coords(&self) -> Coord2 {
        self.coords
    }

    /// The tile occupying this cell, if any.
    pub fn tile(&self) -> Option<TileId> {
        self.tile
    }

    pub fn is_occupied(&self) -> bool {
        self.tile.is_some()
    }
}

/// Width × height matrix of cells. Dimensions never change after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    cells: Array2<Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Grid {
            cells: Array2::from_shape_fn((width, height), Cell::new),
        }
    }

    pub fn width(&self) -> usize {
        self.cells.dim().0
    }

    pub fn height(&self) -> usize {
        self.cells.dim().1
    }

    /// Total number of cells.
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Bounds-checked lookup; `None` outside the grid.
    pub fn get_cell(&self, (x, y): Coord2) -> Option<&Cell> {
        self.cells.get((x, y))
    }

    /// The neighbour of `coords` one step in `direction`, if it is on the grid.
    pub fn get_adjacent_cell(&self, coords: Coord2, direction: Direction) -> Option<&Cell> {
        self.adjacent(coords, direction)
            .and_then(|next| self.get_cell(next))
    }

    /// Coordinates one step in `direction`. The vertical component is inverted.
    pub fn adjacent(&self, (x, y): Coord2, direction: Direction) -> Option<Coord2> {
        let (dx, dy) = direction.vector();
        let next_x = x.checked_add_signed(dx)?;
        let next_y = y.checked_add_signed(-dy)?;
        if next_x < self.width() && next_y < self.height() {
            Some((next_x, next_y))
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_occupied()).count()
    }

    pub fn is_full(&self) -> bool {
        self.occupied_count() >= self.size()
    }

    /// Uniformly samples cells until an unoccupied one turns up.
    ///
    /// Returns `None` without sampling when every cell is occupied.
    pub fn random_empty_cell(&self, rng: &mut impl Rng) -> Option<Coord2> {
        if self.is_full() {
            return None;
        }
        let height = self.height();
        loop {
            let index = rng.gen_range(0..self.size());
            let coords = (index / height, index % height);
            if !self.cells[coords].is_occupied() {
                return Some(coords);
            }
        }
    }

    pub(crate) fn set_tile(&mut self, (x, y): Coord2, tile: Option<TileId>) {
        self.cells[(x, y)].tile = tile;
    }

    pub(crate) fn clear(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.tile = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_get_cell_bounds() {
        let grid = Grid::new(4, 3);
        assert_eq!(grid.size(), 12);
        assert_eq!(grid.get_cell((3, 2)).map(Cell::coords), Some((3, 2)));
        assert!(grid.get_cell((4, 0)).is_none());
        assert!(grid.get_cell((0, 3)).is_none());
    }

    #[test]
    fn test_adjacent_inverts_vertical_axis() {
        let grid = Grid::new(4, 4);
        assert_eq!(grid.adjacent((1, 1), Direction::Up), Some((1, 0)));
        assert_eq!(grid.adjacent((1, 1), Direction::Down), Some((1, 2)));
        assert_eq!(grid.adjacent((1, 1), Direction::Left), Some((0, 1)));
        assert_eq!(grid.adjacent((1, 1), Direction::Right), Some((2, 1)));
    }

    #[test]
    fn test_adjacent_off_grid() {
        let grid = Grid::new(4, 4);
        assert!(grid.get_adjacent_cell((0, 0), Direction::Up).is_none());
        assert!(grid.get_adjacent_cell((0, 0), Direction::Left).is_none());
        assert!(grid.get_adjacent_cell((3, 3), Direction::Down).is_none());
        assert!(grid.get_adjacent_cell((3, 3), Direction::Right).is_none());
    }

    #[test]
    fn test_scan_order_starts_next_to_moving_edge() {
        let up = ScanOrder::for_direction(Direction::Up, 2, 3).coords(2, 3);
        assert_eq!(up, vec![(0, 1), (0, 2), (1, 1), (1, 2)]);

        let down = ScanOrder::for_direction(Direction::Down, 2, 3).coords(2, 3);
        assert_eq!(down, vec![(0, 1), (0, 0), (1, 1), (1, 0)]);

        let left = ScanOrder::for_direction(Direction::Left, 3, 2).coords(3, 2);
        assert_eq!(left, vec![(1, 0), (1, 1), (2, 0), (2, 1)]);

        let right = ScanOrder::for_direction(Direction::Right, 3, 2).coords(3, 2);
        assert_eq!(right, vec![(1, 0), (1, 1), (0, 0), (0, 1)]);
    }

    #[test]
    fn test_scan_order_single_row() {
        let down = ScanOrder::for_direction(Direction::Down, 3, 1).coords(3, 1);
        assert!(down.is_empty());
    }

    #[test]
    fn test_random_empty_cell() {
        let mut grid = Grid::new(2, 2);
        let mut rng = SmallRng::seed_from_u64(7);
        grid.set_tile((0, 0), Some(TileId(1)));
        grid.set_tile((1, 0), Some(TileId(2)));
        grid.set_tile((0, 1), Some(TileId(3)));
        for _ in 0..20 {
            assert_eq!(grid.random_empty_cell(&mut rng), Some((1, 1)));
        }

        grid.set_tile((1, 1), Some(TileId(4)));
        assert!(grid.is_full());
        assert_eq!(grid.random_empty_cell(&mut rng), None);

        grid.clear();
        assert_eq!(grid.occupied_count(), 0);
    }
}
