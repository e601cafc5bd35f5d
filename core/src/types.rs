//! Shared primitive types used across the whole core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Stable identifier of a player.
pub type PlayerId = String;

/// Stable identifier of a placed structure (UUID v4 string).
pub type StructureId = String;

/// Wall-clock instant. All timestamps in the core are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A grid cell. Also used as a signed offset between two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True for (±1, 0).
    pub fn is_unit_horizontal(&self) -> bool {
        self.x.abs() == 1 && self.y == 0
    }

    /// True for (0, ±1).
    pub fn is_unit_vertical(&self) -> bool {
        self.y.abs() == 1 && self.x == 0
    }
}

impl Add for Cell {
    type Output = Cell;
    fn add(self, rhs: Cell) -> Cell {
        Cell::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Cell {
    type Output = Cell;
    fn sub(self, rhs: Cell) -> Cell {
        Cell::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle size. `cols` extends along x, `rows` along y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub rows: u32,
    pub cols: u32,
}

impl Footprint {
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Every cell covered when the footprint is anchored at `origin`.
    pub fn cells(&self, origin: Cell) -> impl Iterator<Item = Cell> + '_ {
        let (rows, cols) = (self.rows as i32, self.cols as i32);
        (0..rows).flat_map(move |dy| (0..cols).map(move |dx| Cell::new(origin.x + dx, origin.y + dy)))
    }
}
