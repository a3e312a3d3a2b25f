use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Largest coordinate representable in a wire unit (6 bits per axis).
pub const MAX_COORD: u8 = 63;

/// A map cell. `x` is the column, `y` the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: u8,
    pub y: u8,
}

impl Cell {
    #[inline]
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Checked constructor for signed coordinates (e.g. a translated offset).
    pub fn try_new(x: i32, y: i32) -> Result<Self, ProtocolError> {
        if (0..=MAX_COORD as i32).contains(&x) && (0..=MAX_COORD as i32).contains(&y) {
            Ok(Self::new(x as u8, y as u8))
        } else {
            Err(ProtocolError::CoordinateOutOfRange { x, y })
        }
    }

    /// Offset by `(dx, dy)`, or `None` when the result leaves `width x height`.
    pub fn translate(self, dx: i32, dy: i32, size: MapSize) -> Option<Cell> {
        let x = self.x as i32 + dx;
        let y = self.y as i32 + dy;
        if x < 0 || y < 0 || x >= size.width as i32 || y >= size.height as i32 {
            return None;
        }
        Some(Cell::new(x as u8, y as u8))
    }

    #[inline]
    pub fn distance_squared(self, other: Cell) -> u32 {
        let dx = self.x as i32 - other.x as i32;
        let dy = self.y as i32 - other.y as i32;
        (dx * dx + dy * dy) as u32
    }

    /// Coarse block containing this cell.
    #[inline]
    pub fn block(self, block_size: u8) -> (u8, u8) {
        (self.x / block_size, self.y / block_size)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Map dimensions. Both axes are limited to 64 cells so a row fits a `u64` bitset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: u8,
    pub height: u8,
}

impl MapSize {
    pub fn new(width: u8, height: u8) -> Self {
        assert!(
            (1..=MAX_COORD + 1).contains(&width) && (1..=MAX_COORD + 1).contains(&height),
            "map dimensions must be within 1..=64"
        );
        Self { width, height }
    }

    #[inline]
    pub fn contains(self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    pub fn cells(self) -> impl Iterator<Item = Cell> {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Cell::new(x, y)))
    }
}
