use serde::{Deserialize, Serialize};

use crate::{Cell, MapSize, ProtocolError};

/// Candidate map symmetry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symmetry {
    /// Mirror across the horizontal center line (row `y` maps to `H - y - 1`).
    Horizontal,
    /// Mirror across the vertical center line (column `x` maps to `W - x - 1`).
    Vertical,
    /// 180 degree rotation around the center.
    Rotational,
}

impl Symmetry {
    pub const ALL: [Symmetry; 3] = [Symmetry::Horizontal, Symmetry::Vertical, Symmetry::Rotational];

    #[inline]
    pub const fn index(self) -> u8 {
        match self {
            Symmetry::Horizontal => 0,
            Symmetry::Vertical => 1,
            Symmetry::Rotational => 2,
        }
    }

    #[inline]
    const fn bit(self) -> u8 {
        1 << self.index()
    }

    /// The cell `cell` maps to under this symmetry. `cell` must lie inside `size`; use
    /// [`opposite_location`] for unchecked input.
    pub fn opposite(self, cell: Cell, size: MapSize) -> Cell {
        debug_assert!(size.contains(cell));
        let mx = size.width - cell.x - 1;
        let my = size.height - cell.y - 1;
        match self {
            Symmetry::Horizontal => Cell::new(cell.x, my),
            Symmetry::Vertical => Cell::new(mx, cell.y),
            Symmetry::Rotational => Cell::new(mx, my),
        }
    }
}

impl TryFrom<u8> for Symmetry {
    type Error = ProtocolError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Symmetry::Horizontal),
            1 => Ok(Symmetry::Vertical),
            2 => Ok(Symmetry::Rotational),
            other => Err(ProtocolError::InvalidSymmetry(other)),
        }
    }
}

/// Mirror `cell` under the hypothesis with raw index `index`.
pub fn opposite_location(cell: Cell, index: u8, size: MapSize) -> Result<Cell, ProtocolError> {
    let sym = Symmetry::try_from(index)?;
    if !size.contains(cell) {
        return Err(ProtocolError::CoordinateOutOfRange {
            x: cell.x as i32,
            y: cell.y as i32,
        });
    }
    Ok(sym.opposite(cell, size))
}

/// Bitmap of hypotheses that are still valid (bit 0 horizontal, 1 vertical, 2 rotational).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymmetrySet(u8);

impl SymmetrySet {
    pub const ALL: SymmetrySet = SymmetrySet(0b111);
    pub const NONE: SymmetrySet = SymmetrySet(0);

    /// Builds a set from the low three bits of `bits`.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, sym: Symmetry) -> bool {
        self.0 & sym.bit() != 0
    }

    #[inline]
    pub fn remove(&mut self, sym: Symmetry) {
        self.0 &= !sym.bit();
    }

    #[inline]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Symmetry> {
        Symmetry::ALL.into_iter().filter(move |s| self.contains(*s))
    }

    /// The single remaining hypothesis, once all others are ruled out.
    pub fn resolved(self) -> Option<Symmetry> {
        if self.len() == 1 {
            self.iter().next()
        } else {
            None
        }
    }
}

impl Default for SymmetrySet {
    fn default() -> Self {
        Self::ALL
    }
}
