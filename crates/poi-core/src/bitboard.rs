use poi_protocol::{Cell, MapSize};

/// A `width x height` bitset stored as one `u64` per row (bit `x` of row `y`).
///
/// Bits are only ever set; nothing clears them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBoard {
    width: u8,
    rows: Vec<u64>,
}

impl BitBoard {
    pub fn new(size: MapSize) -> Self {
        Self {
            width: size.width,
            rows: vec![0; size.height as usize],
        }
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn row(&self, y: usize) -> u64 {
        self.rows[y]
    }

    #[inline]
    pub fn set(&mut self, cell: Cell) {
        if let Some(row) = self.rows.get_mut(cell.y as usize) {
            if cell.x < self.width {
                *row |= 1u64 << cell.x;
            }
        }
    }

    #[inline]
    pub fn get(&self, cell: Cell) -> bool {
        self.rows
            .get(cell.y as usize)
            .is_some_and(|row| (row >> cell.x) & 1 == 1)
    }

    /// ORs `mask` (already clipped to the width) into row `y`.
    #[inline]
    pub fn or_row(&mut self, y: usize, mask: u64) {
        if let Some(row) = self.rows.get_mut(y) {
            *row |= mask & row_mask(self.width);
        }
    }

    /// Row `y` reflected across the vertical center line.
    #[inline]
    pub fn mirrored_row(&self, y: usize) -> u64 {
        mirror_bits(self.rows[y], self.width)
    }

    pub fn count_ones(&self) -> u32 {
        self.rows.iter().map(|r| r.count_ones()).sum()
    }
}

/// Reverses the low `width` bits of `row`.
#[inline]
pub fn mirror_bits(row: u64, width: u8) -> u64 {
    row.reverse_bits() >> (64 - width as u32)
}

/// All bits of a `width`-wide row.
#[inline]
pub fn row_mask(width: u8) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Bits `lo..=hi` set, clipped to `[0, width)`. Empty when the span misses the row.
pub fn span_mask(lo: i32, hi: i32, width: u8) -> u64 {
    let lo = lo.max(0);
    let hi = hi.min(width as i32 - 1);
    if lo > hi {
        return 0;
    }
    row_mask((hi - lo + 1) as u8) << lo
}

/// Walls, ruins and explored cells as seen by one agent.
#[derive(Debug, Clone)]
pub struct TerrainBoards {
    pub size: MapSize,
    pub wall: BitBoard,
    pub ruin: BitBoard,
    pub explored: BitBoard,
}

impl TerrainBoards {
    pub fn new(size: MapSize) -> Self {
        Self {
            size,
            wall: BitBoard::new(size),
            ruin: BitBoard::new(size),
            explored: BitBoard::new(size),
        }
    }

    pub fn unexplored_count(&self) -> u32 {
        self.size.width as u32 * self.size.height as u32 - self.explored.count_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_reflects_within_width() {
        assert_eq!(mirror_bits(0b0001, 4), 0b1000);
        assert_eq!(mirror_bits(0b0110, 4), 0b0110);
        assert_eq!(mirror_bits(1, 64), 1 << 63);
        assert_eq!(mirror_bits(1 << 2, 20), 1 << 17);
    }

    #[test]
    fn span_mask_clips_both_edges() {
        assert_eq!(span_mask(-2, 1, 10), 0b11);
        assert_eq!(span_mask(8, 12, 10), 0b11 << 8);
        assert_eq!(span_mask(3, 5, 10), 0b111 << 3);
        assert_eq!(span_mask(11, 12, 10), 0);
        assert_eq!(span_mask(0, 63, 64), u64::MAX);
    }

    #[test]
    fn set_ignores_out_of_bounds_cells() {
        let mut board = BitBoard::new(MapSize::new(8, 4));
        board.set(Cell::new(9, 1));
        board.set(Cell::new(1, 5));
        board.set(Cell::new(7, 3));
        assert_eq!(board.count_ones(), 1);
        assert!(board.get(Cell::new(7, 3)));
    }
}
