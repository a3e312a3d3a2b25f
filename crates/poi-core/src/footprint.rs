use poi_protocol::{Cell, MapSize};

use crate::bitboard::span_mask;

/// Cells visible from an agent, as a table from vertical distance to half-width.
///
/// For the default radius² of 20 the rows at |dy| = 0..=2 are 9 wide, |dy| = 3 is 7 wide and
/// |dy| = 4 is 5 wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionFootprint {
    half_widths: Vec<i32>,
    edge: Vec<(i32, i32)>,
}

impl VisionFootprint {
    pub fn new(radius_squared: u32) -> Self {
        let r2 = radius_squared as i32;
        let mut half_widths = Vec::new();
        let mut dy = 0;
        while dy * dy <= r2 {
            let mut hw = 0;
            while (hw + 1) * (hw + 1) + dy * dy <= r2 {
                hw += 1;
            }
            half_widths.push(hw);
            dy += 1;
        }

        let mut footprint = Self {
            half_widths,
            edge: Vec::new(),
        };
        footprint.edge = footprint.compute_edge();
        footprint
    }

    /// Largest |dy| inside the footprint.
    pub fn reach(&self) -> i32 {
        self.half_widths.len() as i32 - 1
    }

    pub fn half_width(&self, dy: i32) -> Option<i32> {
        self.half_widths.get(dy.unsigned_abs() as usize).copied()
    }

    pub fn contains(&self, dx: i32, dy: i32) -> bool {
        self.half_width(dy).is_some_and(|hw| dx.abs() <= hw)
    }

    /// Every `(dx, dy)` offset in the footprint, row by row.
    pub fn offsets(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let reach = self.reach();
        (-reach..=reach).flat_map(move |dy| {
            let hw = self.half_width(dy).unwrap_or(0);
            (-hw..=hw).map(move |dx| (dx, dy))
        })
    }

    /// Offsets with at least one 8-neighbour outside the footprint.
    ///
    /// An agent moves at most one cell per tick, so every newly visible cell is one of these.
    pub fn edge_offsets(&self) -> &[(i32, i32)] {
        &self.edge
    }

    fn compute_edge(&self) -> Vec<(i32, i32)> {
        self.offsets()
            .filter(|&(dx, dy)| {
                (-1..=1).any(|ny| (-1..=1).any(|nx| !self.contains(dx + nx, dy + ny)))
            })
            .collect()
    }

    /// `(row, mask)` pairs covering the footprint around `center`, clipped to the map.
    pub fn row_masks(&self, center: Cell, size: MapSize) -> impl Iterator<Item = (usize, u64)> + '_ {
        let reach = self.reach();
        let cx = center.x as i32;
        let cy = center.y as i32;
        (-reach..=reach).filter_map(move |dy| {
            let y = cy + dy;
            if y < 0 || y >= size.height as i32 {
                return None;
            }
            let hw = self.half_width(dy)?;
            let mask = span_mask(cx - hw, cx + hw, size.width);
            Some((y as usize, mask))
        })
    }
}
