//! Incremental elimination of symmetry hypotheses from observed terrain.

use poi_protocol::{Cell, MapSize, Source, Symmetry};
use tracing::trace;

use crate::bitboard::TerrainBoards;
use crate::{FactStore, VisionFootprint};

#[derive(Debug, Clone)]
pub struct SymmetryEngine {
    boards: TerrainBoards,
    footprint: VisionFootprint,
    first_update: bool,
}

impl SymmetryEngine {
    pub fn new(size: MapSize, vision_radius_squared: u32) -> Self {
        Self {
            boards: TerrainBoards::new(size),
            footprint: VisionFootprint::new(vision_radius_squared),
            first_update: true,
        }
    }

    pub fn boards(&self) -> &TerrainBoards {
        &self.boards
    }

    pub fn footprint(&self) -> &VisionFootprint {
        &self.footprint
    }

    /// `true` exactly once: the first terrain update must scan every visible cell.
    pub fn take_first_update(&mut self) -> bool {
        std::mem::replace(&mut self.first_update, false)
    }

    pub fn mark_explored(&mut self, center: Cell) {
        let size = self.boards.size;
        for (y, mask) in self.footprint.row_masks(center, size) {
            self.boards.explored.or_row(y, mask);
        }
    }

    pub fn mark_wall(&mut self, cell: Cell) {
        self.boards.wall.set(cell);
    }

    pub fn mark_ruin(&mut self, cell: Cell) {
        self.boards.ruin.set(cell);
    }

    /// Whether `sym` is consistent with every explored pair in the band of rows around
    /// `center_row`.
    pub fn is_consistent(&self, sym: Symmetry, center_row: u8) -> bool {
        let h = self.boards.size.height as usize;
        let reach = self.footprint.reach();
        let lo = (center_row as i32 - reach).max(0) as usize;
        let hi = ((center_row as i32 + reach + 1).min(h as i32)) as usize;

        let b = &self.boards;
        for y in lo..hi {
            let my = h - y - 1;
            let (explored, wall_diff, ruin_diff) = match sym {
                Symmetry::Horizontal => (
                    b.explored.row(y) & b.explored.row(my),
                    b.wall.row(y) ^ b.wall.row(my),
                    b.ruin.row(y) ^ b.ruin.row(my),
                ),
                Symmetry::Vertical => (
                    b.explored.mirrored_row(y) & b.explored.row(y),
                    b.wall.mirrored_row(y) ^ b.wall.row(y),
                    b.ruin.mirrored_row(y) ^ b.ruin.row(y),
                ),
                Symmetry::Rotational => (
                    b.explored.mirrored_row(y) & b.explored.row(my),
                    b.wall.mirrored_row(y) ^ b.wall.row(my),
                    b.ruin.mirrored_row(y) ^ b.ruin.row(my),
                ),
            };
            if (wall_diff | ruin_diff) & explored != 0 {
                trace!(?sym, row = y, "symmetry contradiction");
                return false;
            }
        }
        true
    }

    /// Re-checks every still-valid hypothesis around `center`, invalidating contradicted
    /// ones in `store`. Skipped once a single hypothesis remains. Returns the disproven ones.
    pub fn update(&self, store: &mut FactStore, center: Cell) -> Vec<Symmetry> {
        let valid = store.symmetry().valid;
        if valid.len() <= 1 {
            return Vec::new();
        }
        let disproven: Vec<Symmetry> = valid
            .iter()
            .filter(|sym| !self.is_consistent(*sym, center.y))
            .collect();
        for sym in &disproven {
            store.invalidate_symmetry(Source::Local, *sym);
        }
        disproven
    }
}
