//! Ground-truth map generation.
//!
//! Everything is placed in pairs, a cell and its image under the configured symmetry, so the
//! generated map is exactly symmetric. Structures sit in distinct coarse blocks, matching the
//! one-structure-per-block assumption of the fact registry.

use anyhow::{bail, Result};
use poi_core::BitBoard;
use poi_protocol::{Cell, MapSize, Side, Structure, Symmetry, TowerKind};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::SimConfig;

const PLACEMENT_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct SimMap {
    size: MapSize,
    symmetry: Symmetry,
    walls: BitBoard,
    structures: Vec<(Cell, Structure)>,
    /// Side A's spawn cells; side B spawns at their images.
    spawns: Vec<Cell>,
}

impl SimMap {
    pub fn generate(config: &SimConfig, rng: &mut StdRng) -> Result<Self> {
        let size = config.map_size();
        let symmetry = config.symmetry;
        let mut map = Self {
            size,
            symmetry,
            walls: BitBoard::new(size),
            structures: Vec::new(),
            spawns: Vec::new(),
        };

        let mut used_blocks: Vec<(u8, u8)> = Vec::new();
        let block_size = config.protocol.block_size;

        for i in 0..config.towers_per_team {
            let kind = TowerKind::ALL[i % TowerKind::ALL.len()];
            let cell = map.place_pair(rng, block_size, &mut used_blocks, true)?;
            map.structures
                .push((cell, Structure::Tower { side: Side::A, kind }));
            map.structures.push((
                symmetry.opposite(cell, size),
                Structure::Tower { side: Side::B, kind },
            ));
        }
        for _ in 0..config.ruin_pairs {
            let cell = map.place_pair(rng, block_size, &mut used_blocks, false)?;
            map.structures.push((cell, Structure::Ruin));
            map.structures
                .push((symmetry.opposite(cell, size), Structure::Ruin));
        }

        for cell in size.cells() {
            if map.structure_at(cell).is_none() && rng.gen_bool(config.wall_density) {
                map.walls.set(cell);
                map.walls.set(symmetry.opposite(cell, size));
            }
        }
        // Wall images may have landed on structures.
        let blocked: Vec<Cell> = map.structures.iter().map(|(c, _)| *c).collect();
        let mut walls = BitBoard::new(size);
        for cell in size.cells().filter(|c| map.walls.get(*c) && !blocked.contains(c)) {
            walls.set(cell);
        }
        map.walls = walls;

        map.spawns = map.pick_spawns(rng, config.robots_per_team)?;
        debug!(
            structures = map.structures.len(),
            walls = map.walls.count_ones(),
            ?symmetry,
            "generated map"
        );
        Ok(map)
    }

    pub fn size(&self) -> MapSize {
        self.size
    }

    pub fn symmetry(&self) -> Symmetry {
        self.symmetry
    }

    pub fn is_wall(&self, cell: Cell) -> bool {
        self.walls.get(cell)
    }

    pub fn structures(&self) -> &[(Cell, Structure)] {
        &self.structures
    }

    pub fn structure_at(&self, cell: Cell) -> Option<Structure> {
        self.structures
            .iter()
            .find(|(c, _)| *c == cell)
            .map(|(_, s)| *s)
    }

    /// Passable for robots: on the map, no wall, no structure.
    pub fn is_open(&self, cell: Cell) -> bool {
        self.size.contains(cell) && !self.is_wall(cell) && self.structure_at(cell).is_none()
    }

    pub fn spawns(&self, side: Side) -> Vec<Cell> {
        match side {
            Side::A => self.spawns.clone(),
            Side::B => self
                .spawns
                .iter()
                .map(|c| self.symmetry.opposite(*c, self.size))
                .collect(),
        }
    }

    /// Side A's half of the map, so its towers and their images do not mix.
    fn in_home_half(&self, cell: Cell) -> bool {
        match self.symmetry {
            Symmetry::Horizontal => (cell.y as u32) * 2 + 1 < self.size.height as u32,
            Symmetry::Vertical | Symmetry::Rotational => {
                (cell.x as u32) * 2 + 1 < self.size.width as u32
            }
        }
    }

    fn place_pair(
        &self,
        rng: &mut StdRng,
        block_size: u8,
        used_blocks: &mut Vec<(u8, u8)>,
        home_half: bool,
    ) -> Result<Cell> {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let cell = Cell::new(
                rng.gen_range(0..self.size.width),
                rng.gen_range(0..self.size.height),
            );
            if home_half && !self.in_home_half(cell) {
                continue;
            }
            let image = self.symmetry.opposite(cell, self.size);
            let (a, b) = (cell.block(block_size), image.block(block_size));
            if a == b || used_blocks.contains(&a) || used_blocks.contains(&b) {
                continue;
            }
            used_blocks.push(a);
            used_blocks.push(b);
            return Ok(cell);
        }
        bail!(
            "could not place {} structures on a {}x{} map",
            used_blocks.len() / 2 + 1,
            self.size.width,
            self.size.height
        )
    }

    /// Open cells near side A's towers whose images are open and distinct too.
    fn pick_spawns(&self, rng: &mut StdRng, count: usize) -> Result<Vec<Cell>> {
        let towers: Vec<Cell> = self
            .structures
            .iter()
            .filter(|(_, s)| s.is_owned_by(Side::A))
            .map(|(c, _)| *c)
            .collect();
        let mut spawns: Vec<Cell> = Vec::with_capacity(count);
        let mut attempts = 0;
        while spawns.len() < count {
            attempts += 1;
            if attempts > PLACEMENT_ATTEMPTS {
                bail!("could not find {count} spawn cells");
            }
            let tower = towers[rng.gen_range(0..towers.len())];
            let (dx, dy) = (rng.gen_range(-3..=3), rng.gen_range(-3..=3));
            let Some(cell) = tower.translate(dx, dy, self.size) else {
                continue;
            };
            let image = self.symmetry.opposite(cell, self.size);
            let taken = |c: Cell| {
                spawns
                    .iter()
                    .any(|s| *s == c || self.symmetry.opposite(*s, self.size) == c)
            };
            if cell == image || taken(cell) || taken(image) {
                continue;
            }
            if self.is_open(cell) && self.is_open(image) {
                spawns.push(cell);
            }
        }
        Ok(spawns)
    }
}
