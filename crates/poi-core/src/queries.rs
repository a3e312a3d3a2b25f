//! Spatial lookups over the fact store for movement and targeting code.

use poi_protocol::{Cell, Structure, Team, TowerKind};

use crate::{FactStore, TowerRecord};

impl FactStore {
    /// Closest known structure accepted by `filter`, ties broken by registry order.
    pub fn nearest_where(
        &self,
        from: Cell,
        mut filter: impl FnMut(&TowerRecord) -> bool,
    ) -> Option<&TowerRecord> {
        self.towers()
            .iter()
            .filter(|t| filter(t))
            .min_by_key(|t| t.cell.distance_squared(from))
    }

    pub fn nearest_ally_paint_tower(&self, from: Cell) -> Option<Cell> {
        let team = self.team();
        self.nearest_where(from, |t| {
            t.structure
                == Structure::Tower {
                    side: team,
                    kind: TowerKind::Paint,
                }
        })
        .map(|t| t.cell)
    }

    pub fn nearest_ally_tower(&self, from: Cell) -> Option<Cell> {
        let team = self.team();
        self.nearest_where(from, |t| t.structure.is_owned_by(team))
            .map(|t| t.cell)
    }

    pub fn nearest_enemy_tower(&self, from: Cell) -> Option<Cell> {
        let enemy = self.team().opponent();
        self.nearest_where(from, |t| t.structure.is_owned_by(enemy))
            .map(|t| t.cell)
    }

    pub fn nearest_enemy_paint_tower(&self, from: Cell) -> Option<Cell> {
        let enemy = self.team().opponent();
        self.nearest_where(from, |t| {
            t.structure
                == Structure::Tower {
                    side: enemy,
                    kind: TowerKind::Paint,
                }
        })
        .map(|t| t.cell)
    }

    /// Whether a tower of either side is known to stand on `cell`.
    pub fn has_tower(&self, cell: Cell) -> bool {
        self.slot_of(cell)
            .and_then(|slot| self.fact(slot))
            .is_some_and(|t| t.cell == cell && t.structure.owner() != Team::Neutral)
    }

    pub fn nearest_neutral_ruin(&self, from: Cell) -> Option<Cell> {
        self.nearest_where(from, |t| t.structure.owner() == Team::Neutral)
            .map(|t| t.cell)
    }

    /// Where enemy towers should be if the map mirrors ours: the image of every ally tower
    /// under every still-valid symmetry, minus blocks already known to hold something else.
    pub fn predicted_enemy_towers(&self) -> Vec<Cell> {
        let team = self.team();
        let enemy = team.opponent();
        let size = self.map_size();
        let valid = self.symmetry().valid;

        let mut predicted: Vec<Cell> = Vec::new();
        for tower in self.towers().iter().filter(|t| t.structure.is_owned_by(team)) {
            for sym in valid.iter() {
                let cell = sym.opposite(tower.cell, size);
                let known_other = self
                    .slot_of(cell)
                    .and_then(|slot| self.fact(slot))
                    .is_some_and(|t| !t.structure.is_owned_by(enemy));
                if !known_other && !predicted.contains(&cell) {
                    predicted.push(cell);
                }
            }
        }
        predicted
    }
}
