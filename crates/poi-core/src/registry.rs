//! Deduplicated registry of known structures plus the symmetry hypothesis.

use poi_protocol::{
    encode_symmetry_claim, AgentId, Cell, MapSize, Side, Source, Structure, Symmetry,
    SymmetrySet, Team, TowerKind, WireUnit,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{CoreError, ProtocolConfig, RecipientSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerRecord {
    /// Cell of the first observation in this block.
    pub cell: Cell,
    pub structure: Structure,
    pub recipients: RecipientSet,
    /// Observed first-hand and not yet handed to anyone.
    pub critical: bool,
}

impl TowerRecord {
    pub fn unit(&self, relay: bool) -> u16 {
        WireUnit::Tower {
            cell: self.cell,
            structure: self.structure,
            relay,
        }
        .encode()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymmetryRecord {
    pub valid: SymmetrySet,
    pub recipients: RecipientSet,
    /// The last invalidation was discovered by this agent.
    pub critical: bool,
}

impl SymmetryRecord {
    pub fn unit(&self) -> u16 {
        encode_symmetry_claim(self.valid)
    }
}

/// Running count of the local side's towers per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerCounts {
    pub paint: u32,
    pub money: u32,
    pub defense: u32,
}

impl TowerCounts {
    pub fn get(&self, kind: TowerKind) -> u32 {
        match kind {
            TowerKind::Paint => self.paint,
            TowerKind::Money => self.money,
            TowerKind::Defense => self.defense,
        }
    }

    pub fn total(&self) -> u32 {
        self.paint + self.money + self.defense
    }

    fn slot(&mut self, kind: TowerKind) -> &mut u32 {
        match kind {
            TowerKind::Paint => &mut self.paint,
            TowerKind::Money => &mut self.money,
            TowerKind::Defense => &mut self.defense,
        }
    }
}

/// Reference to one gossipable fact. The symmetry hypothesis sits one past the last tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactRef {
    Tower(usize),
    Symmetry,
}

/// What an observation did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Registered { slot: usize },
    Changed { slot: usize, previous: Structure },
    Unchanged { slot: usize },
}

impl Observation {
    pub fn slot(self) -> usize {
        match self {
            Observation::Registered { slot }
            | Observation::Changed { slot, .. }
            | Observation::Unchanged { slot } => slot,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FactStore {
    size: MapSize,
    block_size: u8,
    blocks_wide: usize,
    team: Side,
    capacity: usize,
    towers: Vec<TowerRecord>,
    block_index: Vec<Option<u16>>,
    symmetry: SymmetryRecord,
    counts: TowerCounts,
}

impl FactStore {
    pub fn new(config: &ProtocolConfig, size: MapSize, team: Side) -> Self {
        let block_size = config.block_size.max(1);
        let blocks_wide = size.width.div_ceil(block_size) as usize;
        let blocks_high = size.height.div_ceil(block_size) as usize;
        Self {
            size,
            block_size,
            blocks_wide,
            team,
            capacity: config.max_facts,
            towers: Vec::with_capacity(config.max_facts),
            block_index: vec![None; blocks_wide * blocks_high],
            symmetry: SymmetryRecord {
                valid: SymmetrySet::ALL,
                recipients: RecipientSet::new(),
                critical: false,
            },
            counts: TowerCounts::default(),
        }
    }

    pub fn map_size(&self) -> MapSize {
        self.size
    }

    pub fn team(&self) -> Side {
        self.team
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn fact_count(&self) -> usize {
        self.towers.len()
    }

    pub fn fact(&self, slot: usize) -> Option<&TowerRecord> {
        self.towers.get(slot)
    }

    pub fn towers(&self) -> &[TowerRecord] {
        &self.towers
    }

    pub fn symmetry(&self) -> &SymmetryRecord {
        &self.symmetry
    }

    pub fn counts(&self) -> TowerCounts {
        self.counts
    }

    fn block_of(&self, cell: Cell) -> Result<usize, CoreError> {
        if !self.size.contains(cell) {
            return Err(CoreError::OffMap {
                cell,
                width: self.size.width,
                height: self.size.height,
            });
        }
        let (bx, by) = cell.block(self.block_size);
        Ok(by as usize * self.blocks_wide + bx as usize)
    }

    /// Registry slot of the structure in `cell`'s block, if known.
    pub fn slot_of(&self, cell: Cell) -> Option<usize> {
        let block = self.block_of(cell).ok()?;
        self.block_index[block].map(usize::from)
    }

    pub fn observe_tower(
        &mut self,
        source: Source,
        cell: Cell,
        owner: Team,
        kind: TowerKind,
    ) -> Result<Observation, CoreError> {
        self.observe(source, cell, Structure::new(owner, kind))
    }

    pub fn observe(
        &mut self,
        source: Source,
        cell: Cell,
        structure: Structure,
    ) -> Result<Observation, CoreError> {
        let block = self.block_of(cell)?;
        let Some(slot) = self.block_index[block].map(usize::from) else {
            if self.towers.len() >= self.capacity {
                warn!(%cell, capacity = self.capacity, "fact registry overflow");
                return Err(CoreError::CapacityExceeded {
                    capacity: self.capacity,
                    cell,
                });
            }
            let slot = self.towers.len();
            self.towers.push(TowerRecord {
                cell,
                structure,
                recipients: RecipientSet::from_source(source),
                critical: source.is_local(),
            });
            self.block_index[block] = Some(slot as u16);
            self.count(structure, 1);
            debug!(slot, %cell, ?structure, ?source, "registered structure");
            return Ok(Observation::Registered { slot });
        };

        let record = &mut self.towers[slot];
        if record.structure == structure {
            if let Some(peer) = source.peer() {
                record.recipients.insert(peer);
                record.critical = false;
            }
            return Ok(Observation::Unchanged { slot });
        }

        let previous = record.structure;
        record.structure = structure;
        record.recipients.reset(source);
        record.critical = source.is_local();
        self.count(previous, -1);
        self.count(structure, 1);
        debug!(slot, ?previous, ?structure, ?source, "structure changed");
        Ok(Observation::Changed { slot, previous })
    }

    fn count(&mut self, structure: Structure, delta: i32) {
        if let Structure::Tower { side, kind } = structure {
            if side == self.team {
                let counter = self.counts.slot(kind);
                *counter = counter.saturating_add_signed(delta);
            }
        }
    }

    /// Marks `which` disproven. Returns `true` if this changed the hypothesis.
    pub fn invalidate_symmetry(&mut self, source: Source, which: Symmetry) -> bool {
        let record = &mut self.symmetry;
        if record.valid.contains(which) {
            record.valid.remove(which);
            record.recipients.reset(source);
            record.critical = source.is_local();
            debug!(?which, ?source, remaining = record.valid.bits(), "symmetry disproven");
            true
        } else {
            if let Some(peer) = source.peer() {
                record.recipients.insert(peer);
            }
            false
        }
    }

    pub fn knows(&self, fact: FactRef, id: AgentId) -> bool {
        match fact {
            FactRef::Tower(slot) => self
                .towers
                .get(slot)
                .is_some_and(|t| t.recipients.contains(id)),
            FactRef::Symmetry => self.symmetry.recipients.contains(id),
        }
    }

    pub fn mark_known(&mut self, fact: FactRef, id: AgentId) {
        match fact {
            FactRef::Tower(slot) => {
                if let Some(record) = self.towers.get_mut(slot) {
                    record.recipients.insert(id);
                }
            }
            FactRef::Symmetry => {
                self.symmetry.recipients.insert(id);
            }
        }
    }

    pub fn unit(&self, fact: FactRef) -> Option<u16> {
        match fact {
            FactRef::Tower(slot) => self.towers.get(slot).map(|t| t.unit(false)),
            FactRef::Symmetry => Some(self.symmetry.unit()),
        }
    }

    pub fn clear_critical(&mut self, fact: FactRef) {
        match fact {
            FactRef::Tower(slot) => {
                if let Some(record) = self.towers.get_mut(slot) {
                    record.critical = false;
                }
            }
            FactRef::Symmetry => self.symmetry.critical = false,
        }
    }
}
