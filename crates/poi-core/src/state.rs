use poi_protocol::{MapSize, Side, Source, Symmetry};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::gossip::{GossipScheduler, IngestStats, SendStats};
use crate::world::WorldMut;
use crate::{CoreError, FactStore, ProtocolConfig, SymmetryEngine};

/// Phase of [`PoiState::update_round`] that ran out of budget first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Ingest,
    Disseminate,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub round: u32,
    pub ingest: IngestStats,
    pub structures_seen: u32,
    pub walls_seen: u32,
    pub disproven: Vec<Symmetry>,
    pub send: SendStats,
    pub truncated: Option<Phase>,
}

/// Everything one agent knows, owned exclusively by that agent.
#[derive(Debug, Clone)]
pub struct PoiState {
    config: ProtocolConfig,
    store: FactStore,
    engine: SymmetryEngine,
    gossip: GossipScheduler,
}

impl PoiState {
    pub fn new(config: ProtocolConfig, size: MapSize, team: Side) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            store: FactStore::new(&config, size, team),
            engine: SymmetryEngine::new(size, config.vision_radius_squared),
            gossip: GossipScheduler::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn store(&self) -> &FactStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut FactStore {
        &mut self.store
    }

    pub fn engine(&self) -> &SymmetryEngine {
        &self.engine
    }

    pub fn gossip(&self) -> &GossipScheduler {
        &self.gossip
    }

    pub fn unexplored_count(&self) -> u32 {
        self.engine.boards().unexplored_count()
    }

    /// One tick: ingest, local observation, terrain and symmetry (mobile only), dissemination.
    ///
    /// Every phase leaves the state consistent, so an error or a truncated phase only loses
    /// the work that was not done.
    pub fn update_round<W: WorldMut + ?Sized>(
        &mut self,
        world: &mut W,
    ) -> Result<TickReport, CoreError> {
        let span = debug_span!("poi", agent = %world.id(), round = world.round());
        let _enter = span.enter();

        let mut report = TickReport {
            round: world.round(),
            ..TickReport::default()
        };

        report.ingest = self.gossip.ingest(&self.config, &mut self.store, world)?;
        if report.ingest.truncated {
            report.truncated = Some(Phase::Ingest);
        }

        report.structures_seen = self.observe_structures(world)?;

        if !world.role().is_infrastructure() {
            report.walls_seen = self.update_terrain(world);
            report.disproven = self.engine.update(&mut self.store, world.location());
            if !report.disproven.is_empty() {
                debug!(disproven = ?report.disproven, "symmetry narrowed");
            }
        }

        report.send = self.gossip.disseminate(&self.config, &mut self.store, world);
        if report.send.truncated && report.truncated.is_none() {
            report.truncated = Some(Phase::Disseminate);
        }
        Ok(report)
    }

    fn observe_structures<W: WorldMut + ?Sized>(&mut self, world: &W) -> Result<u32, CoreError> {
        let mut seen = 0;
        for sighting in world.nearby_ruins() {
            self.engine.mark_ruin(sighting.cell);
            self.store
                .observe(Source::Local, sighting.cell, sighting.structure())?;
            seen += 1;
        }
        Ok(seen)
    }

    /// Marks the footprint explored and records walls and ruins in it. The first call scans the
    /// whole footprint; later calls only sense its edge ring.
    fn update_terrain<W: WorldMut + ?Sized>(&mut self, world: &W) -> u32 {
        let here = world.location();
        let size = world.map_size();
        self.engine.mark_explored(here);

        let samples: Vec<_> = if self.engine.take_first_update() {
            world.nearby_terrain()
        } else {
            self.engine
                .footprint()
                .edge_offsets()
                .iter()
                .filter_map(|&(dx, dy)| here.translate(dx, dy, size))
                .filter_map(|cell| world.sense_cell(cell))
                .collect()
        };

        let mut walls = 0;
        for sample in samples {
            if sample.wall {
                self.engine.mark_wall(sample.cell);
                walls += 1;
            }
            if sample.ruin {
                self.engine.mark_ruin(sample.cell);
            }
        }
        walls
    }
}
