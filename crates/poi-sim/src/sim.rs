//! Round-based driver: ticks every agent, delivers messages a round later, moves robots.

use anyhow::Result;
use poi_core::{Message, PoiState, TickReport};
use poi_protocol::{AgentId, Cell, Role, Side, Structure, Symmetry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::world::{AgentInfo, AgentView, Outgoing, TickLimits};
use crate::{SimConfig, SimMap};

/// Channel and budget counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStats {
    pub direct: u64,
    pub broadcasts: u64,
    pub units_sent: u64,
    pub units_applied: u64,
    pub relayed_units: u64,
    pub refused: u64,
    pub truncated_ticks: u64,
    pub tick_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamReport {
    pub side: Side,
    pub agents: usize,
    /// Mean share of ground-truth structures each agent knows correctly.
    pub mean_coverage: f64,
    pub agents_with_full_coverage: usize,
    /// First round after which every agent on the side knew every structure.
    pub full_coverage_round: Option<u32>,
    /// Agents down to the single true hypothesis.
    pub agents_resolved: usize,
    /// Agents that ruled out the true hypothesis. Always zero on a consistent run.
    pub agents_disproving_truth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimReport {
    pub rounds: u32,
    pub seed: u64,
    pub width: u8,
    pub height: u8,
    pub symmetry: Symmetry,
    pub structures: usize,
    pub teams: Vec<TeamReport>,
    pub messages: MessageStats,
}

pub struct Simulation {
    config: SimConfig,
    map: SimMap,
    agents: Vec<AgentInfo>,
    states: Vec<PoiState>,
    /// Per-agent streams behind `rand_u32`, split off the run seed.
    rngs: Vec<StdRng>,
    /// Messages readable this round, per agent.
    inboxes: Vec<Vec<Message>>,
    /// Messages sent this round, readable next round.
    pending: Vec<Vec<Message>>,
    targets: Vec<Option<Cell>>,
    rng: StdRng,
    round: u32,
    stats: MessageStats,
    full_coverage: [Option<u32>; 2],
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let map = SimMap::generate(&config, &mut rng)?;
        let size = map.size();

        let mut agents = Vec::new();
        for &(cell, structure) in map.structures() {
            if let Structure::Tower { side, .. } = structure {
                agents.push((side, Role::Infrastructure, cell));
            }
        }
        for side in [Side::A, Side::B] {
            for cell in map.spawns(side) {
                agents.push((side, Role::Mobile, cell));
            }
        }
        let agents: Vec<AgentInfo> = agents
            .into_iter()
            .enumerate()
            .map(|(i, (team, role, cell))| AgentInfo {
                id: AgentId(i as u32 + 1),
                team,
                role,
                cell,
            })
            .collect();

        let states = agents
            .iter()
            .map(|a| PoiState::new(config.protocol.clone(), size, a.team))
            .collect::<Result<Vec<_>, _>>()?;
        let rngs = agents
            .iter()
            .map(|_| StdRng::seed_from_u64(rng.gen()))
            .collect();
        let count = agents.len();

        info!(
            agents = count,
            structures = map.structures().len(),
            symmetry = ?map.symmetry(),
            "simulation ready"
        );

        Ok(Self {
            map,
            states,
            rngs,
            inboxes: vec![Vec::new(); count],
            pending: vec![Vec::new(); count],
            targets: vec![None; count],
            agents,
            rng,
            round: 0,
            stats: MessageStats::default(),
            full_coverage: [None; 2],
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn map(&self) -> &SimMap {
        &self.map
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn agents(&self) -> &[AgentInfo] {
        &self.agents
    }

    pub fn state(&self, index: usize) -> &PoiState {
        &self.states[index]
    }

    /// Runs one round: every agent ticks once, then messages are queued for next round and
    /// robots move.
    pub fn step(&mut self) {
        self.round += 1;
        let count = self.agents.len();
        self.inboxes = std::mem::replace(&mut self.pending, vec![Vec::new(); count]);

        let mut outgoing = Vec::new();
        for index in 0..count {
            let agent = self.agents[index];
            let limits = self.limits(agent.role);
            let inbox = std::mem::take(&mut self.inboxes[index]);
            let mut view = AgentView::new(
                &self.map,
                &self.agents,
                index,
                self.round,
                &self.config.budget,
                limits,
                inbox,
                &mut self.rngs[index],
            );
            match self.states[index].update_round(&mut view) {
                Ok(report) => record(&mut self.stats, &report),
                Err(err) => {
                    warn!(agent = %agent.id, round = self.round, %err, "tick failed");
                    self.stats.tick_failures += 1;
                }
            }
            outgoing.extend(view.into_outbox());
        }

        self.deliver(outgoing);
        self.move_robots();
        self.track_coverage();
    }

    pub fn run(&mut self) -> SimReport {
        for _ in 0..self.config.rounds {
            self.step();
            if self.round % 50 == 0 {
                debug!(round = self.round, "progress");
            }
        }
        let report = self.report();
        for team in &report.teams {
            info!(
                side = ?team.side,
                coverage = team.mean_coverage,
                resolved = team.agents_resolved,
                full_coverage_round = ?team.full_coverage_round,
                "run finished"
            );
        }
        report
    }

    pub fn report(&self) -> SimReport {
        let teams = [Side::A, Side::B]
            .into_iter()
            .map(|side| self.team_report(side))
            .collect();
        SimReport {
            rounds: self.round,
            seed: self.config.seed,
            width: self.config.width,
            height: self.config.height,
            symmetry: self.map.symmetry(),
            structures: self.map.structures().len(),
            teams,
            messages: self.stats,
        }
    }

    /// Share of ground-truth structures agent `index` knows with the right owner and kind.
    pub fn coverage(&self, index: usize) -> f64 {
        let structures = self.map.structures();
        if structures.is_empty() {
            return 1.0;
        }
        let store = self.states[index].store();
        let known = structures
            .iter()
            .filter(|(cell, truth)| {
                store
                    .slot_of(*cell)
                    .and_then(|slot| store.fact(slot))
                    .is_some_and(|fact| fact.structure == *truth)
            })
            .count();
        known as f64 / structures.len() as f64
    }

    fn team_report(&self, side: Side) -> TeamReport {
        let truth = self.map.symmetry();
        let members: Vec<usize> = (0..self.agents.len())
            .filter(|&i| self.agents[i].team == side)
            .collect();
        let coverages: Vec<f64> = members.iter().map(|&i| self.coverage(i)).collect();
        let valid = |i: usize| self.states[i].store().symmetry().valid;
        TeamReport {
            side,
            agents: members.len(),
            mean_coverage: if coverages.is_empty() {
                0.0
            } else {
                coverages.iter().sum::<f64>() / coverages.len() as f64
            },
            agents_with_full_coverage: coverages.iter().filter(|c| **c >= 1.0).count(),
            full_coverage_round: self.full_coverage[side.ordinal() as usize],
            agents_resolved: members
                .iter()
                .filter(|&&i| valid(i).resolved() == Some(truth))
                .count(),
            agents_disproving_truth: members
                .iter()
                .filter(|&&i| !valid(i).contains(truth))
                .count(),
        }
    }

    fn limits(&self, role: Role) -> TickLimits {
        let (budget, sends) = match role {
            Role::Infrastructure => (self.config.budget.tower, self.config.protocol.message_quota),
            Role::Mobile => (self.config.budget.robot, self.config.robot_message_quota),
        };
        TickLimits {
            budget,
            sends,
            vision_radius_squared: self.config.protocol.vision_radius_squared,
            message_range_squared: self.config.message_range_squared,
        }
    }

    fn deliver(&mut self, outgoing: Vec<Outgoing>) {
        for message in outgoing {
            match message {
                Outgoing::Direct { from, to, bytes } => {
                    self.stats.direct += 1;
                    self.pending[to].push(Message {
                        sender: from,
                        bytes,
                    });
                }
                Outgoing::Broadcast { from, team, bytes } => {
                    self.stats.broadcasts += 1;
                    for (i, agent) in self.agents.iter().enumerate() {
                        if agent.team == team && agent.id != from {
                            self.pending[i].push(Message {
                                sender: from,
                                bytes,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Each robot takes one king step towards its wander target, picking a new target when it
    /// arrives or gets stuck.
    fn move_robots(&mut self) {
        for index in 0..self.agents.len() {
            if self.agents[index].role != Role::Mobile {
                continue;
            }
            let here = self.agents[index].cell;
            let target = match self.targets[index] {
                Some(target) if target != here => target,
                _ => self.pick_target(),
            };
            match self.next_step(here, target) {
                Some(next) => {
                    self.agents[index].cell = next;
                    self.targets[index] = Some(target);
                }
                None => self.targets[index] = None,
            }
        }
    }

    fn pick_target(&mut self) -> Cell {
        let size = self.map.size();
        loop {
            let cell = Cell::new(
                self.rng.gen_range(0..size.width),
                self.rng.gen_range(0..size.height),
            );
            if self.map.is_open(cell) {
                return cell;
            }
        }
    }

    /// Best open, unoccupied neighbour that gets strictly closer to `target`.
    fn next_step(&self, here: Cell, target: Cell) -> Option<Cell> {
        let size = self.map.size();
        let current = here.distance_squared(target);
        (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
            .filter(|&d| d != (0, 0))
            .filter_map(|(dx, dy)| here.translate(dx, dy, size))
            .filter(|c| self.map.is_open(*c) && !self.agents.iter().any(|a| a.cell == *c))
            .map(|c| (c.distance_squared(target), c))
            .filter(|(d, _)| *d < current)
            .min()
            .map(|(_, c)| c)
    }

    fn track_coverage(&mut self) {
        for side in [Side::A, Side::B] {
            let slot = side.ordinal() as usize;
            if self.full_coverage[slot].is_some() {
                continue;
            }
            let complete = (0..self.agents.len())
                .filter(|&i| self.agents[i].team == side)
                .all(|i| self.coverage(i) >= 1.0);
            if complete {
                info!(side = ?side, round = self.round, "side has full structure coverage");
                self.full_coverage[slot] = Some(self.round);
            }
        }
    }
}

fn record(stats: &mut MessageStats, report: &TickReport) {
    stats.units_sent += report.send.units_sent as u64;
    stats.units_applied += report.ingest.units_applied as u64;
    stats.relayed_units += report.ingest.relayed_units as u64;
    stats.refused += report.send.refused as u64;
    if report.truncated.is_some() {
        stats.truncated_ticks += 1;
    }
}
