//! The per-agent window onto the simulated world.

use std::cell::Cell as Meter;

use poi_core::{AllyInfo, Message, RuinSighting, SendError, TerrainSample, WorldMut, WorldView};
use poi_protocol::{AgentId, Cell, MapSize, Role, Side, Structure};
use rand::rngs::StdRng;
use rand::Rng;

use crate::{BudgetConfig, SimMap};

/// Public, per-round facts about one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentInfo {
    pub id: AgentId,
    pub team: Side,
    pub role: Role,
    pub cell: Cell,
}

/// A message waiting for the channel to deliver it next round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outgoing {
    Direct { from: AgentId, to: usize, bytes: u32 },
    Broadcast { from: AgentId, team: Side, bytes: u32 },
}

/// Limits that apply to one agent for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickLimits {
    pub budget: u32,
    pub sends: u32,
    pub vision_radius_squared: u32,
    pub message_range_squared: u32,
}

/// [`WorldMut`] implementation for the agent at `agents[index]`.
///
/// Queries are metered against the tick budget; sends are queued in `outbox`.
pub struct AgentView<'a> {
    map: &'a SimMap,
    agents: &'a [AgentInfo],
    index: usize,
    round: u32,
    costs: &'a BudgetConfig,
    limits: TickLimits,
    budget: Meter<u32>,
    sends_left: u32,
    inbox: Vec<Message>,
    outbox: Vec<Outgoing>,
    rng: &'a mut StdRng,
}

impl<'a> AgentView<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        map: &'a SimMap,
        agents: &'a [AgentInfo],
        index: usize,
        round: u32,
        costs: &'a BudgetConfig,
        limits: TickLimits,
        inbox: Vec<Message>,
        rng: &'a mut StdRng,
    ) -> Self {
        Self {
            map,
            agents,
            index,
            round,
            costs,
            budget: Meter::new(limits.budget),
            sends_left: limits.sends,
            limits,
            inbox,
            outbox: Vec::new(),
            rng,
        }
    }

    fn me(&self) -> &AgentInfo {
        &self.agents[self.index]
    }

    fn charge(&self, cost: u32) {
        self.budget.set(self.budget.get().saturating_sub(cost));
    }

    fn visible(&self, cell: Cell) -> bool {
        self.map.size().contains(cell)
            && cell.distance_squared(self.me().cell) <= self.limits.vision_radius_squared
    }

    fn sample(&self, cell: Cell) -> TerrainSample {
        TerrainSample {
            cell,
            wall: self.map.is_wall(cell),
            ruin: self.map.structure_at(cell).is_some(),
        }
    }

    /// Budget left when the tick ended.
    pub fn budget_remaining(&self) -> u32 {
        self.budget.get()
    }

    pub fn into_outbox(self) -> Vec<Outgoing> {
        self.outbox
    }
}

impl WorldView for AgentView<'_> {
    fn id(&self) -> AgentId {
        self.me().id
    }

    fn team(&self) -> Side {
        self.me().team
    }

    fn role(&self) -> Role {
        self.me().role
    }

    fn location(&self) -> Cell {
        self.me().cell
    }

    fn map_size(&self) -> MapSize {
        self.map.size()
    }

    fn round(&self) -> u32 {
        self.round
    }

    fn budget_left(&self) -> u32 {
        self.budget.get()
    }

    fn nearby_ruins(&self) -> Vec<RuinSighting> {
        self.charge(self.costs.call_cost);
        self.map
            .structures()
            .iter()
            .filter(|(cell, _)| self.visible(*cell))
            .map(|&(cell, structure)| RuinSighting {
                cell,
                occupant: match structure {
                    Structure::Ruin => None,
                    Structure::Tower { side, kind } => Some((side, kind)),
                },
            })
            .collect()
    }

    fn nearby_terrain(&self) -> Vec<TerrainSample> {
        self.charge(self.costs.call_cost);
        self.map
            .size()
            .cells()
            .filter(|c| self.visible(*c))
            .map(|c| self.sample(c))
            .collect()
    }

    fn sense_cell(&self, cell: Cell) -> Option<TerrainSample> {
        self.charge(self.costs.sense_cell_cost);
        self.visible(cell).then(|| self.sample(cell))
    }

    fn nearby_allies(&self) -> Vec<AllyInfo> {
        self.charge(self.costs.call_cost);
        let me = self.me();
        self.agents
            .iter()
            .enumerate()
            .filter(|(i, a)| *i != self.index && a.team == me.team && self.visible(a.cell))
            .map(|(_, a)| AllyInfo {
                id: a.id,
                cell: a.cell,
                role: a.role,
            })
            .collect()
    }

    fn can_send(&self, cell: Cell) -> bool {
        cell.distance_squared(self.me().cell) <= self.limits.message_range_squared
    }
}

impl WorldMut for AgentView<'_> {
    fn send(&mut self, to: Cell, message: u32) -> Result<(), SendError> {
        self.charge(self.costs.call_cost);
        if self.sends_left == 0 {
            return Err(SendError::QuotaExhausted);
        }
        if !self.can_send(to) {
            return Err(SendError::OutOfRange(to));
        }
        let team = self.me().team;
        let Some(recipient) = self
            .agents
            .iter()
            .position(|a| a.cell == to && a.team == team)
        else {
            return Err(SendError::OutOfRange(to));
        };
        self.sends_left -= 1;
        self.outbox.push(Outgoing::Direct {
            from: self.me().id,
            to: recipient,
            bytes: message,
        });
        Ok(())
    }

    fn broadcast(&mut self, message: u32) -> Result<(), SendError> {
        self.charge(self.costs.call_cost);
        if !self.me().role.is_infrastructure() {
            return Err(SendError::BroadcastUnavailable);
        }
        if self.sends_left == 0 {
            return Err(SendError::QuotaExhausted);
        }
        self.sends_left -= 1;
        self.outbox.push(Outgoing::Broadcast {
            from: self.me().id,
            team: self.me().team,
            bytes: message,
        });
        Ok(())
    }

    fn read_messages(&mut self) -> Vec<Message> {
        self.charge(self.costs.call_cost);
        std::mem::take(&mut self.inbox)
    }

    fn rand_u32(&mut self) -> u32 {
        self.rng.gen()
    }
}
