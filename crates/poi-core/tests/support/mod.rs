#![allow(dead_code)]

use poi_core::{AllyInfo, Message, RuinSighting, SendError, TerrainSample, WorldMut, WorldView};
use poi_protocol::{AgentId, Cell, MapSize, Role, Side};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Scripted runtime for one agent. Everything it sends is recorded; nothing is delivered.
pub struct FakeWorld {
    pub id: AgentId,
    pub team: Side,
    pub role: Role,
    pub location: Cell,
    pub size: MapSize,
    pub round: u32,
    /// Budget left; every capability call costs `call_cost`.
    pub budget: std::cell::Cell<u32>,
    pub call_cost: u32,
    pub ruins: Vec<RuinSighting>,
    /// Ground-truth walls, sensed within `vision_radius_squared`.
    pub walls: Vec<Cell>,
    pub vision_radius_squared: u32,
    pub allies: Vec<AllyInfo>,
    pub inbox: Vec<Message>,
    pub send_range_squared: u32,
    pub refuse_sends: bool,
    pub broadcast_allowed: bool,
    pub sent: Vec<(Cell, u32)>,
    pub broadcasts: Vec<u32>,
    rng: StdRng,
}

impl FakeWorld {
    pub fn new(id: u32, role: Role, location: Cell, size: MapSize) -> Self {
        Self {
            id: AgentId(id),
            team: Side::A,
            role,
            location,
            size,
            round: 1,
            budget: std::cell::Cell::new(u32::MAX),
            call_cost: 0,
            ruins: Vec::new(),
            walls: Vec::new(),
            vision_radius_squared: 20,
            allies: Vec::new(),
            inbox: Vec::new(),
            send_range_squared: 20,
            refuse_sends: false,
            broadcast_allowed: role.is_infrastructure(),
            sent: Vec::new(),
            broadcasts: Vec::new(),
            rng: StdRng::seed_from_u64(id as u64),
        }
    }

    pub fn with_budget(self, budget: u32, call_cost: u32) -> Self {
        self.budget.set(budget);
        Self { call_cost, ..self }
    }

    fn charge(&self) {
        self.budget
            .set(self.budget.get().saturating_sub(self.call_cost));
    }

    fn visible(&self, cell: Cell) -> bool {
        self.size.contains(cell) && cell.distance_squared(self.location) <= self.vision_radius_squared
    }

    fn sample(&self, cell: Cell) -> TerrainSample {
        TerrainSample {
            cell,
            wall: self.walls.contains(&cell),
            ruin: self.ruins.iter().any(|r| r.cell == cell),
        }
    }

    pub fn deliver(&mut self, sender: u32, bytes: u32) {
        self.inbox.push(Message {
            sender: AgentId(sender),
            bytes,
        });
    }
}

impl WorldView for FakeWorld {
    fn id(&self) -> AgentId {
        self.id
    }

    fn team(&self) -> Side {
        self.team
    }

    fn role(&self) -> Role {
        self.role
    }

    fn location(&self) -> Cell {
        self.location
    }

    fn map_size(&self) -> MapSize {
        self.size
    }

    fn round(&self) -> u32 {
        self.round
    }

    fn budget_left(&self) -> u32 {
        self.budget.get()
    }

    fn nearby_ruins(&self) -> Vec<RuinSighting> {
        self.charge();
        self.ruins
            .iter()
            .filter(|r| self.visible(r.cell))
            .copied()
            .collect()
    }

    fn nearby_terrain(&self) -> Vec<TerrainSample> {
        self.charge();
        self.size
            .cells()
            .filter(|c| self.visible(*c))
            .map(|c| self.sample(c))
            .collect()
    }

    fn sense_cell(&self, cell: Cell) -> Option<TerrainSample> {
        self.charge();
        self.visible(cell).then(|| self.sample(cell))
    }

    fn nearby_allies(&self) -> Vec<AllyInfo> {
        self.charge();
        self.allies.clone()
    }

    fn can_send(&self, cell: Cell) -> bool {
        cell.distance_squared(self.location) <= self.send_range_squared
    }
}

impl WorldMut for FakeWorld {
    fn send(&mut self, to: Cell, message: u32) -> Result<(), SendError> {
        self.charge();
        if self.refuse_sends {
            return Err(SendError::QuotaExhausted);
        }
        if !self.can_send(to) {
            return Err(SendError::OutOfRange(to));
        }
        self.sent.push((to, message));
        Ok(())
    }

    fn broadcast(&mut self, message: u32) -> Result<(), SendError> {
        self.charge();
        if !self.broadcast_allowed {
            return Err(SendError::BroadcastUnavailable);
        }
        self.broadcasts.push(message);
        Ok(())
    }

    fn read_messages(&mut self) -> Vec<Message> {
        self.charge();
        std::mem::take(&mut self.inbox)
    }

    fn rand_u32(&mut self) -> u32 {
        self.rng.gen()
    }
}
