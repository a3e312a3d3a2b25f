use poi_protocol::{AgentId, Cell, MapSize, Role, Side, Structure, TowerKind};
use serde::{Deserialize, Serialize};

use crate::SendError;

/// A ruin within vision, with whatever stands on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuinSighting {
    pub cell: Cell,
    pub occupant: Option<(Side, TowerKind)>,
}

impl RuinSighting {
    pub fn structure(&self) -> Structure {
        match self.occupant {
            None => Structure::Ruin,
            Some((side, kind)) => Structure::Tower { side, kind },
        }
    }
}

/// One visible map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainSample {
    pub cell: Cell,
    pub wall: bool,
    pub ruin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllyInfo {
    pub id: AgentId,
    pub cell: Cell,
    pub role: Role,
}

/// A message received last round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: AgentId,
    pub bytes: u32,
}

/// What the protocol may ask of the runtime hosting one agent.
///
/// Every query may cost compute; callers consult [`budget_left`](WorldView::budget_left)
/// before starting optional work.
pub trait WorldView {
    fn id(&self) -> AgentId;
    fn team(&self) -> Side;
    fn role(&self) -> Role;
    fn location(&self) -> Cell;
    fn map_size(&self) -> MapSize;
    fn round(&self) -> u32;
    /// Compute units left this tick.
    fn budget_left(&self) -> u32;

    fn nearby_ruins(&self) -> Vec<RuinSighting>;
    fn nearby_terrain(&self) -> Vec<TerrainSample>;
    /// `None` when `cell` is off the map or not visible.
    fn sense_cell(&self, cell: Cell) -> Option<TerrainSample>;
    fn nearby_allies(&self) -> Vec<AllyInfo>;
    fn can_send(&self, cell: Cell) -> bool;
}

/// Effects: messaging and randomness.
pub trait WorldMut: WorldView {
    /// Sends to the agent standing on `to`.
    fn send(&mut self, to: Cell, message: u32) -> Result<(), SendError>;
    /// Sends to every teammate.
    fn broadcast(&mut self, message: u32) -> Result<(), SendError>;
    /// Messages delivered to this agent during the previous round.
    fn read_messages(&mut self) -> Vec<Message>;
    fn rand_u32(&mut self) -> u32;
}
