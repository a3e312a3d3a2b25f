use serde::{Deserialize, Serialize};

/// Runtime identifier of an agent (robot or tower), as reported by the message channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u32);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a fact came from.
///
/// `Local` facts were observed first-hand by this agent; they reset the recipient set to
/// empty and are flagged critical so they are pushed out first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Local,
    Peer(AgentId),
}

impl Source {
    pub fn peer(self) -> Option<AgentId> {
        match self {
            Source::Local => None,
            Source::Peer(id) => Some(id),
        }
    }

    pub fn is_local(self) -> bool {
        matches!(self, Source::Local)
    }
}

/// One of the two playing sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    #[inline]
    pub const fn ordinal(self) -> u16 {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    pub const fn opponent(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// Owner of a structure as seen on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Neutral,
    Side(Side),
}

impl From<Side> for Team {
    fn from(side: Side) -> Self {
        Team::Side(side)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TowerKind {
    Paint,
    Money,
    Defense,
}

impl TowerKind {
    pub const ALL: [TowerKind; 3] = [TowerKind::Paint, TowerKind::Money, TowerKind::Defense];

    #[inline]
    pub const fn index(self) -> u16 {
        match self {
            TowerKind::Paint => 0,
            TowerKind::Money => 1,
            TowerKind::Defense => 2,
        }
    }
}

/// What occupies a structure cell.
///
/// A neutral ruin has no kind; comparing two ruins never looks at one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Structure {
    Ruin,
    Tower { side: Side, kind: TowerKind },
}

impl Structure {
    /// Builds a structure from an (owner, kind) pair, dropping the kind for neutral owners.
    pub fn new(owner: Team, kind: TowerKind) -> Self {
        match owner {
            Team::Neutral => Structure::Ruin,
            Team::Side(side) => Structure::Tower { side, kind },
        }
    }

    pub fn owner(self) -> Team {
        match self {
            Structure::Ruin => Team::Neutral,
            Structure::Tower { side, .. } => Team::Side(side),
        }
    }

    pub fn kind(self) -> Option<TowerKind> {
        match self {
            Structure::Ruin => None,
            Structure::Tower { kind, .. } => Some(kind),
        }
    }

    pub fn is_owned_by(self, side: Side) -> bool {
        self.owner() == Team::Side(side)
    }
}

/// Behavioural role of an agent in the gossip network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Stationary tower: gossip hub and relay.
    Infrastructure,
    /// Moving robot: discovers facts and ferries them between towers.
    Mobile,
}

impl Role {
    pub fn is_infrastructure(self) -> bool {
        matches!(self, Role::Infrastructure)
    }
}
