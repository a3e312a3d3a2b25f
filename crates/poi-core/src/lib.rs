//! Per-agent points-of-interest knowledge and the gossip protocol that converges it.
//!
//! Each agent owns a [`PoiState`]: a deduplicated registry of map structures, a three-way
//! symmetry hypothesis narrowed from observed terrain, and a scheduler that spends a limited
//! message quota and compute budget spreading both to teammates. The host runtime is reached
//! only through the [`WorldView`]/[`WorldMut`] capability traits.

#![forbid(unsafe_code)]

pub mod bitboard;
pub mod config;
pub mod error;
pub mod footprint;
pub mod gossip;
pub mod overlay;
pub mod queries;
pub mod recipients;
pub mod registry;
pub mod relay;
pub mod rng;
pub mod state;
pub mod symmetry;
pub mod world;

pub use bitboard::{BitBoard, TerrainBoards};
pub use config::ProtocolConfig;
pub use error::{CoreError, SendError};
pub use footprint::VisionFootprint;
pub use gossip::{GossipScheduler, IngestStats, SendStats};
pub use overlay::{overlay_lines, OverlayKind, OverlayLine};
pub use recipients::RecipientSet;
pub use registry::{FactRef, FactStore, Observation, SymmetryRecord, TowerCounts, TowerRecord};
pub use relay::RelayLimiter;
pub use rng::{scale_below, shuffle};
pub use state::{Phase, PoiState, TickReport};
pub use symmetry::SymmetryEngine;
pub use world::{AllyInfo, Message, RuinSighting, TerrainSample, WorldMut, WorldView};
