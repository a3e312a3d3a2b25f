//! Headless multi-agent simulator for the points-of-interest gossip protocol.
//!
//! Plays the host runtime for every agent: generates an exactly symmetric map, meters compute
//! per capability call, delivers messages one round late and wanders robots around so the
//! protocol has something to discover.

#![forbid(unsafe_code)]

pub mod config;
pub mod map;
pub mod sim;
pub mod world;

pub use config::{BudgetConfig, SimConfig};
pub use map::SimMap;
pub use sim::{MessageStats, SimReport, Simulation, TeamReport};
pub use world::{AgentInfo, AgentView, Outgoing, TickLimits};
