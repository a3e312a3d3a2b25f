//! Protocol tuning knobs.

use poi_protocol::MessageBuilder;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Per-agent protocol configuration.
///
/// Budget floors are in the runtime's compute units: a phase stops starting new work once
/// `budget_left()` drops below its floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Registry capacity (distinct structures the map may hold).
    pub max_facts: usize,
    /// Side length of the coarse block used to deduplicate structures.
    pub block_size: u8,
    /// Rounds a node waits between relay broadcasts.
    pub relay_cooldown_rounds: u32,
    /// Messages an infrastructure node may emit per tick.
    pub message_quota: u32,
    /// Units, self-announcement included, gathered before a relay broadcast goes out (1 or 2).
    pub relay_buffer_units: usize,
    /// Squared radius of the local visibility footprint.
    pub vision_radius_squared: u32,
    /// Stop reading inbound messages below this budget.
    pub ingest_budget_floor: u32,
    /// Stop infrastructure dissemination below this budget.
    pub tower_send_budget_floor: u32,
    /// Stop mobile dissemination below this budget.
    pub mobile_send_budget_floor: u32,
    /// Towers put their own fact in the relay buffer once per cooldown window.
    pub announce_self: bool,
    /// Mobile agents send first-hand tower changes before other unknown facts.
    pub prioritize_critical_towers: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_facts: 144,
            block_size: 5,
            relay_cooldown_rounds: 100,
            message_quota: 20,
            relay_buffer_units: 2,
            vision_radius_squared: 20,
            ingest_budget_floor: 10_000,
            tower_send_budget_floor: 3_000,
            mobile_send_budget_floor: 2_000,
            announce_self: true,
            prioritize_critical_towers: true,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_facts == 0 {
            return Err(CoreError::InvalidConfig("max_facts must be > 0".into()));
        }
        if self.block_size == 0 {
            return Err(CoreError::InvalidConfig("block_size must be > 0".into()));
        }
        if self.message_quota == 0 {
            return Err(CoreError::InvalidConfig("message_quota must be > 0".into()));
        }
        if !(1..=MessageBuilder::CAPACITY).contains(&self.relay_buffer_units) {
            return Err(CoreError::InvalidConfig(format!(
                "relay_buffer_units must be within 1..={}",
                MessageBuilder::CAPACITY
            )));
        }
        // A footprint wider than a 64-bit row cannot be represented.
        if self.vision_radius_squared > 31 * 31 {
            return Err(CoreError::InvalidConfig(format!(
                "vision_radius_squared {} exceeds the bitboard width",
                self.vision_radius_squared
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ProtocolConfig::default().validate().is_ok());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: ProtocolConfig =
            serde_json::from_str(r#"{ "relay_cooldown_rounds": 50 }"#).unwrap();
        assert_eq!(config.relay_cooldown_rounds, 50);
        assert_eq!(config.max_facts, 144);
        assert_eq!(config.block_size, 5);
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let config = ProtocolConfig {
            block_size: 0,
            ..ProtocolConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
    }
}
