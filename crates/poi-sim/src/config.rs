//! Simulation configuration, loaded from YAML.

use std::path::Path;

use anyhow::{bail, Context, Result};
use poi_core::ProtocolConfig;
use poi_protocol::{MapSize, Symmetry, MAX_COORD};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub width: u8,
    pub height: u8,
    /// Symmetry the generated map obeys exactly.
    pub symmetry: Symmetry,
    pub seed: u64,
    pub rounds: u32,

    /// Towers each side starts with.
    #[serde(default = "default_towers_per_team")]
    pub towers_per_team: usize,
    /// Mobile robots each side starts with.
    #[serde(default = "default_robots_per_team")]
    pub robots_per_team: usize,
    /// Neutral ruin pairs (each ruin plus its mirror image).
    #[serde(default = "default_ruin_pairs")]
    pub ruin_pairs: usize,
    /// Chance that a cell (and its mirror) is a wall.
    #[serde(default = "default_wall_density")]
    pub wall_density: f64,

    /// Squared distance over which a direct message can be sent.
    #[serde(default = "default_message_range_squared")]
    pub message_range_squared: u32,
    /// Direct messages a robot may send per tick.
    #[serde(default = "default_robot_message_quota")]
    pub robot_message_quota: u32,

    pub budget: BudgetConfig,
    pub protocol: ProtocolConfig,
}

/// Per-tick compute budgets and what each capability call costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub robot: u32,
    pub tower: u32,
    /// Cost of a bulk query, a send or a broadcast.
    pub call_cost: u32,
    /// Cost of sensing a single cell.
    pub sense_cell_cost: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            robot: 15_000,
            tower: 20_000,
            call_cost: 100,
            sense_cell_cost: 10,
        }
    }
}

fn default_towers_per_team() -> usize {
    3
}

fn default_robots_per_team() -> usize {
    12
}

fn default_ruin_pairs() -> usize {
    8
}

fn default_wall_density() -> f64 {
    0.08
}

fn default_message_range_squared() -> u32 {
    20
}

fn default_robot_message_quota() -> u32 {
    1
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 40,
            height: 40,
            symmetry: Symmetry::Rotational,
            seed: 42,
            rounds: 400,
            towers_per_team: default_towers_per_team(),
            robots_per_team: default_robots_per_team(),
            ruin_pairs: default_ruin_pairs(),
            wall_density: default_wall_density(),
            message_range_squared: default_message_range_squared(),
            robot_message_quota: default_robot_message_quota(),
            budget: BudgetConfig::default(),
            protocol: ProtocolConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    pub fn map_size(&self) -> MapSize {
        MapSize::new(self.width, self.height)
    }

    pub fn validate(&self) -> Result<()> {
        let max = MAX_COORD + 1;
        if !(8..=max).contains(&self.width) || !(8..=max).contains(&self.height) {
            bail!(
                "map must be between 8x8 and {max}x{max}, got {}x{}",
                self.width,
                self.height
            );
        }
        if !(0.0..0.5).contains(&self.wall_density) {
            bail!("wall_density must be in [0, 0.5), got {}", self.wall_density);
        }
        let structures = 2 * (self.towers_per_team + self.ruin_pairs);
        if structures > self.protocol.max_facts {
            bail!(
                "{structures} structures exceed the registry capacity of {}",
                self.protocol.max_facts
            );
        }
        if self.towers_per_team == 0 {
            bail!("each side needs at least one tower");
        }
        self.protocol.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "width: 30\nheight: 20\nsymmetry: horizontal\nprotocol:\n  relay_cooldown_rounds: 25\n"
        )
        .unwrap();

        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.map_size(), MapSize::new(30, 20));
        assert_eq!(config.symmetry, Symmetry::Horizontal);
        assert_eq!(config.protocol.relay_cooldown_rounds, 25);
        assert_eq!(config.protocol.max_facts, 144);
        assert_eq!(config.robots_per_team, 12);
        assert_eq!(config.budget, BudgetConfig::default());
    }

    #[test]
    fn oversized_maps_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "width: 80").unwrap();
        let err = SimConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("map must be between"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = SimConfig::load(Path::new("/nonexistent/poi.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/poi.yaml"));
    }

    #[test]
    fn too_many_structures_for_the_registry() {
        let config = SimConfig {
            ruin_pairs: 80,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
