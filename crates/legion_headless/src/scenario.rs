//! Scenario loading and execution.
//!
//! Scenarios define a battle's rules, its opening position, and a script of
//! held input, so a whole battle can be replayed from one RON file.

use std::path::Path;

use glam::DVec3;
use legion_core::components::{Allegiance, BannerTower, BattleOutcome, Dragonfly, King};
use legion_core::config::BattleConfig;
use legion_core::input::InputSnapshot;
use legion_core::math::facing_yaw;
use legion_core::simulation::Battle;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::protocol::EventSummary;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// Starting position of a scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Opening {
    /// Both kings, a dragonfly, two legions, and seven towers per side.
    #[default]
    Standard,
    /// Kings at the given positions plus the listed towers and dragonflies.
    Custom {
        /// Azuki king position.
        azuki_king: (f64, f64, f64),
        /// Edamame king position; it faces the Azuki side.
        edamame_king: (f64, f64, f64),
        /// Towers as `(x, z, owner)`.
        #[serde(default)]
        towers: Vec<(f64, f64, Allegiance)>,
        /// Resting dragonflies.
        #[serde(default)]
        dragonflies: Vec<(f64, f64, f64)>,
    },
}

/// Input held over a range of ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptedInput {
    /// First tick the input is held.
    pub from_tick: u64,
    /// Tick at which the input is released (exclusive).
    pub until_tick: u64,
    /// What is held.
    pub input: InputSnapshot,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Battle rules; omitted fields keep their defaults.
    pub config: BattleConfig,
    /// Starting position.
    pub opening: Opening,
    /// Held input; the first matching entry wins, gaps are idle.
    pub script: Vec<ScriptedInput>,
    /// Upper bound on ticks to run.
    pub max_ticks: u64,
    /// Stop as soon as a king falls.
    pub stop_on_outcome: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Standard Opening".to_string(),
            description: "Two legions meet between the kings".to_string(),
            config: BattleConfig::default(),
            opening: Opening::Standard,
            script: Vec::new(),
            max_ticks: 6000,
            stop_on_outcome: true,
        }
    }
}

/// What a scenario run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Ticks actually simulated.
    pub ticks: u64,
    /// Result when the run stopped.
    pub outcome: BattleOutcome,
    /// Final state hash.
    pub state_hash: u64,
    /// Event totals over the run.
    pub events: EventSummary,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Build the opening position.
    #[must_use]
    pub fn battle(&self) -> Battle {
        match &self.opening {
            Opening::Standard => Battle::default_battle(self.config),
            Opening::Custom {
                azuki_king,
                edamame_king,
                towers,
                dragonflies,
            } => {
                let health = self.config.health.king;
                let azuki = DVec3::from(*azuki_king);
                let edamame = DVec3::from(*edamame_king);
                let mut battle = Battle::new(
                    self.config,
                    King::new(azuki, facing_yaw(azuki, edamame), health),
                    King::new(edamame, facing_yaw(edamame, azuki), health),
                );
                for &(x, z, owner) in towers {
                    battle.add_tower(BannerTower::new(DVec3::new(x, 0.0, z), owner));
                }
                for &position in dragonflies {
                    battle.add_dragonfly(Dragonfly::resting(DVec3::from(position), 0.0));
                }
                battle
            }
        }
    }

    /// Input held during `tick`.
    #[must_use]
    pub fn input_at(&self, tick: u64) -> InputSnapshot {
        self.script
            .iter()
            .find(|entry| (entry.from_tick..entry.until_tick).contains(&tick))
            .map_or_else(InputSnapshot::default, |entry| entry.input)
    }

    /// Run the scenario from its opening.
    #[must_use]
    pub fn run(&self) -> ScenarioReport {
        let mut battle = self.battle();
        let mut events = EventSummary::default();

        info!(scenario = %self.name, max_ticks = self.max_ticks, "Running scenario");
        while battle.tick_count() < self.max_ticks {
            let input = self.input_at(battle.tick_count());
            events.absorb(&battle.tick(&input));
            if self.stop_on_outcome && battle.outcome() != BattleOutcome::Undecided {
                debug!(tick = battle.tick_count(), "Stopping on outcome");
                break;
            }
        }

        ScenarioReport {
            name: self.name.clone(),
            ticks: battle.tick_count(),
            outcome: battle.outcome(),
            state_hash: battle.state_hash(),
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legion_core::math::normalize_angle;

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert_eq!(scenario.opening, Opening::Standard);
        assert!(scenario.script.is_empty());
        let battle = scenario.battle();
        assert_eq!(battle.active_unit_ids().len(), 2);
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                config: (seed: 9, combat: (stab_damage: 45.0)),
                opening: Custom(
                    azuki_king: (0.0, 0.0, 0.0),
                    edamame_king: (0.0, 0.0, -50.0),
                    towers: [(0.0, 10.0, Azuki)],
                ),
                script: [
                    (from_tick: 5, until_tick: 10, input: (keys: (w: true))),
                ],
                max_ticks: 20,
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert_eq!(scenario.config.seed, 9);
        assert_eq!(scenario.config.combat.stab_damage, 45.0);
        assert!(scenario.stop_on_outcome);

        let battle = scenario.battle();
        assert_eq!(battle.active_tower_ids().len(), 1);
        assert!(battle.active_unit_ids().is_empty());
    }

    #[test]
    fn test_script_lookup() {
        let mut held = InputSnapshot::default();
        held.keys.t = true;
        let scenario = Scenario {
            script: vec![ScriptedInput {
                from_tick: 10,
                until_tick: 20,
                input: held,
            }],
            ..Scenario::default()
        };
        assert_eq!(scenario.input_at(9), InputSnapshot::default());
        assert_eq!(scenario.input_at(10), held);
        assert_eq!(scenario.input_at(19), held);
        assert_eq!(scenario.input_at(20), InputSnapshot::default());
    }

    #[test]
    fn test_custom_kings_face_each_other() {
        let scenario = Scenario {
            opening: Opening::Custom {
                azuki_king: (0.0, 0.0, 0.0),
                edamame_king: (0.0, 0.0, -50.0),
                towers: Vec::new(),
                dragonflies: Vec::new(),
            },
            ..Scenario::default()
        };
        let battle = scenario.battle();
        // Models face local −Z, so yaw 0 looks toward −Z.
        let azuki = battle.king(Allegiance::Azuki).soldier.orientation.yaw;
        let edamame = battle.king(Allegiance::Edamame).soldier.orientation.yaw;
        assert!(normalize_angle(azuki).abs() < 1e-9);
        assert!((normalize_angle(edamame).abs() - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_run_stops_at_max_ticks() {
        let scenario = Scenario {
            max_ticks: 50,
            ..Scenario::default()
        };
        let report = scenario.run();
        assert_eq!(report.ticks, 50);
        assert_eq!(report.outcome, BattleOutcome::Undecided);
        assert_eq!(report.state_hash, scenario.run().state_hash);
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }
}
