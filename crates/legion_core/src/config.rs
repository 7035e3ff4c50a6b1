//! Tunable battle rules.
//!
//! Every constant the simulation uses lives in [`BattleConfig`], grouped by
//! the subsystem that reads it. `Default` reproduces the shipped game rules;
//! scenarios may override any field from RON.
//!
//! # Example RON
//!
//! ```ron
//! BattleConfig(
//!     seed: 7,
//!     combat: (stab_damage: 45.0),
//! )
//! ```
//!
//! Omitted fields and groups fall back to their defaults.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// All rules for one battle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Base seed for stab pre-roll jitter.
    pub seed: u64,
    /// Simulated milliseconds per tick.
    pub millis_per_tick: u32,
    /// Melee rules.
    pub combat: CombatConfig,
    /// Ground movement rules.
    pub movement: MovementConfig,
    /// Starting health.
    pub health: HealthConfig,
    /// Dragonfly flight rules.
    pub flight: FlightConfig,
    /// Banner tower rules.
    pub towers: TowerConfig,
    /// Deployment staging rules.
    pub deployment: DeploymentConfig,
    /// Clip durations and frame counts from the asset pipeline.
    pub clips: ModelConstants,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            millis_per_tick: 10,
            combat: CombatConfig::default(),
            movement: MovementConfig::default(),
            health: HealthConfig::default(),
            flight: FlightConfig::default(),
            towers: TowerConfig::default(),
            deployment: DeploymentConfig::default(),
            clips: ModelConstants::default(),
        }
    }
}

impl BattleConfig {
    /// Parse a config from RON text.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| SimError::ConfigParse(e.to_string()))
    }

    /// Length of one tick in seconds.
    #[must_use]
    pub fn tick_seconds(&self) -> f64 {
        f64::from(self.millis_per_tick) / 1000.0
    }
}

/// Melee combat rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Maximum turn rate for soldiers.
    pub turn_speed_rad_per_sec: f64,
    /// Squared reach of a spear.
    pub spear_attack_range_squared: f64,
    /// Damage per landed stab.
    pub stab_damage: f64,
    /// Idle time between stabs.
    pub stab_cooldown_seconds: f64,
    /// Playback speed of the stab clip.
    pub stab_time_scale: f64,
    /// Upper bound of the random pre-roll before a stab starts.
    pub max_stab_delay_seconds: f64,
    /// Damage per enemy caught by a king slash.
    pub slash_damage: f64,
    /// Squared reach of a king slash.
    pub slash_range_squared: f64,
    /// Half-angle of the slash cone.
    pub slash_half_angle: f64,
    /// Extra yaw added when a soldier faces its target.
    pub target_yaw_offset: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            turn_speed_rad_per_sec: PI * 0.5,
            spear_attack_range_squared: 8.0 * 8.0,
            stab_damage: 60.0,
            stab_cooldown_seconds: 1.0,
            stab_time_scale: 2.0,
            max_stab_delay_seconds: 1.0,
            slash_damage: 40.0,
            slash_range_squared: 6.0 * 6.0,
            slash_half_angle: PI * 0.2,
            target_yaw_offset: 0.05,
        }
    }
}

/// Ground movement rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Marching speed of a soldier.
    pub soldier_walk_speed: f64,
    /// Walking speed of a king on foot.
    pub king_walk_speed: f64,
    /// Time multiplier for soldiers moving to their assembly point.
    pub assembling_speedup_factor: f64,
    /// Squared distance at which a soldier counts as arrived.
    pub assembly_tolerance_squared: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            soldier_walk_speed: 1.5,
            king_walk_speed: 3.0,
            assembling_speedup_factor: 2.0,
            assembly_tolerance_squared: 0.1,
        }
    }
}

/// Starting health values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Health of a freshly deployed soldier.
    pub soldier: f64,
    /// Health of a king at battle start.
    pub king: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            soldier: 100.0,
            king: 100.0,
        }
    }
}

/// Dragonfly flight rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Speed right after mounting; throttle never goes below this.
    pub min_speed: f64,
    /// Throttle ceiling.
    pub max_speed: f64,
    /// Throttle-up rate.
    pub acceleration: f64,
    /// Throttle-down rate.
    pub deceleration: f64,
    /// Fastest speed at which landing may begin.
    pub max_landing_speed: f64,
    /// Altitude below which landing may begin.
    pub landing_altitude: f64,
    /// Altitude floor while landing; the rest check uses `<=` against it.
    pub rest_altitude: f64,
    /// Speed below which a landed dragonfly counts down to rest.
    pub rest_speed: f64,
    /// Countdown after touchdown before the dragonfly rests.
    pub dismount_seconds: f64,
    /// Squared reach for mounting a resting dragonfly.
    pub mount_range_squared: f64,
    /// Pitch recovery rate while landing.
    pub landing_pitch_rate: f64,
    /// Roll recovery rate while landing.
    pub landing_roll_rate: f64,
    /// Per-second speed multiplier once level while landing.
    pub landing_speed_decay: f64,
    /// Per-second altitude multiplier once level while landing.
    pub landing_altitude_decay: f64,
    /// Playback speed of the fly clip.
    pub fly_clip_time_scale: f64,
    /// Yaw rate gained per radian of roll.
    pub yaw_per_roll: f64,
    /// How far ahead of the dragonfly's origin the rider sits.
    pub rider_offset: f64,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            min_speed: 5.0,
            max_speed: 50.0,
            acceleration: 10.0,
            deceleration: 30.0,
            max_landing_speed: 30.0,
            landing_altitude: 10.0,
            rest_altitude: 2.5,
            rest_speed: 5.0,
            dismount_seconds: 1.5,
            mount_range_squared: 5.0 * 5.0,
            landing_pitch_rate: 0.5 * PI,
            landing_roll_rate: 0.2 * PI,
            landing_speed_decay: 0.6,
            landing_altitude_decay: 0.7,
            fly_clip_time_scale: 5.0,
            yaw_per_roll: 1.0,
            rider_offset: 0.3,
        }
    }
}

/// Banner tower rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerConfig {
    /// Half side length of the square territory.
    pub territory_half_extent: f64,
    /// Soldiers at or above this height do not occupy territory.
    pub territory_max_height: f64,
    /// Half side length of the collision hitbox.
    pub hitbox_half_extent: f64,
    /// Height of the collision hitbox.
    pub hitbox_height: f64,
    /// Half width of the central gaps carved from the hitbox.
    pub gap_half_extent: f64,
    /// Height of the central gaps.
    pub gap_height: f64,
    /// Seconds between reinforcements.
    pub soldier_deployment_delay_seconds: f64,
    /// Squared XZ distance a king may stray from a friendly tower.
    pub safezone_range_squared: f64,
    /// Health lost per second outside every friendly safezone.
    pub king_out_of_safezone_damage_per_second: f64,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            territory_half_extent: 10.0,
            territory_max_height: 1.0,
            hitbox_half_extent: 10.0,
            hitbox_height: 30.0,
            gap_half_extent: 5.0,
            gap_height: 15.0,
            soldier_deployment_delay_seconds: 1.0,
            safezone_range_squared: 150.0 * 150.0,
            king_out_of_safezone_damage_per_second: 5.0,
        }
    }
}

/// Deployment staging rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Spacing between soldiers along a rank.
    pub rank_gap: f64,
    /// Spacing between ranks.
    pub file_gap: f64,
    /// Drags shorter than this have no usable direction.
    pub min_drag_length: f64,
    /// Smallest staged patrol radius.
    pub min_patrol_radius: f64,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            rank_gap: 8.0,
            file_gap: 8.0 * (3.0_f64.sqrt() / 2.0),
            min_drag_length: 0.5,
            min_patrol_radius: 10.0,
        }
    }
}

/// Clip data handed over by the asset pipeline once models are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConstants {
    /// Spear walk cycle length.
    pub spear_walk_clip_duration: f64,
    /// Frames in the spear walk clip.
    pub spear_walk_frame_count: u32,
    /// Spear stab clip length.
    pub spear_stab_clip_duration: f64,
    /// Frames in the spear stab clip.
    pub spear_stab_frame_count: u32,
    /// Frame on which the spear connects.
    pub spear_stab_damage_frame: u32,
    /// King walk cycle length.
    pub king_walk_clip_duration: f64,
    /// King slash clip length.
    pub king_slash_clip_duration: f64,
    /// Frames in the king slash clip.
    pub king_slash_frame_count: u32,
    /// Frame on which the slash connects.
    pub king_slash_damage_frame: u32,
    /// Dragonfly wing-beat loop length.
    pub dragonfly_fly_clip_duration: f64,
    /// Length of the soldier explosion effect.
    pub soldier_explosion_clip_duration: f64,
}

impl Default for ModelConstants {
    fn default() -> Self {
        Self {
            spear_walk_clip_duration: 29.0 / 24.0,
            spear_walk_frame_count: 29,
            spear_stab_clip_duration: 1.0,
            spear_stab_frame_count: 24,
            spear_stab_damage_frame: 10,
            king_walk_clip_duration: 29.0 / 24.0,
            king_slash_clip_duration: 1.25,
            king_slash_frame_count: 30,
            king_slash_damage_frame: 18,
            dragonfly_fly_clip_duration: 1.0,
            soldier_explosion_clip_duration: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_seconds() {
        assert_eq!(BattleConfig::default().tick_seconds(), 0.01);
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config =
            BattleConfig::from_ron_str("(seed: 7, combat: (stab_damage: 45.0))").unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.combat.stab_damage, 45.0);
        assert_eq!(
            config.combat.spear_attack_range_squared,
            CombatConfig::default().spear_attack_range_squared
        );
        assert_eq!(config.flight, FlightConfig::default());
    }

    #[test]
    fn test_bad_ron_is_config_error() {
        let err = BattleConfig::from_ron_str("(seed: \"x\")").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));
    }
}
