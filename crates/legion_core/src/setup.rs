//! The opening position of a standard battle.

use std::f64::consts::PI;

use glam::DVec3;

use crate::components::{Allegiance, BannerTower, Dragonfly, King, Soldier, Unit};
use crate::config::BattleConfig;
use crate::deployment::formation;
use crate::simulation::Battle;
use crate::store::Ref;

/// Tower sites on the Azuki half; Edamame mirrors them across `z = 0`.
const TOWER_SITES: [(f64, f64); 7] = [
    (-50.0, 100.0),
    (50.0, 100.0),
    (400.0, 400.0),
    (-400.0, 400.0),
    (0.0, 1000.0),
    (700.0, 1600.0),
    (-700.0, 1600.0),
];

/// Ranks and files of a starting legion.
const LEGION_SIZE: (usize, usize) = (10, 10);

impl Battle {
    /// The standard opening: both kings, a dragonfly beside the Azuki
    /// king, one storming legion per side, and seven towers per side.
    #[must_use]
    pub fn default_battle(config: BattleConfig) -> Self {
        let king_health = config.health.king;
        let mut battle = Self::new(
            config,
            King::new(DVec3::new(0.0, 0.0, 20.0), 0.0, king_health),
            King::new(DVec3::new(0.0, 0.0, -100.0), PI, king_health),
        );

        battle.add_dragonfly(Dragonfly::resting(DVec3::new(0.0, 2.5, 25.0), 0.0));

        battle.add_legion(Allegiance::Azuki, DVec3::new(-50.0, 0.0, 70.0), 0.0);
        battle.add_legion(Allegiance::Edamame, DVec3::new(50.0, 0.0, -70.0), PI);

        for (allegiance, side) in [(Allegiance::Azuki, 1.0), (Allegiance::Edamame, -1.0)] {
            for (x, z) in TOWER_SITES {
                battle.add_tower(BannerTower::new(DVec3::new(x, 0.0, side * z), allegiance));
            }
        }
        battle
    }

    /// Add a storming legion whose first rank starts at `start`.
    fn add_legion(&mut self, allegiance: Allegiance, start: DVec3, yaw: f64) -> Ref {
        let forward = DVec3::new(yaw.sin(), 0.0, yaw.cos());
        let rules = self.config.deployment;
        let unit_id = self.add_unit(Unit::new(allegiance, forward));

        let layout = formation(
            start,
            forward,
            LEGION_SIZE,
            (rules.rank_gap, rules.file_gap),
            self.config.health.soldier,
        );
        for planned in layout {
            let soldier = self.entities.add(Soldier::new(planned.position, yaw, planned.health));
            self.entities.unit_mut(unit_id).soldier_ids.push(soldier);
        }
        unit_id
    }
}
