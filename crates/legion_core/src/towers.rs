//! Banner towers: territory capture and the reinforcement drip.

use glam::DVec3;
use tracing::debug;

use crate::components::{Allegiance, BannerTower, Soldier};
use crate::config::TowerConfig;
use crate::simulation::{Battle, TickContext, TowerCapture};
use crate::store::Ref;

/// Who holds a tower's territory this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    /// No soldier stands inside.
    Unoccupied,
    /// Soldiers of exactly one faction stand inside.
    Unique(Allegiance),
    /// Both factions stand inside; nobody captures.
    Contested,
}

impl Occupancy {
    fn with(self, allegiance: Allegiance) -> Self {
        match self {
            Self::Unoccupied => Self::Unique(allegiance),
            Self::Unique(current) if current == allegiance => self,
            Self::Unique(_) | Self::Contested => Self::Contested,
        }
    }
}

impl BannerTower {
    /// Whether `point` stands inside the square ground territory.
    #[must_use]
    pub fn territory_contains(&self, point: DVec3, rules: &TowerConfig) -> bool {
        let local = point - self.position;
        point.y < rules.territory_max_height
            && local.x.abs() <= rules.territory_half_extent
            && local.z.abs() <= rules.territory_half_extent
    }
}

impl Battle {
    /// Occupancy of a tower's territory by the living soldiers of
    /// non-preview units.
    ///
    /// # Panics
    ///
    /// Panics if `tower_id` does not name a tower.
    #[must_use]
    pub fn tower_occupancy(&self, tower_id: Ref) -> Occupancy {
        let tower = self.entities.tower(tower_id);
        let rules = &self.config.towers;
        let mut occupancy = Occupancy::Unoccupied;

        for &unit_id in &self.active_unit_ids {
            let unit = self.entities.unit(unit_id);
            if unit.is_preview || occupancy == Occupancy::Unique(unit.allegiance) {
                continue;
            }
            let inside = unit.soldier_ids.iter().any(|&id| {
                let soldier = self.entities.soldier(id);
                soldier.is_alive() && tower.territory_contains(soldier.position, rules)
            });
            if inside {
                occupancy = occupancy.with(unit.allegiance);
            }
            if occupancy == Occupancy::Contested {
                break;
            }
        }
        occupancy
    }

    pub(crate) fn tick_banner_towers(&mut self, ctx: &mut TickContext) {
        let tower_ids = self.active_tower_ids.clone();
        for tower_id in tower_ids {
            if self.entities.tower(tower_id).is_preview {
                continue;
            }
            self.capture_if_occupied(tower_id, ctx);
            self.reinforce(tower_id, ctx);
        }
    }

    fn capture_if_occupied(&mut self, tower_id: Ref, ctx: &mut TickContext) {
        let Occupancy::Unique(occupier) = self.tower_occupancy(tower_id) else {
            return;
        };
        let tower = self.entities.tower_mut(tower_id);
        if tower.allegiance == occupier {
            return;
        }
        let from = tower.allegiance;
        tower.allegiance = occupier;
        debug!(tower = %tower_id, ?from, to = ?occupier, "Tower captured");
        ctx.events.tower_captures.push(TowerCapture {
            tower: tower_id,
            from,
            to: occupier,
        });
    }

    /// Deploy the next planned soldier once the cooldown runs out.
    fn reinforce(&mut self, tower_id: Ref, ctx: &mut TickContext) {
        let delay = self.config.towers.soldier_deployment_delay_seconds;
        let tower = self.entities.tower_mut(tower_id);
        tower.seconds_until_next_soldier -= ctx.dt;
        if tower.seconds_until_next_soldier > 0.0 {
            return;
        }
        let Some(pending) = tower.pending_units.front_mut() else {
            return;
        };
        let unit_id = pending.unit_id;
        let planned = pending.soldiers.pop_front();
        let roster_exhausted = pending.soldiers.is_empty();
        if roster_exhausted {
            tower.pending_units.pop_front();
        }
        tower.seconds_until_next_soldier = delay;
        let origin = tower.position;

        if let Some(planned) = planned {
            let soldier = Soldier {
                assembly_point: planned.assembly_point,
                ..Soldier::new(origin, planned.yaw, planned.health)
            };
            let soldier_id = self.entities.add(soldier);
            self.entities.unit_mut(unit_id).soldier_ids.push(soldier_id);
            debug!(tower = %tower_id, unit = %unit_id, soldier = %soldier_id, "Soldier deployed");
            ctx.events.spawned_soldiers.push(soldier_id);
        }
        if roster_exhausted {
            self.entities.unit_mut(unit_id).are_soldiers_still_being_added = false;
        }
    }
}
