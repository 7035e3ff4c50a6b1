//! Melee combat: target acquisition, stab damage and the king's slash.
//!
//! Damage timing is decided by the animation clocks in
//! [`animation`](crate::animation); this module only decides who gets hit
//! and for how much.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::components::Allegiance;
use crate::math::{facing_yaw, normalize_angle};
use crate::simulation::{Battle, TickContext};
use crate::store::Ref;

/// One landed hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Soldier or king that struck.
    pub attacker: Ref,
    /// Soldier or king that was struck.
    pub target: Ref,
    /// Health removed.
    pub amount: f64,
}

impl Battle {
    /// Nearest living enemy of `allegiance` within spear range of `position`.
    ///
    /// Scans the soldiers of every non-preview unit of the other faction plus
    /// the other faction's king. Ties keep the first candidate found, in
    /// active-unit order with the king last.
    #[must_use]
    pub fn nearest_enemy(&self, allegiance: Allegiance, position: DVec3) -> Option<Ref> {
        let mut nearest = None;
        let mut nearest_distance_squared = f64::INFINITY;

        for &unit_id in &self.active_unit_ids {
            let unit = self.entities.unit(unit_id);
            if unit.allegiance == allegiance || unit.is_preview {
                continue;
            }
            for &enemy_id in &unit.soldier_ids {
                let enemy = self.entities.soldier(enemy_id);
                if !enemy.is_alive() {
                    continue;
                }
                let distance_squared = position.distance_squared(enemy.position);
                if distance_squared < nearest_distance_squared {
                    nearest = Some(enemy_id);
                    nearest_distance_squared = distance_squared;
                }
            }
        }

        let king_id = self.king_id(allegiance.opponent());
        let king = self.entities.soldier(king_id);
        let distance_squared = position.distance_squared(king.position);
        if king.is_alive() && distance_squared < nearest_distance_squared {
            nearest = Some(king_id);
            nearest_distance_squared = distance_squared;
        }

        if nearest_distance_squared > self.config.combat.spear_attack_range_squared {
            return None;
        }
        nearest
    }

    /// Drop the soldier's target if it has died or, when `leash_squared` is
    /// given, moved out of that squared distance.
    pub(crate) fn release_target(&mut self, soldier_id: Ref, leash_squared: Option<f64>) {
        let soldier = self.entities.soldier(soldier_id);
        let Some(target_id) = soldier.attack_target else {
            return;
        };
        let target = self.entities.soldier(target_id);
        let out_of_reach = leash_squared
            .is_some_and(|leash| soldier.position.distance_squared(target.position) > leash);
        if !target.is_alive() || out_of_reach {
            self.entities.soldier_mut(soldier_id).attack_target = None;
        }
    }

    /// Engage the nearest enemy in range if the soldier has no target yet.
    ///
    /// Returns the soldier's target afterwards.
    pub(crate) fn engage_nearest_enemy(
        &mut self,
        soldier_id: Ref,
        allegiance: Allegiance,
    ) -> Option<Ref> {
        let soldier = self.entities.soldier(soldier_id);
        if soldier.attack_target.is_some() {
            return soldier.attack_target;
        }
        let nearest = self.nearest_enemy(allegiance, soldier.position);
        self.entities.soldier_mut(soldier_id).attack_target = nearest;
        nearest
    }

    /// Yaw a soldier must hold to strike `target_id`.
    pub(crate) fn strike_yaw(&self, soldier_id: Ref, target_id: Ref) -> f64 {
        facing_yaw(
            self.soldier_position(soldier_id),
            self.soldier_position(target_id),
        ) + self.config.combat.target_yaw_offset
    }

    /// Land one stab.
    pub(crate) fn apply_stab(&mut self, attacker: Ref, target: Ref, ctx: &mut TickContext) {
        let amount = self.config.combat.stab_damage;
        self.entities.soldier_mut(target).health -= amount;
        trace!(%attacker, %target, amount, "Stab landed");
        ctx.events.damage.push(DamageEvent {
            attacker,
            target,
            amount,
        });
    }

    /// Land the slash of `allegiance`'s king on every enemy soldier inside
    /// the slash cone.
    pub(crate) fn apply_king_slash(&mut self, allegiance: Allegiance, ctx: &mut TickContext) {
        let king_id = self.king_id(allegiance);
        let king = self.entities.soldier(king_id);
        let (origin, yaw) = (king.position, king.orientation.yaw);
        let combat = self.config.combat;

        let mut victims = Vec::new();
        for &unit_id in &self.active_unit_ids {
            let unit = self.entities.unit(unit_id);
            if unit.allegiance == allegiance || unit.is_preview {
                continue;
            }
            for &soldier_id in &unit.soldier_ids {
                let position = self.soldier_position(soldier_id);
                let in_range = origin.distance_squared(position) <= combat.slash_range_squared;
                let off_axis = normalize_angle(yaw - facing_yaw(origin, position));
                if in_range && off_axis.abs() <= combat.slash_half_angle {
                    victims.push(soldier_id);
                }
            }
        }

        for target in victims {
            self.entities.soldier_mut(target).health -= combat.slash_damage;
            ctx.events.damage.push(DamageEvent {
                attacker: king_id,
                target,
                amount: combat.slash_damage,
            });
        }
    }
}
