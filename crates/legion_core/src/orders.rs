//! Unit orders: the per-tick behavior of every soldier in a unit.
//!
//! - **Advance** marches the whole unit in step until any soldier finds a
//!   target, then the whole unit fights.
//! - **Storm** decides per soldier, every tick, whether to march or fight.
//! - **Assemble** walks soldiers to their formation slots and hands the unit
//!   over to Storm once everyone stands ready.
//!
//! Advance and Storm share their target acquisition through
//! [`Battle::engage_nearest_enemy`] but deliberately keep two differences:
//! Advance gates acquisition on the whole unit being out of combat, and
//! Storm only lets the idle cooldown run (and stabs land) while the soldier
//! faces its target exactly. Both are kept as distinct gameplay until the
//! designers settle on one.

use std::f64::consts::PI;

use tracing::debug;

use crate::animation::{AttackClip, ClipTable, SoldierAnimationKind};
use crate::components::{SoldierExplosion, UnitOrder};
use crate::math::{limit_turn, step_forward, yaw_of};
use crate::simulation::{Battle, TickContext};
use crate::store::Ref;

impl Battle {
    /// Retire the dead, then run every active unit's order.
    pub(crate) fn tick_units(&mut self, ctx: &mut TickContext) {
        let unit_ids = self.active_unit_ids.clone();
        self.retire_dead_soldiers(&unit_ids, ctx);

        for unit_id in unit_ids {
            match self.entities.unit(unit_id).order {
                UnitOrder::Advance => self.tick_unit_with_advance(unit_id, ctx),
                UnitOrder::Storm => self.tick_unit_with_storm(unit_id, ctx),
                UnitOrder::Assemble => self.tick_unit_with_assemble(unit_id, ctx),
            }
        }
    }

    /// Splice dead soldiers out of their units, leaving an explosion and a
    /// spear for the other side.
    fn retire_dead_soldiers(&mut self, unit_ids: &[Ref], ctx: &mut TickContext) {
        for &unit_id in unit_ids {
            let unit = self.entities.unit_mut(unit_id);
            let allegiance = unit.allegiance;
            let soldier_ids = std::mem::take(&mut unit.soldier_ids);

            let mut living = Vec::with_capacity(soldier_ids.len());
            for soldier_id in soldier_ids {
                let soldier = self.entities.soldier(soldier_id);
                if soldier.is_alive() {
                    living.push(soldier_id);
                    continue;
                }
                let explosion = SoldierExplosion::at(allegiance, soldier);
                self.start_explosion(explosion, ctx);
                self.hand_mut(allegiance.opponent()).spear_count += 1;
                ctx.events.retired_soldiers.push(soldier_id);
            }

            self.entities.unit_mut(unit_id).soldier_ids = living;
        }
    }

    fn spear_clips(&self) -> (ClipTable, AttackClip) {
        let clips = ClipTable::spear(&self.config.clips);
        (clips, clips.attack(SoldierAnimationKind::Stab))
    }

    /// Disciplined march that breaks into melee as a whole.
    pub(crate) fn tick_unit_with_advance(&mut self, unit_id: Ref, ctx: &mut TickContext) {
        let unit = self.entities.unit(unit_id);
        let (allegiance, forward_yaw) = (unit.allegiance, unit.forward_yaw());
        let soldier_ids = unit.soldier_ids.clone();

        let was_any_soldier_fighting = soldier_ids
            .iter()
            .any(|&id| self.entities.soldier(id).attack_target.is_some());

        if !was_any_soldier_fighting {
            for &soldier_id in &soldier_ids {
                if self.engage_nearest_enemy(soldier_id, allegiance).is_none() {
                    self.march_in_step(soldier_id, forward_yaw, ctx.dt);
                }
            }
            return;
        }

        let (clips, stab) = self.spear_clips();
        let combat = self.config.combat;
        for &soldier_id in &soldier_ids {
            self.release_target(soldier_id, None);
            let target = self.engage_nearest_enemy(soldier_id, allegiance);

            self.entities
                .soldier_mut(soldier_id)
                .animation
                .stop_walking_and_start_stab(ctx.dt, clips.walk_duration, || {
                    ctx.stab_pre_roll(combat.max_stab_delay_seconds)
                });

            let Some(target) = target else {
                continue;
            };
            let desired = self.strike_yaw(soldier_id, target);
            let soldier = self.entities.soldier_mut(soldier_id);
            soldier.orientation.yaw = limit_turn(
                soldier.orientation.yaw,
                desired,
                ctx.dt * combat.turn_speed_rad_per_sec,
            );

            let lands = match soldier.animation.kind {
                SoldierAnimationKind::Stab => soldier.animation.continue_stab_then_idle(
                    ctx.dt,
                    stab,
                    combat.stab_time_scale,
                ),
                SoldierAnimationKind::Idle => soldier.animation.continue_idle_then_stab(
                    ctx.dt,
                    stab,
                    combat.stab_cooldown_seconds,
                    combat.stab_time_scale,
                    || ctx.stab_pre_roll(combat.max_stab_delay_seconds),
                ),
                SoldierAnimationKind::Walk | SoldierAnimationKind::Slash => false,
            };
            if lands {
                self.apply_stab(soldier_id, target, ctx);
            }
        }
    }

    /// Per-soldier skirmishing.
    pub(crate) fn tick_unit_with_storm(&mut self, unit_id: Ref, ctx: &mut TickContext) {
        let unit = self.entities.unit(unit_id);
        let (allegiance, forward_yaw) = (unit.allegiance, unit.forward_yaw());
        let soldier_ids = unit.soldier_ids.clone();
        let (_, stab) = self.spear_clips();
        let combat = self.config.combat;

        for soldier_id in soldier_ids {
            self.release_target(soldier_id, Some(combat.spear_attack_range_squared));

            if let Some(target) = self.engage_nearest_enemy(soldier_id, allegiance) {
                self.storm_target(soldier_id, target, ctx);
                continue;
            }

            let animation = &mut self.entities.soldier_mut(soldier_id).animation;
            match animation.kind {
                SoldierAnimationKind::Stab => {
                    // Finish the swing into thin air.
                    animation.continue_stab_then_idle(ctx.dt, stab, combat.stab_time_scale);
                }
                SoldierAnimationKind::Idle | SoldierAnimationKind::Walk => {
                    self.march_in_step(soldier_id, forward_yaw, ctx.dt);
                }
                SoldierAnimationKind::Slash => {}
            }
        }
    }

    fn storm_target(&mut self, soldier_id: Ref, target: Ref, ctx: &mut TickContext) {
        let (clips, stab) = self.spear_clips();
        let combat = self.config.combat;
        let desired = self.strike_yaw(soldier_id, target);

        let soldier = self.entities.soldier_mut(soldier_id);
        soldier
            .animation
            .stop_walking_and_start_stab(ctx.dt, clips.walk_duration, || {
                ctx.stab_pre_roll(combat.max_stab_delay_seconds)
            });
        soldier.orientation.yaw = limit_turn(
            soldier.orientation.yaw,
            desired,
            ctx.dt * combat.turn_speed_rad_per_sec,
        );
        let is_facing_target = soldier.orientation.yaw == desired;

        let mut lands = false;
        // The cooldown only runs while facing the target.
        if soldier.animation.kind == SoldierAnimationKind::Idle && is_facing_target {
            lands |= soldier.animation.continue_idle_then_stab(
                ctx.dt,
                stab,
                combat.stab_cooldown_seconds,
                combat.stab_time_scale,
                || ctx.stab_pre_roll(combat.max_stab_delay_seconds),
            );
        }
        // A swing always plays out but only connects while facing the target.
        if soldier.animation.kind == SoldierAnimationKind::Stab {
            let crosses =
                soldier
                    .animation
                    .continue_stab_then_idle(ctx.dt, stab, combat.stab_time_scale);
            lands |= crosses && is_facing_target;
        }

        if lands {
            self.apply_stab(soldier_id, target, ctx);
        }
    }

    /// Turn toward the unit's axis; walk only once exactly aligned.
    fn march_in_step(&mut self, soldier_id: Ref, forward_yaw: f64, dt: f64) {
        let walk_duration = ClipTable::spear(&self.config.clips).walk_duration;
        let turn_rate = self.config.combat.turn_speed_rad_per_sec;
        let walk_speed = self.config.movement.soldier_walk_speed;

        let soldier = self.entities.soldier_mut(soldier_id);
        soldier.orientation.yaw = limit_turn(soldier.orientation.yaw, forward_yaw, dt * turn_rate);
        if soldier.orientation.yaw == forward_yaw {
            soldier
                .animation
                .start_or_continue(SoldierAnimationKind::Walk, walk_duration, dt);
            step_forward(&mut soldier.position, soldier.orientation, walk_speed * dt);
        }
    }

    /// Re-forming at assembly points; becomes Storm when done.
    pub(crate) fn tick_unit_with_assemble(&mut self, unit_id: Ref, ctx: &mut TickContext) {
        let unit = self.entities.unit(unit_id);
        let forward_yaw = unit.forward_yaw();
        let soldier_ids = unit.soldier_ids.clone();

        let mut is_still_assembling = false;
        for soldier_id in soldier_ids {
            let is_ready = self.assemble_soldier(soldier_id, forward_yaw, ctx.dt);
            if self.entities.soldier(soldier_id).is_alive() && !is_ready {
                is_still_assembling = true;
            }
        }

        let unit = self.entities.unit_mut(unit_id);
        if !unit.are_soldiers_still_being_added && !is_still_assembling {
            unit.order = UnitOrder::Storm;
            debug!(unit = %unit_id, "Unit assembled, storming");
            ctx.events.assembled_units.push(unit_id);
        }
    }

    /// Move one soldier toward its slot. Returns whether it stands ready.
    fn assemble_soldier(&mut self, soldier_id: Ref, forward_yaw: f64, dt: f64) -> bool {
        let walk_duration = ClipTable::spear(&self.config.clips).walk_duration;
        let turn = dt * self.config.combat.turn_speed_rad_per_sec;
        let movement = self.config.movement;
        let hurried = movement.assembling_speedup_factor * dt;

        let soldier = self.entities.soldier_mut(soldier_id);
        let offset = soldier.assembly_point - soldier.position;

        if offset.length_squared() < movement.assembly_tolerance_squared {
            soldier.orientation.yaw = limit_turn(soldier.orientation.yaw, forward_yaw, turn);
            soldier.animation.stop_walking(hurried, walk_duration);
            return soldier.animation.kind == SoldierAnimationKind::Idle
                && soldier.orientation.yaw == forward_yaw;
        }

        let desired = yaw_of(offset) + PI;
        soldier.orientation.yaw = limit_turn(soldier.orientation.yaw, desired, turn);
        soldier
            .animation
            .start_or_continue(SoldierAnimationKind::Walk, walk_duration, hurried);
        step_forward(
            &mut soldier.position,
            soldier.orientation,
            movement.soldier_walk_speed * hurried,
        );
        false
    }
}
