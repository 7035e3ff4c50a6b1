//! Kings: player control, riding, safezones and death.
//!
//! Only the Azuki king takes input. Both kings bleed health outside the
//! safezone of their own towers, and the first to fall decides the battle.

use tracing::{debug, info};

use crate::animation::{ClipTable, SoldierAnimation, SoldierAnimationKind};
use crate::components::{Allegiance, BattleOutcome, FlightState, SoldierExplosion};
use crate::input::InputSnapshot;
use crate::math::{step_forward, xz_distance_squared};
use crate::simulation::{Battle, TickContext};
use crate::store::Ref;

const PLAYER: Allegiance = Allegiance::Azuki;
const BOTH_SIDES: [Allegiance; 2] = [Allegiance::Azuki, Allegiance::Edamame];

impl Battle {
    pub(crate) fn tick_kings(&mut self, input: &InputSnapshot, ctx: &mut TickContext) {
        if self.king(PLAYER).soldier.is_alive() {
            self.control_player_king(input, ctx);
        }
        for allegiance in BOTH_SIDES {
            self.apply_safezone_attrition(allegiance, ctx.dt);
        }
        for allegiance in BOTH_SIDES {
            self.explode_fallen_king(allegiance, ctx);
        }
    }

    fn control_player_king(&mut self, input: &InputSnapshot, ctx: &mut TickContext) {
        let king_id = self.king_id(PLAYER);

        if let Some(id) = self.entities.king(king_id).dragonfly {
            if self.entities.dragonfly(id).flight_state == FlightState::Resting {
                let king = self.entities.king_mut(king_id);
                king.dragonfly = None;
                king.soldier.position.y = 0.0;
                debug!(dragonfly = %id, "King dismounted");
            }
        }

        match self.entities.king(king_id).dragonfly {
            Some(id) => self.ride(king_id, id, input, ctx.dt),
            None => self.walk_and_slash(king_id, input, ctx),
        }

        if input.keys.r && input.pointer.is_locked {
            self.mount_nearest_dragonfly(PLAYER, ctx);
        }

        self.check_crash(PLAYER);
    }

    /// Throttle the mount and keep the rider in the saddle.
    fn ride(&mut self, king_id: Ref, dragonfly_id: Ref, input: &InputSnapshot, dt: f64) {
        let flight = self.config.flight;
        let dragonfly = self.entities.dragonfly_mut(dragonfly_id);
        if input.keys.t {
            dragonfly.speed = (dragonfly.speed + flight.acceleration * dt).min(flight.max_speed);
        }
        if input.keys.g {
            dragonfly.speed = (dragonfly.speed - flight.deceleration * dt).max(flight.min_speed);
        }

        let settling = dragonfly.flight_state == FlightState::Landing
            && dragonfly.position.y <= flight.rest_altitude
            && dragonfly.speed < flight.rest_speed;
        if settling {
            return;
        }

        let (position, orientation) = (dragonfly.position, dragonfly.orientation);
        let rider = &mut self.entities.king_mut(king_id).soldier;
        rider.position = position;
        rider.orientation = orientation;
        step_forward(&mut rider.position, orientation, flight.rider_offset);
    }

    /// Walk on W, slash on Space.
    fn walk_and_slash(&mut self, king_id: Ref, input: &InputSnapshot, ctx: &mut TickContext) {
        let clips = ClipTable::king(&self.config.clips);
        let slash = clips.attack(SoldierAnimationKind::Slash);
        let walk_speed = self.config.movement.king_walk_speed;
        let dt = ctx.dt;

        let king = &mut self.entities.king_mut(king_id).soldier;
        let animation = &mut king.animation;
        if input.keys.w {
            animation.start_or_continue(SoldierAnimationKind::Walk, clips.walk_duration, dt);
        } else {
            animation.stop_walking(dt, clips.walk_duration);
        }

        let mut lands = false;
        if animation.kind == SoldierAnimationKind::Slash
            || (input.keys.space && animation.kind == SoldierAnimationKind::Idle)
        {
            let finishes_cycle = animation.time_in_seconds + dt >= slash.duration;
            lands = animation.start_or_continue_slash(dt, slash);
            if finishes_cycle && !input.keys.space {
                *animation = SoldierAnimation::start(SoldierAnimationKind::Idle);
            }
        }

        if king.animation.kind == SoldierAnimationKind::Walk {
            step_forward(&mut king.position, king.orientation, walk_speed * dt);
        }

        if lands {
            self.apply_king_slash(PLAYER, ctx);
        }
    }

    /// Squared XZ distance from the king of `allegiance` to the nearest tower
    /// it owns, or `None` if it owns no tower.
    #[must_use]
    pub fn king_distance_squared_to_safety(&self, allegiance: Allegiance) -> Option<f64> {
        let position = self.king(allegiance).soldier.position;
        let tower = self.nearest_banner_tower(position, |tower| tower.allegiance == allegiance)?;
        Some(xz_distance_squared(
            position,
            self.entities.tower(tower).position,
        ))
    }

    fn apply_safezone_attrition(&mut self, allegiance: Allegiance, dt: f64) {
        let rules = self.config.towers;
        let sheltered = self
            .king_distance_squared_to_safety(allegiance)
            .is_some_and(|distance_squared| distance_squared <= rules.safezone_range_squared);
        if !sheltered {
            let king_id = self.king_id(allegiance);
            self.entities.king_mut(king_id).soldier.health -=
                rules.king_out_of_safezone_damage_per_second * dt;
        }
    }

    fn explode_fallen_king(&mut self, allegiance: Allegiance, ctx: &mut TickContext) {
        let king_id = self.king_id(allegiance);
        let king = self.entities.king_mut(king_id);
        if king.soldier.is_alive() || king.has_exploded {
            return;
        }
        king.has_exploded = true;
        let explosion = SoldierExplosion::at(allegiance, &king.soldier);
        self.start_explosion(explosion, ctx);
        ctx.events.fallen_kings.push(allegiance);
        info!(?allegiance, "King has fallen");

        if self.outcome == BattleOutcome::Undecided {
            self.outcome = BattleOutcome::after_king_falls(allegiance);
            info!(outcome = ?self.outcome, "Battle decided");
        }
    }
}
