//! Dragonfly flight: Resting → Flying → Landing → Resting.
//!
//! Mounting is the only way out of Resting. Each tick runs exactly one state
//! branch, and a dragonfly that landed this tick cannot be mounted until the
//! next, so it changes flight state at most once per tick and always settles
//! through Landing before it rests.

use std::f64::consts::PI;

use glam::DVec3;
use tracing::debug;

use crate::components::{
    Allegiance, BannerTower, DragonflyAnimation, DragonflyAnimationKind, FlightState,
};
use crate::config::TowerConfig;
use crate::input::InputSnapshot;
use crate::math::{limit_turn, step_forward};
use crate::simulation::{Battle, FlightTransition, TickContext};
use crate::store::Ref;

impl BannerTower {
    /// Whether `point` is inside the tower's solid collision volume.
    ///
    /// The volume is a square column with two crossing archways carved out
    /// of its lower half.
    #[must_use]
    pub fn hitbox_contains(&self, point: DVec3, rules: &TowerConfig) -> bool {
        let local = point - self.position;
        let within_height = |height: f64| 0.0 <= local.y && local.y <= height;

        let in_hitbox = local.x.abs() <= rules.hitbox_half_extent
            && local.z.abs() <= rules.hitbox_half_extent
            && within_height(rules.hitbox_height);
        if !in_hitbox {
            return false;
        }

        let in_gap = (local.x.abs() <= rules.gap_half_extent
            || local.z.abs() <= rules.gap_half_extent)
            && within_height(rules.gap_height);
        !in_gap
    }
}

impl DragonflyAnimation {
    fn advance(&mut self, elapsed: f64, duration: f64) {
        if self.kind == DragonflyAnimationKind::Fly {
            self.time_in_seconds = (self.time_in_seconds + elapsed) % duration;
        }
    }
}

impl Battle {
    /// First active tower whose hitbox contains `point`.
    #[must_use]
    pub fn colliding_tower(&self, point: DVec3) -> Option<Ref> {
        let rules = &self.config.towers;
        self.active_tower_ids
            .iter()
            .copied()
            .find(|&id| self.entities.tower(id).hitbox_contains(point, rules))
    }

    /// Nearest resting dragonfly to `position`, at any distance.
    #[must_use]
    pub fn nearest_resting_dragonfly(&self, position: DVec3) -> Option<Ref> {
        let mut nearest = None;
        let mut nearest_distance_squared = f64::INFINITY;
        for &id in &self.active_dragonfly_ids {
            let dragonfly = self.entities.dragonfly(id);
            if dragonfly.flight_state != FlightState::Resting {
                continue;
            }
            let distance_squared = position.distance_squared(dragonfly.position);
            if distance_squared < nearest_distance_squared {
                nearest = Some(id);
                nearest_distance_squared = distance_squared;
            }
        }
        nearest
    }

    pub(crate) fn tick_dragonflies(&mut self, input: &InputSnapshot, ctx: &mut TickContext) {
        for id in self.active_dragonfly_ids.clone() {
            self.tick_dragonfly(id, input, ctx);
        }
    }

    fn tick_dragonfly(&mut self, id: Ref, input: &InputSnapshot, ctx: &mut TickContext) {
        let flight = self.config.flight;
        let fly_duration = self.config.clips.dragonfly_fly_clip_duration;
        let dt = ctx.dt;
        let ridden_by_player = self.king(Allegiance::Azuki).dragonfly == Some(id);

        let dragonfly = self.entities.dragonfly_mut(id);
        dragonfly
            .animation
            .advance(dt * flight.fly_clip_time_scale, fly_duration);

        let before = dragonfly.flight_state;
        let orientation = &mut dragonfly.orientation;
        match before {
            FlightState::Resting => {}
            FlightState::Flying => {
                orientation.yaw += dt * orientation.roll * flight.yaw_per_roll;
                if ridden_by_player {
                    orientation.roll = -(input.pointer.x - 0.5) * PI;
                    orientation.pitch = -(input.pointer.y - 0.5) * PI;
                }
                step_forward(&mut dragonfly.position, *orientation, dragonfly.speed * dt);

                let wants_to_land = ridden_by_player && input.keys.v;
                if wants_to_land
                    && dragonfly.position.y < flight.landing_altitude
                    && dragonfly.speed <= flight.max_landing_speed
                {
                    dragonfly.flight_state = FlightState::Landing;
                    dragonfly.dismount_timer = flight.dismount_seconds;
                }
            }
            FlightState::Landing
                if dragonfly.position.y <= flight.rest_altitude
                    && dragonfly.speed < flight.rest_speed =>
            {
                dragonfly.dismount_timer -= dt;
                if dragonfly.dismount_timer <= 0.0 {
                    dragonfly.flight_state = FlightState::Resting;
                    dragonfly.animation = DragonflyAnimation::start(DragonflyAnimationKind::Idle);
                }
            }
            FlightState::Landing => {
                orientation.yaw += dt * orientation.roll * flight.yaw_per_roll;
                orientation.pitch = limit_turn(orientation.pitch, 0.0, flight.landing_pitch_rate * dt);
                orientation.roll = limit_turn(orientation.roll, 0.0, flight.landing_roll_rate * dt);

                if orientation.pitch == 0.0 && orientation.roll == 0.0 {
                    dragonfly.speed =
                        (dragonfly.speed * flight.landing_speed_decay.powf(dt)).max(0.0);
                    dragonfly.position.y = (dragonfly.position.y
                        * flight.landing_altitude_decay.powf(dt))
                    .max(flight.rest_altitude);
                }
                step_forward(&mut dragonfly.position, *orientation, dragonfly.speed * dt);
            }
        }

        let after = dragonfly.flight_state;
        if after != before {
            debug!(dragonfly = %id, ?before, ?after, "Flight state changed");
            ctx.events.flight_transitions.push(FlightTransition {
                dragonfly: id,
                from: before,
                to: after,
            });
        }
    }

    /// Put the king of `allegiance` on the nearest resting dragonfly, if one
    /// is within mounting range and did not come to rest this tick.
    ///
    /// Returns the mounted dragonfly.
    pub(crate) fn mount_nearest_dragonfly(
        &mut self,
        allegiance: Allegiance,
        ctx: &mut TickContext,
    ) -> Option<Ref> {
        let flight = self.config.flight;
        let king_id = self.king_id(allegiance);
        let king = self.entities.king(king_id);
        if king.dragonfly.is_some() {
            return None;
        }
        let position = king.soldier.position;
        let id = self.nearest_resting_dragonfly(position)?;
        if ctx.events.flight_transitions.iter().any(|t| t.dragonfly == id) {
            return None;
        }

        let dragonfly = self.entities.dragonfly_mut(id);
        if position.distance_squared(dragonfly.position) > flight.mount_range_squared {
            return None;
        }
        dragonfly.flight_state = FlightState::Flying;
        dragonfly.animation = DragonflyAnimation::start(DragonflyAnimationKind::Fly);
        dragonfly.speed = flight.min_speed;
        self.entities.king_mut(king_id).dragonfly = Some(id);

        debug!(?allegiance, dragonfly = %id, "King mounted dragonfly");
        ctx.events.flight_transitions.push(FlightTransition {
            dragonfly: id,
            from: FlightState::Resting,
            to: FlightState::Flying,
        });
        Some(id)
    }

    /// Kill a king whose flying mount hit the ground or a tower.
    pub(crate) fn check_crash(&mut self, allegiance: Allegiance) {
        let king_id = self.king_id(allegiance);
        let Some(id) = self.entities.king(king_id).dragonfly else {
            return;
        };
        let dragonfly = self.entities.dragonfly(id);
        if dragonfly.flight_state != FlightState::Flying {
            return;
        }
        let position = dragonfly.position;
        if position.y <= 0.0 || self.colliding_tower(position).is_some() {
            let king = self.entities.king_mut(king_id);
            king.soldier.health = 0.0;
            king.dragonfly = None;
            debug!(?allegiance, dragonfly = %id, ?position, "Dragonfly crashed");
        }
    }
}
