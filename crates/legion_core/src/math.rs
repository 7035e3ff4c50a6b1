//! Geometry utilities for the simulation.
//!
//! All functions here are pure. Positions are [`DVec3`] with +Y up; headings
//! are yaw/pitch/roll triples in radians. Models face their local −Z axis, so
//! moving "forward" means translating along local Z by a negative amount.

use std::f64::consts::{PI, TAU};

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Yaw/pitch/roll orientation in radians.
///
/// Rotations compose as Y(yaw) · X(pitch) · Z(roll).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    /// Rotation about the world Y axis.
    pub yaw: f64,
    /// Rotation about the local X axis.
    pub pitch: f64,
    /// Rotation about the local Z axis.
    pub roll: f64,
}

impl Orientation {
    /// Level orientation with the given yaw.
    #[must_use]
    pub const fn from_yaw(yaw: f64) -> Self {
        Self {
            yaw,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    /// Quaternion equivalent of this orientation.
    #[must_use]
    pub fn to_quat(self) -> DQuat {
        DQuat::from_rotation_y(self.yaw)
            * DQuat::from_rotation_x(self.pitch)
            * DQuat::from_rotation_z(self.roll)
    }
}

/// Translate `position` along the local Z axis of `orientation`.
pub fn translate_z(position: &mut DVec3, orientation: Orientation, amount: f64) {
    *position += orientation.to_quat() * DVec3::Z * amount;
}

/// Move `position` forward (local −Z) by `distance`.
pub fn step_forward(position: &mut DVec3, orientation: Orientation, distance: f64) {
    translate_z(position, orientation, -distance);
}

/// Squared distance ignoring the Y component.
#[must_use]
pub fn xz_distance_squared(a: DVec3, b: DVec3) -> f64 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

/// Yaw whose sine/cosine pair points along `direction` in the XZ plane.
#[must_use]
pub fn yaw_of(direction: DVec3) -> f64 {
    direction.x.atan2(direction.z)
}

/// Yaw that makes a −Z-facing model look from `from` toward `to`.
#[must_use]
pub fn facing_yaw(from: DVec3, to: DVec3) -> f64 {
    yaw_of(to - from) + PI
}

/// Rotate `v` about the world Y axis by `angle`.
#[must_use]
pub fn rotate_about_y(v: DVec3, angle: f64) -> DVec3 {
    DQuat::from_rotation_y(angle) * v
}

/// Wrap an angle into (−π, π].
#[must_use]
pub fn normalize_angle(angle: f64) -> f64 {
    PI - (PI - angle).rem_euclid(TAU)
}

/// Turn from `current` toward `desired`, changing by at most `max_change`.
///
/// Returns `desired` exactly once it is within reach, so repeated calls with
/// the same target settle on it and stay there.
#[must_use]
pub fn limit_turn(current: f64, desired: f64, max_change: f64) -> f64 {
    let difference = normalize_angle(desired - current);
    if difference.abs() <= max_change {
        return desired;
    }
    current + max_change * difference.signum()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_close(a: DVec3, b: DVec3) {
        assert!(a.distance(b) < EPSILON, "{a:?} != {b:?}");
    }

    #[test]
    fn test_step_forward_level_yaw_zero_moves_negative_z() {
        let mut position = DVec3::ZERO;
        step_forward(&mut position, Orientation::from_yaw(0.0), 2.0);
        assert_close(position, DVec3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn test_step_forward_yaw_half_pi_moves_negative_x() {
        let mut position = DVec3::ZERO;
        step_forward(&mut position, Orientation::from_yaw(PI / 2.0), 1.0);
        assert_close(position, DVec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_positive_pitch_climbs_when_stepping_forward() {
        let mut position = DVec3::ZERO;
        let orientation = Orientation {
            yaw: 0.0,
            pitch: PI / 2.0,
            roll: 0.0,
        };
        step_forward(&mut position, orientation, 1.0);
        assert_close(position, DVec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_roll_does_not_change_heading() {
        let mut rolled = DVec3::ZERO;
        let mut level = DVec3::ZERO;
        step_forward(
            &mut rolled,
            Orientation {
                yaw: 0.3,
                pitch: 0.0,
                roll: 1.0,
            },
            5.0,
        );
        step_forward(&mut level, Orientation::from_yaw(0.3), 5.0);
        assert_close(rolled, level);
    }

    #[test]
    fn test_xz_distance_ignores_height() {
        let a = DVec3::new(3.0, 100.0, 0.0);
        let b = DVec3::new(0.0, -5.0, 4.0);
        assert_eq!(xz_distance_squared(a, b), 25.0);
    }

    #[test]
    fn test_facing_yaw_points_model_at_target() {
        let from = DVec3::new(1.0, 0.0, 1.0);
        let to = DVec3::new(1.0, 0.0, -9.0);
        let mut position = from;
        step_forward(&mut position, Orientation::from_yaw(facing_yaw(from, to)), 10.0);
        assert_close(position, to);
    }

    #[test]
    fn test_normalize_angle_range() {
        assert_eq!(normalize_angle(PI), PI);
        assert_eq!(normalize_angle(-PI), PI);
        assert_eq!(normalize_angle(0.0), 0.0);
        assert!((normalize_angle(2.5 * TAU + 0.5) - (0.5 - PI)).abs() < EPSILON);
        assert!((normalize_angle(-0.5 * PI - TAU) + 0.5 * PI).abs() < EPSILON);
    }

    #[test]
    fn test_limit_turn_takes_short_way_round() {
        let turned = limit_turn(0.1, TAU - 0.1, 0.05);
        assert!((turned - 0.05).abs() < EPSILON);
    }

    #[test]
    fn test_limit_turn_snaps_within_reach() {
        assert_eq!(limit_turn(1.0, 1.04, 0.05), 1.04);
    }

    #[test]
    fn test_rotate_about_y_quarter_turn() {
        let rotated = rotate_about_y(DVec3::X, -PI / 2.0);
        assert_close(rotated, DVec3::Z);
    }

    proptest! {
        #[test]
        fn prop_limit_turn_settles_and_holds(
            start in -TAU..TAU,
            desired in -TAU..TAU,
            max_change in 0.01f64..1.0,
        ) {
            let mut current = start;
            let mut steps = 0;
            while current != desired {
                prop_assert!(steps < 1000, "never reached {desired} from {start}");
                let next = limit_turn(current, desired, max_change);
                prop_assert!(normalize_angle(next - current).abs() <= max_change + EPSILON);
                current = next;
                steps += 1;
            }

            for _ in 0..10 {
                prop_assert_eq!(limit_turn(current, desired, max_change), desired);
            }
        }
    }
}
