//! Animation phase clocks and the timing rules built on them.
//!
//! Soldiers carry a `{kind, time}` clock. Clip tables supply durations and,
//! for attack clips, the fraction of the clip at which the hit lands. Damage
//! is decided by [`crosses_threshold`] alone: a hit lands on the tick whose
//! start is before the damage point and whose end is at or after it, so a
//! swing deals damage exactly once no matter how the time is sliced.
//!
//! Stab entry may be preceded by a random pre-roll that desynchronises
//! neighbouring spears. The pre-roll is tracked in `delay_remaining` and is
//! consumed before the stab clock itself starts moving.

use serde::{Deserialize, Serialize};

use crate::config::ModelConstants;

/// Clip a soldier or king is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoldierAnimationKind {
    /// Standing; also counts the cooldown between stabs.
    Idle,
    /// Walk cycle.
    Walk,
    /// Spear thrust.
    Stab,
    /// King sword sweep.
    Slash,
}

/// Soldier animation phase clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoldierAnimation {
    /// Clip in play.
    pub kind: SoldierAnimationKind,
    /// Seconds into the clip (clip time for stabs, real time otherwise).
    pub time_in_seconds: f64,
    /// Pre-roll left before the clip clock starts advancing.
    pub delay_remaining: f64,
}

impl Default for SoldierAnimation {
    fn default() -> Self {
        Self::start(SoldierAnimationKind::Idle)
    }
}

/// Timing of an attack clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackClip {
    /// Clip length in seconds.
    pub duration: f64,
    /// Fraction of the clip at which the hit lands.
    pub damage_fraction: f64,
}

impl AttackClip {
    /// Clip time at which the hit lands.
    #[must_use]
    pub fn damage_time(self) -> f64 {
        self.duration * self.damage_fraction
    }
}

/// Per-class clip timings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipTable {
    /// Walk cycle length.
    pub walk_duration: f64,
    /// Stab timing, for classes that stab.
    pub stab: Option<AttackClip>,
    /// Slash timing, for classes that slash.
    pub slash: Option<AttackClip>,
}

impl ClipTable {
    /// Timings for spear soldiers.
    #[must_use]
    pub fn spear(mcon: &ModelConstants) -> Self {
        Self {
            walk_duration: mcon.spear_walk_clip_duration,
            stab: Some(AttackClip {
                duration: mcon.spear_stab_clip_duration,
                damage_fraction: f64::from(mcon.spear_stab_damage_frame)
                    / f64::from(mcon.spear_stab_frame_count),
            }),
            slash: None,
        }
    }

    /// Timings for kings.
    #[must_use]
    pub fn king(mcon: &ModelConstants) -> Self {
        Self {
            walk_duration: mcon.king_walk_clip_duration,
            stab: None,
            slash: Some(AttackClip {
                duration: mcon.king_slash_clip_duration,
                damage_fraction: f64::from(mcon.king_slash_damage_frame)
                    / f64::from(mcon.king_slash_frame_count),
            }),
        }
    }

    /// Timing of an attack clip.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not an attack this class can perform; that means an
    /// order and an animation kind got out of step.
    #[must_use]
    #[track_caller]
    pub fn attack(&self, kind: SoldierAnimationKind) -> AttackClip {
        let clip = match kind {
            SoldierAnimationKind::Stab => self.stab,
            SoldierAnimationKind::Slash => self.slash,
            SoldierAnimationKind::Idle | SoldierAnimationKind::Walk => None,
        };
        clip.unwrap_or_else(|| panic!("{kind:?} has no damage frame for this clip table"))
    }
}

/// Whether a clock at `time` passes `threshold` when advanced by `elapsed`.
///
/// True iff `time < threshold` and `time + elapsed >= threshold`.
#[must_use]
pub fn crosses_threshold(time: f64, elapsed: f64, threshold: f64) -> bool {
    time < threshold && time + elapsed >= threshold
}

impl SoldierAnimation {
    /// Clip `kind` from its first frame with no pre-roll.
    #[must_use]
    pub const fn start(kind: SoldierAnimationKind) -> Self {
        Self {
            kind,
            time_in_seconds: 0.0,
            delay_remaining: 0.0,
        }
    }

    /// Switch to `kind` from time zero, or loop it forward if already playing.
    ///
    /// Returns `true` if the clip was already playing.
    pub fn start_or_continue(
        &mut self,
        kind: SoldierAnimationKind,
        duration: f64,
        elapsed: f64,
    ) -> bool {
        if self.kind != kind {
            *self = Self::start(kind);
            return false;
        }
        self.time_in_seconds = (self.time_in_seconds + elapsed) % duration;
        true
    }

    /// Whether a walk cycle reaches its halfway point or its end this tick.
    fn walk_can_stop(&self, elapsed: f64, walk_duration: f64) -> bool {
        let halfway = 0.5 * walk_duration;
        crosses_threshold(self.time_in_seconds, elapsed, halfway)
            || self.time_in_seconds + elapsed >= walk_duration
    }

    /// Let a walk cycle run on until a stride boundary, then go idle.
    ///
    /// Does nothing unless walking.
    pub fn stop_walking(&mut self, elapsed: f64, walk_duration: f64) {
        if self.kind != SoldierAnimationKind::Walk {
            return;
        }
        if self.walk_can_stop(elapsed, walk_duration) {
            *self = Self::start(SoldierAnimationKind::Idle);
        } else {
            self.time_in_seconds += elapsed;
        }
    }

    /// Let a walk cycle run on until a stride boundary, then begin a stab.
    ///
    /// `pre_roll` is only drawn when the stab actually begins.
    pub fn stop_walking_and_start_stab(
        &mut self,
        elapsed: f64,
        walk_duration: f64,
        pre_roll: impl FnOnce() -> f64,
    ) {
        if self.kind != SoldierAnimationKind::Walk {
            return;
        }
        if self.walk_can_stop(elapsed, walk_duration) {
            *self = Self {
                kind: SoldierAnimationKind::Stab,
                time_in_seconds: 0.0,
                delay_remaining: pre_roll(),
            };
        } else {
            self.time_in_seconds += elapsed;
        }
    }

    /// Advance a stab; when the clip ends, fall back to idle carrying the
    /// remainder over in real seconds.
    ///
    /// Returns `true` if the hit lands this tick.
    pub fn continue_stab_then_idle(
        &mut self,
        elapsed: f64,
        stab: AttackClip,
        time_scale: f64,
    ) -> bool {
        let mut advance = elapsed * time_scale;
        if self.delay_remaining > 0.0 {
            let consumed = self.delay_remaining.min(advance);
            self.delay_remaining -= consumed;
            advance -= consumed;
        }

        let deals_damage = crosses_threshold(self.time_in_seconds, advance, stab.damage_time());
        self.time_in_seconds += advance;

        if self.time_in_seconds >= stab.duration {
            self.kind = SoldierAnimationKind::Idle;
            self.time_in_seconds = (self.time_in_seconds - stab.duration) / time_scale;
        }

        deals_damage
    }

    /// Count down the idle cooldown; when it expires, begin a stab carrying
    /// the remainder over in clip seconds, less any pre-roll.
    ///
    /// Returns `true` if the carried-over time already reaches the hit.
    pub fn continue_idle_then_stab(
        &mut self,
        elapsed: f64,
        stab: AttackClip,
        cooldown: f64,
        time_scale: f64,
        pre_roll: impl FnOnce() -> f64,
    ) -> bool {
        self.time_in_seconds += elapsed;
        if self.time_in_seconds < cooldown {
            return false;
        }

        let carried = (self.time_in_seconds - cooldown) * time_scale;
        let delay = pre_roll();
        self.kind = SoldierAnimationKind::Stab;
        if carried >= delay {
            self.time_in_seconds = carried - delay;
            self.delay_remaining = 0.0;
        } else {
            self.time_in_seconds = 0.0;
            self.delay_remaining = delay - carried;
        }

        crosses_threshold(0.0, self.time_in_seconds, stab.damage_time())
    }

    /// Start or loop a slash.
    ///
    /// Returns `true` if the hit lands this tick; never on the entry tick.
    pub fn start_or_continue_slash(&mut self, elapsed: f64, slash: AttackClip) -> bool {
        let was_slashing = self.kind == SoldierAnimationKind::Slash;
        let deals_damage =
            was_slashing && crosses_threshold(self.time_in_seconds, elapsed, slash.damage_time());
        self.start_or_continue(SoldierAnimationKind::Slash, slash.duration, elapsed);
        deals_damage
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn stab_clip() -> AttackClip {
        ClipTable::spear(&ModelConstants::default()).attack(SoldierAnimationKind::Stab)
    }

    fn stabbing() -> SoldierAnimation {
        SoldierAnimation::start(SoldierAnimationKind::Stab)
    }

    #[test]
    fn test_crosses_threshold_is_half_open() {
        assert!(crosses_threshold(0.4, 0.1, 0.5));
        assert!(crosses_threshold(0.4, 0.2, 0.5));
        assert!(!crosses_threshold(0.5, 0.1, 0.5));
        assert!(!crosses_threshold(0.3, 0.1, 0.5));
    }

    #[test]
    fn test_start_or_continue_resets_on_switch() {
        let mut animation = SoldierAnimation {
            kind: SoldierAnimationKind::Idle,
            time_in_seconds: 0.7,
            delay_remaining: 0.0,
        };
        assert!(!animation.start_or_continue(SoldierAnimationKind::Walk, 1.0, 0.1));
        assert_eq!(animation, SoldierAnimation::start(SoldierAnimationKind::Walk));
        assert!(animation.start_or_continue(SoldierAnimationKind::Walk, 1.0, 0.25));
        assert_eq!(animation.time_in_seconds, 0.25);
    }

    #[test]
    fn test_stop_walking_waits_for_halfway_point() {
        let mut animation = SoldierAnimation {
            kind: SoldierAnimationKind::Walk,
            time_in_seconds: 0.1,
            delay_remaining: 0.0,
        };
        animation.stop_walking(0.2, 1.0);
        assert_eq!(animation.kind, SoldierAnimationKind::Walk);
        assert!((animation.time_in_seconds - 0.3).abs() < 1e-12);

        animation.stop_walking(0.25, 1.0);
        assert_eq!(animation, SoldierAnimation::start(SoldierAnimationKind::Idle));
    }

    #[test]
    fn test_stop_walking_at_end_of_cycle() {
        let mut animation = SoldierAnimation {
            kind: SoldierAnimationKind::Walk,
            time_in_seconds: 0.95,
            delay_remaining: 0.0,
        };
        animation.stop_walking(0.1, 1.0);
        assert_eq!(animation.kind, SoldierAnimationKind::Idle);
    }

    #[test]
    fn test_stop_walking_ignores_other_clips() {
        let mut animation = stabbing();
        animation.stop_walking(10.0, 1.0);
        assert_eq!(animation, stabbing());
    }

    #[test]
    fn test_walk_into_stab_takes_pre_roll() {
        let mut animation = SoldierAnimation {
            kind: SoldierAnimationKind::Walk,
            time_in_seconds: 0.49,
            delay_remaining: 0.0,
        };
        animation.stop_walking_and_start_stab(0.02, 1.0, || 0.3);
        assert_eq!(animation.kind, SoldierAnimationKind::Stab);
        assert_eq!(animation.time_in_seconds, 0.0);
        assert_eq!(animation.delay_remaining, 0.3);
    }

    #[test]
    fn test_pre_roll_not_drawn_mid_stride() {
        let mut animation = SoldierAnimation {
            kind: SoldierAnimationKind::Walk,
            time_in_seconds: 0.1,
            delay_remaining: 0.0,
        };
        animation.stop_walking_and_start_stab(0.01, 1.0, || panic!("drawn too early"));
        assert_eq!(animation.kind, SoldierAnimationKind::Walk);
    }

    #[test]
    fn test_pre_roll_postpones_hit() {
        let clip = stab_clip();
        let mut delayed = SoldierAnimation {
            delay_remaining: 0.5,
            ..stabbing()
        };
        // Half a second of clip time disappears into the pre-roll.
        assert!(!delayed.continue_stab_then_idle(0.25, clip, 2.0));
        assert_eq!(delayed.delay_remaining, 0.0);
        assert_eq!(delayed.time_in_seconds, 0.0);
        assert!(delayed.continue_stab_then_idle(0.25, clip, 2.0));
    }

    #[test]
    fn test_stab_ends_into_idle_with_remainder() {
        let clip = stab_clip();
        let mut animation = SoldierAnimation {
            time_in_seconds: 0.9,
            ..stabbing()
        };
        assert!(!animation.continue_stab_then_idle(0.1, clip, 2.0));
        assert_eq!(animation.kind, SoldierAnimationKind::Idle);
        assert!((animation.time_in_seconds - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_idle_into_stab_carries_remainder() {
        let clip = stab_clip();
        let mut animation = SoldierAnimation {
            time_in_seconds: 0.95,
            ..SoldierAnimation::default()
        };
        let hit = animation.continue_idle_then_stab(0.1, clip, 1.0, 2.0, || 0.0);
        assert!(!hit);
        assert_eq!(animation.kind, SoldierAnimationKind::Stab);
        assert!((animation.time_in_seconds - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_idle_into_stab_can_land_immediately() {
        let clip = stab_clip();
        let mut animation = SoldierAnimation::default();
        assert!(animation.continue_idle_then_stab(1.3, clip, 1.0, 2.0, || 0.0));
    }

    #[test]
    fn test_idle_into_stab_pre_roll_absorbs_carry() {
        let clip = stab_clip();
        let mut animation = SoldierAnimation {
            time_in_seconds: 0.9,
            ..SoldierAnimation::default()
        };
        animation.continue_idle_then_stab(0.2, clip, 1.0, 2.0, || 0.5);
        assert_eq!(animation.time_in_seconds, 0.0);
        assert!((animation.delay_remaining - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_slash_never_hits_on_entry() {
        let slash = ClipTable::king(&ModelConstants::default()).attack(SoldierAnimationKind::Slash);
        let mut animation = SoldierAnimation::default();
        assert!(!animation.start_or_continue_slash(10.0, slash));
        assert_eq!(animation.kind, SoldierAnimationKind::Slash);
        assert!(animation.start_or_continue_slash(slash.damage_time(), slash));
    }

    #[test]
    #[should_panic(expected = "Slash has no damage frame")]
    fn test_spear_cannot_slash() {
        let _ = ClipTable::spear(&ModelConstants::default()).attack(SoldierAnimationKind::Slash);
    }

    #[test]
    fn test_one_hit_per_swing_regardless_of_slicing() {
        let clip = stab_clip();
        let mut coarse = stabbing();
        let coarse_hits = usize::from(coarse.continue_stab_then_idle(0.4, clip, 2.0));

        let mut fine = stabbing();
        let fine_hits = (0..40)
            .filter(|_| fine.continue_stab_then_idle(0.01, clip, 2.0))
            .count();

        assert_eq!(coarse_hits, 1);
        assert_eq!(fine_hits, 1);
    }

    proptest! {
        #[test]
        fn prop_hit_count_independent_of_step_count(steps in 1usize..400) {
            let clip = stab_clip();
            let total = 0.4;
            let step = total / steps as f64;

            let mut sliced = stabbing();
            let hits = (0..steps)
                .filter(|_| sliced.continue_stab_then_idle(step, clip, 2.0))
                .count();

            let mut whole = stabbing();
            let whole_hits = usize::from(whole.continue_stab_then_idle(total, clip, 2.0));

            prop_assert_eq!(hits, whole_hits);
        }

        #[test]
        fn prop_pre_roll_never_goes_negative(
            delay in 0.0f64..1.0,
            steps in 1usize..200,
        ) {
            let clip = stab_clip();
            let mut animation = SoldierAnimation { delay_remaining: delay, ..stabbing() };
            for _ in 0..steps {
                animation.continue_stab_then_idle(0.01, clip, 2.0);
                prop_assert!(animation.delay_remaining >= 0.0);
                prop_assert!(animation.time_in_seconds >= 0.0);
            }
        }
    }
}
