//! Entity data definitions.
//!
//! Components are pure data with no behavior. The tick modules in this crate
//! read and mutate them; the presentation layer only reads them.

use std::collections::VecDeque;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::animation::SoldierAnimation;
use crate::math::Orientation;
use crate::store::Ref;

/// One of the two factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Allegiance {
    /// The red-bean army, controlled by the local player.
    Azuki,
    /// The soybean army.
    Edamame,
}

impl Allegiance {
    /// The other faction.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Azuki => Self::Edamame,
            Self::Edamame => Self::Azuki,
        }
    }
}

/// A spear soldier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Soldier {
    /// World position.
    pub position: DVec3,
    /// Heading; soldiers only ever change yaw.
    pub orientation: Orientation,
    /// Animation phase clock.
    pub animation: SoldierAnimation,
    /// Enemy soldier or king currently engaged.
    pub attack_target: Option<Ref>,
    /// Remaining health; zero or below means dead.
    pub health: f64,
    /// Where the soldier stands once its unit has assembled.
    pub assembly_point: DVec3,
}

impl Soldier {
    /// Idle soldier at `position` facing `yaw`.
    #[must_use]
    pub fn new(position: DVec3, yaw: f64, health: f64) -> Self {
        Self {
            position,
            orientation: Orientation::from_yaw(yaw),
            animation: SoldierAnimation::default(),
            attack_target: None,
            health,
            assembly_point: position,
        }
    }

    /// Whether the soldier still has health left.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// A faction leader: a soldier that can slash and ride dragonflies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct King {
    /// Shared soldier state.
    pub soldier: Soldier,
    /// Dragonfly currently ridden.
    pub dragonfly: Option<Ref>,
    /// Camera pitch chosen by the player, read by the presentation layer.
    pub camera_pitch: f64,
    /// Set once the death explosion has been spawned; never cleared.
    pub has_exploded: bool,
}

impl King {
    /// Unmounted king at `position` facing `yaw`.
    #[must_use]
    pub fn new(position: DVec3, yaw: f64, health: f64) -> Self {
        Self {
            soldier: Soldier::new(position, yaw, health),
            dragonfly: None,
            camera_pitch: 0.0,
            has_exploded: false,
        }
    }
}

/// Behavioral mode of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitOrder {
    /// Disciplined march that breaks into melee as a whole.
    Advance,
    /// Per-soldier skirmishing.
    Storm,
    /// Re-forming at assembly points; becomes Storm when done.
    Assemble,
}

/// A formation of soldiers sharing one order and one facing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Current order.
    pub order: UnitOrder,
    /// Living members; dead soldiers are spliced out.
    pub soldier_ids: Vec<Ref>,
    /// Formation axis. Soldiers hold its yaw and, facing local −Z, march
    /// along its negation.
    pub forward: DVec3,
    /// Previews are UI ghosts and ignored by combat and capture.
    pub is_preview: bool,
    /// Owning faction.
    pub allegiance: Allegiance,
    /// A tower is still feeding recruits into this unit.
    pub are_soldiers_still_being_added: bool,
    /// Selected by the player.
    pub is_selected: bool,
}

impl Unit {
    /// Empty storming unit.
    #[must_use]
    pub fn new(allegiance: Allegiance, forward: DVec3) -> Self {
        Self {
            order: UnitOrder::Storm,
            soldier_ids: Vec::new(),
            forward,
            is_preview: false,
            allegiance,
            are_soldiers_still_being_added: false,
            is_selected: false,
        }
    }

    /// Yaw that soldiers of this unit line up on.
    #[must_use]
    pub fn forward_yaw(&self) -> f64 {
        crate::math::yaw_of(self.forward)
    }
}

/// A soldier that exists only on paper until a tower deploys it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSoldier {
    /// Planned position; deployment actually starts at the tower.
    pub position: DVec3,
    /// Initial yaw.
    pub yaw: f64,
    /// Health on deployment.
    pub health: f64,
    /// Formation slot the soldier walks to.
    pub assembly_point: DVec3,
}

/// Roster a tower is still feeding into an assembling unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingUnit {
    /// Soldiers not yet deployed, front first.
    pub soldiers: VecDeque<PlannedSoldier>,
    /// Unit receiving the soldiers.
    pub unit_id: Ref,
}

/// A capturable strongpoint that reinforces its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BannerTower {
    /// Base position.
    pub position: DVec3,
    /// Previews are skipped by the tower tick.
    pub is_preview: bool,
    /// Current owner; changes only by capture.
    pub allegiance: Allegiance,
    /// Rosters waiting for deployment, first in first out.
    pub pending_units: VecDeque<PendingUnit>,
    /// Reinforcement cooldown; may go negative while idle.
    pub seconds_until_next_soldier: f64,
}

impl BannerTower {
    /// Idle tower owned by `allegiance`.
    #[must_use]
    pub fn new(position: DVec3, allegiance: Allegiance) -> Self {
        Self {
            position,
            is_preview: false,
            allegiance,
            pending_units: VecDeque::new(),
            seconds_until_next_soldier: 0.0,
        }
    }
}

/// Flight mode of a dragonfly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightState {
    /// On the ground, mountable.
    Resting,
    /// Airborne under rider control.
    Flying,
    /// Levelling out and settling toward the ground.
    Landing,
}

/// Dragonfly clip in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DragonflyAnimationKind {
    /// Wings folded.
    Idle,
    /// Wing-beat loop.
    Fly,
}

/// Dragonfly animation phase clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragonflyAnimation {
    /// Clip in play.
    pub kind: DragonflyAnimationKind,
    /// Seconds into the clip.
    pub time_in_seconds: f64,
}

impl DragonflyAnimation {
    /// Clip `kind` from its first frame.
    #[must_use]
    pub const fn start(kind: DragonflyAnimationKind) -> Self {
        Self {
            kind,
            time_in_seconds: 0.0,
        }
    }
}

/// A mountable flyer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dragonfly {
    /// World position.
    pub position: DVec3,
    /// Attitude.
    pub orientation: Orientation,
    /// Airspeed, within `[0, max_speed]`.
    pub speed: f64,
    /// Flight mode.
    pub flight_state: FlightState,
    /// Animation phase clock.
    pub animation: DragonflyAnimation,
    /// Seconds left before a landed dragonfly rests.
    pub dismount_timer: f64,
}

impl Dragonfly {
    /// Resting dragonfly at `position`.
    #[must_use]
    pub fn resting(position: DVec3, yaw: f64) -> Self {
        Self {
            position,
            orientation: Orientation::from_yaw(yaw),
            speed: 0.0,
            flight_state: FlightState::Resting,
            animation: DragonflyAnimation::start(DragonflyAnimationKind::Idle),
            dismount_timer: 0.0,
        }
    }
}

/// Cosmetic death effect timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoldierExplosion {
    /// Faction of the soldier that died.
    pub allegiance: Allegiance,
    /// Where it died.
    pub position: DVec3,
    /// How it was facing.
    pub orientation: Orientation,
    /// Seconds since the explosion started.
    pub time_in_seconds: f64,
}

impl SoldierExplosion {
    /// Explosion starting now at the given soldier's pose.
    #[must_use]
    pub fn at(allegiance: Allegiance, soldier: &Soldier) -> Self {
        Self {
            allegiance,
            position: soldier.position,
            orientation: soldier.orientation,
            time_in_seconds: 0.0,
        }
    }
}

/// Spears a faction has collected from fallen enemies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hand {
    /// Spears available.
    pub spear_count: u32,
}

/// Result of the battle, decided by the first king to fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// Both kings stand.
    #[default]
    Undecided,
    /// The Edamame king fell first.
    AzukiWins,
    /// The Azuki king fell first.
    EdamameWins,
}

impl BattleOutcome {
    /// Outcome when the king of `fallen` dies.
    #[must_use]
    pub const fn after_king_falls(fallen: Allegiance) -> Self {
        match fallen {
            Allegiance::Azuki => Self::EdamameWins,
            Allegiance::Edamame => Self::AzukiWins,
        }
    }
}
