//! Test fixtures and helpers.
//!
//! Pre-built battles for consistent testing. Kings are parked far from the
//! action unless a fixture is about kings.

use std::collections::VecDeque;
use std::f64::consts::PI;

use glam::DVec3;
use legion_core::components::{
    Allegiance, BannerTower, King, PendingUnit, PlannedSoldier, Soldier, Unit, UnitOrder,
};
use legion_core::config::BattleConfig;
use legion_core::input::InputSnapshot;
use legion_core::simulation::Battle;
use legion_core::store::Ref;

/// Where fixtures park kings that should stay out of the fight.
pub const FAR_AWAY: f64 = 5000.0;

/// The standard opening with default rules.
#[must_use]
pub fn default_battle() -> Battle {
    Battle::default_battle(BattleConfig::default())
}

/// Two kings and nothing else, parked far apart.
///
/// Without towers there is no safezone, so attrition is switched off to keep
/// both kings standing through long scenarios.
#[must_use]
pub fn kings_only() -> Battle {
    let mut config = BattleConfig::default();
    config.towers.king_out_of_safezone_damage_per_second = 0.0;
    kings_only_with(config)
}

/// [`kings_only`] under custom rules.
#[must_use]
pub fn kings_only_with(config: BattleConfig) -> Battle {
    let health = config.health.king;
    Battle::new(
        config,
        King::new(DVec3::new(0.0, 0.0, FAR_AWAY), 0.0, health),
        King::new(DVec3::new(0.0, 0.0, -FAR_AWAY), PI, health),
    )
}

/// Add a unit of `order` with one soldier per position, all facing `yaw`.
///
/// # Panics
///
/// Panics only if the battle's store is corrupt.
pub fn add_squad(
    battle: &mut Battle,
    allegiance: Allegiance,
    order: UnitOrder,
    yaw: f64,
    positions: &[DVec3],
) -> (Ref, Vec<Ref>) {
    let health = battle.config().health.soldier;
    let unit_id = battle.add_unit(Unit {
        order,
        ..Unit::new(allegiance, DVec3::new(yaw.sin(), 0.0, yaw.cos()))
    });
    let soldiers = positions
        .iter()
        .map(|&position| {
            battle
                .enlist_soldier(unit_id, Soldier::new(position, yaw, health))
                .expect("fresh unit handle")
        })
        .collect();
    (unit_id, soldiers)
}

/// One Azuki spear facing one Edamame spear, `gap` apart along Z.
///
/// The Azuki soldier stands at the origin facing −Z toward its foe.
#[must_use]
pub fn duel_at(gap: f64, order: UnitOrder) -> Battle {
    let mut battle = kings_only();
    add_squad(&mut battle, Allegiance::Azuki, order, 0.0, &[DVec3::ZERO]);
    add_squad(
        &mut battle,
        Allegiance::Edamame,
        order,
        PI,
        &[DVec3::new(0.0, 0.0, -gap)],
    );
    battle
}

/// Two storming spears already within reach.
#[must_use]
pub fn duel() -> Battle {
    duel_at(5.0, UnitOrder::Storm)
}

/// An Azuki tower with one assembling unit of `recruits` soldiers queued and
/// its cooldown already expired.
///
/// Returns the battle, the tower, and the assembling unit.
#[must_use]
pub fn tower_with_roster(recruits: usize) -> (Battle, Ref, Ref) {
    let mut battle = kings_only();
    let health = battle.config().health.soldier;
    let unit_id = battle.add_unit(Unit {
        order: UnitOrder::Assemble,
        are_soldiers_still_being_added: true,
        ..Unit::new(Allegiance::Azuki, DVec3::Z)
    });

    let soldiers: VecDeque<PlannedSoldier> = (0..recruits)
        .map(|i| {
            let slot = DVec3::new(8.0 * i as f64, 0.0, 30.0);
            PlannedSoldier {
                position: slot,
                yaw: 0.0,
                health,
                assembly_point: slot,
            }
        })
        .collect();
    let mut tower = BannerTower::new(DVec3::ZERO, Allegiance::Azuki);
    tower.pending_units.push_back(PendingUnit { soldiers, unit_id });
    let tower_id = battle.add_tower(tower);

    (battle, tower_id, unit_id)
}

/// Input script holding nothing.
#[must_use]
pub fn idle_script(_tick: u64) -> InputSnapshot {
    InputSnapshot::default()
}
