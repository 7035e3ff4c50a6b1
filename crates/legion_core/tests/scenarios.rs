//! End-to-end battle scenarios.

use glam::DVec3;
use legion_core::prelude::*;
use legion_test_utils::determinism::{
    find_first_divergence, verify_battle_determinism, verify_serialization_determinism,
};
use legion_test_utils::fixtures;

fn idle() -> InputSnapshot {
    InputSnapshot::default()
}

fn position(battle: &Battle, soldier: Ref) -> DVec3 {
    battle.entities().soldier(soldier).position
}

fn is_engaged(battle: &Battle, soldiers: &[Ref]) -> bool {
    soldiers
        .iter()
        .any(|&id| battle.entities().soldier(id).attack_target.is_some())
}

#[test]
fn advancing_units_make_contact_when_first_in_range() {
    let mut battle = fixtures::kings_only();
    let (_, azuki) = fixtures::add_squad(
        &mut battle,
        Allegiance::Azuki,
        UnitOrder::Advance,
        0.0,
        &[DVec3::ZERO],
    );
    let (_, edamame) = fixtures::add_squad(
        &mut battle,
        Allegiance::Edamame,
        UnitOrder::Advance,
        std::f64::consts::PI,
        &[DVec3::new(0.0, 0.0, -1000.0)],
    );
    let (azuki, edamame) = (azuki[0], edamame[0]);
    let soldiers = [azuki, edamame];
    let range_squared = battle.config().combat.spear_attack_range_squared;

    let mut last_distance = f64::INFINITY;
    let mut contact_tick = None;
    for tick in 0..40_000u64 {
        let edamame_before = position(&battle, edamame);
        let distance_before = position(&battle, azuki).distance_squared(edamame_before);
        assert!(distance_before < last_distance, "distance grew at tick {tick}");
        last_distance = distance_before;

        battle.tick(&idle());

        // Azuki moves first, so Edamame looks from where Azuki now stands.
        let seen_by_edamame = position(&battle, azuki).distance_squared(edamame_before);
        let first_in_range = distance_before.min(seen_by_edamame) <= range_squared;

        if is_engaged(&battle, &soldiers) {
            assert!(first_in_range, "contact at tick {tick} while out of range");
            contact_tick = Some(tick);
            break;
        }
        assert!(!first_in_range, "in range at tick {tick} without contact");
        for id in soldiers {
            assert_eq!(
                battle.entities().soldier(id).animation.kind,
                SoldierAnimationKind::Walk
            );
        }
    }

    let contact_tick = contact_tick.expect("units never met");
    // Closing at 2 x 1.5 units per second over 992 units.
    assert!((33_000..33_200).contains(&contact_tick));
}

#[test]
fn fallen_king_explodes_exactly_once() {
    let mut battle = fixtures::kings_only();
    let king = battle.king_id(Allegiance::Azuki);
    battle.entities_mut().king_mut(king).soldier.health = 0.0;
    assert!(!battle.king(Allegiance::Azuki).has_exploded);

    let count = |battle: &Battle| {
        battle
            .soldier_explosions()
            .iter()
            .filter(|e| e.allegiance == Allegiance::Azuki)
            .count()
    };

    let events = battle.tick(&idle());
    assert_eq!(count(&battle), 1);
    assert_eq!(events.explosions_started, 1);
    assert!(battle.king(Allegiance::Azuki).has_exploded);
    assert_eq!(battle.outcome(), BattleOutcome::EdamameWins);

    let events = battle.tick(&idle());
    assert_eq!(count(&battle), 1);
    assert_eq!(events.explosions_started, 0);
}

#[test]
fn tower_drains_roster_in_three_intervals() {
    let (mut battle, tower, unit) = fixtures::tower_with_roster(3);
    let delay = battle.config().towers.soldier_deployment_delay_seconds;
    let ticks_per_interval = (delay / battle.config().tick_seconds()).round() as u64;

    let spawned_after_first = battle.tick(&idle()).spawned_soldiers.len();
    assert_eq!(spawned_after_first, 1);

    battle.run(3 * ticks_per_interval - 1, &idle());

    let tower = battle.entities().tower(tower);
    let unit = battle.entities().unit(unit);
    assert!(tower.pending_units.is_empty());
    assert_eq!(unit.soldier_ids.len(), 3);
    assert!(!unit.are_soldiers_still_being_added);
}

#[test]
fn deployed_unit_assembles_then_storms() {
    let mut battle = fixtures::kings_only();
    let tower = battle.add_tower(BannerTower::new(DVec3::ZERO, Allegiance::Azuki));

    battle.begin_deployment(DVec3::new(0.0, 0.0, 20.0));
    battle
        .update_planned_unit(&DVec3::new(17.0, 0.0, 20.0))
        .unwrap();
    battle.end_deployment_drag().unwrap();
    let unit = battle.commit_deployment(tower).unwrap();
    let slots: Vec<DVec3> = battle.entities().tower(tower).pending_units[0]
        .soldiers
        .iter()
        .map(|planned| planned.assembly_point)
        .collect();
    assert_eq!(slots.len(), 2);

    let mut assembled = false;
    for _ in 0..6_000 {
        let events = battle.tick(&idle());
        if events.assembled_units.contains(&unit) {
            assembled = true;
            break;
        }
    }
    assert!(assembled, "unit never finished assembling");

    let unit = battle.entities().unit(unit);
    assert_eq!(unit.order, UnitOrder::Storm);
    let tolerance = battle.config().movement.assembly_tolerance_squared;
    for (&id, slot) in unit.soldier_ids.iter().zip(&slots) {
        let soldier = battle.entities().soldier(id);
        assert!(soldier.position.distance_squared(*slot) < tolerance);
        assert_eq!(soldier.animation.kind, SoldierAnimationKind::Idle);
    }
}

#[test]
fn every_retired_soldier_hands_a_spear_to_the_enemy() {
    let mut battle = fixtures::default_battle();
    let events = battle.run(3_000, &idle());

    let retired: usize = events.iter().map(|e| e.retired_soldiers.len()).sum();
    let damage: usize = events.iter().map(|e| e.damage.len()).sum();
    assert!(damage > 0, "legions never fought");

    let spears = battle.hand(Allegiance::Azuki).spear_count
        + battle.hand(Allegiance::Edamame).spear_count;
    assert_eq!(spears as usize, retired);

    for &unit_id in battle.active_unit_ids() {
        for &soldier in &battle.entities().unit(unit_id).soldier_ids {
            assert!(!events.iter().any(|e| e.retired_soldiers.contains(&soldier)));
        }
    }
}

#[test]
fn contested_tower_survives_a_full_skirmish() {
    let mut battle = fixtures::kings_only();
    let tower = battle.add_tower(BannerTower::new(DVec3::ZERO, Allegiance::Edamame));
    fixtures::add_squad(
        &mut battle,
        Allegiance::Azuki,
        UnitOrder::Storm,
        0.0,
        &[DVec3::new(2.0, 0.0, 3.0)],
    );
    fixtures::add_squad(
        &mut battle,
        Allegiance::Edamame,
        UnitOrder::Storm,
        std::f64::consts::PI,
        &[DVec3::new(2.0, 0.0, -3.0)],
    );

    // Both spears stand in the territory from the first tick.
    let events = battle.tick(&idle());
    assert!(events.tower_captures.is_empty());
    assert_eq!(battle.entities().tower(tower).allegiance, Allegiance::Edamame);
}

#[test]
fn default_battle_is_deterministic() {
    assert!(verify_battle_determinism(
        fixtures::default_battle,
        fixtures::idle_script,
        1_000
    ));
}

#[test]
fn flight_is_deterministic_under_scripted_input() {
    let script = |tick: u64| {
        let mut input = InputSnapshot::default();
        input.pointer.is_locked = true;
        input.keys.r = tick < 5;
        input.keys.t = (50..250).contains(&tick);
        input.pointer.x = 0.45;
        input
    };
    assert_eq!(
        find_first_divergence(fixtures::default_battle, script, 600),
        None
    );
}

#[test]
fn save_and_restore_mid_battle() {
    assert!(verify_serialization_determinism(
        fixtures::default_battle,
        500
    ));
}
