//! Deployment and command staging.
//!
//! The presentation layer calls these between ticks. A deployment is a drag
//! on the ground: [`Battle::begin_deployment`] anchors it,
//! [`Battle::update_planned_unit`] lays out one rank of soldiers along the
//! drag, [`Battle::end_deployment_drag`] releases the mouse, and
//! [`Battle::commit_deployment`] turns the plan into an assembling unit fed
//! by a banner tower.
//!
//! Nothing here runs inside a tick, and nothing but
//! [`Battle::commit_deployment`] touches the entity store.

use std::collections::VecDeque;
use std::f64::consts::{FRAC_PI_2, PI};

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::components::{Allegiance, BannerTower, PendingUnit, PlannedSoldier, Unit, UnitOrder};
use crate::error::{Result, SimError};
use crate::math::{rotate_about_y, yaw_of};
use crate::simulation::Battle;
use crate::store::Ref;

/// Answer to "where does the pointer meet the ground?".
///
/// Implemented by whatever the renderer uses to raycast; plain points and
/// optional points work out of the box.
pub trait GroundCursor {
    /// World-space ground point, or `None` if the pointer misses the ground.
    fn ground_point(&self) -> Option<DVec3>;
}

impl GroundCursor for DVec3 {
    fn ground_point(&self) -> Option<DVec3> {
        Some(*self)
    }
}

impl GroundCursor for Option<DVec3> {
    fn ground_point(&self) -> Option<DVec3> {
        *self
    }
}

/// A unit laid out on the ground but not yet committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedUnit {
    /// Roster in deployment order.
    pub soldiers: VecDeque<PlannedSoldier>,
    /// Formation axis of the unit to be created.
    pub forward: DVec3,
    /// Faction the unit will fight for.
    pub allegiance: Allegiance,
}

/// Deployment drag staging record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannedDeployment {
    /// Drag anchor while the drag is in progress.
    pub start: Option<DVec3>,
    /// Latest layout.
    pub planned_unit: Option<PlannedUnit>,
}

/// Player intent awaiting a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PendingCommand {
    /// Nothing staged.
    #[default]
    None,
    /// Laying out a deployment.
    Deploy,
    /// Choosing a tower to fall back to.
    Retreat,
    /// Choosing the radius of a patrol area.
    Patrol {
        /// Patrol area center.
        center: DVec3,
    },
}

impl Battle {
    /// Anchor a new deployment drag at `point`, discarding any earlier plan.
    pub fn begin_deployment(&mut self, point: DVec3) {
        self.planned_deployment = PlannedDeployment {
            start: Some(point),
            planned_unit: None,
        };
        self.pending_command = PendingCommand::Deploy;
    }

    /// Lay out one rank of soldiers from the drag anchor toward `cursor`.
    ///
    /// A cursor that misses the ground leaves the plan unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NotADeploymentDrag`] if no drag is in progress,
    /// or [`SimError::DegenerateDeployment`] if the drag is too short to
    /// have a direction.
    pub fn update_planned_unit(&mut self, cursor: &impl GroundCursor) -> Result<()> {
        let start = self
            .planned_deployment
            .start
            .ok_or(SimError::NotADeploymentDrag)?;
        let Some(point) = cursor.ground_point() else {
            return Ok(());
        };

        let rules = self.config.deployment;
        let drag = point - start;
        let length = drag.length();
        if length < rules.min_drag_length {
            return Err(SimError::DegenerateDeployment {
                length,
                minimum: rules.min_drag_length,
            });
        }

        let width = ((length / rules.rank_gap).floor() as usize).max(1);
        let forward = rotate_about_y(drag / length, -FRAC_PI_2);
        let soldiers = formation(
            start,
            forward,
            (width, 1),
            (rules.rank_gap, rules.file_gap),
            self.config.health.soldier,
        );

        self.planned_deployment.planned_unit = Some(PlannedUnit {
            soldiers,
            forward,
            allegiance: Allegiance::Azuki,
        });
        Ok(())
    }

    /// Release the drag, keeping the latest plan for commit.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NotADeploymentDrag`] if no drag is in progress.
    pub fn end_deployment_drag(&mut self) -> Result<()> {
        self.planned_deployment
            .start
            .take()
            .map(|_| ())
            .ok_or(SimError::NotADeploymentDrag)
    }

    /// Turn the finished plan into an assembling unit recruited at `tower_id`.
    ///
    /// Returns the new unit. The plan is consumed only on success.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoPlannedUnit`] while dragging or with nothing
    /// planned, or [`SimError::InvalidDeploymentTower`] if `tower_id` is not
    /// an active, non-preview tower of the plan's faction.
    pub fn commit_deployment(&mut self, tower_id: Ref) -> Result<Ref> {
        if self.planned_deployment.start.is_some() {
            warn!("Deployment committed mid-drag");
            return Err(SimError::NoPlannedUnit);
        }
        let Some(allegiance) = self
            .planned_deployment
            .planned_unit
            .as_ref()
            .map(|plan| plan.allegiance)
        else {
            warn!("Deployment committed with nothing planned");
            return Err(SimError::NoPlannedUnit);
        };

        let usable = self.active_tower_ids.contains(&tower_id)
            && self
                .entities
                .try_tower(tower_id)
                .is_ok_and(|tower| !tower.is_preview && tower.allegiance == allegiance);
        if !usable {
            warn!(tower = %tower_id, ?allegiance, "Deployment rejected by tower");
            return Err(SimError::InvalidDeploymentTower(tower_id));
        }

        let Some(plan) = self.planned_deployment.planned_unit.take() else {
            return Err(SimError::NoPlannedUnit);
        };
        let recruits = plan.soldiers.len();
        let unit_id = self.add_unit(Unit {
            order: UnitOrder::Assemble,
            are_soldiers_still_being_added: true,
            ..Unit::new(plan.allegiance, plan.forward)
        });
        self.entities
            .tower_mut(tower_id)
            .pending_units
            .push_back(PendingUnit {
                soldiers: plan.soldiers,
                unit_id,
            });
        self.pending_command = PendingCommand::None;

        debug!(unit = %unit_id, tower = %tower_id, recruits, "Deployment committed");
        Ok(unit_id)
    }

    /// Nearest active tower accepted by `filter`, by 3D distance.
    #[must_use]
    pub fn nearest_banner_tower(
        &self,
        point: DVec3,
        filter: impl Fn(&BannerTower) -> bool,
    ) -> Option<Ref> {
        let mut nearest = None;
        let mut best = f64::INFINITY;
        for &id in &self.active_tower_ids {
            let tower = self.entities.tower(id);
            if !filter(tower) {
                continue;
            }
            let distance_squared = point.distance_squared(tower.position);
            if distance_squared < best {
                best = distance_squared;
                nearest = Some(id);
            }
        }
        nearest
    }

    /// Stage a retreat; the UI then picks a destination tower.
    pub fn stage_retreat(&mut self) {
        self.pending_command = PendingCommand::Retreat;
    }

    /// Stage a patrol around `center`; the UI then picks a radius.
    pub fn stage_patrol(&mut self, center: DVec3) {
        self.pending_command = PendingCommand::Patrol { center };
    }

    /// Radius of the staged patrol area with the pointer at `cursor`.
    ///
    /// `None` unless a patrol is staged and the cursor hits the ground.
    #[must_use]
    pub fn patrol_radius(&self, cursor: &impl GroundCursor) -> Option<f64> {
        let PendingCommand::Patrol { center } = self.pending_command else {
            return None;
        };
        let point = cursor.ground_point()?;
        Some(
            point
                .distance(center)
                .max(self.config.deployment.min_patrol_radius),
        )
    }

    /// Drop whatever command is staged, including a deployment plan.
    pub fn cancel_pending_command(&mut self) {
        if self.pending_command == PendingCommand::Deploy {
            self.planned_deployment = PlannedDeployment::default();
        }
        self.pending_command = PendingCommand::None;
    }

    /// Mark a unit as selected or not.
    ///
    /// # Errors
    ///
    /// Returns an error if `unit_id` does not name a unit.
    pub fn set_unit_selected(&mut self, unit_id: Ref, selected: bool) -> Result<()> {
        self.entities.try_unit_mut(unit_id)?.is_selected = selected;
        Ok(())
    }
}

/// Lay out `width` by `depth` soldiers behind `start`, odd ranks staggered
/// half a gap to the right.
pub(crate) fn formation(
    start: DVec3,
    forward: DVec3,
    (width, depth): (usize, usize),
    (rank_gap, file_gap): (f64, f64),
    health: f64,
) -> VecDeque<PlannedSoldier> {
    let right_step = rotate_about_y(forward, FRAC_PI_2) * rank_gap;
    let back_step = rotate_about_y(forward, PI) * file_gap;
    let yaw = yaw_of(forward);

    let mut soldiers = VecDeque::with_capacity(width * depth);
    for right in 0..width {
        for back in 0..depth {
            let (r, b) = (right as f64, back as f64);
            let stagger = if back % 2 == 1 { 0.5 } else { 0.0 };
            let position = start + right_step * (r + stagger) + back_step * b;
            soldiers.push_back(PlannedSoldier {
                position,
                yaw,
                health,
                assembly_point: position,
            });
        }
    }
    soldiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::King;
    use crate::config::BattleConfig;

    fn new_battle() -> Battle {
        Battle::new(
            BattleConfig::default(),
            King::new(DVec3::new(0.0, 0.0, 20.0), 0.0, 100.0),
            King::new(DVec3::new(0.0, 0.0, -100.0), PI, 100.0),
        )
    }

    fn planned(battle: &Battle) -> &PlannedUnit {
        battle.planned_deployment().planned_unit.as_ref().unwrap()
    }

    #[test]
    fn test_drag_lays_out_one_rank() {
        let mut battle = new_battle();
        battle.begin_deployment(DVec3::ZERO);
        battle
            .update_planned_unit(&DVec3::new(20.0, 0.0, 0.0))
            .unwrap();

        let plan = planned(&battle);
        assert_eq!(plan.soldiers.len(), 2);
        assert_eq!(plan.allegiance, Allegiance::Azuki);
        // Dragging toward +X gives a +Z formation axis.
        assert!((plan.forward - DVec3::Z).length() < 1e-12);

        let second = &plan.soldiers[1];
        assert!((second.position - DVec3::new(8.0, 0.0, 0.0)).length() < 1e-9);
        assert_eq!(second.assembly_point, second.position);
        assert!(second.yaw.abs() < 1e-12);
        assert_eq!(second.health, 100.0);
    }

    #[test]
    fn test_short_drag_still_plans_one_soldier() {
        let mut battle = new_battle();
        battle.begin_deployment(DVec3::ZERO);
        battle.update_planned_unit(&DVec3::new(0.0, 0.0, 3.0)).unwrap();
        assert_eq!(planned(&battle).soldiers.len(), 1);
    }

    #[test]
    fn test_degenerate_drag_is_rejected() {
        let mut battle = new_battle();
        battle.begin_deployment(DVec3::ONE);
        let err = battle.update_planned_unit(&DVec3::ONE).unwrap_err();
        assert!(matches!(err, SimError::DegenerateDeployment { .. }));
        assert!(battle.planned_deployment().planned_unit.is_none());
    }

    #[test]
    fn test_cursor_miss_keeps_plan() {
        let mut battle = new_battle();
        battle.begin_deployment(DVec3::ZERO);
        battle.update_planned_unit(&DVec3::new(16.0, 0.0, 0.0)).unwrap();
        battle.update_planned_unit(&None::<DVec3>).unwrap();
        assert_eq!(planned(&battle).soldiers.len(), 2);
    }

    #[test]
    fn test_update_without_drag_fails() {
        let mut battle = new_battle();
        assert_eq!(
            battle.update_planned_unit(&DVec3::X),
            Err(SimError::NotADeploymentDrag)
        );
        assert_eq!(battle.end_deployment_drag(), Err(SimError::NotADeploymentDrag));
    }

    #[test]
    fn test_commit_creates_assembling_unit_at_tower() {
        let mut battle = new_battle();
        let tower = battle.add_tower(BannerTower::new(
            DVec3::new(0.0, 0.0, 100.0),
            Allegiance::Azuki,
        ));
        battle.begin_deployment(DVec3::ZERO);
        battle.update_planned_unit(&DVec3::new(24.0, 0.0, 0.0)).unwrap();

        assert_eq!(battle.commit_deployment(tower), Err(SimError::NoPlannedUnit));
        battle.end_deployment_drag().unwrap();
        let unit_id = battle.commit_deployment(tower).unwrap();

        let unit = battle.entities().unit(unit_id);
        assert_eq!(unit.order, UnitOrder::Assemble);
        assert!(unit.are_soldiers_still_being_added);
        assert!(unit.soldier_ids.is_empty());
        assert!(battle.active_unit_ids().contains(&unit_id));

        let pending = &battle.entities().tower(tower).pending_units;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].unit_id, unit_id);
        assert_eq!(pending[0].soldiers.len(), 3);
        assert!(battle.planned_deployment().planned_unit.is_none());
        assert_eq!(*battle.pending_command(), PendingCommand::None);
    }

    #[test]
    fn test_commit_rejects_enemy_and_preview_towers() {
        let mut battle = new_battle();
        let enemy = battle.add_tower(BannerTower::new(DVec3::ZERO, Allegiance::Edamame));
        let ghost = battle.add_tower(BannerTower {
            is_preview: true,
            ..BannerTower::new(DVec3::ZERO, Allegiance::Azuki)
        });
        battle.begin_deployment(DVec3::ZERO);
        battle.update_planned_unit(&(DVec3::X * 10.0)).unwrap();
        battle.end_deployment_drag().unwrap();

        assert_eq!(
            battle.commit_deployment(enemy),
            Err(SimError::InvalidDeploymentTower(enemy))
        );
        assert_eq!(
            battle.commit_deployment(ghost),
            Err(SimError::InvalidDeploymentTower(ghost))
        );
        let king = battle.king_id(Allegiance::Azuki);
        assert_eq!(
            battle.commit_deployment(king),
            Err(SimError::InvalidDeploymentTower(king))
        );
        assert!(battle.planned_deployment().planned_unit.is_some());
    }

    #[test]
    fn test_nearest_banner_tower_respects_filter() {
        let mut battle = new_battle();
        let near = battle.add_tower(BannerTower::new(DVec3::X * 10.0, Allegiance::Edamame));
        let far = battle.add_tower(BannerTower::new(DVec3::X * 50.0, Allegiance::Azuki));

        assert_eq!(battle.nearest_banner_tower(DVec3::ZERO, |_| true), Some(near));
        assert_eq!(
            battle.nearest_banner_tower(DVec3::ZERO, |t| t.allegiance == Allegiance::Azuki),
            Some(far)
        );
        assert_eq!(battle.nearest_banner_tower(DVec3::ZERO, |_| false), None);
    }

    #[test]
    fn test_patrol_radius_has_floor() {
        let mut battle = new_battle();
        assert_eq!(battle.patrol_radius(&DVec3::X), None);

        battle.stage_patrol(DVec3::ZERO);
        assert_eq!(battle.patrol_radius(&DVec3::X), Some(10.0));
        assert_eq!(battle.patrol_radius(&DVec3::new(0.0, 0.0, 30.0)), Some(30.0));
        assert_eq!(battle.patrol_radius(&None::<DVec3>), None);
    }

    #[test]
    fn test_cancel_clears_deployment_plan() {
        let mut battle = new_battle();
        battle.begin_deployment(DVec3::ZERO);
        battle.update_planned_unit(&(DVec3::X * 10.0)).unwrap();
        battle.cancel_pending_command();
        assert_eq!(*battle.planned_deployment(), PlannedDeployment::default());

        battle.stage_retreat();
        assert_eq!(*battle.pending_command(), PendingCommand::Retreat);
        battle.cancel_pending_command();
        assert_eq!(*battle.pending_command(), PendingCommand::None);
    }

    #[test]
    fn test_selection_requires_a_unit() {
        let mut battle = new_battle();
        let unit = battle.add_unit(Unit::new(Allegiance::Azuki, DVec3::Z));
        battle.set_unit_selected(unit, true).unwrap();
        assert!(battle.entities().unit(unit).is_selected);

        let king = battle.king_id(Allegiance::Azuki);
        assert!(battle.set_unit_selected(king, true).is_err());
    }
}
