//! Battle state and the fixed-timestep tick driver.
//!
//! [`Battle`] owns every entity plus the active-id lists that decide which of
//! them the tick visits. One call to [`Battle::tick`] advances one fixed
//! time-slice and runs the subsystems in this order:
//!
//! 1. **Dragonflies** - flight state machines
//! 2. **Kings** - player control, mounting, safezones, deaths
//! 3. **Units** - retire the dead, then run each unit's order
//! 4. **Banner towers** - capture and reinforcement
//! 5. **Explosions** - decay cosmetic effects
//!
//! Between ticks the presentation layer reads the battle through `&Battle`
//! and stages player intent through the deployment API.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::DVec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::combat::DamageEvent;
use crate::components::{
    Allegiance, BannerTower, BattleOutcome, Dragonfly, FlightState, Hand, King, Soldier,
    SoldierExplosion, Unit,
};
use crate::config::BattleConfig;
use crate::deployment::{PendingCommand, PlannedDeployment};
use crate::error::{Result, SimError};
use crate::input::InputSnapshot;
use crate::store::{EntityStore, Ref};

/// Tower ownership change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TowerCapture {
    /// Captured tower.
    pub tower: Ref,
    /// Previous owner.
    pub from: Allegiance,
    /// New owner.
    pub to: Allegiance,
}

/// Dragonfly flight state change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightTransition {
    /// Dragonfly that changed state.
    pub dragonfly: Ref,
    /// State before.
    pub from: FlightState,
    /// State after.
    pub to: FlightState,
}

/// Events generated during a battle tick.
///
/// The presentation layer uses these to trigger sounds and effects without
/// diffing the whole battle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Every landed stab and slash.
    pub damage: Vec<DamageEvent>,
    /// Dead soldiers spliced out of their units.
    pub retired_soldiers: Vec<Ref>,
    /// Soldiers deployed by banner towers.
    pub spawned_soldiers: Vec<Ref>,
    /// Towers that changed hands.
    pub tower_captures: Vec<TowerCapture>,
    /// Number of explosions started.
    pub explosions_started: u32,
    /// Dragonfly flight state changes.
    pub flight_transitions: Vec<FlightTransition>,
    /// Units that finished assembling and now storm.
    pub assembled_units: Vec<Ref>,
    /// Kings that died this tick.
    pub fallen_kings: Vec<Allegiance>,
}

/// Per-tick scratch shared by the subsystems.
pub(crate) struct TickContext {
    /// Seconds in this tick.
    pub dt: f64,
    rng: SmallRng,
    /// Events collected so far.
    pub events: TickEvents,
}

impl TickContext {
    fn new(config: &BattleConfig, tick: u64) -> Self {
        let seed = config.seed ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self {
            dt: config.tick_seconds(),
            rng: SmallRng::seed_from_u64(seed),
            events: TickEvents::default(),
        }
    }

    #[cfg(test)]
    pub fn for_tests(dt: f64) -> Self {
        Self {
            dt,
            rng: SmallRng::seed_from_u64(0),
            events: TickEvents::default(),
        }
    }

    /// Random stab pre-roll in `[0, max_delay)`.
    pub fn stab_pre_roll(&mut self, max_delay: f64) -> f64 {
        self.rng.random::<f64>() * max_delay
    }
}

/// Complete state of one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    pub(crate) config: BattleConfig,
    pub(crate) tick: u64,
    pub(crate) entities: EntityStore,
    pub(crate) azuki_king: Ref,
    pub(crate) edamame_king: Ref,
    pub(crate) active_unit_ids: Vec<Ref>,
    pub(crate) active_tower_ids: Vec<Ref>,
    pub(crate) active_dragonfly_ids: Vec<Ref>,
    pub(crate) soldier_explosions: Vec<SoldierExplosion>,
    pub(crate) azuki_hand: Hand,
    pub(crate) edamame_hand: Hand,
    pub(crate) planned_deployment: PlannedDeployment,
    pub(crate) pending_command: PendingCommand,
    pub(crate) outcome: BattleOutcome,
}

impl Battle {
    /// Create a battle containing only the two kings.
    ///
    /// # Example
    ///
    /// ```
    /// use glam::DVec3;
    /// use legion_core::prelude::*;
    ///
    /// let config = BattleConfig::default();
    /// let battle = Battle::new(
    ///     config,
    ///     King::new(DVec3::new(0.0, 0.0, 20.0), 0.0, config.health.king),
    ///     King::new(DVec3::new(0.0, 0.0, -100.0), std::f64::consts::PI, config.health.king),
    /// );
    /// assert_eq!(battle.tick_count(), 0);
    /// assert_eq!(battle.outcome(), BattleOutcome::Undecided);
    /// ```
    #[must_use]
    pub fn new(config: BattleConfig, azuki_king: King, edamame_king: King) -> Self {
        let mut entities = EntityStore::new();
        let azuki_king = entities.add(azuki_king);
        let edamame_king = entities.add(edamame_king);
        Self {
            config,
            tick: 0,
            entities,
            azuki_king,
            edamame_king,
            active_unit_ids: Vec::new(),
            active_tower_ids: Vec::new(),
            active_dragonfly_ids: Vec::new(),
            soldier_explosions: Vec::new(),
            azuki_hand: Hand::default(),
            edamame_hand: Hand::default(),
            planned_deployment: PlannedDeployment::default(),
            pending_command: PendingCommand::default(),
            outcome: BattleOutcome::default(),
        }
    }

    /// Rules this battle runs under.
    #[must_use]
    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Number of ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// The entity arena.
    #[must_use]
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// The entity arena, mutably. Only for scenario setup between ticks.
    pub fn entities_mut(&mut self) -> &mut EntityStore {
        &mut self.entities
    }

    /// Handle of the king of `allegiance`.
    #[must_use]
    pub const fn king_id(&self, allegiance: Allegiance) -> Ref {
        match allegiance {
            Allegiance::Azuki => self.azuki_king,
            Allegiance::Edamame => self.edamame_king,
        }
    }

    /// King of `allegiance`.
    #[must_use]
    pub fn king(&self, allegiance: Allegiance) -> &King {
        self.entities.king(self.king_id(allegiance))
    }

    /// Units visited by the tick, in tick order.
    #[must_use]
    pub fn active_unit_ids(&self) -> &[Ref] {
        &self.active_unit_ids
    }

    /// Banner towers visited by the tick, in tick order.
    #[must_use]
    pub fn active_tower_ids(&self) -> &[Ref] {
        &self.active_tower_ids
    }

    /// Dragonflies visited by the tick, in tick order.
    #[must_use]
    pub fn active_dragonfly_ids(&self) -> &[Ref] {
        &self.active_dragonfly_ids
    }

    /// Explosions still playing.
    #[must_use]
    pub fn soldier_explosions(&self) -> &[SoldierExplosion] {
        &self.soldier_explosions
    }

    /// Spears collected by `allegiance`.
    #[must_use]
    pub const fn hand(&self, allegiance: Allegiance) -> Hand {
        match allegiance {
            Allegiance::Azuki => self.azuki_hand,
            Allegiance::Edamame => self.edamame_hand,
        }
    }

    pub(crate) fn hand_mut(&mut self, allegiance: Allegiance) -> &mut Hand {
        match allegiance {
            Allegiance::Azuki => &mut self.azuki_hand,
            Allegiance::Edamame => &mut self.edamame_hand,
        }
    }

    /// Deployment staging record.
    #[must_use]
    pub fn planned_deployment(&self) -> &PlannedDeployment {
        &self.planned_deployment
    }

    /// Command staging record.
    #[must_use]
    pub fn pending_command(&self) -> &PendingCommand {
        &self.pending_command
    }

    /// Battle result so far.
    #[must_use]
    pub const fn outcome(&self) -> BattleOutcome {
        self.outcome
    }

    /// Add a unit and make it active.
    pub fn add_unit(&mut self, unit: Unit) -> Ref {
        let id = self.entities.add(unit);
        self.active_unit_ids.push(id);
        id
    }

    /// Add a soldier to the arena and enlist it in `unit_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `unit_id` does not name a unit.
    pub fn enlist_soldier(&mut self, unit_id: Ref, soldier: Soldier) -> Result<Ref> {
        self.entities.try_unit(unit_id)?;
        let id = self.entities.add(soldier);
        self.entities.unit_mut(unit_id).soldier_ids.push(id);
        Ok(id)
    }

    /// Add a banner tower and make it active.
    pub fn add_tower(&mut self, tower: BannerTower) -> Ref {
        let id = self.entities.add(tower);
        self.active_tower_ids.push(id);
        id
    }

    /// Add a dragonfly and make it active.
    pub fn add_dragonfly(&mut self, dragonfly: Dragonfly) -> Ref {
        let id = self.entities.add(dragonfly);
        self.active_dragonfly_ids.push(id);
        id
    }

    /// Advance the battle by one tick.
    ///
    /// `input` is only read. Returns the events generated during the tick.
    ///
    /// # Panics
    ///
    /// Panics if an active-id list or a soldier target names the wrong kind
    /// of entity; that is a bug in list maintenance, not a recoverable state.
    pub fn tick(&mut self, input: &InputSnapshot) -> TickEvents {
        let mut ctx = TickContext::new(&self.config, self.tick);

        self.tick_dragonflies(input, &mut ctx);
        self.tick_kings(input, &mut ctx);
        self.tick_units(&mut ctx);
        self.tick_banner_towers(&mut ctx);
        self.tick_soldier_explosions(ctx.dt);

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Battle state hash");
        }

        ctx.events
    }

    /// Run `ticks` ticks with the same input.
    pub fn run(&mut self, ticks: u64, input: &InputSnapshot) -> Vec<TickEvents> {
        (0..ticks).map(|_| self.tick(input)).collect()
    }

    fn tick_soldier_explosions(&mut self, dt: f64) {
        let duration = self.config.clips.soldier_explosion_clip_duration;
        for explosion in &mut self.soldier_explosions {
            explosion.time_in_seconds += dt;
        }
        self.soldier_explosions
            .retain(|explosion| explosion.time_in_seconds <= duration);
    }

    pub(crate) fn start_explosion(&mut self, explosion: SoldierExplosion, ctx: &mut TickContext) {
        self.soldier_explosions.push(explosion);
        ctx.events.explosions_started += 1;
    }

    /// Calculate a hash of the current battle state.
    ///
    /// Two battles with identical state produce identical hashes. The hash
    /// covers exactly the bytes [`Battle::serialize`] writes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let encoded = self.serialize();
        if let Err(e) = &encoded {
            tracing::warn!(tick = self.tick, "State hash over empty encoding: {e}");
        }
        debug_assert!(encoded.is_ok(), "battle state failed to encode");
        let bytes = encoded.unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize the battle for save games or replays.
    ///
    /// Handles are written as the raw integers they are.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SimError::Serialization(format!("Failed to serialize battle: {e}")))
    }

    /// Deserialize a battle from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| SimError::Serialization(format!("Failed to deserialize battle: {e}")))
    }

    /// Position of the soldier or king behind `handle`.
    pub(crate) fn soldier_position(&self, handle: Ref) -> DVec3 {
        self.entities.soldier(handle).position
    }
}
