//! # Legion Core
//!
//! Deterministic battle simulation for Azuki vs Edamame.
//!
//! This crate contains **only** the simulation:
//! - No rendering
//! - No IO
//! - No unseeded randomness
//!
//! This separation enables:
//! - Headless runs and scenario tests
//! - Save games (the whole [`Battle`](simulation::Battle) serializes)
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`store`] - Handle-addressed entity arena
//! - [`components`] - Entity data definitions
//! - [`animation`] - Animation clocks and hit timing
//! - [`orders`] - Unit order state machine
//! - [`combat`] - Target acquisition and damage
//! - [`flight`] - Dragonfly flight state machine
//! - [`kings`] - Player control, safezones, and king deaths
//! - [`towers`] - Banner tower capture and reinforcement
//! - [`deployment`] - Deployment and command staging
//! - [`simulation`] - Battle state and tick driver

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod animation;
pub mod combat;
pub mod components;
pub mod config;
pub mod deployment;
pub mod error;
pub mod flight;
pub mod input;
pub mod kings;
pub mod math;
pub mod orders;
pub mod setup;
pub mod simulation;
pub mod store;
pub mod towers;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::animation::{AttackClip, ClipTable, SoldierAnimation, SoldierAnimationKind};
    pub use crate::combat::DamageEvent;
    pub use crate::components::*;
    pub use crate::config::{
        BattleConfig, CombatConfig, DeploymentConfig, FlightConfig, HealthConfig, ModelConstants,
        MovementConfig, TowerConfig,
    };
    pub use crate::deployment::{GroundCursor, PendingCommand, PlannedDeployment, PlannedUnit};
    pub use crate::error::{Result, SimError};
    pub use crate::input::{InputSnapshot, KeySet, Pointer};
    pub use crate::math::Orientation;
    pub use crate::simulation::{Battle, FlightTransition, TickEvents, TowerCapture};
    pub use crate::store::{Entity, EntityKind, EntityStore, Ref};
    pub use crate::towers::Occupancy;
}
