//! Error types for the battle simulation.
//!
//! The tick itself never fails: handle and variant violations inside a tick
//! are caller bugs and panic with these messages. The variants below are
//! returned from the staging and lookup APIs the presentation layer calls
//! between ticks.

use thiserror::Error;

use crate::store::{EntityKind, Ref};

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Handle outside the arena's current length.
    #[error("Invalid handle: {0}")]
    InvalidHandle(Ref),

    /// Handle names a different kind of entity than the caller expected.
    #[error("Entity {handle} is a {actual:?}, expected {expected:?}")]
    KindMismatch {
        /// The handle that was dereferenced.
        handle: Ref,
        /// Kind the caller asked for.
        expected: EntityKind,
        /// Kind actually stored in the slot.
        actual: EntityKind,
    },

    /// Deployment drag too short to derive a facing direction.
    #[error("Deployment drag of length {length} is shorter than the minimum {minimum}")]
    DegenerateDeployment {
        /// Length of the start-to-cursor drag.
        length: f64,
        /// Configured minimum drag length.
        minimum: f64,
    },

    /// A deployment operation needs a drag in progress.
    #[error("No deployment drag is in progress")]
    NotADeploymentDrag,

    /// Commit requested with nothing planned, or while still dragging.
    #[error("No planned unit is ready to commit")]
    NoPlannedUnit,

    /// Target tower cannot receive the planned unit.
    #[error("Tower {0} cannot receive this deployment")]
    InvalidDeploymentTower(Ref),

    /// Failed to encode or decode battle state.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Failed to parse a RON configuration.
    #[error("Failed to parse config: {0}")]
    ConfigParse(String),
}
