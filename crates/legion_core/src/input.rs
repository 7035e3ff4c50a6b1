//! Player input snapshot.
//!
//! The presentation layer polls keyboard and pointer once per frame and hands
//! the simulation a plain copy. The simulation never writes it back.

use serde::{Deserialize, Serialize};

/// Keys the battle reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySet {
    /// Walk the king forward.
    pub w: bool,
    /// Throttle up.
    pub t: bool,
    /// Throttle down.
    pub g: bool,
    /// Mount a nearby dragonfly.
    pub r: bool,
    /// Request landing.
    pub v: bool,
    /// Slash.
    pub space: bool,
}

/// Pointer position normalized to `[0, 1]` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pointer {
    /// Horizontal position; 0.5 is centered.
    pub x: f64,
    /// Vertical position; 0.5 is centered.
    pub y: f64,
    /// Whether the pointer is captured by the game window.
    pub is_locked: bool,
}

impl Default for Pointer {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            is_locked: false,
        }
    }
}

/// Input held during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSnapshot {
    /// Held keys.
    pub keys: KeySet,
    /// Pointer state.
    pub pointer: Pointer,
}
