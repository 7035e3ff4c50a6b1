//! Headless battle runner for scripted play and CI verification.
//!
//! This crate drives a [`Battle`](legion_core::simulation::Battle) without
//! graphics, either interactively through JSON commands on stdin or from a
//! RON scenario file. This enables:
//!
//! - **Scripted play**: An external controller can deploy units and fly the king
//! - **CI verification**: Scenarios run to completion and report a state hash
//! - **Save verification**: Saved battles resume with identical results
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (tick, deploy, query, etc.)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":100}' | cargo run -p legion_headless -- serve
//!
//! # Run a scenario
//! cargo run -p legion_headless -- run --scenario scenarios/opening.ron
//! ```

pub mod protocol;
pub mod runner;
pub mod scenario;

pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use scenario::{Opening, Scenario, ScenarioError, ScenarioReport};
