//! JSON protocol for headless battle communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Battle state updates and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","tick":0}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner answers every command with one or more responses
//! 4. When the first king falls, outputs `{"type":"game_over",...}` once
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! -> {"cmd":"begin_deployment","x":0.0,"z":20.0}
//! <- {"type":"ack","cmd":"begin_deployment"}
//! -> {"cmd":"update_deployment","x":24.0,"z":20.0}
//! <- {"type":"planned","soldiers":3}
//! -> {"cmd":"end_deployment"}
//! <- {"type":"ack","cmd":"end_deployment"}
//! -> {"cmd":"commit_deployment","tower":7}
//! <- {"type":"deployed","unit":31,"tower":7}
//! -> {"cmd":"tick","count":100,"input":{"keys":{"w":true}}}
//! <- {"type":"ticked","tick":100,"events":{...}}
//! ```

use legion_core::components::{Allegiance, BattleOutcome, FlightState, UnitOrder};
use legion_core::input::InputSnapshot;
use legion_core::simulation::TickEvents;
use serde::{Deserialize, Serialize};

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the battle by N ticks (default: 1) holding `input`.
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
        #[serde(default)]
        input: InputSnapshot,
    },

    /// Query current battle state without advancing time.
    Query,

    /// Report the current state hash (for determinism verification).
    Hash,

    /// Start a deployment drag at a ground point.
    BeginDeployment { x: f64, z: f64 },

    /// Move the cursor end of the deployment drag.
    UpdateDeployment { x: f64, z: f64 },

    /// Release the deployment drag, keeping the plan.
    EndDeployment,

    /// Hand the planned unit to a banner tower.
    CommitDeployment { tower: u32 },

    /// Stage a retreat command.
    Retreat,

    /// Stage a patrol around a ground point.
    Patrol { x: f64, z: f64 },

    /// Drop whatever command is staged.
    Cancel,

    /// Select or deselect a unit.
    Select {
        unit: u32,
        #[serde(default = "default_selected")]
        selected: bool,
    },

    /// Write the battle to a file.
    Save { path: String },

    /// Replace the battle with one read from a file.
    Load { path: String },

    /// Replace the battle with a scenario's opening.
    LoadScenario { path: String },

    /// Quit the runner.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

fn default_selected() -> bool {
    true
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready { version: String, tick: u64 },

    /// Acknowledgment of a command.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Ticks were simulated.
    Ticked { tick: u64, events: EventSummary },

    /// Current battle state.
    State(BattleState),

    /// The planned unit after a cursor update.
    Planned { soldiers: usize },

    /// A planned unit was queued at a tower.
    Deployed { unit: u32, tower: u32 },

    /// The first king fell.
    GameOver { outcome: Outcome, ticks: u64 },

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Counts of what happened over one or more ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub stabs_and_slashes: usize,
    pub soldiers_retired: usize,
    pub soldiers_spawned: usize,
    pub towers_captured: usize,
    pub explosions: u32,
    pub flight_transitions: usize,
    pub units_assembled: usize,
}

impl EventSummary {
    /// Fold one tick's events into the summary.
    pub fn absorb(&mut self, events: &TickEvents) {
        self.stabs_and_slashes += events.damage.len();
        self.soldiers_retired += events.retired_soldiers.len();
        self.soldiers_spawned += events.spawned_soldiers.len();
        self.towers_captured += events.tower_captures.len();
        self.explosions += events.explosions_started;
        self.flight_transitions += events.flight_transitions.len();
        self.units_assembled += events.assembled_units.len();
    }
}

/// Snapshot of the whole battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleState {
    pub tick: u64,
    pub outcome: Outcome,
    pub kings: Vec<KingState>,
    pub units: Vec<UnitState>,
    pub towers: Vec<TowerState>,
    pub dragonflies: Vec<DragonflyState>,
    pub spears: SpearCounts,
    pub hash: u64,
}

/// State of one king.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KingState {
    pub id: u32,
    pub faction: Faction,
    pub position: [f64; 3],
    pub health: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dragonfly: Option<u32>,
}

/// State of one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitState {
    pub id: u32,
    pub faction: Faction,
    pub order: Order,
    pub soldiers: usize,
    pub recruiting: bool,
    pub selected: bool,
}

/// State of one banner tower.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TowerState {
    pub id: u32,
    pub faction: Faction,
    pub position: [f64; 3],
    pub queued_soldiers: usize,
}

/// State of one dragonfly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DragonflyState {
    pub id: u32,
    pub flight: Flight,
    pub position: [f64; 3],
    pub speed: f64,
}

/// Spears collected by each faction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpearCounts {
    pub azuki: u32,
    pub edamame: u32,
}

/// Faction as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Azuki,
    Edamame,
}

impl From<Allegiance> for Faction {
    fn from(allegiance: Allegiance) -> Self {
        match allegiance {
            Allegiance::Azuki => Self::Azuki,
            Allegiance::Edamame => Self::Edamame,
        }
    }
}

/// Unit order as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    Advance,
    Storm,
    Assemble,
}

impl From<UnitOrder> for Order {
    fn from(order: UnitOrder) -> Self {
        match order {
            UnitOrder::Advance => Self::Advance,
            UnitOrder::Storm => Self::Storm,
            UnitOrder::Assemble => Self::Assemble,
        }
    }
}

/// Flight state as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flight {
    Resting,
    Flying,
    Landing,
}

impl From<FlightState> for Flight {
    fn from(state: FlightState) -> Self {
        match state {
            FlightState::Resting => Self::Resting,
            FlightState::Flying => Self::Flying,
            FlightState::Landing => Self::Landing,
        }
    }
}

/// Battle outcome as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Undecided,
    AzukiWins,
    EdamameWins,
}

impl From<BattleOutcome> for Outcome {
    fn from(outcome: BattleOutcome) -> Self {
        match outcome {
            BattleOutcome::Undecided => Self::Undecided,
            BattleOutcome::AzukiWins => Self::AzukiWins,
            BattleOutcome::EdamameWins => Self::EdamameWins,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: "1.0".to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::BeginDeployment { .. } => "begin_deployment",
            Self::UpdateDeployment { .. } => "update_deployment",
            Self::EndDeployment => "end_deployment",
            Self::CommitDeployment { .. } => "commit_deployment",
            Self::Retreat => "retreat",
            Self::Patrol { .. } => "patrol",
            Self::Cancel => "cancel",
            Self::Select { .. } => "select",
            Self::Save { .. } => "save",
            Self::Load { .. } => "load",
            Self::LoadScenario { .. } => "load_scenario",
            Self::Quit => "quit",
        }
    }
}
