//! Headless battle runner implementation.

use std::io::{self, BufRead, Write};

use glam::DVec3;
use legion_core::components::{Allegiance, BattleOutcome};
use legion_core::simulation::Battle;
use legion_core::store::Ref;
use tracing::{debug, info, warn};

use crate::protocol::{
    BattleState, Command, DragonflyState, EventSummary, KingState, Response, SpearCounts,
    TowerState, UnitState,
};
use crate::scenario::Scenario;

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output full state after every tick command (vs only on query).
    pub auto_state_output: bool,
}

/// Headless runner for externally controlled battles.
pub struct HeadlessRunner {
    config: HeadlessConfig,
    battle: Battle,
    announced_outcome: bool,
    should_quit: bool,
}

impl HeadlessRunner {
    /// Create a runner around an existing battle.
    pub fn new(battle: Battle) -> Self {
        Self::with_config(battle, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    pub fn with_config(battle: Battle, config: HeadlessConfig) -> Self {
        let announced_outcome = battle.outcome() != BattleOutcome::Undecided;
        Self {
            config,
            battle,
            announced_outcome,
            should_quit: false,
        }
    }

    /// The battle being driven.
    pub fn battle(&self) -> &Battle {
        &self.battle
    }

    /// Whether a `quit` command has been handled.
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Serve JSON-lines commands from `reader` until `quit` or end of input.
    pub fn serve<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> io::Result<()> {
        write!(writer, "{}", Response::ready(self.battle.tick_count()).to_json_line())?;
        writer.flush()?;

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let responses = match Command::from_json(line) {
                Ok(cmd) => self.handle(cmd),
                Err(e) => vec![Response::error(format!("Parse error: {e}"), None)],
            };
            for response in responses {
                write!(writer, "{}", response.to_json_line())?;
            }
            writer.flush()?;

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    /// Apply one command and collect the responses it produces.
    pub fn handle(&mut self, cmd: Command) -> Vec<Response> {
        let cmd_name = cmd.name();
        let mut responses = Vec::new();

        match cmd {
            Command::Tick { count, input } => {
                let mut events = EventSummary::default();
                for _ in 0..count {
                    events.absorb(&self.battle.tick(&input));
                }
                responses.push(Response::Ticked {
                    tick: self.battle.tick_count(),
                    events,
                });
                if self.config.auto_state_output {
                    responses.push(Response::State(self.snapshot()));
                }
                if !self.announced_outcome && self.battle.outcome() != BattleOutcome::Undecided {
                    self.announced_outcome = true;
                    responses.push(Response::GameOver {
                        outcome: self.battle.outcome().into(),
                        ticks: self.battle.tick_count(),
                    });
                }
            }

            Command::Query => responses.push(Response::State(self.snapshot())),

            Command::Hash => responses.push(Response::StateHash {
                tick: self.battle.tick_count(),
                hash: self.battle.state_hash(),
            }),

            Command::BeginDeployment { x, z } => {
                self.battle.begin_deployment(ground(x, z));
                responses.push(Response::ack(cmd_name));
            }

            Command::UpdateDeployment { x, z } => {
                match self.battle.update_planned_unit(&ground(x, z)) {
                    Ok(()) => {
                        let soldiers = self
                            .battle
                            .planned_deployment()
                            .planned_unit
                            .as_ref()
                            .map_or(0, |plan| plan.soldiers.len());
                        responses.push(Response::Planned { soldiers });
                    }
                    Err(e) => responses.push(Response::error(e.to_string(), Some(cmd_name))),
                }
            }

            Command::EndDeployment => match self.battle.end_deployment_drag() {
                Ok(()) => responses.push(Response::ack(cmd_name)),
                Err(e) => responses.push(Response::error(e.to_string(), Some(cmd_name))),
            },

            Command::CommitDeployment { tower } => {
                match self.battle.commit_deployment(Ref(tower)) {
                    Ok(unit) => responses.push(Response::Deployed { unit: unit.0, tower }),
                    Err(e) => responses.push(Response::error(e.to_string(), Some(cmd_name))),
                }
            }

            Command::Retreat => {
                self.battle.stage_retreat();
                responses.push(Response::ack(cmd_name));
            }

            Command::Patrol { x, z } => {
                self.battle.stage_patrol(ground(x, z));
                responses.push(Response::ack(cmd_name));
            }

            Command::Cancel => {
                self.battle.cancel_pending_command();
                responses.push(Response::ack(cmd_name));
            }

            Command::Select { unit, selected } => {
                match self.battle.set_unit_selected(Ref(unit), selected) {
                    Ok(()) => responses.push(Response::ack(cmd_name)),
                    Err(e) => responses.push(Response::error(e.to_string(), Some(cmd_name))),
                }
            }

            Command::Save { path } => {
                let saved = self
                    .battle
                    .serialize()
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| std::fs::write(&path, bytes).map_err(|e| e.to_string()));
                match saved {
                    Ok(()) => {
                        debug!(%path, tick = self.battle.tick_count(), "Saved battle");
                        responses.push(Response::ack(cmd_name));
                    }
                    Err(e) => responses.push(Response::error(
                        format!("Failed to save battle: {e}"),
                        Some(cmd_name),
                    )),
                }
            }

            Command::Load { path } => {
                let loaded = std::fs::read(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| Battle::deserialize(&bytes).map_err(|e| e.to_string()));
                match loaded {
                    Ok(battle) => {
                        info!(%path, tick = battle.tick_count(), "Loaded battle");
                        self.replace_battle(battle);
                        responses.push(Response::ack(cmd_name));
                    }
                    Err(e) => responses.push(Response::error(
                        format!("Failed to load battle: {e}"),
                        Some(cmd_name),
                    )),
                }
            }

            Command::LoadScenario { path } => match Scenario::load(&path) {
                Ok(scenario) => {
                    info!("Loaded scenario: {}", scenario.name);
                    self.replace_battle(scenario.battle());
                    responses.push(Response::ack(cmd_name));
                }
                Err(e) => {
                    warn!(%path, error = %e, "Scenario rejected");
                    responses.push(Response::error(
                        format!("Failed to load scenario: {e}"),
                        Some(cmd_name),
                    ));
                }
            },

            Command::Quit => {
                self.should_quit = true;
                responses.push(Response::Bye);
            }
        }

        responses
    }

    fn replace_battle(&mut self, battle: Battle) {
        self.announced_outcome = battle.outcome() != BattleOutcome::Undecided;
        self.battle = battle;
    }

    /// Build a state response from the current battle.
    pub fn snapshot(&self) -> BattleState {
        let battle = &self.battle;
        let entities = battle.entities();

        let kings = [Allegiance::Azuki, Allegiance::Edamame]
            .into_iter()
            .map(|allegiance| {
                let king = battle.king(allegiance);
                KingState {
                    id: battle.king_id(allegiance).0,
                    faction: allegiance.into(),
                    position: king.soldier.position.to_array(),
                    health: king.soldier.health,
                    dragonfly: king.dragonfly.map(|id| id.0),
                }
            })
            .collect();

        let units = battle
            .active_unit_ids()
            .iter()
            .map(|&id| {
                let unit = entities.unit(id);
                UnitState {
                    id: id.0,
                    faction: unit.allegiance.into(),
                    order: unit.order.into(),
                    soldiers: unit.soldier_ids.len(),
                    recruiting: unit.are_soldiers_still_being_added,
                    selected: unit.is_selected,
                }
            })
            .collect();

        let towers = battle
            .active_tower_ids()
            .iter()
            .map(|&id| {
                let tower = entities.tower(id);
                TowerState {
                    id: id.0,
                    faction: tower.allegiance.into(),
                    position: tower.position.to_array(),
                    queued_soldiers: tower.pending_units.iter().map(|p| p.soldiers.len()).sum(),
                }
            })
            .collect();

        let dragonflies = battle
            .active_dragonfly_ids()
            .iter()
            .map(|&id| {
                let dragonfly = entities.dragonfly(id);
                DragonflyState {
                    id: id.0,
                    flight: dragonfly.flight_state.into(),
                    position: dragonfly.position.to_array(),
                    speed: dragonfly.speed,
                }
            })
            .collect();

        BattleState {
            tick: battle.tick_count(),
            outcome: battle.outcome().into(),
            kings,
            units,
            towers,
            dragonflies,
            spears: SpearCounts {
                azuki: battle.hand(Allegiance::Azuki).spear_count,
                edamame: battle.hand(Allegiance::Edamame).spear_count,
            },
            hash: battle.state_hash(),
        }
    }
}

fn ground(x: f64, z: f64) -> DVec3 {
    DVec3::new(x, 0.0, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Outcome;
    use legion_core::input::InputSnapshot;
    use legion_test_utils::fixtures;

    fn runner() -> HeadlessRunner {
        HeadlessRunner::new(fixtures::default_battle())
    }

    #[test]
    fn test_tick_reports_new_tick() {
        let mut runner = runner();
        let responses = runner.handle(Command::Tick {
            count: 10,
            input: InputSnapshot::default(),
        });
        assert!(matches!(responses[..], [Response::Ticked { tick: 10, .. }]));
    }

    #[test]
    fn test_auto_state_follows_tick() {
        let config = HeadlessConfig {
            auto_state_output: true,
        };
        let mut runner = HeadlessRunner::with_config(fixtures::default_battle(), config);
        let responses = runner.handle(Command::Tick {
            count: 1,
            input: InputSnapshot::default(),
        });
        assert!(matches!(responses[1], Response::State(ref state) if state.tick == 1));
    }

    #[test]
    fn test_query_lists_everything() {
        let runner = runner();
        let state = runner.snapshot();
        assert_eq!(state.kings.len(), 2);
        assert_eq!(state.units.len(), 2);
        assert_eq!(state.towers.len(), 14);
        assert_eq!(state.dragonflies.len(), 1);
        assert_eq!(state.hash, runner.battle().state_hash());
    }

    #[test]
    fn test_deployment_round_trip() {
        let mut runner = runner();
        let tower = runner.battle().active_tower_ids()[0].0;

        runner.handle(Command::BeginDeployment { x: 0.0, z: 20.0 });
        let planned = runner.handle(Command::UpdateDeployment { x: 24.0, z: 20.0 });
        assert!(matches!(planned[..], [Response::Planned { soldiers: 3 }]));
        runner.handle(Command::EndDeployment);

        let deployed = runner.handle(Command::CommitDeployment { tower });
        let [Response::Deployed { unit, .. }] = deployed[..] else {
            panic!("expected deployment, got {deployed:?}");
        };
        let state = runner.snapshot();
        let new_unit = state.units.iter().find(|u| u.id == unit).unwrap();
        assert!(new_unit.recruiting);
        assert_eq!(state.towers[0].queued_soldiers, 3);
    }

    #[test]
    fn test_commit_without_plan_is_an_error() {
        let mut runner = runner();
        let tower = runner.battle().active_tower_ids()[0].0;
        let responses = runner.handle(Command::CommitDeployment { tower });
        assert!(matches!(
            responses[..],
            [Response::Error { ref cmd, .. }] if cmd.as_deref() == Some("commit_deployment")
        ));
    }

    #[test]
    fn test_game_over_announced_once() {
        let mut battle = fixtures::kings_only();
        let king = battle.king_id(Allegiance::Edamame);
        battle.entities_mut().king_mut(king).soldier.health = 0.0;
        let mut runner = HeadlessRunner::new(battle);

        let first = runner.handle(Command::Tick {
            count: 1,
            input: InputSnapshot::default(),
        });
        assert!(matches!(
            first[..],
            [
                Response::Ticked { .. },
                Response::GameOver {
                    outcome: Outcome::AzukiWins,
                    ticks: 1
                }
            ]
        ));

        let second = runner.handle(Command::Tick {
            count: 1,
            input: InputSnapshot::default(),
        });
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("battle.bin").display().to_string();

        let mut runner = runner();
        runner.handle(Command::Tick {
            count: 25,
            input: InputSnapshot::default(),
        });
        let saved_hash = runner.battle().state_hash();
        runner.handle(Command::Save { path: path.clone() });

        runner.handle(Command::Tick {
            count: 25,
            input: InputSnapshot::default(),
        });
        assert_ne!(runner.battle().tick_count(), 25);

        let loaded = runner.handle(Command::Load { path });
        assert!(matches!(loaded[..], [Response::Ack { .. }]));
        assert_eq!(runner.battle().tick_count(), 25);
        assert_eq!(runner.battle().state_hash(), saved_hash);
    }

    #[test]
    fn test_load_missing_file() {
        let mut runner = runner();
        let responses = runner.handle(Command::Load {
            path: "/definitely/not/here.bin".to_string(),
        });
        assert!(matches!(responses[..], [Response::Error { .. }]));
    }

    #[test]
    fn test_serve_session() {
        let input = concat!(
            r#"{"cmd":"tick","count":3}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"cmd":"hash"}"#,
            "\n",
            r#"{"cmd":"quit"}"#,
            "\n",
            r#"{"cmd":"tick"}"#,
            "\n",
        );
        let mut output = Vec::new();
        let mut runner = runner();
        runner.serve(input.as_bytes(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains(r#""type":"ready""#));
        assert!(lines[1].contains(r#""type":"ticked""#));
        assert!(lines[2].contains("Parse error"));
        assert!(lines[3].contains(r#""type":"state_hash""#));
        assert!(lines[4].contains(r#""type":"bye""#));
        assert_eq!(runner.battle().tick_count(), 3);
        assert!(runner.should_quit());
    }
}
