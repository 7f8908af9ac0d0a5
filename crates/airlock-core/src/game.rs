//! Game control: initialization, the run loop, and winner reporting.

use std::collections::BTreeMap;

use airlock_agents::{PLAYER_COLORS, Player};
use airlock_events::{GameSummary, PlayerSummary};
use airlock_ship::{DistanceTable, Occupancy, ShipConfig, ShipMap, TaskCatalog};
use airlock_types::{GameConfig, Phase, PlayerId, Role, Winner};
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use tracing::info;

use crate::activity::ActivitySink;
use crate::decision::DecisionSource;
use crate::error::EngineError;
use crate::meeting::run_meeting;
use crate::state::GameState;
use crate::tick::run_task_tick;

/// Owns the game state and drives it to completion.
pub struct GameController<S: DecisionSource> {
    /// The full simulation state.
    pub state: GameState,
    source: S,
    sink: Box<dyn ActivitySink>,
    rng: StdRng,
    game_index: u32,
    session: uuid::Uuid,
}

impl<S: DecisionSource> GameController<S> {
    /// Initialize a fresh game: shuffle roles and colors, scatter spawns,
    /// and draw tasks for every player.
    pub fn new(
        config: GameConfig,
        ship_config: &ShipConfig,
        catalog: &TaskCatalog,
        seed: u64,
        game_index: u32,
        source: S,
        sink: Box<dyn ActivitySink>,
    ) -> Result<Self, EngineError> {
        if config.num_impostors == 0 || config.num_impostors >= config.num_players {
            return Err(EngineError::Config(format!(
                "{} impostors among {} players",
                config.num_impostors, config.num_players
            )));
        }
        let player_count = usize::try_from(config.num_players).unwrap_or(usize::MAX);
        if player_count > PLAYER_COLORS.len() {
            return Err(EngineError::Config(format!(
                "at most {} players supported",
                PLAYER_COLORS.len()
            )));
        }

        let map = ShipMap::from_config(ship_config)?;
        let distances = DistanceTable::compute(&map);
        let mut rng = StdRng::seed_from_u64(seed);

        // Role deck: crewmates then impostors, shuffled.
        let crew_count = usize::try_from(config.num_crewmates()).unwrap_or(0);
        let mut roles: Vec<Role> = std::iter::repeat_n(Role::Crewmate, crew_count)
            .chain(std::iter::repeat_n(
                Role::Impostor,
                player_count.saturating_sub(crew_count),
            ))
            .collect();
        roles.shuffle(&mut rng);

        // Colors drawn without replacement.
        let mut colors: Vec<&str> = PLAYER_COLORS.to_vec();
        colors.shuffle(&mut rng);

        // Spawn scattering: shuffle the configured pool; overflow lands at
        // the button room.
        let mut spawn_pool = map.spawn_pool().to_vec();
        spawn_pool.shuffle(&mut rng);

        let mut players = BTreeMap::new();
        let mut turn_order = Vec::with_capacity(player_count);
        let mut next_task_id = 0_u32;
        let tasks_per_player = usize::try_from(config.tasks_per_player).unwrap_or(0);

        for index in 0..config.num_players {
            let id = PlayerId(index);
            let idx = usize::try_from(index).unwrap_or(0);
            let role = roles.get(idx).copied().unwrap_or(Role::Crewmate);
            let color = colors.get(idx).copied().unwrap_or("gray");
            let room = spawn_pool.get(idx).copied().unwrap_or_else(|| map.button_room());
            let mut player = Player::new(id, index, color, role, room);
            player.tasks = catalog.draw(&map, id, tasks_per_player, &mut next_task_id, &mut rng)?;
            info!(
                player = %player.name,
                role = %player.role,
                spawn = map.room_name(room),
                "player initialized"
            );
            players.insert(id, player);
            turn_order.push(id);
        }

        let mut state = GameState {
            config,
            map,
            distances,
            occupancy: Occupancy::default(),
            players,
            turn_order,
            timestep: 0,
            phase: Phase::Task,
            discussion_rounds_left: 0,
            vote_choices: BTreeMap::new(),
            dead_bodies: Vec::new(),
            active_sabotages: BTreeMap::new(),
            sabotage_cooldown: 0,
            button_uses: 0,
            meeting_caller: None,
            camera_record: BTreeMap::new(),
            winner: None,
        };
        state.rebuild_occupancy();

        Ok(Self {
            state,
            source,
            sink,
            rng,
            game_index,
            session: uuid::Uuid::now_v7(),
        })
    }

    /// Advance by one step: a task tick or a whole meeting.
    pub fn step(&mut self) -> Result<(), EngineError> {
        match self.state.phase {
            Phase::Task => {
                run_task_tick(&mut self.state, &mut self.source, self.sink.as_mut(), &mut self.rng)?;
            }
            Phase::Meeting => {
                run_meeting(&mut self.state, &mut self.source, self.sink.as_mut())?;
            }
        }
        Ok(())
    }

    /// Run until an end condition holds and return the game summary.
    ///
    /// End conditions are evaluated after every step; the engine always
    /// produces a progressing, legal game state, so the loop terminates at
    /// the latest when the tick limit converts into an impostor win.
    pub fn run(&mut self) -> Result<GameSummary, EngineError> {
        loop {
            if let Some(winner) = self.state.check_game_over() {
                self.state.winner = Some(winner);
                info!(code = winner.code(), reason = winner.reason(), "game over");
                return Ok(self.summary(winner));
            }
            self.step()?;
        }
    }

    /// Build the terminal summary record.
    fn summary(&self, winner: Winner) -> GameSummary {
        let players = self
            .state
            .turn_order
            .iter()
            .filter_map(|id| self.state.players.get(id))
            .map(|p| PlayerSummary {
                name: p.name.clone(),
                color: p.color.clone(),
                identity: p.role.to_string(),
                model: self.source.model_name(),
                tasks: p.tasks.iter().map(|t| t.name.clone()).collect(),
            })
            .collect();
        GameSummary {
            session: self.session,
            game_index: self.game_index,
            config: serde_json::to_value(&self.state.config).unwrap_or_default(),
            players,
            winner: winner.code(),
            winner_reason: winner.reason().to_owned(),
            final_timestep: self.state.timestep,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::activity::NullSink;
    use crate::decision::FirstLegalSource;

    use super::*;

    fn make_controller(config: GameConfig, seed: u64) -> GameController<FirstLegalSource> {
        GameController::new(
            config,
            &ShipConfig::standard(),
            &TaskCatalog::standard(),
            seed,
            0,
            FirstLegalSource::new(),
            Box::new(NullSink),
        )
        .unwrap()
    }

    #[test]
    fn init_assigns_roles_colors_and_tasks() {
        let controller = make_controller(GameConfig::default(), 11);
        let state = &controller.state;
        assert_eq!(state.players.len(), 5);
        let impostors = state
            .players
            .values()
            .filter(|p| p.role == Role::Impostor)
            .count();
        assert_eq!(impostors, 1);

        // Colors are distinct.
        let mut colors: Vec<&str> = state.players.values().map(|p| p.color.as_str()).collect();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), 5);

        // Everyone has a full task draw.
        for player in state.players.values() {
            assert_eq!(player.tasks.len(), 3);
        }
    }

    #[test]
    fn invalid_configs_rejected() {
        let mut config = GameConfig::default();
        config.num_impostors = 5;
        assert!(matches!(
            GameController::new(
                config,
                &ShipConfig::standard(),
                &TaskCatalog::standard(),
                0,
                0,
                FirstLegalSource::new(),
                Box::new(NullSink),
            ),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn game_with_first_legal_agents_terminates() {
        // First-legal agents mostly wander; the tick limit guarantees an
        // impostor timeout at the latest.
        let mut config = GameConfig::default();
        config.max_timesteps = 12;
        let mut controller = make_controller(config, 3);
        let summary = controller.run().unwrap();
        assert!(summary.winner >= 1 && summary.winner <= 4);
        assert!(controller.state.winner.is_some());
    }

    #[test]
    fn same_seed_same_assignment() {
        let a = make_controller(GameConfig::default(), 42);
        let b = make_controller(GameConfig::default(), 42);
        for (left, right) in a.state.players.values().zip(b.state.players.values()) {
            assert_eq!(left.role, right.role);
            assert_eq!(left.color, right.color);
            assert_eq!(left.room, right.room);
        }
    }
}
