//! Simulation binary for the Airlock engine.
//!
//! Wires together the ship, the task catalog, the decision source, and the
//! game controller, then runs games to completion and writes the summary
//! line per game.
//!
//! # Startup sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load `airlock.yaml` (or the path given as the first argument)
//! 3. Build the ship map and task catalog from config
//! 4. Build the decision source (LLM backend, or a scripted driver)
//! 5. Run each game on a blocking thread and append its summary

mod config;

use airlock_core::{ActivitySink, GameController, NullSink};
use airlock_events::JsonlWriter;
use airlock_runner::{LlmDecisionSource, create_backend};
use airlock_ship::{ShipConfig, TaskCatalog};
use anyhow::Context as _;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{DriverKind, SimConfig};

/// Application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("airlock-sim starting");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("airlock.yaml"));
    let sim_config = SimConfig::load(&config_path)?;
    info!(
        games = sim_config.games,
        players = sim_config.game.num_players,
        impostors = sim_config.game.num_impostors,
        driver = ?sim_config.driver,
        "configuration loaded"
    );

    let ship_config = sim_config
        .ship
        .clone()
        .unwrap_or_else(ShipConfig::standard);
    let catalog = sim_config
        .tasks
        .clone()
        .unwrap_or_else(TaskCatalog::standard);

    let mut summary_writer = sim_config
        .logs
        .summary_log
        .as_ref()
        .map(JsonlWriter::open)
        .transpose()
        .context("opening summary log")?;

    for game_index in 0..sim_config.games {
        let source = build_source(&sim_config, game_index)?;
        let sink: Box<dyn ActivitySink> = match &sim_config.logs.activity_log {
            Some(path) => Box::new(
                JsonlWriter::open(path).context("opening activity log")?,
            ),
            None => Box::new(NullSink),
        };

        let seed = sim_config.seed.wrapping_add(u64::from(game_index));
        let mut controller = GameController::new(
            sim_config.game.clone(),
            &ship_config,
            &catalog,
            seed,
            game_index,
            source,
            sink,
        )
        .context("initializing game")?;

        // The engine loop is synchronous; LLM decision sources bridge back
        // into this runtime, so the loop must not occupy a runtime worker.
        let summary = tokio::task::spawn_blocking(move || controller.run())
            .await
            .context("game task panicked")?
            .context("game failed")?;

        info!(
            game_index,
            winner = summary.winner,
            reason = %summary.winner_reason,
            final_timestep = summary.final_timestep,
            "game finished"
        );
        if let Some(writer) = summary_writer.as_mut() {
            writer.append(&summary).context("writing summary")?;
        }
    }

    Ok(())
}

/// Build the configured decision source for one game.
fn build_source(
    sim_config: &SimConfig,
    game_index: u32,
) -> anyhow::Result<Box<dyn airlock_core::decision::DecisionSource>> {
    let seed = sim_config.seed.wrapping_add(u64::from(game_index));
    match sim_config.driver {
        DriverKind::FirstLegal => Ok(Box::new(airlock_core::FirstLegalSource::new())),
        DriverKind::Random => Ok(Box::new(airlock_core::RandomSource::new(seed))),
        DriverKind::Llm => {
            let llm_config = sim_config
                .llm
                .as_ref()
                .context("driver 'llm' requires an [llm] config section")?;
            let llm_config = config::resolve_api_key(llm_config)?;
            let backend = create_backend(&llm_config);
            info!(backend = backend.name(), model = backend.model(), "llm backend ready");

            let ship_config = sim_config
                .ship
                .clone()
                .unwrap_or_else(ShipConfig::standard);
            let mut source = LlmDecisionSource::new(
                backend,
                &ship_config.rooms,
                tokio::runtime::Handle::current(),
                game_index,
            )
            .context("building llm decision source")?;
            if let Some(path) = &sim_config.logs.interaction_log {
                source = source.with_interaction_log(
                    JsonlWriter::open(path).context("opening interaction log")?,
                );
            }
            Ok(Box::new(source))
        }
    }
}
