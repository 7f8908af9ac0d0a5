//! Simulation configuration: one YAML file covering the game parameters,
//! the decision driver, the LLM backend, and the log destinations.

use airlock_runner::LlmBackendConfig;
use airlock_ship::{ShipConfig, TaskCatalog};
use airlock_types::GameConfig;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Which decision driver to run the agents with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// Full LLM agents (requires the `llm` section).
    #[default]
    Llm,
    /// Uniform-random legal actions (seeded).
    Random,
    /// Always the first legal action.
    FirstLegal,
}

/// Log file destinations. Absent paths disable the corresponding log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogConfig {
    /// Per-action activity log (JSONL).
    pub activity_log: Option<String>,
    /// Per-decision interaction log (JSONL).
    pub interaction_log: Option<String>,
    /// Per-game summary log (JSONL).
    pub summary_log: Option<String>,
}

/// The full simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Game parameters.
    #[serde(default)]
    pub game: GameConfig,
    /// Number of games to run back to back.
    #[serde(default = "default_games")]
    pub games: u32,
    /// Base RNG seed; each game offsets it by its index.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// The decision driver.
    #[serde(default)]
    pub driver: DriverKind,
    /// LLM backend settings, required when `driver` is `llm`.
    #[serde(default)]
    pub llm: Option<LlmBackendConfig>,
    /// Ship override; the standard 14-room layout when absent.
    #[serde(default)]
    pub ship: Option<ShipConfig>,
    /// Task catalog override; the standard catalog when absent.
    #[serde(default)]
    pub tasks: Option<TaskCatalog>,
    /// Log destinations.
    #[serde(default)]
    pub logs: LogConfig,
}

/// Default number of games.
const fn default_games() -> u32 {
    1
}

/// Default base seed.
const fn default_seed() -> u64 {
    42
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            games: default_games(),
            seed: default_seed(),
            driver: DriverKind::default(),
            llm: None,
            ship: None,
            tasks: None,
            logs: LogConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load from a YAML file; a missing file yields the defaults with the
    /// random driver (so the binary runs out of the box).
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if !std::path::Path::new(path).exists() {
            info!(path, "no config file found, using defaults with the random driver");
            return Ok(Self {
                driver: DriverKind::Random,
                ..Self::default()
            });
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        serde_yml::from_str(&raw).with_context(|| format!("parsing config file {path}"))
    }
}

/// Resolve an `env:VAR` API key reference against the process environment.
pub fn resolve_api_key(config: &LlmBackendConfig) -> anyhow::Result<LlmBackendConfig> {
    let mut resolved = config.clone();
    if let Some(var) = config.api_key.strip_prefix("env:") {
        resolved.api_key = std::env::var(var)
            .with_context(|| format!("api key environment variable {var} not set"))?;
    }
    Ok(resolved)
}
