//! Run configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agent::QAgentConfig;
use crate::error::{Error, Result};
use crate::season::Season;
use crate::EvalMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Rooms lit by the lighting appliance
    pub rooms: usize,
    /// Households in the descriptive population
    pub households: usize,
    pub seasons: Vec<Season>,
    /// Training episodes per season
    pub episodes: usize,
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    pub seed: Option<u64>,
    /// Directory holding one value table per season; tables are restored from
    /// and persisted to it when set
    pub table_dir: Option<PathBuf>,
    pub eval_mode: EvalMode,
    /// Log training progress every N episodes (0 disables)
    pub log_every: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rooms: 3,
            households: 100,
            seasons: vec![Season::Winter, Season::Summer],
            episodes: 2000,
            alpha: 0.1,
            gamma: 0.95,
            epsilon: 0.05,
            seed: None,
            table_dir: None,
            eval_mode: EvalMode::Exploring,
            log_every: 200,
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::configuration(format!("{key}: cannot parse '{value}'")))
}

impl AppConfig {
    /// Load configuration from a JSON file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Defaults overlaid with `ENERGY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("ENERGY_ROOMS") {
            config.rooms = parse("ENERGY_ROOMS", &v)?;
        }
        if let Some(v) = lookup("ENERGY_HOUSEHOLDS") {
            config.households = parse("ENERGY_HOUSEHOLDS", &v)?;
        }
        if let Some(v) = lookup("ENERGY_SEASONS") {
            config.seasons = v
                .split(',')
                .map(|s| s.trim().parse())
                .collect::<Result<Vec<Season>>>()?;
        }
        if let Some(v) = lookup("ENERGY_EPISODES") {
            config.episodes = parse("ENERGY_EPISODES", &v)?;
        }
        if let Some(v) = lookup("ENERGY_ALPHA") {
            config.alpha = parse("ENERGY_ALPHA", &v)?;
        }
        if let Some(v) = lookup("ENERGY_GAMMA") {
            config.gamma = parse("ENERGY_GAMMA", &v)?;
        }
        if let Some(v) = lookup("ENERGY_EPSILON") {
            config.epsilon = parse("ENERGY_EPSILON", &v)?;
        }
        if let Some(v) = lookup("ENERGY_SEED") {
            config.seed = Some(parse("ENERGY_SEED", &v)?);
        }
        if let Some(v) = lookup("ENERGY_TABLE_DIR") {
            config.table_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("ENERGY_GREEDY_EVAL") {
            if parse::<bool>("ENERGY_GREEDY_EVAL", &v)? {
                config.eval_mode = EvalMode::Greedy;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn agent_config(&self) -> QAgentConfig {
        QAgentConfig {
            alpha: self.alpha,
            gamma: self.gamma,
            epsilon: self.epsilon,
            seed: self.seed,
            ..Default::default()
        }
    }

    /// Value table location for `season`, if persistence is enabled.
    pub fn table_path(&self, season: Season) -> Option<PathBuf> {
        self.table_dir
            .as_ref()
            .map(|dir| dir.join(format!("{season}_q_table.qtbl")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.rooms == 0 {
            return Err(Error::configuration("rooms must be positive, got 0"));
        }
        if self.seasons.is_empty() {
            return Err(Error::configuration("at least one season is required"));
        }
        self.agent_config().validate()
    }
}
