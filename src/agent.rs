use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::ValueTable;
use crate::types::APPLIANCES;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QAgentConfig {
    /// Cardinality of each state dimension.
    pub state_dims: Vec<usize>,
    /// Cardinality of each action dimension.
    pub action_dims: Vec<usize>,
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    /// Fixed seed for reproducible exploration; drawn from the OS when unset.
    pub seed: Option<u64>,
}

impl Default for QAgentConfig {
    fn default() -> Self {
        QAgentConfig {
            state_dims: vec![2; APPLIANCES],
            action_dims: vec![2; APPLIANCES],
            alpha: 0.1,
            gamma: 0.95,
            epsilon: 0.05,
            seed: None,
        }
    }
}

impl QAgentConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(Error::configuration(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(Error::configuration(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(Error::configuration(format!(
                "epsilon must be in [0, 1], got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Tabular Q-learning agent with epsilon-greedy exploration.
pub struct QAgent {
    table: ValueTable,
    alpha: f64,
    gamma: f64,
    epsilon: f64,
    rng: StdRng,
}

impl QAgent {
    pub fn new(config: QAgentConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(QAgent {
            table: ValueTable::new(config.state_dims, config.action_dims)?,
            alpha: config.alpha,
            gamma: config.gamma,
            epsilon: config.epsilon,
            rng,
        })
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// With probability epsilon a uniform draw per action dimension, otherwise
    /// the greedy action for `state`.
    pub fn choose_action(&mut self, state: &[usize]) -> Result<Vec<usize>> {
        let state_index = self.table.state_index(state)?;
        if self.rng.random::<f64>() < self.epsilon {
            let rng = &mut self.rng;
            return Ok(self
                .table
                .action_dims()
                .iter()
                .map(|&dim| rng.random_range(0..dim))
                .collect());
        }
        Ok(self.table.action_at(self.table.best_action_index(state_index)))
    }

    /// Argmax action for `state`, ignoring epsilon.
    pub fn greedy_action(&self, state: &[usize]) -> Result<Vec<usize>> {
        let state_index = self.table.state_index(state)?;
        Ok(self.table.action_at(self.table.best_action_index(state_index)))
    }

    /// Q(s,a) += alpha * (r + gamma * max_a' Q(s',a') - Q(s,a))
    pub fn learn(
        &mut self,
        state: &[usize],
        action: &[usize],
        reward: f64,
        next_state: &[usize],
    ) -> Result<()> {
        let s = self.table.state_index(state)?;
        let a = self.table.action_index(action)?;
        let next = self.table.state_index(next_state)?;

        let current_q = self.table.get(s, a);
        let max_next_q = self.table.max_value(next);
        self.table.set(
            s,
            a,
            current_q + self.alpha * (reward + self.gamma * max_next_q - current_q),
        );
        Ok(())
    }

    /// Scales epsilon by `rate`. Never called from the training loop.
    pub fn decay_epsilon(&mut self, rate: f64) {
        self.epsilon *= rate;
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        self.table.persist(path)
    }

    /// Replaces the table with the snapshot at `path`. The snapshot must have
    /// exactly the configured shape; on any failure the current table is kept.
    pub fn restore(&mut self, path: &Path) -> Result<()> {
        let loaded = ValueTable::load(path)?;
        if loaded.state_dims() != self.table.state_dims()
            || loaded.action_dims() != self.table.action_dims()
        {
            return Err(Error::configuration(format!(
                "value table at {} has shape {:?}, expected {:?}",
                path.display(),
                loaded.shape(),
                self.table.shape()
            )));
        }
        self.table = loaded;
        Ok(())
    }
}
