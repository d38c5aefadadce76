use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use agent::QAgent;
use cost::{Usage, GAS_SURCHARGE};
use env::Env;
use error::Result;
use types::{State, APPLIANCES, HORIZON_DAYS, HOURS_PER_DAY};

pub mod agent;
pub mod config;
pub mod cost;
pub mod env;
pub mod error;
pub mod population;
pub mod season;
pub mod table;
pub mod types;

pub use agent::QAgentConfig;
pub use config::AppConfig;
pub use error::Error;
pub use season::{Season, SeasonProfile};

/// How the trained policy acts during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMode {
    /// Keep epsilon-greedy exploration active, as training does.
    #[default]
    Exploring,
    /// Always take the argmax action.
    Greedy,
}

/// Aggregates of one 90-day evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub electricity_kwh: f64,
    pub gas_units: f64,
    pub cost: f64,
}

impl Totals {
    fn add(&mut self, usage: Usage, electricity_price: f64, gas_price: f64) {
        self.electricity_kwh += usage.electricity;
        self.gas_units += usage.gas;
        self.cost += cost::cost(usage, electricity_price, gas_price) + usage.gas * GAS_SURCHARGE;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub season: Season,
    pub trained: Totals,
    pub random: Totals,
}

impl Comparison {
    /// Random minus trained; positive means the trained policy used less.
    pub fn reduction(&self) -> Totals {
        Totals {
            electricity_kwh: self.random.electricity_kwh - self.trained.electricity_kwh,
            gas_units: self.random.gas_units - self.trained.gas_units,
            cost: self.random.cost - self.trained.cost,
        }
    }
}

/// Runs `episodes` full episodes, updating the agent after every transition.
/// Returns the total reward of each episode.
pub fn train(agent: &mut QAgent, env: &mut Env, episodes: usize, log_every: usize) -> Result<Vec<f64>> {
    let mut returns = Vec::with_capacity(episodes);
    let mut best_return = f64::NEG_INFINITY;

    for ep in 0..episodes {
        let mut state = env.reset();
        let mut total_reward = 0.0;
        loop {
            let action = agent.choose_action(&state)?;
            let step = env.step(&action)?;
            agent.learn(&state, &action, step.reward, &step.state)?;
            total_reward += step.reward;
            state = step.state;
            if step.done {
                break;
            }
        }

        best_return = best_return.max(total_reward);
        debug!("episode {ep}: return {total_reward:.4}");
        if log_every > 0 && ep % log_every == 0 {
            info!(
                "E{:6}   best R: {:.2}, last R: {:.2}, e: {:.3}",
                ep,
                best_return,
                total_reward,
                agent.epsilon()
            );
        }
        returns.push(total_reward);
    }
    Ok(returns)
}

fn evaluation_pass(
    env: &mut Env,
    mut policy: impl FnMut(&State) -> Result<Vec<usize>>,
) -> Result<Totals> {
    let mut totals = Totals::default();
    let mut state = env.reset();
    for _ in 0..HORIZON_DAYS {
        for _ in 0..HOURS_PER_DAY {
            let action = policy(&state)?;
            let step = env.step(&action)?;
            totals.add(step.usage, step.electricity_price, env.gas_price());
            state = step.state;
        }
    }
    Ok(totals)
}

/// One 90-day pass of the trained policy without learning.
pub fn evaluate(agent: &mut QAgent, env: &mut Env, mode: EvalMode) -> Result<Totals> {
    match mode {
        EvalMode::Exploring => evaluation_pass(env, |state| agent.choose_action(state)),
        EvalMode::Greedy => evaluation_pass(env, |state| agent.greedy_action(state)),
    }
}

/// The same pass with a uniformly random on/off choice per appliance.
pub fn evaluate_random<R: Rng>(env: &mut Env, rng: &mut R) -> Result<Totals> {
    evaluation_pass(env, |_| Ok((0..APPLIANCES).map(|_| rng.random_range(0..2)).collect()))
}

/// Trains a fresh agent for `season` and evaluates it against the random baseline.
pub fn compare_policies(
    season: Season,
    num_rooms: usize,
    agent_config: QAgentConfig,
    episodes: usize,
    mode: EvalMode,
) -> Result<Comparison> {
    let mut agent = QAgent::new(agent_config)?;
    compare_with_agent(season, num_rooms, &mut agent, episodes, mode, 0)
}

pub fn compare_with_agent(
    season: Season,
    num_rooms: usize,
    agent: &mut QAgent,
    episodes: usize,
    mode: EvalMode,
    log_every: usize,
) -> Result<Comparison> {
    let profile = SeasonProfile::for_season(season);

    info!("training agent for {season} season ({episodes} episodes)");
    let mut env = Env::new(num_rooms, profile)?;
    train(agent, &mut env, episodes, log_every)?;

    info!("testing agent for {season} season");
    let mut env = Env::new(num_rooms, profile)?;
    let trained = evaluate(agent, &mut env, mode)?;

    let mut env = Env::new(num_rooms, profile)?;
    let random = evaluate_random(&mut env, &mut rand::rng())?;

    Ok(Comparison { season, trained, random })
}

#[cfg(feature = "python")]
mod python {
    use pyo3::exceptions::{PyIOError, PyValueError};
    use pyo3::prelude::*;

    use crate::{EvalMode, QAgentConfig, Season};

    type Aggregates = (f64, f64, f64);

    impl From<crate::Error> for PyErr {
        fn from(err: crate::Error) -> PyErr {
            match err {
                crate::Error::Io(_) => PyIOError::new_err(err.to_string()),
                _ => PyValueError::new_err(err.to_string()),
            }
        }
    }

    #[pymodule]
    fn energy_scheduling(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(compare_policies, m)?)
    }

    /// Returns ((electricity, gas, cost) trained, (electricity, gas, cost) random).
    #[pyfunction]
    #[pyo3(signature = (season, rooms=3, episodes=2000, alpha=0.1, gamma=0.95, epsilon=0.05, seed=None, greedy=false))]
    #[allow(clippy::too_many_arguments)]
    fn compare_policies(
        season: &str,
        rooms: usize,
        episodes: usize,
        alpha: f64,
        gamma: f64,
        epsilon: f64,
        seed: Option<u64>,
        greedy: bool,
    ) -> PyResult<(Aggregates, Aggregates)> {
        let season: Season = season.parse()?;
        let config = QAgentConfig {
            alpha,
            gamma,
            epsilon,
            seed,
            ..Default::default()
        };
        let mode = if greedy { EvalMode::Greedy } else { EvalMode::Exploring };
        let result = crate::compare_policies(season, rooms, config, episodes, mode)?;
        let t = result.trained;
        let r = result.random;
        Ok((
            (t.electricity_kwh, t.gas_units, t.cost),
            (r.electricity_kwh, r.gas_units, r.cost),
        ))
    }
}
