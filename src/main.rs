use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use energy_scheduling::agent::QAgent;
use energy_scheduling::population::Population;
use energy_scheduling::{compare_with_agent, AppConfig, Comparison, Season};
use log::{info, warn};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_file(Path::new(&path))
            .with_context(|| format!("loading config from {path}"))?,
        None => AppConfig::from_env()?,
    };
    info!("{config:?}");

    for &season in &config.seasons {
        info!("running model for {season}");
        summarize_population(&config, season)?;

        let mut agent = QAgent::new(config.agent_config())?;
        let table_path = config.table_path(season);
        if let Some(path) = table_path.as_deref().filter(|p| p.exists()) {
            agent
                .restore(path)
                .with_context(|| format!("restoring value table {}", path.display()))?;
            info!("restored value table from {}", path.display());
        }

        let start = Instant::now();
        let comparison = compare_with_agent(
            season,
            config.rooms,
            &mut agent,
            config.episodes,
            config.eval_mode,
            config.log_every,
        )?;
        info!("training and evaluation took {:?}", start.elapsed());

        if let Some(path) = table_path {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            agent
                .persist(&path)
                .with_context(|| format!("persisting value table {}", path.display()))?;
        }

        report(&comparison);
    }
    Ok(())
}

fn summarize_population(config: &AppConfig, season: Season) -> Result<()> {
    let population = Population::new(config.households, season, rand::rng())?;
    let mut summary: Vec<_> = population.summary().into_iter().collect();
    summary.sort_by_key(|(house_type, _)| *house_type);
    for (house_type, s) in summary {
        info!(
            "{house_type:<20} households: {:3}, savers: {:3}, mean electricity: {:8.2} kWh, mean gas: {:9.2} kWh",
            s.households, s.savers, s.mean_electricity, s.mean_gas
        );
    }
    Ok(())
}

fn report(comparison: &Comparison) {
    let season = comparison.season;
    let (t, r, d) = (comparison.trained, comparison.random, comparison.reduction());
    println!("\nResults with trained agent ({season}):");
    println!("Total Electricity Usage: {:.2} kWh", t.electricity_kwh);
    println!("Total Gas Usage: {:.2} units", t.gas_units);
    println!("Total Cost: £{:.2}", t.cost);

    println!("\nResults with random policy ({season}):");
    println!("Total Electricity Usage: {:.2} kWh", r.electricity_kwh);
    println!("Total Gas Usage: {:.2} units", r.gas_units);
    println!("Total Cost: £{:.2}", r.cost);

    println!("\nReduction vs random ({season}):");
    println!("Electricity: {:.2} kWh", d.electricity_kwh);
    println!("Gas: {:.2} units", d.gas_units);
    println!("Cost: £{:.2}", d.cost);

    if d.cost < 0.0 {
        warn!("trained policy cost more than the random baseline in {season}");
    }
}
