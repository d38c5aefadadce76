//! Household population used for descriptive reporting. Nothing here feeds
//! the environment or the agent.

use std::fmt;

use fxhash::FxHashMap;
use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};
use crate::season::Season;

const WINTER_FACTOR: f64 = 1.36;
const SAVING_FACTOR: f64 = 0.9;
const SAVING_PROBABILITY: f64 = 0.3;

/// (occupants, households with that many occupants)
const OCCUPANCY: [(usize, usize); 6] = [(1, 29), (2, 47), (3, 26), (4, 23), (5, 9), (6, 3)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HouseType {
    Flat,
    Medium,
    Large,
}

impl HouseType {
    pub fn for_occupants(occupants: usize) -> Self {
        match occupants {
            0 | 1 => HouseType::Flat,
            2 | 3 => HouseType::Medium,
            _ => HouseType::Large,
        }
    }

    /// Annual (mean, std) kWh for electricity and gas.
    fn usage_params(self) -> ((f64, f64), (f64, f64)) {
        match self {
            HouseType::Flat => ((1800.0, 270.0), (7500.0, 1125.0)),
            HouseType::Medium => ((2700.0, 405.0), (11500.0, 1725.0)),
            HouseType::Large => ((4100.0, 615.0), (17000.0, 2550.0)),
        }
    }
}

impl fmt::Display for HouseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            HouseType::Flat => "Flat/1-bedroom",
            HouseType::Medium => "Medium 2-3 bedroom",
            HouseType::Large => "4+ bedroom",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Household {
    pub house_type: HouseType,
    pub occupants: usize,
    pub electricity_usage: f64,
    pub gas_usage: f64,
    pub energy_saving: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HouseTypeSummary {
    pub households: usize,
    pub savers: usize,
    pub mean_electricity: f64,
    pub mean_gas: f64,
}

pub struct Population<R: Rng> {
    season: Season,
    households: Vec<Household>,
    rng: R,
}

fn sample_usage<R: Rng>(rng: &mut R, (mean, std): (f64, f64), season: Season, saving: bool) -> Result<f64> {
    let normal = Normal::new(mean, std).map_err(|e| Error::configuration(e.to_string()))?;
    let mut usage = normal.sample(rng);
    if season == Season::Winter {
        usage *= WINTER_FACTOR;
    }
    if saving {
        usage *= SAVING_FACTOR;
    }
    Ok(usage.max(0.0))
}

impl<R: Rng> Population<R> {
    pub fn new(num_households: usize, season: Season, mut rng: R) -> Result<Self> {
        let mut sizes: Vec<usize> = OCCUPANCY
            .iter()
            .flat_map(|&(occupants, count)| std::iter::repeat_n(occupants, count))
            .collect();
        if num_households > sizes.len() {
            return Err(Error::configuration(format!(
                "at most {} households can be simulated, got {num_households}",
                sizes.len()
            )));
        }
        sizes.shuffle(&mut rng);

        let mut households = Vec::with_capacity(num_households);
        for &occupants in sizes.iter().take(num_households) {
            let house_type = HouseType::for_occupants(occupants);
            let energy_saving = rng.random_bool(SAVING_PROBABILITY);
            let (electricity, gas) = house_type.usage_params();
            households.push(Household {
                house_type,
                occupants,
                electricity_usage: sample_usage(&mut rng, electricity, season, energy_saving)?,
                gas_usage: sample_usage(&mut rng, gas, season, energy_saving)?,
                energy_saving,
            });
        }
        Ok(Population { season, households, rng })
    }

    /// Redraws every household's usage.
    pub fn step(&mut self) -> Result<()> {
        for household in self.households.iter_mut() {
            let (electricity, gas) = household.house_type.usage_params();
            household.electricity_usage =
                sample_usage(&mut self.rng, electricity, self.season, household.energy_saving)?;
            household.gas_usage = sample_usage(&mut self.rng, gas, self.season, household.energy_saving)?;
        }
        Ok(())
    }

    pub fn records(&self) -> &[Household] {
        &self.households
    }

    pub fn summary(&self) -> FxHashMap<HouseType, HouseTypeSummary> {
        let mut summary: FxHashMap<HouseType, HouseTypeSummary> = FxHashMap::default();
        for household in &self.households {
            let entry = summary.entry(household.house_type).or_default();
            entry.households += 1;
            entry.savers += household.energy_saving as usize;
            entry.mean_electricity += household.electricity_usage;
            entry.mean_gas += household.gas_usage;
        }
        for entry in summary.values_mut() {
            entry.mean_electricity /= entry.households as f64;
            entry.mean_gas /= entry.households as f64;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn population(n: usize, season: Season) -> Population<StdRng> {
        Population::new(n, season, StdRng::seed_from_u64(11)).unwrap()
    }

    #[test]
    fn house_type_follows_occupants() {
        assert_eq!(HouseType::for_occupants(1), HouseType::Flat);
        assert_eq!(HouseType::for_occupants(3), HouseType::Medium);
        assert_eq!(HouseType::for_occupants(6), HouseType::Large);
        assert_eq!(HouseType::Medium.to_string(), "Medium 2-3 bedroom");
    }

    #[test]
    fn records_are_consistent() {
        let pop = population(100, Season::Summer);
        assert_eq!(pop.records().len(), 100);
        for h in pop.records() {
            assert_eq!(h.house_type, HouseType::for_occupants(h.occupants));
            assert!(h.electricity_usage >= 0.0 && h.gas_usage >= 0.0);
        }
    }

    #[test]
    fn whole_pool_has_known_mix() {
        let pop = population(137, Season::Winter);
        let summary = pop.summary();
        assert_eq!(summary[&HouseType::Flat].households, 29);
        assert_eq!(summary[&HouseType::Medium].households, 73);
        assert_eq!(summary[&HouseType::Large].households, 35);
    }

    #[test]
    fn too_many_households() {
        let err = Population::new(138, Season::Winter, StdRng::seed_from_u64(1)).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn winter_draws_more_than_summer() {
        let winter = population(137, Season::Winter).summary();
        let summer = population(137, Season::Summer).summary();
        let w = winter[&HouseType::Medium].mean_gas;
        let s = summer[&HouseType::Medium].mean_gas;
        assert!(w > s * 1.2, "winter {w} vs summer {s}");
    }

    #[test]
    fn step_redraws_usage() {
        let mut pop = population(20, Season::Summer);
        let before: Vec<f64> = pop.records().iter().map(|h| h.electricity_usage).collect();
        pop.step().unwrap();
        let after: Vec<f64> = pop.records().iter().map(|h| h.electricity_usage).collect();
        assert_ne!(before, after);
        assert_eq!(pop.records().len(), 20);
    }
}
