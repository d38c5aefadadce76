use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Summer,
}

impl FromStr for Season {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "winter" => Ok(Season::Winter),
            "summer" => Ok(Season::Summer),
            other => Err(Error::configuration(format!(
                "season must be 'winter' or 'summer', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Winter => write!(f, "winter"),
            Season::Summer => write!(f, "summer"),
        }
    }
}

/// Prices in pence per kWh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tariff {
    pub peak_pence: f64,
    pub off_peak_pence: f64,
    pub gas_pence: f64,
}

pub const TARIFF: Tariff = Tariff {
    peak_pence: 24.50,
    off_peak_pence: 22.36,
    gas_pence: 10.00,
};

/// 07:00-17:00 and 19:00-23:00.
pub fn is_peak_hour(hour: usize) -> bool {
    (7..17).contains(&hour) || (19..23).contains(&hour)
}

impl Tariff {
    /// Electricity price for `hour` in currency units per kWh.
    pub fn electricity_price(&self, hour: usize) -> f64 {
        if is_peak_hour(hour) {
            self.peak_pence / 100.0
        } else {
            self.off_peak_pence / 100.0
        }
    }

    pub fn gas_price(&self) -> f64 {
        self.gas_pence / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appliance {
    Lighting,
    WashingMachine,
    Fridge,
    Heating,
    Cooling,
    GasHeating,
    GasCooking,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WinterProfile {
    pub washing_machine: f64,
    pub fridge: f64,
    pub lighting: f64,
    pub heating: f64,
    pub gas_heating: f64,
    pub gas_cooking: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummerProfile {
    pub washing_machine: f64,
    pub fridge: f64,
    pub lighting: f64,
    pub cooling: f64,
    pub gas_cooking: f64,
}

/// Per-use intensity coefficients of one season. Winter has electric and gas
/// heating but no cooling; summer has cooling and no heating of either kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeasonProfile {
    Winter(WinterProfile),
    Summer(SummerProfile),
}

impl SeasonProfile {
    pub fn winter() -> Self {
        SeasonProfile::Winter(WinterProfile {
            washing_machine: 0.12,
            fridge: 0.10,
            lighting: 0.08,
            heating: 0.30,
            gas_heating: 0.5,
            gas_cooking: 0.5,
        })
    }

    pub fn summer() -> Self {
        SeasonProfile::Summer(SummerProfile {
            washing_machine: 0.10,
            fridge: 0.12,
            lighting: 0.05,
            cooling: 0.10,
            gas_cooking: 0.8,
        })
    }

    pub fn for_season(season: Season) -> Self {
        match season {
            Season::Winter => Self::winter(),
            Season::Summer => Self::summer(),
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        name.parse().map(Self::for_season)
    }

    pub fn season(&self) -> Season {
        match self {
            SeasonProfile::Winter(_) => Season::Winter,
            SeasonProfile::Summer(_) => Season::Summer,
        }
    }

    /// Coefficient for `appliance`, or 0 when the season has no such draw.
    pub fn coefficient(&self, appliance: Appliance) -> f64 {
        match (self, appliance) {
            (SeasonProfile::Winter(p), Appliance::Lighting) => p.lighting,
            (SeasonProfile::Winter(p), Appliance::WashingMachine) => p.washing_machine,
            (SeasonProfile::Winter(p), Appliance::Fridge) => p.fridge,
            (SeasonProfile::Winter(p), Appliance::Heating) => p.heating,
            (SeasonProfile::Winter(p), Appliance::GasHeating) => p.gas_heating,
            (SeasonProfile::Winter(p), Appliance::GasCooking) => p.gas_cooking,
            (SeasonProfile::Winter(_), Appliance::Cooling) => 0.0,
            (SeasonProfile::Summer(p), Appliance::Lighting) => p.lighting,
            (SeasonProfile::Summer(p), Appliance::WashingMachine) => p.washing_machine,
            (SeasonProfile::Summer(p), Appliance::Fridge) => p.fridge,
            (SeasonProfile::Summer(p), Appliance::Cooling) => p.cooling,
            (SeasonProfile::Summer(p), Appliance::GasCooking) => p.gas_cooking,
            (SeasonProfile::Summer(_), Appliance::Heating | Appliance::GasHeating) => 0.0,
        }
    }

    pub fn tariff(&self) -> &Tariff {
        &TARIFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_seasons() {
        assert_eq!("winter".parse::<Season>().unwrap(), Season::Winter);
        assert_eq!("summer".parse::<Season>().unwrap(), Season::Summer);
        assert_eq!(SeasonProfile::from_name("summer").unwrap().season(), Season::Summer);
    }

    #[test]
    fn unknown_season_is_a_configuration_error() {
        let err = SeasonProfile::from_name("autumn").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("autumn"));
    }

    #[test]
    fn undefined_coefficients_read_as_zero() {
        let summer = SeasonProfile::summer();
        assert_eq!(summer.coefficient(Appliance::Heating), 0.0);
        assert_eq!(summer.coefficient(Appliance::GasHeating), 0.0);
        assert_eq!(summer.coefficient(Appliance::Cooling), 0.10);

        let winter = SeasonProfile::winter();
        assert_eq!(winter.coefficient(Appliance::Cooling), 0.0);
        assert_eq!(winter.coefficient(Appliance::Heating), 0.30);
    }

    #[test]
    fn peak_windows() {
        let peak: Vec<usize> = (0..24).filter(|&h| is_peak_hour(h)).collect();
        let expected: Vec<usize> = (7..17).chain(19..23).collect();
        assert_eq!(peak, expected);
        assert_eq!(TARIFF.electricity_price(7), 0.245);
        assert!((TARIFF.electricity_price(17) - 0.2236).abs() < 1e-12);
        assert!((TARIFF.electricity_price(23) - 0.2236).abs() < 1e-12);
        assert_eq!(TARIFF.gas_price(), 0.1);
    }
}
