//! Appliance configuration to energy usage to cost. The training reward and the
//! evaluation report both go through here.

use crate::season::{Appliance, SeasonProfile};
use crate::types::{Action, FRIDGE, GAS_COOKING, GAS_HEATING, LIGHTING, WASHING_MACHINE};

/// Gas surcharge per unit, applied only when reporting evaluation cost.
pub const GAS_SURCHARGE: f64 = 0.04;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Usage {
    pub electricity: f64,
    pub gas: f64,
}

/// Energy drawn during one hour by `action`. The fridge bit is expected to be
/// forced on already. Heating and cooling are climate driven and always drawn
/// when the season defines them.
pub fn appliance_usage(profile: &SeasonProfile, num_rooms: usize, action: &Action) -> Usage {
    let c = |appliance| profile.coefficient(appliance);

    let electricity = action[LIGHTING] as f64 * 0.5 * num_rooms as f64 * c(Appliance::Lighting)
        + action[WASHING_MACHINE] as f64 * 1.5 * c(Appliance::WashingMachine)
        + action[FRIDGE] as f64 * 1.0 * c(Appliance::Fridge)
        + 2.0 * c(Appliance::Heating)
        + 1.0 * c(Appliance::Cooling);

    let gas = action[GAS_HEATING] as f64 * 3.0 * c(Appliance::GasHeating)
        + action[GAS_COOKING] as f64 * 2.0 * c(Appliance::GasCooking);

    Usage { electricity, gas }
}

pub fn cost(usage: Usage, electricity_price: f64, gas_price: f64) -> f64 {
    usage.electricity * electricity_price + usage.gas * gas_price
}
