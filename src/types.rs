use crate::error::{Error, Result};

pub const APPLIANCES: usize = 5;

pub const LIGHTING: usize = 0;
pub const WASHING_MACHINE: usize = 1;
pub const FRIDGE: usize = 2;
pub const GAS_HEATING: usize = 3;
pub const GAS_COOKING: usize = 4;

pub const HOURS_PER_DAY: usize = 24;
pub const HORIZON_DAYS: usize = 90;

pub type State = [usize; APPLIANCES]; // (lighting, washing machine, fridge, gas heating, gas cooking)
pub type Action = [usize; APPLIANCES];

/// Everything off except the fridge.
pub const INITIAL_STATE: State = [0, 0, 1, 0, 0];

/// Checks that `v` is a five-element on/off vector and copies it into a fixed array.
pub fn binary_vector(v: &[usize], what: &str) -> Result<[usize; APPLIANCES]> {
    if v.len() != APPLIANCES {
        return Err(Error::domain(format!(
            "{what} must have {APPLIANCES} components, got {} ({v:?})",
            v.len()
        )));
    }
    if let Some((i, bit)) = v.iter().enumerate().find(|&(_, &b)| b > 1) {
        return Err(Error::domain(format!(
            "{what} component {i} must be 0 or 1, got {bit} ({v:?})"
        )));
    }
    let mut out = [0; APPLIANCES];
    out.copy_from_slice(v);
    Ok(out)
}
