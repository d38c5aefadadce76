use std::fmt;

use crate::cost::{self, Usage};
use crate::error::{Error, Result};
use crate::season::SeasonProfile;
use crate::types::{binary_vector, State, FRIDGE, HORIZON_DAYS, HOURS_PER_DAY, INITIAL_STATE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clock {
    pub hour: usize,
    pub day: usize,
}

impl Clock {
    pub fn tick(&mut self) {
        self.hour += 1;
        if self.hour >= HOURS_PER_DAY {
            self.hour = 0;
            self.day += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub state: State,
    pub reward: f64,
    pub done: bool,
    /// Usage and electricity price the reward was computed from.
    pub usage: Usage,
    pub electricity_price: f64,
}

pub struct Env {
    pub profile: SeasonProfile,
    pub num_rooms: usize,
    clock: Clock,
    state: State,
}

impl Env {
    pub fn new(num_rooms: usize, profile: SeasonProfile) -> Result<Self> {
        if num_rooms == 0 {
            return Err(Error::configuration("room count must be positive, got 0"));
        }
        Ok(Env {
            profile,
            num_rooms,
            clock: Clock::default(),
            state: INITIAL_STATE,
        })
    }

    pub fn for_season(num_rooms: usize, season: &str) -> Result<Self> {
        Env::new(num_rooms, SeasonProfile::from_name(season)?)
    }

    pub fn reset(&mut self) -> State {
        self.clock = Clock::default();
        self.state = INITIAL_STATE;
        self.state
    }

    /// Applies `action` for the current hour. The fridge is always on whatever
    /// the action says, and the new state is the corrected action itself.
    pub fn step(&mut self, action: &[usize]) -> Result<Step> {
        let mut action = binary_vector(action, "action")?;
        action[FRIDGE] = 1;

        let usage = cost::appliance_usage(&self.profile, self.num_rooms, &action);
        let electricity_price = self.electricity_price();
        let reward = -cost::cost(usage, electricity_price, self.gas_price());

        self.state = action;
        self.clock.tick();

        Ok(Step {
            state: self.state,
            reward,
            done: self.is_done(),
            usage,
            electricity_price,
        })
    }

    pub fn electricity_price(&self) -> f64 {
        self.profile.tariff().electricity_price(self.clock.hour)
    }

    pub fn gas_price(&self) -> f64 {
        self.profile.tariff().gas_price()
    }

    pub fn is_done(&self) -> bool {
        self.clock.day >= HORIZON_DAYS
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn render(&self) {
        println!("{self}");
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Day: {}, Hour: {}, State: {:?}",
            self.clock.day, self.clock.hour, self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::{Season, SummerProfile, TARIFF, WinterProfile};

    fn all_actions() -> Vec<[usize; 5]> {
        (0..32usize)
            .map(|n| [(n >> 4) & 1, (n >> 3) & 1, (n >> 2) & 1, (n >> 1) & 1, n & 1])
            .collect()
    }

    #[test]
    fn reset_returns_fridge_only_state() {
        let mut env = Env::for_season(2, "winter").unwrap();
        env.step(&[1, 1, 1, 1, 1]).unwrap();
        assert_eq!(env.reset(), [0, 0, 1, 0, 0]);
        assert_eq!(env.clock(), Clock { hour: 0, day: 0 });
    }

    #[test]
    fn fridge_is_forced_on() {
        let mut env = Env::for_season(1, "summer").unwrap();
        env.reset();
        let off = env.step(&[0, 0, 0, 0, 0]).unwrap();
        env.reset();
        let on = env.step(&[0, 0, 1, 0, 0]).unwrap();
        assert_eq!(off.state, [0, 0, 1, 0, 0]);
        assert_eq!(off.usage, on.usage);
        assert_eq!(off.reward, on.reward);
    }

    #[test]
    fn reward_is_never_positive() {
        for season in [Season::Winter, Season::Summer] {
            let mut env = Env::new(3, SeasonProfile::for_season(season)).unwrap();
            for action in all_actions() {
                env.reset();
                for _ in 0..HOURS_PER_DAY {
                    assert!(env.step(&action).unwrap().reward <= 0.0);
                }
            }
        }
    }

    #[test]
    fn reward_is_zero_without_any_draw() {
        let profile = SeasonProfile::Winter(WinterProfile {
            washing_machine: 0.0,
            fridge: 0.0,
            lighting: 0.0,
            heating: 0.0,
            gas_heating: 0.0,
            gas_cooking: 0.0,
        });
        let mut env = Env::new(4, profile).unwrap();
        env.reset();
        assert_eq!(env.step(&[0, 0, 0, 0, 0]).unwrap().reward, 0.0);

        // Only the unavoidable draws of a summer profile are non-zero here.
        let profile = SeasonProfile::Summer(SummerProfile {
            washing_machine: 0.3,
            fridge: 0.0,
            lighting: 0.2,
            cooling: 0.0,
            gas_cooking: 0.5,
        });
        let mut env = Env::new(4, profile).unwrap();
        env.reset();
        assert_eq!(env.step(&[0, 0, 0, 0, 0]).unwrap().reward, 0.0);
        assert!(env.step(&[1, 0, 0, 0, 0]).unwrap().reward < 0.0);
    }

    #[test]
    fn day_rolls_over_after_24_steps() {
        let mut env = Env::for_season(1, "winter").unwrap();
        env.reset();
        for hour in 1..HOURS_PER_DAY {
            env.step(&[0, 0, 1, 0, 0]).unwrap();
            assert_eq!(env.clock(), Clock { hour, day: 0 });
        }
        env.step(&[0, 0, 1, 0, 0]).unwrap();
        assert_eq!(env.clock(), Clock { hour: 0, day: 1 });
    }

    #[test]
    fn episode_lasts_exactly_ninety_days() {
        let mut env = Env::for_season(1, "summer").unwrap();
        env.reset();
        let total = HORIZON_DAYS * HOURS_PER_DAY;
        for i in 1..=total {
            let step = env.step(&[1, 0, 0, 1, 0]).unwrap();
            assert_eq!(step.done, i == total, "step {i}");
        }
    }

    #[test]
    fn peak_price_applies_by_hour_of_step() {
        let mut env = Env::for_season(1, "winter").unwrap();
        env.reset();
        let prices: Vec<f64> = (0..HOURS_PER_DAY)
            .map(|_| env.step(&[0, 0, 1, 0, 0]).unwrap().electricity_price)
            .collect();
        let peak = TARIFF.peak_pence / 100.0;
        let off_peak = TARIFF.off_peak_pence / 100.0;
        assert_eq!(prices[6], off_peak);
        assert_eq!(prices[7], peak);
        assert_eq!(prices[16], peak);
        assert_eq!(prices[17], off_peak);
        assert_eq!(prices[19], peak);
        assert_eq!(prices[23], off_peak);
    }

    #[test]
    fn invalid_actions_fail_without_advancing() {
        let mut env = Env::for_season(1, "winter").unwrap();
        env.reset();
        assert!(matches!(env.step(&[0, 0, 1]), Err(Error::DomainViolation(_))));
        assert!(matches!(env.step(&[0, 3, 1, 0, 0]), Err(Error::DomainViolation(_))));
        assert_eq!(env.clock(), Clock::default());
        assert_eq!(env.state(), INITIAL_STATE);
    }

    #[test]
    fn zero_rooms_rejected() {
        assert!(matches!(Env::for_season(0, "winter"), Err(Error::Configuration(_))));
        assert!(matches!(Env::for_season(1, "spring"), Err(Error::Configuration(_))));
    }

    #[test]
    fn display_snapshot() {
        let mut env = Env::for_season(1, "winter").unwrap();
        env.reset();
        env.step(&[1, 0, 0, 0, 1]).unwrap();
        assert_eq!(env.to_string(), "Day: 0, Hour: 1, State: [1, 0, 1, 0, 1]");
    }
}
