//! Atomic per-step contract templates.
//!
//! Every template takes a step index `s` and a [`RateRange`] and returns one
//! contract for one domain. The policy is the same for all of them:
//!
//! - assumptions: non-negative task duration and entry state within its
//!   domain, plus the resource-safety condition of the template;
//! - guarantees: the state delta bounded by the rate range, and exit state
//!   within its domain.
//!
//! # Templates
//!
//! | template | state | duration | delta |
//! |----------|-------|----------|-------|
//! | [`charge`](ContractFactory::charge) | soc | charging | `exit − entry` |
//! | [`power_consumer`](ContractFactory::power_consumer) | soc | task | `entry − exit` |
//! | [`downlink`](ContractFactory::downlink) | d | dsn | `entry − exit` |
//! | [`science_storage`](ContractFactory::science_storage) | d | sbo | `exit − entry` |
//! | [`science_cumulative`](ContractFactory::science_cumulative) | c | sbo | `exit − entry` |
//! | [`uncertainty_growth`](ContractFactory::uncertainty_growth) | u, r | none | `u_exit − u_entry` |
//! | [`uncertainty_improvement`](ContractFactory::uncertainty_improvement) | u | sbo | `entry − exit` |
//! | [`maneuver_uncertainty`](ContractFactory::maneuver_uncertainty) | u | tcm_dv | `exit − entry` |
//! | [`maneuver_progress`](ContractFactory::maneuver_progress) | r | tcm_dv | `entry − exit` |
//! | [`no_change`](ContractFactory::no_change) | any | none | `exit = entry` |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::algebra::{Contract, ContractAlgebra};
use crate::counts::OperationCounts;
use crate::error::ContractError;

/// Tracked state quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StateVar {
    /// Battery state of charge, in [0, 100].
    Soc,
    /// Stored data volume, in [0, 100].
    Data,
    /// Cumulative science volume, non-negative.
    Cumulative,
    /// Trajectory estimation uncertainty, non-negative.
    Uncertainty,
    /// Relative trajectory distance, non-negative.
    Distance,
}

impl StateVar {
    /// Every state, in power, science, navigation order.
    pub const ALL: [StateVar; 5] = [
        StateVar::Soc,
        StateVar::Data,
        StateVar::Cumulative,
        StateVar::Uncertainty,
        StateVar::Distance,
    ];
    pub const POWER: [StateVar; 1] = [StateVar::Soc];
    pub const SCIENCE: [StateVar; 2] = [StateVar::Data, StateVar::Cumulative];
    pub const NAVIGATION: [StateVar; 2] = [StateVar::Uncertainty, StateVar::Distance];

    /// Variable-name prefix.
    pub fn symbol(self) -> &'static str {
        match self {
            StateVar::Soc => "soc",
            StateVar::Data => "d",
            StateVar::Cumulative => "c",
            StateVar::Uncertainty => "u",
            StateVar::Distance => "r",
        }
    }

    /// Upper end of the domain, `None` when unbounded above.
    pub fn upper_limit(self) -> Option<f64> {
        match self {
            StateVar::Soc | StateVar::Data => Some(100.0),
            StateVar::Cumulative | StateVar::Uncertainty | StateVar::Distance => None,
        }
    }

    pub fn entry(self, s: usize) -> String {
        format!("{}{s}_entry", self.symbol())
    }

    pub fn exit(self, s: usize) -> String {
        format!("{}{s}_exit", self.symbol())
    }

    /// Name an exit variable takes once a later step has consumed it.
    pub fn output(self, s: usize) -> String {
        format!("output_{}{s}", self.symbol())
    }

    fn domain(self, name: &str) -> String {
        match self.upper_limit() {
            Some(max) => format!("0 <= {name} <= {max}"),
            None => format!("0 <= {name}"),
        }
    }
}

impl fmt::Display for StateVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Task kinds of the canonical timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Task {
    /// Deep space network pass (communication).
    Dsn,
    /// Battery charging.
    Charging,
    /// Small body observation.
    Sbo,
    /// Trajectory correction maneuver, heating.
    TcmH,
    /// Trajectory correction maneuver, delta-v.
    TcmDv,
}

impl Task {
    /// Tasks of one five-step block, in execution order.
    pub const CYCLE: [Task; 5] = [Task::Dsn, Task::Charging, Task::Sbo, Task::TcmH, Task::TcmDv];

    pub fn name(self) -> &'static str {
        match self {
            Task::Dsn => "dsn",
            Task::Charging => "charging",
            Task::Sbo => "sbo",
            Task::TcmH => "tcm_h",
            Task::TcmDv => "tcm_dv",
        }
    }

    /// Duration variable of this task at step `s`.
    pub fn duration(self, s: usize) -> String {
        format!("duration_{}{s}", self.name())
    }
}

/// Closed rate interval `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateRange {
    low: f64,
    high: f64,
}

impl RateRange {
    /// Fails with `InvalidRange` unless both ends are finite and `low <= high`.
    pub fn new(low: f64, high: f64) -> Result<Self, ContractError> {
        if !low.is_finite() || !high.is_finite() || low > high {
            return Err(ContractError::InvalidRange { low, high });
        }
        Ok(Self { low, high })
    }

    /// `[mean·(1−dev), mean·(1+dev)]`.
    pub fn from_mean_deviation(mean: f64, deviation: f64) -> Result<Self, ContractError> {
        let delta = mean * deviation;
        Self::new(mean - delta, mean + delta)
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }
}

/// Direction of the bounded state delta.
#[derive(Debug, Clone, Copy)]
enum Delta {
    Increase,
    Decrease,
}

/// Builds template contracts and counts what it builds.
///
/// One factory serves one unit of work; its [`OperationCounts`] are read
/// out with [`counts`](Self::counts) once the unit is done.
///
/// # Example
/// ```
/// use mission_contracts::algebra::{ContractAlgebra, Polyhedra};
/// use mission_contracts::factory::{ContractFactory, RateRange};
///
/// let algebra = Polyhedra::new();
/// let mut factory = ContractFactory::new(&algebra);
/// let c = factory.charge(2, RateRange::new(2.5, 3.5).unwrap()).unwrap();
/// assert!(c.has_input("duration_charging2"));
/// assert_eq!(factory.counts().contracts, 1);
/// ```
pub struct ContractFactory<'a, A> {
    algebra: &'a A,
    counts: OperationCounts,
}

impl<'a, A: ContractAlgebra> ContractFactory<'a, A> {
    pub fn new(algebra: &'a A) -> Self {
        Self {
            algebra,
            counts: OperationCounts::default(),
        }
    }

    pub fn algebra(&self) -> &'a A {
        self.algebra
    }

    pub fn counts(&self) -> OperationCounts {
        self.counts
    }

    pub(crate) fn counts_mut(&mut self) -> &mut OperationCounts {
        &mut self.counts
    }

    /// Parses and validates a contract, counting it.
    pub fn build(
        &mut self,
        inputs: Vec<String>,
        outputs: Vec<String>,
        assumptions: &[String],
        guarantees: &[String],
    ) -> Result<Contract, ContractError> {
        let contract = self
            .algebra
            .construct_from_strings(inputs, outputs, assumptions, guarantees)?;
        self.counts.contracts += 1;
        Ok(contract)
    }

    fn rate_template(
        &mut self,
        s: usize,
        state: StateVar,
        task: Task,
        rate: RateRange,
        delta: Delta,
        safety: Option<String>,
    ) -> Result<Contract, ContractError> {
        let (entry, exit, dur) = (state.entry(s), state.exit(s), task.duration(s));
        let difference = match delta {
            Delta::Increase => format!("{exit} - {entry}"),
            Delta::Decrease => format!("{entry} - {exit}"),
        };
        let mut assumptions = vec![format!("0 <= {dur}"), state.domain(&entry)];
        assumptions.extend(safety);
        let guarantees = vec![
            format!("{}*{dur} <= {difference} <= {}*{dur}", rate.low, rate.high),
            state.domain(&exit),
        ];
        self.build(vec![entry, dur], vec![exit], &assumptions, &guarantees)
    }

    /// Battery charging; the worst case must not overcharge.
    pub fn charge(&mut self, s: usize, generation: RateRange) -> Result<Contract, ContractError> {
        let safety = format!(
            "{} + {}*{} <= 100",
            StateVar::Soc.entry(s),
            generation.high,
            Task::Charging.duration(s)
        );
        self.rate_template(
            s,
            StateVar::Soc,
            Task::Charging,
            generation,
            Delta::Increase,
            Some(safety),
        )
    }

    /// Battery discharge during `task`; the battery must hold enough energy
    /// for the worst-case consumption.
    pub fn power_consumer(
        &mut self,
        s: usize,
        task: Task,
        consumption: RateRange,
    ) -> Result<Contract, ContractError> {
        let safety = format!(
            "{} >= {}*{}",
            StateVar::Soc.entry(s),
            consumption.high,
            task.duration(s)
        );
        self.rate_template(s, StateVar::Soc, task, consumption, Delta::Decrease, Some(safety))
    }

    /// Data downlink during a DSN pass.
    pub fn downlink(&mut self, s: usize, speed: RateRange) -> Result<Contract, ContractError> {
        self.rate_template(s, StateVar::Data, Task::Dsn, speed, Delta::Decrease, None)
    }

    /// Science data stored during an observation; storage must not overflow.
    pub fn science_storage(
        &mut self,
        s: usize,
        generation: RateRange,
    ) -> Result<Contract, ContractError> {
        let safety = format!(
            "{} + {}*{} <= 100",
            StateVar::Data.entry(s),
            generation.high,
            Task::Sbo.duration(s)
        );
        self.rate_template(
            s,
            StateVar::Data,
            Task::Sbo,
            generation,
            Delta::Increase,
            Some(safety),
        )
    }

    /// Science volume accumulated during an observation.
    pub fn science_cumulative(
        &mut self,
        s: usize,
        generation: RateRange,
    ) -> Result<Contract, ContractError> {
        self.rate_template(
            s,
            StateVar::Cumulative,
            Task::Sbo,
            generation,
            Delta::Increase,
            None,
        )
    }

    /// Navigation noise accumulated over a step without tracking; the
    /// relative distance does not change.
    pub fn uncertainty_growth(
        &mut self,
        s: usize,
        noise: RateRange,
    ) -> Result<Contract, ContractError> {
        let (u_in, u_out) = (StateVar::Uncertainty.entry(s), StateVar::Uncertainty.exit(s));
        let (r_in, r_out) = (StateVar::Distance.entry(s), StateVar::Distance.exit(s));
        let assumptions = vec![
            StateVar::Uncertainty.domain(&u_in),
            StateVar::Distance.domain(&r_in),
        ];
        let guarantees = vec![
            format!("{} <= {u_out} - {u_in} <= {}", noise.low, noise.high),
            format!("|{r_out} - {r_in}| <= 0"),
            StateVar::Uncertainty.domain(&u_out),
            StateVar::Distance.domain(&r_out),
        ];
        self.build(vec![u_in, r_in], vec![u_out, r_out], &assumptions, &guarantees)
    }

    /// Uncertainty reduction from optical navigation during an observation.
    pub fn uncertainty_improvement(
        &mut self,
        s: usize,
        improvement: RateRange,
    ) -> Result<Contract, ContractError> {
        self.rate_template(
            s,
            StateVar::Uncertainty,
            Task::Sbo,
            improvement,
            Delta::Decrease,
            None,
        )
    }

    /// Uncertainty added by a delta-v maneuver.
    pub fn maneuver_uncertainty(
        &mut self,
        s: usize,
        noise: RateRange,
    ) -> Result<Contract, ContractError> {
        self.rate_template(
            s,
            StateVar::Uncertainty,
            Task::TcmDv,
            noise,
            Delta::Increase,
            None,
        )
    }

    /// Progress toward the target trajectory during a delta-v maneuver.
    pub fn maneuver_progress(
        &mut self,
        s: usize,
        progress: RateRange,
    ) -> Result<Contract, ContractError> {
        self.rate_template(
            s,
            StateVar::Distance,
            Task::TcmDv,
            progress,
            Delta::Decrease,
            None,
        )
    }

    /// Threads `state` unchanged through step `s`.
    pub fn no_change(&mut self, s: usize, state: StateVar) -> Result<Contract, ContractError> {
        let (entry, exit) = (state.entry(s), state.exit(s));
        let assumptions = vec![state.domain(&entry)];
        let guarantees = vec![format!("{exit} = {entry}")];
        self.build(vec![entry], vec![exit], &assumptions, &guarantees)
    }
}
