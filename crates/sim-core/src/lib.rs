#![deny(warnings)]

//! Core domain models and invariants for the coherence economy simulator.
//!
//! This crate defines the structural parameters, the policy regimes and their
//! resolved configuration, and the per-tick snapshots recorded by the engine,
//! together with validation helpers that guard the basic invariants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Validation errors for domain invariants.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Policy selector is not one of the recognized regimes.
    #[error("invalid policy mode: {0:?} (expected \"BAU\" or \"INTEGRATED\")")]
    InvalidPolicyMode(String),
    /// Numeric field is out of its admissible range or non-finite.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    /// A `[min, max]` pair with `min > max`.
    #[error("inconsistent bounds for {name}: [{min}, {max}]")]
    InconsistentBounds {
        name: &'static str,
        min: f64,
        max: f64,
    },
}

/// Fixed structural parameters and initial conditions of the economy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralParameters {
    /// Initial capital stock (> 0).
    pub k0: f64,
    /// Labor force, constant for the run (> 0).
    pub n: f64,
    /// Technology level, constant for the run (>= 0).
    pub a0: f64,
    /// Initial private debt.
    pub d0: f64,
    /// Initial accumulated carbon stock (>= 0).
    pub c0: f64,
    /// Initial coherence factor, in (0, 1].
    pub r0: f64,
    /// Initial wage share, in [0, 1].
    pub ws0: f64,
    /// Capital exponent in the Cobb-Douglas production function, in [0, 1].
    pub alpha: f64,
    /// Capital depreciation per unit time.
    pub delta: f64,
    /// Marginal propensity to consume out of wages.
    pub c_w: f64,
    /// Marginal propensity to consume out of profits.
    pub c_pi: f64,
    /// Investment sensitivity to the profit bill.
    pub inv_sens: f64,
    /// Productivity damage per unit of carbon stock.
    pub damage_sens: f64,
    /// Initial energy (emissions) per unit of output.
    pub energy_intensity: f64,
    /// Nominal interest baseline.
    pub base_r: f64,
}

impl Default for StructuralParameters {
    fn default() -> Self {
        Self {
            k0: 100.0,
            n: 100.0,
            a0: 1.0,
            d0: 80.0,
            c0: 10.0,
            r0: 0.8,
            ws0: 0.65,
            alpha: 0.35,
            delta: 0.05,
            c_w: 0.9,
            c_pi: 0.4,
            inv_sens: 0.15,
            damage_sens: 0.002,
            energy_intensity: 0.5,
            base_r: 0.04,
        }
    }
}

/// The two policy regimes compared by the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyMode {
    /// Business as usual.
    #[serde(rename = "BAU")]
    Bau,
    /// Integrated policy bundle: carbon tax, wage floor, managed rates and
    /// investment in coherence.
    #[serde(rename = "INTEGRATED")]
    Integrated,
}

impl PolicyMode {
    /// All regimes, in the order scenarios are usually reported.
    pub const ALL: [PolicyMode; 2] = [PolicyMode::Bau, PolicyMode::Integrated];

    /// Literal selector string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyMode::Bau => "BAU",
            PolicyMode::Integrated => "INTEGRATED",
        }
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BAU" => Ok(PolicyMode::Bau),
            "INTEGRATED" => Ok(PolicyMode::Integrated),
            other => Err(ValidationError::InvalidPolicyMode(other.to_string())),
        }
    }
}

/// Closed interval used for clamping state variables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower edge (inclusive).
    pub min: f64,
    /// Upper edge (inclusive), >= `min`.
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `v` into the interval. Assumes the bounds were validated.
    pub fn clamp(&self, v: f64) -> f64 {
        v.max(self.min).min(self.max)
    }

    pub fn contains(&self, v: f64) -> bool {
        (self.min..=self.max).contains(&v)
    }

    fn validate(&self, name: &'static str) -> Result<(), ValidationError> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(ValidationError::InconsistentBounds {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// How the effective interest rate is set each tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum InterestRule {
    /// Sticky rate equal to the baseline regardless of growth.
    Fixed,
    /// Rate tracks output growth minus `margin`, floored at `floor` and
    /// capped at the baseline.
    GrowthTracking { floor: f64, margin: f64 },
}

impl InterestRule {
    /// Effective rate given the baseline and the current growth rate.
    pub fn rate(&self, base_r: f64, growth: f64) -> f64 {
        match *self {
            InterestRule::Fixed => base_r,
            InterestRule::GrowthTracking { floor, margin } => base_r.min(floor.max(growth - margin)),
        }
    }
}

/// Policy configuration resolved once per run from a [`PolicyMode`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Regime this configuration was resolved from.
    pub mode: PolicyMode,
    /// Carbon tax rate (>= 0).
    pub tau: f64,
    /// Wage-share drift per unit time.
    pub d_ws: f64,
    /// Clamp applied to the wage share after each drift.
    pub wage_share_bounds: Bounds,
    /// Coherence level the economy is pulled towards, in (0, 1].
    pub r_target: f64,
    /// Speed of coherence restoration (>= 0).
    pub r_restoration: f64,
    /// Clamp applied to coherence after each update.
    pub coherence_bounds: Bounds,
    /// Interest baseline; the ceiling of the growth-tracking rule.
    pub base_r: f64,
    /// How the effective rate responds to output growth.
    pub interest_rule: InterestRule,
    /// Decarbonization rate applied every tick.
    pub base_decarb: f64,
    /// Extra decarbonization while a carbon tax is in force.
    pub tax_decarb_bonus: f64,
    /// Autonomous investment as a share of potential output.
    pub autonomous_investment: f64,
    /// Debt repayment as a share of effective output.
    pub repayment_share: f64,
    /// Standard deviation of the coherence shock.
    pub shock_std_dev: f64,
    /// Growth rate assumed at tick 0, where no history exists.
    pub growth_seed: f64,
}

impl PolicyConfig {
    /// Resolve the fixed lookup table for `mode`.
    pub fn resolve(mode: PolicyMode, base_r: f64) -> Self {
        let (tau, d_ws, r_target, r_restoration, interest_rule) = match mode {
            PolicyMode::Bau => (0.0, -0.002, 0.60, 0.01, InterestRule::Fixed),
            PolicyMode::Integrated => (
                0.05,
                0.0005,
                0.95,
                0.05,
                InterestRule::GrowthTracking {
                    floor: 0.01,
                    margin: 0.005,
                },
            ),
        };
        Self {
            mode,
            tau,
            d_ws,
            wage_share_bounds: Bounds::new(0.4, 0.9),
            r_target,
            r_restoration,
            coherence_bounds: Bounds::new(0.1, 1.0),
            base_r,
            interest_rule,
            base_decarb: 0.01,
            tax_decarb_bonus: 0.05,
            autonomous_investment: 0.02,
            repayment_share: 0.02,
            shock_std_dev: 0.01,
            growth_seed: 0.02,
        }
    }

    /// Per-tick proportional reduction of energy intensity.
    pub fn decarb_rate(&self) -> f64 {
        if self.tau > 0.0 {
            self.base_decarb + self.tax_decarb_bonus
        } else {
            self.base_decarb
        }
    }
}

/// Validate resolved policy configuration.
pub fn validate_policy(p: &PolicyConfig) -> Result<(), ValidationError> {
    p.wage_share_bounds.validate("wage_share_bounds")?;
    p.coherence_bounds.validate("coherence_bounds")?;
    non_negative("tau", p.tau)?;
    non_negative("r_restoration", p.r_restoration)?;
    non_negative("base_r", p.base_r)?;
    non_negative("shock_std_dev", p.shock_std_dev)?;
    finite("d_ws", p.d_ws)?;
    finite("growth_seed", p.growth_seed)?;
    if !(p.r_target.is_finite() && p.r_target > 0.0 && p.r_target <= 1.0) {
        return Err(ValidationError::InvalidParameter {
            name: "r_target",
            value: p.r_target,
        });
    }
    let decarb = p.decarb_rate();
    if !(0.0..1.0).contains(&decarb) {
        return Err(ValidationError::InvalidParameter {
            name: "decarb_rate",
            value: decarb,
        });
    }
    if let InterestRule::GrowthTracking { floor, margin } = p.interest_rule {
        finite("interest_floor", floor)?;
        finite("interest_margin", margin)?;
        if floor > p.base_r {
            return Err(ValidationError::InconsistentBounds {
                name: "interest_rate",
                min: floor,
                max: p.base_r,
            });
        }
    }
    Ok(())
}

fn finite(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::InvalidParameter { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidParameter { name, value })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidParameter { name, value })
    }
}

/// Validate structural parameters.
pub fn validate_parameters(p: &StructuralParameters) -> Result<(), ValidationError> {
    positive("k0", p.k0)?;
    positive("n", p.n)?;
    non_negative("a0", p.a0)?;
    finite("d0", p.d0)?;
    non_negative("c0", p.c0)?;
    if !(p.r0.is_finite() && p.r0 > 0.0 && p.r0 <= 1.0) {
        return Err(ValidationError::InvalidParameter {
            name: "r0",
            value: p.r0,
        });
    }
    if !(0.0..=1.0).contains(&p.ws0) {
        return Err(ValidationError::InvalidParameter {
            name: "ws0",
            value: p.ws0,
        });
    }
    non_negative("alpha", p.alpha)?;
    if p.alpha > 1.0 {
        return Err(ValidationError::InvalidParameter {
            name: "alpha",
            value: p.alpha,
        });
    }
    non_negative("delta", p.delta)?;
    non_negative("c_w", p.c_w)?;
    non_negative("c_pi", p.c_pi)?;
    non_negative("inv_sens", p.inv_sens)?;
    non_negative("damage_sens", p.damage_sens)?;
    non_negative("energy_intensity", p.energy_intensity)?;
    non_negative("base_r", p.base_r)?;
    Ok(())
}

/// Engine construction parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of ticks per run (>= 1).
    pub steps: u32,
    /// Time-step size (> 0).
    pub dt: f64,
    /// Initial conditions and structural coefficients.
    pub parameters: StructuralParameters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            dt: 1.0,
            parameters: StructuralParameters::default(),
        }
    }
}

/// Validate engine configuration. A zero step count is rejected.
pub fn validate_engine_config(c: &EngineConfig) -> Result<(), ValidationError> {
    if c.steps == 0 {
        return Err(ValidationError::InvalidParameter {
            name: "steps",
            value: 0.0,
        });
    }
    positive("dt", c.dt)?;
    validate_parameters(&c.parameters)
}

/// State recorded at the end of one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tick index, starting at 0.
    #[serde(rename = "t")]
    pub tick: u32,
    /// Damage-adjusted Cobb-Douglas capacity.
    #[serde(rename = "Y_potential")]
    pub y_potential: f64,
    /// Output realized after the coherence factor.
    #[serde(rename = "Y_effective")]
    pub y_effective: f64,
    /// Debt after this tick over effective output.
    #[serde(rename = "D_Y_ratio")]
    pub debt_to_output: f64,
    /// Coherence after this tick's update.
    #[serde(rename = "R")]
    pub coherence: f64,
    /// Carbon stock after this tick's emissions.
    #[serde(rename = "Carbon")]
    pub carbon: f64,
    /// Wage share after this tick's drift.
    #[serde(rename = "WageShare")]
    pub wage_share: f64,
    /// Profit realized on effective output.
    #[serde(rename = "Profit")]
    pub profit: f64,
    /// Effective interest rate applied to debt.
    #[serde(rename = "Real_r")]
    pub interest_rate: f64,
    /// Consumption plus investment at potential output.
    #[serde(rename = "AD")]
    pub aggregate_demand: f64,
    /// Growth rate of effective output used by the interest rule.
    #[serde(rename = "g_Y")]
    pub growth_rate: f64,
    /// Energy intensity applied to this tick's emissions.
    #[serde(rename = "EI")]
    pub energy_intensity: f64,
    /// Capital after accumulation.
    #[serde(rename = "K")]
    pub capital: f64,
    /// Debt after interest and repayment.
    #[serde(rename = "D")]
    pub debt: f64,
}

/// Named columns of a trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Series {
    Tick,
    PotentialOutput,
    EffectiveOutput,
    DebtToOutput,
    Coherence,
    Carbon,
    WageShare,
    Profit,
    InterestRate,
}

impl Series {
    /// The recorded series in table column order.
    pub const ALL: [Series; 9] = [
        Series::Tick,
        Series::PotentialOutput,
        Series::EffectiveOutput,
        Series::DebtToOutput,
        Series::Coherence,
        Series::Carbon,
        Series::WageShare,
        Series::Profit,
        Series::InterestRate,
    ];

    /// Column name.
    pub fn name(&self) -> &'static str {
        match self {
            Series::Tick => "t",
            Series::PotentialOutput => "Y_potential",
            Series::EffectiveOutput => "Y_effective",
            Series::DebtToOutput => "D_Y_ratio",
            Series::Coherence => "R",
            Series::Carbon => "Carbon",
            Series::WageShare => "WageShare",
            Series::Profit => "Profit",
            Series::InterestRate => "Real_r",
        }
    }

    fn value(&self, s: &Snapshot) -> f64 {
        match self {
            Series::Tick => f64::from(s.tick),
            Series::PotentialOutput => s.y_potential,
            Series::EffectiveOutput => s.y_effective,
            Series::DebtToOutput => s.debt_to_output,
            Series::Coherence => s.coherence,
            Series::Carbon => s.carbon,
            Series::WageShare => s.wage_share,
            Series::Profit => s.profit,
            Series::InterestRate => s.interest_rate,
        }
    }
}

/// Ordered snapshots of one run, in tick order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trajectory {
    snapshots: Vec<Snapshot>,
}

impl Trajectory {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            snapshots: Vec::with_capacity(n),
        }
    }

    /// Append the next snapshot. Ticks must arrive in order.
    pub fn push(&mut self, s: Snapshot) {
        debug_assert_eq!(s.tick as usize, self.snapshots.len());
        self.snapshots.push(s);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    pub fn first(&self) -> Option<&Snapshot> {
        self.snapshots.first()
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Extract one column.
    pub fn series(&self, series: Series) -> Vec<f64> {
        self.snapshots.iter().map(|s| series.value(s)).collect()
    }

    /// Mean of a column; `None` for an empty trajectory.
    pub fn mean(&self, series: Series) -> Option<f64> {
        if self.snapshots.is_empty() {
            return None;
        }
        let sum: f64 = self.snapshots.iter().map(|s| series.value(s)).sum();
        Some(sum / self.snapshots.len() as f64)
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}
