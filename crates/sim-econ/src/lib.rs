#![deny(warnings)]

//! Simulation engine for the coherence economy.
//!
//! A run advances a small coupled system (capital, debt, carbon, coherence,
//! wage share and energy intensity) with explicit Euler steps and records one
//! [`Snapshot`] per tick. Each tick:
//! - computes damage-adjusted Cobb-Douglas potential output
//! - splits income into wages and profits to get aggregate demand
//! - realizes output as `R * min(supply, demand)`
//! - updates the stocks and the interest rate under the resolved policy

use sim_core::{
    validate_engine_config, validate_policy, EngineConfig, PolicyConfig, PolicyMode, Snapshot,
    StructuralParameters, Trajectory, ValidationError,
};
use thiserror::Error;
use tracing::{debug, info};

mod shocks;

pub use shocks::{FixedShock, GaussianShocks, NoShocks, ShockSource};

/// Errors produced by the engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Invalid selector, parameter or policy bounds.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Effective output was zero or non-finite, or debt overflowed, so
    /// debt-to-output is undefined.
    #[error("debt-to-output ratio undefined at tick {tick}: effective output {output}")]
    UndefinedRatio { tick: u32, output: f64 },
}

/// Mutable state of a single run. Built fresh from the parameters each run.
#[derive(Clone, Debug)]
struct SimulationState {
    capital: f64,
    debt: f64,
    carbon: f64,
    coherence: f64,
    wage_share: f64,
    energy_intensity: f64,
    technology: f64,
    prev_output: Option<f64>,
}

impl SimulationState {
    fn new(p: &StructuralParameters) -> Self {
        Self {
            capital: p.k0,
            debt: p.d0,
            carbon: p.c0,
            coherence: p.r0,
            wage_share: p.ws0,
            energy_intensity: p.energy_intensity,
            technology: p.a0,
            prev_output: None,
        }
    }

    /// Advance one tick and return its snapshot.
    fn step<S: ShockSource + ?Sized>(
        &mut self,
        tick: u32,
        p: &StructuralParameters,
        policy: &PolicyConfig,
        dt: f64,
        shocks: &mut S,
    ) -> Result<Snapshot, EngineError> {
        // Supply
        let damage_factor = 1.0 / (1.0 + p.damage_sens * self.carbon);
        let a_eff = self.technology * damage_factor;
        let y_pot = a_eff * self.capital.powf(p.alpha) * p.n.powf(1.0 - p.alpha);

        // Demand
        let wages = y_pot * self.wage_share;
        let profits = y_pot * (1.0 - self.wage_share);
        let consumption = p.c_w * wages + p.c_pi * profits;
        let investment = p.inv_sens * profits + policy.autonomous_investment * y_pot;
        let aggregate_demand = consumption + investment;

        let y_eff = self.coherence * y_pot.min(aggregate_demand);
        if !y_eff.is_finite() || y_eff == 0.0 {
            return Err(EngineError::UndefinedRatio {
                tick,
                output: y_eff,
            });
        }
        let realized_profit = y_eff * (1.0 - self.wage_share);

        self.capital += (investment - p.delta * self.capital) * dt;

        let growth_rate = match self.prev_output {
            Some(prev) => (y_eff - prev) / prev,
            None => policy.growth_seed,
        };
        let interest_rate = policy.interest_rule.rate(policy.base_r, growth_rate);

        let repayment = policy.repayment_share * y_eff;
        self.debt += (interest_rate * self.debt - repayment) * dt;

        let energy_intensity = self.energy_intensity;
        let emissions = y_eff * energy_intensity;
        self.carbon += emissions * dt;
        self.energy_intensity *= 1.0 - policy.decarb_rate();

        let shock = shocks.draw(policy.shock_std_dev);
        let coherence =
            self.coherence + (policy.r_restoration * (policy.r_target - self.coherence) + shock) * dt;
        self.coherence = policy.coherence_bounds.clamp(coherence);
        if self.coherence != coherence {
            debug!(tick, raw = coherence, clamped = self.coherence, "coherence clamped");
        }

        let wage_share = self.wage_share + policy.d_ws * dt;
        self.wage_share = policy.wage_share_bounds.clamp(wage_share);
        if self.wage_share != wage_share {
            debug!(tick, raw = wage_share, clamped = self.wage_share, "wage share clamped");
        }

        let debt_to_output = self.debt / y_eff;
        if !debt_to_output.is_finite() {
            return Err(EngineError::UndefinedRatio {
                tick,
                output: y_eff,
            });
        }
        self.prev_output = Some(y_eff);

        debug!(tick, y_pot, y_eff, debt = self.debt, r = self.coherence, "tick");
        Ok(Snapshot {
            tick,
            y_potential: y_pot,
            y_effective: y_eff,
            debt_to_output,
            coherence: self.coherence,
            carbon: self.carbon,
            wage_share: self.wage_share,
            profit: realized_profit,
            interest_rate,
            aggregate_demand,
            growth_rate,
            energy_intensity,
            capital: self.capital,
            debt: self.debt,
        })
    }
}

/// Runs policy scenarios over fixed structural parameters.
///
/// The engine holds only immutable configuration; every run builds its own
/// state, so repeated or concurrent runs never share mutable fields.
#[derive(Clone, Debug)]
pub struct SimulationEngine {
    config: EngineConfig,
}

impl SimulationEngine {
    /// Validate and store the configuration.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        validate_engine_config(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the regime named by a literal selector, `"BAU"` or `"INTEGRATED"`.
    pub fn run_named<S: ShockSource + ?Sized>(
        &self,
        mode: &str,
        shocks: &mut S,
    ) -> Result<Trajectory, EngineError> {
        let mode: PolicyMode = mode.parse()?;
        self.run(mode, shocks)
    }

    /// Run `mode` with Gaussian shocks from a seeded ChaCha stream.
    pub fn run_seeded(&self, mode: PolicyMode, seed: u64) -> Result<Trajectory, EngineError> {
        self.run(mode, &mut GaussianShocks::seeded(seed))
    }

    /// Run one regime from the initial conditions.
    pub fn run<S: ShockSource + ?Sized>(
        &self,
        mode: PolicyMode,
        shocks: &mut S,
    ) -> Result<Trajectory, EngineError> {
        let policy = PolicyConfig::resolve(mode, self.config.parameters.base_r);
        self.run_with_policy(&policy, shocks)
    }

    /// Run an explicitly supplied policy configuration.
    pub fn run_with_policy<S: ShockSource + ?Sized>(
        &self,
        policy: &PolicyConfig,
        shocks: &mut S,
    ) -> Result<Trajectory, EngineError> {
        validate_policy(policy)?;
        let params = &self.config.parameters;
        let steps = self.config.steps;
        info!(mode = %policy.mode, steps, dt = self.config.dt, "run starting");

        let mut state = SimulationState::new(params);
        let mut trajectory = Trajectory::with_capacity(steps as usize);
        for tick in 0..steps {
            let snap = state.step(tick, params, policy, self.config.dt, shocks)?;
            trajectory.push(snap);
        }

        if let Some(last) = trajectory.last() {
            info!(
                mode = %policy.mode,
                y_eff = last.y_effective,
                debt_to_output = last.debt_to_output,
                coherence = last.coherence,
                carbon = last.carbon,
                "run finished"
            );
        }
        Ok(trajectory)
    }
}
