#![deny(warnings)]

//! Scenario orchestration on top of the simulation engine.
//!
//! Loads a YAML configuration, runs each policy regime on its own seeded
//! shock stream and summarizes how the regimes diverge.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sim_core::{EngineConfig, PolicyMode, Series, StructuralParameters, Trajectory};
use sim_econ::{GaussianShocks, SimulationEngine};
use std::path::Path;
use tracing::info;

/// Run configuration as read from disk. Every field is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Ticks per regime (>= 1).
    pub steps: u32,
    /// Time-step size (> 0).
    pub dt: f64,
    /// Master seed for the coherence shocks.
    pub seed: u64,
    /// Overrides merged onto the baseline parameters.
    pub parameters: StructuralParameters,
}

impl Default for SimConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            steps: engine.steps,
            dt: engine.dt,
            seed: 42,
            parameters: engine.parameters,
        }
    }
}

impl SimConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing simulation config")
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            steps: self.steps,
            dt: self.dt,
            parameters: self.parameters.clone(),
        }
    }
}

/// Read a YAML config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SimConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    SimConfig::from_yaml_str(&text).with_context(|| format!("in {}", path.display()))
}

/// Seed for one regime's shock stream, derived from the master seed.
/// Slots follow `PolicyMode::ALL`; append only.
pub fn regime_seed(master_seed: u64, mode: PolicyMode) -> u64 {
    let slot = match mode {
        PolicyMode::Bau => 0u64,
        PolicyMode::Integrated => 1,
    };
    master_seed ^ slot.wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Trajectory of one regime.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    pub mode: PolicyMode,
    /// Seed of this regime's shock stream.
    pub seed: u64,
    pub trajectory: Trajectory,
}

/// Scenarios in the order they were run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenarioSet {
    pub scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    pub fn get(&self, mode: PolicyMode) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.mode == mode)
    }
}

/// Runs regimes against one engine with per-regime seeds.
pub struct ScenarioRunner {
    engine: SimulationEngine,
    master_seed: u64,
}

impl ScenarioRunner {
    pub fn new(config: EngineConfig, master_seed: u64) -> Result<Self> {
        let engine = SimulationEngine::new(config).context("invalid engine configuration")?;
        Ok(Self {
            engine,
            master_seed,
        })
    }

    pub fn from_config(config: &SimConfig) -> Result<Self> {
        Self::new(config.engine_config(), config.seed)
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    pub fn run(&self, mode: PolicyMode) -> Result<Scenario> {
        let seed = regime_seed(self.master_seed, mode);
        let mut shocks = GaussianShocks::seeded(seed);
        let trajectory = self
            .engine
            .run(mode, &mut shocks)
            .with_context(|| format!("running {mode} scenario"))?;
        Ok(Scenario {
            mode,
            seed,
            trajectory,
        })
    }

    /// Run the given regimes in order.
    pub fn run_modes(&self, modes: &[PolicyMode]) -> Result<ScenarioSet> {
        let mut set = ScenarioSet::default();
        for &mode in modes {
            set.scenarios.push(self.run(mode)?);
        }
        info!(scenarios = set.scenarios.len(), "scenarios complete");
        Ok(set)
    }

    /// BAU then INTEGRATED.
    pub fn run_all(&self) -> Result<ScenarioSet> {
        self.run_modes(&PolicyMode::ALL)
    }
}

/// End-of-run figures for one regime.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegimeSummary {
    pub mode: PolicyMode,
    /// Snapshots recorded.
    pub ticks: usize,
    /// Effective output at the last tick.
    pub final_output: f64,
    /// Effective output averaged over the run.
    pub mean_output: f64,
    pub final_debt_to_output: f64,
    pub final_coherence: f64,
    pub final_carbon: f64,
    pub final_wage_share: f64,
}

impl RegimeSummary {
    pub fn from_scenario(s: &Scenario) -> Option<Self> {
        let last = s.trajectory.last()?;
        Some(Self {
            mode: s.mode,
            ticks: s.trajectory.len(),
            final_output: last.y_effective,
            mean_output: s.trajectory.mean(Series::EffectiveOutput)?,
            final_debt_to_output: last.debt_to_output,
            final_coherence: last.coherence,
            final_carbon: last.carbon,
            final_wage_share: last.wage_share,
        })
    }
}

/// Final-tick differences, INTEGRATED minus BAU.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegimeGap {
    pub output: f64,
    pub debt_to_output: f64,
    pub coherence: f64,
    pub carbon: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioComparison {
    /// One entry per completed regime, in run order.
    pub summaries: Vec<RegimeSummary>,
    /// Present only when both regimes were run.
    pub gap: Option<RegimeGap>,
}

impl ScenarioComparison {
    pub fn from_set(set: &ScenarioSet) -> Self {
        let summaries: Vec<RegimeSummary> = set
            .scenarios
            .iter()
            .filter_map(RegimeSummary::from_scenario)
            .collect();
        let find = |mode: PolicyMode| summaries.iter().find(|s| s.mode == mode);
        let gap = match (find(PolicyMode::Bau), find(PolicyMode::Integrated)) {
            (Some(b), Some(i)) => Some(RegimeGap {
                output: i.final_output - b.final_output,
                debt_to_output: i.final_debt_to_output - b.final_debt_to_output,
                coherence: i.final_coherence - b.final_coherence,
                carbon: i.final_carbon - b.final_carbon,
            }),
            _ => None,
        };
        Self { summaries, gap }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn runner(steps: u32) -> ScenarioRunner {
        let cfg = SimConfig {
            steps,
            ..SimConfig::default()
        };
        ScenarioRunner::from_config(&cfg).unwrap()
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let cfg = SimConfig::from_yaml_str(
            "steps: 40\nseed: 7\nparameters:\n  k0: 150.0\n  damage_sens: 0.004\n",
        )
        .unwrap();
        assert_eq!(cfg.steps, 40);
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.dt, 1.0);
        assert_eq!(cfg.parameters.k0, 150.0);
        assert_eq!(cfg.parameters.damage_sens, 0.004);
        assert_eq!(cfg.parameters.n, 100.0);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(SimConfig::from_yaml_str("{}").unwrap(), SimConfig::default());
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(SimConfig::from_yaml_str("stepz: 10\n").is_err());
    }

    #[test]
    fn out_of_range_coherence_in_yaml_fails_to_build() {
        let cfg = SimConfig::from_yaml_str("parameters:\n  r0: 1.5\n").unwrap();
        let err = ScenarioRunner::from_config(&cfg).err().unwrap();
        assert!(format!("{err:#}").contains("r0"));
    }

    #[test]
    fn zero_steps_config_fails_to_build() {
        let cfg = SimConfig {
            steps: 0,
            ..SimConfig::default()
        };
        assert!(ScenarioRunner::from_config(&cfg).is_err());
    }

    #[test]
    fn regimes_get_distinct_seeds() {
        assert_eq!(regime_seed(42, PolicyMode::Bau), 42);
        assert_ne!(
            regime_seed(42, PolicyMode::Bau),
            regime_seed(42, PolicyMode::Integrated)
        );
    }

    #[test]
    fn run_all_is_reproducible_and_ordered() {
        let r = runner(60);
        let a = r.run_all().unwrap();
        let b = r.run_all().unwrap();
        assert_eq!(a, b);
        let modes: Vec<PolicyMode> = a.scenarios.iter().map(|s| s.mode).collect();
        assert_eq!(modes, PolicyMode::ALL.to_vec());
        assert!(a.scenarios.iter().all(|s| s.trajectory.len() == 60));
    }

    #[test]
    fn integrated_keeps_coherence_higher_and_carbon_lower() {
        let set = runner(100).run_all().unwrap();
        let cmp = ScenarioComparison::from_set(&set);
        let gap = cmp.gap.unwrap();
        assert!(gap.coherence > 0.0);
        assert!(gap.carbon < 0.0);
        assert_eq!(cmp.summaries.len(), 2);
        assert_eq!(cmp.summaries[0].ticks, 100);
    }

    #[test]
    fn single_regime_has_no_gap() {
        let set = runner(10).run_modes(&[PolicyMode::Integrated]).unwrap();
        let cmp = ScenarioComparison::from_set(&set);
        assert!(cmp.gap.is_none());
        assert_eq!(cmp.summaries[0].mode, PolicyMode::Integrated);
        assert!(set.get(PolicyMode::Bau).is_none());
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config("/nonexistent/coherence.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("reading config"));
    }

    #[test]
    fn bundled_config_runs() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../configs/high_damage.yaml");
        let cfg = load_config(path).unwrap();
        assert_eq!(cfg.steps, 200);
        assert_eq!(cfg.parameters.damage_sens, 0.005);
        let set = ScenarioRunner::from_config(&cfg).unwrap().run_all().unwrap();
        assert_eq!(set.get(PolicyMode::Bau).unwrap().trajectory.len(), 200);
    }

    proptest! {
        #[test]
        fn summaries_match_last_snapshot(seed in any::<u64>()) {
            let cfg = SimConfig { steps: 12, seed, ..SimConfig::default() };
            let set = ScenarioRunner::from_config(&cfg).unwrap().run_all().unwrap();
            let cmp = ScenarioComparison::from_set(&set);
            for (sum, sc) in cmp.summaries.iter().zip(&set.scenarios) {
                let last = sc.trajectory.last().unwrap();
                prop_assert_eq!(sum.final_output, last.y_effective);
                prop_assert_eq!(sum.final_coherence, last.coherence);
            }
        }
    }
}
