#![deny(warnings)]

//! Headless CLI: run the policy regimes and print how they diverge.

use anyhow::{bail, Context, Result};
use sim_core::{PolicyMode, Series};
use sim_runtime::{load_config, ScenarioComparison, ScenarioRunner, ScenarioSet, SimConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<String>,
    /// `None` runs every regime.
    scenario: Option<PolicyMode>,
    steps: Option<u32>,
    seed: Option<u64>,
    json: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut out = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => out.config = Some(it.next().context("--config needs a path")?),
            "--scenario" => {
                let v = it.next().context("--scenario needs a value")?;
                out.scenario = match v.as_str() {
                    "both" => None,
                    other => Some(other.parse()?),
                };
            }
            "--steps" => {
                let v = it.next().context("--steps needs a value")?;
                out.steps = Some(v.parse().with_context(|| format!("bad --steps {v:?}"))?);
            }
            "--seed" => {
                let v = it.next().context("--seed needs a value")?;
                out.seed = Some(v.parse().with_context(|| format!("bad --seed {v:?}"))?);
            }
            "--json" => out.json = true,
            other => bail!("unknown argument {other:?}"),
        }
    }
    Ok(out)
}

fn resolve_config(args: &Args) -> Result<SimConfig> {
    let mut cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };
    if let Some(steps) = args.steps {
        cfg.steps = steps;
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    Ok(cfg)
}

fn to_json(set: &ScenarioSet) -> Result<String> {
    let mut map = serde_json::Map::new();
    for s in &set.scenarios {
        map.insert(
            s.mode.as_str().to_string(),
            serde_json::to_value(&s.trajectory)?,
        );
    }
    Ok(serde_json::to_string_pretty(&serde_json::Value::Object(map))?)
}

fn render_table(set: &ScenarioSet, cmp: &ScenarioComparison) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<11} {:>6} {:>10} {:>10} {:>9} {:>7} {:>10} {:>9}\n",
        "regime", "ticks", "Y_eff", "mean Y", "D/Y", "R", "carbon", "wage sh."
    ));
    for s in &cmp.summaries {
        out.push_str(&format!(
            "{:<11} {:>6} {:>10.2} {:>10.2} {:>9.3} {:>7.3} {:>10.1} {:>9.3}\n",
            s.mode.as_str(),
            s.ticks,
            s.final_output,
            s.mean_output,
            s.final_debt_to_output,
            s.final_coherence,
            s.final_carbon,
            s.final_wage_share
        ));
    }
    if let Some(g) = &cmp.gap {
        out.push_str(&format!(
            "gap (INTEGRATED - BAU) | Y_eff: {:+.2} | D/Y: {:+.3} | R: {:+.3} | carbon: {:+.1}\n",
            g.output, g.debt_to_output, g.coherence, g.carbon
        ));
    }
    for sc in &set.scenarios {
        let r = sc.trajectory.series(Series::Coherence);
        let min = r.iter().copied().fold(f64::INFINITY, f64::min);
        let max = r.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        out.push_str(&format!(
            "{} | seed: {} | R range: [{:.3}, {:.3}]\n",
            sc.mode, sc.seed, min, max
        ));
    }
    out
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for --json.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    info!(?args, "starting CLI");

    let cfg = resolve_config(&args)?;
    let runner = ScenarioRunner::from_config(&cfg)?;
    let set = match args.scenario {
        Some(mode) => runner.run_modes(&[mode])?,
        None => runner.run_all()?,
    };

    if args.json {
        println!("{}", to_json(&set)?);
    } else {
        let cmp = ScenarioComparison::from_set(&set);
        print!("{}", render_table(&set, &cmp));
    }
    Ok(())
}
