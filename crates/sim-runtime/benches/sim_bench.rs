use criterion::{criterion_group, criterion_main, Criterion};
use sim_core::{EngineConfig, PolicyMode};
use sim_runtime::ScenarioRunner;

fn bench_runs(c: &mut Criterion) {
    let cfg = EngineConfig {
        steps: 1_000,
        ..EngineConfig::default()
    };
    let runner = ScenarioRunner::new(cfg, 42).unwrap();
    c.bench_function("integrated_1000_ticks", |b| {
        b.iter(|| {
            let _ = runner.run(PolicyMode::Integrated);
        })
    });
    c.bench_function("both_regimes_1000_ticks", |b| {
        b.iter(|| {
            let _ = runner.run_all();
        })
    });
}

criterion_group!(benches, bench_runs);
criterion_main!(benches);
