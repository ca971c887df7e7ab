use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use htft_terminal::batch::evaluate_cases;
use htft_terminal::config::MatchCase;
use htft_terminal::htft::HtFtMethod;
use htft_terminal::model::{MatchInputs, ModelConfig, OutcomeModel};
use htft_terminal::scoreline::ScorelineDistribution;

fn bench_grid_build(c: &mut Criterion) {
    c.bench_function("grid_build_10", |b| {
        b.iter(|| {
            let dist = ScorelineDistribution::build(black_box(1.6), black_box(1.2), 10).unwrap();
            black_box(dist.total_mass());
        })
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let inputs = MatchInputs::from_rates(2.34, 2.1).unwrap();
    let weighted = OutcomeModel::default();
    c.bench_function("evaluate_weighted", |b| {
        b.iter(|| {
            let report = weighted.evaluate(black_box(&inputs)).unwrap();
            black_box(report.htft.total());
        })
    });

    let halves = OutcomeModel::new(ModelConfig {
        htft_method: HtFtMethod::IndependentHalves,
        ..ModelConfig::default()
    })
    .unwrap();
    c.bench_function("evaluate_halves", |b| {
        b.iter(|| {
            let report = halves.evaluate(black_box(&inputs)).unwrap();
            black_box(report.htft.total());
        })
    });
}

fn bench_batch(c: &mut Criterion) {
    let cases: Vec<MatchCase> = (0..200)
        .map(|i| {
            let home = 0.8 + (i % 20) as f64 * 0.1;
            let away = 0.6 + (i % 13) as f64 * 0.1;
            serde_json::from_value(serde_json::json!({
                "name": format!("case {i}"),
                "rates": { "home": home, "away": away },
                "odds": [
                    { "outcome": "1/1", "odds": 3.8 },
                    { "outcome": "X/X", "odds": 4.6 },
                    { "outcome": "O2.5", "odds": 1.9 }
                ]
            }))
            .unwrap()
        })
        .collect();
    let model = OutcomeModel::default();
    c.bench_function("batch_200", |b| {
        b.iter(|| {
            let results = evaluate_cases(&model, black_box(&cases));
            black_box(results.len());
        })
    });
}

criterion_group!(perf, bench_grid_build, bench_evaluate, bench_batch);
criterion_main!(perf);
