use boosting_insights::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polars::prelude::*;
use rand::prelude::*;

fn create_portfolio(n_rows: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(42);

    let ageph: Vec<f64> = (0..n_rows).map(|_| rng.gen_range(18..=90) as f64).collect();
    let power: Vec<f64> = (0..n_rows).map(|_| rng.gen_range(30..=150) as f64).collect();
    let fuel: Vec<&str> = (0..n_rows)
        .map(|_| if rng.gen_bool(0.4) { "diesel" } else { "gasoline" })
        .collect();

    Dataset::new(
        DataFrame::new(vec![
            Column::new("ageph".into(), ageph),
            Column::new("power".into(), power),
            Column::new("fuel".into(), fuel),
        ])
        .unwrap(),
    )
}

/// Depth-2 Poisson ensemble with random thresholds
fn create_gbm(n_trees: usize) -> FittedModel {
    let mut rng = StdRng::seed_from_u64(7);
    let trees = (0..n_trees)
        .map(|_| {
            let inner = TreeNode::threshold(
                1,
                rng.gen_range(40.0..140.0),
                rng.gen::<f64>(),
                TreeNode::leaf(rng.gen_range(-0.05..0.05)),
                TreeNode::leaf(rng.gen_range(-0.05..0.05)),
            );
            TreeNode::threshold(
                0,
                rng.gen_range(20.0..85.0),
                rng.gen::<f64>(),
                inner,
                TreeNode::levels(2, vec!["diesel"], rng.gen::<f64>(), TreeNode::leaf(0.02), TreeNode::leaf(-0.01)),
            )
        })
        .collect();
    let features = vec!["ageph".to_string(), "power".to_string(), "fuel".to_string()];
    BoostedEnsemble::new(features, Distribution::Poisson, -2.0, trees, 2)
        .unwrap()
        .into()
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");
    let model = create_gbm(500);

    for n_rows in [100, 1000, 10000].iter() {
        let data = create_portfolio(*n_rows);
        group.bench_with_input(BenchmarkId::new("predict", n_rows), &data, |b, data| {
            b.iter(|| predict(&model, black_box(data)).unwrap())
        });
    }

    group.finish();
}

fn bench_partial_dependence(c: &mut Criterion) {
    let mut group = c.benchmark_group("partial_dependence");
    group.sample_size(10);

    let model = create_gbm(200);
    let grid = Grid::sequence(18.0, 90.0, 1.0).unwrap();

    for n_rows in [1000, 5000].iter() {
        let data = create_portfolio(*n_rows);
        group.bench_with_input(BenchmarkId::new("parallel", n_rows), &data, |b, data| {
            b.iter(|| partial_dependence(&model, black_box(data), "ageph", &grid).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("sequential", n_rows), &data, |b, data| {
            let engine = PartialDependence::new(&model).with_parallel(ParallelConfig::sequential());
            b.iter(|| engine.curve(black_box(data), "ageph", &grid).unwrap())
        });
    }

    group.finish();
}

fn bench_h_statistic(c: &mut Criterion) {
    let mut group = c.benchmark_group("h_statistic");
    group.sample_size(10);

    let model = create_gbm(100);
    for n_rows in [200, 1000].iter() {
        let data = create_portfolio(*n_rows);
        group.bench_with_input(BenchmarkId::new("pair", n_rows), &data, |b, data| {
            b.iter(|| h_statistic(&model, black_box(data), ("ageph", "power")).unwrap())
        });
    }

    group.finish();
}

fn bench_lift(c: &mut Criterion) {
    let mut group = c.benchmark_group("lift");
    let mut rng = StdRng::seed_from_u64(3);

    let n_rows = 50_000;
    let expo: Vec<f64> = (0..n_rows).map(|_| rng.gen_range(0.1..1.0)).collect();
    let amount: Vec<f64> = (0..n_rows)
        .map(|_| if rng.gen_bool(0.1) { rng.gen_range(100.0..5000.0) } else { 0.0 })
        .collect();
    let glm: Vec<f64> = (0..n_rows).map(|_| rng.gen_range(50.0..400.0)).collect();
    let gbm: Vec<f64> = glm.iter().map(|p| p * rng.gen_range(0.7..1.3)).collect();
    let data = Dataset::new(
        DataFrame::new(vec![
            Column::new("expo".into(), expo),
            Column::new("amount".into(), amount),
            Column::new("glm".into(), glm),
            Column::new("gbm".into(), gbm),
        ])
        .unwrap(),
    );

    group.bench_function("loss_ratio_lift", |b| {
        b.iter(|| loss_ratio_lift(black_box(&data), "glm", "gbm", 10).unwrap())
    });
    group.bench_function("gini_ranking", |b| {
        let analyzer = LiftAnalyzer::default();
        b.iter(|| analyzer.gini_ranking(black_box(&data), &["glm", "gbm"]).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_prediction, bench_partial_dependence, bench_h_statistic, bench_lift);
criterion_main!(benches);
