//! Benchmarks for the transform chain, outlier removal and model fitting
//!
//! Run with: cargo bench --bench transform_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use churnkit::config::{ModelKind, PipelineConfig};
use churnkit::model::{builder_for, frame_to_matrix, labels_from_frame};
use churnkit::pipeline::columns::{column_names, conform_to_schema};
use churnkit::pipeline::{OutlierDetector, TransformChain};

/// Generate a complete churn dataset with the default raw schema
fn generate_churn_dataframe(n_rows: usize, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let geographies = ["France", "Germany", "Spain"];
    let genders = ["Female", "Male"];

    let ids: Vec<i64> = (0..n_rows as i64).collect();
    let age: Vec<f64> = (0..n_rows).map(|_| rng.gen_range(18.0..80.0f64).round()).collect();
    let active: Vec<i64> = (0..n_rows).map(|_| rng.gen_range(0..2)).collect();
    let exited: Vec<i64> = age
        .iter()
        .zip(active.iter())
        .map(|(&a, &act)| {
            let p = if act == 0 { 0.2 } else { 0.1 } + (a - 18.0) / 150.0;
            i64::from(rng.gen::<f64>() < p)
        })
        .collect();

    let columns = vec![
        Column::new("RowNumber".into(), ids.clone()),
        Column::new("CustomerId".into(), ids.iter().map(|i| i + 15_000_000).collect::<Vec<_>>()),
        Column::new("Firstname".into(), vec!["Alex"; n_rows]),
        Column::new("Lastname".into(), vec!["Smith"; n_rows]),
        Column::new(
            "CreditScore".into(),
            (0..n_rows).map(|_| rng.gen_range(350..850i64)).collect::<Vec<_>>(),
        ),
        Column::new(
            "Geography".into(),
            (0..n_rows).map(|_| *geographies.choose(&mut rng).unwrap_or(&"France")).collect::<Vec<_>>(),
        ),
        Column::new(
            "Gender".into(),
            (0..n_rows).map(|_| *genders.choose(&mut rng).unwrap_or(&"Male")).collect::<Vec<_>>(),
        ),
        Column::new("Age".into(), age),
        Column::new("Tenure".into(), (0..n_rows).map(|_| rng.gen_range(0..11i64)).collect::<Vec<_>>()),
        Column::new(
            "Balance".into(),
            (0..n_rows).map(|_| rng.gen::<f64>() * 200_000.0).collect::<Vec<_>>(),
        ),
        Column::new("NumOfProducts".into(), (0..n_rows).map(|_| rng.gen_range(1..5i64)).collect::<Vec<_>>()),
        Column::new("HasCrCard".into(), (0..n_rows).map(|_| rng.gen_range(0..2i64)).collect::<Vec<_>>()),
        Column::new("IsActiveMember".into(), active),
        Column::new(
            "EstimatedSalary".into(),
            (0..n_rows).map(|_| rng.gen::<f64>() * 200_000.0).collect::<Vec<_>>(),
        ),
        Column::new("Exited".into(), exited),
    ];

    let df = DataFrame::new(columns).expect("Failed to create DataFrame");
    conform_to_schema(&df, &PipelineConfig::default().schema).expect("Schema mismatch")
}

/// Fitting the chain versus replaying it on a single inference row
fn benchmark_transform_chain(c: &mut Criterion) {
    let config = PipelineConfig::default();
    let mut group = c.benchmark_group("transform_chain");

    for n_rows in [1_000, 10_000, 50_000] {
        let df = generate_churn_dataframe(n_rows, 42);
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::new("fit_transform", n_rows), &df, |b, df| {
            b.iter(|| TransformChain::fit_transform(black_box(df.clone()), &config).expect("fit"))
        });
    }

    let df = generate_churn_dataframe(1_000, 42);
    let (chain, _) = TransformChain::fit_transform(df.clone(), &config).expect("fit");
    let row = df.slice(0, 1);
    group.throughput(Throughput::Elements(1));
    group.bench_function("apply_single_row", |b| {
        b.iter(|| chain.apply(black_box(row.clone())).expect("apply"))
    });

    group.finish();
}

fn benchmark_outlier_removal(c: &mut Criterion) {
    let config = PipelineConfig::default();
    let detector = OutlierDetector::from_config(&config.outliers).expect("detector");
    let mut group = c.benchmark_group("outlier_removal");

    for n_rows in [10_000, 100_000] {
        let df = generate_churn_dataframe(n_rows, 7);
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &df, |b, df| {
            b.iter(|| {
                detector
                    .handle_outliers(black_box(df.clone()), &config.outliers.columns)
                    .expect("outliers")
            })
        });
    }

    group.finish();
}

/// Random forest versus gradient boosting fit time on the transformed features
fn benchmark_model_fit(c: &mut Criterion) {
    let mut config = PipelineConfig::default();
    config.model.n_estimators = 20;
    config.model.max_depth = 6;

    let df = generate_churn_dataframe(5_000, 42);
    let (_, transformed) = TransformChain::fit_transform(df, &config).expect("fit");
    let features: Vec<String> = column_names(&transformed)
        .into_iter()
        .filter(|name| name != &config.target)
        .collect();
    let x = frame_to_matrix(&transformed, &features).expect("matrix");
    let y = labels_from_frame(&transformed, &config.target).expect("labels");

    let mut group = c.benchmark_group("model_fit");
    group.sample_size(10);

    for kind in [ModelKind::RandomForest, ModelKind::GradientBoosting] {
        let mut model_config = config.model.clone();
        model_config.kind = kind;
        let builder = builder_for(&model_config);

        group.bench_function(BenchmarkId::from_parameter(kind), |b| {
            b.iter(|| {
                let mut model = builder.build();
                model.fit(black_box(&x), black_box(&y)).expect("fit");
                model
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_transform_chain,
    benchmark_outlier_removal,
    benchmark_model_fit
);
criterion_main!(benches);
