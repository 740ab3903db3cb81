//! Benchmarks for learning, residual fitting and forecasting.

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use decomp_arima::decomposition::{fourier_filter, TransformLearner};
use decomp_arima::models::{ResidualForecaster, SARIMA};
use decomp_arima::prelude::*;
use decomp_arima::transform::boxcox_lambda;

fn generate_metric(n: usize) -> DailySeries {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let values = (0..n)
        .map(|i| {
            let t = i as f64;
            500.0
                + 0.8 * t
                + 80.0 * (2.0 * std::f64::consts::PI * t / 365.25).sin()
                + 15.0 * (2.0 * std::f64::consts::PI * t / 7.0).cos()
                + 5.0 * (t * 12.9898).sin()
        })
        .collect();
    DailySeries::new(start, values)
}

fn bench_learning(c: &mut Criterion) {
    let mut group = c.benchmark_group("learning");

    for size in [400, 730, 1460].iter() {
        let store = SeriesStore::from_series("m", generate_metric(*size)).unwrap();
        let config = PipelineConfig::new("m");

        group.bench_with_input(BenchmarkId::new("boxcox_lambda", size), size, |b, _| {
            b.iter(|| boxcox_lambda(black_box(store.series().values())))
        });

        group.bench_with_input(BenchmarkId::new("transform_learner", size), size, |b, _| {
            let learner = TransformLearner::new(&config);
            b.iter(|| learner.learn(black_box(&store)))
        });
    }

    let year: Vec<f64> = generate_metric(365).into_values();
    group.bench_function("fourier_filter_365", |b| {
        b.iter(|| fourier_filter(black_box(&year), 12, 3))
    });

    group.finish();
}

fn bench_residual_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("residual_model");
    group.sample_size(20);

    for size in [200, 400, 800].iter() {
        let residuals: Vec<f64> = (0..*size)
            .map(|i| (i as f64 * 0.9).sin() + 0.3 * ((i % 7) as f64))
            .collect();

        group.bench_with_input(BenchmarkId::new("sarima_fit", size), size, |b, _| {
            b.iter(|| {
                let mut model = SARIMA::default();
                model.fit(black_box(&residuals)).map(|_| model)
            })
        });
    }

    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    group.sample_size(10);

    let store = SeriesStore::from_series("m", generate_metric(730)).unwrap();
    group.bench_function("predict_30", |b| {
        b.iter(|| {
            let config = PipelineConfig::new("m").with_box_cox_lambda(0.5);
            let mut pipeline = DecomposedArima::new(store.clone(), config)?;
            pipeline.predict(black_box(30), 0.8)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_learning, bench_residual_model, bench_end_to_end);
criterion_main!(benches);
