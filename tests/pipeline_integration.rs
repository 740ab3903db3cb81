//! End-to-end tests of the decomposition pipeline.
//!
//! Synthetic daily series with known trend and seasonality are pushed through
//! loading, learning, forecasting and validation.

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use decomp_arima::core::ErrorBand;
use decomp_arima::decomposition::MonthDay;
use decomp_arima::prelude::*;
use std::f64::consts::PI;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn linear_store(days: usize) -> SeriesStore {
    let values = (0..days).map(|i| 100.0 + 2.0 * i as f64).collect();
    SeriesStore::from_series("Streams", DailySeries::new(date(2022, 1, 1), values)).unwrap()
}

fn seasonal_store(start: NaiveDate, days: usize) -> SeriesStore {
    let values = (0..days)
        .map(|i| {
            let t = i as f64;
            1000.0 + 1.5 * t + 150.0 * (2.0 * PI * t / 365.25).sin() + 20.0 * (2.0 * PI * t / 7.0).cos()
        })
        .collect();
    SeriesStore::from_series("Streams", DailySeries::new(start, values)).unwrap()
}

#[test]
fn linear_series_recovers_trend_and_forecast() {
    init_logging();
    let config = PipelineConfig::new("Streams").with_box_cox_lambda(1.0);
    let mut pipeline = DecomposedArima::new(linear_store(400), config).unwrap();

    let params = *pipeline.learn_trend_params().unwrap();
    assert_relative_eq!(params.global_slope, 2.0, max_relative = 0.05);
    assert_relative_eq!(params.global_intercept, 100.0, max_relative = 0.05);

    let table = pipeline.predict(10, 0.8).unwrap();
    let forecasts: Vec<_> = table.forecast_rows().collect();
    assert_eq!(forecasts.len(), 10);
    for (k, row) in forecasts.iter().enumerate() {
        let expected = 2.0 * (400 + k) as f64 + 100.0;
        let point = row.out_of_sample.unwrap();
        assert_relative_eq!(point, expected, max_relative = 0.05);
    }
}

#[test]
fn linear_series_forecast_with_estimated_lambda() {
    init_logging();
    let mut pipeline = DecomposedArima::new(linear_store(400), PipelineConfig::new("Streams")).unwrap();

    let lambda = pipeline.learn_trend_params().unwrap().box_cox_lambda;
    assert!(lambda > 0.0 && lambda < 1.0, "lambda = {lambda}");

    let table = pipeline.predict(10, 0.8).unwrap();
    let forecasts: Vec<_> = table.forecast_rows().collect();
    assert_eq!(forecasts.len(), 10);
    for (k, row) in forecasts.iter().enumerate() {
        let expected = 2.0 * (400 + k) as f64 + 100.0;
        assert_relative_eq!(row.out_of_sample.unwrap(), expected, max_relative = 0.05);
        assert!(row.lower.unwrap() <= row.upper.unwrap());
    }
}

#[test]
fn residual_round_trip_over_observed_range() {
    let store = seasonal_store(date(2021, 4, 1), 900);
    let config = PipelineConfig::new("Streams").with_box_cox_lambda(0.5);
    let mut pipeline = DecomposedArima::new(store, config).unwrap();
    pipeline.learn_trend_params().unwrap();

    let converter = pipeline.converter().unwrap();
    let sub = pipeline.store().series().slice(date(2022, 2, 10), date(2022, 9, 30)).unwrap();
    let back = converter
        .to_raw_space(&converter.to_residual_space(&sub).unwrap())
        .unwrap();
    assert_eq!(back.start(), sub.start());
    for (a, b) in sub.values().iter().zip(back.values()) {
        assert_relative_eq!(a, b, max_relative = 1e-10);
    }
}

#[test]
fn learning_twice_gives_identical_parameters() {
    let store = seasonal_store(date(2021, 4, 1), 900);
    let mut pipeline = DecomposedArima::new(store, PipelineConfig::new("Streams")).unwrap();
    let first = *pipeline.learn_trend_params().unwrap();
    let first_seasonal = pipeline.learned().unwrap().seasonal.clone();
    let second = *pipeline.learn_trend_params().unwrap();
    assert_eq!(first, second);
    assert_eq!(first_seasonal, pipeline.learned().unwrap().seasonal);
}

#[test]
fn load_fills_every_missing_day() {
    let midnight = |d: NaiveDate| -> NaiveDateTime { d.and_hms_opt(0, 0, 0).unwrap() };
    let mut observations = Vec::new();
    for i in (0..60).filter(|i| i % 4 != 1) {
        let day = date(2023, 1, 1) + Duration::days(i);
        observations.push(Observation::new(midnight(day) + Duration::hours(3), 10.0));
        observations.push(Observation::new(midnight(day) + Duration::hours(15), 20.0));
    }

    let store = SeriesStore::load(&observations, "Streams", None, None).unwrap();
    let first = store.first_observed_date();
    let last = store.last_observed_date();
    assert_eq!(first, date(2023, 1, 1));
    assert_eq!(last, date(2023, 3, 1));
    assert_eq!(store.len() as i64, (last - first).num_days() + 1);
    for (_, v) in store.series().iter() {
        assert_relative_eq!(v, 15.0);
    }
}

#[test]
fn trend_is_range_gated() {
    let config = PipelineConfig::new("Streams").with_box_cox_lambda(1.0);
    let mut pipeline = DecomposedArima::new(linear_store(400), config).unwrap();
    pipeline.learn_trend_params().unwrap();
    let converter = pipeline.converter().unwrap();
    let first = pipeline.store().first_observed_date();
    let last = pipeline.store().last_observed_date();

    let before = DailySeries::new(first - Duration::days(1), vec![1.0; 3]);
    for result in [
        converter.subtract_global_trend(&before),
        converter.add_global_trend(&before),
    ] {
        assert!(matches!(result, Err(ForecastError::OutOfRange { .. })));
    }

    let logistic = converter.trend().logistic().unwrap();
    assert!(matches!(logistic.value(last), Err(ForecastError::OutOfRange { .. })));
    assert!(logistic.value(last + Duration::days(1)).is_ok());

    let straddling = DailySeries::new(last - Duration::days(2), vec![0.0; 5]);
    assert_eq!(converter.add_global_trend(&straddling).unwrap().len(), 5);
}

#[test]
fn validation_cutoff_guard() {
    let pipeline = DecomposedArima::new(linear_store(400), PipelineConfig::new("Streams")).unwrap();
    let last = pipeline.store().last_observed_date();
    for cutoff in [last, last + Duration::days(1)] {
        assert!(matches!(
            pipeline.validate(cutoff, 0.95),
            Err(ForecastError::InvalidParameter(_))
        ));
    }
}

#[test]
fn validation_classifies_percent_errors() {
    init_logging();
    let config = PipelineConfig::new("Streams").with_box_cox_lambda(1.0);
    let pipeline = DecomposedArima::new(linear_store(430), config).unwrap();
    let table = pipeline.validate_default().unwrap();

    let last = pipeline.store().last_observed_date();
    assert_eq!(table.cutoff, pipeline.default_validation_cutoff().unwrap());
    assert_eq!(table.rows.last().unwrap().date, last);
    assert!(table.rows.iter().all(|r| r.date > table.cutoff));
    for row in &table.rows {
        assert_relative_eq!(row.percent_error, 100.0 * row.absolute_error / row.observed);
        assert_relative_eq!(row.squared_error, row.absolute_error * row.absolute_error);
        assert_eq!(row.band, ErrorBand::Green);
    }
    assert_eq!(table.summary().green, table.len());
}

#[test]
fn log_lambda_is_natural_log() {
    let store = seasonal_store(date(2021, 4, 1), 800);
    let mut pipeline = DecomposedArima::new(store, PipelineConfig::new("Streams")).unwrap();
    pipeline.set_box_cox_param(0.0).unwrap();
    pipeline.learn_trend_params().unwrap();

    let converter = pipeline.converter().unwrap();
    let raw = pipeline.store().series();
    let transformed = converter.box_cox_transform(raw).unwrap();
    for (x, y) in raw.values().iter().zip(transformed.values()) {
        assert_relative_eq!(x.ln(), *y, epsilon = 1e-12);
    }
}

#[test]
fn leap_day_repeats_feb_28_offset() {
    // Data ends in 2024, so the seasonal reference year is 2023.
    let store = seasonal_store(date(2022, 1, 1), 800);
    let config = PipelineConfig::new("Streams").with_box_cox_lambda(1.0);
    let mut pipeline = DecomposedArima::new(store, config).unwrap();
    pipeline.learn_trend_params().unwrap();

    let seasonal = &pipeline.learned().unwrap().seasonal;
    assert_eq!(seasonal.reference_year(), 2023);
    assert!(seasonal.get(MonthDay::new(2, 29).unwrap()).is_none());

    let converter = pipeline.converter().unwrap();
    let zeros = DailySeries::new(date(2024, 2, 27), vec![0.0; 4]);
    let tiled = converter.add_seasonality(&zeros).unwrap();
    let v = tiled.values();
    assert_eq!(v[2], v[1]);
    assert_ne!(v[1], v[0]);
}

#[test]
fn seasonal_forecast_tracks_truth() {
    init_logging();
    let store = seasonal_store(date(2021, 1, 1), 1000);
    let truth = |i: usize| {
        let t = i as f64;
        1000.0 + 1.5 * t + 150.0 * (2.0 * PI * t / 365.25).sin() + 20.0 * (2.0 * PI * t / 7.0).cos()
    };

    let config = PipelineConfig::new("Streams").with_box_cox_lambda(1.0);
    let mut pipeline = DecomposedArima::new(store, config).unwrap();
    let table = pipeline.predict(14, 0.8).unwrap();

    for (k, row) in table.forecast_rows().enumerate() {
        let point = row.out_of_sample.unwrap();
        assert_relative_eq!(point, truth(1000 + k), max_relative = 0.1);
        assert!(row.lower.unwrap() <= point && point <= row.upper.unwrap());
    }
    assert!(pipeline.residual_summary().unwrap().contains("sigma2"));
}
