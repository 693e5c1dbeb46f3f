//! Integration tests for min-max scaling

use churnkit::pipeline::{FittedScaler, MinMaxScaler};
use polars::prelude::*;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

fn scale_columns() -> Vec<String> {
    vec!["Balance".to_string(), "EstimatedSalary".to_string()]
}

#[test]
fn test_fitted_columns_lie_in_unit_interval() {
    let df = common::create_churn_dataframe(500, 9);
    let scaler = MinMaxScaler::new(scale_columns()).fit(&df).unwrap();
    let result = scaler.transform(df).unwrap();

    for name in scale_columns() {
        let values = result.column(&name).unwrap().f64().unwrap();
        let min = values.min().unwrap();
        let max = values.max().unwrap();
        assert!((min - 0.0).abs() < 1e-12, "{} min should be 0, got {}", name, min);
        assert!((max - 1.0).abs() < 1e-12, "{} max should be 1, got {}", name, max);
    }
}

#[test]
fn test_unscaled_columns_untouched() {
    let df = common::create_churn_dataframe(100, 9);
    let tenure = |frame: &DataFrame| -> Vec<i64> {
        frame.column("Tenure").unwrap().i64().unwrap().into_no_null_iter().collect()
    };
    let before = tenure(&df);

    let scaler = MinMaxScaler::new(scale_columns()).fit(&df).unwrap();
    let result = scaler.transform(df).unwrap();

    assert_eq!(tenure(&result), before);
}

#[test]
fn test_saved_parameters_replay_identically() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("transform").join("scaler.json");

    let train = common::create_churn_dataframe(300, 1);
    let scaler = MinMaxScaler::new(scale_columns()).fit(&train).unwrap();
    scaler.save(&path).unwrap();

    let loaded = FittedScaler::load(&path).unwrap();
    assert_eq!(loaded, scaler);

    let fresh = common::create_churn_dataframe(50, 2);
    let a = scaler.transform(fresh.clone()).unwrap();
    let b = loaded.transform(fresh).unwrap();
    assert!(a.equals(&b));
}

#[test]
fn test_values_outside_fitted_range_are_not_clipped() {
    let train = df! { "Balance" => [0.0f64, 100.0] }.unwrap();
    let scaler = MinMaxScaler::new(vec!["Balance".to_string()]).fit(&train).unwrap();

    let input = df! { "Balance" => [150.0f64, -50.0] }.unwrap();
    let result = scaler.transform(input).unwrap();
    let values: Vec<f64> = result.column("Balance").unwrap().f64().unwrap().into_no_null_iter().collect();
    assert_eq!(values, vec![1.5, -0.5]);
}

#[test]
fn test_constant_column_scales_to_zero() {
    let train = df! { "Balance" => [7.0f64, 7.0, 7.0] }.unwrap();
    let scaler = MinMaxScaler::new(vec!["Balance".to_string()]).fit(&train).unwrap();
    let result = scaler.transform(train).unwrap();

    let values: Vec<f64> = result.column("Balance").unwrap().f64().unwrap().into_no_null_iter().collect();
    assert_eq!(values, vec![0.0, 0.0, 0.0]);
}

#[test]
fn test_inverse_transform_recovers_values() {
    let train = df! { "Balance" => [10.0f64, 20.0, 50.0] }.unwrap();
    let scaler = MinMaxScaler::new(vec!["Balance".to_string()]).fit(&train).unwrap();

    let scaled = scaler.transform(train).unwrap();
    let restored = scaler.inverse_transform(scaled).unwrap();
    let values: Vec<f64> = restored.column("Balance").unwrap().f64().unwrap().into_no_null_iter().collect();
    for (got, want) in values.iter().zip([10.0, 20.0, 50.0]) {
        assert!((got - want).abs() < 1e-9);
    }
}

#[test]
fn test_load_missing_scaler() {
    let temp_dir = TempDir::new().unwrap();
    assert!(FittedScaler::load(&temp_dir.path().join("scaler.json")).is_err());
}
