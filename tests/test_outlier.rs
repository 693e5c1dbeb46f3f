//! Integration tests for IQR outlier removal

use churnkit::pipeline::OutlierDetector;
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Eight regular rows plus one row extreme in `a` only and one extreme in `a` and `b`
fn frame_with_outliers() -> DataFrame {
    df! {
        "id" => [1i64, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        "a" => [10.0f64, 11.0, 12.0, 13.0, 11.0, 12.0, 10.0, 13.0, 500.0, 400.0],
        "b" => [5.0f64, 6.0, 5.0, 6.0, 5.0, 6.0, 5.0, 6.0, 5.0, 90.0],
        "c" => [1.0f64, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0],
    }
    .unwrap()
}

#[test]
fn test_single_column_outlier_survives() {
    let detector = OutlierDetector::default();
    let result = detector
        .handle_outliers(frame_with_outliers(), &cols(&["a", "b", "c"]))
        .unwrap();

    let ids: Vec<i64> = result.column("id").unwrap().i64().unwrap().into_no_null_iter().collect();
    assert!(ids.contains(&9), "Row flagged in one column must be kept");
    assert!(!ids.contains(&10), "Row flagged in two columns must be removed");
    assert_eq!(result.height(), 9);
}

#[test]
fn test_threshold_of_one_removes_any_flagged_row() {
    let detector = OutlierDetector::new(1.5, 1).unwrap();
    let result = detector
        .handle_outliers(frame_with_outliers(), &cols(&["a", "b", "c"]))
        .unwrap();

    assert_eq!(result.height(), 8);
}

#[test]
fn test_detect_outliers_flags_per_column() {
    let detector = OutlierDetector::default();
    let flags = detector
        .detect_outliers(&frame_with_outliers(), &cols(&["a", "b"]))
        .unwrap();

    common::assert_shape(&flags, 10, 2);
    let a = flags.column("a").unwrap().bool().unwrap();
    let b = flags.column("b").unwrap().bool().unwrap();
    assert_eq!(a.get(8), Some(true));
    assert_eq!(a.get(9), Some(true));
    assert_eq!(b.get(8), Some(false));
    assert_eq!(b.get(9), Some(true));
    assert_eq!(a.get(0), Some(false));
}

#[test]
fn test_removal_is_row_order_independent() {
    let detector = OutlierDetector::default();
    let columns = cols(&["a", "b", "c"]);

    let df = frame_with_outliers();
    let reversed = df.reverse();

    let mut forward: Vec<i64> = detector
        .handle_outliers(df, &columns)
        .unwrap()
        .column("id")
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    let mut backward: Vec<i64> = detector
        .handle_outliers(reversed, &columns)
        .unwrap()
        .column("id")
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect();

    forward.sort_unstable();
    backward.sort_unstable();
    assert_eq!(forward, backward);
}

#[test]
fn test_nulls_are_never_flagged() {
    let df = df! {
        "a" => [Some(1.0f64), Some(2.0), None, Some(3.0), Some(2.0)],
        "b" => [Some(1.0f64), None, Some(2.0), Some(1.0), Some(2.0)],
    }
    .unwrap();

    let detector = OutlierDetector::new(1.5, 1).unwrap();
    let result = detector.handle_outliers(df, &cols(&["a", "b"])).unwrap();
    assert_eq!(result.height(), 5);
}

#[test]
fn test_invalid_detector_settings() {
    assert!(OutlierDetector::new(0.0, 2).is_err());
    assert!(OutlierDetector::new(1.5, 0).is_err());
}

#[test]
fn test_missing_column_errors() {
    let detector = OutlierDetector::default();
    assert!(detector
        .handle_outliers(frame_with_outliers(), &cols(&["missing"]))
        .is_err());
}
