//! Integration tests for categorical encoders and their persisted mappings

use churnkit::config::PipelineConfig;
use churnkit::pipeline::encoding::{encoder_file_name, load_mapping};
use churnkit::pipeline::{NominalEncoder, OrdinalEncoder};
use churnkit::ChurnError;
use polars::prelude::*;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_nominal_round_trip_through_persisted_mapping() {
    let temp_dir = TempDir::new().unwrap();
    let df = common::create_churn_dataframe(200, 5);

    let mut encoder = NominalEncoder::new("Geography");
    encoder.fit(&df).unwrap();
    let path = encoder.save(temp_dir.path()).unwrap();
    assert_eq!(path.file_name().unwrap(), "Geography_encoder.json");

    let reloaded = NominalEncoder::load("Geography", &path).unwrap();
    assert_eq!(reloaded.mapping().unwrap(), encoder.mapping().unwrap());

    for (category, &code) in reloaded.mapping().unwrap() {
        assert_eq!(reloaded.decode(code), Some(category.as_str()));
    }
}

#[test]
fn test_nominal_transform_produces_indicators() {
    let df = common::create_churn_dataframe(200, 5);
    let mut encoder = NominalEncoder::new("Geography");
    encoder.fit(&df).unwrap();

    assert_eq!(
        encoder.output_columns().unwrap(),
        vec!["Geography_France", "Geography_Germany", "Geography_Spain"]
    );

    let width = df.width();
    let result = encoder.transform(df).unwrap();
    assert_eq!(result.width(), width + 2);
    common::assert_missing_columns(&result, &["Geography"]);

    // Exactly one indicator is set per row
    let sums: Vec<i32> = (0..result.height())
        .map(|row| {
            ["Geography_France", "Geography_Germany", "Geography_Spain"]
                .iter()
                .map(|name| result.column(name).unwrap().i32().unwrap().get(row).unwrap())
                .sum()
        })
        .collect();
    assert!(sums.iter().all(|&s| s == 1));
}

#[test]
fn test_nominal_unseen_category_is_an_error() {
    let train = df! { "Geography" => ["France", "Spain"] }.unwrap();
    let mut encoder = NominalEncoder::new("Geography");
    encoder.fit(&train).unwrap();

    let unseen = df! { "Geography" => ["Italy"] }.unwrap();
    let err = encoder.transform(unseen).unwrap_err();
    match err {
        ChurnError::UnmappedCategory { column, value } => {
            assert_eq!(column, "Geography");
            assert_eq!(value, "Italy");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unfitted_nominal_encoder() {
    let encoder = NominalEncoder::new("Gender");
    let df = df! { "Gender" => ["Male"] }.unwrap();
    assert!(matches!(
        encoder.transform(df),
        Err(ChurnError::NotFitted(_))
    ));
}

#[test]
fn test_ordinal_mapping_persisted_and_replayed() {
    let temp_dir = TempDir::new().unwrap();
    let config = PipelineConfig::default();
    let mapping = config.encoding.ordinal_mappings["CreditScoreBins"].clone();

    let encoder = OrdinalEncoder::new("CreditScoreBins", mapping.clone());
    let path = encoder.save(temp_dir.path()).unwrap();
    assert_eq!(
        path,
        temp_dir.path().join(encoder_file_name("CreditScoreBins"))
    );
    assert_eq!(load_mapping(&path).unwrap(), mapping);

    let reloaded = OrdinalEncoder::load("CreditScoreBins", &path).unwrap();
    let df = df! { "CreditScoreBins" => ["Excellent", "Poor", "Good"] }.unwrap();
    let result = reloaded.transform(df).unwrap();

    let ranks: Vec<i64> = result
        .column("CreditScoreBins")
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(ranks, vec![4, 0, 2]);
    assert_eq!(reloaded.decode(3), Some("Very Good"));
}

#[test]
fn test_missing_mapping_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(encoder_file_name("Gender"));
    assert!(matches!(
        NominalEncoder::load("Gender", &path),
        Err(ChurnError::MissingArtifact(_))
    ));
}
