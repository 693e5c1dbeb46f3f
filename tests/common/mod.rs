//! Shared test utilities and fixture generators

#![allow(dead_code)]

use churnkit::config::PipelineConfig;
use churnkit::inference::RawRecord;
use churnkit::pipeline::ArtifactLayout;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

const FIRST_NAMES: [(&str, &str); 8] = [
    ("Emma", "Female"),
    ("Olivia", "Female"),
    ("Sophia", "Female"),
    ("Mia", "Female"),
    ("Liam", "Male"),
    ("Noah", "Male"),
    ("James", "Male"),
    ("Lucas", "Male"),
];

const LAST_NAMES: [&str; 5] = ["Smith", "Brown", "Garcia", "Muller", "Rossi"];

const GEOGRAPHIES: [&str; 3] = ["France", "Germany", "Spain"];

/// Create a deterministic synthetic bank churn dataset with the full raw schema.
///
/// About 3% of `Age` and 3% of `Gender` values are missing; every other
/// column is complete. Churn depends on age, geography, activity and the
/// number of products, so a model can learn it.
pub fn create_churn_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut row_number = Vec::with_capacity(rows);
    let mut customer_id = Vec::with_capacity(rows);
    let mut first_name = Vec::with_capacity(rows);
    let mut last_name = Vec::with_capacity(rows);
    let mut credit_score = Vec::with_capacity(rows);
    let mut geography = Vec::with_capacity(rows);
    let mut gender: Vec<Option<&str>> = Vec::with_capacity(rows);
    let mut age: Vec<Option<f64>> = Vec::with_capacity(rows);
    let mut tenure = Vec::with_capacity(rows);
    let mut balance = Vec::with_capacity(rows);
    let mut products = Vec::with_capacity(rows);
    let mut has_card = Vec::with_capacity(rows);
    let mut active = Vec::with_capacity(rows);
    let mut salary = Vec::with_capacity(rows);
    let mut exited = Vec::with_capacity(rows);

    for i in 0..rows {
        let (name, sex) = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
        let geo = GEOGRAPHIES[rng.gen_range(0..GEOGRAPHIES.len())];
        let years: i64 = rng.gen_range(18..80);
        let is_active: i64 = rng.gen_range(0..2);
        let n_products: i64 = if rng.gen_bool(0.1) { 3 } else { rng.gen_range(1..3) };
        let bal: f64 = if rng.gen_bool(0.3) {
            0.0
        } else {
            (rng.gen_range(50_000.0..200_000.0f64) * 100.0).round() / 100.0
        };

        let logit = -1.5 + 0.07 * (years as f64 - 40.0)
            + if geo == "Germany" { 0.9 } else { 0.0 }
            + if is_active == 0 { 0.8 } else { -0.4 }
            + if n_products >= 3 { 1.5 } else { 0.0 };
        let p_churn = 1.0 / (1.0 + (-logit).exp());

        row_number.push(i as i64 + 1);
        customer_id.push(15_000_000 + i as i64);
        first_name.push(name);
        last_name.push(LAST_NAMES[i % LAST_NAMES.len()]);
        credit_score.push(rng.gen_range(350..850i64));
        geography.push(geo);
        gender.push(if rng.gen_bool(0.03) { None } else { Some(sex) });
        age.push(if rng.gen_bool(0.03) { None } else { Some(years as f64) });
        tenure.push(rng.gen_range(0..11i64));
        balance.push(bal);
        products.push(n_products);
        has_card.push(rng.gen_range(0..2i64));
        active.push(is_active);
        salary.push((rng.gen_range(10_000.0..200_000.0f64) * 100.0).round() / 100.0);
        exited.push(i64::from(rng.gen_bool(p_churn)));
    }

    df! {
        "RowNumber" => row_number,
        "CustomerId" => customer_id,
        "Firstname" => first_name,
        "Lastname" => last_name,
        "CreditScore" => credit_score,
        "Geography" => geography,
        "Gender" => gender,
        "Age" => age,
        "Tenure" => tenure,
        "Balance" => balance,
        "NumOfProducts" => products,
        "HasCrCard" => has_card,
        "IsActiveMember" => active,
        "EstimatedSalary" => salary,
        "Exited" => exited,
    }
    .unwrap()
}

/// Default configuration with a small, fast model
pub fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.model.n_estimators = 20;
    config.model.max_depth = 5;
    config
}

/// A complete inference record for a retained-looking customer
pub fn sample_record() -> RawRecord {
    let value = serde_json::json!({
        "CreditScore": 619,
        "Geography": "France",
        "Gender": "Female",
        "Age": 42,
        "Tenure": 2,
        "Balance": 0.0,
        "NumOfProducts": 1,
        "HasCrCard": 1,
        "IsActiveMember": 1,
        "EstimatedSalary": 101348.88
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("churn.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create an empty artifact root in a temporary directory
pub fn create_temp_layout() -> (TempDir, ArtifactLayout) {
    let temp_dir = TempDir::new().unwrap();
    let layout = ArtifactLayout::new(temp_dir.path().join("artifacts"));
    (temp_dir, layout)
}

/// Assert that a DataFrame has expected dimensions
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    assert_eq!(
        df.height(),
        expected_rows,
        "Expected {} rows, got {}",
        expected_rows,
        df.height()
    );
    assert_eq!(
        df.width(),
        expected_cols,
        "Expected {} columns, got {}",
        expected_cols,
        df.width()
    );
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, columns: &[&str]) {
    let df_cols: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for col in columns {
        assert!(
            df_cols.contains(&col.to_string()),
            "DataFrame missing expected column: {}",
            col
        );
    }
}

/// Assert that a DataFrame does not contain specific columns
pub fn assert_missing_columns(df: &DataFrame, columns: &[&str]) {
    let df_cols: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for col in columns {
        assert!(
            !df_cols.contains(&col.to_string()),
            "DataFrame should not contain column: {}",
            col
        );
    }
}
