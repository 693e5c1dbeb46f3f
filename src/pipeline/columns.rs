//! Typed column access shared by the transformation stages

use polars::prelude::*;

use crate::config::{ColumnKind, ColumnSpec};
use crate::error::{ChurnError, Result};

/// Borrow a column, mapping absence to [`ChurnError::ColumnNotFound`]
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| ChurnError::ColumnNotFound(name.to_string()))
}

/// Whether a column can be read as `f64` (numeric or boolean)
pub fn is_numeric(column: &Column) -> bool {
    column.dtype().is_primitive_numeric() || column.dtype() == &DataType::Boolean
}

/// Read a numeric (or boolean) column as `f64` values, nulls preserved
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = require_column(df, name)?;
    if !is_numeric(column) {
        return Err(ChurnError::schema(
            name,
            format!("expected a numeric column, found {}", column.dtype()),
        ));
    }
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Read a string column, nulls preserved
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = require_column(df, name)?;
    if column.dtype() != &DataType::String {
        return Err(ChurnError::schema(
            name,
            format!("expected a string column, found {}", column.dtype()),
        ));
    }
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Names of all columns in frame order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Whether a column holds text categories (string, categorical or enum)
pub fn is_textual(column: &Column) -> bool {
    matches!(
        column.dtype(),
        DataType::String | DataType::Categorical(..) | DataType::Enum(..)
    )
}

/// Select the schema columns in schema order and normalise their types.
///
/// Numeric and boolean columns become `Float64`, categorical columns become
/// `String`. A column whose dtype does not fit its declared kind is a schema
/// mismatch. Columns outside the schema are discarded.
pub fn conform_to_schema(df: &DataFrame, schema: &[ColumnSpec]) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(schema.len());

    for spec in schema {
        let column = require_column(df, &spec.name)?;
        let conformed = match spec.kind {
            ColumnKind::Numeric | ColumnKind::Boolean => {
                if !is_numeric(column) && column.dtype() != &DataType::Null {
                    return Err(ChurnError::schema(
                        &spec.name,
                        format!("expected {:?} values, found {}", spec.kind, column.dtype()),
                    ));
                }
                column.cast(&DataType::Float64)?
            }
            ColumnKind::Categorical => {
                if !is_textual(column) && column.dtype() != &DataType::Null {
                    return Err(ChurnError::schema(
                        &spec.name,
                        format!("expected categorical values, found {}", column.dtype()),
                    ));
                }
                column.cast(&DataType::String)?
            }
        };
        columns.push(conformed);
    }

    Ok(DataFrame::new(columns)?)
}

/// Linear-interpolated quantile of already sorted values.
///
/// Position `(n - 1) * q` between order statistics, matching the common
/// dataframe default. Returns `None` for an empty slice.
pub fn sorted_quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_values_casts_integers_and_keeps_nulls() {
        let df = df! {
            "a" => [Some(1i32), None, Some(3)],
        }
        .unwrap();
        assert_eq!(numeric_values(&df, "a").unwrap(), vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn test_numeric_values_rejects_strings() {
        let df = df! { "s" => ["x", "y"] }.unwrap();
        let err = numeric_values(&df, "s").unwrap_err();
        assert!(matches!(err, ChurnError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_missing_column_is_column_not_found() {
        let df = df! { "a" => [1.0f64] }.unwrap();
        assert!(matches!(
            numeric_values(&df, "b"),
            Err(ChurnError::ColumnNotFound(name)) if name == "b"
        ));
    }

    #[test]
    fn test_conform_to_schema_orders_and_casts() {
        let df = df! {
            "extra" => [1i64, 2],
            "city" => ["Paris", "Berlin"],
            "n" => [1i64, 2],
        }
        .unwrap();
        let schema = vec![
            ColumnSpec::new("n", ColumnKind::Numeric),
            ColumnSpec::new("city", ColumnKind::Categorical),
        ];

        let out = conform_to_schema(&df, &schema).unwrap();
        assert_eq!(column_names(&out), vec!["n", "city"]);
        assert_eq!(out.column("n").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_conform_to_schema_rejects_numeric_categorical() {
        let df = df! { "city" => [1i64, 2] }.unwrap();
        let schema = vec![ColumnSpec::new("city", ColumnKind::Categorical)];

        assert!(matches!(
            conform_to_schema(&df, &schema),
            Err(ChurnError::SchemaMismatch { column, .. }) if column == "city"
        ));
    }

    #[test]
    fn test_sorted_quantile_interpolates() {
        let values = [10.0, 11.0, 12.0, 13.0, 100.0];
        assert_eq!(sorted_quantile(&values, 0.25), Some(11.0));
        assert_eq!(sorted_quantile(&values, 0.75), Some(13.0));
        assert_eq!(sorted_quantile(&[1.0, 2.0], 0.5), Some(1.5));
        assert_eq!(sorted_quantile(&[], 0.5), None);
    }
}
