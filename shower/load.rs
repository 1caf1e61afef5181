//! # Shower Record Loading
//!
//! Reads a tab-separated shower-record file and turns it into a
//! [`ShowerTable`]. The schema is strict: the header must list the eight
//! record fields in record order, every numeric field must be present and
//! finite, and the particle label must be one of the two known symbols
//! (or a 1/2 code) unless the caller opts into [`LabelPolicy::Permissive`].
//!
//! Failures are assumed to be user-input errors, so `DataError` carries the
//! column name or offending value wherever one is available.

use super::records::{
    COLUMN_NAMES, LabelPolicy, RECORD_WIDTH, ShowerTable, column, map_particle_code,
    map_particle_label,
};
use ndarray::Array2;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "The shower file has {found} columns, but a shower record has exactly {expected} fields."
    )]
    UnexpectedWidth { expected: usize, found: usize },
    #[error("Column {position} is named '{found}', but the record layout expects '{expected}'.")]
    UnexpectedColumn {
        position: usize,
        expected: &'static str,
        found: String,
    },
    #[error(
        "The column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error("Missing or null values were found in the column '{0}'.")]
    MissingValuesFound(String),
    #[error("Non-finite values (NaN or Infinity) were found in the column '{0}'.")]
    NonFiniteValuesFound(String),
    #[error(
        "Unrecognised particle type '{0}'. Expected 'PPlus' or 'Fe56Nucleus' (or the codes 1 and 2)."
    )]
    UnknownParticleType(String),
}

/// Loads a shower-record TSV into a numeric table.
pub fn load_showers(path: impl AsRef<Path>, policy: LabelPolicy) -> Result<ShowerTable, DataError> {
    let path = path.as_ref();
    log::info!("Loading shower records from '{}'", path.display());

    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(None)
                .with_parse_options(CsvParseOptions::default().with_separator(b'\t')),
        )
        .finish()?;

    validate_header(&df)?;

    let n = df.height();
    if n == 0 {
        log::warn!("Shower file '{}' has a header but no records", path.display());
        return Ok(ShowerTable::empty());
    }

    let mut values = Array2::<f64>::zeros((n, RECORD_WIDTH));
    for (position, name) in COLUMN_NAMES.iter().enumerate() {
        let column_values = if position == column::PARTICLE_TYPE {
            extract_label_column(&df, name, policy)?
        } else {
            extract_numeric_column(&df, name)?
        };
        for (row, value) in column_values.into_iter().enumerate() {
            values[[row, position]] = value;
        }
    }

    log::info!("Loaded {n} shower records");
    ShowerTable::from_matrix(values)
}

fn validate_header(df: &DataFrame) -> Result<(), DataError> {
    let names = df.get_column_names();
    if names.len() != RECORD_WIDTH {
        return Err(DataError::UnexpectedWidth {
            expected: RECORD_WIDTH,
            found: names.len(),
        });
    }
    for (position, (found, expected)) in names.iter().zip(COLUMN_NAMES).enumerate() {
        if found.as_str() != expected {
            return Err(DataError::UnexpectedColumn {
                position,
                expected,
                found: found.to_string(),
            });
        }
    }
    Ok(())
}

fn extract_numeric_column(df: &DataFrame, column_name: &str) -> Result<Vec<f64>, DataError> {
    let series = df.column(column_name)?;
    if series.null_count() > 0 {
        return Err(DataError::MissingValuesFound(column_name.to_string()));
    }

    let wrong_type = || DataError::ColumnWrongType {
        column_name: column_name.to_string(),
        expected_type: "f64 (numeric)",
        found_type: format!("{:?}", series.dtype()),
    };
    if matches!(series.dtype(), DataType::String) {
        return Err(wrong_type());
    }
    let casted = series.cast(&DataType::Float64).map_err(|_| wrong_type())?;
    if casted.null_count() > 0 {
        return Err(wrong_type());
    }

    let values: Vec<f64> = casted.f64()?.rechunk().into_no_null_iter().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(DataError::NonFiniteValuesFound(column_name.to_string()));
    }
    Ok(values)
}

fn extract_label_column(
    df: &DataFrame,
    column_name: &str,
    policy: LabelPolicy,
) -> Result<Vec<f64>, DataError> {
    let series = df.column(column_name)?;
    if series.null_count() > 0 {
        return Err(DataError::MissingValuesFound(column_name.to_string()));
    }

    if matches!(series.dtype(), DataType::String) {
        let labels = series.as_materialized_series().str()?;
        labels
            .into_iter()
            .map(|raw| map_particle_label(raw.unwrap_or_default(), policy))
            .collect()
    } else {
        extract_numeric_column(df, column_name)?
            .into_iter()
            .map(|code| map_particle_code(code, policy))
            .collect()
    }
}
