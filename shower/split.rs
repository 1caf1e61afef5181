use super::load::DataError;
use super::records::{RECORD_WIDTH, ShowerTable, column};
use ndarray::{Array1, Array2, s};

/// Number of trailing record fields that never enter the feature block.
const TRAILING_FIELDS: usize = 3;

/// Splits a record table into the feature block and the regression target.
///
/// Features are the fields between the run identifier and the three trailing
/// fields (energy, zenith, time delay, signal). The target is the first of
/// the trailing fields, the muon signal.
pub fn split_features_target(table: &ShowerTable) -> Result<(Array2<f64>, Array1<f64>), DataError> {
    let values = table.values();
    let width = values.ncols();
    if width != RECORD_WIDTH {
        return Err(DataError::UnexpectedWidth {
            expected: RECORD_WIDTH,
            found: width,
        });
    }

    let target_index = width - TRAILING_FIELDS;
    debug_assert_eq!(target_index, column::MUON_SIGNAL);

    let features = values.slice(s![.., 1..target_index]).to_owned();
    let target = values.column(target_index).to_owned();
    Ok((features, target))
}
