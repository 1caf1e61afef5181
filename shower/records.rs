//! # Shower Records
//!
//! A shower record is one reconstructed air-shower event (or one run average
//! of such events) laid out as eight positional fields. Downstream stages
//! address fields purely by position, so the width and order defined here are
//! the contract every other module relies on.

use super::load::DataError;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fields in a shower record. Any other width breaks the
/// feature/target mapping.
pub const RECORD_WIDTH: usize = 8;

/// Column positions within a record.
pub mod column {
    pub const RUN: usize = 0;
    pub const ENERGY: usize = 1;
    pub const ZENITH: usize = 2;
    pub const TIME_DELAY: usize = 3;
    pub const SIGNAL: usize = 4;
    pub const MUON_SIGNAL: usize = 5;
    /// Carried through but never used as a feature or target.
    pub const MUON_COUNT: usize = 6;
    pub const PARTICLE_TYPE: usize = 7;
}

/// Header names, in record order, for the tab-separated record files.
pub const COLUMN_NAMES: [&str; RECORD_WIDTH] = [
    "run",
    "energy",
    "zenith",
    "time_delay",
    "signal",
    "muon_signal",
    "muon_count",
    "particle_type",
];

/// The two primaries present in the simulated showers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParticleType {
    Proton,
    Iron,
}

impl ParticleType {
    /// Symbol used by the simulation output.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Proton => "PPlus",
            Self::Iron => "Fe56Nucleus",
        }
    }

    /// Numeric label stored in the record matrix.
    pub fn code(self) -> f64 {
        match self {
            Self::Proton => 1.0,
            Self::Iron => 2.0,
        }
    }

    pub fn from_symbol(raw: &str) -> Option<Self> {
        match raw {
            "PPlus" => Some(Self::Proton),
            "Fe56Nucleus" => Some(Self::Iron),
            _ => None,
        }
    }
}

impl fmt::Display for ParticleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// How the loader treats a particle label that is neither known symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Reject the file.
    #[default]
    Strict,
    /// Map the value to the iron label and keep going.
    Permissive,
}

/// Maps a raw particle label to 1.0 (proton) or 2.0 (iron).
///
/// The result is 1.0 exactly when `raw` is the proton symbol. Under
/// [`LabelPolicy::Permissive`] every unrecognised value falls through to 2.0.
pub fn map_particle_label(raw: &str, policy: LabelPolicy) -> Result<f64, DataError> {
    match (ParticleType::from_symbol(raw), policy) {
        (Some(particle), _) => Ok(particle.code()),
        (None, LabelPolicy::Permissive) => {
            log::warn!("Unrecognised particle type '{raw}' mapped to the iron label");
            Ok(ParticleType::Iron.code())
        }
        (None, LabelPolicy::Strict) => Err(DataError::UnknownParticleType(raw.to_string())),
    }
}

/// Same mapping for a label column that was already stored as numbers.
pub fn map_particle_code(code: f64, policy: LabelPolicy) -> Result<f64, DataError> {
    if code == ParticleType::Proton.code() || code == ParticleType::Iron.code() {
        return Ok(code);
    }
    match policy {
        LabelPolicy::Permissive => {
            log::warn!("Unrecognised particle code {code} mapped to the iron label");
            Ok(ParticleType::Iron.code())
        }
        LabelPolicy::Strict => Err(DataError::UnknownParticleType(code.to_string())),
    }
}

/// A homogeneous numeric table of shower records, shape `[n, RECORD_WIDTH]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowerTable {
    values: Array2<f64>,
}

impl ShowerTable {
    pub fn from_matrix(values: Array2<f64>) -> Result<Self, DataError> {
        if values.ncols() != RECORD_WIDTH {
            return Err(DataError::UnexpectedWidth {
                expected: RECORD_WIDTH,
                found: values.ncols(),
            });
        }
        Ok(Self { values })
    }

    pub fn empty() -> Self {
        Self {
            values: Array2::zeros((0, RECORD_WIDTH)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.column(index)
    }

    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.values.rows().into_iter()
    }

    /// Copies the given rows, in the given order, into a new table.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            values: self.values.select(Axis(0), indices),
        }
    }
}
