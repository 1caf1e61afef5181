//! Physical quality cuts applied before training.

use super::records::{ShowerTable, column};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Energy band (in log10 of the reconstructed energy) and zenith cut.
///
/// Energy bounds are inclusive on both ends; the zenith cut is strict, so a
/// shower with `cos(zenith)` exactly equal to `min_cos_zenith` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowerCuts {
    pub min_log10_energy: f64,
    pub max_log10_energy: f64,
    pub min_cos_zenith: f64,
}

impl Default for ShowerCuts {
    fn default() -> Self {
        Self {
            min_log10_energy: 16.0,
            max_log10_energy: 16.5,
            min_cos_zenith: 0.9,
        }
    }
}

impl ShowerCuts {
    pub fn accepts(&self, log10_energy: f64, cos_zenith: f64) -> bool {
        (self.min_log10_energy..=self.max_log10_energy).contains(&log10_energy)
            && cos_zenith > self.min_cos_zenith
    }

    pub fn accepts_record(&self, record: ArrayView1<'_, f64>) -> bool {
        self.accepts(
            record[column::ENERGY].log10(),
            record[column::ZENITH].cos(),
        )
    }

    /// Returns the records that pass both cuts, preserving input order.
    pub fn apply(&self, table: &ShowerTable) -> ShowerTable {
        let kept: Vec<usize> = table
            .rows()
            .enumerate()
            .filter(|(_, record)| self.accepts_record(*record))
            .map(|(i, _)| i)
            .collect();

        log::info!(
            "Cuts kept {} of {} showers ({} <= log10(E) <= {}, cos(zenith) > {})",
            kept.len(),
            table.len(),
            self.min_log10_energy,
            self.max_log10_energy,
            self.min_cos_zenith
        );
        table.select_rows(&kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    fn record(energy: f64, zenith: f64) -> [f64; 8] {
        [1.0, energy, zenith, 10.0, 2.0, 0.5, 4.0, 1.0]
    }

    fn table(rows: &[[f64; 8]]) -> ShowerTable {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        ShowerTable::from_matrix(Array2::from_shape_vec((rows.len(), 8), flat).unwrap()).unwrap()
    }

    #[test]
    fn energy_bounds_are_inclusive() {
        let cuts = ShowerCuts::default();
        assert!(cuts.accepts(16.0, 0.95));
        assert!(cuts.accepts(16.5, 0.95));
        assert!(!cuts.accepts(15.999_999, 0.95));
        assert!(!cuts.accepts(16.500_000_1, 0.95));
    }

    #[test]
    fn zenith_cut_is_strict() {
        let cuts = ShowerCuts::default();
        assert!(!cuts.accepts(16.2, 0.9));
        assert!(cuts.accepts(16.2, 0.900_000_1));
        assert!(!cuts.accepts(16.2, 0.5));
    }

    #[test]
    fn records_use_log_energy_and_cosine_of_zenith() {
        let cuts = ShowerCuts::default();
        assert!(cuts.accepts_record(array![0.0, 1e16, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0].view()));
        assert!(!cuts.accepts_record(array![0.0, 1e16, 0.5, 0.0, 0.0, 0.0, 0.0, 1.0].view()));
        assert!(!cuts.accepts_record(array![0.0, 5e16, 0.1, 0.0, 0.0, 0.0, 0.0, 1.0].view()));
    }

    #[test]
    fn apply_keeps_order_and_is_idempotent() {
        let input = table(&[
            record(2e16, 0.1),
            record(9e15, 0.1),
            record(1.5e16, 0.2),
            record(2e16, 1.2),
            record(3e16, 0.05),
        ]);
        let cuts = ShowerCuts::default();
        let once = cuts.apply(&input);
        assert_eq!(once.len(), 3);
        assert_eq!(
            once.column(column::ENERGY).to_vec(),
            vec![2e16, 1.5e16, 3e16]
        );

        let twice = cuts.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_result_is_a_valid_table() {
        let input = table(&[record(1e15, 0.1), record(2e16, 1.5)]);
        let filtered = ShowerCuts::default().apply(&input);
        assert!(filtered.is_empty());
        assert_eq!(filtered.values().ncols(), 8);
    }
}
