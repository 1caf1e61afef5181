use super::ValidationError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// One train/test partition of the sample indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// K-fold splitter.
///
/// The first `n % n_splits` folds hold one extra sample. With `shuffle` the
/// indices are permuted once with a `StdRng` seeded from `seed` before being
/// cut into folds; without it the folds are contiguous blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for KFold {
    fn default() -> Self {
        // 17 divides the ~1460-run averaged dataset into folds of about 86 runs.
        Self {
            n_splits: 17,
            shuffle: true,
            seed: 7,
        }
    }
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            ..Self::default()
        }
    }

    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>, ValidationError> {
        if self.n_splits < 2 {
            return Err(ValidationError::TooFewFolds(self.n_splits));
        }
        if n_samples < self.n_splits {
            return Err(ValidationError::TooFewSamples {
                samples: n_samples,
                folds: self.n_splits,
            });
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            indices.shuffle(&mut StdRng::seed_from_u64(self.seed));
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for k in 0..self.n_splits {
            let size = base + usize::from(k < extra);
            let stop = start + size;
            let test = indices[start..stop].to_vec();
            let train = indices[..start]
                .iter()
                .chain(&indices[stop..])
                .copied()
                .collect();
            folds.push(Fold { train, test });
            start = stop;
        }
        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn folds_partition_every_index_exactly_once() {
        let kfold = KFold::default();
        let folds = kfold.split(1462).unwrap();
        assert_eq!(folds.len(), 17);

        let mut seen = HashSet::new();
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 1462);
            let train: HashSet<_> = fold.train.iter().collect();
            assert!(fold.test.iter().all(|i| !train.contains(i)));
            for &i in &fold.test {
                assert!(seen.insert(i), "index {i} appears in two test folds");
            }
        }
        assert_eq!(seen.len(), 1462);
    }

    #[test]
    fn fold_sizes_differ_by_at_most_one() {
        let folds = KFold::new(4).split(10).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.test.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
    }

    #[test]
    fn unshuffled_folds_are_contiguous() {
        let kfold = KFold {
            n_splits: 3,
            shuffle: false,
            seed: 0,
        };
        let folds = kfold.split(6).unwrap();
        assert_eq!(folds[0].test, vec![0, 1]);
        assert_eq!(folds[1].test, vec![2, 3]);
        assert_eq!(folds[1].train, vec![0, 1, 4, 5]);
        assert_eq!(folds[2].test, vec![4, 5]);
    }

    #[test]
    fn shuffling_is_seeded() {
        let a = KFold::new(5).split(50).unwrap();
        let b = KFold::new(5).split(50).unwrap();
        assert_eq!(a, b);
        let c = KFold {
            seed: 8,
            ..KFold::new(5)
        }
        .split(50)
        .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_degenerate_requests() {
        assert!(matches!(
            KFold::new(1).split(10),
            Err(ValidationError::TooFewFolds(1))
        ));
        assert!(matches!(
            KFold::new(17).split(0),
            Err(ValidationError::TooFewSamples {
                samples: 0,
                folds: 17
            })
        ));
    }
}
