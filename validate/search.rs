//! # Hyperparameter Search
//!
//! Exhaustive grid search and randomized search over batch size and epoch
//! count. Both evaluate every chosen candidate with the same k-fold splitter,
//! spread candidates over a dedicated rayon pool, and rank them by mean
//! cross-validated score.
//!
//! Each candidate trains from a factory re-seeded from the candidate's own
//! parameters, so a search gives the same numbers whatever the thread count
//! or scheduling order.

use super::cross_val::{CrossValidation, cross_val_score};
use super::{KFold, ValidationError};
use crate::model::{HyperParameters, RegressorFactory, Tunable};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::iproduct;
use ndarray::{ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

/// Value sets whose cross product forms the candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterGrid {
    pub batch_sizes: Vec<usize>,
    pub epochs: Vec<usize>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            batch_sizes: vec![10, 20, 40, 60, 80, 100],
            epochs: vec![10, 50, 100],
        }
    }
}

impl ParameterGrid {
    /// All combinations, batch size varying slowest.
    pub fn candidates(&self) -> Vec<HyperParameters> {
        iproduct!(self.batch_sizes.iter().copied(), self.epochs.iter().copied())
            .map(|(batch_size, epochs)| HyperParameters { batch_size, epochs })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.batch_sizes.len() * self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_sizes.is_empty() {
            return Err(ValidationError::EmptyGrid("no batch sizes given"));
        }
        if self.epochs.is_empty() {
            return Err(ValidationError::EmptyGrid("no epoch counts given"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub params: HyperParameters,
    pub cv: CrossValidation,
}

impl CandidateScore {
    pub fn mean_score(&self) -> f64 {
        self.cv.mean_score()
    }

    pub fn std_score(&self) -> f64 {
        self.cv.std()
    }
}

/// Every evaluated candidate, in evaluation order, plus the winner.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub candidates: Vec<CandidateScore>,
    best_index: usize,
}

impl SearchOutcome {
    fn from_candidates(candidates: Vec<CandidateScore>) -> Self {
        let best_index = candidates
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |best, (i, candidate)| {
                let score = candidate.mean_score();
                match best {
                    Some((_, best_score)) if best_score.total_cmp(&score).is_ge() => best,
                    _ => Some((i, score)),
                }
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        Self {
            candidates,
            best_index,
        }
    }

    pub fn best(&self) -> &CandidateScore {
        &self.candidates[self.best_index]
    }

    pub fn best_params(&self) -> HyperParameters {
        self.best().params
    }
}

/// Exhaustive search over a [`ParameterGrid`].
#[derive(Debug, Clone, PartialEq)]
pub struct GridSearch {
    pub grid: ParameterGrid,
    pub cv: KFold,
    /// Worker threads; 0 lets rayon pick one per core.
    pub n_jobs: usize,
}

impl GridSearch {
    pub fn new(grid: ParameterGrid, cv: KFold) -> Self {
        Self {
            grid,
            cv,
            n_jobs: num_cpus::get(),
        }
    }

    pub fn fit<F>(
        &self,
        factory: &F,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<SearchOutcome, ValidationError>
    where
        F: RegressorFactory + Tunable,
    {
        self.grid.validate()?;
        evaluate_candidates(factory, &self.grid.candidates(), x, y, &self.cv, self.n_jobs)
    }
}

/// Samples `n_iter` distinct candidates from the grid instead of trying them
/// all.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomizedSearch {
    pub grid: ParameterGrid,
    pub n_iter: usize,
    pub seed: u64,
    pub cv: KFold,
    pub n_jobs: usize,
}

impl RandomizedSearch {
    pub fn new(grid: ParameterGrid, n_iter: usize, cv: KFold) -> Self {
        Self {
            grid,
            n_iter,
            seed: cv.seed,
            cv,
            n_jobs: num_cpus::get(),
        }
    }

    pub fn sample_candidates(&self) -> Vec<HyperParameters> {
        let all = self.grid.candidates();
        let amount = self.n_iter.min(all.len());
        let mut rng = StdRng::seed_from_u64(self.seed);
        rand::seq::index::sample(&mut rng, all.len(), amount)
            .into_iter()
            .map(|i| all[i])
            .collect()
    }

    pub fn fit<F>(
        &self,
        factory: &F,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<SearchOutcome, ValidationError>
    where
        F: RegressorFactory + Tunable,
    {
        self.grid.validate()?;
        if self.n_iter == 0 {
            return Err(ValidationError::EmptyGrid("n_iter must be at least 1"));
        }
        evaluate_candidates(factory, &self.sample_candidates(), x, y, &self.cv, self.n_jobs)
    }
}

fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let draw_target = if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(20)
    } else {
        ProgressDrawTarget::hidden()
    };

    let pb = ProgressBar::with_draw_target(Some(len), draw_target);
    if let Ok(style) = ProgressStyle::with_template(
        "\n> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    pb.set_message(message.to_string());
    pb
}

fn evaluate_candidates<F>(
    factory: &F,
    candidates: &[HyperParameters],
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    kfold: &KFold,
    n_jobs: usize,
) -> Result<SearchOutcome, ValidationError>
where
    F: RegressorFactory + Tunable,
{
    for params in candidates {
        params.validate()?;
    }
    // Fail on a bad splitter before spinning up any workers.
    kfold.split(x.nrows())?;

    let pool = rayon::ThreadPoolBuilder::new().num_threads(n_jobs).build()?;
    log::info!(
        "Evaluating {} candidates with {}-fold cross-validation on {} threads",
        candidates.len(),
        kfold.n_splits,
        pool.current_num_threads()
    );

    let progress = create_progress_bar(candidates.len() as u64, "hyperparameter candidates");
    let scored = pool.install(|| {
        candidates
            .par_iter()
            .map(|params| -> Result<CandidateScore, ValidationError> {
                let tuned = factory.with_hyperparameters(*params);
                let cv = cross_val_score(&tuned, x, y, kfold)?;
                log::debug!("{params}: mean MSE {:.4}", cv.mean_mse());
                progress.inc(1);
                Ok(CandidateScore {
                    params: *params,
                    cv,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()
    });
    progress.finish_and_clear();

    Ok(SearchOutcome::from_candidates(scored?))
}
