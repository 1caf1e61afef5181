use super::{KFold, ValidationError};
use crate::model::{Regressor, RegressorFactory, mean_squared_error};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

/// Per-fold scores of one cross-validation run.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidation {
    /// Negated held-out MSE, one entry per fold.
    pub scores: Array1<f64>,
}

impl CrossValidation {
    pub fn mean_score(&self) -> f64 {
        self.scores.mean().unwrap_or(f64::NAN)
    }

    /// Mean held-out MSE across folds.
    pub fn mean_mse(&self) -> f64 {
        -self.mean_score()
    }

    /// Population standard deviation of the fold scores.
    pub fn std(&self) -> f64 {
        self.scores.std(0.0)
    }
}

/// Fits a freshly built model on each training partition and scores it on the
/// matching held-out partition.
pub fn cross_val_score<F: RegressorFactory>(
    factory: &F,
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    kfold: &KFold,
) -> Result<CrossValidation, ValidationError> {
    if x.nrows() != y.len() {
        return Err(ValidationError::LengthMismatch {
            rows: x.nrows(),
            targets: y.len(),
        });
    }

    let folds = kfold.split(x.nrows())?;
    let mut scores = Array1::zeros(folds.len());
    for (k, fold) in folds.iter().enumerate() {
        let model_error = |source| ValidationError::Model { fold: k + 1, source };

        let mut model = factory.build();
        let x_train = x.select(Axis(0), &fold.train);
        let y_train = y.select(Axis(0), &fold.train);
        model
            .fit(x_train.view(), y_train.view())
            .map_err(model_error)?;

        let x_test = x.select(Axis(0), &fold.test);
        let y_test = y.select(Axis(0), &fold.test);
        let predicted = model.predict(x_test.view()).map_err(model_error)?;
        scores[k] = -mean_squared_error(y_test.view(), predicted.view());

        log::debug!(
            "Fold {}/{}: {} train, {} test, MSE {:.4}",
            k + 1,
            folds.len(),
            fold.train.len(),
            fold.test.len(),
            -scores[k]
        );
    }

    Ok(CrossValidation { scores })
}
