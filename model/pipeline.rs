use super::scaler::StandardScaler;
use super::{HyperParameters, ModelError, Regressor, RegressorFactory, Tunable};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Standardization followed by an estimator.
///
/// `fit` refits the scaler on exactly the rows it is given, so when a
/// validation loop fits on a training fold the held-out rows never influence
/// the scaling statistics.
#[derive(Debug, Clone)]
pub struct Pipeline<R> {
    scaler: Option<StandardScaler>,
    estimator: R,
}

impl<R: Regressor> Pipeline<R> {
    pub fn new(estimator: R) -> Self {
        Self {
            scaler: None,
            estimator,
        }
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn estimator(&self) -> &R {
        &self.estimator
    }
}

impl<R: Regressor> Regressor for Pipeline<R> {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError> {
        let scaler = StandardScaler::fit(x)?;
        let scaled = scaler.transform(x)?;
        self.estimator.fit(scaled.view(), y)?;
        self.scaler = Some(scaler);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        match &self.scaler {
            Some(scaler) => self.estimator.predict(scaler.transform(x)?.view()),
            None => self.estimator.predict(x),
        }
    }
}

/// Wraps an estimator factory so every build is a fresh, unfitted pipeline.
#[derive(Debug)]
pub struct PipelineFactory<F> {
    inner: F,
}

impl<F: RegressorFactory> PipelineFactory<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: RegressorFactory> RegressorFactory for PipelineFactory<F> {
    type Model = Pipeline<F::Model>;

    fn build(&self) -> Self::Model {
        Pipeline::new(self.inner.build())
    }
}

impl<F: RegressorFactory + Tunable> Tunable for PipelineFactory<F> {
    fn with_hyperparameters(&self, params: HyperParameters) -> Self {
        Self {
            inner: self.inner.with_hyperparameters(params),
        }
    }
}
