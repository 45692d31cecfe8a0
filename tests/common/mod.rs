//! Shared fixtures for integration tests.
#![allow(dead_code)]

use anofox_decomp::prelude::*;
use anofox_decomp::prepare::WindowInputs;
use anofox_decomp::train::BoxedModel;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ndarray::{Array1, Array2};

pub fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}

pub fn linear_table(n: usize) -> SeriesTable {
    SeriesTable::new(make_timestamps(n), (0..n).map(|i| 10.0 + 0.5 * i as f64).collect()).unwrap()
}

pub fn seasonal_table(n: usize) -> SeriesTable {
    let y = (0..n)
        .map(|i| 50.0 + 0.2 * i as f64 + 5.0 * (i as f64 * 2.0 * std::f64::consts::PI / 7.0).sin())
        .collect();
    SeriesTable::new(make_timestamps(n), y).unwrap()
}

/// `y = offset + slope * t + ar . lags + sum_r w_r * x_r`.
///
/// Parameter layout: offset, slope, AR weights (n_forecasts x n_lags, row
/// major), one weight per future regressor.
pub struct LinearModel {
    n_lags: usize,
    n_forecasts: usize,
    regressors: Vec<String>,
    params: Vec<f64>,
    grads: Vec<f64>,
    suggested_lr: Option<f64>,
}

impl LinearModel {
    pub fn new(context: &ModelContext) -> Self {
        let n_lags = context.window.n_lags();
        let n_forecasts = context.window.n_forecasts();
        let n = 2 + n_lags * n_forecasts + context.regressors.len();
        Self {
            n_lags,
            n_forecasts,
            regressors: context.regressors.clone(),
            params: vec![0.0; n],
            grads: vec![0.0; n],
            suggested_lr: None,
        }
    }

    pub fn with_suggested_lr(mut self, lr: f64) -> Self {
        self.suggested_lr = Some(lr);
        self
    }

    pub fn factory() -> ModelFactory {
        ModelFactory::new(|ctx| Ok(Box::new(LinearModel::new(ctx)) as BoxedModel))
    }

    fn ar_offset(&self) -> usize {
        2
    }

    fn regressor_offset(&self) -> usize {
        2 + self.n_lags * self.n_forecasts
    }

    fn ar_matrix(&self) -> Array2<f64> {
        let start = self.ar_offset();
        Array2::from_shape_vec(
            (self.n_forecasts, self.n_lags),
            self.params[start..start + self.n_lags * self.n_forecasts].to_vec(),
        )
        .unwrap()
    }
}

impl DecompositionModel for LinearModel {
    fn forward(&self, inputs: &WindowInputs) -> anofox_decomp::Result<Array2<f64>> {
        let components = self.compute_components(inputs)?;
        let mut out = Array2::zeros(inputs.time.dim());
        for values in components.values() {
            out += values;
        }
        Ok(out)
    }

    fn compute_components(&self, inputs: &WindowInputs) -> anofox_decomp::Result<Components> {
        let mut out = Components::new();
        out.insert(
            "trend".to_string(),
            inputs.time.mapv(|t| self.params[0] + self.params[1] * t),
        );
        if let Some(lags) = &inputs.lags {
            out.insert("ar".to_string(), lags.dot(&self.ar_matrix().t()));
        }
        for (i, name) in self.regressors.iter().enumerate() {
            let w = self.params[self.regressor_offset() + i];
            out.insert(format!("future_regressor_{name}"), inputs.regressors[name].mapv(|x| w * x));
        }
        Ok(out)
    }

    fn weights(&self) -> ModelWeights {
        let mut weights = ModelWeights::default();
        if self.n_lags > 0 {
            weights.ar = Some(self.ar_matrix());
        }
        for (i, name) in self.regressors.iter().enumerate() {
            let w = self.params[self.regressor_offset() + i];
            weights.regressors.insert(name.clone(), Array1::from(vec![w]));
        }
        weights
    }

    fn backward(
        &mut self,
        inputs: &WindowInputs,
        d_predicted: &Array2<f64>,
        d_weights: &WeightGradients,
    ) -> anofox_decomp::Result<()> {
        self.grads[0] += d_predicted.sum();
        self.grads[1] += (d_predicted * &inputs.time).sum();
        if let Some(lags) = &inputs.lags {
            let d_ar = d_predicted.t().dot(lags);
            let start = self.ar_offset();
            for (i, g) in d_ar.iter().enumerate() {
                self.grads[start + i] += g;
            }
            if let Some(reg) = &d_weights.ar {
                for (i, g) in reg.iter().enumerate() {
                    self.grads[start + i] += g;
                }
            }
        }
        let offset = self.regressor_offset();
        for (i, name) in self.regressors.iter().enumerate() {
            self.grads[offset + i] += (d_predicted * &inputs.regressors[name]).sum();
            if let Some(reg) = d_weights.regressors.get(name) {
                self.grads[offset + i] += reg.sum();
            }
        }
        Ok(())
    }

    fn zero_grad(&mut self) {
        self.grads.iter_mut().for_each(|g| *g = 0.0);
    }

    fn parameters_and_gradients(&mut self) -> (&mut [f64], &[f64]) {
        (&mut self.params, &self.grads)
    }

    fn find_learning_rate(
        &mut self,
        _dataset: &anofox_decomp::prepare::WindowDataset,
        _loss: LossFunction,
    ) -> anofox_decomp::Result<Option<f64>> {
        Ok(self.suggested_lr)
    }

    fn name(&self) -> &str {
        "linear"
    }
}

pub fn quick_train() -> TrainConfig {
    TrainConfig::default()
        .with_epochs(30)
        .with_batch_size(16)
        .with_learning_rate(0.05)
}
