//! Regularization penalties on the model weights.

use crate::config::ForecasterConfig;
use crate::train::model::{ModelWeights, WeightGradients};
use ndarray::{Array, Array1, Dimension};
use std::collections::BTreeMap;
use std::f64::consts::E;

/// Penalty value and its gradient with respect to the weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegularizationTerm {
    pub value: f64,
    pub gradients: WeightGradients,
}

/// Log penalty that is steep near zero and flat for large weights:
/// `ln(c + a|w|) - ln(c)` with `c = 1 / (e * eagerness)`. Returns the sum
/// over all weights and the elementwise gradient.
pub fn penalize_nonzero<D: Dimension>(
    weights: &Array<f64, D>,
    eagerness: f64,
    acceptance: f64,
) -> (f64, Array<f64, D>) {
    let cliff = 1.0 / (E * eagerness);
    let value = weights
        .iter()
        .map(|w| (cliff + acceptance * w.abs()).ln() - cliff.ln())
        .sum();
    let grad = weights.mapv(|w| acceptance * sign(w) / (cliff + acceptance * w.abs()));
    (value, grad)
}

/// `mean(|w|)` and its gradient.
fn mean_abs(weights: &Array1<f64>) -> (f64, Array1<f64>) {
    if weights.is_empty() {
        return (0.0, weights.clone());
    }
    let n = weights.len() as f64;
    let value = weights.iter().map(|w| w.abs()).sum::<f64>() / n;
    (value, weights.mapv(|w| sign(w) / n))
}

fn sign(w: f64) -> f64 {
    if w == 0.0 {
        0.0
    } else {
        w.signum()
    }
}

/// Collects the configured penalty strengths. A penalty only applies when
/// its strength is positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Regularizer {
    ar: Option<f64>,
    n_forecasts: usize,
    trend_reg: f64,
    trend_threshold: f64,
    n_changepoints: usize,
    seasonality: f64,
    events: BTreeMap<String, f64>,
    regressors: BTreeMap<String, f64>,
}

impl Regularizer {
    pub fn new(config: &ForecasterConfig) -> Self {
        Self {
            ar: config.ar.reg.filter(|r| *r > 0.0 && config.n_lags() > 0),
            n_forecasts: config.n_forecasts(),
            trend_reg: config.trend.trend_reg,
            trend_threshold: config.trend.threshold(),
            n_changepoints: config.trend.n_changepoints,
            seasonality: config.seasonality.reg,
            events: config
                .all_events()
                .into_iter()
                .filter_map(|(n, e)| e.reg.filter(|r| *r > 0.0).map(|r| (n.to_string(), r)))
                .collect(),
            regressors: config
                .regressors
                .iter()
                .filter_map(|(n, c)| c.reg.filter(|r| *r > 0.0).map(|r| (n.clone(), r)))
                .collect(),
        }
    }

    /// Whether any penalty is active.
    pub fn is_active(&self) -> bool {
        self.ar.is_some()
            || self.trend_active()
            || self.seasonality > 0.0
            || !self.events.is_empty()
            || !self.regressors.is_empty()
    }

    fn trend_active(&self) -> bool {
        self.n_changepoints > 0 && self.trend_reg > 0.0
    }

    /// Sum of all active penalties scaled by `delay`, with matching gradients.
    pub fn compute(&self, weights: &ModelWeights, delay: f64) -> RegularizationTerm {
        let mut term = RegularizationTerm::default();
        if delay <= 0.0 || !self.is_active() {
            return term;
        }

        if let (Some(lambda), Some(ar)) = (self.ar, weights.ar.as_ref()) {
            let scale = lambda / self.n_forecasts as f64;
            let (value, grad) = penalize_nonzero(ar, 3.0, 1.0);
            term.value += scale * value;
            term.gradients.ar = Some(grad * (scale * delay));
        }

        if self.trend_active() {
            if let Some(deltas) = weights.trend_deltas.as_ref() {
                let thr = self.trend_threshold;
                let value: f64 = deltas.iter().map(|d| (d.abs() - thr).max(0.0)).sum();
                term.value += self.trend_reg * value;
                let scale = self.trend_reg * delay;
                term.gradients.trend_deltas = Some(deltas.mapv(|d| {
                    if d.abs() > thr {
                        scale * sign(d)
                    } else {
                        0.0
                    }
                }));
            }
        }

        if self.seasonality > 0.0 {
            for (name, beta) in &weights.seasonality {
                let (value, grad) = mean_abs(beta);
                term.value += self.seasonality * value;
                term.gradients
                    .seasonality
                    .insert(name.clone(), grad * (self.seasonality * delay));
            }
        }

        apply_mean_abs(&self.events, &weights.events, delay, &mut term.value, &mut term.gradients.events);
        apply_mean_abs(
            &self.regressors,
            &weights.regressors,
            delay,
            &mut term.value,
            &mut term.gradients.regressors,
        );

        term.value *= delay;
        term
    }
}

fn apply_mean_abs(
    strengths: &BTreeMap<String, f64>,
    weights: &BTreeMap<String, Array1<f64>>,
    delay: f64,
    value: &mut f64,
    gradients: &mut BTreeMap<String, Array1<f64>>,
) {
    for (name, lambda) in strengths {
        if let Some(w) = weights.get(name) {
            let (v, grad) = mean_abs(w);
            *value += lambda * v;
            gradients.insert(name.clone(), grad * (lambda * delay));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EventConfig, RegressorConfig, TrendConfig, TrendThreshold};
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn penalize_nonzero_is_zero_at_origin_and_concave() {
        let (value, grad) = penalize_nonzero(&array![0.0, 1.0, -1.0], 3.0, 1.0);
        let c = 1.0 / (E * 3.0);
        assert_relative_eq!(value, 2.0 * ((c + 1.0).ln() - c.ln()));
        assert_eq!(grad[0], 0.0);
        assert_relative_eq!(grad[1], 1.0 / (c + 1.0));
        assert_relative_eq!(grad[2], -1.0 / (c + 1.0));
    }

    #[test]
    fn ar_penalty_is_averaged_over_forecast_steps() {
        let config = ForecasterConfig::default()
            .with_window(2, 2)
            .unwrap()
            .with_ar_reg(0.5)
            .unwrap();
        let weights = ModelWeights {
            ar: Some(array![[1.0, 0.0], [0.0, 1.0]]),
            ..Default::default()
        };
        let term = Regularizer::new(&config).compute(&weights, 1.0);
        let (raw, _) = penalize_nonzero(weights.ar.as_ref().unwrap(), 3.0, 1.0);
        assert_relative_eq!(term.value, 0.5 * raw / 2.0);
    }

    #[test]
    fn trend_penalty_ignores_deltas_below_threshold() {
        let config = ForecasterConfig::default().with_trend(TrendConfig {
            n_changepoints: 3,
            trend_reg: 2.0,
            threshold: TrendThreshold::Fixed(0.5),
        });
        let weights = ModelWeights {
            trend_deltas: Some(array![0.2, -1.0, 0.75]),
            ..Default::default()
        };
        let term = Regularizer::new(&config).compute(&weights, 1.0);
        assert_relative_eq!(term.value, 2.0 * (0.5 + 0.25));
        assert_eq!(term.gradients.trend_deltas, Some(array![0.0, -2.0, 2.0]));
    }

    #[test]
    fn delay_scales_value_and_gradients() {
        let config = ForecasterConfig::default()
            .add_future_regressor(
                "temp",
                RegressorConfig {
                    reg: Some(1.0),
                    ..Default::default()
                },
            )
            .unwrap()
            .add_events(
                &["promo"],
                EventConfig {
                    reg: Some(2.0),
                    ..Default::default()
                },
            )
            .unwrap();
        let mut weights = ModelWeights::default();
        weights.regressors.insert("temp".into(), array![2.0, -2.0]);
        weights.events.insert("promo".into(), array![1.0]);
        let regularizer = Regularizer::new(&config);

        let full = regularizer.compute(&weights, 1.0);
        assert_relative_eq!(full.value, 2.0 + 2.0);
        let half = regularizer.compute(&weights, 0.5);
        assert_relative_eq!(half.value, 2.0);
        assert_eq!(half.gradients.regressors["temp"], array![0.25, -0.25]);
        assert_eq!(half.gradients.events["promo"], array![1.0]);

        let none = regularizer.compute(&weights, 0.0);
        assert_eq!(none.value, 0.0);
        assert!(none.gradients.is_empty());
    }

    #[test]
    fn inactive_without_strengths() {
        let regularizer = Regularizer::new(&ForecasterConfig::default());
        assert!(!regularizer.is_active());
    }
}
