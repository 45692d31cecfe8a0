//! Elementwise training losses.

use ndarray::{Array2, Zip};

/// Loss applied to each predicted value before sample weighting.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LossFunction {
    /// Smooth L1 with a unit transition point.
    #[default]
    Huber,
    Mse,
    Mae,
}

impl LossFunction {
    /// Loss per element, same shape as the inputs.
    pub fn elementwise(&self, predicted: &Array2<f64>, target: &Array2<f64>) -> Array2<f64> {
        Zip::from(predicted)
            .and(target)
            .map_collect(|&p, &t| self.value(p - t))
    }

    /// Derivative of each element's loss with respect to the prediction.
    pub fn gradient(&self, predicted: &Array2<f64>, target: &Array2<f64>) -> Array2<f64> {
        Zip::from(predicted)
            .and(target)
            .map_collect(|&p, &t| self.derivative(p - t))
    }

    fn value(&self, diff: f64) -> f64 {
        match self {
            LossFunction::Huber => {
                let a = diff.abs();
                if a < 1.0 {
                    0.5 * diff * diff
                } else {
                    a - 0.5
                }
            }
            LossFunction::Mse => diff * diff,
            LossFunction::Mae => diff.abs(),
        }
    }

    fn derivative(&self, diff: f64) -> f64 {
        match self {
            LossFunction::Huber => diff.clamp(-1.0, 1.0),
            LossFunction::Mse => 2.0 * diff,
            LossFunction::Mae => {
                if diff == 0.0 {
                    0.0
                } else {
                    diff.signum()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn huber_is_quadratic_near_zero_and_linear_beyond() {
        let pred = array![[0.5, 3.0, -2.0]];
        let target = array![[0.0, 0.0, 0.0]];
        let loss = LossFunction::Huber.elementwise(&pred, &target);
        assert_relative_eq!(loss[[0, 0]], 0.125);
        assert_relative_eq!(loss[[0, 1]], 2.5);
        assert_relative_eq!(loss[[0, 2]], 1.5);

        let grad = LossFunction::Huber.gradient(&pred, &target);
        assert_eq!(grad, array![[0.5, 1.0, -1.0]]);
    }

    #[test]
    fn mse_and_mae_gradients() {
        let pred = array![[1.0, -1.0]];
        let target = array![[0.0, -1.0]];
        assert_eq!(LossFunction::Mse.gradient(&pred, &target), array![[2.0, 0.0]]);
        assert_eq!(LossFunction::Mae.elementwise(&pred, &target), array![[1.0, 0.0]]);
        assert_eq!(LossFunction::Mae.gradient(&pred, &target), array![[1.0, 0.0]]);
    }
}
