//! Per-sample weights, regularization delay and auto-derived loop sizes.

use ndarray::Array2;
use std::f64::consts::PI;

/// Weight of a sample at normalized time `t`.
///
/// Rises along a half cosine from `1 / weight` at `start` to 1 at `t = 1`.
/// Samples before `start` keep the minimum. `weight <= 1` disables.
pub fn sample_weight(t: f64, weight: f64, start: f64) -> f64 {
    if weight.is_nan() || weight <= 1.0 {
        return 1.0;
    }
    let t = ((t - start) / (1.0 - start)).clamp(0.0, 1.0);
    let c = 0.5 * (PI * (t - 1.0)).cos() + 0.5;
    (1.0 + c * (weight - 1.0)) / weight
}

/// Weights for every target position of a batch.
pub fn sample_weights(time: &Array2<f64>, weight: f64, start: f64) -> Array2<f64> {
    time.mapv(|t| sample_weight(t, weight, start))
}

/// Fade-in factor of the regularization at a point of training.
///
/// `epoch + iter_progress` is the fractional epoch, with `iter_progress` in
/// `[0, 1)`.
pub fn reg_delay_weight(epoch: usize, iter_progress: f64, epochs: usize, start: f64, full: f64) -> f64 {
    let progress = (epoch as f64 + iter_progress) / epochs.max(1) as f64;
    if full <= start {
        return if progress >= start { 1.0 } else { 0.0 };
    }
    let r = (progress - start) / (full - start);
    if r <= 0.0 {
        0.0
    } else if r < 1.0 {
        1.0 - (1.0 + (PI * r).cos()) / 2.0
    } else {
        1.0
    }
}

/// Batch size for `n_samples` samples when none is configured.
pub fn auto_batch_size(n_samples: usize) -> usize {
    if n_samples == 0 {
        return 1;
    }
    let exp = 2 + (n_samples as f64).log10().floor() as i32;
    let size = 2_f64.powi(exp).clamp(16.0, 256.0) as usize;
    size.min(n_samples)
}

/// Number of epochs for `n_samples` samples when none is configured.
pub fn auto_epochs(n_samples: usize) -> usize {
    if n_samples == 0 {
        return 400;
    }
    let n = n_samples as f64;
    let epochs = (2_f64.powf(2.5 * (100.0 + n).log10()) / (n / 1000.0)).floor();
    epochs.clamp(40.0, 400.0) as usize
}
