//! Gap filling for a single column.

use crate::core::is_missing;
use std::ops::Range;

/// Maximal runs of consecutive missing values.
pub fn missing_runs(values: &[f64]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < values.len() {
        if is_missing(values[i]) {
            let start = i;
            while i < values.len() && is_missing(values[i]) {
                i += 1;
            }
            runs.push(start..i);
        } else {
            i += 1;
        }
    }
    runs
}

/// Fill gaps with a forward linear pass, a trailing rolling mean and a
/// backward linear pass.
///
/// For every gap of length `g` bounded by observations `l` and `r`:
/// * the first `min(g, limit_linear)` values lie on the line from `l` to `r`;
/// * the next `min(rest, rolling)` values are the mean of the preceding
///   `rolling` resolved values, computed one after the other;
/// * the last `min(rest, limit_linear)` values are interpolated between the
///   last resolved value and `r`.
///
/// A gap at the start takes the first observation for up to `limit_linear`
/// values; a gap at the end takes the last observation, then rolling means.
///
/// Returns the filled values and the number still missing.
pub fn fill_linear_then_rolling(
    values: &[f64],
    limit_linear: usize,
    rolling: usize,
) -> (Vec<f64>, usize) {
    let mut result: Vec<f64> = values
        .iter()
        .map(|&v| if is_missing(v) { f64::NAN } else { v })
        .collect();
    for gap in missing_runs(values) {
        fill_gap(&mut result, gap, limit_linear, rolling);
    }
    let remaining = result.iter().filter(|v| v.is_nan()).count();
    (result, remaining)
}

/// Replace every missing value with zero.
pub fn fill_zero(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|&v| if is_missing(v) { 0.0 } else { v })
        .collect()
}

fn fill_gap(result: &mut [f64], gap: Range<usize>, limit_linear: usize, rolling: usize) {
    let Range { start, end } = gap;
    let len = end - start;
    let left = start.checked_sub(1).map(|i| result[i]);
    let right = result.get(end).copied();

    let Some(l) = left else {
        if let Some(r) = right {
            let n = limit_linear.min(len);
            result[end - n..end].fill(r);
        }
        return;
    };

    let front = limit_linear.min(len);
    let segments = (len + 1) as f64;
    for j in 0..front {
        result[start + j] = match right {
            Some(r) => l + (j + 1) as f64 / segments * (r - l),
            None => l,
        };
    }

    let mut next = start + front;
    let rolled_end = (next + rolling).min(end);
    while next < rolled_end {
        result[next] = trailing_mean(&result[..next], rolling);
        next += 1;
    }

    if let Some(r) = right {
        let back = limit_linear.min(end - next);
        if back > 0 {
            // next > 0 here: the left boundary is observed.
            let anchor = next - 1;
            let base = result[anchor];
            let span = (end - anchor) as f64;
            for idx in end - back..end {
                result[idx] = base + (idx - anchor) as f64 / span * (r - base);
            }
        }
    }
}

fn trailing_mean(history: &[f64], window: usize) -> f64 {
    let start = history.len().saturating_sub(window);
    let (sum, count) = history[start..]
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0_usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
