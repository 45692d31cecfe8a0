//! Sampling frequency of a series: fixed spacing or calendar months/years.

use crate::core::{SeriesCollection, SeriesTable};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Datelike, Duration, Months, Timelike, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Minimum share of spacings that must agree with the modal spacing.
const MODAL_TOLERANCE: f64 = 0.5;

/// Spacing between consecutive rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Constant spacing (seconds, hours, days, weeks...).
    Fixed(Duration),
    /// First day of every month.
    MonthStart,
    /// First day of every year.
    YearStart,
}

impl Frequency {
    pub fn days(n: i64) -> Self {
        Frequency::Fixed(Duration::days(n))
    }

    pub fn hours(n: i64) -> Self {
        Frequency::Fixed(Duration::hours(n))
    }

    /// Infer the frequency from timestamps by the modal spacing.
    pub fn infer(timestamps: &[DateTime<Utc>]) -> Result<Self> {
        if timestamps.len() < 2 {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: timestamps.len(),
            });
        }

        if let Some(calendar) = infer_calendar(timestamps) {
            return Ok(calendar);
        }

        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for w in timestamps.windows(2) {
            *counts.entry((w[1] - w[0]).num_seconds()).or_insert(0) += 1;
        }

        let (modal_diff, modal_count) = counts
            .iter()
            .max_by_key(|(_, &count)| count)
            .map(|(&diff, &count)| (diff, count))
            .ok_or(ForecastError::FrequencyInference(
                "empty spacing data".to_string(),
            ))?;

        let total_count: usize = counts.values().sum();
        if (modal_count as f64 / total_count as f64) < MODAL_TOLERANCE {
            return Err(ForecastError::FrequencyInference(
                "no unique modal spacing found".to_string(),
            ));
        }
        if modal_diff <= 0 {
            return Err(ForecastError::FrequencyInference(
                "non-positive spacing".to_string(),
            ));
        }
        Ok(Frequency::Fixed(Duration::seconds(modal_diff)))
    }

    /// Step `n` periods forward from `ts`.
    pub fn step(&self, ts: DateTime<Utc>, n: u32) -> Result<DateTime<Utc>> {
        let stepped = match self {
            Frequency::Fixed(d) => d
                .checked_mul(i32::try_from(n).map_err(|_| overflow())?)
                .and_then(|span| ts.checked_add_signed(span)),
            Frequency::MonthStart => ts.checked_add_months(Months::new(n)),
            Frequency::YearStart => n
                .checked_mul(12)
                .and_then(|m| ts.checked_add_months(Months::new(m))),
        };
        stepped.ok_or_else(overflow)
    }

    /// `periods` timestamps following `last`.
    pub fn range_after(&self, last: DateTime<Utc>, periods: usize) -> Result<Vec<DateTime<Utc>>> {
        let mut out = Vec::with_capacity(periods);
        for i in 1..=periods {
            let n = u32::try_from(i).map_err(|_| overflow())?;
            out.push(self.step(last, n)?);
        }
        Ok(out)
    }

    /// Every grid timestamp from `start` through `end` inclusive.
    pub fn grid(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        if let Frequency::Fixed(d) = self {
            if *d <= Duration::zero() {
                return Err(ForecastError::Configuration(
                    "frequency spacing must be positive".to_string(),
                ));
            }
        }
        let mut out = Vec::new();
        let mut current = start;
        let mut n = 0_u32;
        while current <= end {
            out.push(current);
            n = n.checked_add(1).ok_or_else(overflow)?;
            current = self.step(start, n)?;
        }
        Ok(out)
    }
}

fn overflow() -> ForecastError {
    ForecastError::TimestampError("timestamp out of range".to_string())
}

/// Month-start or year-start data: every timestamp at midnight on day one.
fn infer_calendar(timestamps: &[DateTime<Utc>]) -> Option<Frequency> {
    let on_month_start = timestamps
        .iter()
        .all(|t| t.day() == 1 && t.num_seconds_from_midnight() == 0);
    if !on_month_start {
        return None;
    }
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for w in timestamps.windows(2) {
        let months = (w[1].year() - w[0].year()) * 12 + w[1].month() as i32 - w[0].month() as i32;
        *counts.entry(months).or_insert(0) += 1;
    }
    let modal = counts.iter().max_by_key(|(_, &c)| c).map(|(&m, _)| m)?;
    match modal {
        1 => Some(Frequency::MonthStart),
        12 if timestamps.iter().all(|t| t.month() == 1) => Some(Frequency::YearStart),
        _ => None,
    }
}

/// Resolve one frequency for all series of a collection.
///
/// An explicit frequency wins; otherwise every series long enough to infer
/// from must agree.
pub fn infer_collection_frequency(
    collection: &SeriesCollection<SeriesTable>,
    explicit: Option<Frequency>,
) -> Result<Frequency> {
    let mut inferred: Option<Frequency> = None;
    for (id, table) in collection {
        if table.len() < 2 {
            continue;
        }
        let freq = match Frequency::infer(table.timestamps()) {
            Ok(f) => f,
            Err(e) if explicit.is_some() => {
                debug!(series = %id, error = %e, "frequency not inferable; using explicit");
                continue;
            }
            Err(e) => return Err(e),
        };
        match inferred {
            None => inferred = Some(freq),
            Some(prev) if prev != freq && explicit.is_none() => {
                return Err(ForecastError::FrequencyInference(format!(
                    "series {id:?} has frequency {freq:?}, others {prev:?}"
                )));
            }
            _ => {}
        }
    }
    match (explicit, inferred) {
        (Some(f), Some(i)) => {
            if f != i {
                warn!(explicit = ?f, inferred = ?i, "explicit frequency differs from data");
            }
            Ok(f)
        }
        (Some(f), None) => Ok(f),
        (None, Some(i)) => Ok(i),
        (None, None) => Err(ForecastError::FrequencyInference(
            "no series has two or more rows".to_string(),
        )),
    }
}
