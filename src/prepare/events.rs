//! Event occurrence columns.

use crate::config::ForecasterConfig;
use crate::core::SeriesTable;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};

/// One occurrence of a named event or holiday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOccurrence {
    pub timestamp: DateTime<Utc>,
    pub event: String,
}

impl EventOccurrence {
    pub fn new(timestamp: DateTime<Utc>, event: impl Into<String>) -> Self {
        Self {
            timestamp,
            event: event.into(),
        }
    }
}

/// 1.0 for rows falling on the same day as an occurrence of `name`, else 0.0.
pub fn event_indicator(
    timestamps: &[DateTime<Utc>],
    occurrences: &[EventOccurrence],
    name: &str,
) -> Vec<f64> {
    let days: Vec<_> = occurrences
        .iter()
        .filter(|o| o.event == name)
        .map(|o| o.timestamp.date_naive())
        .collect();
    timestamps
        .iter()
        .map(|ts| {
            if days.contains(&ts.date_naive()) {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Add one 0/1 column per configured event and holiday.
pub fn with_events(
    table: &SeriesTable,
    occurrences: &[EventOccurrence],
    config: &ForecasterConfig,
) -> Result<SeriesTable> {
    if let Some(unknown) = occurrences.iter().find(|o| !config.is_event(&o.event)) {
        return Err(ForecastError::Configuration(format!(
            "event {:?} is not configured",
            unknown.event
        )));
    }
    let mut out = table.clone();
    for (name, _) in config.all_events() {
        out = out.with_column(name, event_indicator(table.timestamps(), occurrences, name))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventConfig;
    use chrono::{Duration, TimeZone};

    #[test]
    fn indicator_matches_calendar_day() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let hourly: Vec<_> = (0..48).map(|h| start + Duration::hours(h)).collect();
        let occ = [EventOccurrence::new(start + Duration::hours(30), "sale")];
        let col = event_indicator(&hourly, &occ, "sale");
        assert_eq!(col.iter().sum::<f64>(), 24.0);
        assert_eq!(col[23], 0.0);
        assert_eq!(col[24], 1.0);
    }

    #[test]
    fn with_events_rejects_unknown_names() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let ts: Vec<_> = (0..3).map(|d| start + Duration::days(d)).collect();
        let table = SeriesTable::new(ts.clone(), vec![1.0; 3]).unwrap();
        let config = ForecasterConfig::default()
            .add_events(&["sale"], EventConfig::default())
            .unwrap();

        let out = with_events(&table, &[EventOccurrence::new(ts[1], "sale")], &config).unwrap();
        assert_eq!(out.column("sale"), Some(&[0.0, 1.0, 0.0][..]));

        let err = with_events(&table, &[EventOccurrence::new(ts[1], "other")], &config);
        assert!(matches!(err, Err(ForecastError::Configuration(_))));
    }
}
