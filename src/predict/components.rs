//! Component naming and rescaling.

use crate::config::{ComponentMode, ForecasterConfig};
use crate::prepare::ShiftScale;
use crate::train::Components;

/// What a named model component represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    Trend,
    Seasonality(String),
    Ar,
    LaggedRegressor(String),
    FutureRegressor(String),
    Event(String),
    /// Sum of several components, e.g. `events_additive`.
    Aggregate(ComponentMode),
    Other(String),
}

impl ComponentKind {
    pub fn classify(name: &str) -> Self {
        if name.contains("multiplicative") {
            return ComponentKind::Aggregate(ComponentMode::Multiplicative);
        }
        if name == "trend" {
            return ComponentKind::Trend;
        }
        if name == "ar" {
            return ComponentKind::Ar;
        }
        if name.ends_with("_additive") {
            return ComponentKind::Aggregate(ComponentMode::Additive);
        }
        if let Some(rest) = name.strip_prefix("season_") {
            return ComponentKind::Seasonality(rest.to_string());
        }
        if let Some(rest) = name.strip_prefix("lagged_regressor_") {
            return ComponentKind::LaggedRegressor(rest.to_string());
        }
        if let Some(rest) = name.strip_prefix("future_regressor_") {
            return ComponentKind::FutureRegressor(rest.to_string());
        }
        if let Some(rest) = name.strip_prefix("event_") {
            return ComponentKind::Event(rest.to_string());
        }
        ComponentKind::Other(name.to_string())
    }

    /// How the component combines with the trend under `config`.
    pub fn mode(&self, config: &ForecasterConfig) -> ComponentMode {
        match self {
            ComponentKind::Seasonality(_) => config.seasonality.mode,
            ComponentKind::FutureRegressor(name) => config
                .regressors
                .get(name)
                .map(|r| r.mode)
                .unwrap_or_default(),
            ComponentKind::Event(name) => config
                .event_config(name)
                .map(|e| e.mode)
                .unwrap_or_default(),
            ComponentKind::Aggregate(mode) => *mode,
            _ => ComponentMode::Additive,
        }
    }

    /// Lagged components get one column per forecast step.
    pub fn is_lagged(&self) -> bool {
        matches!(self, ComponentKind::Ar | ComponentKind::LaggedRegressor(_))
    }
}

/// Bring additive components back to the target scale. Multiplicative
/// components are factors and stay as they are; the trend also gets the
/// shift.
pub fn rescale_components(
    components: &Components,
    params: &ShiftScale,
    config: &ForecasterConfig,
) -> Components {
    components
        .iter()
        .map(|(name, values)| {
            let kind = ComponentKind::classify(name);
            let rescaled = match (kind.mode(config), &kind) {
                (ComponentMode::Multiplicative, _) => values.clone(),
                (_, ComponentKind::Trend) => values.mapv(|v| params.invert(v)),
                _ => values.mapv(|v| v * params.scale),
            };
            (name.clone(), rescaled)
        })
        .collect()
}
