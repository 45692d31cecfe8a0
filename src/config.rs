//! Forecaster configuration.
//!
//! Plain structs with defaults and chained `with_*` builders. Settings that
//! constrain each other are checked when they are set and again by
//! [`ForecasterConfig::validate`].

use crate::error::{ForecastError, Result};
use crate::prepare::normalize::NormalizeMode;
use crate::train::loss::LossFunction;
use crate::train::metrics::MetricKind;
use crate::train::optim::{OptimizerKind, ScheduleKind};
use std::collections::BTreeMap;

/// Names that can never be used for seasonalities, events or regressors.
const RESERVED_NAMES: [&str; 12] = [
    "trend",
    "additive_terms",
    "daily",
    "weekly",
    "yearly",
    "events",
    "holidays",
    "zeros",
    "extra_regressors_additive",
    "yhat",
    "extra_regressors_multiplicative",
    "multiplicative_terms",
];

const RESERVED_COLUMNS: [&str; 6] = ["ds", "y", "cap", "floor", "y_scaled", "cap_scaled"];

/// How a component combines with the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentMode {
    #[default]
    Additive,
    Multiplicative,
}

/// Per-epoch progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    #[default]
    Silent,
    /// Log the epoch metrics at info level.
    Log,
}

/// Forecast window: number of lags and number of forecast steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    n_lags: usize,
    n_forecasts: usize,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            n_lags: 0,
            n_forecasts: 1,
        }
    }
}

impl WindowSpec {
    /// Without lags only single-step forecasts are possible.
    pub fn new(n_lags: usize, n_forecasts: usize) -> Result<Self> {
        if n_forecasts == 0 {
            return Err(ForecastError::Configuration(
                "n_forecasts must be at least 1".to_string(),
            ));
        }
        if n_lags == 0 && n_forecasts > 1 {
            return Err(ForecastError::Configuration(
                "n_forecasts > 1 requires n_lags > 0".to_string(),
            ));
        }
        Ok(Self {
            n_lags,
            n_forecasts,
        })
    }

    pub fn n_lags(&self) -> usize {
        self.n_lags
    }

    pub fn n_forecasts(&self) -> usize {
        self.n_forecasts
    }

    /// Rows spanned by one sample: lags plus forecast targets.
    pub fn sample_span(&self) -> usize {
        self.n_lags + self.n_forecasts
    }

    /// Number of forecast origins in a table of `n_rows` rows.
    pub fn origins(&self, n_rows: usize) -> usize {
        (n_rows + 1).saturating_sub(self.sample_span())
    }
}

/// Gap imputation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImputationPolicy {
    pub enabled: bool,
    /// Values per gap filled by each linear pass.
    pub limit_linear: usize,
    /// Values per gap filled with the trailing rolling mean.
    pub rolling: usize,
}

impl Default for ImputationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            limit_linear: 5,
            rolling: 20,
        }
    }
}

impl ImputationPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Longest gap that can be imputed.
    pub fn bound(&self) -> usize {
        2 * self.limit_linear + self.rolling
    }
}

/// Training loop settings. `None` fields are derived from the data.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub learning_rate: Option<f64>,
    pub loss: LossFunction,
    pub optimizer: OptimizerKind,
    pub schedule: ScheduleKind,
    /// Weight of the newest samples relative to the oldest (>= 1).
    pub newer_samples_weight: f64,
    /// Normalized time from which the sample weight starts rising, in [0, 1).
    pub newer_samples_start: f64,
    /// Training progress when regularization starts fading in.
    pub reg_delay_start: f64,
    /// Training progress when regularization reaches full strength.
    pub reg_delay_full: f64,
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: None,
            batch_size: None,
            learning_rate: None,
            loss: LossFunction::default(),
            optimizer: OptimizerKind::default(),
            schedule: ScheduleKind::default(),
            newer_samples_weight: 2.0,
            newer_samples_start: 0.0,
            reg_delay_start: 0.66,
            reg_delay_full: 1.0,
            shuffle: true,
            seed: 0,
        }
    }
}

impl TrainConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = Some(epochs);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = Some(learning_rate);
        self
    }

    pub fn with_loss(mut self, loss: LossFunction) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleKind) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_newer_samples(mut self, weight: f64, start: f64) -> Self {
        self.newer_samples_weight = weight;
        self.newer_samples_start = start;
        self
    }

    pub fn with_reg_delay(mut self, start: f64, full: f64) -> Self {
        self.reg_delay_start = start;
        self.reg_delay_full = full;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == Some(0) {
            return Err(ForecastError::Configuration("epochs must be positive".into()));
        }
        if self.batch_size == Some(0) {
            return Err(ForecastError::Configuration(
                "batch_size must be positive".into(),
            ));
        }
        if let Some(lr) = self.learning_rate {
            if !(lr.is_finite() && lr > 0.0) {
                return Err(ForecastError::Configuration(
                    "learning_rate must be positive".into(),
                ));
            }
        }
        if self.newer_samples_weight.is_nan() || self.newer_samples_weight < 1.0 {
            return Err(ForecastError::Configuration(
                "newer_samples_weight must be >= 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.newer_samples_start) {
            return Err(ForecastError::Configuration(
                "newer_samples_start must be in [0, 1)".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.reg_delay_start)
            || !(0.0..=1.0).contains(&self.reg_delay_full)
            || self.reg_delay_start > self.reg_delay_full
        {
            return Err(ForecastError::Configuration(
                "regularization delay must satisfy 0 <= start <= full <= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Trend changepoint regularization threshold.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TrendThreshold {
    /// Penalize every change.
    #[default]
    Off,
    /// Derived from the regularization strength and changepoint count.
    Auto,
    Fixed(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendConfig {
    pub n_changepoints: usize,
    /// Regularization strength on the changepoint deltas (0 disables).
    pub trend_reg: f64,
    pub threshold: TrendThreshold,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 10,
            trend_reg: 0.0,
            threshold: TrendThreshold::Off,
        }
    }
}

impl TrendConfig {
    /// Resolved threshold below which deltas are not penalized.
    pub fn threshold(&self) -> f64 {
        match self.threshold {
            TrendThreshold::Off => 0.0,
            TrendThreshold::Fixed(t) => t,
            TrendThreshold::Auto => {
                3.0 / (3.0 + (1.0 + self.trend_reg) * (self.n_changepoints as f64).sqrt())
            }
        }
    }
}

/// One periodic component.
#[derive(Debug, Clone, PartialEq)]
pub struct Seasonality {
    pub name: String,
    /// Period in days.
    pub period: f64,
    pub fourier_order: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeasonalityConfig {
    pub mode: ComponentMode,
    /// Penalty on the seasonal coefficients (0 disables).
    pub reg: f64,
    pub seasonalities: Vec<Seasonality>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArConfig {
    /// Sparsity penalty on the autoregression weights.
    pub reg: Option<f64>,
}

/// Lagged covariate settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CovariateConfig {
    pub reg: Option<f64>,
    pub normalize: NormalizeMode,
    pub only_last_value: bool,
}

/// Future regressor settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegressorConfig {
    pub reg: Option<f64>,
    pub normalize: NormalizeMode,
    pub mode: ComponentMode,
}

/// Event or holiday settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EventConfig {
    pub lower_window: i32,
    pub upper_window: i32,
    pub reg: Option<f64>,
    pub mode: ComponentMode,
}

impl EventConfig {
    /// Number of day offsets covered by the event window.
    pub fn offsets(&self) -> usize {
        (self.upper_window - self.lower_window).unsigned_abs() as usize + 1
    }
}

/// Country holidays; the caller supplies the holiday names.
#[derive(Debug, Clone, PartialEq)]
pub struct HolidaysConfig {
    pub country: String,
    pub names: Vec<String>,
    pub config: EventConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationConfig {
    pub mode: NormalizeMode,
    /// One set of parameters for all series instead of one per series.
    pub global: bool,
    /// Normalize time over all series even when values are local.
    pub global_time: bool,
    /// Fall back to global parameters for series ids not seen in training.
    pub unknown_data: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            mode: NormalizeMode::Auto,
            global: false,
            global_time: true,
            unknown_data: false,
        }
    }
}

/// Complete forecaster configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecasterConfig {
    window: WindowSpec,
    pub imputation: ImputationPolicy,
    pub train: TrainConfig,
    pub trend: TrendConfig,
    pub seasonality: SeasonalityConfig,
    pub ar: ArConfig,
    pub normalization: NormalizationConfig,
    pub covariates: BTreeMap<String, CovariateConfig>,
    pub regressors: BTreeMap<String, RegressorConfig>,
    pub events: BTreeMap<String, EventConfig>,
    pub holidays: Option<HolidaysConfig>,
    pub collect_metrics: Vec<MetricKind>,
    pub progress: ProgressMode,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            window: WindowSpec::default(),
            imputation: ImputationPolicy::default(),
            train: TrainConfig::default(),
            trend: TrendConfig::default(),
            seasonality: SeasonalityConfig::default(),
            ar: ArConfig::default(),
            normalization: NormalizationConfig::default(),
            covariates: BTreeMap::new(),
            regressors: BTreeMap::new(),
            events: BTreeMap::new(),
            holidays: None,
            collect_metrics: vec![MetricKind::Mae, MetricKind::Rmse],
            progress: ProgressMode::Silent,
        }
    }
}

impl ForecasterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(&self) -> WindowSpec {
        self.window
    }

    pub fn n_lags(&self) -> usize {
        self.window.n_lags
    }

    pub fn n_forecasts(&self) -> usize {
        self.window.n_forecasts
    }

    pub fn with_window(mut self, n_lags: usize, n_forecasts: usize) -> Result<Self> {
        let window = WindowSpec::new(n_lags, n_forecasts)?;
        if n_lags == 0 && !self.covariates.is_empty() {
            return Err(ForecastError::Configuration(
                "lagged regressors require n_lags > 0".into(),
            ));
        }
        self.window = window;
        Ok(self)
    }

    pub fn with_imputation(mut self, imputation: ImputationPolicy) -> Self {
        self.imputation = imputation;
        self
    }

    pub fn with_train(mut self, train: TrainConfig) -> Self {
        self.train = train;
        self
    }

    pub fn with_trend(mut self, trend: TrendConfig) -> Self {
        self.trend = trend;
        self
    }

    pub fn with_ar_reg(mut self, reg: f64) -> Result<Self> {
        self.ar.reg = checked_reg(Some(reg))?;
        Ok(self)
    }

    pub fn with_seasonality_mode(mut self, mode: ComponentMode) -> Self {
        self.seasonality.mode = mode;
        self
    }

    pub fn with_seasonality_reg(mut self, reg: f64) -> Result<Self> {
        self.seasonality.reg = checked_reg(Some(reg))?.unwrap_or(0.0);
        Ok(self)
    }

    pub fn with_normalization(mut self, normalization: NormalizationConfig) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_metrics(mut self, metrics: Vec<MetricKind>) -> Self {
        self.collect_metrics = metrics;
        self
    }

    pub fn with_progress(mut self, progress: ProgressMode) -> Self {
        self.progress = progress;
        self
    }

    /// Add lagged covariates. Requires `n_lags > 0`.
    pub fn add_lagged_regressor(mut self, names: &[&str], config: CovariateConfig) -> Result<Self> {
        if self.n_lags() == 0 {
            return Err(ForecastError::Configuration(
                "lagged regressors require n_lags > 0".into(),
            ));
        }
        let config = CovariateConfig {
            reg: checked_reg(config.reg)?,
            ..config
        };
        for name in names {
            self.validate_name(name)?;
            self.covariates.insert((*name).to_string(), config);
        }
        Ok(self)
    }

    /// Add a regressor whose future values are known.
    pub fn add_future_regressor(mut self, name: &str, config: RegressorConfig) -> Result<Self> {
        self.validate_name(name)?;
        let config = RegressorConfig {
            reg: checked_reg(config.reg)?,
            ..config
        };
        self.regressors.insert(name.to_string(), config);
        Ok(self)
    }

    /// Add user events; their occurrence columns are built with `with_events`.
    pub fn add_events(mut self, names: &[&str], config: EventConfig) -> Result<Self> {
        let config = EventConfig {
            reg: checked_reg(config.reg)?,
            ..config
        };
        for name in names {
            self.validate_name(name)?;
            self.events.insert((*name).to_string(), config);
        }
        Ok(self)
    }

    /// Add the holidays of a country, named by the caller.
    pub fn add_country_holidays(
        mut self,
        country: &str,
        names: &[&str],
        config: EventConfig,
    ) -> Result<Self> {
        if self.holidays.is_some() {
            return Err(ForecastError::Configuration(
                "country holidays already configured".into(),
            ));
        }
        let config = EventConfig {
            reg: checked_reg(config.reg)?,
            ..config
        };
        for name in names {
            self.validate_name(name)?;
        }
        self.holidays = Some(HolidaysConfig {
            country: country.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
            config,
        });
        Ok(self)
    }

    pub fn add_seasonality(mut self, name: &str, period: f64, fourier_order: usize) -> Result<Self> {
        self.validate_name(name)?;
        if !(period.is_finite() && period > 0.0) {
            return Err(ForecastError::Configuration(format!(
                "period of seasonality {name:?} must be positive"
            )));
        }
        if fourier_order == 0 {
            return Err(ForecastError::Configuration(format!(
                "fourier order of seasonality {name:?} must be positive"
            )));
        }
        self.seasonality.seasonalities.push(Seasonality {
            name: name.to_string(),
            period,
            fourier_order,
        });
        Ok(self)
    }

    /// Reject reserved names and names already in use.
    pub fn validate_name(&self, name: &str) -> Result<()> {
        let reserved = RESERVED_NAMES.iter().any(|r| {
            name == *r
                || name.strip_suffix("_lower") == Some(*r)
                || name.strip_suffix("_upper") == Some(*r)
        }) || RESERVED_COLUMNS.contains(&name);
        if reserved || name.is_empty() {
            return Err(ForecastError::Configuration(format!(
                "name {name:?} is reserved"
            )));
        }
        if self.events.contains_key(name) {
            return Err(ForecastError::Configuration(format!(
                "name {name:?} already used for an event"
            )));
        }
        if let Some(h) = &self.holidays {
            if h.names.iter().any(|n| n == name) {
                return Err(ForecastError::Configuration(format!(
                    "name {name:?} is a holiday name in {}",
                    h.country
                )));
            }
        }
        if self.seasonality.seasonalities.iter().any(|s| s.name == name) {
            return Err(ForecastError::Configuration(format!(
                "name {name:?} already used for a seasonality"
            )));
        }
        if self.covariates.contains_key(name) {
            return Err(ForecastError::Configuration(format!(
                "name {name:?} already used for an added covariate"
            )));
        }
        if self.regressors.contains_key(name) {
            return Err(ForecastError::Configuration(format!(
                "name {name:?} already used for an added regressor"
            )));
        }
        Ok(())
    }

    /// Event and holiday names with their settings.
    pub fn all_events(&self) -> Vec<(&str, &EventConfig)> {
        let mut out: Vec<(&str, &EventConfig)> =
            self.events.iter().map(|(k, v)| (k.as_str(), v)).collect();
        if let Some(h) = &self.holidays {
            out.extend(h.names.iter().map(|n| (n.as_str(), &h.config)));
        }
        out
    }

    pub fn event_config(&self, name: &str) -> Option<&EventConfig> {
        self.events.get(name).or_else(|| {
            self.holidays
                .as_ref()
                .filter(|h| h.names.iter().any(|n| n == name))
                .map(|h| &h.config)
        })
    }

    pub fn is_event(&self, name: &str) -> bool {
        self.event_config(name).is_some()
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty() || self.holidays.as_ref().is_some_and(|h| !h.names.is_empty())
    }

    /// Columns that go through imputation, in imputation order.
    pub fn data_columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.covariates.keys().map(|k| k.as_str()).collect();
        out.extend(self.regressors.keys().map(|k| k.as_str()));
        out.extend(self.all_events().into_iter().map(|(n, _)| n));
        out
    }

    /// Whether training metrics are collected.
    pub fn collects_metrics(&self) -> bool {
        !self.collect_metrics.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        self.train.validate()?;
        if self.n_lags() == 0 && !self.covariates.is_empty() {
            return Err(ForecastError::Configuration(
                "lagged regressors require n_lags > 0".into(),
            ));
        }
        if self.trend.trend_reg < 0.0 || self.seasonality.reg < 0.0 {
            return Err(ForecastError::Configuration(
                "regularization must be >= 0".into(),
            ));
        }
        if let TrendThreshold::Fixed(t) = self.trend.threshold {
            if !(t.is_finite() && t >= 0.0) {
                return Err(ForecastError::Configuration(
                    "trend threshold must be >= 0".into(),
                ));
            }
        }
        let regs = self
            .covariates
            .values()
            .map(|c| c.reg)
            .chain(self.regressors.values().map(|r| r.reg))
            .chain(self.all_events().into_iter().map(|(_, e)| e.reg))
            .chain(std::iter::once(self.ar.reg));
        for reg in regs {
            checked_reg(reg)?;
        }
        Ok(())
    }
}

/// Negative strengths are rejected; zero means "no regularization".
fn checked_reg(reg: Option<f64>) -> Result<Option<f64>> {
    match reg {
        Some(r) if !(r.is_finite() && r >= 0.0) => Err(ForecastError::Configuration(format!(
            "regularization must be >= 0, got {r}"
        ))),
        Some(r) if r == 0.0 => Ok(None),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn window_without_lags_allows_single_step_only() {
        assert!(WindowSpec::new(0, 1).is_ok());
        assert!(matches!(
            WindowSpec::new(0, 3),
            Err(ForecastError::Configuration(_))
        ));
        assert!(WindowSpec::new(3, 0).is_err());
    }

    #[test]
    fn window_counts_origins() {
        let w = WindowSpec::new(3, 2).unwrap();
        assert_eq!(w.origins(10), 6);
        assert_eq!(w.origins(4), 0);
        assert_eq!(WindowSpec::default().origins(5), 5);
    }

    #[test]
    fn imputation_bound_is_two_linear_passes_plus_rolling() {
        let p = ImputationPolicy {
            enabled: true,
            limit_linear: 5,
            rolling: 5,
        };
        assert_eq!(p.bound(), 15);
        assert_eq!(ImputationPolicy::default().bound(), 30);
    }

    #[test]
    fn covariates_require_lags() {
        let err = ForecasterConfig::default()
            .add_lagged_regressor(&["x"], CovariateConfig::default())
            .unwrap_err();
        assert!(matches!(err, ForecastError::Configuration(_)));

        let ok = ForecasterConfig::default()
            .with_window(2, 1)
            .unwrap()
            .add_lagged_regressor(&["x"], CovariateConfig::default())
            .unwrap();
        assert!(ok.covariates.contains_key("x"));
        assert!(ok.with_window(0, 1).is_err());
    }

    #[test]
    fn reserved_and_duplicate_names_are_rejected() {
        let config = ForecasterConfig::default();
        assert!(config.validate_name("trend").is_err());
        assert!(config.validate_name("yhat_upper").is_err());
        assert!(config.validate_name("y_scaled").is_err());

        let config = config
            .add_events(&["launch"], EventConfig::default())
            .unwrap();
        assert!(config
            .clone()
            .add_future_regressor("launch", RegressorConfig::default())
            .is_err());
        assert!(config
            .add_country_holidays("US", &["launch"], EventConfig::default())
            .is_err());
    }

    #[test]
    fn negative_regularization_is_rejected_and_zero_disables() {
        let config = ForecasterConfig::default();
        assert!(config
            .clone()
            .add_future_regressor(
                "temp",
                RegressorConfig {
                    reg: Some(-1.0),
                    ..Default::default()
                }
            )
            .is_err());

        let config = config
            .add_future_regressor(
                "temp",
                RegressorConfig {
                    reg: Some(0.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(config.regressors["temp"].reg, None);
    }

    #[test]
    fn auto_trend_threshold_shrinks_with_changepoints() {
        let trend = TrendConfig {
            n_changepoints: 9,
            trend_reg: 1.0,
            threshold: TrendThreshold::Auto,
        };
        assert_relative_eq!(trend.threshold(), 3.0 / (3.0 + 2.0 * 3.0));
        assert_eq!(TrendConfig::default().threshold(), 0.0);
    }

    #[test]
    fn holidays_join_events_for_lookup() {
        let config = ForecasterConfig::default()
            .add_events(&["promo"], EventConfig::default())
            .unwrap()
            .add_country_holidays(
                "DE",
                &["christmas"],
                EventConfig {
                    mode: ComponentMode::Multiplicative,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(config.is_event("christmas"));
        assert_eq!(
            config.event_config("christmas").unwrap().mode,
            ComponentMode::Multiplicative
        );
        assert_eq!(config.data_columns(), vec!["promo", "christmas"]);
    }

    #[test]
    fn train_config_validates_ranges() {
        assert!(TrainConfig::default().validate().is_ok());
        assert!(TrainConfig::default()
            .with_newer_samples(0.5, 0.0)
            .validate()
            .is_err());
        assert!(TrainConfig::default()
            .with_newer_samples(f64::NAN, 0.0)
            .validate()
            .is_err());
        assert!(TrainConfig::default()
            .with_newer_samples(2.0, 1.0)
            .validate()
            .is_err());
        assert!(TrainConfig::default()
            .with_reg_delay(0.9, 0.5)
            .validate()
            .is_err());
    }
}
