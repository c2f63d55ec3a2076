//! Process-wide simulation parameters.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

const START_DATE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const START_DAY_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Centralized simulation timing and economics.
///
/// Constructed once before any component and shared read-only through an
/// `Arc`. The interval currently being simulated is owned by the driver, not
/// by this struct.
///
/// # Examples
///
/// ```
/// use smooth_sim::sim::params::SimulationParameters;
///
/// let params = SimulationParameters::new(4, 30).unwrap();
/// assert_eq!(params.interval_hours(), 0.5);
/// assert_eq!(params.sim_time_span(), 120);
/// assert_eq!(params.date_time_index().len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationParameters {
    /// Start of the first interval.
    #[serde(deserialize_with = "deserialize_start_date")]
    pub start_date: NaiveDateTime,
    /// Number of simulated intervals (must be > 0).
    pub n_intervals: usize,
    /// Duration of one interval in minutes (must be > 0).
    pub interval_time: u32,
    /// Interest rate used for annuities (must be >= 0).
    pub interest_rate: f64,
    /// Log a progress line per interval.
    pub print_progress: bool,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2019, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            n_intervals: 10,
            interval_time: 60,
            interest_rate: 0.03,
            print_progress: false,
        }
    }
}

impl SimulationParameters {
    /// Creates validated parameters with the default start date and interest rate.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `n_intervals` or `interval_time` is zero.
    pub fn new(n_intervals: usize, interval_time: u32) -> Result<Self, ConfigError> {
        let params = Self {
            n_intervals,
            interval_time,
            ..Self::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks the parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_intervals == 0 {
            return Err(ConfigError::new("sim_params.n_intervals", "must be > 0"));
        }
        if self.interval_time == 0 {
            return Err(ConfigError::new("sim_params.interval_time", "must be > 0"));
        }
        if !(self.interest_rate >= 0.0) {
            return Err(ConfigError::new("sim_params.interest_rate", "must be >= 0"));
        }
        Ok(())
    }

    /// Duration of one interval in hours.
    pub fn interval_hours(&self) -> f64 {
        f64::from(self.interval_time) / 60.0
    }

    /// Simulated time span in minutes.
    pub fn sim_time_span(&self) -> u64 {
        self.n_intervals as u64 * u64::from(self.interval_time)
    }

    /// Start timestamp of interval `i`.
    pub fn interval_start(&self, i: usize) -> NaiveDateTime {
        self.start_date + Duration::minutes(i as i64 * i64::from(self.interval_time))
    }

    /// Start timestamps of all intervals.
    pub fn date_time_index(&self) -> Vec<NaiveDateTime> {
        (0..self.n_intervals).map(|i| self.interval_start(i)).collect()
    }
}

/// Parses a start date in one of the accepted formats.
///
/// # Errors
///
/// Returns a `ConfigError` naming the accepted formats.
pub fn parse_start_date(raw: &str) -> Result<NaiveDateTime, ConfigError> {
    let raw = raw.trim();
    for format in START_DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }
    for format in START_DAY_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(raw, format) {
            if let Some(dt) = day.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }
    Err(ConfigError::new(
        "sim_params.start_date",
        format!("cannot parse \"{raw}\", expected YYYY-MM-DD[ HH:MM[:SS]] or M/D/YYYY"),
    ))
}

fn deserialize_start_date<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_start_date(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = SimulationParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.n_intervals, 10);
        assert_eq!(params.interval_time, 60);
    }

    #[test]
    fn date_time_index_steps_by_interval_time() {
        let params = SimulationParameters {
            start_date: parse_start_date("1/1/2019").unwrap(),
            n_intervals: 4,
            interval_time: 8,
            ..SimulationParameters::default()
        };
        let index = params.date_time_index();
        assert_eq!(index.len(), 4);
        assert_eq!(index[1] - index[0], Duration::minutes(8));
        assert_eq!(params.sim_time_span(), 32);
    }

    #[test]
    fn start_date_formats() {
        assert!(parse_start_date("2019-01-01").is_ok());
        assert!(parse_start_date("2019-01-01 06:30").is_ok());
        assert!(parse_start_date("2019-01-01T06:30:00").is_ok());
        assert!(parse_start_date("foo").is_err());
    }

    #[test]
    fn toml_rejects_bad_values() {
        assert!(toml::from_str::<SimulationParameters>("start_date = \"foo\"").is_err());
        assert!(toml::from_str::<SimulationParameters>("n_intervals = \"bar\"").is_err());
        assert!(toml::from_str::<SimulationParameters>("interval_time = \"baz\"").is_err());
        assert!(toml::from_str::<SimulationParameters>("not_a_param = 1").is_err());
    }

    #[test]
    fn toml_reads_fields() {
        let params: SimulationParameters = toml::from_str(
            "start_date = \"1/1/2019\"\nn_intervals = 4\ninterval_time = 8\n",
        )
        .unwrap();
        assert_eq!(params.n_intervals, 4);
        assert_eq!(params.interval_time, 8);
        assert_eq!(params.interest_rate, 0.03);
    }

    #[test]
    fn zero_intervals_rejected() {
        let err = SimulationParameters::new(0, 60).unwrap_err();
        assert_eq!(err.field, "sim_params.n_intervals");
    }
}
