//! Demands and sources that follow a fixed profile read from a CSV file.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::AccountingConfig;
use crate::error::{ConfigError, NetworkError};
use crate::io::timeseries::{ColumnSelector, read_column, separator_byte};
use crate::network::{Entity, Flow, FlowNetwork};
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase, require_at_least};

/// A loaded profile and its scale factor.
#[derive(Debug, Clone)]
struct Profile {
    nominal_value: f64,
    data: Vec<f64>,
}

impl Profile {
    fn load(
        name: &str,
        nominal_value: f64,
        csv_filename: Option<&str>,
        path: &str,
        csv_separator: &str,
        column_title: &ColumnSelector,
        n_intervals: usize,
    ) -> Result<Self, ConfigError> {
        require_at_least(|| format!("{name}.nominal_value"), nominal_value, 0.0)?;
        let filename = csv_filename
            .ok_or_else(|| ConfigError::new(format!("{name}.csv_filename"), "is required"))?;
        let separator = separator_byte(&format!("{name}.csv_separator"), csv_separator)?;
        let file: PathBuf = [path, filename].iter().collect();
        let data = read_column(
            &format!("{name}.csv_filename"),
            &file,
            separator,
            column_title,
        )?;
        if data.len() < n_intervals {
            return Err(ConfigError::new(
                format!("{name}.csv_filename"),
                format!(
                    "{} holds {} values, {n_intervals} intervals are simulated",
                    file.display(),
                    data.len()
                ),
            ));
        }
        Ok(Self {
            nominal_value,
            data,
        })
    }

    /// Fixed flow of `interval`: the profile value, scaled by the nominal value.
    fn flow(&self, interval: usize) -> Flow {
        let fix = self.data.get(interval).copied().unwrap_or(0.0);
        Flow::new().fixed(fix).nominal(self.nominal_value)
    }
}

/// Demand profile parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnergyDemandFromCsvConfig {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_in: String,
    /// Factor the profile is multiplied by.
    pub nominal_value: f64,
    pub csv_filename: Option<String>,
    pub csv_separator: String,
    pub column_title: ColumnSelector,
    /// Directory of the CSV file.
    pub path: String,
}

impl Default for EnergyDemandFromCsvConfig {
    fn default() -> Self {
        Self {
            name: "demand".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_in: String::new(),
            nominal_value: 1.0,
            csv_filename: None,
            csv_separator: ",".to_string(),
            column_title: ColumnSelector::default(),
            path: ".".to_string(),
        }
    }
}

/// Energy demand that must be met in every interval.
#[derive(Debug, Clone)]
pub struct EnergyDemandFromCsv {
    base: ComponentBase,
    bus_in: String,
    profile: Profile,
}

impl EnergyDemandFromCsv {
    /// Reads the demand profile.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or holds fewer
    /// values than simulated intervals.
    pub fn new(
        config: EnergyDemandFromCsvConfig,
        sim_params: Arc<SimulationParameters>,
    ) -> Result<Self, ConfigError> {
        let profile = Profile::load(
            &config.name,
            config.nominal_value,
            config.csv_filename.as_deref(),
            &config.path,
            &config.csv_separator,
            &config.column_title,
            sim_params.n_intervals,
        )?;
        let base = ComponentBase::new(
            &config.name,
            config.life_time,
            config.accounting,
            Vec::new(),
            sim_params,
        )?;
        Ok(Self {
            base,
            bus_in: config.bus_in,
            profile,
        })
    }

    pub fn data(&self) -> &[f64] {
        &self.profile.data
    }
}

impl Component for EnergyDemandFromCsv {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "energy_demand_from_csv"
    }

    fn add_to_model(&self, network: &mut FlowNetwork, interval: usize) -> Result<(), NetworkError> {
        network.add(
            Entity::sink(self.base.name.clone())
                .input(self.bus_in.clone(), self.profile.flow(interval)),
        )
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "nominal_value" => Some(self.profile.nominal_value),
            _ => self.base.attribute(name),
        }
    }
}

/// Source profile parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnergySourceFromCsvConfig {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_out: String,
    pub nominal_value: f64,
    pub csv_filename: Option<String>,
    pub csv_separator: String,
    pub column_title: ColumnSelector,
    pub path: String,
}

impl Default for EnergySourceFromCsvConfig {
    fn default() -> Self {
        Self {
            name: "source".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_out: String::new(),
            nominal_value: 1.0,
            csv_filename: None,
            csv_separator: ",".to_string(),
            column_title: ColumnSelector::default(),
            path: ".".to_string(),
        }
    }
}

/// Generation that follows a fixed profile, e.g. PV or wind.
#[derive(Debug, Clone)]
pub struct EnergySourceFromCsv {
    base: ComponentBase,
    bus_out: String,
    profile: Profile,
}

impl EnergySourceFromCsv {
    /// Reads the generation profile.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or holds fewer
    /// values than simulated intervals.
    pub fn new(
        config: EnergySourceFromCsvConfig,
        sim_params: Arc<SimulationParameters>,
    ) -> Result<Self, ConfigError> {
        let profile = Profile::load(
            &config.name,
            config.nominal_value,
            config.csv_filename.as_deref(),
            &config.path,
            &config.csv_separator,
            &config.column_title,
            sim_params.n_intervals,
        )?;
        let base = ComponentBase::new(
            &config.name,
            config.life_time,
            config.accounting,
            Vec::new(),
            sim_params,
        )?;
        Ok(Self {
            base,
            bus_out: config.bus_out,
            profile,
        })
    }

    pub fn data(&self) -> &[f64] {
        &self.profile.data
    }
}

impl Component for EnergySourceFromCsv {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "energy_source_from_csv"
    }

    fn add_to_model(&self, network: &mut FlowNetwork, interval: usize) -> Result<(), NetworkError> {
        network.add(
            Entity::source(self.base.name.clone())
                .output(self.bus_out.clone(), self.profile.flow(interval)),
        )
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "nominal_value" => Some(self.profile.nominal_value),
            _ => self.base.attribute(name),
        }
    }
}
