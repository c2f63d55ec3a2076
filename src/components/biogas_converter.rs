use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::AccountingConfig;
use crate::error::{ConfigError, NetworkError};
use crate::network::{Entity, Flow, FlowNetwork};
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase};

/// Molar mass of methane in kg/mol.
const MOLAR_MASS_CH4: f64 = 0.01604;
/// Molar mass of carbon dioxide in kg/mol.
const MOLAR_MASS_CO2: f64 = 0.04401;
/// Heating value of methane in kWh/kg.
const HEATING_VALUE_CH4: f64 = 13.9;

const SHARE_TOLERANCE: f64 = 1e-9;

/// Biogas converter parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BiogasConverterConfig {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    /// Biogas bus in m3.
    pub bg_in: String,
    /// Biogas bus in kg.
    pub bg_out: String,
    /// Molar fraction of methane.
    pub ch4_share: f64,
    /// Molar fraction of carbon dioxide.
    pub co2_share: f64,
    /// Energy content of one m3 of biogas in kWh.
    pub kwh_1m3_bg: f64,
}

impl Default for BiogasConverterConfig {
    fn default() -> Self {
        Self {
            name: "biogas_converter".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bg_in: String::new(),
            bg_out: String::new(),
            ch4_share: 0.757,
            co2_share: 0.243,
            kwh_1m3_bg: 6.25,
        }
    }
}

/// Heating value of biogas in kWh/kg from its methane and CO2 shares.
pub fn heating_value_biogas(ch4_share: f64, co2_share: f64) -> f64 {
    let ch4 = ch4_share * MOLAR_MASS_CH4;
    ch4 / (ch4 + co2_share * MOLAR_MASS_CO2) * HEATING_VALUE_CH4
}

/// Converts a biogas volume flow into a mass flow.
#[derive(Debug, Clone)]
pub struct BiogasConverter {
    base: ComponentBase,
    bg_in: String,
    bg_out: String,
    heating_value_bg: f64,
    /// kg biogas per m3.
    conv: f64,
}

impl BiogasConverter {
    /// # Errors
    ///
    /// Returns a `ConfigError` if the shares do not add up to 1.
    pub fn new(
        config: BiogasConverterConfig,
        sim_params: Arc<SimulationParameters>,
    ) -> Result<Self, ConfigError> {
        let name = &config.name;
        if !(config.ch4_share >= 0.0 && config.co2_share >= 0.0)
            || (config.ch4_share + config.co2_share - 1.0).abs() > SHARE_TOLERANCE
        {
            return Err(ConfigError::new(
                format!("{name}.ch4_share"),
                format!(
                    "ch4_share + co2_share must be 1, got {} + {}",
                    config.ch4_share, config.co2_share
                ),
            ));
        }
        let heating_value_bg = heating_value_biogas(config.ch4_share, config.co2_share);
        let conv = config.kwh_1m3_bg / heating_value_bg;
        let base = ComponentBase::new(
            name,
            config.life_time,
            config.accounting,
            Vec::new(),
            sim_params,
        )?;
        Ok(Self {
            base,
            bg_in: config.bg_in,
            bg_out: config.bg_out,
            heating_value_bg,
            conv,
        })
    }

    pub fn heating_value_bg(&self) -> f64 {
        self.heating_value_bg
    }
}

impl Component for BiogasConverter {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "biogas_converter"
    }

    fn add_to_model(&self, network: &mut FlowNetwork, _interval: usize) -> Result<(), NetworkError> {
        network.add(
            Entity::transformer(self.base.name.clone())
                .input(self.bg_in.clone(), Flow::new())
                .output(self.bg_out.clone(), Flow::new())
                .conversion(self.bg_out.clone(), self.conv),
        )
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "heating_value_bg" => Some(self.heating_value_bg),
            "conv" => Some(self.conv),
            _ => self.base.attribute(name),
        }
    }
}
