use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::AccountingConfig;
use crate::error::{ConfigError, NetworkError, SimError, SimResult};
use crate::hydrogen::{R_H2, compressibility};
use crate::network::solver::SolvedInterval;
use crate::network::{Entity, Flow, FlowNetwork};
use crate::sim::foreign::{ForeignStateRef, ForeignValues};
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase, require_at_least};

const N_INITIAL: f64 = 1.6;
const MAX_TEMPERATURE_RISE: f64 = 60.0;
const MIN_PRESSURE_LIFT: f64 = 0.01;

/// Hydrogen compressor parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressorH2Config {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_h2_in: String,
    pub bus_h2_out: String,
    pub bus_el: String,
    /// Maximum mass flow in kg/h.
    pub m_flow_max: f64,
    /// Inlet temperature in K.
    pub temp_in: f64,
    pub efficiency: f64,
    /// Inlet and outlet pressure in bar, in that order.
    pub foreign_states: Vec<ForeignStateRef>,
}

impl Default for CompressorH2Config {
    fn default() -> Self {
        Self {
            name: "compressor_h2".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_h2_in: String::new(),
            bus_h2_out: String::new(),
            bus_el: String::new(),
            m_flow_max: 33.6,
            temp_in: 293.15,
            efficiency: 0.88829,
            foreign_states: Vec::new(),
        }
    }
}

/// Specific electrical energy in Wh/kg to compress hydrogen polytropically.
///
/// Returns 0 when the outlet pressure does not exceed the inlet pressure by
/// at least 0.01 bar.
///
/// # Arguments
///
/// * `p_in` - Inlet pressure in bar
/// * `p_out` - Outlet pressure in bar
/// * `temp_in` - Inlet temperature in K
/// * `efficiency` - Compression efficiency
pub fn specific_compression_energy(p_in: f64, p_out: f64, temp_in: f64, efficiency: f64) -> f64 {
    if p_out - p_in < MIN_PRESSURE_LIFT {
        return 0.0;
    }
    let p_ratio = p_out / p_in;
    let temp_out = (temp_in * p_ratio.powf((N_INITIAL - 1.0) / N_INITIAL))
        .max(temp_in)
        .min(temp_in + MAX_TEMPERATURE_RISE);
    let temp_ratio = temp_out / temp_in;
    let n = 1.0 / (1.0 - temp_ratio.ln() / p_ratio.ln());
    let z_real = (compressibility(p_in, temp_in) + compressibility(p_out, temp_out)) / 2.0;
    // kJ/kg
    let work = (1.0 / efficiency)
        * R_H2
        * temp_in
        * (n / (n - 1.0))
        * (p_ratio.powf((n - 1.0) / n) - 1.0)
        * z_real
        / 1000.0;
    work / 3.6
}

/// Electrically driven hydrogen compressor.
///
/// Reads inlet and outlet pressure as foreign states every interval and
/// sets the electricity-per-kg conversion factor from them.
#[derive(Debug, Clone)]
pub struct CompressorH2 {
    base: ComponentBase,
    bus_h2_in: String,
    bus_h2_out: String,
    bus_el: String,
    m_flow_max: f64,
    temp_in: f64,
    efficiency: f64,
    spec_compression_energy: f64,
}

impl CompressorH2 {
    /// Builds a compressor.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a value is out of range.
    pub fn new(
        config: CompressorH2Config,
        sim_params: Arc<SimulationParameters>,
    ) -> Result<Self, ConfigError> {
        let name = config.name.clone();
        require_at_least(|| format!("{name}.m_flow_max"), config.m_flow_max, 0.0)?;
        require_at_least(|| format!("{name}.temp_in"), config.temp_in, f64::MIN_POSITIVE)?;
        if !(config.efficiency > 0.0 && config.efficiency <= 1.0) {
            return Err(ConfigError::new(
                format!("{name}.efficiency"),
                "must be in (0.0, 1.0]",
            ));
        }
        let base = ComponentBase::new(
            &config.name,
            config.life_time,
            config.accounting,
            config.foreign_states,
            sim_params,
        )?;
        Ok(Self {
            base,
            bus_h2_in: config.bus_h2_in,
            bus_h2_out: config.bus_h2_out,
            bus_el: config.bus_el,
            m_flow_max: config.m_flow_max,
            temp_in: config.temp_in,
            efficiency: config.efficiency,
            spec_compression_energy: 0.0,
        })
    }

    /// Electricity per kg of hydrogen in Wh/kg for the current interval.
    pub fn spec_compression_energy(&self) -> f64 {
        self.spec_compression_energy
    }

    /// Maximum hydrogen throughput per interval in kg.
    pub fn max_inflow(&self) -> f64 {
        self.m_flow_max * self.base.sim_params().interval_hours()
    }
}

impl Component for CompressorH2 {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "compressor_h2"
    }

    fn required_foreign_states(&self) -> usize {
        2
    }

    fn prepare_simulation(&mut self, foreign: &ForeignValues, _interval: usize) -> SimResult<()> {
        let p_in = foreign.get(0)?;
        let p_out = foreign.get(1)?;
        if !(p_in > 0.0) {
            return Err(SimError::ForeignState {
                component: self.base.name.clone(),
                index: 0,
                reason: format!("inlet pressure must be > 0, got {p_in}"),
            });
        }
        self.spec_compression_energy =
            specific_compression_energy(p_in, p_out, self.temp_in, self.efficiency);
        Ok(())
    }

    fn add_to_model(&self, network: &mut FlowNetwork, _interval: usize) -> Result<(), NetworkError> {
        network.add(
            Entity::transformer(self.base.name.clone())
                .input(self.bus_h2_in.clone(), Flow::new().nominal(self.max_inflow()))
                .input(self.bus_el.clone(), Flow::new())
                .output(self.bus_h2_out.clone(), Flow::new())
                .conversion(self.bus_h2_in.clone(), 1.0)
                .conversion(self.bus_el.clone(), self.spec_compression_energy)
                .conversion(self.bus_h2_out.clone(), 1.0),
        )
    }

    fn update_states(&mut self, _results: &SolvedInterval, interval: usize) -> SimResult<()> {
        self.base.states.record_named(
            "specific_compression_work",
            interval,
            self.spec_compression_energy,
        );
        Ok(())
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "m_flow_max" => Some(self.m_flow_max),
            "spec_compression_energy" => Some(self.spec_compression_energy),
            "efficiency" => Some(self.efficiency),
            _ => self.base.attribute(name),
        }
    }
}
