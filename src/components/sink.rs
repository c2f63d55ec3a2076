use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::AccountingConfig;
use crate::error::{ConfigError, NetworkError};
use crate::network::{Entity, Flow, FlowNetwork};
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase, require_at_least};

/// Sink parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_in: String,
    /// Maximum intake per interval.
    pub input_max: f64,
    /// Revenue (negative) or cost per unit taken.
    pub commodity_costs: f64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            name: "sink".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_in: String::new(),
            input_max: 8e6,
            commodity_costs: 0.0,
        }
    }
}

/// Unbounded-demand sink, e.g. excess electricity or heat dump.
#[derive(Debug, Clone)]
pub struct Sink {
    base: ComponentBase,
    bus_in: String,
    input_max: f64,
    commodity_costs: f64,
}

impl Sink {
    /// # Errors
    ///
    /// Returns a `ConfigError` if `input_max` is negative.
    pub fn new(config: SinkConfig, sim_params: Arc<SimulationParameters>) -> Result<Self, ConfigError> {
        let name = config.name.clone();
        require_at_least(|| format!("{name}.input_max"), config.input_max, 0.0)?;
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
            input_max: config.input_max,
            commodity_costs: config.commodity_costs,
        })
    }
}

impl Component for Sink {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "sink"
    }

    fn add_to_model(&self, network: &mut FlowNetwork, _interval: usize) -> Result<(), NetworkError> {
        network.add(
            Entity::sink(self.base.name.clone()).input(
                self.bus_in.clone(),
                Flow::new()
                    .nominal(self.input_max)
                    .costs(self.commodity_costs),
            ),
        )
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "input_max" => Some(self.input_max),
            _ => self.base.attribute(name),
        }
    }
}
