use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::AccountingConfig;
use crate::error::{ConfigError, NetworkError};
use crate::network::{Entity, Flow, FlowNetwork};
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase, require_at_least};

/// Gate parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_in: String,
    pub bus_out: String,
    /// Maximum input per interval; must be >= 0.
    pub max_input: f64,
    pub efficiency: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            name: "gate".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_in: String::new(),
            bus_out: String::new(),
            max_input: 1e9,
            efficiency: 1.0,
        }
    }
}

/// Connects two buses with a bounded, optionally lossy transfer.
#[derive(Debug, Clone)]
pub struct Gate {
    base: ComponentBase,
    bus_in: String,
    bus_out: String,
    max_input: f64,
    efficiency: f64,
}

impl Gate {
    /// # Errors
    ///
    /// Returns a `ConfigError` if `max_input` or `efficiency` is negative.
    pub fn new(config: GateConfig, sim_params: Arc<SimulationParameters>) -> Result<Self, ConfigError> {
        let name = config.name.clone();
        require_at_least(|| format!("{name}.max_input"), config.max_input, 0.0)?;
        require_at_least(|| format!("{name}.efficiency"), config.efficiency, 0.0)?;
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
            bus_out: config.bus_out,
            max_input: config.max_input,
            efficiency: config.efficiency,
        })
    }
}

impl Component for Gate {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "gate"
    }

    fn add_to_model(&self, network: &mut FlowNetwork, interval: usize) -> Result<(), NetworkError> {
        network.add(
            Entity::transformer(self.base.name.clone())
                .input(
                    self.bus_in.clone(),
                    Flow::new()
                        .nominal(self.max_input)
                        .costs(self.base.costs_and_art_costs(interval)),
                )
                .output(self.bus_out.clone(), Flow::new())
                .conversion(self.bus_out.clone(), self.efficiency),
        )
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "max_input" => Some(self.max_input),
            "efficiency" => Some(self.efficiency),
            _ => self.base.attribute(name),
        }
    }
}
