use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::AccountingConfig;
use crate::error::{ConfigError, NetworkError};
use crate::network::{Entity, Flow, FlowNetwork};
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase, require_at_least};

/// Power converter parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PowerConverterConfig {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_input: String,
    pub bus_output: String,
    /// Maximum output power in W.
    pub output_power_max: f64,
    pub efficiency: f64,
}

impl Default for PowerConverterConfig {
    fn default() -> Self {
        Self {
            name: "power_converter".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_input: String::new(),
            bus_output: String::new(),
            output_power_max: 10000.0,
            efficiency: 0.95,
        }
    }
}

/// AC/DC or DC/AC converter with constant efficiency.
#[derive(Debug, Clone)]
pub struct PowerConverter {
    base: ComponentBase,
    bus_input: String,
    bus_output: String,
    output_power_max: f64,
    efficiency: f64,
}

impl PowerConverter {
    /// # Errors
    ///
    /// Returns a `ConfigError` if a value is out of range.
    pub fn new(
        config: PowerConverterConfig,
        sim_params: Arc<SimulationParameters>,
    ) -> Result<Self, ConfigError> {
        let name = config.name.clone();
        require_at_least(
            || format!("{name}.output_power_max"),
            config.output_power_max,
            0.0,
        )?;
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
            bus_input: config.bus_input,
            bus_output: config.bus_output,
            output_power_max: config.output_power_max,
            efficiency: config.efficiency,
        })
    }
}

impl Component for PowerConverter {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "power_converter"
    }

    fn add_to_model(&self, network: &mut FlowNetwork, _interval: usize) -> Result<(), NetworkError> {
        network.add(
            Entity::transformer(self.base.name.clone())
                .input(self.bus_input.clone(), Flow::new())
                .output(
                    self.bus_output.clone(),
                    Flow::new().nominal(self.output_power_max),
                )
                .conversion(self.bus_output.clone(), self.efficiency),
        )
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "output_power_max" => Some(self.output_power_max),
            "efficiency" => Some(self.efficiency),
            _ => self.base.attribute(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::test_support::params;
    use crate::network::EntityKind;

    #[test]
    fn output_is_bounded_and_converted() {
        let pc = PowerConverter::new(
            PowerConverterConfig {
                bus_input: "bus_dc".into(),
                bus_output: "bus_ac".into(),
                efficiency: 0.9,
                ..PowerConverterConfig::default()
            },
            params(1, 60),
        )
        .unwrap();
        let mut net = FlowNetwork::new(["bus_dc", "bus_ac"]);
        pc.add_to_model(&mut net, 0).unwrap();
        let e = net.entity("power_converter").unwrap();
        assert_eq!(e.outputs["bus_ac"].nominal_value, Some(10000.0));
        match &e.kind {
            EntityKind::Transformer { conversion_factors } => {
                assert_eq!(conversion_factors["bus_ac"], 0.9);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn negative_power_rejected() {
        let err = PowerConverter::new(
            PowerConverterConfig {
                output_power_max: -1.0,
                ..PowerConverterConfig::default()
            },
            params(1, 60),
        )
        .unwrap_err();
        assert_eq!(err.field, "power_converter.output_power_max");
    }
}
