use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::{AccountingConfig, CostTier, FlowRef};
use crate::error::{ConfigError, NetworkError, SimResult};
use crate::network::{Entity, Flow, FlowNetwork};
use crate::sim::foreign::{ForeignStateRef, ForeignValues};
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase, require_at_least};

/// Supply parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupplyConfig {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_out: String,
    /// Maximum output per interval.
    pub output_max: f64,
    /// Monitored value for the artificial cost tier; at most one.
    pub foreign_states: Vec<ForeignStateRef>,
    pub fs_threshold: Option<f64>,
    pub fs_low_art_cost: f64,
    pub fs_high_art_cost: f64,
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            name: "supply".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_out: String::new(),
            output_max: 8e6,
            foreign_states: Vec::new(),
            fs_threshold: None,
            fs_low_art_cost: 0.0,
            fs_high_art_cost: 0.0,
        }
    }
}

/// Builds the artificial cost tier driven by a monitored foreign state.
///
/// # Errors
///
/// Returns a `ConfigError` if a threshold is set without exactly one
/// foreign state, or a foreign state is given without a threshold.
pub(crate) fn foreign_threshold_tier(
    name: &str,
    foreign_states: &[ForeignStateRef],
    threshold: Option<f64>,
    low: f64,
    high: f64,
) -> Result<Option<CostTier<f64>>, ConfigError> {
    match (threshold, foreign_states.len()) {
        (None, 0) => Ok(None),
        (Some(t), 1) => Ok(Some(CostTier::new(Some(t), high, low))),
        (Some(_), n) => Err(ConfigError::new(
            format!("{name}.foreign_states"),
            format!("fs_threshold needs exactly one foreign state, got {n}"),
        )),
        (None, _) => Err(ConfigError::new(
            format!("{name}.fs_threshold"),
            "is required when a foreign state is given",
        )),
    }
}

/// Default cost dependency of a source: its own output flow.
pub(crate) fn with_output_dependency(
    mut accounting: AccountingConfig,
    name: &str,
    bus_out: &str,
) -> AccountingConfig {
    if accounting.dependency_flow_costs.is_none() {
        accounting.dependency_flow_costs = Some(FlowRef(name.to_string(), bus_out.to_string()));
    }
    accounting
}

/// Commodity source, e.g. a grid connection or a hydrogen delivery.
///
/// With a foreign threshold the artificial costs switch between a low and
/// a high value depending on a monitored state of another component.
#[derive(Debug, Clone)]
pub struct Supply {
    base: ComponentBase,
    bus_out: String,
    output_max: f64,
    tier: Option<CostTier<f64>>,
    current_ac: f64,
}

impl Supply {
    /// # Errors
    ///
    /// Returns a `ConfigError` on an invalid bound or threshold setup.
    pub fn new(config: SupplyConfig, sim_params: Arc<SimulationParameters>) -> Result<Self, ConfigError> {
        let name = config.name.clone();
        require_at_least(|| format!("{name}.output_max"), config.output_max, 0.0)?;
        let tier = foreign_threshold_tier(
            &name,
            &config.foreign_states,
            config.fs_threshold,
            config.fs_low_art_cost,
            config.fs_high_art_cost,
        )?;
        let accounting = with_output_dependency(config.accounting, &name, &config.bus_out);
        let base = ComponentBase::new(
            &name,
            config.life_time,
            accounting,
            config.foreign_states,
            sim_params,
        )?;
        let current_ac = base.costs_and_art_costs(0);
        Ok(Self {
            base,
            bus_out: config.bus_out,
            output_max: config.output_max,
            tier,
            current_ac,
        })
    }

    /// Cost put on the output flow in the current interval.
    pub fn current_ac(&self) -> f64 {
        self.current_ac
    }
}

impl Component for Supply {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "supply"
    }

    fn required_foreign_states(&self) -> usize {
        usize::from(self.tier.is_some())
    }

    fn prepare_simulation(&mut self, foreign: &ForeignValues, interval: usize) -> SimResult<()> {
        if let Some(tier) = self.tier {
            let monitored = foreign.get(0)?;
            self.base.set_artificial_rate(tier.select(monitored));
        }
        self.current_ac = self.base.costs_and_art_costs(interval);
        Ok(())
    }

    fn add_to_model(&self, network: &mut FlowNetwork, _interval: usize) -> Result<(), NetworkError> {
        network.add(
            Entity::source(self.base.name.clone()).output(
                self.bus_out.clone(),
                Flow::new().nominal(self.output_max).costs(self.current_ac),
            ),
        )
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "output_max" => Some(self.output_max),
            "current_ac" => Some(self.current_ac),
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
    fn defaults() {
        let s = Supply::new(SupplyConfig::default(), params(1, 60)).unwrap();
        assert_eq!(s.name(), "supply");
        assert_eq!(s.attribute("output_max"), Some(8e6));
        assert_eq!(s.required_foreign_states(), 0);
    }

    #[test]
    fn threshold_selects_high_cost_at_or_above() {
        let mut s = Supply::new(
            SupplyConfig {
                foreign_states: vec![ForeignStateRef::attribute("foo", "life_time")],
                fs_threshold: Some(5.0),
                fs_low_art_cost: 3.0,
                fs_high_art_cost: 4.0,
                ..SupplyConfig::default()
            },
            params(1, 60),
        )
        .unwrap();
        assert_eq!(s.required_foreign_states(), 1);

        s.prepare_simulation(&ForeignValues::new("supply", vec![10.0]), 0)
            .unwrap();
        assert_eq!(s.base().artificial_rate(0), 4.0);
        assert_eq!(s.current_ac(), 4.0);

        s.prepare_simulation(&ForeignValues::new("supply", vec![4.9]), 0)
            .unwrap();
        assert_eq!(s.current_ac(), 3.0);
    }

    #[test]
    fn threshold_without_state_rejected() {
        let err = Supply::new(
            SupplyConfig {
                fs_threshold: Some(5.0),
                ..SupplyConfig::default()
            },
            params(1, 60),
        )
        .unwrap_err();
        assert_eq!(err.field, "supply.foreign_states");
    }

    #[test]
    fn single_output_source() {
        let s = Supply::new(
            SupplyConfig {
                bus_out: "foo".into(),
                ..SupplyConfig::default()
            },
            params(1, 60),
        )
        .unwrap();
        let mut net = FlowNetwork::new(["foo"]);
        s.add_to_model(&mut net, 0).unwrap();
        let e = net.entity("supply").unwrap();
        assert_eq!(e.kind, EntityKind::Source);
        assert!(e.inputs.is_empty());
        assert_eq!(e.outputs.len(), 1);
    }
}
