use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::AccountingConfig;
use crate::error::{ConfigError, NetworkError, SimError, SimResult};
use crate::network::{Entity, Flow, FlowNetwork};
use crate::sim::foreign::{ForeignStateRef, ForeignValues};
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase, require_at_least};

/// Steam methane reformer with pressure swing adsorption parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BiogasSmrPsaConfig {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_bg: String,
    pub bus_el: String,
    pub bus_h2: String,
    /// Maximum biogas input per interval in kg.
    pub input_max: f64,
    /// Fuel energy per kg of hydrogen in kWh.
    pub fuel_kwh_1kg_h2: f64,
    pub psa_eff: f64,
    /// Electricity per kg of hydrogen in kWh.
    pub energy_cnsmp_1kg_h2: f64,
    /// Heating value of the biogas in kWh/kg.
    pub foreign_states: Vec<ForeignStateRef>,
}

impl Default for BiogasSmrPsaConfig {
    fn default() -> Self {
        Self {
            name: "biogas_smr_psa".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_bg: String::new(),
            bus_el: String::new(),
            bus_h2: String::new(),
            input_max: 500.0,
            fuel_kwh_1kg_h2: 45.977,
            psa_eff: 0.9,
            energy_cnsmp_1kg_h2: 5.557,
            foreign_states: Vec::new(),
        }
    }
}

/// Reforms biogas to hydrogen, consuming electricity.
///
/// The hydrogen yield per kg of biogas depends on the biogas heating value,
/// read as a foreign state each interval.
#[derive(Debug, Clone)]
pub struct BiogasSmrPsa {
    base: ComponentBase,
    bus_bg: String,
    bus_el: String,
    bus_h2: String,
    input_max: f64,
    fuel_kwh_1kg_h2: f64,
    psa_eff: f64,
    energy_cnsmp_1kg_h2: f64,
    /// kg hydrogen per kg biogas.
    smr_psa_eff: f64,
    /// Wh electricity per kg biogas.
    energy_cnsmp_1kg_bg: f64,
}

impl BiogasSmrPsa {
    /// # Errors
    ///
    /// Returns a `ConfigError` if a value is out of range.
    pub fn new(config: BiogasSmrPsaConfig, sim_params: Arc<SimulationParameters>) -> Result<Self, ConfigError> {
        let name = config.name.clone();
        require_at_least(|| format!("{name}.input_max"), config.input_max, 0.0)?;
        require_at_least(
            || format!("{name}.fuel_kwh_1kg_h2"),
            config.fuel_kwh_1kg_h2,
            f64::MIN_POSITIVE,
        )?;
        require_at_least(|| format!("{name}.psa_eff"), config.psa_eff, 0.0)?;
        let base = ComponentBase::new(
            &config.name,
            config.life_time,
            config.accounting,
            config.foreign_states,
            sim_params,
        )?;
        Ok(Self {
            base,
            bus_bg: config.bus_bg,
            bus_el: config.bus_el,
            bus_h2: config.bus_h2,
            input_max: config.input_max,
            fuel_kwh_1kg_h2: config.fuel_kwh_1kg_h2,
            psa_eff: config.psa_eff,
            energy_cnsmp_1kg_h2: config.energy_cnsmp_1kg_h2,
            smr_psa_eff: 0.0,
            energy_cnsmp_1kg_bg: 0.0,
        })
    }

    pub fn smr_psa_eff(&self) -> f64 {
        self.smr_psa_eff
    }

    pub fn energy_cnsmp_1kg_bg(&self) -> f64 {
        self.energy_cnsmp_1kg_bg
    }
}

impl Component for BiogasSmrPsa {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "biogas_smr_psa"
    }

    fn required_foreign_states(&self) -> usize {
        1
    }

    fn prepare_simulation(&mut self, foreign: &ForeignValues, _interval: usize) -> SimResult<()> {
        let heating_value_bg = foreign.get(0)?;
        if !(heating_value_bg > 0.0) {
            return Err(SimError::ForeignState {
                component: self.base.name.clone(),
                index: 0,
                reason: format!("biogas heating value must be > 0, got {heating_value_bg}"),
            });
        }
        // kg biogas per kg hydrogen
        let bg_1kg_h2 = self.fuel_kwh_1kg_h2 / heating_value_bg;
        self.smr_psa_eff = self.psa_eff / bg_1kg_h2;
        self.energy_cnsmp_1kg_bg = self.energy_cnsmp_1kg_h2 / bg_1kg_h2 * 1000.0;
        Ok(())
    }

    fn add_to_model(&self, network: &mut FlowNetwork, _interval: usize) -> Result<(), NetworkError> {
        network.add(
            Entity::transformer(self.base.name.clone())
                .input(self.bus_bg.clone(), Flow::new().nominal(self.input_max))
                .input(self.bus_el.clone(), Flow::new())
                .output(self.bus_h2.clone(), Flow::new())
                .conversion(self.bus_h2.clone(), self.smr_psa_eff)
                .conversion(self.bus_el.clone(), self.energy_cnsmp_1kg_bg),
        )
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "input_max" => Some(self.input_max),
            "smr_psa_eff" => Some(self.smr_psa_eff),
            "energy_cnsmp_1kg_bg" => Some(self.energy_cnsmp_1kg_bg),
            _ => self.base.attribute(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::test_support::params;
    use crate::network::EntityKind;

    fn reformer() -> BiogasSmrPsa {
        BiogasSmrPsa::new(
            BiogasSmrPsaConfig {
                bus_bg: "bg".into(),
                bus_el: "bel".into(),
                bus_h2: "bh2".into(),
                foreign_states: vec![ForeignStateRef::attribute("converter", "heating_value_bg")],
                ..BiogasSmrPsaConfig::default()
            },
            params(1, 60),
        )
        .unwrap()
    }

    #[test]
    fn yields_follow_heating_value() {
        let mut r = reformer();
        r.prepare_simulation(&ForeignValues::new("biogas_smr_psa", vec![5.0]), 0)
            .unwrap();
        let bg_1kg_h2 = 45.977 / 5.0;
        assert!((r.smr_psa_eff() - 0.9 / bg_1kg_h2).abs() < 1e-12);
        assert!((r.energy_cnsmp_1kg_bg() - 5.557 / bg_1kg_h2 * 1000.0).abs() < 1e-9);
    }

    #[test]
    fn zero_heating_value_rejected() {
        let mut r = reformer();
        let err = r
            .prepare_simulation(&ForeignValues::new("biogas_smr_psa", vec![0.0]), 0)
            .unwrap_err();
        assert!(matches!(err, SimError::ForeignState { index: 0, .. }));
    }

    #[test]
    fn transformer_factors() {
        let mut r = reformer();
        r.prepare_simulation(&ForeignValues::new("biogas_smr_psa", vec![5.0]), 0)
            .unwrap();
        let mut net = FlowNetwork::new(["bg", "bel", "bh2"]);
        r.add_to_model(&mut net, 0).unwrap();
        let e = net.entity("biogas_smr_psa").unwrap();
        assert_eq!(e.inputs["bg"].nominal_value, Some(500.0));
        match &e.kind {
            EntityKind::Transformer { conversion_factors } => {
                assert_eq!(conversion_factors["bh2"], r.smr_psa_eff());
                assert_eq!(conversion_factors["bel"], r.energy_cnsmp_1kg_bg());
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
