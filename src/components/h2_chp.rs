use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::AccountingConfig;
use crate::error::{ConfigError, NetworkError};
use crate::network::{FlowNetwork, SplitBranch, SplitDevice};
use crate::piecewise::{BreakpointTable, PiecewiseCurve};
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase};

/// Lower heating value of hydrogen in kWh/kg.
pub const HEATING_VALUE_H2: f64 = 33.33;

const CONSTRAINT_PREFIX: &str = "chp_flow_ratio_fix";

/// Electric and thermal efficiency by size class, keyed by the upper bound
/// of `power_max` in W.
const EFFICIENCY_CLASSES: [(f64, f64, f64); 3] = [
    (115e3, 0.377, 0.423),
    (170e3, 0.39, 0.419),
    (240e3, 0.402, 0.419),
];
const EFFICIENCY_LARGEST: (f64, f64) = (0.405, 0.417);

/// Hydrogen CHP parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct H2ChpConfig {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_h2: String,
    pub bus_el: String,
    pub bus_th: String,
    /// Maximum electrical power in W; selects the efficiency class.
    pub power_max: Option<f64>,
}

impl Default for H2ChpConfig {
    fn default() -> Self {
        Self {
            name: "h2_chp".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_h2: String::new(),
            bus_el: String::new(),
            bus_th: String::new(),
            power_max: None,
        }
    }
}

/// Electric and thermal efficiency tables for a CHP of `power_max` W.
pub fn efficiency_tables(power_max: f64) -> (BreakpointTable, BreakpointTable) {
    let (el, th) = EFFICIENCY_CLASSES
        .iter()
        .find(|(upper, _, _)| power_max <= *upper)
        .map_or(EFFICIENCY_LARGEST, |(_, el, th)| (*el, *th));
    (BreakpointTable::constant(el), BreakpointTable::constant(th))
}

/// Hydrogen-fired combined heat and power unit.
///
/// Electricity and heat are both non-linear in the hydrogen input, so the
/// unit is added as a split device with an electric and a thermal branch
/// that each take half of the hydrogen.
#[derive(Debug, Clone)]
pub struct H2Chp {
    base: ComponentBase,
    bus_h2: String,
    bus_el: String,
    bus_th: String,
    power_max: f64,
    /// Hydrogen consumption at full load per interval in kg.
    h2_input_max: f64,
    electric: PiecewiseCurve,
    thermal: PiecewiseCurve,
}

impl H2Chp {
    /// Builds a CHP unit.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `power_max` is missing or not positive.
    pub fn new(config: H2ChpConfig, sim_params: Arc<SimulationParameters>) -> Result<Self, ConfigError> {
        let field = format!("{}.power_max", config.name);
        let power_max = config
            .power_max
            .ok_or_else(|| ConfigError::new(field.clone(), "is required"))?;
        if !(power_max > 0.0) {
            return Err(ConfigError::new(field, "must be > 0"));
        }

        let (el_table, th_table) = efficiency_tables(power_max);
        let h2_input_max = power_max / (HEATING_VALUE_H2 * el_table.full_load_efficiency())
            * sim_params.interval_hours()
            / 1000.0;
        // Output in Wh per interval.
        let electric = el_table.curve(h2_input_max, HEATING_VALUE_H2 * 1000.0);
        let thermal = th_table.curve(h2_input_max, HEATING_VALUE_H2 * 1000.0);

        let base = ComponentBase::new(
            &config.name,
            config.life_time,
            config.accounting,
            Vec::new(),
            sim_params,
        )?;
        Ok(Self {
            base,
            bus_h2: config.bus_h2,
            bus_el: config.bus_el,
            bus_th: config.bus_th,
            power_max,
            h2_input_max,
            electric,
            thermal,
        })
    }

    pub fn h2_input_max(&self) -> f64 {
        self.h2_input_max
    }

    pub fn electric_curve(&self) -> &PiecewiseCurve {
        &self.electric
    }

    pub fn thermal_curve(&self) -> &PiecewiseCurve {
        &self.thermal
    }

    /// The split device added to the network.
    pub fn split_device(&self) -> SplitDevice {
        SplitDevice::new(self.base.name.clone(), CONSTRAINT_PREFIX, self.bus_h2.clone())
            .branch(SplitBranch::new("electric", self.bus_el.clone(), self.electric.clone()))
            .branch(SplitBranch::new("thermal", self.bus_th.clone(), self.thermal.clone()))
    }
}

impl Component for H2Chp {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "h2_chp"
    }

    fn add_to_model(&self, network: &mut FlowNetwork, _interval: usize) -> Result<(), NetworkError> {
        network.add_split(self.split_device())
    }

    fn labels(&self) -> Vec<String> {
        self.split_device().labels()
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "power_max" => Some(self.power_max),
            "h2_input_max" => Some(self.h2_input_max),
            _ => self.base.attribute(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::test_support::params;

    fn chp(power_max: Option<f64>) -> Result<H2Chp, ConfigError> {
        H2Chp::new(
            H2ChpConfig {
                name: "h2 chp".into(),
                bus_h2: "bus_h2".into(),
                bus_el: "bus_el".into(),
                bus_th: "bus_th".into(),
                power_max,
                ..H2ChpConfig::default()
            },
            params(1, 60),
        )
    }

    #[test]
    fn power_max_required() {
        let err = chp(None).unwrap_err();
        assert_eq!(err.field, "h2 chp.power_max");
    }

    #[test]
    fn efficiency_class_by_size() {
        let eff = |p: f64| {
            let (el, th) = efficiency_tables(p);
            (el.full_load_efficiency(), th.full_load_efficiency())
        };
        assert_eq!(eff(115e3), (0.377, 0.423));
        assert_eq!(eff(150e3), (0.39, 0.419));
        assert_eq!(eff(240e3), (0.402, 0.419));
        assert_eq!(eff(240e3 + 1.0), (0.405, 0.417));
    }

    #[test]
    fn breakpoints_follow_heating_value() {
        let c = chp(Some(100e3)).unwrap();
        let expected_max = 100e3 / (33.33 * 0.377) / 1000.0;
        assert!((c.h2_input_max() - expected_max).abs() < 1e-12);
        assert_eq!(c.electric_curve().input, vec![0.0, c.h2_input_max()]);
        let full_el = c.electric_curve().output[1];
        assert!((full_el - c.h2_input_max() * 0.377 * 33.33 * 1000.0).abs() < 1e-6);
        // At full load the electric output is power_max for one hour.
        assert!((full_el - 100e3).abs() < 1e-6);
    }

    #[test]
    fn branches_take_half_and_are_coupled() {
        let c = chp(Some(200e3)).unwrap();
        let mut net = FlowNetwork::new(["bus_h2", "bus_el", "bus_th"]);
        c.add_to_model(&mut net, 0).unwrap();

        assert_eq!(c.labels(), vec!["h2 chp_electric", "h2 chp_thermal"]);
        let el = net.entity("h2 chp_electric").unwrap();
        match &el.kind {
            crate::network::EntityKind::PiecewiseTransformer {
                in_breakpoints,
                out_breakpoints,
            } => {
                let full: Vec<f64> = c.electric_curve().input.iter().map(|x| x / 2.0).collect();
                assert_eq!(in_breakpoints, &full);
                assert_eq!(out_breakpoints, &c.electric_curve().output);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(net.constraints().len(), 1);
        assert_eq!(net.constraints()[0].name, "chp_flow_ratio_fix_h2chp");
    }
}
