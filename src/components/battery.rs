use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::{AccountingConfig, CostFunction, CostTerm, CostTier, SpecFactor};
use crate::error::{ConfigError, NetworkError, SimError, SimResult};
use crate::network::solver::SolvedInterval;
use crate::network::{Entity, Flow, FlowNetwork, StorageParams};
use crate::sim::foreign::ForeignValues;
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase, require_at_least};

/// Preset battery sizes with their investment cost curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum BatteryType {
    /// 10 kWh.
    Small,
    /// 100 kWh.
    Medium,
    /// 1 MWh; cost per capacity depends on the charge rate.
    Large,
    /// Unit-capacity placeholder types 4 to 6.
    Unit(u8),
}

impl TryFrom<u8> for BatteryType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Small),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Large),
            4..=6 => Ok(Self::Unit(value)),
            _ => Err(format!("battery_type must be in 1..=6, got {value}")),
        }
    }
}

impl BatteryType {
    /// Capacity in Wh.
    pub fn capacity(self) -> f64 {
        match self {
            Self::Small => 10e3,
            Self::Medium => 100e3,
            Self::Large => 1e6,
            Self::Unit(_) => 1.0,
        }
    }

    pub fn capex(self) -> CostFunction {
        let poly = |fitting_value: Vec<f64>, dependant: &str| CostTerm::Poly {
            fitting_value,
            dependant_value: dependant.to_string(),
        };
        match self {
            Self::Small => CostFunction::Single(poly(
                vec![0.0, 2109.62368e-3, -147.52325e-6, 6.97016e-9, -0.13996e-12, 0.00102e-15],
                "battery_capacity",
            )),
            Self::Medium => CostFunction::Single(poly(
                vec![0.0, 1000.2 / 1e3, -0.4983 / 1e6],
                "battery_capacity",
            )),
            Self::Large => CostFunction::Chain(vec![
                poly(vec![0.353, 0.149], "c_rate_charge"),
                CostTerm::Spec {
                    fitting_value: SpecFactor::Named("cost".into()),
                    dependant_value: "battery_capacity".into(),
                },
            ]),
            Self::Unit(_) => CostFunction::Single(poly(vec![1.0, 1.0], "battery_capacity")),
        }
    }
}

/// Battery parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    pub name: String,
    /// Life time in years.
    pub life_time: f64,
    pub accounting: AccountingConfig,
    /// Bus the battery charges from and discharges to.
    pub bus_in_and_out: String,
    /// Storage capacity in Wh.
    pub battery_capacity: f64,
    pub battery_type: Option<BatteryType>,
    /// Initial state of charge (0.0-1.0).
    pub soc_init: f64,
    pub efficiency_charge: f64,
    pub efficiency_discharge: f64,
    /// Self-discharge in fraction of content per day.
    pub loss_rate: f64,
    /// Overrides both charge and discharge C-rates when set.
    pub c_rate_symm: Option<f64>,
    pub c_rate_charge: f64,
    pub c_rate_discharge: f64,
    /// Minimum state of charge (0.0-1.0).
    pub soc_min: f64,
    /// Artificial costs on charging / discharging at or above `soc_wanted`.
    pub vac_in: Option<f64>,
    pub vac_out: Option<f64>,
    pub soc_wanted: Option<f64>,
    /// Artificial costs on charging / discharging below `soc_wanted`.
    pub vac_low_in: f64,
    pub vac_low_out: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            name: "battery".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_in_and_out: String::new(),
            battery_capacity: 5000.0,
            battery_type: None,
            soc_init: 0.5,
            efficiency_charge: 0.95,
            efficiency_discharge: 0.95,
            loss_rate: 0.0,
            c_rate_symm: None,
            c_rate_charge: 1.0,
            c_rate_discharge: 1.0,
            soc_min: 0.1,
            vac_in: None,
            vac_out: None,
            soc_wanted: None,
            vac_low_in: 0.0,
            vac_low_out: 0.0,
        }
    }
}

/// Electrical storage tracked by its state of charge.
#[derive(Debug, Clone)]
pub struct Battery {
    base: ComponentBase,
    bus: String,
    capacity: f64,
    efficiency_charge: f64,
    efficiency_discharge: f64,
    /// Fraction of content lost per hour.
    loss_rate_hourly: f64,
    c_rate_charge: f64,
    c_rate_discharge: f64,
    soc_min: f64,
    p_in_max: f64,
    p_out_max: f64,
    tier: CostTier<(f64, f64)>,
    current_vac: (f64, f64),
    soc: f64,
}

impl Battery {
    /// Builds a battery.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a value is out of range or `soc_init`
    /// is below `soc_min`.
    pub fn new(
        mut config: BatteryConfig,
        sim_params: Arc<SimulationParameters>,
    ) -> Result<Self, ConfigError> {
        let name = config.name.clone();
        let field = |key: &str| format!("{name}.{key}");

        if let Some(battery_type) = config.battery_type {
            config.battery_capacity = battery_type.capacity();
            if config.accounting.capex.is_none() {
                config.accounting.capex = Some(battery_type.capex());
            }
        }
        if let Some(c_rate) = config.c_rate_symm {
            config.c_rate_charge = c_rate;
            config.c_rate_discharge = c_rate;
        }

        if !(config.battery_capacity > 0.0) {
            return Err(ConfigError::new(field("battery_capacity"), "must be > 0"));
        }
        for (key, value) in [
            ("soc_init", config.soc_init),
            ("soc_min", config.soc_min),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::new(field(key), "must be in [0.0, 1.0]"));
            }
        }
        if config.soc_init < config.soc_min {
            return Err(ConfigError::new(
                field("soc_init"),
                format!(
                    "initial state of charge {} is below soc_min {}",
                    config.soc_init, config.soc_min
                ),
            ));
        }
        for (key, value) in [
            ("efficiency_charge", config.efficiency_charge),
            ("efficiency_discharge", config.efficiency_discharge),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::new(field(key), "must be in (0.0, 1.0]"));
            }
        }
        require_at_least(|| field("loss_rate"), config.loss_rate, 0.0)?;
        require_at_least(|| field("c_rate_charge"), config.c_rate_charge, 0.0)?;
        require_at_least(|| field("c_rate_discharge"), config.c_rate_discharge, 0.0)?;

        let base = ComponentBase::new(
            &config.name,
            config.life_time,
            config.accounting,
            Vec::new(),
            sim_params,
        )?;
        Ok(Self {
            base,
            bus: config.bus_in_and_out,
            capacity: config.battery_capacity,
            efficiency_charge: config.efficiency_charge,
            efficiency_discharge: config.efficiency_discharge,
            loss_rate_hourly: config.loss_rate / 24.0,
            c_rate_charge: config.c_rate_charge,
            c_rate_discharge: config.c_rate_discharge,
            soc_min: config.soc_min,
            p_in_max: config.c_rate_charge * config.battery_capacity,
            p_out_max: config.c_rate_discharge * config.battery_capacity,
            tier: CostTier::new(
                config.soc_wanted,
                (config.vac_in.unwrap_or(0.0), config.vac_out.unwrap_or(0.0)),
                (config.vac_low_in, config.vac_low_out),
            ),
            current_vac: (0.0, 0.0),
            soc: config.soc_init,
        })
    }

    pub fn soc(&self) -> f64 {
        self.soc
    }

    /// Artificial costs on charging and discharging chosen for this interval.
    pub fn current_vac(&self) -> (f64, f64) {
        self.current_vac
    }

    /// Fraction of content lost per interval.
    pub fn loss_rate_per_interval(&self) -> f64 {
        self.loss_rate_hourly * self.base.sim_params().interval_hours()
    }

    pub fn storage_params(&self) -> StorageParams {
        StorageParams {
            nominal_storage_capacity: self.capacity,
            initial_storage_level: self.soc,
            min_storage_level: self.soc_min,
            loss_rate: self.loss_rate_per_interval(),
            inflow_conversion_factor: self.efficiency_charge,
            outflow_conversion_factor: self.efficiency_discharge,
            balanced: false,
        }
    }
}

impl Component for Battery {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "battery"
    }

    fn prepare_simulation(&mut self, _foreign: &ForeignValues, _interval: usize) -> SimResult<()> {
        self.current_vac = self.tier.select(self.soc);
        Ok(())
    }

    fn add_to_model(&self, network: &mut FlowNetwork, _interval: usize) -> Result<(), NetworkError> {
        network.add(
            Entity::storage(self.base.name.clone(), self.storage_params())
                .input(
                    self.bus.clone(),
                    Flow::new().nominal(self.p_in_max).costs(self.current_vac.0),
                )
                .output(
                    self.bus.clone(),
                    Flow::new().nominal(self.p_out_max).costs(self.current_vac.1),
                ),
        )
    }

    fn update_states(&mut self, results: &SolvedInterval, interval: usize) -> SimResult<()> {
        let content = results
            .storage_content(&self.base.name)
            .ok_or_else(|| SimError::MissingResult {
                component: self.base.name.clone(),
                what: "storage_content".into(),
            })?;
        self.soc = content / self.capacity;
        self.base.states.record_named("soc", interval, self.soc);
        Ok(())
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "soc" => Some(self.soc),
            "soc_min" => Some(self.soc_min),
            "battery_capacity" => Some(self.capacity),
            "c_rate_charge" => Some(self.c_rate_charge),
            "c_rate_discharge" => Some(self.c_rate_discharge),
            "p_in_max" => Some(self.p_in_max),
            "p_out_max" => Some(self.p_out_max),
            _ => self.base.attribute(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::test_support::params;

    fn battery(config: BatteryConfig) -> Result<Battery, ConfigError> {
        Battery::new(
            BatteryConfig {
                bus_in_and_out: "bus_el".into(),
                ..config
            },
            params(10, 60),
        )
    }

    #[test]
    fn defaults() {
        let b = battery(BatteryConfig::default()).unwrap();
        assert_eq!(b.soc(), 0.5);
        assert_eq!(b.current_vac(), (0.0, 0.0));
        assert_eq!(b.attribute("p_in_max"), Some(5000.0));
        assert_eq!(b.attribute("life_time"), Some(20.0));
    }

    #[test]
    fn soc_init_below_min_fails() {
        let err = battery(BatteryConfig {
            soc_init: 0.05,
            soc_min: 0.1,
            ..BatteryConfig::default()
        })
        .unwrap_err();
        assert_eq!(err.field, "battery.soc_init");
    }

    #[test]
    fn daily_loss_rate_becomes_per_interval() {
        let b = battery(BatteryConfig {
            loss_rate: 12.0,
            ..BatteryConfig::default()
        })
        .unwrap();
        assert_eq!(b.loss_rate_per_interval(), 0.5);

        let b = Battery::new(
            BatteryConfig {
                loss_rate: 12.0,
                ..BatteryConfig::default()
            },
            params(10, 30),
        )
        .unwrap();
        assert_eq!(b.storage_params().loss_rate, 0.25);
    }

    #[test]
    fn symmetric_c_rate_overrides_both() {
        let b = battery(BatteryConfig {
            c_rate_symm: Some(0.5),
            c_rate_charge: 2.0,
            ..BatteryConfig::default()
        })
        .unwrap();
        assert_eq!(b.attribute("p_in_max"), Some(2500.0));
        assert_eq!(b.attribute("p_out_max"), Some(2500.0));
    }

    #[test]
    fn wanted_soc_switches_tier() {
        let mut b = battery(BatteryConfig {
            soc_init: 0.3,
            soc_wanted: Some(0.5),
            vac_in: Some(3.0),
            vac_out: Some(4.0),
            vac_low_in: 1.0,
            vac_low_out: 2.0,
            ..BatteryConfig::default()
        })
        .unwrap();
        let none = ForeignValues::none("battery");
        b.prepare_simulation(&none, 0).unwrap();
        assert_eq!(b.current_vac(), (1.0, 2.0));

        let mut solved = SolvedInterval::new();
        solved.set_storage_content("battery", 2500.0);
        b.update_states(&solved, 0).unwrap();
        b.prepare_simulation(&none, 1).unwrap();
        assert_eq!(b.current_vac(), (3.0, 4.0));
    }

    #[test]
    fn update_states_records_soc() {
        let mut b = battery(BatteryConfig::default()).unwrap();
        let mut solved = SolvedInterval::new();
        solved.set_storage_content("battery", 1000.0);
        b.update_states(&solved, 3).unwrap();
        assert_eq!(b.soc(), 0.2);
        let soc = b.base().states.named("soc").unwrap();
        assert_eq!(soc.len(), 10);
        assert_eq!(soc[3], Some(b.soc()));

        let err = b.update_states(&SolvedInterval::new(), 4).unwrap_err();
        assert!(matches!(err, SimError::MissingResult { .. }));
    }

    #[test]
    fn battery_type_selects_capacity_and_capex() {
        let mut b = battery(BatteryConfig {
            battery_type: Some(BatteryType::Medium),
            ..BatteryConfig::default()
        })
        .unwrap();
        assert_eq!(b.attribute("battery_capacity"), Some(100e3));
        b.generate_results().unwrap();
        let capex = b.base().summary.as_ref().unwrap().capex;
        let expected = 1000.2 / 1e3 * 100e3 - 0.4983 / 1e6 * 100e3 * 100e3;
        assert!((capex - expected).abs() < 1e-6);
    }

    #[test]
    fn battery_type_out_of_range_rejected() {
        assert!(toml::from_str::<BatteryConfig>("battery_type = 7").is_err());
        let cfg: BatteryConfig = toml::from_str("battery_type = 3").unwrap();
        assert_eq!(cfg.battery_type, Some(BatteryType::Large));
    }

    #[test]
    fn storage_entity_uses_current_vac() {
        let mut b = battery(BatteryConfig {
            vac_in: Some(3.0),
            vac_out: Some(4.0),
            ..BatteryConfig::default()
        })
        .unwrap();
        b.prepare_simulation(&ForeignValues::none("battery"), 0)
            .unwrap();
        let mut net = FlowNetwork::new(["bus_el"]);
        b.add_to_model(&mut net, 0).unwrap();
        let entity = net.entity("battery").unwrap();
        assert_eq!(entity.inputs["bus_el"].variable_costs, 3.0);
        assert_eq!(entity.outputs["bus_el"].variable_costs, 4.0);
    }
}
