//! Energy-system components and their shared lifecycle.
//!
//! Every component goes through the same per-interval sequence:
//! prepare, add to the flow network, (external solve), update flows,
//! update states, accrue costs and emissions. After the last interval
//! `generate_results` derives the cost summary.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::{AccountingConfig, CostSummary, SummaryInputs};
use crate::error::{ConfigError, NetworkError, SimError, SimResult};
use crate::network::solver::SolvedInterval;
use crate::network::{FlowKey, FlowNetwork};
use crate::sim::foreign::{ForeignState, ForeignStateRef, ForeignValues};
use crate::sim::params::SimulationParameters;

pub mod battery;
pub mod biogas_converter;
pub mod biogas_smr_psa;
pub mod compressor_h2;
pub mod csv_profile;
pub mod gate;
pub mod h2_chp;
pub mod power_converter;
pub mod sink;
pub mod storage_h2;
pub mod supply;
pub mod trailer_h2_delivery;
pub mod var_grid;

pub use battery::{Battery, BatteryConfig};
pub use biogas_converter::{BiogasConverter, BiogasConverterConfig};
pub use biogas_smr_psa::{BiogasSmrPsa, BiogasSmrPsaConfig};
pub use compressor_h2::{CompressorH2, CompressorH2Config};
pub use csv_profile::{
    EnergyDemandFromCsv, EnergyDemandFromCsvConfig, EnergySourceFromCsv,
    EnergySourceFromCsvConfig,
};
pub use gate::{Gate, GateConfig};
pub use h2_chp::{H2Chp, H2ChpConfig};
pub use power_converter::{PowerConverter, PowerConverterConfig};
pub use sink::{Sink, SinkConfig};
pub use storage_h2::{StorageH2, StorageH2Config};
pub use supply::{Supply, SupplyConfig};
pub use trailer_h2_delivery::{TrailerH2Delivery, TrailerH2DeliveryConfig};
pub use var_grid::{VarGrid, VarGridConfig};

pub const VARIABLE_COSTS: &str = "variable_costs";
pub const ART_COSTS: &str = "art_costs";
pub const VARIABLE_EMISSIONS: &str = "variable_emissions";

/// Named per-interval series, allocated on first write.
///
/// Each series has one slot per simulated interval; slot `i` is written at
/// interval `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStore<K: Ord = String> {
    n_intervals: usize,
    series: BTreeMap<K, Vec<Option<f64>>>,
}

impl<K: Ord> SeriesStore<K> {
    pub fn new(n_intervals: usize) -> Self {
        Self {
            n_intervals,
            series: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, key: K, interval: usize, value: f64) {
        let n = self.n_intervals;
        let slots = self.series.entry(key).or_insert_with(|| vec![None; n]);
        if interval >= slots.len() {
            slots.resize(interval + 1, None);
        }
        slots[interval] = Some(value);
    }

    pub fn get(&self, key: &K) -> Option<&[Option<f64>]> {
        self.series.get(key).map(Vec::as_slice)
    }

    pub fn value(&self, key: &K, interval: usize) -> Option<f64> {
        self.series.get(key)?.get(interval).copied().flatten()
    }

    /// Sum over written slots; 0 for a missing series.
    pub fn total(&self, key: &K) -> f64 {
        self.series
            .get(key)
            .map(|s| s.iter().flatten().sum())
            .unwrap_or(0.0)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.series.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[Option<f64>])> {
        self.series.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

impl SeriesStore<String> {
    pub fn record_named(&mut self, name: &str, interval: usize, value: f64) {
        self.record(name.to_string(), interval, value);
    }

    pub fn named(&self, name: &str) -> Option<&[Option<f64>]> {
        self.get(&name.to_string())
    }

    pub fn value_named(&self, name: &str, interval: usize) -> Option<f64> {
        self.value(&name.to_string(), interval)
    }

    pub fn total_named(&self, name: &str) -> f64 {
        self.total(&name.to_string())
    }
}

/// State shared by every component type.
#[derive(Debug, Clone)]
pub struct ComponentBase {
    pub name: String,
    /// Life time in years.
    pub life_time: f64,
    pub accounting: AccountingConfig,
    artificial_override: Option<f64>,
    pub states: SeriesStore,
    /// Per-interval `variable_costs`, `art_costs` and `variable_emissions`.
    pub results: SeriesStore,
    pub flows: SeriesStore<FlowKey>,
    pub summary: Option<CostSummary>,
    foreign_refs: Vec<ForeignStateRef>,
    foreign_states: Vec<ForeignState>,
    sim_params: Arc<SimulationParameters>,
}

impl ComponentBase {
    /// Creates the shared part of a component.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the name is empty or the accounting
    /// parameters are inconsistent.
    pub fn new(
        name: &str,
        life_time: f64,
        accounting: AccountingConfig,
        foreign_refs: Vec<ForeignStateRef>,
        sim_params: Arc<SimulationParameters>,
    ) -> Result<Self, ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::new("name", "must not be empty"));
        }
        if life_time < 0.0 {
            return Err(ConfigError::new(format!("{name}.life_time"), "must be >= 0"));
        }
        accounting.validate(name)?;
        let n = sim_params.n_intervals;
        Ok(Self {
            name: name.to_string(),
            life_time,
            accounting,
            artificial_override: None,
            states: SeriesStore::new(n),
            results: SeriesStore::new(n),
            flows: SeriesStore::new(n),
            summary: None,
            foreign_refs,
            foreign_states: Vec::new(),
            sim_params,
        })
    }

    pub fn sim_params(&self) -> &SimulationParameters {
        &self.sim_params
    }

    pub fn foreign_refs(&self) -> &[ForeignStateRef] {
        &self.foreign_refs
    }

    pub fn foreign_states(&self) -> &[ForeignState] {
        &self.foreign_states
    }

    pub(crate) fn set_foreign_states(&mut self, states: Vec<ForeignState>) {
        self.foreign_states = states;
    }

    pub fn variable_rate(&self, interval: usize) -> f64 {
        self.accounting
            .variable_costs
            .as_ref()
            .map_or(0.0, |r| r.at(interval))
    }

    /// Artificial cost rate, taking a tier chosen during preparation first.
    pub fn artificial_rate(&self, interval: usize) -> f64 {
        self.artificial_override.unwrap_or_else(|| {
            self.accounting
                .artificial_costs
                .as_ref()
                .map_or(0.0, |r| r.at(interval))
        })
    }

    pub fn set_artificial_rate(&mut self, rate: f64) {
        self.artificial_override = Some(rate);
    }

    /// Variable plus artificial cost rate, as put on the cost flow.
    pub fn costs_and_art_costs(&self, interval: usize) -> f64 {
        self.variable_rate(interval) + self.artificial_rate(interval)
    }

    /// Copies every solved flow touching one of `labels`.
    pub fn record_flows(&mut self, labels: &[String], results: &SolvedInterval, interval: usize) {
        for label in labels {
            for (key, value) in results.flows_of(label) {
                self.flows.record(key.clone(), interval, value);
            }
        }
    }

    /// Realized value of the flow `(from, to)`.
    pub fn flow(&self, from: &str, to: &str, interval: usize) -> Option<f64> {
        self.flows
            .value(&(from.to_string(), to.to_string()), interval)
    }

    fn dependency_flow(&self, key: &FlowKey, interval: usize) -> SimResult<f64> {
        self.flows
            .value(key, interval)
            .ok_or_else(|| SimError::MissingResult {
                component: self.name.clone(),
                what: format!("flow {} -> {}", key.0, key.1),
            })
    }

    /// Writes variable and artificial costs of `interval`.
    ///
    /// Without a cost dependency flow both are 0.
    ///
    /// # Errors
    ///
    /// Returns `SimError::MissingResult` if the dependency flow was not solved.
    pub fn accrue_costs(&mut self, interval: usize) -> SimResult<()> {
        let (var, art) = match &self.accounting.dependency_flow_costs {
            Some(dep) => {
                let flow = self.dependency_flow(&dep.key(), interval)?;
                (
                    flow * self.variable_rate(interval),
                    flow * self.artificial_rate(interval),
                )
            }
            None => (0.0, 0.0),
        };
        self.results.record_named(VARIABLE_COSTS, interval, var);
        self.results.record_named(ART_COSTS, interval, art);
        Ok(())
    }

    /// Writes variable emissions of `interval`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::MissingResult` if the dependency flow was not solved.
    pub fn accrue_emissions(&mut self, interval: usize) -> SimResult<()> {
        let emissions = match &self.accounting.dependency_flow_emissions {
            Some(dep) => {
                let flow = self.dependency_flow(&dep.key(), interval)?;
                flow * self
                    .accounting
                    .variable_emissions
                    .as_ref()
                    .map_or(0.0, |r| r.at(interval))
            }
            None => 0.0,
        };
        self.results
            .record_named(VARIABLE_EMISSIONS, interval, emissions);
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "life_time" => Some(self.life_time),
            _ => None,
        }
    }

    fn summary_inputs(&self) -> SummaryInputs {
        SummaryInputs {
            variable_costs_total: self.results.total_named(VARIABLE_COSTS),
            art_costs_total: self.results.total_named(ART_COSTS),
            variable_emissions_total: self.results.total_named(VARIABLE_EMISSIONS),
            interest_rate: self.sim_params.interest_rate,
            life_time: self.life_time,
            sim_time_span: self.sim_params.sim_time_span() as f64,
        }
    }
}

/// Lifecycle protocol of a simulated component.
///
/// The driver calls the hooks in this order for every interval:
/// [`prepare_simulation`](Component::prepare_simulation),
/// [`add_to_model`](Component::add_to_model), then after the solve
/// [`update_flows`](Component::update_flows),
/// [`update_states`](Component::update_states),
/// [`update_var_costs`](Component::update_var_costs) and
/// [`update_var_emissions`](Component::update_var_emissions).
pub trait Component: fmt::Debug {
    fn base(&self) -> &ComponentBase;

    fn base_mut(&mut self) -> &mut ComponentBase;

    /// Type key as used in model files.
    fn kind(&self) -> &'static str;

    fn name(&self) -> &str {
        &self.base().name
    }

    /// Number of foreign states this component reads.
    fn required_foreign_states(&self) -> usize {
        0
    }

    /// Computes per-interval parameters from own and foreign state.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if a foreign state is missing or invalid.
    fn prepare_simulation(&mut self, _foreign: &ForeignValues, _interval: usize) -> SimResult<()> {
        Ok(())
    }

    /// Adds this component's entities to the interval's flow network.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` if an entity references an unknown bus or
    /// its label is taken.
    fn add_to_model(&self, network: &mut FlowNetwork, interval: usize) -> Result<(), NetworkError>;

    /// Labels of the entities added by [`add_to_model`](Component::add_to_model).
    fn labels(&self) -> Vec<String> {
        vec![self.name().to_string()]
    }

    fn update_flows(&mut self, results: &SolvedInterval, interval: usize) {
        let labels = self.labels();
        self.base_mut().record_flows(&labels, results, interval);
    }

    /// Writes state slot `interval` from the solved results.
    ///
    /// # Errors
    ///
    /// Returns `SimError::MissingResult` if a needed result is absent.
    fn update_states(&mut self, _results: &SolvedInterval, _interval: usize) -> SimResult<()> {
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SimError::MissingResult` if the cost dependency flow is absent.
    fn update_var_costs(&mut self, interval: usize) -> SimResult<()> {
        self.base_mut().accrue_costs(interval)
    }

    /// # Errors
    ///
    /// Returns `SimError::MissingResult` if the emission dependency flow is absent.
    fn update_var_emissions(&mut self, interval: usize) -> SimResult<()> {
        self.base_mut().accrue_emissions(interval)
    }

    /// Evaluates cost functions and totals after the last interval.
    ///
    /// # Errors
    ///
    /// Returns a `SimError::Config` if a cost function cannot be evaluated.
    fn generate_results(&mut self) -> SimResult<()> {
        let base = self.base();
        let summary = CostSummary::compute(
            &base.name,
            &base.accounting,
            base.summary_inputs(),
            |name| self.attribute(name),
        )?;
        self.base_mut().summary = Some(summary);
        Ok(())
    }

    /// Named scalar readable by other components and cost functions.
    fn attribute(&self, name: &str) -> Option<f64> {
        self.base().attribute(name)
    }
}

/// Configuration of any component, tagged by the `component` key.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum ComponentConfig {
    Battery(BatteryConfig),
    StorageH2(StorageH2Config),
    CompressorH2(CompressorH2Config),
    H2Chp(H2ChpConfig),
    PowerConverter(PowerConverterConfig),
    Gate(GateConfig),
    Supply(SupplyConfig),
    VarGrid(VarGridConfig),
    Sink(SinkConfig),
    EnergyDemandFromCsv(EnergyDemandFromCsvConfig),
    EnergySourceFromCsv(EnergySourceFromCsvConfig),
    BiogasConverter(BiogasConverterConfig),
    BiogasSmrPsa(BiogasSmrPsaConfig),
    TrailerH2Delivery(TrailerH2DeliveryConfig),
}

impl ComponentConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Battery(c) => &c.name,
            Self::StorageH2(c) => &c.name,
            Self::CompressorH2(c) => &c.name,
            Self::H2Chp(c) => &c.name,
            Self::PowerConverter(c) => &c.name,
            Self::Gate(c) => &c.name,
            Self::Supply(c) => &c.name,
            Self::VarGrid(c) => &c.name,
            Self::Sink(c) => &c.name,
            Self::EnergyDemandFromCsv(c) => &c.name,
            Self::EnergySourceFromCsv(c) => &c.name,
            Self::BiogasConverter(c) => &c.name,
            Self::BiogasSmrPsa(c) => &c.name,
            Self::TrailerH2Delivery(c) => &c.name,
        }
    }

    /// Builds the component.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the parameters are invalid.
    pub fn build(
        self,
        sim_params: Arc<SimulationParameters>,
    ) -> Result<Box<dyn Component>, ConfigError> {
        Ok(match self {
            Self::Battery(c) => Box::new(Battery::new(c, sim_params)?),
            Self::StorageH2(c) => Box::new(StorageH2::new(c, sim_params)?),
            Self::CompressorH2(c) => Box::new(CompressorH2::new(c, sim_params)?),
            Self::H2Chp(c) => Box::new(H2Chp::new(c, sim_params)?),
            Self::PowerConverter(c) => Box::new(PowerConverter::new(c, sim_params)?),
            Self::Gate(c) => Box::new(Gate::new(c, sim_params)?),
            Self::Supply(c) => Box::new(Supply::new(c, sim_params)?),
            Self::VarGrid(c) => Box::new(VarGrid::new(c, sim_params)?),
            Self::Sink(c) => Box::new(Sink::new(c, sim_params)?),
            Self::EnergyDemandFromCsv(c) => Box::new(EnergyDemandFromCsv::new(c, sim_params)?),
            Self::EnergySourceFromCsv(c) => Box::new(EnergySourceFromCsv::new(c, sim_params)?),
            Self::BiogasConverter(c) => Box::new(BiogasConverter::new(c, sim_params)?),
            Self::BiogasSmrPsa(c) => Box::new(BiogasSmrPsa::new(c, sim_params)?),
            Self::TrailerH2Delivery(c) => Box::new(TrailerH2Delivery::new(c, sim_params)?),
        })
    }

    /// Parses a single component table.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` on unknown keys, unknown component types or
    /// malformed values.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("component", e.to_string()))
    }
}

/// Checks that `value` is finite and `>= min`.
pub(crate) fn require_at_least(
    field: impl FnOnce() -> String,
    value: f64,
    min: f64,
) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min {
        Ok(())
    } else {
        Err(ConfigError::new(field(), format!("must be >= {min}, got {value}")))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::{FlowRef, Rate};

    fn base(accounting: AccountingConfig) -> ComponentBase {
        ComponentBase::new(
            "grid",
            20.0,
            accounting,
            Vec::new(),
            test_support::params(3, 60),
        )
        .unwrap()
    }

    #[test]
    fn series_store_allocates_lazily() {
        let mut store: SeriesStore = SeriesStore::new(4);
        assert!(store.named("soc").is_none());
        store.record_named("soc", 2, 0.7);
        let soc = store.named("soc").unwrap();
        assert_eq!(soc.len(), 4);
        assert_eq!(soc[2], Some(0.7));
        assert_eq!(soc[0], None);
        assert_eq!(store.total(&"soc".to_string()), 0.7);
    }

    #[test]
    fn costs_without_dependency_are_zero() {
        let mut b = base(AccountingConfig::default());
        b.accrue_costs(0).unwrap();
        b.accrue_emissions(0).unwrap();
        assert_eq!(b.results.value_named(VARIABLE_COSTS, 0), Some(0.0));
        assert_eq!(b.results.value_named(ART_COSTS, 0), Some(0.0));
        assert_eq!(b.results.value_named(VARIABLE_EMISSIONS, 0), Some(0.0));
        assert_eq!(b.costs_and_art_costs(0), 0.0);
    }

    #[test]
    fn costs_follow_dependency_flow() {
        let mut b = base(AccountingConfig {
            variable_costs: Some(Rate::Series(vec![1.0, 2.0, 3.0])),
            artificial_costs: Some(Rate::Constant(4.0)),
            dependency_flow_costs: Some(FlowRef("grid".into(), "bus_el".into())),
            ..AccountingConfig::default()
        });
        assert_eq!(b.costs_and_art_costs(1), 6.0);

        let mut solved = SolvedInterval::new();
        solved.set_flow("grid", "bus_el", 10.0);
        b.record_flows(&["grid".to_string()], &solved, 1);
        b.accrue_costs(1).unwrap();
        assert_eq!(b.results.value_named(VARIABLE_COSTS, 1), Some(20.0));
        assert_eq!(b.results.value_named(ART_COSTS, 1), Some(40.0));

        assert!(matches!(
            b.accrue_costs(2),
            Err(SimError::MissingResult { .. })
        ));
    }

    #[test]
    fn tier_override_replaces_artificial_rate() {
        let mut b = base(AccountingConfig {
            artificial_costs: Some(Rate::Constant(4.0)),
            dependency_flow_costs: Some(FlowRef("grid".into(), "bus_el".into())),
            ..AccountingConfig::default()
        });
        b.set_artificial_rate(1.5);
        assert_eq!(b.artificial_rate(0), 1.5);
    }

    #[test]
    fn unknown_component_kind_rejected() {
        let err = ComponentConfig::from_toml_str("component = \"flux_capacitor\"").unwrap_err();
        assert_eq!(err.field, "component");
    }
}
