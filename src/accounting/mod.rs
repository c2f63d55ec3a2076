//! Variable costs, artificial costs and emissions of a component.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::network::FlowKey;

pub mod costs;
pub mod tier;

pub use costs::{CostFunction, CostTerm, SpecFactor, annuity};
pub use tier::CostTier;

const MINUTES_PER_YEAR: f64 = 365.0 * 24.0 * 60.0;

/// A rate that is either constant or given per interval.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Rate {
    Constant(f64),
    Series(Vec<f64>),
}

impl Rate {
    /// Value for interval `i`; a series shorter than the run repeats its last value.
    pub fn at(&self, i: usize) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Series(values) => values
                .get(i)
                .or_else(|| values.last())
                .copied()
                .unwrap_or(0.0),
        }
    }
}

/// A `(from, to)` flow reference as written in a model file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlowRef(pub String, pub String);

impl FlowRef {
    pub fn key(&self) -> FlowKey {
        (self.0.clone(), self.1.clone())
    }
}

/// Accounting parameters shared by every component type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountingConfig {
    /// Costs per unit of the cost dependency flow.
    pub variable_costs: Option<Rate>,
    /// Steering costs per unit of the cost dependency flow.
    pub artificial_costs: Option<Rate>,
    pub dependency_flow_costs: Option<FlowRef>,
    /// Emissions per unit of the emission dependency flow.
    pub variable_emissions: Option<Rate>,
    pub dependency_flow_emissions: Option<FlowRef>,
    pub capex: Option<CostFunction>,
    pub opex: Option<CostFunction>,
    pub fix_emissions: Option<CostFunction>,
}

impl AccountingConfig {
    /// Checks that every rate has the flow it is applied to.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` addressed at `<component>.accounting.<key>`.
    pub fn validate(&self, component: &str) -> Result<(), ConfigError> {
        let field = |key: &str| format!("{component}.accounting.{key}");
        if self.dependency_flow_costs.is_none() {
            if self.variable_costs.is_some() {
                return Err(ConfigError::new(
                    field("variable_costs"),
                    "requires dependency_flow_costs",
                ));
            }
            if self.artificial_costs.is_some() {
                return Err(ConfigError::new(
                    field("artificial_costs"),
                    "requires dependency_flow_costs",
                ));
            }
        }
        if self.dependency_flow_emissions.is_none() && self.variable_emissions.is_some() {
            return Err(ConfigError::new(
                field("variable_emissions"),
                "requires dependency_flow_emissions",
            ));
        }
        Ok(())
    }
}

/// Per-component results computed after the last interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostSummary {
    pub variable_costs_total: f64,
    pub art_costs_total: f64,
    pub variable_emissions_total: f64,
    pub capex: f64,
    /// Annual operation costs.
    pub opex: f64,
    pub fix_emissions: f64,
    pub annuity_capex: f64,
    pub annual_variable_costs: f64,
    pub annuity_total: f64,
    pub annual_total_emissions: f64,
}

/// Inputs to [`CostSummary::compute`] besides the cost functions.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInputs {
    pub variable_costs_total: f64,
    pub art_costs_total: f64,
    pub variable_emissions_total: f64,
    pub interest_rate: f64,
    pub life_time: f64,
    /// Simulated span in minutes.
    pub sim_time_span: f64,
}

impl CostSummary {
    /// Evaluates the cost functions and derives annual figures.
    ///
    /// `opex` and `fix_emissions` may refer to `capex` as a dependant value.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a cost function cannot be evaluated.
    pub fn compute(
        component: &str,
        config: &AccountingConfig,
        inputs: SummaryInputs,
        attribute: impl Fn(&str) -> Option<f64>,
    ) -> Result<Self, ConfigError> {
        let field = |key: &str| format!("{component}.accounting.{key}");
        let capex = match &config.capex {
            Some(f) => f.evaluate(&field("capex"), &attribute)?,
            None => 0.0,
        };
        let with_capex = |name: &str| {
            if name == "capex" {
                Some(capex)
            } else {
                attribute(name)
            }
        };
        let opex = match &config.opex {
            Some(f) => f.evaluate(&field("opex"), &with_capex)?,
            None => 0.0,
        };
        let fix_emissions = match &config.fix_emissions {
            Some(f) => f.evaluate(&field("fix_emissions"), &with_capex)?,
            None => 0.0,
        };

        let to_annual = if inputs.sim_time_span > 0.0 {
            MINUTES_PER_YEAR / inputs.sim_time_span
        } else {
            0.0
        };
        let annuity_capex = annuity(capex, inputs.interest_rate, inputs.life_time);
        let annual_variable_costs = inputs.variable_costs_total * to_annual;
        let annual_fix_emissions = if inputs.life_time > 0.0 {
            fix_emissions / inputs.life_time
        } else {
            0.0
        };

        Ok(Self {
            variable_costs_total: inputs.variable_costs_total,
            art_costs_total: inputs.art_costs_total,
            variable_emissions_total: inputs.variable_emissions_total,
            capex,
            opex,
            fix_emissions,
            annuity_capex,
            annual_variable_costs,
            annuity_total: annuity_capex + opex + annual_variable_costs,
            annual_total_emissions: annual_fix_emissions
                + inputs.variable_emissions_total * to_annual,
        })
    }
}
