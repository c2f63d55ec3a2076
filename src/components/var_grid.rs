use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::{AccountingConfig, CostFunction, CostTier, Rate};
use crate::error::{ConfigError, NetworkError, SimResult};
use crate::network::{Entity, Flow, FlowNetwork};
use crate::sim::foreign::{ForeignStateRef, ForeignValues};
use crate::sim::params::SimulationParameters;

use super::supply::{foreign_threshold_tier, with_output_dependency};
use super::{Component, ComponentBase, require_at_least};

/// Connection power in W of grid levels 1 (extra high voltage) to 7
/// (low voltage).
const DEFAULT_LEVEL_OUTPUT_MAX: [f64; 7] = [50e6, 10e6, 540e3, 1.5e6, 3e6, 270e3, 135e3];

/// Overrides for one grid level; unset fields keep the level's defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridLevelConfig {
    pub level: u8,
    pub output_max: Option<f64>,
    /// Costs per unit drawn at this level.
    pub variable_costs: Option<f64>,
    pub capex: Option<CostFunction>,
    pub opex: Option<CostFunction>,
}

/// Resolved parameters of the selected grid level.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLevel {
    pub level: u8,
    pub output_max: f64,
    pub variable_costs: f64,
    pub capex: Option<CostFunction>,
    pub opex: Option<CostFunction>,
}

impl GridLevel {
    /// Defaults of `level`, or `None` outside 1..=7.
    pub fn default_for(level: u8) -> Option<Self> {
        let output_max = *DEFAULT_LEVEL_OUTPUT_MAX.get(usize::from(level).checked_sub(1)?)?;
        Some(Self {
            level,
            output_max,
            variable_costs: 0.0,
            capex: None,
            opex: None,
        })
    }

    fn apply(mut self, overrides: GridLevelConfig) -> Self {
        if let Some(v) = overrides.output_max {
            self.output_max = v;
        }
        if let Some(v) = overrides.variable_costs {
            self.variable_costs = v;
        }
        self.capex = overrides.capex.or(self.capex);
        self.opex = overrides.opex.or(self.opex);
        self
    }
}

/// Variable grid parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VarGridConfig {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_out: String,
    /// Selected grid level, 1 to 7.
    pub grid_level: u8,
    /// Per-level overrides.
    pub levels: Vec<GridLevelConfig>,
    pub foreign_states: Vec<ForeignStateRef>,
    pub fs_threshold: Option<f64>,
    pub fs_low_art_cost: f64,
    pub fs_high_art_cost: f64,
}

impl Default for VarGridConfig {
    fn default() -> Self {
        Self {
            name: "var_grid".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_out: String::new(),
            grid_level: 7,
            levels: Vec::new(),
            foreign_states: Vec::new(),
            fs_threshold: None,
            fs_low_art_cost: 0.0,
            fs_high_art_cost: 0.0,
        }
    }
}

/// Grid connection whose size, price and investment depend on the chosen
/// grid level.
#[derive(Debug, Clone)]
pub struct VarGrid {
    base: ComponentBase,
    bus_out: String,
    level: GridLevel,
    tier: Option<CostTier<f64>>,
    current_ac: f64,
}

impl VarGrid {
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown grid level, an override of an
    /// unknown level, or an invalid threshold setup.
    pub fn new(config: VarGridConfig, sim_params: Arc<SimulationParameters>) -> Result<Self, ConfigError> {
        let name = config.name.clone();
        if let Some(bad) = config
            .levels
            .iter()
            .find(|l| GridLevel::default_for(l.level).is_none())
        {
            return Err(ConfigError::new(
                format!("{name}.levels.{}", bad.level),
                "grid levels are 1 to 7",
            ));
        }
        let overrides = config
            .levels
            .into_iter()
            .rfind(|l| l.level == config.grid_level)
            .unwrap_or_default();
        let level = GridLevel::default_for(config.grid_level)
            .ok_or_else(|| {
                ConfigError::new(
                    format!("{name}.grid_level"),
                    format!("must be in 1..=7, got {}", config.grid_level),
                )
            })?
            .apply(overrides);
        require_at_least(
            || format!("{name}.levels.{}.output_max", level.level),
            level.output_max,
            0.0,
        )?;

        let tier = foreign_threshold_tier(
            &name,
            &config.foreign_states,
            config.fs_threshold,
            config.fs_low_art_cost,
            config.fs_high_art_cost,
        )?;

        let mut accounting = with_output_dependency(config.accounting, &name, &config.bus_out);
        if accounting.variable_costs.is_none() {
            accounting.variable_costs = Some(Rate::Constant(level.variable_costs));
        }
        if accounting.capex.is_none() {
            accounting.capex = level.capex.clone();
        }
        if accounting.opex.is_none() {
            accounting.opex = level.opex.clone();
        }

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
            level,
            tier,
            current_ac,
        })
    }

    pub fn grid_level(&self) -> &GridLevel {
        &self.level
    }

    /// Variable plus artificial costs on the output flow this interval.
    pub fn current_ac(&self) -> f64 {
        self.current_ac
    }
}

impl Component for VarGrid {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "var_grid"
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
                Flow::new()
                    .nominal(self.level.output_max)
                    .costs(self.current_ac),
            ),
        )
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "output_max" => Some(self.level.output_max),
            "grid_level" => Some(f64::from(self.level.level)),
            "current_ac" => Some(self.current_ac),
            _ => self.base.attribute(name),
        }
    }
}
