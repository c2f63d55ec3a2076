use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::{AccountingConfig, CostTier};
use crate::error::{ConfigError, NetworkError, SimError, SimResult};
use crate::hydrogen;
use crate::network::solver::SolvedInterval;
use crate::network::{Entity, Flow, FlowNetwork, StorageParams};
use crate::sim::foreign::ForeignValues;
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase, require_at_least};

/// Hydrogen storage parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageH2Config {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_in: String,
    pub bus_out: String,
    /// Usable mass at `p_max` in kg.
    pub storage_capacity: f64,
    /// Initial level as a fraction of capacity.
    pub initial_storage_factor: f64,
    /// Wanted level as a fraction of capacity; unset disables the low tier.
    pub slw_factor: Option<f64>,
    /// Minimum and maximum pressure in bar.
    pub p_min: f64,
    pub p_max: f64,
    /// Gas temperature in K.
    pub temperature: f64,
    pub vac_in: f64,
    pub vac_out: f64,
    pub vac_low_in: f64,
    pub vac_low_out: f64,
}

impl Default for StorageH2Config {
    fn default() -> Self {
        Self {
            name: "storage_h2".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_in: String::new(),
            bus_out: String::new(),
            storage_capacity: 500.0,
            initial_storage_factor: 0.5,
            slw_factor: None,
            p_min: 5.0,
            p_max: 450.0,
            temperature: 293.15,
            vac_in: 0.0,
            vac_out: 0.0,
            vac_low_in: 0.0,
            vac_low_out: 0.0,
        }
    }
}

/// Pressurized hydrogen tank.
///
/// Mass and pressure are linked through the real-gas equation of state; the
/// tank volume follows from holding `storage_capacity` at `p_max`.
#[derive(Debug, Clone)]
pub struct StorageH2 {
    base: ComponentBase,
    bus_in: String,
    bus_out: String,
    capacity: f64,
    volume: f64,
    temperature: f64,
    p_min: f64,
    p_max: f64,
    storage_level_min: f64,
    storage_level_wanted: Option<f64>,
    /// Maximum charge or discharge per interval in kg.
    delta_max: f64,
    tier: CostTier<(f64, f64)>,
    current_vac: (f64, f64),
    storage_level: f64,
    pressure: f64,
}

impl StorageH2 {
    /// Builds a hydrogen storage.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a value is out of range or the initial
    /// level is below the level at `p_min`.
    pub fn new(
        config: StorageH2Config,
        sim_params: Arc<SimulationParameters>,
    ) -> Result<Self, ConfigError> {
        let name = config.name.clone();
        let field = |key: &str| format!("{name}.{key}");

        if !(config.storage_capacity > 0.0) {
            return Err(ConfigError::new(field("storage_capacity"), "must be > 0"));
        }
        if !(0.0..=1.0).contains(&config.initial_storage_factor) {
            return Err(ConfigError::new(
                field("initial_storage_factor"),
                "must be in [0.0, 1.0]",
            ));
        }
        if !(config.p_min > 0.0 && config.p_min < config.p_max) {
            return Err(ConfigError::new(field("p_min"), "must be in (0, p_max)"));
        }
        require_at_least(|| field("temperature"), config.temperature, f64::MIN_POSITIVE)?;

        let volume = hydrogen::volume(config.storage_capacity, config.p_max, config.temperature);
        let storage_level_min = hydrogen::mass(config.p_min, volume, config.temperature);
        let storage_level = config.storage_capacity * config.initial_storage_factor;
        if storage_level < storage_level_min {
            return Err(ConfigError::new(
                field("initial_storage_factor"),
                format!(
                    "initial level {storage_level} kg is below the minimum level {storage_level_min:.3} kg at p_min"
                ),
            ));
        }
        let storage_level_wanted = config.slw_factor.map(|f| f * config.storage_capacity);

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
            capacity: config.storage_capacity,
            volume,
            temperature: config.temperature,
            p_min: config.p_min,
            p_max: config.p_max,
            storage_level_min,
            storage_level_wanted,
            delta_max: config.storage_capacity,
            tier: CostTier::new(
                storage_level_wanted,
                (config.vac_in, config.vac_out),
                (config.vac_low_in, config.vac_low_out),
            ),
            current_vac: (0.0, 0.0),
            storage_level,
            pressure: hydrogen::pressure(storage_level, volume, config.temperature),
        })
    }

    pub fn storage_level(&self) -> f64 {
        self.storage_level
    }

    pub fn storage_level_wanted(&self) -> Option<f64> {
        self.storage_level_wanted
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn current_vac(&self) -> (f64, f64) {
        self.current_vac
    }

    pub fn delta_max(&self) -> f64 {
        self.delta_max
    }
}

impl Component for StorageH2 {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "storage_h2"
    }

    fn prepare_simulation(&mut self, _foreign: &ForeignValues, _interval: usize) -> SimResult<()> {
        self.current_vac = self.tier.select(self.storage_level);
        Ok(())
    }

    fn add_to_model(&self, network: &mut FlowNetwork, _interval: usize) -> Result<(), NetworkError> {
        let params = StorageParams {
            min_storage_level: self.storage_level_min / self.capacity,
            ..StorageParams::new(self.capacity, self.storage_level / self.capacity)
        };
        network.add(
            Entity::storage(self.base.name.clone(), params)
                .input(
                    self.bus_in.clone(),
                    Flow::new().nominal(self.delta_max).costs(self.current_vac.0),
                )
                .output(
                    self.bus_out.clone(),
                    Flow::new().nominal(self.delta_max).costs(self.current_vac.1),
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
        self.storage_level = content;
        self.pressure = hydrogen::pressure(content, self.volume, self.temperature);
        self.base
            .states
            .record_named("storage_level", interval, self.storage_level);
        self.base.states.record_named("pressure", interval, self.pressure);
        Ok(())
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "storage_level" => Some(self.storage_level),
            "pressure" => Some(self.pressure),
            "storage_capacity" => Some(self.capacity),
            "storage_level_min" => Some(self.storage_level_min),
            "storage_level_wanted" => self.storage_level_wanted,
            "p_min" => Some(self.p_min),
            "p_max" => Some(self.p_max),
            "volume" => Some(self.volume),
            _ => self.base.attribute(name),
        }
    }
}
