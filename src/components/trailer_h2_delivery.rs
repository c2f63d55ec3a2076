use std::sync::Arc;

use serde::Deserialize;

use crate::accounting::AccountingConfig;
use crate::error::{ConfigError, NetworkError, SimResult};
use crate::network::{Entity, Flow, FlowNetwork};
use crate::sim::foreign::{ForeignStateRef, ForeignValues};
use crate::sim::params::SimulationParameters;

use super::{Component, ComponentBase, require_at_least};

/// Hydrogen trailer parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrailerH2DeliveryConfig {
    pub name: String,
    pub life_time: f64,
    pub accounting: AccountingConfig,
    pub bus_in: String,
    pub bus_out_1: String,
    pub bus_out_2: String,
    /// Trailer capacity at maximum pressure in kg.
    pub trailer_capacity: f64,
    /// Fill fraction below which destination 1 is supplied.
    pub fs_destination_storage_threshold_1: Option<f64>,
    /// Fill fraction below which destination 2 is supplied as well.
    pub fs_destination_storage_threshold_2: Option<f64>,
    /// Origin level, origin minimum level, origin capacity, destination 1
    /// level, destination 1 capacity, destination 2 level, destination 2
    /// capacity; all in kg.
    pub foreign_states: Vec<ForeignStateRef>,
}

impl Default for TrailerH2DeliveryConfig {
    fn default() -> Self {
        Self {
            name: "trailer_h2_delivery".to_string(),
            life_time: 20.0,
            accounting: AccountingConfig::default(),
            bus_in: String::new(),
            bus_out_1: String::new(),
            bus_out_2: String::new(),
            trailer_capacity: 900.0,
            fs_destination_storage_threshold_1: None,
            fs_destination_storage_threshold_2: None,
            foreign_states: Vec::new(),
        }
    }
}

/// Storage levels a delivery is planned from, in kg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageReadings {
    pub origin_level: f64,
    pub origin_min_level: f64,
    pub origin_capacity: f64,
    pub dest_1_level: f64,
    pub dest_1_capacity: f64,
    pub dest_2_level: f64,
    pub dest_2_capacity: f64,
}

impl StorageReadings {
    fn from_foreign(foreign: &ForeignValues) -> SimResult<Self> {
        Ok(Self {
            origin_level: foreign.get(0)?,
            origin_min_level: foreign.get(1)?,
            origin_capacity: foreign.get(2)?,
            dest_1_level: foreign.get(3)?,
            dest_1_capacity: foreign.get(4)?,
            dest_2_level: foreign.get(5)?,
            dest_2_capacity: foreign.get(6)?,
        })
    }

    /// Hydrogen the origin can give away; at most half its capacity per trip
    /// and never below 0.
    pub fn origin_available(&self) -> f64 {
        (self.origin_level - self.origin_min_level)
            .min(self.origin_capacity / 2.0)
            .max(0.0)
    }
}

/// Hydrogen picked up and dropped off in one interval, in kg.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeliveryPlan {
    pub hydrogen_needed: f64,
    pub output_h2_1: f64,
    pub output_h2_2: f64,
}

/// Plans a trailer trip from the origin storage to up to two destinations.
///
/// Nothing is delivered unless destination 1 is below its threshold.
/// Destination 2 is only served if it is below its own threshold too. A
/// full trailer load is split with destination 1 taking as much as it can
/// hold.
///
/// # Arguments
///
/// * `readings` - Current storage levels and capacities
/// * `threshold_1`, `threshold_2` - Fill fractions of the destinations
/// * `trailer_capacity` - Maximum load in kg
pub fn plan_delivery(
    readings: &StorageReadings,
    threshold_1: f64,
    threshold_2: f64,
    trailer_capacity: f64,
) -> DeliveryPlan {
    let r = readings;
    if r.dest_1_level >= threshold_1 * r.dest_1_capacity {
        return DeliveryPlan::default();
    }
    let available = r.origin_available();
    let free_1 = r.dest_1_capacity - r.dest_1_level;
    let free_2 = r.dest_2_capacity - r.dest_2_level;

    if r.dest_2_level < threshold_2 * r.dest_2_capacity {
        let free_total = free_1 + free_2;
        if free_total >= trailer_capacity && available >= trailer_capacity {
            let to_1 = free_1.min(trailer_capacity);
            DeliveryPlan {
                hydrogen_needed: trailer_capacity,
                output_h2_1: to_1,
                output_h2_2: trailer_capacity - to_1,
            }
        } else if free_total > trailer_capacity && trailer_capacity > available {
            let to_1 = free_1.min(available);
            DeliveryPlan {
                hydrogen_needed: available,
                output_h2_1: to_1,
                output_h2_2: available - to_1,
            }
        } else {
            DeliveryPlan {
                hydrogen_needed: free_total,
                output_h2_1: free_1,
                output_h2_2: free_2,
            }
        }
    } else {
        let load = if free_1 >= trailer_capacity && available >= trailer_capacity {
            trailer_capacity
        } else if free_1 > trailer_capacity && trailer_capacity > available {
            available
        } else {
            free_1
        };
        DeliveryPlan {
            hydrogen_needed: load,
            output_h2_1: load,
            output_h2_2: 0.0,
        }
    }
}

/// Hydrogen trailer moving hydrogen from a central storage to two
/// destination storages.
#[derive(Debug, Clone)]
pub struct TrailerH2Delivery {
    base: ComponentBase,
    bus_in: String,
    bus_out_1: String,
    bus_out_2: String,
    trailer_capacity: f64,
    threshold_1: f64,
    threshold_2: f64,
    plan: DeliveryPlan,
    current_ac: f64,
}

impl TrailerH2Delivery {
    /// # Errors
    ///
    /// Returns a `ConfigError` if a threshold is missing or a value is out
    /// of range.
    pub fn new(
        config: TrailerH2DeliveryConfig,
        sim_params: Arc<SimulationParameters>,
    ) -> Result<Self, ConfigError> {
        let name = config.name.clone();
        require_at_least(
            || format!("{name}.trailer_capacity"),
            config.trailer_capacity,
            f64::MIN_POSITIVE,
        )?;
        let threshold = |value: Option<f64>, key: &str| -> Result<f64, ConfigError> {
            let field = format!("{name}.{key}");
            let t = value.ok_or_else(|| ConfigError::new(field.clone(), "is required"))?;
            if (0.0..=1.0).contains(&t) {
                Ok(t)
            } else {
                Err(ConfigError::new(field, format!("must be in [0, 1], got {t}")))
            }
        };
        let threshold_1 = threshold(
            config.fs_destination_storage_threshold_1,
            "fs_destination_storage_threshold_1",
        )?;
        let threshold_2 = threshold(
            config.fs_destination_storage_threshold_2,
            "fs_destination_storage_threshold_2",
        )?;
        let base = ComponentBase::new(
            &config.name,
            config.life_time,
            config.accounting,
            config.foreign_states,
            sim_params,
        )?;
        Ok(Self {
            base,
            bus_in: config.bus_in,
            bus_out_1: config.bus_out_1,
            bus_out_2: config.bus_out_2,
            trailer_capacity: config.trailer_capacity,
            threshold_1,
            threshold_2,
            plan: DeliveryPlan::default(),
            current_ac: 0.0,
        })
    }

    pub fn plan(&self) -> &DeliveryPlan {
        &self.plan
    }
}

impl Component for TrailerH2Delivery {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ComponentBase {
        &mut self.base
    }

    fn kind(&self) -> &'static str {
        "trailer_h2_delivery"
    }

    fn required_foreign_states(&self) -> usize {
        7
    }

    fn prepare_simulation(&mut self, foreign: &ForeignValues, interval: usize) -> SimResult<()> {
        let readings = StorageReadings::from_foreign(foreign)?;
        self.plan = plan_delivery(
            &readings,
            self.threshold_1,
            self.threshold_2,
            self.trailer_capacity,
        );
        self.current_ac = self.base.costs_and_art_costs(interval);
        Ok(())
    }

    fn add_to_model(&self, network: &mut FlowNetwork, _interval: usize) -> Result<(), NetworkError> {
        network.add(
            Entity::transformer(self.base.name.clone())
                .input(
                    self.bus_in.clone(),
                    Flow::new().nominal(self.plan.hydrogen_needed),
                )
                .output(
                    self.bus_out_1.clone(),
                    Flow::new()
                        .nominal(self.plan.output_h2_1)
                        .costs(self.current_ac),
                )
                .output(
                    self.bus_out_2.clone(),
                    Flow::new().nominal(self.plan.output_h2_2),
                )
                .conversion(self.bus_out_1.clone(), 1.0)
                .conversion(self.bus_out_2.clone(), 1.0),
        )
    }

    fn attribute(&self, name: &str) -> Option<f64> {
        match name {
            "trailer_capacity" => Some(self.trailer_capacity),
            "hydrogen_needed" => Some(self.plan.hydrogen_needed),
            _ => self.base.attribute(name),
        }
    }
}
