//! Per-interval flow network handed to the external solver.
//!
//! The network is rebuilt from scratch every interval: components add their
//! entities during model building and the driver discards the network after
//! results have been applied.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::NetworkError;

pub mod solver;
pub mod split;

pub use split::{SplitBranch, SplitDevice};

/// `(from, to)` label pair identifying a flow.
pub type FlowKey = (String, String);

/// A flow between a bus and an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Flow {
    /// Upper bound of the flow per interval.
    pub nominal_value: Option<f64>,
    /// Fixed relative value; the flow equals `fix * nominal_value`.
    pub fix: Option<f64>,
    /// Cost coefficient per unit of flow.
    pub variable_costs: f64,
}

impl Flow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nominal(mut self, value: f64) -> Self {
        self.nominal_value = Some(value);
        self
    }

    pub fn fixed(mut self, value: f64) -> Self {
        self.fix = Some(value);
        self
    }

    pub fn costs(mut self, value: f64) -> Self {
        self.variable_costs = value;
        self
    }
}

/// Parameters of a storage entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageParams {
    pub nominal_storage_capacity: f64,
    /// Level at the start of the interval as a fraction of capacity.
    pub initial_storage_level: f64,
    /// Minimum level as a fraction of capacity.
    pub min_storage_level: f64,
    /// Fraction of content lost per interval.
    pub loss_rate: f64,
    pub inflow_conversion_factor: f64,
    pub outflow_conversion_factor: f64,
    pub balanced: bool,
}

impl StorageParams {
    /// A lossless storage with unit conversion factors.
    pub fn new(capacity: f64, initial_level: f64) -> Self {
        Self {
            nominal_storage_capacity: capacity,
            initial_storage_level: initial_level,
            min_storage_level: 0.0,
            loss_rate: 0.0,
            inflow_conversion_factor: 1.0,
            outflow_conversion_factor: 1.0,
            balanced: false,
        }
    }
}

/// Kind of a network entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKind {
    Source,
    Sink,
    /// Linear conversion; factors are keyed by bus label.
    Transformer {
        conversion_factors: BTreeMap<String, f64>,
    },
    Storage(StorageParams),
    /// One input, one output, linear between the breakpoints.
    PiecewiseTransformer {
        in_breakpoints: Vec<f64>,
        out_breakpoints: Vec<f64>,
    },
}

/// A labelled node of the flow network with its input and output flows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub label: String,
    pub inputs: BTreeMap<String, Flow>,
    pub outputs: BTreeMap<String, Flow>,
    #[serde(flatten)]
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(label: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            label: label.into(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            kind,
        }
    }

    pub fn source(label: impl Into<String>) -> Self {
        Self::new(label, EntityKind::Source)
    }

    pub fn sink(label: impl Into<String>) -> Self {
        Self::new(label, EntityKind::Sink)
    }

    pub fn transformer(label: impl Into<String>) -> Self {
        Self::new(
            label,
            EntityKind::Transformer {
                conversion_factors: BTreeMap::new(),
            },
        )
    }

    pub fn storage(label: impl Into<String>, params: StorageParams) -> Self {
        Self::new(label, EntityKind::Storage(params))
    }

    pub fn input(mut self, bus: impl Into<String>, flow: Flow) -> Self {
        self.inputs.insert(bus.into(), flow);
        self
    }

    pub fn output(mut self, bus: impl Into<String>, flow: Flow) -> Self {
        self.outputs.insert(bus.into(), flow);
        self
    }

    /// Sets a conversion factor; ignored for kinds other than transformers.
    pub fn conversion(mut self, bus: impl Into<String>, factor: f64) -> Self {
        if let EntityKind::Transformer { conversion_factors } = &mut self.kind {
            conversion_factors.insert(bus.into(), factor);
        }
        self
    }

    fn buses(&self) -> impl Iterator<Item = &String> {
        self.inputs.keys().chain(self.outputs.keys())
    }
}

/// Named constraint forcing two flows equal in every interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EqualityConstraint {
    pub name: String,
    pub flows: [FlowKey; 2],
}

/// Buses, entities and constraints of one interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowNetwork {
    buses: BTreeSet<String>,
    entities: Vec<Entity>,
    constraints: Vec<EqualityConstraint>,
}

impl FlowNetwork {
    pub fn new<I, S>(buses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            buses: buses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Adds an entity after checking its label and buses.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` if the label is taken or a bus is unknown.
    pub fn add(&mut self, entity: Entity) -> Result<(), NetworkError> {
        self.check_entity(&entity)?;
        self.entities.push(entity);
        Ok(())
    }

    /// Adds a split device with its coupling constraints in one step.
    ///
    /// Either every branch and constraint is added or none is.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` if any branch fails the entity checks.
    pub fn add_split(&mut self, device: SplitDevice) -> Result<(), NetworkError> {
        let (entities, constraints) = device.into_parts();
        let mut seen = BTreeSet::new();
        for entity in &entities {
            self.check_entity(entity)?;
            if !seen.insert(entity.label.as_str()) {
                return Err(NetworkError::DuplicateLabel(entity.label.clone()));
            }
        }
        self.entities.extend(entities);
        for constraint in constraints {
            self.add_constraint(constraint)?;
        }
        Ok(())
    }

    /// Registers an equality constraint between two existing flows.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::DanglingConstraint` if a flow does not exist.
    pub fn add_constraint(&mut self, constraint: EqualityConstraint) -> Result<(), NetworkError> {
        for (from, to) in &constraint.flows {
            if !self.has_flow(from, to) {
                return Err(NetworkError::DanglingConstraint {
                    constraint: constraint.name.clone(),
                    bus: from.clone(),
                    entity: to.clone(),
                });
            }
        }
        self.constraints.push(constraint);
        Ok(())
    }

    pub fn entity(&self, label: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.label == label)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn constraints(&self) -> &[EqualityConstraint] {
        &self.constraints
    }

    pub fn buses(&self) -> impl Iterator<Item = &str> {
        self.buses.iter().map(String::as_str)
    }

    /// Serializes the network as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn has_flow(&self, from: &str, to: &str) -> bool {
        self.entities.iter().any(|e| {
            (e.label == to && e.inputs.contains_key(from))
                || (e.label == from && e.outputs.contains_key(to))
        })
    }

    fn check_entity(&self, entity: &Entity) -> Result<(), NetworkError> {
        if self.entity(&entity.label).is_some() {
            return Err(NetworkError::DuplicateLabel(entity.label.clone()));
        }
        if let Some(bus) = entity.buses().find(|b| !self.buses.contains(*b)) {
            return Err(NetworkError::UnknownBus {
                entity: entity.label.clone(),
                bus: bus.clone(),
            });
        }
        Ok(())
    }
}
