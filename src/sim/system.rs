//! The set of components making up one energy system.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::components::Component;
use crate::config::ModelConfig;
use crate::error::{ConfigError, NetworkError, SimError, SimResult};
use crate::network::FlowNetwork;
use crate::network::solver::SolvedInterval;
use crate::sim::foreign::{ForeignState, ForeignStateRef, ForeignValues};
use crate::sim::params::SimulationParameters;

/// Handle of a component inside a [`System`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub usize);

/// Components in configuration order, plus the buses they connect to.
///
/// Components are prepared, modeled and updated in the order they were
/// added, so a component that reads a foreign state of a later component
/// sees that component's state from the previous interval.
#[derive(Debug)]
pub struct System {
    params: Arc<SimulationParameters>,
    buses: Vec<String>,
    components: Vec<Box<dyn Component>>,
    index: HashMap<String, ComponentId>,
}

impl System {
    pub fn new(params: Arc<SimulationParameters>, buses: Vec<String>) -> Self {
        Self {
            params,
            buses,
            components: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Builds every component of a model.
    ///
    /// # Errors
    ///
    /// Returns the first validation error of the model or the first
    /// component that fails to build.
    pub fn from_model(model: ModelConfig) -> Result<Self, ConfigError> {
        if let Some(first) = model.validate().into_iter().next() {
            return Err(first);
        }
        let params = Arc::new(model.sim_params);
        let mut system = Self::new(Arc::clone(&params), model.busses);
        for config in model.components {
            let component = config.build(Arc::clone(&params))?;
            system.add(component)?;
        }
        Ok(system)
    }

    /// Adds a component.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the name is already taken.
    pub fn add(&mut self, component: Box<dyn Component>) -> Result<ComponentId, ConfigError> {
        let name = component.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ConfigError::new(
                format!("{name}.name"),
                "component names must be unique",
            ));
        }
        let id = ComponentId(self.components.len());
        self.index.insert(name, id);
        self.components.push(component);
        Ok(id)
    }

    pub fn params(&self) -> &Arc<SimulationParameters> {
        &self.params
    }

    pub fn buses(&self) -> &[String] {
        &self.buses
    }

    pub fn id_of(&self, name: &str) -> Option<ComponentId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: ComponentId) -> Option<&dyn Component> {
        self.components.get(id.0).map(Box::as_ref)
    }

    pub fn component(&self, name: &str) -> Option<&dyn Component> {
        self.get(self.id_of(name)?)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut (dyn Component + 'static)> {
        let id = self.id_of(name)?;
        self.components.get_mut(id.0).map(Box::as_mut)
    }

    pub fn components(&self) -> impl Iterator<Item = &dyn Component> {
        self.components.iter().map(Box::as_ref)
    }

    /// Resolves every foreign-state reference to a component handle.
    ///
    /// # Errors
    ///
    /// Returns `SimError::ForeignState` for a reference to an unknown
    /// component and `SimError::Config` if a component is given the wrong
    /// number of foreign states.
    pub fn resolve_foreign_states(&mut self) -> SimResult<()> {
        for slot in 0..self.components.len() {
            let component = &self.components[slot];
            let owner = component.name().to_string();
            let refs = component.base().foreign_refs();
            let required = component.required_foreign_states();
            if refs.len() != required {
                return Err(ConfigError::new(
                    format!("{owner}.foreign_states"),
                    format!("expects {required} foreign states, got {}", refs.len()),
                )
                .into());
            }
            let resolved = refs
                .iter()
                .enumerate()
                .map(|(index, r)| match r {
                    ForeignStateRef::Constant(v) => Ok(ForeignState::Constant(*v)),
                    ForeignStateRef::Attribute(a) => self
                        .id_of(&a.component)
                        .map(|component| ForeignState::Attribute {
                            component,
                            attribute: a.attribute.clone(),
                        })
                        .ok_or_else(|| SimError::ForeignState {
                            component: owner.clone(),
                            index,
                            reason: format!("unknown component `{}`", a.component),
                        }),
                })
                .collect::<SimResult<Vec<_>>>()?;
            self.components[slot]
                .base_mut()
                .set_foreign_states(resolved);
        }
        Ok(())
    }

    /// Current values of a component's foreign states.
    ///
    /// # Errors
    ///
    /// Returns `SimError::ForeignState` if a referenced attribute does not
    /// exist.
    pub fn foreign_values(&self, id: ComponentId) -> SimResult<ForeignValues> {
        let Some(component) = self.get(id) else {
            return Ok(ForeignValues::none(""));
        };
        let owner = component.name();
        let values = component
            .base()
            .foreign_states()
            .iter()
            .enumerate()
            .map(|(index, state)| match state {
                ForeignState::Constant(v) => Ok(*v),
                ForeignState::Attribute {
                    component: source,
                    attribute,
                } => self
                    .get(*source)
                    .and_then(|c| c.attribute(attribute))
                    .ok_or_else(|| SimError::ForeignState {
                        component: owner.to_string(),
                        index,
                        reason: format!("attribute `{attribute}` not available"),
                    }),
            })
            .collect::<SimResult<Vec<_>>>()?;
        Ok(ForeignValues::new(owner, values))
    }

    /// Prepares every component for `interval`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first component error.
    pub fn prepare_all(&mut self, interval: usize) -> SimResult<()> {
        for slot in 0..self.components.len() {
            let values = self.foreign_values(ComponentId(slot))?;
            self.components[slot].prepare_simulation(&values, interval)?;
        }
        Ok(())
    }

    /// Builds the flow network of `interval`.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` if a component references an unknown bus or
    /// two entities share a label.
    pub fn build_network(&self, interval: usize) -> Result<FlowNetwork, NetworkError> {
        let mut network = FlowNetwork::new(self.buses.iter().map(String::as_str));
        for component in &self.components {
            component.add_to_model(&mut network, interval)?;
        }
        debug!(
            interval,
            entities = network.entities().len(),
            constraints = network.constraints().len(),
            "flow network built"
        );
        Ok(network)
    }

    /// Applies solved results to every component: flows, states, then
    /// costs and emissions.
    ///
    /// # Errors
    ///
    /// Returns `SimError::MissingResult` if a component needs a result the
    /// solver did not report.
    pub fn apply_results(&mut self, results: &SolvedInterval, interval: usize) -> SimResult<()> {
        for component in &mut self.components {
            component.update_flows(results, interval);
            component.update_states(results, interval)?;
            component.update_var_costs(interval)?;
            component.update_var_emissions(interval)?;
        }
        Ok(())
    }

    /// Computes the cost summary of every component.
    ///
    /// # Errors
    ///
    /// Returns the first cost function that cannot be evaluated.
    pub fn generate_results(&mut self) -> SimResult<()> {
        for component in &mut self.components {
            component.generate_results()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::test_support::params;
    use crate::components::{Gate, GateConfig, StorageH2, StorageH2Config};

    fn storage(name: &str) -> Box<dyn Component> {
        Box::new(
            StorageH2::new(
                StorageH2Config {
                    name: name.into(),
                    bus_in: "bh2".into(),
                    bus_out: "bh2".into(),
                    ..StorageH2Config::default()
                },
                params(2, 60),
            )
            .unwrap(),
        )
    }

    fn system() -> System {
        System::new(params(2, 60), vec!["bh2".into(), "bel".into()])
    }

    #[test]
    fn names_must_be_unique() {
        let mut sys = system();
        assert_eq!(sys.add(storage("s")).unwrap(), ComponentId(0));
        let err = sys.add(storage("s")).unwrap_err();
        assert_eq!(err.field, "s.name");
    }

    #[test]
    fn unknown_foreign_component_rejected() {
        let mut sys = system();
        sys.add(Box::new(
            crate::components::CompressorH2::new(
                crate::components::CompressorH2Config {
                    foreign_states: vec![
                        ForeignStateRef::Constant(40.0),
                        ForeignStateRef::attribute("missing", "pressure"),
                    ],
                    ..Default::default()
                },
                params(2, 60),
            )
            .unwrap(),
        ))
        .unwrap();
        let err = sys.resolve_foreign_states().unwrap_err();
        assert!(matches!(err, SimError::ForeignState { index: 1, .. }));
    }

    #[test]
    fn wrong_foreign_state_count_rejected() {
        let mut sys = system();
        sys.add(Box::new(
            crate::components::CompressorH2::new(
                crate::components::CompressorH2Config {
                    foreign_states: vec![ForeignStateRef::Constant(40.0)],
                    ..Default::default()
                },
                params(2, 60),
            )
            .unwrap(),
        ))
        .unwrap();
        let err = sys.resolve_foreign_states().unwrap_err();
        assert!(matches!(err, SimError::Config(ref e) if e.field == "compressor_h2.foreign_states"));
    }

    #[test]
    fn foreign_values_read_current_attributes() {
        let mut sys = system();
        sys.add(storage("s")).unwrap();
        sys.add(Box::new(
            crate::components::CompressorH2::new(
                crate::components::CompressorH2Config {
                    bus_h2_in: "bh2".into(),
                    bus_h2_out: "bh2".into(),
                    bus_el: "bel".into(),
                    foreign_states: vec![
                        ForeignStateRef::attribute("s", "pressure"),
                        ForeignStateRef::Constant(700.0),
                    ],
                    ..Default::default()
                },
                params(2, 60),
            )
            .unwrap(),
        ))
        .unwrap();
        sys.resolve_foreign_states().unwrap();

        let pressure = sys.component("s").unwrap().attribute("pressure").unwrap();
        let values = sys.foreign_values(ComponentId(1)).unwrap();
        assert_eq!(values.get(0).unwrap(), pressure);
        assert_eq!(values.get(1).unwrap(), 700.0);

        sys.prepare_all(0).unwrap();
        let network = sys.build_network(0).unwrap();
        assert_eq!(network.entities().len(), 2);
    }

    #[test]
    fn unknown_bus_surfaces_at_network_build() {
        let mut sys = System::new(params(1, 60), vec!["bel".into()]);
        sys.add(Box::new(
            Gate::new(
                GateConfig {
                    bus_in: "bel".into(),
                    bus_out: "nowhere".into(),
                    ..GateConfig::default()
                },
                params(1, 60),
            )
            .unwrap(),
        ))
        .unwrap();
        assert!(matches!(
            sys.build_network(0),
            Err(NetworkError::UnknownBus { .. })
        ));
    }
}
