//! Model file loading and validation.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::components::ComponentConfig;
use crate::error::ConfigError;
use crate::sim::params::SimulationParameters;

/// A complete energy-system model: simulation parameters, buses and
/// components.
///
/// All fields have defaults so a model file only needs to list what it
/// changes. Unknown keys are rejected at every level.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub sim_params: SimulationParameters,
    /// Bus labels, e.g. `["bel", "bh2_lp", "bh2_hp"]`.
    pub busses: Vec<String>,
    pub components: Vec<ComponentConfig>,
}

impl ModelConfig {
    /// Loads a model from a `.toml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("model", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    /// Parses a model from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Parses a model from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the JSON is invalid or contains unknown fields.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::new("json", e.to_string()))
    }

    /// Validates the model and returns a list of errors.
    ///
    /// Component parameters are checked when the components are built;
    /// references to unknown buses surface when the flow network is built.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.sim_params.validate() {
            errors.push(e);
        }

        if self.busses.is_empty() {
            errors.push(ConfigError::new("busses", "must list at least one bus"));
        }
        let mut buses = BTreeSet::new();
        for bus in &self.busses {
            if !buses.insert(bus.as_str()) {
                errors.push(ConfigError::new("busses", format!("duplicate bus \"{bus}\"")));
            }
        }

        let mut names = BTreeSet::new();
        for (i, component) in self.components.iter().enumerate() {
            let name = component.name();
            if !names.insert(name) {
                errors.push(ConfigError::new(
                    format!("components[{i}].name"),
                    format!("duplicate component name \"{name}\""),
                ));
            }
            if buses.contains(name) {
                errors.push(ConfigError::new(
                    format!("components[{i}].name"),
                    format!("\"{name}\" is already a bus label"),
                ));
            }
        }

        errors
    }
}
