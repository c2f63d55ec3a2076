//! Foreign states: values a component reads from other components.
//!
//! References are written by component name in a model file and resolved to
//! arena handles once, when the system is assembled. The referenced
//! attribute is read right before the owning component is prepared.

use serde::Deserialize;

use crate::error::{SimError, SimResult};
use crate::sim::system::ComponentId;

/// A foreign-state reference as written in a model file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ForeignStateRef {
    /// A literal used instead of a lookup.
    Constant(f64),
    Attribute(AttributeRef),
}

/// `component.attribute` pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeRef {
    pub component: String,
    pub attribute: String,
}

impl ForeignStateRef {
    pub fn attribute(component: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::Attribute(AttributeRef {
            component: component.into(),
            attribute: attribute.into(),
        })
    }
}

/// A reference with the component name resolved to a handle.
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignState {
    Constant(f64),
    Attribute {
        component: ComponentId,
        attribute: String,
    },
}

/// Values of a component's foreign states for the current interval.
///
/// Index `k` holds foreign state `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignValues {
    owner: String,
    values: Vec<f64>,
}

impl ForeignValues {
    pub fn new(owner: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            owner: owner.into(),
            values,
        }
    }

    /// No foreign states.
    pub fn none(owner: impl Into<String>) -> Self {
        Self::new(owner, Vec::new())
    }

    /// Value of foreign state `index`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::ForeignState` if the component has fewer states.
    pub fn get(&self, index: usize) -> SimResult<f64> {
        self.values
            .get(index)
            .copied()
            .ok_or_else(|| SimError::ForeignState {
                component: self.owner.clone(),
                index,
                reason: format!("only {} foreign states available", self.values.len()),
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        foreign_states: Vec<ForeignStateRef>,
    }

    #[test]
    fn mixed_references_from_toml() {
        let holder: Holder = toml::from_str(
            r#"foreign_states = [{ component = "h2_storage", attribute = "pressure" }, 700]"#,
        )
        .unwrap();
        assert_eq!(
            holder.foreign_states,
            vec![
                ForeignStateRef::attribute("h2_storage", "pressure"),
                ForeignStateRef::Constant(700.0),
            ]
        );
    }

    #[test]
    fn out_of_range_index_is_error() {
        let values = ForeignValues::new("compressor", vec![10.0]);
        assert_eq!(values.get(0).unwrap(), 10.0);
        let err = values.get(1).unwrap_err();
        assert!(matches!(err, SimError::ForeignState { index: 1, .. }));
    }
}
