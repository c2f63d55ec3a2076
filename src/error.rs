//! Error types shared across the crate.

use thiserror::Error;

use crate::network::solver::SolveStatus;
use crate::sim::engine::Phase;

/// Configuration error with field path and constraint description.
///
/// Raised while a model or a component is being constructed; never recovered.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.soc_init"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while assembling a flow network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("entity `{entity}` references unknown bus `{bus}`")]
    UnknownBus { entity: String, bus: String },

    #[error("duplicate entity label `{0}`")]
    DuplicateLabel(String),

    #[error("constraint `{constraint}` references missing flow `{bus}` -> `{entity}`")]
    DanglingConstraint {
        constraint: String,
        bus: String,
        entity: String,
    },
}

/// Failure reported by a solver backend before any status was produced.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("solver backend error: {message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that abort a simulation run.
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("component `{component}`: foreign state {index}: {reason}")]
    ForeignState {
        component: String,
        index: usize,
        reason: String,
    },

    #[error("interval {interval}: solver reported status {status}")]
    Infeasible { interval: usize, status: SolveStatus },

    #[error("interval {interval}: {source}")]
    Solver {
        interval: usize,
        #[source]
        source: BackendError,
    },

    #[error("lifecycle violation: expected phase {expected}, found {found}")]
    Lifecycle { expected: Phase, found: Phase },

    #[error("component `{component}`: solver result `{what}` missing")]
    MissingResult { component: String, what: String },

    #[error("constraint `{constraint}` violated at interval {interval}: {left} != {right}")]
    CouplingViolated {
        constraint: String,
        interval: usize,
        left: f64,
        right: f64,
    },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_names_field() {
        let err = ConfigError::new("battery.soc_init", "must be >= soc_min");
        assert_eq!(
            err.to_string(),
            "config error: battery.soc_init: must be >= soc_min"
        );
    }

    #[test]
    fn config_error_converts_into_sim_error() {
        let err: SimError = ConfigError::new("gate.max_input", "must be >= 0").into();
        assert!(matches!(err, SimError::Config(ref e) if e.field == "gate.max_input"));
    }

    #[test]
    fn infeasible_display_includes_interval() {
        let err = SimError::Infeasible {
            interval: 3,
            status: SolveStatus::Infeasible,
        };
        assert!(err.to_string().contains("interval 3"));
    }
}
