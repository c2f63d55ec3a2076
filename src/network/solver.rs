//! Seam between the simulation driver and an external optimization backend.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::BackendError;
use crate::sim::params::SimulationParameters;

use super::{FlowKey, FlowNetwork};

/// Termination status reported by a solver backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Error,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Optimal => "optimal",
            Self::Infeasible => "infeasible",
            Self::Unbounded => "unbounded",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Realized values of one solved interval.
///
/// Flows are keyed by `(from, to)` labels: `(bus, entity)` for an entity
/// input and `(entity, bus)` for an output. Storage contents are keyed by
/// the storage entity label and hold the content at the end of the interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolvedInterval {
    flows: BTreeMap<FlowKey, f64>,
    storage_content: BTreeMap<String, f64>,
}

impl SolvedInterval {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_flow(&mut self, from: impl Into<String>, to: impl Into<String>, value: f64) {
        self.flows.insert((from.into(), to.into()), value);
    }

    pub fn flow(&self, from: &str, to: &str) -> Option<f64> {
        self.flows
            .get(&(from.to_string(), to.to_string()))
            .copied()
    }

    /// Iterates over all flows touching the entity `label`.
    pub fn flows_of<'a>(&'a self, label: &'a str) -> impl Iterator<Item = (&'a FlowKey, f64)> + 'a {
        self.flows
            .iter()
            .filter(move |((from, to), _)| from == label || to == label)
            .map(|(k, v)| (k, *v))
    }

    pub fn set_storage_content(&mut self, label: impl Into<String>, value: f64) {
        self.storage_content.insert(label.into(), value);
    }

    pub fn storage_content(&self, label: &str) -> Option<f64> {
        self.storage_content.get(label).copied()
    }
}

/// What a backend hands back for one interval.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub results: SolvedInterval,
}

impl SolveOutcome {
    pub fn optimal(results: SolvedInterval) -> Self {
        Self {
            status: SolveStatus::Optimal,
            results,
        }
    }
}

/// An external linear / mixed-integer optimization backend.
///
/// Called exactly once per interval with a freshly built network. The
/// backend must honor every equality constraint registered on the network.
pub trait Solver {
    /// Solves one interval.
    ///
    /// # Arguments
    ///
    /// * `network` - Flow network assembled for this interval
    /// * `params` - Shared simulation parameters (interval length etc.)
    /// * `interval` - Index of the interval being solved
    ///
    /// # Errors
    ///
    /// Returns a `BackendError` if the backend fails before producing a status.
    fn solve(
        &mut self,
        network: &FlowNetwork,
        params: &SimulationParameters,
        interval: usize,
    ) -> Result<SolveOutcome, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flows_of_matches_both_directions() {
        let mut r = SolvedInterval::new();
        r.set_flow("bus_el", "battery", 2.0);
        r.set_flow("battery", "bus_el", 1.0);
        r.set_flow("bus_h2", "storage", 5.0);

        let touching: Vec<_> = r.flows_of("battery").collect();
        assert_eq!(touching.len(), 2);
        assert_eq!(r.flow("bus_h2", "storage"), Some(5.0));
        assert_eq!(r.flow("storage", "bus_h2"), None);
    }

    #[test]
    fn status_display() {
        assert_eq!(SolveStatus::Infeasible.to_string(), "infeasible");
    }
}
