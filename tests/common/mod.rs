//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use smooth_sim::config::ModelConfig;
use smooth_sim::error::BackendError;
use smooth_sim::network::solver::{SolveOutcome, SolveStatus, SolvedInterval, Solver};
use smooth_sim::network::{EntityKind, FlowNetwork};
use smooth_sim::sim::params::SimulationParameters;
use smooth_sim::sim::system::System;

/// Builds a system from an inline TOML model.
pub fn system_from_toml(toml: &str) -> System {
    let model = ModelConfig::from_toml_str(toml).expect("model parses");
    System::from_model(model).expect("model builds")
}

/// Writes a single-column profile with header `load` into `dir`.
pub fn write_profile(dir: &Path, filename: &str, values: &[f64]) -> PathBuf {
    let mut content = String::from("load\n");
    for v in values {
        content.push_str(&format!("{v}\n"));
    }
    let path = dir.join(filename);
    fs::write(&path, content).expect("profile written");
    path
}

/// Solves a network as if nothing happened: free flows are 0, fixed flows
/// follow their profile and storages only self-discharge.
#[derive(Debug, Default)]
pub struct IdleSolver {
    pub calls: usize,
}

/// The idle solution of `network`.
pub fn idle_solution(network: &FlowNetwork) -> SolvedInterval {
    let mut solved = SolvedInterval::new();
    for entity in network.entities() {
        for (bus, flow) in &entity.inputs {
            let value = flow.fix.map_or(0.0, |f| f * flow.nominal_value.unwrap_or(1.0));
            solved.set_flow(bus.clone(), entity.label.clone(), value);
        }
        for (bus, flow) in &entity.outputs {
            let value = flow.fix.map_or(0.0, |f| f * flow.nominal_value.unwrap_or(1.0));
            solved.set_flow(entity.label.clone(), bus.clone(), value);
        }
        if let EntityKind::Storage(params) = &entity.kind {
            let content = params.initial_storage_level
                * params.nominal_storage_capacity
                * (1.0 - params.loss_rate);
            solved.set_storage_content(entity.label.clone(), content);
        }
    }
    solved
}

impl Solver for IdleSolver {
    fn solve(
        &mut self,
        network: &FlowNetwork,
        _params: &SimulationParameters,
        _interval: usize,
    ) -> Result<SolveOutcome, BackendError> {
        self.calls += 1;
        Ok(SolveOutcome::optimal(idle_solution(network)))
    }
}

/// Reports the scripted status for each interval, idle results otherwise.
///
/// Intervals past the end of the script are optimal.
#[derive(Debug)]
pub struct ScriptedSolver {
    pub statuses: Vec<SolveStatus>,
}

impl Solver for ScriptedSolver {
    fn solve(
        &mut self,
        network: &FlowNetwork,
        _params: &SimulationParameters,
        interval: usize,
    ) -> Result<SolveOutcome, BackendError> {
        let status = self
            .statuses
            .get(interval)
            .copied()
            .unwrap_or(SolveStatus::Optimal);
        Ok(SolveOutcome {
            status,
            results: idle_solution(network),
        })
    }
}

/// Ignores equality constraints: puts `value` on the first flow of every
/// constraint and leaves the second at 0.
#[derive(Debug)]
pub struct ConstraintBreaker {
    pub value: f64,
}

impl Solver for ConstraintBreaker {
    fn solve(
        &mut self,
        network: &FlowNetwork,
        _params: &SimulationParameters,
        _interval: usize,
    ) -> Result<SolveOutcome, BackendError> {
        let mut solved = idle_solution(network);
        for constraint in network.constraints() {
            let (from, to) = &constraint.flows[0];
            solved.set_flow(from.clone(), to.clone(), self.value);
        }
        Ok(SolveOutcome::optimal(solved))
    }
}

/// Backend that always fails.
#[derive(Debug)]
pub struct BrokenBackend;

impl Solver for BrokenBackend {
    fn solve(
        &mut self,
        _network: &FlowNetwork,
        _params: &SimulationParameters,
        _interval: usize,
    ) -> Result<SolveOutcome, BackendError> {
        Err(BackendError::new("license expired"))
    }
}
