//! Interval-by-interval simulation driver.

use std::fmt;

use tracing::{debug, error, info};

use crate::error::{SimError, SimResult};
use crate::network::FlowNetwork;
use crate::network::solver::{SolveStatus, SolvedInterval, Solver};

use super::clock::Clock;
use super::system::System;

/// Relative tolerance for coupled split-device flows.
const COUPLING_TOLERANCE: f64 = 1e-6;

/// Position of the driver within the current interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No interval started yet.
    Idle,
    Prepared,
    Modeled,
    Solved,
    /// Results applied; the next interval may start.
    Updated,
    /// Every interval has been simulated.
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Prepared => "prepared",
            Self::Modeled => "modeled",
            Self::Solved => "solved",
            Self::Updated => "updated",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Drives a [`System`] through prepare, model, solve and update for every
/// interval.
///
/// Generic over `S: Solver` for static dispatch. The phase methods can be
/// called one by one; calling one out of order fails with
/// `SimError::Lifecycle` and leaves the driver unchanged.
pub struct Simulation<S: Solver> {
    system: System,
    solver: S,
    clock: Clock,
    phase: Phase,
    interval: Option<usize>,
    network: Option<FlowNetwork>,
    results: Option<SolvedInterval>,
}

impl<S: Solver> Simulation<S> {
    /// Creates a driver and resolves the system's foreign states.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if a foreign state cannot be resolved.
    pub fn new(mut system: System, solver: S) -> SimResult<Self> {
        system.resolve_foreign_states()?;
        let clock = Clock::new(system.params().n_intervals);
        Ok(Self {
            system,
            solver,
            clock,
            phase: Phase::Idle,
            interval: None,
            network: None,
            results: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Interval currently being simulated.
    pub fn interval(&self) -> Option<usize> {
        self.interval
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    /// Flow network of the current interval, once built.
    pub fn network(&self) -> Option<&FlowNetwork> {
        self.network.as_ref()
    }

    fn expect_phase(&self, allowed: &[Phase]) -> SimResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(SimError::Lifecycle {
                expected: allowed[0],
                found: self.phase,
            })
        }
    }

    fn current_interval(&self) -> usize {
        self.interval.unwrap_or(0)
    }

    /// Starts the next interval and prepares every component.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Lifecycle` if the previous interval is not
    /// complete or the run is over, or the first component error.
    pub fn prepare(&mut self) -> SimResult<()> {
        self.expect_phase(&[Phase::Idle, Phase::Updated])?;
        let Some(interval) = self.clock.peek() else {
            self.phase = Phase::Finished;
            return Err(SimError::Lifecycle {
                expected: Phase::Idle,
                found: Phase::Finished,
            });
        };
        self.system.prepare_all(interval)?;
        self.clock.tick();
        self.interval = Some(interval);
        self.phase = Phase::Prepared;
        debug!(interval, "components prepared");
        Ok(())
    }

    /// Builds the interval's flow network.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Lifecycle` before [`prepare`](Self::prepare) or a
    /// `SimError::Network` if the network is inconsistent.
    pub fn build_model(&mut self) -> SimResult<()> {
        self.expect_phase(&[Phase::Prepared])?;
        let network = self.system.build_network(self.current_interval())?;
        self.network = Some(network);
        self.phase = Phase::Modeled;
        Ok(())
    }

    /// Hands the network to the solver.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Infeasible` for any status other than optimal,
    /// `SimError::Solver` if the backend fails and
    /// `SimError::CouplingViolated` if coupled flows differ.
    pub fn solve(&mut self) -> SimResult<()> {
        self.expect_phase(&[Phase::Modeled])?;
        let interval = self.current_interval();
        let Some(network) = self.network.as_ref() else {
            return Err(SimError::Lifecycle {
                expected: Phase::Modeled,
                found: self.phase,
            });
        };
        let outcome = self
            .solver
            .solve(network, self.system.params(), interval)
            .map_err(|source| SimError::Solver { interval, source })?;
        if outcome.status != SolveStatus::Optimal {
            error!(interval, status = %outcome.status, "solver did not find an optimum");
            return Err(SimError::Infeasible {
                interval,
                status: outcome.status,
            });
        }
        check_coupling(network, &outcome.results, interval)?;
        self.results = Some(outcome.results);
        self.phase = Phase::Solved;
        Ok(())
    }

    /// Applies the solved results and discards the interval's network.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Lifecycle` before [`solve`](Self::solve) or the
    /// first component error.
    pub fn update(&mut self) -> SimResult<()> {
        self.expect_phase(&[Phase::Solved])?;
        let interval = self.current_interval();
        let Some(results) = self.results.take() else {
            return Err(SimError::Lifecycle {
                expected: Phase::Solved,
                found: self.phase,
            });
        };
        self.system.apply_results(&results, interval)?;
        self.network = None;
        self.phase = if self.clock.is_finished() {
            Phase::Finished
        } else {
            Phase::Updated
        };
        if self.system.params().print_progress {
            info!(
                interval,
                total = self.clock.total(),
                "interval {}/{} done",
                interval + 1,
                self.clock.total()
            );
        }
        Ok(())
    }

    /// Runs one full interval.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - An interval was simulated
    /// * `Ok(false)` - Every interval has already been simulated
    ///
    /// # Errors
    ///
    /// See the phase methods.
    pub fn step(&mut self) -> SimResult<bool> {
        if self.phase == Phase::Finished || self.clock.is_finished() {
            return Ok(false);
        }
        self.prepare()?;
        self.build_model()?;
        self.solve()?;
        self.update()?;
        Ok(true)
    }

    /// Simulates every remaining interval, then computes the cost
    /// summaries.
    ///
    /// # Errors
    ///
    /// Stops at the first error; results of completed intervals are lost.
    pub fn run(mut self) -> SimResult<System> {
        info!(
            intervals = self.clock.remaining(),
            components = self.system.components().count(),
            "simulation started"
        );
        while self.step()? {}
        self.system.generate_results()?;
        info!("simulation finished");
        Ok(self.system)
    }
}

/// Checks that every equality constraint holds in the solved flows.
///
/// A flow the solver did not report counts as 0.
fn check_coupling(network: &FlowNetwork, results: &SolvedInterval, interval: usize) -> SimResult<()> {
    for constraint in network.constraints() {
        let [a, b] = &constraint.flows;
        let left = results.flow(&a.0, &a.1).unwrap_or(0.0);
        let right = results.flow(&b.0, &b.1).unwrap_or(0.0);
        let scale = left.abs().max(right.abs()).max(1.0);
        if (left - right).abs() > COUPLING_TOLERANCE * scale {
            return Err(SimError::CouplingViolated {
                constraint: constraint.name.clone(),
                interval,
                left,
                right,
            });
        }
    }
    Ok(())
}
