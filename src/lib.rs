//! Component library for time-stepped energy-system simulation.
//!
//! Components are configured from a model file, add themselves to a flow
//! network every interval, and read back the results an external
//! optimization backend produces for it.

pub mod accounting;
pub mod components;
pub mod config;
pub mod error;
/// Real-gas properties of hydrogen.
pub mod hydrogen;
pub mod io;
/// Flow network and solver seam.
pub mod network;
pub mod piecewise;
/// Simulation parameters, system assembly and the interval driver.
pub mod sim;
