//! Piecewise linearization of non-linear conversion curves.
//!
//! A device is described by a normalized breakpoint table mapping load
//! fraction to efficiency. Scaling the table by a maximum throughput yields
//! consumption breakpoints; multiplying each by its efficiency and an energy
//! content factor yields production breakpoints.

use crate::error::ConfigError;

const EPS: f64 = 1e-9;

/// Ordered `(load fraction, efficiency)` pairs.
///
/// Load fractions are non-decreasing from 0.0 to 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointTable {
    load: Vec<f64>,
    efficiency: Vec<f64>,
}

impl BreakpointTable {
    /// Creates a validated table.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the lengths differ, fewer than two points
    /// are given, or the load fractions do not run non-decreasingly from 0.0
    /// to 1.0.
    pub fn new(load: Vec<f64>, efficiency: Vec<f64>) -> Result<Self, ConfigError> {
        if load.len() != efficiency.len() {
            return Err(ConfigError::new(
                "breakpoints",
                format!(
                    "{} load fractions but {} efficiencies",
                    load.len(),
                    efficiency.len()
                ),
            ));
        }
        if load.len() < 2 {
            return Err(ConfigError::new("breakpoints", "need at least two points"));
        }
        if load[0].abs() > EPS || (load[load.len() - 1] - 1.0).abs() > EPS {
            return Err(ConfigError::new(
                "breakpoints",
                "load fractions must start at 0.0 and end at 1.0",
            ));
        }
        if load.windows(2).any(|w| w[1] < w[0]) {
            return Err(ConfigError::new(
                "breakpoints",
                "load fractions must be non-decreasing",
            ));
        }
        Ok(Self { load, efficiency })
    }

    /// Two-point table with the same efficiency at no load and full load.
    pub fn constant(efficiency: f64) -> Self {
        Self {
            load: vec![0.0, 1.0],
            efficiency: vec![efficiency, efficiency],
        }
    }

    pub fn load(&self) -> &[f64] {
        &self.load
    }

    pub fn efficiency(&self) -> &[f64] {
        &self.efficiency
    }

    /// Efficiency at full load.
    pub fn full_load_efficiency(&self) -> f64 {
        self.efficiency.last().copied().unwrap_or(0.0)
    }

    /// Consumption at each breakpoint: `load * max_throughput`.
    pub fn consumption(&self, max_throughput: f64) -> Vec<f64> {
        self.load.iter().map(|l| l * max_throughput).collect()
    }

    /// Builds the conversion curve for a device.
    ///
    /// # Arguments
    ///
    /// * `max_throughput` - Input at full load
    /// * `energy_content` - Factor from input units to output units
    pub fn curve(&self, max_throughput: f64, energy_content: f64) -> PiecewiseCurve {
        let input = self.consumption(max_throughput);
        let output = input
            .iter()
            .zip(&self.efficiency)
            .map(|(c, eff)| c * eff * energy_content)
            .collect();
        PiecewiseCurve { input, output }
    }
}

/// Input and output breakpoints of a piecewise-linear conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseCurve {
    pub input: Vec<f64>,
    pub output: Vec<f64>,
}

impl PiecewiseCurve {
    pub fn new(input: Vec<f64>, output: Vec<f64>) -> Self {
        Self { input, output }
    }

    /// Same curve with every input breakpoint multiplied by `factor`.
    pub fn scale_input(&self, factor: f64) -> Self {
        Self {
            input: self.input.iter().map(|x| x * factor).collect(),
            output: self.output.clone(),
        }
    }

    pub fn max_input(&self) -> f64 {
        self.input.last().copied().unwrap_or(0.0)
    }

    /// Slope of each segment; zero-width segments have slope 0.
    pub fn slopes(&self) -> Vec<f64> {
        self.input
            .windows(2)
            .zip(self.output.windows(2))
            .map(|(x, y)| {
                let dx = x[1] - x[0];
                if dx.abs() < EPS { 0.0 } else { (y[1] - y[0]) / dx }
            })
            .collect()
    }

    /// Output for `input`, interpolated linearly between breakpoints.
    ///
    /// Returns `None` outside the breakpoint range.
    pub fn output_at(&self, input: f64) -> Option<f64> {
        let first = *self.input.first()?;
        let last = *self.input.last()?;
        if input < first - EPS || input > last + EPS {
            return None;
        }
        for (x, y) in self.input.windows(2).zip(self.output.windows(2)) {
            if input <= x[1] + EPS {
                let dx = x[1] - x[0];
                if dx.abs() < EPS {
                    return Some(y[1]);
                }
                return Some(y[0] + (input - x[0]) * (y[1] - y[0]) / dx);
            }
        }
        self.output.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_malformed_tables() {
        assert!(BreakpointTable::new(vec![0.0, 1.0], vec![0.5]).is_err());
        assert!(BreakpointTable::new(vec![0.0], vec![0.5]).is_err());
        assert!(BreakpointTable::new(vec![0.1, 1.0], vec![0.5, 0.5]).is_err());
        assert!(BreakpointTable::new(vec![0.0, 0.9], vec![0.5, 0.5]).is_err());
        assert!(BreakpointTable::new(vec![0.0, 0.6, 0.4, 1.0], vec![0.5; 4]).is_err());
        assert!(BreakpointTable::new(vec![0.0, 0.5, 0.5, 1.0], vec![0.5; 4]).is_ok());
    }

    #[test]
    fn curve_multiplies_efficiency_and_energy_content() {
        let table = BreakpointTable::new(vec![0.0, 0.5, 1.0], vec![0.3, 0.4, 0.5]).unwrap();
        let curve = table.curve(10.0, 2.0);
        assert_eq!(curve.input, vec![0.0, 5.0, 10.0]);
        assert_eq!(curve.output, vec![0.0, 4.0, 10.0]);
        assert_eq!(curve.slopes(), vec![0.8, 1.2]);
    }

    #[test]
    fn output_at_interpolates() {
        let curve = PiecewiseCurve::new(vec![0.0, 2.0, 4.0], vec![0.0, 10.0, 14.0]);
        assert_eq!(curve.output_at(1.0), Some(5.0));
        assert_eq!(curve.output_at(3.0), Some(12.0));
        assert_eq!(curve.output_at(4.0), Some(14.0));
        assert_eq!(curve.output_at(4.5), None);
        assert_eq!(curve.output_at(-0.1), None);
    }

    #[test]
    fn zero_width_segment_has_zero_slope() {
        let curve = PiecewiseCurve::new(vec![0.0, 1.0, 1.0, 2.0], vec![0.0, 1.0, 1.5, 2.5]);
        assert_eq!(curve.slopes(), vec![1.0, 0.0, 1.0]);
    }

    fn table_strategy() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
        prop::collection::vec((0.0f64..1.0, 0.1f64..0.9), 0..6).prop_map(|inner| {
            let mut load: Vec<f64> = inner.iter().map(|(l, _)| *l).collect();
            load.sort_by(|a, b| a.total_cmp(b));
            load.insert(0, 0.0);
            load.push(1.0);
            let mut eff: Vec<f64> = inner.iter().map(|(_, e)| *e).collect();
            eff.insert(0, 0.4);
            eff.push(0.4);
            (load, eff)
        })
    }

    proptest! {
        #[test]
        fn consumption_scales_load((load, eff) in table_strategy(), max in 1.0f64..1e6) {
            let table = BreakpointTable::new(load.clone(), eff).unwrap();
            let consumption = table.consumption(max);
            prop_assert_eq!(consumption.len(), load.len());
            for (c, l) in consumption.iter().zip(&load) {
                prop_assert!((c - l * max).abs() <= 1e-9 * max);
            }
            prop_assert!(consumption.windows(2).all(|w| w[0] <= w[1]));
            prop_assert_eq!(consumption[0], 0.0);
            prop_assert!((consumption[consumption.len() - 1] - max).abs() <= 1e-9 * max);
        }

        #[test]
        fn halving_input_keeps_output((load, eff) in table_strategy(), max in 1.0f64..1e4) {
            let curve = BreakpointTable::new(load, eff).unwrap().curve(max, 33.33);
            let half = curve.scale_input(0.5);
            prop_assert_eq!(&half.output, &curve.output);
            for (h, full) in half.input.iter().zip(&curve.input) {
                prop_assert!((h - full / 2.0).abs() <= 1e-12 * max);
            }
        }
    }
}
