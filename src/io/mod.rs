//! File input and output: time series in, results out.

pub mod export;
pub mod timeseries;
