//! CSV and JSON export of simulation results.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::accounting::CostSummary;
use crate::sim::system::System;

const HEADER: [&str; 4] = ["component", "series", "interval", "value"];

/// Exports every state, flow and per-interval result to a CSV file.
///
/// # Arguments
///
/// * `system` - System after the run
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(system: &System, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(system, io::BufWriter::new(file))
}

/// Writes results in long format, one row per component, series and
/// interval. Intervals without a value are skipped.
///
/// Flow series are named `from->to`.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(system: &System, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER)?;

    for component in system.components() {
        let base = component.base();
        let named = base
            .states
            .iter()
            .chain(base.results.iter())
            .map(|(name, slots)| (name.clone(), slots));
        let flows = base
            .flows
            .iter()
            .map(|((from, to), slots)| (format!("{from}->{to}"), slots));
        for (series, slots) in named.chain(flows) {
            for (interval, value) in slots.iter().enumerate() {
                if let Some(value) = value {
                    let interval = interval.to_string();
                    let value = value.to_string();
                    wtr.write_record([
                        base.name.as_str(),
                        series.as_str(),
                        interval.as_str(),
                        value.as_str(),
                    ])?;
                }
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Cost summaries keyed by component name; components without a summary
/// are left out.
pub fn summaries(system: &System) -> BTreeMap<&str, &CostSummary> {
    system
        .components()
        .filter_map(|c| Some((c.name(), c.base().summary.as_ref()?)))
        .collect()
}

/// Writes the cost summaries as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
pub fn write_summaries_json(system: &System, writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(writer, &summaries(system)).map_err(io::Error::other)
}

/// Exports the cost summaries to a JSON file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_summaries_json(system: &System, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_summaries_json(system, io::BufWriter::new(file))
}
