//! smooth-sim entry point: loads a model and writes the first interval's
//! flow network for an external solver.

use std::fs;
use std::process;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use smooth_sim::config::ModelConfig;
use smooth_sim::sim::system::System;

mod cli;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(opts: &cli::CliOptions) -> Result<(), String> {
    let model = ModelConfig::from_file(&opts.model).map_err(|e| e.to_string())?;

    let errors = model.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!(field = %e.field, "{}", e.message);
        }
        return Err(format!("{} invalid model parameter(s)", errors.len()));
    }

    let mut system = System::from_model(model).map_err(|e| e.to_string())?;
    system.resolve_foreign_states().map_err(|e| e.to_string())?;
    info!(
        components = system.components().count(),
        buses = system.buses().len(),
        "model loaded"
    );

    system.prepare_all(0).map_err(|e| e.to_string())?;
    let network = system.build_network(0).map_err(|e| e.to_string())?;
    let json = network
        .to_json()
        .map_err(|e| format!("failed to serialize network: {e}"))?;

    match &opts.network_out {
        Some(path) => {
            fs::write(path, json)
                .map_err(|e| format!("failed to write \"{}\": {e}", path.display()))?;
            info!(path = %path.display(), "network written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn main() {
    init_tracing();

    let opts = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(2);
        }
    };

    if let Err(e) = run(&opts) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
