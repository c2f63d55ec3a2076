use std::env;
use std::path::PathBuf;

pub struct CliOptions {
    pub model: PathBuf,
    pub network_out: Option<PathBuf>,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    if args.len() == 1 && (args[0] == "--help" || args[0] == "-h") {
        print_usage();
        std::process::exit(0);
    }
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut model = None;
    let mut network_out = None;

    while i < args.len() {
        match args[i].as_str() {
            "--model" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --model (expected a TOML or JSON file path)",
                )?;
                if model.replace(PathBuf::from(path)).is_some() {
                    return Err("--model provided more than once".to_string());
                }
            }
            "--network-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --network-out (expected a file path)",
                )?;
                if network_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--network-out provided more than once".to_string());
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    let model = model.ok_or_else(|| "missing required argument --model".to_string())?;
    Ok(CliOptions { model, network_out })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("smooth-sim: builds the flow network of the first interval of a model");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  smooth-sim --model <path> [--network-out <path>]");
    eprintln!();
    eprintln!("The network is written as JSON to stdout unless --network-out is given.");
}
