// Scenario Runner - Load and run synthetic delivery scenarios
//
// Usage:
//   cargo run --bin scenario_runner scenarios/baseline.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/baseline.yaml --seed 42
//   cargo run --bin scenario_runner scenarios/baseline.yaml --random --json out/ --snapshot out/

mod delivery;

use delivery::{DeliveryRunner, DeliveryScenario};
use log::{error, info};
use simple_logger::SimpleLogger;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
struct Options {
    seed: Option<u64>,
    random: bool,
    json_dir: Option<PathBuf>,
    snapshot_dir: Option<PathBuf>,
}

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .env()
        .init()
        .unwrap_or_else(|e| eprintln!("logger already initialised: {}", e));

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);
    let options = parse_options(&args[2..]).unwrap_or_else(|msg| {
        eprintln!("Error: {}", msg);
        print_usage(&args[0]);
        std::process::exit(1);
    });

    if path.is_file() {
        run_scenario_file(path, &options);
    } else if path.is_dir() {
        run_scenario_directory(path, &options);
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    eprintln!(
        "Usage: {} <scenario.yaml | directory/> [--seed N] [--random] [--json DIR] [--snapshot DIR]",
        program
    );
    eprintln!("\nExamples:");
    eprintln!("  {} scenarios/baseline.yaml", program);
    eprintln!("  {} scenarios/", program);
    eprintln!("  {} scenarios/baseline.yaml --seed 42 --json out/", program);
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--seed" => {
                let value = iter.next().ok_or("--seed needs a value")?;
                options.seed = Some(parse_seed(value)?);
            }
            "--random" => options.random = true,
            "--json" => {
                let value = iter.next().ok_or("--json needs a directory")?;
                options.json_dir = Some(PathBuf::from(value));
            }
            "--snapshot" => {
                let value = iter.next().ok_or("--snapshot needs a directory")?;
                options.snapshot_dir = Some(PathBuf::from(value));
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    if options.random && options.seed.is_some() {
        return Err("--seed and --random are mutually exclusive".to_string());
    }
    Ok(options)
}

/// Decimal, or hex with a 0x prefix
fn parse_seed(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid seed {}: {}", value, e))
}

fn run_scenario_directory(dir: &Path, options: &Options) {
    let mut scenarios = Vec::new();

    // Find all .yaml files
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                scenarios.push(path);
            }
        }
    }

    scenarios.sort();

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        std::process::exit(1);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  SCENARIO RUNNER - Multiple Scenarios                  ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    println!("Found {} scenario(s) to run\n", scenarios.len());

    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!(
            "\n{}/{} Running: {}\n",
            i + 1,
            scenarios.len(),
            scenario_path.display()
        );
        run_scenario_file(scenario_path, options);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  All scenarios complete!                               ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
}

fn run_scenario_file(path: &Path, options: &Options) {
    println!("Loading scenario from: {}", path.display());

    let yaml_content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let scenario: DeliveryScenario = serde_yaml::from_str(&yaml_content).unwrap_or_else(|e| {
        eprintln!("Failed to parse {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scenario")
        .to_string();

    // Print scenario header
    println!("\n╔════════════════════════════════════════════════════════╗");
    match scenario.meta.name {
        Some(ref name) => println!("║  {}", name),
        None => println!("║  Scenario: {}", stem),
    }
    println!("╚════════════════════════════════════════════════════════╝\n");

    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }

    let mission = &scenario.mission;
    println!("Configuration:");
    println!("  Ticks: {}", mission.len_simulation);
    println!("  Drones: {}", mission.n_drones);
    println!("  Routing: {}", mission.routing_algorithm);
    println!("  Channel: {}", mission.communication_error_type);
    println!(
        "  Event probability: {:.3}",
        scenario.workload.event_probability
    );
    println!("\nStarting simulation...\n");

    let seed = if options.random {
        Some(DeliveryScenario::random_seed())
    } else {
        options.seed
    };

    let mut result = DeliveryRunner::new(scenario, seed).run();
    result.print_summary();

    for dir in [&options.json_dir, &options.snapshot_dir].into_iter().flatten() {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("Failed to create {}: {}", dir.display(), e);
            std::process::exit(1);
        }
    }

    if let Some(ref dir) = options.json_dir {
        let target = dir.join(format!("{}_{}.json", stem, result.seed_used));
        match result.metrics.export_json(&target) {
            Ok(()) => info!("report written to {}", target.display()),
            Err(e) => {
                error!("failed to export report: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(ref dir) = options.snapshot_dir {
        let target = dir.join(format!("{}_{}.snapshot", stem, result.seed_used));
        if let Err(e) = result.metrics.persist(&target) {
            error!("failed to persist snapshot: {}", e);
            std::process::exit(1);
        }
    }

    println!("\n✓ Scenario complete!\n");
}
