use clap::Parser;
use lanesim::{SimConfig, Simulation, SpawnController, SpawnPolicy};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

/// Runs a headless multi-lane traffic simulation.
#[derive(Parser)]
#[command(name = "lanesim", about = "Headless multi-lane traffic simulation")]
struct Cli {
    /// Path to a JSON simulation configuration
    config: Option<PathBuf>,
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 3600)]
    ticks: usize,
    /// Ticks between vehicle spawns
    #[arg(long, default_value_t = 24)]
    spawn_interval: usize,
    /// Probability that a spawned vehicle uses the IDM and MOBIL models
    #[arg(long, default_value_t = 0.4)]
    smart_ratio: f64,
    /// Random seed, overriding the configuration
    #[arg(long)]
    seed: Option<u64>,
    /// Pace the simulation at this many ticks per second instead of running flat out
    #[arg(long)]
    rate: Option<f64>,
    /// Print the final vehicle snapshot as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> lanesim::Result<()> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let mut sim = Simulation::new(config)?;
    let policy = SpawnPolicy {
        interval: cli.spawn_interval,
        smart_ratio: cli.smart_ratio,
        ..Default::default()
    };
    let spawn_seed = sim.config().seed.map(|seed| seed.wrapping_add(1));
    let mut spawner = SpawnController::new(policy, spawn_seed)?;
    let period = cli
        .rate
        .filter(|rate| *rate > 0.0)
        .map(|rate| Duration::from_secs_f64(1.0 / rate));

    let start = Instant::now();
    let mut exited = 0;
    for _ in 0..cli.ticks {
        let tick_start = Instant::now();
        spawner.tick(&mut sim);
        exited += sim.step_default().len();
        if let Some(period) = period {
            if let Some(remaining) = period.checked_sub(tick_start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
        if sim.frame() % 600 == 0 {
            info!(
                "frame {}: {} vehicles on track, {} exited",
                sim.frame(),
                sim.vehicle_count(),
                exited
            );
        }
    }

    let frame = start.elapsed().div_f64(cli.ticks.max(1) as f64);
    println!(
        "Simulated {} frames (avg. {:?}/frame): {} vehicles on track, {} exited",
        sim.frame(),
        frame,
        sim.vehicle_count(),
        exited
    );
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&sim.snapshot())?);
    }
    Ok(())
}
