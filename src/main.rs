/*
 * Flocking Simulation Driver
 *
 * Headless frame driver for the flocking engine. It loads a scene config,
 * builds and couples the configured flocks, and runs them for a number of
 * ticks while logging per-tick summaries:
 * 1. Optional silhouette polygons are loaded once and applied every tick
 * 2. Each tick advances every flock through the registry
 * 3. Every `report_every` ticks the flock counters are logged
 *
 * Set RUST_LOG=debug to see per-flock step logs.
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use flocking::{BoundaryFrame, BoundarySpec, FlockRegistry, SimulationConfig};

#[derive(Parser)]
#[command(name = "flocking")]
#[command(about = "Run coupled boid flocks without a window")]
struct Cli {
    /// Path to a scene config (JSON); defaults to two coupled flocks
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to run, overriding the config
    #[arg(long)]
    ticks: Option<u64>,

    /// Base random seed, overriding the config
    #[arg(long)]
    seed: Option<u64>,

    /// Silhouette polygons (JSON `{ polygons, image_to_world }`); without a
    /// transform the polygons are taken as world coordinates
    #[arg(long)]
    boundary: Option<PathBuf>,

    /// Log a summary every N ticks
    #[arg(long, default_value_t = 60)]
    report_every: u64,

    /// Print the demo config and exit
    #[arg(long)]
    dump_default_config: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if cli.dump_default_config {
        println!("{}", SimulationConfig::demo().to_json()?);
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SimulationConfig::demo(),
    };
    if let Some(ticks) = cli.ticks {
        config.ticks = ticks;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let boundary = cli.boundary.as_deref().map(load_boundary).transpose()?;

    let mut registry = FlockRegistry::from_config(&config).context("Failed to build flocks")?;
    info!(
        flocks = registry.len(),
        agents = registry.total_agents(),
        ticks = config.ticks,
        seed = ?config.seed,
        "Starting flocking simulation"
    );

    let started = Instant::now();
    let report_every = cli.report_every.max(1);

    for tick in 1..=config.ticks {
        let stats = registry.step(boundary.as_ref());

        if tick % report_every == 0 || tick == config.ticks {
            for (id, stats) in &stats {
                info!(
                    tick,
                    flock = ?id,
                    agents = stats.agents,
                    mean_neighbors = stats.mean_neighbors(),
                    repelled = stats.boundary_repelled,
                    solve_us = stats.solve_time.as_micros() as u64,
                    "Tick summary"
                );
            }
        }
    }

    let elapsed = started.elapsed();
    if config.ticks > 0 {
        info!(
            ticks = config.ticks,
            elapsed_ms = elapsed.as_millis() as u64,
            ms_per_tick = elapsed.as_secs_f64() * 1000.0 / config.ticks as f64,
            "Simulation finished"
        );
    } else {
        warn!("No ticks requested; nothing was simulated");
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config(path: &Path) -> Result<SimulationConfig> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = SimulationConfig::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}

fn load_boundary(path: &Path) -> Result<BoundaryFrame> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read boundary {}", path.display()))?;
    let spec = BoundarySpec::from_json(&json).with_context(|| format!("Invalid boundary {}", path.display()))?;
    let frame = spec.build().context("Unusable image-to-world transform")?;
    info!(
        edges = frame.edge_count(),
        transformed = spec.image_to_world.is_some(),
        "Loaded silhouette"
    );
    Ok(frame)
}
