//! # engine_app: Simulation driver
//!
//! Headless driver for the ECS storage layer. It registers the engine's
//! component kinds, spawns a population, runs the fixed-timestep loop and
//! checks that the resulting world survives a snapshot round trip.
//!
//! ## Startup Sequence
//!
//! 1. Parse arguments and initialise logging.
//! 2. Build and install the process-wide type table.
//! 3. Spawn the population and run the tick loop.
//! 4. Save the world, reload it and verify the encoding is stable.

mod components;
mod config;
mod persist;
mod tick;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use engine_ecs::TypeRegistry;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{SimConfig, TickConfig};
use tick::TickLoop;

#[derive(Parser)]
#[command(name = "engine_app", about = "Headless ECS simulation driver")]
struct Args {
    /// Number of entities to spawn
    #[arg(short, long, default_value = "1000")]
    entities: u32,

    /// Number of ticks to run
    #[arg(short, long, default_value = "600")]
    ticks: u64,

    /// Target ticks per second
    #[arg(long, default_value = "60")]
    tick_rate: f64,

    /// Sleep between ticks to hold the tick rate
    #[arg(long)]
    realtime: bool,

    /// Health lost per second by every entity
    #[arg(long, default_value = "10")]
    health_decay: f32,

    /// Write the final world snapshot to this file
    #[arg(short, long)]
    snapshot: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<SimConfig> {
        let config = SimConfig::default()
            .with_entities(self.entities)
            .with_health_decay(self.health_decay)
            .with_tick(TickConfig {
                tick_rate: self.tick_rate,
                max_ticks: self.ticks,
                realtime: self.realtime,
            });
        let config = match self.snapshot {
            Some(path) => config.with_snapshot_path(path),
            None => config,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("engine_app=info".parse()?)
                .add_directive("engine_ecs=info".parse()?),
        )
        .init();

    let config = Args::parse().into_config()?;
    info!(?config, "engine simulation starting");

    let mut types = TypeRegistry::new();
    components::register_all(&mut types);
    let types = types.install()?;
    info!(kinds = types.len(), "installed component types");

    let mut tick_loop = TickLoop::new(&config);
    tick_loop.spawn_population(config.entities)?;
    let report = tick_loop.run()?;
    info!(?report, "simulation finished");

    let registry = tick_loop.into_registry();
    let (restored, bytes) = match &config.snapshot_path {
        Some(path) => {
            let written = persist::save_to_file(&registry, path)?;
            let reloaded = persist::load_from_file(path)?;
            persist::verify_stable(&reloaded, &written)?;
            (reloaded, written.len())
        }
        None => {
            let encoded = registry.save_global()?;
            (persist::verify_round_trip(&encoded)?, encoded.len())
        }
    };
    info!(
        entities = restored.entity_count(),
        stores = restored.store_count(),
        bytes,
        "snapshot round trip verified"
    );

    Ok(())
}
