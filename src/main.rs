//! skyfall - meteorite lifecycle engine
//!
//! Headless server that runs flat worlds, spawns meteorites and streams the
//! resulting world events as JSON lines.

mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use skyfall_core::{BlockPos, WorldPoint};
use skyfall_meteor::{MeteorEngine, SystemClock};
use skyfall_server::{Server, TICK_DURATION};
use skyfall_testkit::{flat_worlds, EventRecord, JsonlSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the meteorite engine headless", long_about = None)]
struct Args {
    /// Meteor configuration file.
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Override the registry file from the configuration.
    #[arg(long)]
    registry: Option<PathBuf>,
    /// World to load; repeatable. Defaults to the random-meteor world.
    #[arg(long = "world")]
    worlds: Vec<String>,
    /// Meteorite type to spawn once the server is up.
    #[arg(long)]
    spawn: Option<String>,
    /// Column for `--spawn`, as `X,Z`.
    #[arg(long, value_parser = parse_column, default_value = "0,0")]
    at: (i32, i32),
    /// Number of ticks to run (20 per second).
    #[arg(long, default_value_t = 1200)]
    ticks: u64,
    /// Run ticks back to back in simulated time instead of at 20 per second.
    /// Cleanup delays then elapse sooner than the registry's wall-clock timestamps say.
    #[arg(long)]
    fast: bool,
    /// Write world events to this JSONL file.
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long, default_value_t = 1337)]
    seed: u64,
}

fn parse_column(input: &str) -> Result<(i32, i32)> {
    let Some((x, z)) = input.split_once(',') else {
        bail!("expected X,Z but got '{input}'");
    };
    let x = x
        .trim()
        .parse()
        .with_context(|| format!("invalid X coordinate '{x}'"))?;
    let z = z
        .trim()
        .parse()
        .with_context(|| format!("invalid Z coordinate '{z}'"))?;
    Ok((x, z))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting skyfall v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut settings = config::load_settings_from_path(&args.config);
    if let Some(registry) = &args.registry {
        settings.settings.registry_file = registry.clone();
    }

    let mut names = args.worlds.clone();
    if names.is_empty() {
        names.push(settings.random.world.clone());
    }
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let worlds = flat_worlds(&name_refs);

    let engine = MeteorEngine::new(settings, Arc::new(SystemClock), args.seed);
    let mut server = Server::new(worlds, engine);
    server.start();

    if let Some(type_id) = &args.spawn {
        let (x, z) = args.at;
        let point = WorldPoint::new(names[0].as_str(), BlockPos::new(x, 0, z));
        match server.spawn_meteorite(&point, type_id) {
            Ok(id) => info!(%id, %point, "Meteorite spawned"),
            Err(err) => warn!(%point, "Could not spawn '{type_id}': {err}"),
        }
    }

    let mut sink = match &args.events {
        Some(path) => Some(JsonlSink::create(path)?),
        None => None,
    };
    let period = if args.fast {
        Duration::ZERO
    } else {
        TICK_DURATION
    };
    server.run_paced(args.ticks, period, |tick, world, event| {
        if let Some(sink) = sink.as_mut() {
            sink.write(&EventRecord {
                tick,
                world,
                payload: event,
            })?;
        }
        Ok(())
    })?;

    if let Some(mut sink) = sink {
        sink.flush()?;
        info!(events = sink.written(), "Event stream written");
    }
    server.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_column_accepts_pairs() {
        assert_eq!(parse_column("12,-4").unwrap(), (12, -4));
        assert_eq!(parse_column(" 3 , 7 ").unwrap(), (3, 7));
    }

    #[test]
    fn parse_column_rejects_garbage() {
        assert!(parse_column("12").is_err());
        assert!(parse_column("a,4").is_err());
        assert!(parse_column("1,2,3").is_err());
    }

    #[test]
    fn args_parse_defaults() {
        let args = Args::parse_from(["skyfall"]);
        assert_eq!(args.ticks, 1200);
        assert_eq!(args.seed, 1337);
        assert_eq!(args.at, (0, 0));
        assert!(args.worlds.is_empty());
        assert!(!args.fast);
    }
}
