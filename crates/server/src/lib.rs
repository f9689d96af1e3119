#![warn(missing_docs)]
//! Authoritative simulation host: owns the worlds and the meteor engine and
//! drives both at a fixed tick rate.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use skyfall_core::{InstanceId, SimTick, WorldPoint, MILLIS_PER_TICK};
use skyfall_meteor::{MeteorEngine, SpawnError};
use skyfall_world::{WorldEvent, WorldSet};
use tracing::{debug, info};

/// Wall-clock length of one tick at the nominal rate.
pub const TICK_DURATION: Duration = Duration::from_millis(MILLIS_PER_TICK);

/// Summary of one server tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Tick that just completed.
    pub tick: SimTick,
    /// Falling blocks that came to rest this tick.
    pub landed: usize,
    /// Outbox events drained from every world, tagged with the world name.
    pub events: Vec<(String, WorldEvent)>,
}

/// Tick host for the meteor engine.
pub struct Server {
    worlds: WorldSet,
    engine: MeteorEngine,
    current_tick: SimTick,
    started: bool,
}

impl Server {
    /// Create a server around loaded worlds and a configured engine.
    pub fn new(worlds: WorldSet, engine: MeteorEngine) -> Self {
        Self {
            worlds,
            engine,
            current_tick: SimTick::ZERO,
            started: false,
        }
    }

    /// Restore persisted placements and start timers. Returns how many placements were restored.
    pub fn start(&mut self) -> usize {
        if self.started {
            return 0;
        }
        self.started = true;
        let restored = self.engine.load_on_startup();
        self.engine.start_random_meteors();
        info!(
            worlds = self.worlds.names().count(),
            restored, "Server started"
        );
        restored
    }

    /// Spawn a meteorite through the engine.
    pub fn spawn_meteorite(&mut self, point: &WorldPoint, type_id: &str) -> Result<InstanceId, SpawnError> {
        self.engine.create_meteorite_at(&mut self.worlds, point, type_id)
    }

    /// Run a single tick: world physics first, then landings, then engine tasks.
    pub fn tick(&mut self) -> Result<TickReport> {
        let landed = self.worlds.step();
        for landing in &landed {
            self.engine.on_block_landed(landing);
        }
        self.engine.tick(&mut self.worlds);
        self.current_tick = self.current_tick.advance(1);
        let events = self.worlds.drain_events();
        if !landed.is_empty() {
            debug!(tick = self.current_tick.0, landed = landed.len(), "Blocks landed");
        }
        Ok(TickReport {
            tick: self.current_tick,
            landed: landed.len(),
            events,
        })
    }

    /// Run `ticks` ticks back to back, handing every drained event to `on_event`.
    ///
    /// Simulated time only: tick-scheduled delays elapse faster than the wall clock.
    pub fn run<F>(&mut self, ticks: u64, on_event: F) -> Result<()>
    where
        F: FnMut(SimTick, &str, &WorldEvent) -> Result<()>,
    {
        self.run_paced(ticks, Duration::ZERO, on_event)
    }

    /// Run `ticks` ticks, starting each one no earlier than `period` after the previous.
    ///
    /// With [`TICK_DURATION`] the tick clock keeps pace with the wall clock.
    pub fn run_paced<F>(&mut self, ticks: u64, period: Duration, mut on_event: F) -> Result<()>
    where
        F: FnMut(SimTick, &str, &WorldEvent) -> Result<()>,
    {
        let mut deadline = Instant::now();
        for _ in 0..ticks {
            let report = self.tick()?;
            for (world, event) in &report.events {
                on_event(report.tick, world, event)?;
            }
            deadline += period;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
        }
        Ok(())
    }

    /// Stop the engine and flush the registry. Returns whether the registry was saved.
    pub fn shutdown(&mut self) -> bool {
        let saved = self.engine.shutdown();
        info!(tick = self.current_tick.0, saved, "Server stopped");
        saved
    }

    /// Current tick.
    pub fn current_tick(&self) -> SimTick {
        self.current_tick
    }

    /// Loaded worlds.
    pub fn worlds(&self) -> &WorldSet {
        &self.worlds
    }

    /// Meteor engine.
    pub fn engine(&self) -> &MeteorEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfall_core::BlockPos;
    use skyfall_meteor::{ManualClock, MeteorSettings, MeteoriteDefinition};
    use skyfall_testkit::{flat_worlds, TempDir};
    use std::sync::Arc;

    fn server(dir: &TempDir) -> Server {
        let mut settings = MeteorSettings::default();
        settings.settings.registry_file = dir.file("meteorites.json");
        settings.meteorites.insert(
            "small".to_string(),
            MeteoriteDefinition {
                outer_radius: 2,
                cleanup_delay_secs: 60,
                impact_message: Some("&cImpact!".to_string()),
                ..MeteoriteDefinition::default()
            },
        );
        let engine = MeteorEngine::new(settings, Arc::new(ManualClock::new(0)), 11);
        Server::new(flat_worlds(&["W"]), engine)
    }

    #[test]
    fn tick_advances_and_reports_landings() {
        let dir = TempDir::new("server_tick").unwrap();
        let mut server = server(&dir);
        server.start();
        server
            .spawn_meteorite(&WorldPoint::new("W", BlockPos::new(0, 0, 0)), "small")
            .unwrap();

        let mut landed = 0;
        for _ in 0..200 {
            landed += server.tick().unwrap().landed;
        }
        assert_eq!(server.current_tick(), SimTick(200));
        assert!(landed > 0);
        assert_eq!(server.worlds().get("W").unwrap().falling_blocks().count(), 0);
    }

    #[test]
    fn run_forwards_the_impact_broadcast() {
        let dir = TempDir::new("server_run").unwrap();
        let mut server = server(&dir);
        server.start();
        server
            .spawn_meteorite(&WorldPoint::new("W", BlockPos::new(3, 0, 3)), "small")
            .unwrap();

        let mut broadcasts = Vec::new();
        // (150 - 64) / 2.0 * 20 + 40 ticks until impact.
        server
            .run(900, |tick, world, event| {
                if let WorldEvent::Broadcast { text } = event {
                    broadcasts.push((tick, world.to_string(), text.clone()));
                }
                Ok(())
            })
            .unwrap();

        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].0, SimTick(900));
        assert_eq!(broadcasts[0].1, "W");
        assert!(broadcasts[0].2.ends_with("Impact!"));
        assert_eq!(server.engine().registry().len(), 1);
        assert!(server.shutdown());
    }

    #[test]
    fn paced_run_keeps_to_the_period() {
        let dir = TempDir::new("server_paced").unwrap();
        let mut server = server(&dir);
        server.start();
        let started = std::time::Instant::now();
        server
            .run_paced(4, Duration::from_millis(10), |_, _, _| Ok(()))
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(server.current_tick(), SimTick(4));
    }

    #[test]
    fn start_is_idempotent() {
        let dir = TempDir::new("server_start").unwrap();
        let mut server = server(&dir);
        assert_eq!(server.start(), 0);
        assert_eq!(server.start(), 0);
    }
}
