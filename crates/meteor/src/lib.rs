#![warn(missing_docs)]
//! Meteorite lifecycle engine.
//!
//! Spawns layered structures that fall into a [`skyfall_world::World`],
//! resolves their impact, and guarantees the terrain is restored later, even
//! across a restart, through a durable registry file.

pub mod cleanup;
pub mod clock;
pub mod effects;
pub mod engine;
pub mod error;
pub mod fall;
pub mod generator;
pub mod guard;
pub mod guardian;
pub mod impact;
pub mod loot;
pub mod random;
pub mod record;
pub mod registry;
pub mod scheduler;
pub mod settings;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{MeteorEngine, Task};
pub use error::{RegisterError, SpawnError};
pub use generator::{Layer, StructureLayout, WeightedPool};
pub use guard::{Claim, DedupGuard};
pub use record::{PlacementRecord, RegistryStore};
pub use registry::{LifecycleRegistry, RegisterRequest};
pub use scheduler::{TaskId, TaskScheduler};
pub use settings::{MeteorSettings, MeteoriteDefinition};
