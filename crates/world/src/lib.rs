//! Headless voxel worlds that host meteor structures.

mod chunk;
mod container;
mod entity;
mod events;
mod materials;
mod mob;
mod storage;
mod terrain;
mod world;

pub use chunk::*;
pub use container::*;
pub use entity::*;
pub use events::*;
pub use materials::*;
pub use mob::*;
pub use storage::*;
pub use terrain::*;
pub use world::*;
