//! Work that runs beside the frame loop
//!
//! The only thread the engine starts. Results come back by value and are
//! copied into components on the main thread.

mod terrain;
mod worker;

pub use terrain::{TerrainMesh, TerrainMeshBuilder, TerrainParams, TerrainVertex};
pub use worker::{BackgroundWorker, WorkerError};
