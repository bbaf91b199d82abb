//! Engine-provided systems
//!
//! The model renderer lives in `scene` since it also draws.

pub mod callback_system;
pub mod sprite_animator;
pub mod sprite_system;
pub mod terrain_system;

pub use callback_system::CallbackSystem;
pub use sprite_animator::{SpriteAnimator, DEFAULT_MAX_EVENTS_PER_FRAME};
pub use sprite_system::SpriteSystem;
pub use terrain_system::TerrainSystem;
