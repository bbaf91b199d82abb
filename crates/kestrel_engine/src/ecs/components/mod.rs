//! Engine-provided components

pub mod callback;
pub mod camera;
pub mod model;
pub mod sprite;
pub mod terrain;
pub mod transform;

pub use callback::{CallbackComponent, CallbackFn};
pub use camera::CameraComponent;
pub use model::{ModelComponent, RenderFlags};
pub use sprite::{
    AnimationClip, AnimationFrame, SpriteAnimationComponent, SpriteComponent, SpriteVertex,
    TextureRect,
};
pub use terrain::TerrainComponent;
pub use transform::TransformComponent;
