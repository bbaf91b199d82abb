//! Scene management
//!
//! The scene owns the ECS world and runs its systems once per frame. Systems
//! that draw implement [`Renderable`]; the [`ModelRenderer`] is the built-in
//! one.
//!
//! ```text
//! simulate(dt)                          render(backend)
//!   bus flip -> handle_message            for each renderable
//!   process (registration order)            for each camera
//!   update_draw_list per camera               opaque pass, transparent pass
//! ```

mod draw_list;
mod model_renderer;
mod renderable;
mod scene_manager;

pub use draw_list::{DrawList, MaterialPair, SortData};
pub use model_renderer::{quantize_depth, ModelRenderer};
pub use renderable::{CullStats, RenderStats, Renderable};
pub use scene_manager::{Scene, SceneStats};
