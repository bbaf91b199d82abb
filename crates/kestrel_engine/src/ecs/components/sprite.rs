//! Sprite and sprite animation components

use bytemuck::{Pod, Zeroable};

use crate::ecs::Component;
use crate::foundation::math::{Vec2, Vec3};
use crate::render::TextureId;
use crate::spatial::AABB;

/// Area of a texture in pixels, origin bottom-left
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextureRect {
    /// Left edge
    pub left: f32,
    /// Bottom edge
    pub bottom: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl TextureRect {
    /// Create a rect from its edges and size
    pub fn new(left: f32, bottom: f32, width: f32, height: f32) -> Self {
        Self { left, bottom, width, height }
    }
}

/// Vertex layout of a sprite quad
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct SpriteVertex {
    /// Local position
    pub position: [f32; 2],
    /// Normalized texture coordinate
    pub uv: [f32; 2],
    /// Vertex colour
    pub color: [f32; 4],
}

/// One frame of an animation clip
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    /// Area of the texture shown
    pub rect: TextureRect,
    /// User event raised when the frame is entered
    pub event: Option<i32>,
}

impl AnimationFrame {
    /// Frame without an event
    pub fn new(rect: TextureRect) -> Self {
        Self { rect, event: None }
    }

    /// Builder pattern: Raise `event` on entry
    pub fn with_event(mut self, event: i32) -> Self {
        self.event = Some(event);
        self
    }
}

/// A named run of frames played at a fixed rate
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    /// Frames in play order
    pub frames: Vec<AnimationFrame>,
    /// Frames per second
    pub framerate: f32,
    /// Wrap around after the last frame
    pub looped: bool,
    /// Frame to wrap back to
    pub loop_start: usize,
}

impl AnimationClip {
    /// Non-looping clip
    pub fn new(frames: Vec<AnimationFrame>, framerate: f32) -> Self {
        Self {
            frames,
            framerate,
            looped: false,
            loop_start: 0,
        }
    }

    /// Builder pattern: Loop back to `loop_start`
    pub fn looped(mut self, loop_start: usize) -> Self {
        self.looped = true;
        self.loop_start = loop_start;
        self
    }
}

/// A textured quad
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteComponent {
    texture: Option<TextureId>,
    texture_size: Vec2,
    texture_rect: TextureRect,
    color: [f32; 4],
    vertices: [SpriteVertex; 4],
    local_bounds: AABB,
    world_bounds: AABB,
    dirty: bool,
    /// Clips the animator can play
    pub animations: Vec<AnimationClip>,
}

impl Component for SpriteComponent {}

impl SpriteComponent {
    /// Sprite showing the whole of a texture
    pub fn new(texture: TextureId, texture_size: Vec2) -> Self {
        Self {
            texture: Some(texture),
            texture_size,
            texture_rect: TextureRect::new(0.0, 0.0, texture_size.x, texture_size.y),
            color: [1.0; 4],
            vertices: [SpriteVertex::default(); 4],
            local_bounds: AABB::zero(),
            world_bounds: AABB::zero(),
            dirty: true,
            animations: Vec::new(),
        }
    }

    /// Builder pattern: Add an animation clip
    pub fn with_animation(mut self, clip: AnimationClip) -> Self {
        self.animations.push(clip);
        self
    }

    /// Texture the sprite samples
    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    /// Size of the texture in pixels
    pub fn texture_size(&self) -> Vec2 {
        self.texture_size
    }

    /// Shown area of the texture
    pub fn texture_rect(&self) -> TextureRect {
        self.texture_rect
    }

    /// Change the shown area; no-op when unchanged
    pub fn set_texture_rect(&mut self, rect: TextureRect) {
        if rect != self.texture_rect {
            self.texture_rect = rect;
            self.dirty = true;
        }
    }

    /// Tint
    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    /// Change the tint
    pub fn set_color(&mut self, color: [f32; 4]) {
        if color != self.color {
            self.color = color;
            self.dirty = true;
        }
    }

    /// Quad vertices as of the last rebuild
    pub fn vertices(&self) -> &[SpriteVertex; 4] {
        &self.vertices
    }

    /// Bounds in local space
    pub fn local_bounds(&self) -> AABB {
        self.local_bounds
    }

    /// Bounds in world space as of the last update
    pub fn world_bounds(&self) -> AABB {
        self.world_bounds
    }

    /// Whether the quad needs rebuilding
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recompute vertices and local bounds from rect and colour
    pub fn rebuild(&mut self) {
        let rect = self.texture_rect;
        let size = Vec2::new(self.texture_size.x.max(1.0), self.texture_size.y.max(1.0));
        let (u0, v0) = (rect.left / size.x, rect.bottom / size.y);
        let (u1, v1) = ((rect.left + rect.width) / size.x, (rect.bottom + rect.height) / size.y);

        // triangle strip order
        let corners = [
            ([0.0, rect.height], [u0, v1]),
            ([0.0, 0.0], [u0, v0]),
            ([rect.width, rect.height], [u1, v1]),
            ([rect.width, 0.0], [u1, v0]),
        ];
        for (vertex, (position, uv)) in self.vertices.iter_mut().zip(corners) {
            *vertex = SpriteVertex {
                position,
                uv,
                color: self.color,
            };
        }
        self.local_bounds = AABB::new(Vec3::zeros(), Vec3::new(rect.width, rect.height, 0.0));
        self.dirty = false;
    }

    pub(crate) fn set_world_bounds(&mut self, bounds: AABB) {
        self.world_bounds = bounds;
    }
}

/// Playback state for a sprite's clips
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteAnimationComponent {
    /// Index into the sprite's clips
    pub id: usize,
    /// Whether time advances
    pub playing: bool,
    /// Current frame within the clip
    pub frame_id: usize,
    /// Time accumulated toward the next frame
    pub current_frame_time: f32,
    /// Speed multiplier
    pub playback_rate: f32,
}

impl Component for SpriteAnimationComponent {}

impl Default for SpriteAnimationComponent {
    fn default() -> Self {
        Self {
            id: 0,
            playing: false,
            frame_id: 0,
            current_frame_time: 0.0,
            playback_rate: 1.0,
        }
    }
}

impl SpriteAnimationComponent {
    /// Start clip `id` from its first frame
    pub fn play(&mut self, id: usize) {
        self.id = id;
        self.playing = true;
        self.frame_id = 0;
        self.current_frame_time = 0.0;
    }

    /// Halt, keeping the current frame
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Halt and rewind
    pub fn stop(&mut self) {
        self.playing = false;
        self.frame_id = 0;
        self.current_frame_time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_uses_rect() {
        let mut sprite = SpriteComponent::new(TextureId(1), Vec2::new(64.0, 32.0));
        sprite.set_texture_rect(TextureRect::new(16.0, 0.0, 16.0, 16.0));
        assert!(sprite.is_dirty());
        sprite.rebuild();
        assert!(!sprite.is_dirty());

        let uvs: Vec<_> = sprite.vertices().iter().map(|v| v.uv).collect();
        assert_eq!(uvs[1], [0.25, 0.0]);
        assert_eq!(uvs[2], [0.5, 0.5]);
        assert_eq!(sprite.local_bounds().max, Vec3::new(16.0, 16.0, 0.0));
    }

    #[test]
    fn test_unchanged_rect_stays_clean() {
        let mut sprite = SpriteComponent::new(TextureId(1), Vec2::new(8.0, 8.0));
        sprite.rebuild();
        sprite.set_texture_rect(sprite.texture_rect());
        sprite.set_color([1.0; 4]);
        assert!(!sprite.is_dirty());
    }
}
