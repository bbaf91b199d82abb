//! Frame-based sprite animation

use std::any::Any;

use crate::ecs::components::{SpriteAnimationComponent, SpriteComponent};
use crate::ecs::{Entity, Requirements, System, SystemContext};
use crate::events::SpriteAnimationEvent;

/// Default cap on animation events posted per frame
pub const DEFAULT_MAX_EVENTS_PER_FRAME: usize = 16;

/// Advances sprite animations and swaps the shown texture rect
pub struct SpriteAnimator {
    max_events_per_frame: usize,
    events_this_frame: usize,
    suppressed_events: u64,
    fault_count: u64,
}

impl SpriteAnimator {
    /// Create an animator with the default event cap
    pub fn new() -> Self {
        Self {
            max_events_per_frame: DEFAULT_MAX_EVENTS_PER_FRAME,
            events_this_frame: 0,
            suppressed_events: 0,
            fault_count: 0,
        }
    }

    /// Builder pattern: Cap animation events posted per frame
    pub fn with_max_events_per_frame(mut self, max: usize) -> Self {
        self.max_events_per_frame = max;
        self
    }

    /// Animations stopped because they pointed at missing or empty clips
    pub fn fault_count(&self) -> u64 {
        self.fault_count
    }

    /// Events not posted because the per-frame cap was reached
    pub fn suppressed_events(&self) -> u64 {
        self.suppressed_events
    }

    fn fault(&mut self, entity: Entity, animation: &mut SpriteAnimationComponent, reason: &str) {
        log::warn!("stopping animation {} on {}: {}", animation.id, entity, reason);
        animation.stop();
        self.fault_count += 1;
    }

    fn advance(&mut self, ctx: &mut SystemContext<'_>, entity: Entity, dt: f32) {
        let Some((sprite, animation)) = ctx
            .world
            .get_two_mut::<SpriteComponent, SpriteAnimationComponent>(entity)
        else {
            return;
        };
        if !animation.playing {
            return;
        }

        let Some(clip) = sprite.animations.get(animation.id) else {
            self.fault(entity, animation, "no such clip");
            return;
        };
        let frame_count = clip.frames.len();
        if frame_count == 0 {
            self.fault(entity, animation, "clip has no frames");
            return;
        }
        if !(clip.framerate > 0.0) {
            self.fault(entity, animation, "framerate must be positive");
            return;
        }
        if animation.frame_id >= frame_count {
            self.fault(entity, animation, "frame out of range");
            return;
        }

        let frame_time = 1.0 / clip.framerate;
        animation.current_frame_time += dt * animation.playback_rate;

        let mut steps = 0;
        while animation.current_frame_time >= frame_time && steps < frame_count {
            animation.current_frame_time -= frame_time;
            steps += 1;

            let next = animation.frame_id + 1;
            if next < frame_count {
                animation.frame_id = next;
            } else if clip.looped {
                animation.frame_id = clip.loop_start.min(frame_count - 1);
            } else {
                animation.playing = false;
                animation.current_frame_time = 0.0;
                break;
            }

            if let Some(user_type) = clip.frames[animation.frame_id].event {
                if self.events_this_frame < self.max_events_per_frame {
                    let event = SpriteAnimationEvent {
                        entity,
                        user_type,
                        frame: animation.frame_id as u32,
                    };
                    match ctx.messages.post_value(event) {
                        Ok(()) => self.events_this_frame += 1,
                        Err(e) => log::trace!("animation event on {} dropped: {}", entity, e),
                    }
                } else {
                    self.suppressed_events += 1;
                }
            }
        }
        // more than a full cycle in one step; drop the excess
        if animation.current_frame_time >= frame_time {
            animation.current_frame_time %= frame_time;
        }

        let rect = clip.frames[animation.frame_id].rect;
        sprite.set_texture_rect(rect);
    }
}

impl Default for SpriteAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl System for SpriteAnimator {
    fn name(&self) -> &str {
        "SpriteAnimator"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new()
            .require::<SpriteComponent>()
            .require::<SpriteAnimationComponent>()
    }

    fn process(&mut self, ctx: &mut SystemContext<'_>, dt: f32) {
        self.events_this_frame = 0;
        for &entity in ctx.entities() {
            self.advance(ctx, entity, dt);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
