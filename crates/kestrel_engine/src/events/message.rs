//! Fixed-size message records and the engine's own message types

use bytemuck::{Pod, Zeroable};

use crate::ecs::Entity;

/// Largest payload a message can carry, in bytes
pub const MAX_PAYLOAD: usize = 64;

const PAYLOAD_WORDS: usize = MAX_PAYLOAD / 8;

/// Message type tag
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
pub struct MessageKind(pub u32);

impl MessageKind {
    /// Unused slot
    pub const NONE: MessageKind = MessageKind(0);
    /// [`SceneEvent`]
    pub const SCENE: MessageKind = MessageKind(1);
    /// [`SpriteAnimationEvent`]
    pub const SPRITE_ANIMATION: MessageKind = MessageKind(2);
    /// First kind free for application use
    pub const USER_START: MessageKind = MessageKind(0x1000);

    /// Application kind `offset` past [`USER_START`](Self::USER_START)
    pub const fn user(offset: u32) -> MessageKind {
        MessageKind(Self::USER_START.0 + offset)
    }
}

/// Plain data that can travel in a [`Message`]
pub trait MessageData: Pod {
    /// Tag written on messages carrying this type
    const KIND: MessageKind;
}

/// A tagged, fixed-capacity message.
///
/// Payload bytes are copied in on post and reinterpreted on read, so a
/// message is a small `Copy` value that never owns heap memory.
#[derive(Clone, Copy)]
pub struct Message {
    kind: MessageKind,
    size: u16,
    payload: [u64; PAYLOAD_WORDS],
}

impl Message {
    /// Message type tag
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Payload length in bytes
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Raw payload
    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.payload)[..self.size()]
    }

    /// Payload as `T`, if this message carries one
    pub fn data<T: MessageData>(&self) -> Option<&T> {
        if self.kind != T::KIND {
            return None;
        }
        bytemuck::try_from_bytes(self.bytes()).ok()
    }

    /// Reset the slot to `kind` with a zeroed payload of `size` bytes
    pub(crate) fn reset(&mut self, kind: MessageKind, size: usize) -> &mut [u8] {
        self.kind = kind;
        self.size = size as u16;
        self.payload = [0; PAYLOAD_WORDS];
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.payload)[..size]
    }
}

impl Default for Message {
    fn default() -> Self {
        Self {
            kind: MessageKind::NONE,
            size: 0,
            payload: [0; PAYLOAD_WORDS],
        }
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.kind)
            .field("size", &self.size)
            .finish()
    }
}

/// Entity lifecycle notification posted by the scene
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct SceneEvent {
    /// Subject of the event
    pub entity: Entity,
    /// One of the `SceneEvent::*` codes
    pub event: u32,
}

impl SceneEvent {
    /// The entity was destroyed
    pub const ENTITY_DESTROYED: u32 = 0;

    /// Destruction notice for `entity`
    pub fn destroyed(entity: Entity) -> Self {
        Self {
            entity,
            event: Self::ENTITY_DESTROYED,
        }
    }
}

impl MessageData for SceneEvent {
    const KIND: MessageKind = MessageKind::SCENE;
}

/// A sprite animation reached a frame tagged with a user event
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct SpriteAnimationEvent {
    /// Animated entity
    pub entity: Entity,
    /// Application-defined event id stored on the frame
    pub user_type: i32,
    /// Frame index that carried the event
    pub frame: u32,
}

impl MessageData for SpriteAnimationEvent {
    const KIND: MessageKind = MessageKind::SPRITE_ANIMATION;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_checks_kind() {
        let mut message = Message::default();
        let event = SceneEvent::destroyed(Entity::new(4, 2));
        message
            .reset(SceneEvent::KIND, std::mem::size_of::<SceneEvent>())
            .copy_from_slice(bytemuck::bytes_of(&event));

        assert_eq!(message.data::<SceneEvent>(), Some(&event));
        assert!(message.data::<SpriteAnimationEvent>().is_none());
    }

    #[test]
    fn test_user_kinds_start_after_engine_kinds() {
        assert!(MessageKind::user(0) > MessageKind::SPRITE_ANIMATION);
        assert_eq!(MessageKind::user(3).0, 0x1003);
    }
}
