//! Double-buffered message bus
//!
//! Messages posted during frame N are delivered during frame N+1. Both
//! buffers are fixed-size rings allocated up front, so posting never
//! allocates.

use serde::{Deserialize, Serialize};

use super::message::{MAX_PAYLOAD, Message, MessageData, MessageKind};
use crate::core::MessageBusConfig;
use crate::foundation::collections::RingBuffer;

/// What to do with a post when the frame's buffer is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Refuse the new message
    #[default]
    RejectNew,
    /// Overwrite the oldest message of the frame
    DropOldest,
}

/// Message bus errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageBusError {
    /// No room left this frame
    #[error("Message bus full ({capacity} messages), dropped {kind:?}")]
    Full {
        /// Kind that was refused
        kind: MessageKind,
        /// Messages per frame
        capacity: usize,
    },

    /// Payload bigger than a message slot
    #[error("Payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge {
        /// Requested size
        size: usize,
        /// Slot size
        max: usize,
    },

    /// Payload type needs stricter alignment than a slot offers
    #[error("Payload alignment {align} is not supported")]
    PayloadAlignment {
        /// Requested alignment
        align: usize,
    },
}

/// Frame-delayed message queue shared by all systems of a scene
#[derive(Debug)]
pub struct MessageBus {
    posting: RingBuffer<Message>,
    delivering: RingBuffer<Message>,
    overflow: OverflowPolicy,
    dropped: u64,
}

impl MessageBus {
    /// Create a bus from configuration
    pub fn new(config: &MessageBusConfig) -> Self {
        Self::with_capacity(config.capacity, config.overflow)
    }

    /// Create a bus holding `capacity` messages per frame
    pub fn with_capacity(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            posting: RingBuffer::with_capacity(capacity),
            delivering: RingBuffer::with_capacity(capacity),
            overflow,
            dropped: 0,
        }
    }

    /// Post a message of type `T` and fill it in through the returned reference
    pub fn post<T: MessageData>(&mut self) -> Result<&mut T, MessageBusError> {
        let size = std::mem::size_of::<T>();
        let align = std::mem::align_of::<T>();
        if align > std::mem::align_of::<u64>() {
            return Err(MessageBusError::PayloadAlignment { align });
        }
        let bytes = self.claim(T::KIND, size)?;
        bytemuck::try_from_bytes_mut(bytes).map_err(|_| MessageBusError::PayloadAlignment { align })
    }

    /// Post a complete value
    pub fn post_value<T: MessageData>(&mut self, value: T) -> Result<(), MessageBusError> {
        *self.post::<T>()? = value;
        Ok(())
    }

    /// Post raw bytes under `kind`
    pub fn post_raw(&mut self, kind: MessageKind, payload: &[u8]) -> Result<(), MessageBusError> {
        self.claim(kind, payload.len())?.copy_from_slice(payload);
        Ok(())
    }

    fn claim(&mut self, kind: MessageKind, size: usize) -> Result<&mut [u8], MessageBusError> {
        if size > MAX_PAYLOAD {
            return Err(MessageBusError::PayloadTooLarge { size, max: MAX_PAYLOAD });
        }
        let capacity = self.posting.capacity();
        let slot = match self.overflow {
            OverflowPolicy::RejectNew => self.posting.push_slot(),
            OverflowPolicy::DropOldest => match self.posting.push_slot_overwrite() {
                Some((slot, overwrote)) => {
                    if overwrote {
                        self.dropped += 1;
                        log::trace!("message bus full, overwrote oldest message");
                    }
                    Some(slot)
                }
                None => None,
            },
        };
        match slot {
            Some(slot) => Ok(slot.reset(kind, size)),
            None => {
                self.dropped += 1;
                Err(MessageBusError::Full { kind, capacity })
            }
        }
    }

    /// Make last frame's posts deliverable and start collecting new ones
    pub fn begin_frame(&mut self) {
        self.delivering.clear();
        std::mem::swap(&mut self.posting, &mut self.delivering);
    }

    /// Messages posted this frame, waiting for next frame
    pub fn pending_len(&self) -> usize {
        self.posting.len()
    }

    /// Messages being delivered this frame
    pub fn delivered_len(&self) -> usize {
        self.delivering.len()
    }

    /// Delivered message by position, oldest first
    pub fn delivered(&self, index: usize) -> Option<&Message> {
        self.delivering.get(index)
    }

    /// Iterate this frame's deliveries
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        self.delivering.iter()
    }

    /// Messages lost to overflow so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Messages per frame
    pub fn capacity(&self) -> usize {
        self.posting.capacity()
    }

    /// Overflow behaviour
    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow
    }
}
