//! Message system
//!
//! Systems talk to each other through small plain-data messages. Anything
//! posted in one frame is handed to every system in the next, in post order.

mod bus;
mod message;

pub use bus::{MessageBus, MessageBusError, OverflowPolicy};
pub use message::{Message, MessageData, MessageKind, SceneEvent, SpriteAnimationEvent, MAX_PAYLOAD};
