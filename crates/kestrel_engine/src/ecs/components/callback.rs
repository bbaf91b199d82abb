//! Per-entity closure component

use std::fmt;

use crate::ecs::{Component, Entity, World};

/// Closure run every frame with the owning entity, the world and the frame delta
pub type CallbackFn = Box<dyn FnMut(Entity, &mut World, f32) + Send + Sync>;

/// Component holding an entity's update closure
pub struct CallbackComponent {
    /// Inactive callbacks are skipped
    pub active: bool,
    function: Option<CallbackFn>,
}

impl Component for CallbackComponent {}

impl CallbackComponent {
    /// Wrap a closure
    pub fn new<F>(function: F) -> Self
    where
        F: FnMut(Entity, &mut World, f32) + Send + Sync + 'static,
    {
        Self {
            active: true,
            function: Some(Box::new(function)),
        }
    }

    /// Whether a closure is present
    pub fn has_function(&self) -> bool {
        self.function.is_some()
    }

    // the closure is moved out while it runs so it can borrow the world
    pub(crate) fn take(&mut self) -> Option<CallbackFn> {
        self.function.take()
    }

    pub(crate) fn restore(&mut self, function: CallbackFn) {
        if self.function.is_none() {
            self.function = Some(function);
        }
    }
}

impl fmt::Debug for CallbackComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackComponent")
            .field("active", &self.active)
            .field("has_function", &self.function.is_some())
            .finish()
    }
}
