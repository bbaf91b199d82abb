//! ECS error types

use super::Entity;

/// Errors from entity and component operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The handle refers to a destroyed entity
    #[error("Stale entity handle {0}")]
    StaleEntity(Entity),

    /// Too many component types registered in one world
    #[error("Cannot register component {type_name}: limit of {max} component types reached")]
    ComponentLimit {
        /// Type that did not fit
        type_name: &'static str,
        /// Registry capacity
        max: usize,
    },
}
