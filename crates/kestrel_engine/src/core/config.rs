//! # Unified Configuration System
//!
//! Configuration structures for the engine loop and the scene core. Every
//! struct has sensible defaults and accepts partial files: missing fields fall
//! back to `Default`.
//!
//! ```toml
//! log_level = "debug"
//! max_frames = 600
//!
//! [scene]
//! min_free_indices = 64
//!
//! [scene.message_bus]
//! capacity = 128
//! overflow = "DropOldest"
//!
//! [scene.culling]
//! strategy = "BalancedTree"
//! ```

use serde::{Serialize, Deserialize};

use crate::config::{Config, ConfigError};
use crate::events::OverflowPolicy;
use crate::spatial::CullStrategy;

/// Message bus sizing and overflow behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageBusConfig {
    /// Messages that fit in one frame
    pub capacity: usize,
    /// What happens to a post when the frame's buffer is full
    pub overflow: OverflowPolicy,
}

impl Default for MessageBusConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            overflow: OverflowPolicy::RejectNew,
        }
    }
}

/// Visibility culling settings for model renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullingConfig {
    /// Linear scan or spatial tree
    pub strategy: CullStrategy,
    /// Padding added around tree proxies so small moves don't reinsert
    pub tree_margin: f32,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            strategy: CullStrategy::Linear,
            tree_margin: 0.5,
        }
    }
}

/// Scene core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Destroyed slots are only reused once this many are waiting
    pub min_free_indices: usize,
    /// Message bus settings
    pub message_bus: MessageBusConfig,
    /// Culling settings handed to model renderers
    pub culling: CullingConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            min_free_indices: 1024,
            message_bus: MessageBusConfig::default(),
            culling: CullingConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Set the reuse threshold for destroyed entity slots
    pub fn with_min_free_indices(mut self, count: usize) -> Self {
        self.min_free_indices = count;
        self
    }

    /// Set the message bus capacity and overflow policy
    pub fn with_message_bus(mut self, capacity: usize, overflow: OverflowPolicy) -> Self {
        self.message_bus = MessageBusConfig { capacity, overflow };
        self
    }

    /// Set the culling strategy
    pub fn with_cull_strategy(mut self, strategy: CullStrategy) -> Self {
        self.culling.strategy = strategy;
        self
    }

    /// Validate the scene settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.message_bus.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "scene.message_bus.capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.culling.tree_margin.is_finite() || self.culling.tree_margin < 0.0 {
            return Err(ConfigError::Invalid {
                field: "scene.culling.tree_margin",
                reason: format!("must be finite and non-negative, got {}", self.culling.tree_margin),
            });
        }
        Ok(())
    }
}

/// # Engine Configuration
///
/// Core engine behavior: logging, frame loop and the scene it drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Stop after this many frames (headless runs, tests)
    pub max_frames: Option<u64>,
    /// Use a fixed delta time instead of the wall clock
    pub fixed_timestep: Option<f32>,
    /// Scene core settings
    pub scene: SceneConfig,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            max_frames: None,
            fixed_timestep: None,
            scene: SceneConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Stop the loop after `frames` frames
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Step the simulation with a constant delta
    pub fn with_fixed_timestep(mut self, dt: f32) -> Self {
        self.fixed_timestep = Some(dt);
        self
    }

    /// Replace the scene settings
    pub fn with_scene(mut self, scene: SceneConfig) -> Self {
        self.scene = scene;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];
        if !LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid {
                field: "log_level",
                reason: format!("unknown level `{}`", self.log_level),
            });
        }
        if let Some(dt) = self.fixed_timestep {
            if !(dt.is_finite() && dt > 0.0) {
                return Err(ConfigError::Invalid {
                    field: "fixed_timestep",
                    reason: format!("must be positive, got {dt}"),
                });
            }
        }
        self.scene.validate()
    }
}
