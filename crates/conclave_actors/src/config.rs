//! # Stage Configuration
//!
//! Declarative wiring for a coordination stage, loaded once at startup from
//! TOML. Validation happens immediately on load: a malformed stage is a
//! fatal, non-retryable error, never a silent degradation.
//!
//! ## Example
//!
//! ```toml
//! [barrier]
//! width = 3
//!
//! [buffer]
//! capacity = 16        # omit for unbounded
//!
//! [resource_pool]
//! initial = [1, 2, 3]
//! release_channels = 1
//! grant_channels = 3
//! ```

use serde::Deserialize;

use crate::error::{ActorError, ActorResult};

/// Barrier section: how many input channels to connect.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BarrierConfig {
    /// Number of input channels. Must be at least one.
    pub width: usize,
}

/// Buffer section: admission bound for the FIFO backlog.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferConfig {
    /// Maximum queued tokens; an absent key means unbounded.
    #[serde(default)]
    pub capacity: Option<usize>,
}

/// ResourcePool section: the initial pool and channel counts.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Tokens seeding the pool.
    pub initial: Vec<i64>,
    /// Release (input) channel count. Must be at least one.
    #[serde(default = "default_one")]
    pub release_channels: usize,
    /// Grant (output) channel count. Must be at least one.
    #[serde(default = "default_one")]
    pub grant_channels: usize,
}

fn default_one() -> usize {
    1
}

/// One coordination stage: any combination of the actor sections.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Optional barrier actor.
    #[serde(default)]
    pub barrier: Option<BarrierConfig>,
    /// Optional buffer actor.
    #[serde(default)]
    pub buffer: Option<BufferConfig>,
    /// Optional resource pool actor.
    #[serde(default)]
    pub resource_pool: Option<PoolConfig>,
}

impl StageConfig {
    /// Parses and validates a stage description.
    pub fn from_toml_str(raw: &str) -> ActorResult<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|err| ActorError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ActorResult<()> {
        if let Some(barrier) = &self.barrier {
            if barrier.width == 0 {
                return Err(ActorError::InvalidConfig(
                    "barrier.width must be at least 1 (nothing to barrier on)".to_string(),
                ));
            }
        }
        if let Some(pool) = &self.resource_pool {
            if pool.release_channels == 0 {
                return Err(ActorError::InvalidConfig(
                    "resource_pool.release_channels must be at least 1".to_string(),
                ));
            }
            if pool.grant_channels == 0 {
                return Err(ActorError::InvalidConfig(
                    "resource_pool.grant_channels must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}
