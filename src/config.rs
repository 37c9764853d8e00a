//! # Configuration
//!
//! `WorldConfig` collects everything the host decides about a world: the seed,
//! chunk extents, streaming radius and worker pool sizes. Every field has a
//! default, so a JSON file only needs the fields it changes.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine_state::voxels::chunk::ChunkDimensions;

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not a valid JSON config.
    #[error("Invalid config format: {0}")]
    Parse(#[from] serde_json::Error),
    /// The values parsed but are unusable.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// World-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed for terrain and vegetation noise
    pub seed: u32,
    /// Extents of every chunk
    pub chunk: ChunkDimensions,
    /// Chunks kept loaded around the viewer, as a circular radius in chunks
    pub stream_radius: u32,
    /// Terrain worker threads; 0 runs terrain jobs on the calling thread
    pub terrain_workers: usize,
    /// Mesh worker threads; 0 runs mesh jobs on the calling thread
    pub mesh_workers: usize,
    /// Terrain attempts per chunk before giving up
    pub max_generation_attempts: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk: ChunkDimensions::default(),
            stream_radius: 8,
            terrain_workers: 1,
            mesh_workers: 3,
            max_generation_attempts: 3,
        }
    }
}

impl WorldConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        info!("Loaded world config from {}", path.display());
        Ok(config)
    }

    /// Serializes the configuration as pretty JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects settings the world cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chunk = &self.chunk;
        if chunk.size_x == 0 || chunk.size_z == 0 || chunk.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "chunk extents must be non-zero, got {}x{}x{}",
                chunk.size_x, chunk.size_z, chunk.height
            )));
        }
        if chunk.size_x > i32::MAX as usize || chunk.size_z > i32::MAX as usize {
            return Err(ConfigError::Invalid("chunk extents do not fit in i32".into()));
        }
        if self.max_generation_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_generation_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
