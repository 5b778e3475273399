//! Engine configuration
//!
//! Tunables shared by the classifier, renderer and capture. Stored as camelCase
//! JSON so hosts can ship it alongside their own settings.

use crate::utils::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default debounce window before activity is reclassified as paused
pub const DEFAULT_DEBOUNCE_MS: u64 = 3_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Quiet time after the last stroke before a pause is recorded
    pub debounce_ms: u64,

    /// Composite frames rendered and sampled per second
    pub frame_rate: u32,

    /// How often the capture emits a media chunk
    pub chunk_interval_ms: u64,

    /// Opacity applied to the whole ink layer when compositing (0.0 - 1.0)
    pub ink_opacity: f32,

    /// RGBA fill used for masking rectangles
    pub mask_color: [u8; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            frame_rate: 30,
            chunk_interval_ms: 1_000,
            ink_opacity: 1.0,
            mask_color: [0, 0, 0, 255],
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.frame_rate == 0 {
            return Err(EngineError::Config("frameRate must be greater than zero".to_string()));
        }
        if self.chunk_interval_ms == 0 {
            return Err(EngineError::Config(
                "chunkIntervalMs must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.ink_opacity) {
            return Err(EngineError::Config(format!(
                "inkOpacity must be within 0.0..=1.0, got {}",
                self.ink_opacity
            )));
        }
        Ok(())
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }

    pub fn chunk_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_interval_ms)
    }
}
