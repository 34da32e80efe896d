//! Session and engine configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Session configuration accepted at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Request playback once the sink/engine signals enough data is ready
    pub autoplay: bool,
    /// When false, every source takes the direct path regardless of
    /// classification
    pub adaptive_enabled: bool,
    /// Partial engine tuning overrides merged over [`EngineTuning::default`]
    pub engine_tuning: EngineTuningOverrides,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autoplay: false,
            adaptive_enabled: true,
            engine_tuning: EngineTuningOverrides::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the effective engine tuning, validating the merged result
    pub fn resolve_tuning(&self) -> Result<EngineTuning> {
        let tuning = self.engine_tuning.merge(EngineTuning::default());
        tuning.validate()?;
        Ok(tuning)
    }
}

/// Effective engine construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineTuning {
    /// Forward buffer target in seconds
    pub forward_buffer_secs: f64,
    /// Total buffer cap in bytes
    pub max_buffer_bytes: u64,
    /// Cap rendition resolution to the player viewport
    pub cap_level_to_player_size: bool,
    /// Demux on a background worker
    pub worker_enabled: bool,
    /// Initial rendition index; -1 selects automatically
    pub start_level: i32,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            forward_buffer_secs: 30.0,
            max_buffer_bytes: 64 * 1024 * 1024,
            cap_level_to_player_size: true,
            worker_enabled: true,
            start_level: -1,
        }
    }
}

impl EngineTuning {
    pub fn validate(&self) -> Result<()> {
        if !self.forward_buffer_secs.is_finite() || self.forward_buffer_secs <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "forward_buffer_secs must be positive, got {}",
                self.forward_buffer_secs
            )));
        }
        if self.max_buffer_bytes == 0 {
            return Err(Error::InvalidConfig(
                "max_buffer_bytes must be positive".to_string(),
            ));
        }
        if self.start_level < -1 {
            return Err(Error::InvalidConfig(format!(
                "start_level must be -1 or a level index, got {}",
                self.start_level
            )));
        }
        Ok(())
    }
}

/// Caller-supplied partial overrides; unset fields keep the defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineTuningOverrides {
    pub forward_buffer_secs: Option<f64>,
    pub max_buffer_bytes: Option<u64>,
    pub cap_level_to_player_size: Option<bool>,
    pub worker_enabled: Option<bool>,
    pub start_level: Option<i32>,
}

impl EngineTuningOverrides {
    /// Merge over a base tuning; set fields win
    pub fn merge(&self, base: EngineTuning) -> EngineTuning {
        EngineTuning {
            forward_buffer_secs: self.forward_buffer_secs.unwrap_or(base.forward_buffer_secs),
            max_buffer_bytes: self.max_buffer_bytes.unwrap_or(base.max_buffer_bytes),
            cap_level_to_player_size: self
                .cap_level_to_player_size
                .unwrap_or(base.cap_level_to_player_size),
            worker_enabled: self.worker_enabled.unwrap_or(base.worker_enabled),
            start_level: self.start_level.unwrap_or(base.start_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::default();
        assert!(!config.autoplay);
        assert!(config.adaptive_enabled);
    }

    #[test]
    fn test_adaptive_default_survives_partial_json() {
        let config: SessionConfig = serde_json::from_str(r#"{"autoplay": true}"#).unwrap();
        assert!(config.autoplay);
        assert!(config.adaptive_enabled);
    }

    #[test]
    fn test_tuning_defaults() {
        let tuning = EngineTuning::default();
        assert_eq!(tuning.forward_buffer_secs, 30.0);
        assert_eq!(tuning.max_buffer_bytes, 64 * 1024 * 1024);
        assert!(tuning.cap_level_to_player_size);
        assert!(tuning.worker_enabled);
        assert_eq!(tuning.start_level, -1);
    }

    #[test]
    fn test_override_merge_caller_wins() {
        let overrides = EngineTuningOverrides {
            forward_buffer_secs: Some(12.0),
            worker_enabled: Some(false),
            ..Default::default()
        };
        let tuning = overrides.merge(EngineTuning::default());
        assert_eq!(tuning.forward_buffer_secs, 12.0);
        assert!(!tuning.worker_enabled);
        // Unset fields keep defaults
        assert_eq!(tuning.max_buffer_bytes, 64 * 1024 * 1024);
        assert_eq!(tuning.start_level, -1);
    }

    #[test]
    fn test_invalid_tuning_rejected() {
        let tuning = EngineTuning {
            forward_buffer_secs: 0.0,
            ..Default::default()
        };
        assert!(tuning.validate().is_err());

        let tuning = EngineTuning {
            max_buffer_bytes: 0,
            ..Default::default()
        };
        assert!(tuning.validate().is_err());

        let tuning = EngineTuning {
            start_level: -2,
            ..Default::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"autoplay": true, "engineTuning": {"startLevel": 2}}"#)
                .unwrap();
        assert!(config.autoplay);
        let tuning = config.resolve_tuning().unwrap();
        assert_eq!(tuning.start_level, 2);
        assert_eq!(tuning.forward_buffer_secs, 30.0);
    }
}
