//! Configuration types for the lip-sync core.

use crate::error::{LipSyncError, Result};
use crate::transition::easing::Easing;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LipSyncConfig {
    /// Viseme timing derivation.
    pub scheduler: SchedulerConfig,
    /// Blend-shape interpolation.
    pub transition: TransitionConfig,
    /// Frame loop cadence.
    pub runner: RunnerConfig,
    /// Chat backend location.
    pub backend: BackendConfig,
    /// Avatar selection.
    pub avatar: AvatarConfig,
}

/// How attack and release transitions are derived from event spacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Span assumed after the last event of an utterance, in ms.
    pub trailing_sustain_ms: f64,
    /// Attack duration as a fraction of the span to the next event.
    pub attack_fraction: f64,
    /// Delay before the release starts, as a fraction of the span.
    ///
    /// Values below `1.0` make the release overlap the next attack instead
    /// of producing a hard cut.
    pub release_delay_fraction: f64,
    /// Release duration as a fraction of the span.
    pub release_fraction: f64,
    /// Floor applied to the span so coincident events still animate.
    pub min_span_ms: f64,
    /// Relax open morph targets to neutral when a session is reset.
    pub neutral_on_reset: bool,
    /// Duration of the neutral relax, in ms.
    pub neutral_return_ms: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            trailing_sustain_ms: 200.0,
            attack_fraction: 0.5,
            release_delay_fraction: 0.8,
            release_fraction: 0.5,
            min_span_ms: 1.0,
            neutral_on_reset: true,
            neutral_return_ms: 120.0,
        }
    }
}

/// Blend-shape interpolation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Curve applied to every morph-weight tween.
    pub easing: Easing,
}

/// Frame loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Interval between frame ticks in ms (~60 Hz by default).
    pub frame_interval_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
        }
    }
}

/// Chat backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL that relative `audio_url` paths are resolved against.
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
        }
    }
}

/// Avatar selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Avatar file loaded at startup.
    pub default_avatar: String,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            default_avatar: "avatar2.glb".to_owned(),
        }
    }
}

impl SchedulerConfig {
    fn validate(&self) -> Result<()> {
        check_positive("scheduler.trailing_sustain_ms", self.trailing_sustain_ms)?;
        check_positive("scheduler.min_span_ms", self.min_span_ms)?;
        check_fraction("scheduler.attack_fraction", self.attack_fraction)?;
        check_fraction("scheduler.release_fraction", self.release_fraction)?;
        if !self.release_delay_fraction.is_finite() || self.release_delay_fraction < 0.0 {
            return Err(LipSyncError::Config(format!(
                "scheduler.release_delay_fraction must be a non-negative number, got {}",
                self.release_delay_fraction
            )));
        }
        if !self.neutral_return_ms.is_finite() || self.neutral_return_ms < 0.0 {
            return Err(LipSyncError::Config(format!(
                "scheduler.neutral_return_ms must be a non-negative number, got {}",
                self.neutral_return_ms
            )));
        }
        Ok(())
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LipSyncError::Config(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(LipSyncError::Config(format!(
            "{name} must be in (0, 1], got {value}"
        )))
    }
}

impl LipSyncConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| LipSyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| LipSyncError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`LipSyncError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        if self.runner.frame_interval_ms == 0 {
            return Err(LipSyncError::Config(
                "runner.frame_interval_ms must be at least 1".to_owned(),
            ));
        }
        url::Url::parse(&self.backend.base_url).map_err(|e| {
            LipSyncError::Config(format!(
                "backend.base_url '{}' is not a valid URL: {e}",
                self.backend.base_url
            ))
        })?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/lipsync/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("lipsync").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("lipsync")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/lipsync-config/config.toml")
        }
    }
}
