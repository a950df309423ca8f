//! Runner configuration
//!
//! This module defines the rollout hyperparameters shared by every runner
//! and provides validation, builder methods and JSON persistence.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::stats::DEFAULT_WINDOW;

/// Rollout configuration parameters
///
/// Defaults follow common settings for pixel-based actor-critic training:
/// short 5-step rollouts, 4 stacked frames and a 100-episode statistics
/// window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Steps collected per environment in one rollout
    pub n_step: usize,

    /// Discount factor (gamma)
    pub gamma: f32,

    /// GAE lambda parameter
    pub gae_lambda: f32,

    /// Frames stacked per image observation
    pub n_stack: usize,

    /// Capacity of the episode statistics windows
    pub stats_window: usize,

    /// Render the environments at the start of every rollout
    pub render: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            n_step: 5,
            gamma: 0.99,
            gae_lambda: 0.95,
            n_stack: 4,
            stats_window: DEFAULT_WINDOW,
            render: false,
        }
    }
}

impl RunnerConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.n_step == 0 {
            anyhow::bail!("n_step must be positive");
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            anyhow::bail!("gamma must be in [0, 1], got {}", self.gamma);
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            anyhow::bail!("gae_lambda must be in [0, 1], got {}", self.gae_lambda);
        }
        if self.n_stack == 0 {
            anyhow::bail!("n_stack must be positive");
        }
        if self.stats_window == 0 {
            anyhow::bail!("stats_window must be positive");
        }
        Ok(())
    }

    /// Set steps per rollout
    pub fn n_step(mut self, n_step: usize) -> Self {
        self.n_step = n_step;
        self
    }

    /// Set discount factor
    pub fn gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set GAE lambda
    pub fn gae_lambda(mut self, lambda: f32) -> Self {
        self.gae_lambda = lambda;
        self
    }

    /// Set number of stacked frames
    pub fn n_stack(mut self, n_stack: usize) -> Self {
        self.n_stack = n_stack;
        self
    }

    /// Set episode statistics window capacity
    pub fn stats_window(mut self, window: usize) -> Self {
        self.stats_window = window;
        self
    }

    /// Enable or disable rendering
    pub fn render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    /// Save configuration to a JSON file
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("failed to write {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Load and validate configuration from a JSON file
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        Self::from_json(&json)
    }

    /// Parse and validate configuration from a JSON string
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid runner config")?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_step, 5);
        assert_eq!(config.n_stack, 4);
        assert_eq!(config.stats_window, 100);
    }

    #[test]
    fn test_config_validation() {
        assert!(RunnerConfig::new().n_step(0).validate().is_err());
        assert!(RunnerConfig::new().gamma(1.5).validate().is_err());
        assert!(RunnerConfig::new().gae_lambda(-0.1).validate().is_err());
        assert!(RunnerConfig::new().n_stack(0).validate().is_err());
        assert!(RunnerConfig::new().stats_window(0).validate().is_err());

        // Boundary values are allowed
        assert!(RunnerConfig::new().gamma(1.0).gae_lambda(0.0).validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = RunnerConfig::new().n_step(8).gamma(0.999).render(true);

        assert_eq!(config.n_step, 8);
        assert_eq!(config.gamma, 0.999);
        assert!(config.render);

        // Other values should remain default
        assert_eq!(config.gae_lambda, 0.95);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = RunnerConfig::from_json(r#"{ "n_step": 16, "gamma": 0.9 }"#).unwrap();
        assert_eq!(config.n_step, 16);
        assert_eq!(config.gamma, 0.9);
        assert_eq!(config.n_stack, 4);

        assert!(RunnerConfig::from_json(r#"{ "n_step": 0 }"#).is_err());
        assert!(RunnerConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_config_json_file_round_trip() -> Result<()> {
        let config = RunnerConfig::new().n_step(12).n_stack(2);
        let temp_file = NamedTempFile::new()?;

        config.save_json(temp_file.path())?;
        let loaded = RunnerConfig::load_json(temp_file.path())?;

        assert_eq!(loaded, config);
        Ok(())
    }
}
