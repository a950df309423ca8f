//! Environment traits and implementations
//!
//! This module defines the single-environment interface, the vectorized
//! interface the runner drives, and the space descriptors both expose.

use anyhow::{Result, ensure};

/// Core trait for a single episodic environment
pub trait Environment {
    /// Action type accepted by [`Environment::step`]
    type Action;

    /// Reset the environment and return the initial observation
    fn reset(&mut self) -> Result<Vec<f32>>;

    /// Step the environment with an action
    fn step(&mut self, action: &Self::Action) -> Result<StepResult>;

    /// Render the current state (no-op by default)
    fn render(&self) -> Result<()> {
        Ok(())
    }

    /// Release any resources held by the environment
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Get the observation space dimensions
    fn observation_space(&self) -> SpaceInfo;

    /// Get the action space dimensions
    fn action_space(&self) -> SpaceInfo;
}

/// A vector of `num_envs` environments stepped synchronously
///
/// Implementations must return results aligned by environment index, and an
/// environment reporting `done` must already have been reset so that its
/// returned observation is the first one of the new episode.
pub trait VecEnv {
    /// Action type for a single environment
    type Action: Clone;

    /// Number of environments in the vector
    fn num_envs(&self) -> usize;

    /// Reset all environments, returning one observation per environment
    fn reset(&mut self) -> Result<Vec<Vec<f32>>>;

    /// Advance every environment by one timestep
    fn step(&mut self, actions: &[Self::Action]) -> Result<VecStepResult>;

    /// Render the environments
    fn render(&mut self) -> Result<()>;

    /// Shut the environments down
    fn close(&mut self) -> Result<()>;

    /// Observation space of a single environment
    fn observation_space(&self) -> SpaceInfo;

    /// Action space of a single environment
    fn action_space(&self) -> SpaceInfo;
}

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Next observation
    pub observation: Vec<f32>,

    /// Reward received
    pub reward: f32,

    /// Whether the episode terminated
    pub terminated: bool,

    /// Whether the episode was truncated
    pub truncated: bool,

    /// Additional info
    pub info: StepInfo,
}

impl StepResult {
    /// Whether the episode is over for any reason
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Result of stepping a vector of environments
///
/// All vectors are indexed by environment.
#[derive(Debug, Clone)]
pub struct VecStepResult {
    /// Observations for each environment
    pub observations: Vec<Vec<f32>>,

    /// Rewards for each environment
    pub rewards: Vec<f32>,

    /// Episode-over flags for each environment
    pub dones: Vec<bool>,

    /// Per-environment info
    pub infos: Vec<StepInfo>,
}

impl VecStepResult {
    /// Check that the result covers `num_envs` environments and that every
    /// observation has `obs_len` elements
    pub fn validate(&self, num_envs: usize, obs_len: usize) -> Result<()> {
        ensure!(
            self.observations.len() == num_envs,
            "environment returned {} observations, expected {}",
            self.observations.len(),
            num_envs
        );
        ensure!(
            self.rewards.len() == num_envs,
            "environment returned {} rewards, expected {}",
            self.rewards.len(),
            num_envs
        );
        ensure!(
            self.dones.len() == num_envs,
            "environment returned {} done flags, expected {}",
            self.dones.len(),
            num_envs
        );
        for (env_id, obs) in self.observations.iter().enumerate() {
            ensure!(
                obs.len() == obs_len,
                "environment {} returned observation of length {}, expected {}",
                env_id,
                obs.len(),
                obs_len
            );
        }
        Ok(())
    }
}

/// Space information for observations and actions
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceInfo {
    /// Shape of the space
    pub shape: Vec<usize>,

    /// Data type
    pub space_type: SpaceType,
}

impl SpaceInfo {
    /// Number of scalar elements in one sample of this space
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Space data types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpaceType {
    /// Discrete space with n options
    Discrete(usize),

    /// Continuous space (Box) with uniform bounds
    Continuous {
        /// Lower bound of every element
        low: f32,
        /// Upper bound of every element
        high: f32,
    },
}

/// Additional step information
#[derive(Debug, Clone, Default)]
pub struct StepInfo {
    /// Final observation of an episode that was auto-reset during the step
    pub terminal_observation: Option<Vec<f32>>,
}

pub mod pool;
pub mod scripted;
