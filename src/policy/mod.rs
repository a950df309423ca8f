//! Policy interface consumed by the runners
//!
//! A policy maps a batch of observations (one row per environment) to
//! actions, value estimates and action log-probabilities. The runner only
//! relies on [`Policy::step`] and [`Policy::value_step`]; how the policy is
//! trained is outside this crate.

use anyhow::{Result, ensure};

pub mod random;

#[cfg(feature = "training")]
pub mod gaussian;

/// Observations for every environment, stored contiguously
///
/// Layout is `[num_envs, obs_shape...]` in row-major order, so row `i` holds
/// environment `i`'s observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationBatch {
    num_envs: usize,
    obs_shape: Vec<usize>,
    obs_len: usize,
    data: Vec<f32>,
}

impl ObservationBatch {
    /// Create a zero-filled batch
    pub fn zeros(num_envs: usize, obs_shape: Vec<usize>) -> Self {
        let obs_len = obs_shape.iter().product();
        Self { num_envs, obs_shape, obs_len, data: vec![0.0; num_envs * obs_len] }
    }

    /// Build a batch from per-environment observations
    pub fn from_rows(obs_shape: Vec<usize>, rows: &[Vec<f32>]) -> Result<Self> {
        let mut batch = Self::zeros(rows.len(), obs_shape);
        batch.copy_rows(rows)?;
        Ok(batch)
    }

    /// Overwrite every row with the given observations
    pub fn copy_rows(&mut self, rows: &[Vec<f32>]) -> Result<()> {
        ensure!(
            rows.len() == self.num_envs,
            "got {} observations for a batch of {} environments",
            rows.len(),
            self.num_envs
        );
        for (env_id, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == self.obs_len,
                "observation for env {} has length {}, expected {} (shape {:?})",
                env_id,
                row.len(),
                self.obs_len,
                self.obs_shape
            );
            self.row_mut(env_id).copy_from_slice(row);
        }
        Ok(())
    }

    /// Number of environments (rows)
    pub fn num_envs(&self) -> usize {
        self.num_envs
    }

    /// Shape of a single observation
    pub fn obs_shape(&self) -> &[usize] {
        &self.obs_shape
    }

    /// Number of scalars in a single observation
    pub fn obs_len(&self) -> usize {
        self.obs_len
    }

    /// Full batch shape, `[num_envs, obs_shape...]`
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = Vec::with_capacity(self.obs_shape.len() + 1);
        shape.push(self.num_envs);
        shape.extend_from_slice(&self.obs_shape);
        shape
    }

    /// Observation of one environment
    pub fn row(&self, env_id: usize) -> &[f32] {
        &self.data[env_id * self.obs_len..(env_id + 1) * self.obs_len]
    }

    /// Mutable observation of one environment
    pub fn row_mut(&mut self, env_id: usize) -> &mut [f32] {
        &mut self.data[env_id * self.obs_len..(env_id + 1) * self.obs_len]
    }

    /// Raw contiguous data
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Output of [`Policy::step`] for a batch of observations
#[derive(Debug, Clone)]
pub struct PolicyStep<A> {
    /// One action per environment
    pub actions: Vec<A>,

    /// Value estimate per environment
    pub values: Vec<f32>,

    /// Log-probability (or negative log-probability, depending on the
    /// policy) of each sampled action
    pub log_probs: Vec<f32>,
}

impl<A> PolicyStep<A> {
    /// Check that every output covers exactly `num_envs` environments
    pub fn validate(&self, num_envs: usize) -> Result<()> {
        ensure!(
            self.actions.len() == num_envs,
            "policy returned {} actions, expected {}",
            self.actions.len(),
            num_envs
        );
        ensure!(
            self.values.len() == num_envs,
            "policy returned {} values, expected {}",
            self.values.len(),
            num_envs
        );
        ensure!(
            self.log_probs.len() == num_envs,
            "policy returned {} log-probs, expected {}",
            self.log_probs.len(),
            num_envs
        );
        Ok(())
    }
}

/// Actor-critic policy driven by a runner
pub trait Policy {
    /// Action type produced for a single environment
    type Action: Clone;

    /// Sample actions and evaluate values for every environment
    fn step(&mut self, observations: &ObservationBatch) -> Result<PolicyStep<Self::Action>>;

    /// Evaluate values only, used for bootstrapping past the rollout horizon
    fn value_step(&mut self, observations: &ObservationBatch) -> Result<Vec<f32>>;
}
