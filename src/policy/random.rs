//! Uniform random policies
//!
//! Baselines that ignore observations and sample actions uniformly from the
//! action space. Value estimates are always zero. Both are seeded so that
//! rollouts are reproducible.

use anyhow::{Result, bail, ensure};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{ObservationBatch, Policy, PolicyStep};
use crate::env::{SpaceInfo, SpaceType};

/// Uniform policy over a continuous box
#[derive(Debug)]
pub struct UniformContinuous {
    action_dim: usize,
    low: f32,
    high: f32,
    log_prob: f32,
    rng: StdRng,
}

impl UniformContinuous {
    /// Create a policy sampling `action_dim` values in `[low, high)`
    pub fn new(action_dim: usize, low: f32, high: f32, seed: u64) -> Result<Self> {
        ensure!(high > low, "action bounds must satisfy low < high, got [{low}, {high}]");
        // Density of a uniform box: 1 / (high - low)^dim
        let log_prob = -(action_dim as f32) * (high - low).ln();
        Ok(Self { action_dim, low, high, log_prob, rng: StdRng::seed_from_u64(seed) })
    }

    /// Create a policy matching a continuous action space
    pub fn from_space(space: &SpaceInfo, seed: u64) -> Result<Self> {
        match space.space_type {
            SpaceType::Continuous { low, high } => Self::new(space.numel(), low, high, seed),
            SpaceType::Discrete(_) => bail!("UniformContinuous needs a continuous action space"),
        }
    }
}

impl Policy for UniformContinuous {
    type Action = Vec<f32>;

    fn step(&mut self, observations: &ObservationBatch) -> Result<PolicyStep<Vec<f32>>> {
        let num_envs = observations.num_envs();
        let actions: Vec<Vec<f32>> = (0..num_envs)
            .map(|_| {
                (0..self.action_dim)
                    .map(|_| self.rng.gen_range(self.low..self.high))
                    .collect::<Vec<f32>>()
            })
            .collect();

        Ok(PolicyStep {
            actions,
            values: vec![0.0; num_envs],
            log_probs: vec![self.log_prob; num_envs],
        })
    }

    fn value_step(&mut self, observations: &ObservationBatch) -> Result<Vec<f32>> {
        Ok(vec![0.0; observations.num_envs()])
    }
}

/// Uniform policy over `n` discrete actions
///
/// Reports negative log-probabilities, matching policies trained with a
/// cross-entropy style objective.
#[derive(Debug)]
pub struct UniformDiscrete {
    num_actions: usize,
    rng: StdRng,
}

impl UniformDiscrete {
    /// Create a policy choosing among `num_actions` actions
    pub fn new(num_actions: usize, seed: u64) -> Result<Self> {
        ensure!(num_actions > 0, "num_actions must be positive");
        Ok(Self { num_actions, rng: StdRng::seed_from_u64(seed) })
    }

    /// Create a policy matching a discrete action space
    pub fn from_space(space: &SpaceInfo, seed: u64) -> Result<Self> {
        match space.space_type {
            SpaceType::Discrete(n) => Self::new(n, seed),
            SpaceType::Continuous { .. } => bail!("UniformDiscrete needs a discrete action space"),
        }
    }
}

impl Policy for UniformDiscrete {
    type Action = i64;

    fn step(&mut self, observations: &ObservationBatch) -> Result<PolicyStep<i64>> {
        let num_envs = observations.num_envs();
        let actions: Vec<i64> =
            (0..num_envs).map(|_| self.rng.gen_range(0..self.num_actions) as i64).collect();
        let neg_log_prob = (self.num_actions as f32).ln();

        Ok(PolicyStep { actions, values: vec![0.0; num_envs], log_probs: vec![neg_log_prob; num_envs] })
    }

    fn value_step(&mut self, observations: &ObservationBatch) -> Result<Vec<f32>> {
        Ok(vec![0.0; observations.num_envs()])
    }
}
